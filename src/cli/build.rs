//! `build` command: print the payload without rendering anything.

use anyhow::Result;
use clap::Args;

use justqr::build_content;

use super::ContentArgs;

#[derive(Debug, Clone, Args)]
pub struct BuildArgs {
    #[command(flatten)]
    pub content: ContentArgs,
}

impl BuildArgs {
    pub fn execute(&self) -> Result<()> {
        let payload = build_content(self.content.content_type, &self.content.form_fields());
        println!("{payload}");
        Ok(())
    }
}
