//! `preview` command: render the preview surface and show it in the terminal.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use justqr::config::Config;
use justqr::{build_content, render_qr, PreviewTarget, QrEngine, RenderStyle};

use super::{ColorArgs, ContentArgs};

#[derive(Debug, Clone, Args)]
pub struct PreviewArgs {
    #[command(flatten)]
    pub content: ContentArgs,

    #[command(flatten)]
    pub colors: ColorArgs,

    /// Also save the 256px preview as a PNG file
    #[arg(long, value_name = "FILE")]
    pub save: Option<PathBuf>,
}

impl PreviewArgs {
    pub async fn execute(&self, config: &Config) -> Result<()> {
        let payload = build_content(self.content.content_type, &self.content.form_fields());
        let (fg, bg) = self.colors.resolve(config);

        let engine = QrEngine::new();
        let target = PreviewTarget::new();
        render_qr(&engine, &target, &payload, fg, bg)
            .await
            .context("Failed to render preview")?;

        print!("{}", engine.render_text(&payload, &RenderStyle::preview(fg, bg))?);
        println!("{payload}");

        if let Some(path) = &self.save {
            let surface = target.snapshot().context("Preview target is empty")?;
            surface
                .save(path)
                .context(format!("Failed to save preview: {}", path.display()))?;
            println!("✓ Saved preview to: {}", path.display());
        }

        Ok(())
    }
}
