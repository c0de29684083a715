//! `export` command: write `qr-code.<ext>` to the output directory.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use justqr::config::Config;
use justqr::style::MAX_SIZE;
use justqr::{build_content, download_qr, ExportFormat, FsPlatform, QrEngine};

use super::{ColorArgs, ContentArgs};

#[derive(Debug, Clone, Args)]
pub struct ExportArgs {
    #[command(flatten)]
    pub content: ContentArgs,

    #[command(flatten)]
    pub colors: ColorArgs,

    /// Output format: png, svg, jpg or webp
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<ExportFormat>,

    /// Side length in pixels
    #[arg(short, long, value_name = "PX", value_parser = clap::value_parser!(u32).range(1..=MAX_SIZE as i64))]
    pub size: Option<u32>,

    /// Directory to write the file into
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,
}

impl ExportArgs {
    pub async fn execute(&self, config: &Config) -> Result<()> {
        let payload = build_content(self.content.content_type, &self.content.form_fields());
        let (fg, bg) = self.colors.resolve(config);
        let format = self.format.unwrap_or(config.export.format);
        let size = self.size.unwrap_or(config.style.size);
        let output_dir = self.output_dir.clone().unwrap_or_else(|| config.export.output_dir.clone());

        let platform = Arc::new(FsPlatform::new(&output_dir));
        download_qr(&QrEngine::new(), &platform, format, &payload, size, fg, bg)
            .await
            .context(format!("Failed to export {format}"))?;

        println!("✓ Exported QR code to: {}", output_dir.join(format.file_name()).display());
        Ok(())
    }
}
