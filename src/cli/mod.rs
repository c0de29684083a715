//! Command-line interface.

mod build;
mod export;
mod live;
mod preview;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing::warn;

use justqr::config::Config;
use justqr::{Color, ContentType, FormFields};

pub use build::BuildArgs;
pub use export::ExportArgs;
pub use live::LiveArgs;
pub use preview::PreviewArgs;

/// Build QR codes for URLs, text, Wi-Fi, email, SMS and contact cards
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Use this config file instead of the default location
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn load_config(&self) -> Result<Config> {
        match &self.config {
            Some(path) => Config::load_from(path),
            None => Config::load(),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the payload that would be encoded
    Build(BuildArgs),
    /// Render the preview and print it to the terminal
    Preview(PreviewArgs),
    /// Export the QR code as qr-code.<ext>
    Export(ExportArgs),
    /// Interactive session with a debounced live preview
    Live(LiveArgs),
}

/// Content type and form fields shared by the one-shot commands.
#[derive(Args, Debug, Clone)]
pub struct ContentArgs {
    /// Content type: url, text, wifi, email, sms or vcard
    #[arg(value_name = "TYPE")]
    pub content_type: ContentType,

    /// Form field as key=value (e.g. -f wifiSsid=MyNetwork), repeatable
    #[arg(short = 'f', long = "field", value_name = "KEY=VALUE", value_parser = parse_field)]
    pub fields: Vec<(String, String)>,
}

impl ContentArgs {
    pub fn form_fields(&self) -> FormFields {
        let known = self.content_type.fields();
        for (key, _) in &self.fields {
            if !known.contains(&key.as_str()) {
                warn!(%key, content_type = %self.content_type, expected = ?known, "ignoring unused field");
            }
        }
        self.fields.iter().cloned().collect()
    }
}

/// Color overrides on top of the configured style.
#[derive(Args, Debug, Clone, Default)]
pub struct ColorArgs {
    /// Foreground (module) color, e.g. #000000
    #[arg(long, value_name = "COLOR")]
    pub fg: Option<Color>,

    /// Background color, e.g. #ffffff or #ffffff00 for transparent
    #[arg(long, value_name = "COLOR")]
    pub bg: Option<Color>,
}

impl ColorArgs {
    pub fn resolve(&self, config: &Config) -> (Color, Color) {
        (
            self.fg.unwrap_or(config.style.foreground),
            self.bg.unwrap_or(config.style.background),
        )
    }
}

fn parse_field(s: &str) -> std::result::Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{s}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing field name in '{s}'"));
    }
    Ok((key.to_string(), value.to_string()))
}
