//! `live` command: line-driven form with a debounced preview.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::error;

use justqr::config::Config;
use justqr::live::{Flow, LiveCommand, LiveSession, PreviewEvent, SessionState};
use justqr::style::MAX_SIZE;
use justqr::{ContentType, ExportFormat, FormFields, FsPlatform, QrEngine, RenderStyle};

use super::ColorArgs;

const HELP: &str = "\
commands:
  <field>=<value>   set a form field (e.g. url=https://example.com)
  type <type>       url, text, wifi, email, sms or vcard
  fg <color>        foreground color
  bg <color>        background color
  size <px>         export size
  format <fmt>      png, svg, jpg or webp
  export            write qr-code.<ext> to the output directory
  show              print the current payload
  quit              leave";

#[derive(Debug, Clone, Args)]
pub struct LiveArgs {
    /// Initial content type
    #[arg(value_name = "TYPE", default_value = "url")]
    pub content_type: ContentType,

    #[command(flatten)]
    pub colors: ColorArgs,

    /// Export format
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<ExportFormat>,

    /// Export size in pixels
    #[arg(short, long, value_name = "PX", value_parser = clap::value_parser!(u32).range(1..=MAX_SIZE as i64))]
    pub size: Option<u32>,

    /// Directory exports are written into
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,
}

impl LiveArgs {
    pub async fn execute(&self, config: &Config) -> Result<()> {
        let (foreground, background) = self.colors.resolve(config);
        let state = SessionState {
            content_type: self.content_type,
            fields: FormFields::new(),
            foreground,
            background,
            size: self.size.unwrap_or(config.style.size),
            format: self.format.unwrap_or(config.export.format),
        };
        let output_dir = self.output_dir.clone().unwrap_or_else(|| config.export.output_dir.clone());

        let engine = QrEngine::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut session = LiveSession::new(
            engine,
            Arc::new(FsPlatform::new(&output_dir)),
            state,
            config.live.debounce(),
            tx,
        );

        println!("{HELP}");
        session.start();

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else { break };
                    if line.trim().is_empty() {
                        continue;
                    }
                    let command = match line.parse::<LiveCommand>() {
                        Ok(command) => command,
                        Err(e) => {
                            eprintln!("{e} (type 'help' for commands)");
                            continue;
                        }
                    };
                    match &command {
                        LiveCommand::Help => println!("{HELP}"),
                        LiveCommand::Show => println!("{}", session.state().payload()),
                        _ => {}
                    }
                    let is_export = command == LiveCommand::Export;
                    match session.apply(command).await {
                        Ok(Flow::Quit) => break,
                        Ok(Flow::Continue) if is_export => {
                            let format = session.state().format;
                            println!("✓ Exported QR code to: {}", output_dir.join(format.file_name()).display());
                        }
                        Ok(Flow::Continue) => {}
                        Err(e) => error!("{e}"),
                    }
                }
                Some(event) = rx.recv() => match event {
                    PreviewEvent::Rendered { payload } => {
                        let style = RenderStyle::preview(session.state().foreground, session.state().background);
                        match engine.render_text(&payload, &style) {
                            Ok(text) => print!("{text}"),
                            Err(e) => error!("{e}"),
                        }
                        println!("{payload}");
                    }
                    PreviewEvent::Failed { error, .. } => error!("preview failed: {error}"),
                }
            }
        }

        Ok(())
    }
}
