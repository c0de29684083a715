//! Live preview session: form state plus debounced regeneration.
//!
//! Every edit reschedules the preview render; only the last edit within the
//! debounce window triggers one. Exports run immediately against the current
//! state.

use std::future::Future;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::content::{build_content, ContentType, FormFields};
use crate::engine::Encoder;
use crate::error::{QrError, Result};
use crate::export::{download_qr, ExportFormat};
use crate::platform::Platform;
use crate::preview::{render_qr, PreviewTarget};
use crate::style::Color;

struct Pending {
    handle: JoinHandle<()>,
    started: Arc<AtomicBool>,
}

/// Runs a task after a quiet period, replacing any task still waiting.
///
/// Scheduling while a previous task is still in its delay cancels that task.
/// A task whose delay has elapsed is left to finish.
pub struct Debouncer {
    delay: Duration,
    pending: Option<Pending>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self { delay, pending: None }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn schedule<F>(&mut self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel();

        let delay = self.delay;
        let started = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&started);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            flag.store(true, Ordering::SeqCst);
            task.await;
        });
        self.pending = Some(Pending { handle, started });
    }

    /// Cancels the waiting task, if any.
    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            if !pending.started.load(Ordering::SeqCst) {
                pending.handle.abort();
            }
        }
    }

    /// Whether a scheduled task has not completed yet.
    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|p| !p.handle.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Everything the user has entered so far.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionState {
    pub content_type: ContentType,
    pub fields: FormFields,
    pub foreground: Color,
    pub background: Color,
    pub size: u32,
    pub format: ExportFormat,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            content_type: ContentType::Url,
            fields: FormFields::new(),
            foreground: Color::BLACK,
            background: Color::WHITE,
            size: crate::style::PREVIEW_SIZE,
            format: ExportFormat::Png,
        }
    }
}

impl SessionState {
    pub fn payload(&self) -> String {
        build_content(self.content_type, &self.fields)
    }
}

/// Outcome of a preview regeneration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PreviewEvent {
    /// The preview target now shows `payload`.
    Rendered { payload: String },
    /// The engine rejected the payload.
    Failed { payload: String, error: String },
}

/// A single line of user input in a live session.
#[derive(Clone, Debug, PartialEq)]
pub enum LiveCommand {
    SetType(ContentType),
    SetField { key: String, value: String },
    Foreground(Color),
    Background(Color),
    Size(u32),
    Format(ExportFormat),
    Export,
    Show,
    Help,
    Quit,
}

impl FromStr for LiveCommand {
    type Err = QrError;

    /// Parses `type <t>`, `fg <color>`, `bg <color>`, `size <px>`,
    /// `format <fmt>`, `export`, `show`, `help`, `quit` or `<key>=<value>`.
    fn from_str(line: &str) -> Result<Self> {
        let line = line.trim_end_matches(['\r', '\n']);

        if let Some((key, value)) = line.split_once('=') {
            return Ok(LiveCommand::SetField { key: key.trim().to_string(), value: value.to_string() });
        }

        let (word, arg) = match line.trim().split_once(char::is_whitespace) {
            Some((word, arg)) => (word, arg.trim()),
            None => (line.trim(), ""),
        };

        match word {
            "type" => Ok(LiveCommand::SetType(arg.parse()?)),
            "fg" => Ok(LiveCommand::Foreground(arg.parse()?)),
            "bg" => Ok(LiveCommand::Background(arg.parse()?)),
            "size" => {
                let size: u32 = arg
                    .parse()
                    .map_err(|_| QrError::InvalidCommand(format!("'{arg}' is not a pixel size")))?;
                if size == 0 || size > crate::style::MAX_SIZE {
                    return Err(QrError::InvalidSize(size));
                }
                Ok(LiveCommand::Size(size))
            }
            "format" => Ok(LiveCommand::Format(arg.parse()?)),
            "export" => Ok(LiveCommand::Export),
            "show" => Ok(LiveCommand::Show),
            "help" | "?" => Ok(LiveCommand::Help),
            "quit" | "exit" => Ok(LiveCommand::Quit),
            _ => Err(QrError::InvalidCommand(line.to_string())),
        }
    }
}

/// Whether the session should keep reading input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Interactive session driving the preview target and exports.
pub struct LiveSession<E, P> {
    engine: E,
    platform: Arc<P>,
    target: Arc<PreviewTarget>,
    state: SessionState,
    debouncer: Debouncer,
    events: UnboundedSender<PreviewEvent>,
}

impl<E, P> LiveSession<E, P>
where
    E: Encoder + Clone + 'static,
    P: Platform,
{
    pub fn new(
        engine: E,
        platform: Arc<P>,
        state: SessionState,
        debounce: Duration,
        events: UnboundedSender<PreviewEvent>,
    ) -> Self {
        Self {
            engine,
            platform,
            target: Arc::new(PreviewTarget::new()),
            state,
            debouncer: Debouncer::new(debounce),
            events,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn target(&self) -> &Arc<PreviewTarget> {
        &self.target
    }

    /// Schedules the initial preview.
    pub fn start(&mut self) {
        self.schedule_preview();
    }

    /// Applies one command. State changes reschedule the preview.
    pub async fn apply(&mut self, command: LiveCommand) -> Result<Flow> {
        match command {
            LiveCommand::SetType(content_type) => self.state.content_type = content_type,
            LiveCommand::SetField { key, value } => {
                if !self.state.content_type.fields().contains(&key.as_str()) {
                    warn!(%key, content_type = %self.state.content_type, "field is not used by the current content type");
                }
                self.state.fields.set(key, value);
            }
            LiveCommand::Foreground(color) => self.state.foreground = color,
            LiveCommand::Background(color) => self.state.background = color,
            LiveCommand::Size(size) => {
                self.state.size = size;
                return Ok(Flow::Continue);
            }
            LiveCommand::Format(format) => {
                self.state.format = format;
                return Ok(Flow::Continue);
            }
            LiveCommand::Export => {
                self.export().await?;
                return Ok(Flow::Continue);
            }
            LiveCommand::Show | LiveCommand::Help => return Ok(Flow::Continue),
            LiveCommand::Quit => {
                self.debouncer.cancel();
                return Ok(Flow::Quit);
            }
        }

        self.schedule_preview();
        Ok(Flow::Continue)
    }

    /// Exports the current payload with the session's format, size and colors.
    pub async fn export(&self) -> Result<()> {
        let state = &self.state;
        download_qr(
            &self.engine,
            &self.platform,
            state.format,
            &state.payload(),
            state.size,
            state.foreground,
            state.background,
        )
        .await
    }

    fn schedule_preview(&mut self) {
        let engine = self.engine.clone();
        let target = Arc::clone(&self.target);
        let state = self.state.clone();
        let events = self.events.clone();

        self.debouncer.schedule(async move {
            let payload = state.payload();
            if payload.is_empty() {
                return;
            }

            let event = match render_qr(&engine, &target, &payload, state.foreground, state.background).await {
                Ok(()) => PreviewEvent::Rendered { payload },
                Err(e) => PreviewEvent::Failed { payload, error: e.to_string() },
            };
            debug!(?event, "preview regenerated");
            // The receiver is gone once the session shuts down.
            let _ = events.send(event);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::field;
    use crate::engine::QrEngine;
    use crate::platform::FsPlatform;
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    const DEBOUNCE: Duration = Duration::from_millis(350);

    #[tokio::test(start_paused = true)]
    async fn test_debouncer_runs_only_last_task() {
        let runs = Arc::new(Mutex::new(Vec::new()));
        let mut debouncer = Debouncer::new(DEBOUNCE);

        for i in 0..3 {
            let runs = Arc::clone(&runs);
            debouncer.schedule(async move {
                runs.lock().unwrap().push(i);
            });
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert!(debouncer.is_pending());
        assert!(runs.lock().unwrap().is_empty());

        tokio::time::sleep(DEBOUNCE).await;
        assert_eq!(*runs.lock().unwrap(), vec![2]);
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_debouncer_cancel_and_drop() {
        let runs = Arc::new(Mutex::new(0));

        let mut debouncer = Debouncer::new(DEBOUNCE);
        let counter = Arc::clone(&runs);
        debouncer.schedule(async move {
            *counter.lock().unwrap() += 1;
        });
        debouncer.cancel();

        let mut dropped = Debouncer::new(DEBOUNCE);
        let counter = Arc::clone(&runs);
        dropped.schedule(async move {
            *counter.lock().unwrap() += 1;
        });
        drop(dropped);

        tokio::time::sleep(DEBOUNCE * 2).await;
        assert_eq!(*runs.lock().unwrap(), 0);
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!("type wifi".parse::<LiveCommand>().unwrap(), LiveCommand::SetType(ContentType::Wifi));
        assert_eq!(
            "wifiPass=a=b c".parse::<LiveCommand>().unwrap(),
            LiveCommand::SetField { key: "wifiPass".into(), value: "a=b c".into() }
        );
        assert_eq!("fg #f00".parse::<LiveCommand>().unwrap(), LiveCommand::Foreground(Color::rgb(255, 0, 0)));
        assert_eq!("size 512".parse::<LiveCommand>().unwrap(), LiveCommand::Size(512));
        assert_eq!("format jpeg".parse::<LiveCommand>().unwrap(), LiveCommand::Format(ExportFormat::Jpg));
        assert_eq!("export".parse::<LiveCommand>().unwrap(), LiveCommand::Export);
        assert_eq!("quit\n".parse::<LiveCommand>().unwrap(), LiveCommand::Quit);

        assert!("size 0".parse::<LiveCommand>().is_err());
        assert!(matches!("size 60000".parse::<LiveCommand>(), Err(QrError::InvalidSize(60_000))));
        assert!("size big".parse::<LiveCommand>().is_err());
        assert!("bg white".parse::<LiveCommand>().is_err());
        assert!("dance".parse::<LiveCommand>().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_renders_once_per_burst_of_edits() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut session = LiveSession::new(
            QrEngine,
            Arc::new(FsPlatform::new(dir.path())),
            SessionState::default(),
            DEBOUNCE,
            tx,
        );

        for partial in ["h", "ht", "https://a.com"] {
            session
                .apply(LiveCommand::SetField { key: field::URL.into(), value: partial.into() })
                .await
                .unwrap();
        }

        let event = rx.recv().await.unwrap();
        assert_eq!(event, PreviewEvent::Rendered { payload: "https://a.com".into() });
        assert!(!session.target().is_empty());

        tokio::time::sleep(DEBOUNCE * 2).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_reports_engine_failure() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut session = LiveSession::new(
            QrEngine,
            Arc::new(FsPlatform::new(dir.path())),
            SessionState::default(),
            DEBOUNCE,
            tx,
        );

        session.apply(LiveCommand::SetType(ContentType::Text)).await.unwrap();
        session
            .apply(LiveCommand::SetField { key: field::TEXT.into(), value: "x".repeat(4000) })
            .await
            .unwrap();

        match rx.recv().await.unwrap() {
            PreviewEvent::Failed { error, .. } => assert!(!error.is_empty()),
            other => panic!("expected failure, got {other:?}"),
        }
        assert!(session.target().is_empty());
    }

    #[tokio::test]
    async fn test_session_export_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut session = LiveSession::new(
            QrEngine,
            Arc::new(FsPlatform::new(dir.path())),
            SessionState::default(),
            DEBOUNCE,
            tx,
        );

        session.apply(LiveCommand::SetType(ContentType::Sms)).await.unwrap();
        session
            .apply(LiveCommand::SetField { key: field::SMS_NUMBER.into(), value: "+123".into() })
            .await
            .unwrap();
        session.apply(LiveCommand::Format(ExportFormat::Png)).await.unwrap();
        session.apply(LiveCommand::Size(128)).await.unwrap();
        assert_eq!(session.state().payload(), "sms:+123");

        assert_eq!(session.apply(LiveCommand::Export).await.unwrap(), Flow::Continue);
        let img = image::open(dir.path().join("qr-code.png")).unwrap();
        assert_eq!((img.width(), img.height()), (128, 128));

        assert_eq!(session.apply(LiveCommand::Quit).await.unwrap(), Flow::Quit);
    }
}
