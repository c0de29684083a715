//! Live preview rendering.

use std::sync::{Mutex, MutexGuard};

use tracing::debug;

use crate::engine::Encoder;
use crate::error::Result;
use crate::style::{Color, RenderStyle};
use crate::surface::Surface;

/// The on-screen surface a preview is drawn into.
///
/// Each render replaces the previous content; overlapping renders resolve
/// last-write-wins.
#[derive(Debug, Default)]
pub struct PreviewTarget {
    surface: Mutex<Option<Surface>>,
}

impl PreviewTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes whatever was rendered before.
    pub fn clear(&self) {
        *self.lock() = None;
    }

    /// Copy of the currently displayed surface, if any.
    pub fn snapshot(&self) -> Option<Surface> {
        self.lock().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_none()
    }

    fn install(&self, surface: Surface) {
        *self.lock() = Some(surface);
    }

    fn lock(&self) -> MutexGuard<'_, Option<Surface>> {
        self.surface.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Renders `payload` into `target` at the fixed preview size.
///
/// The target is cleared first. Encoding failures (such as a payload too long
/// for error-correction level H) are returned unchanged and leave the target
/// empty.
///
/// # Arguments
///
/// * `engine` - The encoder that draws the symbol.
/// * `target` - The preview target to clear and then fill.
/// * `payload` - The string to encode, usually from `build_content`.
/// * `fg` - Color of dark modules.
/// * `bg` - Color of light modules and the background.
///
/// # Errors
///
/// Returns `QrError::Encode` if the payload does not fit in a symbol.
///
/// # Example
///
/// ```
/// use justqr::{render_qr, Color, PreviewTarget, QrEngine};
///
/// # #[tokio::main]
/// # async fn main() -> justqr::Result<()> {
/// let target = PreviewTarget::new();
/// render_qr(&QrEngine, &target, "https://example.com", Color::BLACK, Color::WHITE).await?;
///
/// let surface = target.snapshot().unwrap();
/// assert_eq!(surface.dimensions(), (256, 256));
/// # Ok(())
/// # }
/// ```
pub async fn render_qr<E>(engine: &E, target: &PreviewTarget, payload: &str, fg: Color, bg: Color) -> Result<()>
where
    E: Encoder + Clone + 'static,
{
    target.clear();

    let engine = engine.clone();
    let style = RenderStyle::preview(fg, bg);
    let payload_owned = payload.to_string();
    let surface = tokio::task::spawn_blocking(move || -> Result<Surface> {
        let mut surface = Surface::new();
        engine.render_to_surface(&mut surface, &payload_owned, &style)?;
        Ok(surface)
    })
    .await??;

    debug!(bytes = payload.len(), fg = %fg, bg = %bg, "preview rendered");
    target.install(surface);
    Ok(())
}
