//! File export of a rendered QR code.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::engine::Encoder;
use crate::error::{QrError, Result};
use crate::platform::{Blob, Platform};
use crate::style::{Color, RenderStyle};
use crate::surface::{Surface, MIME_JPEG, MIME_PNG, MIME_WEBP};

/// Quality factor passed to lossy encoders.
pub const EXPORT_QUALITY: f32 = 0.95;

/// How long an SVG object URL stays alive after its download was triggered.
pub const OBJECT_URL_TTL: Duration = Duration::from_secs(1);

pub const MIME_SVG: &str = "image/svg+xml";

/// Output file format of an export.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Png,
    Svg,
    #[serde(alias = "jpeg")]
    Jpg,
    Webp,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 4] = [ExportFormat::Png, ExportFormat::Svg, ExportFormat::Jpg, ExportFormat::Webp];

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Svg => "svg",
            ExportFormat::Jpg => "jpg",
            ExportFormat::Webp => "webp",
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            ExportFormat::Png => MIME_PNG,
            ExportFormat::Svg => MIME_SVG,
            ExportFormat::Jpg => MIME_JPEG,
            ExportFormat::Webp => MIME_WEBP,
        }
    }

    /// Name of the downloaded file, `qr-code.<ext>`.
    pub fn file_name(self) -> String {
        format!("qr-code.{}", self.extension())
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = QrError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(ExportFormat::Png),
            "svg" => Ok(ExportFormat::Svg),
            "jpg" | "jpeg" => Ok(ExportFormat::Jpg),
            "webp" => Ok(ExportFormat::Webp),
            _ => Err(QrError::UnknownFormat(s.to_string())),
        }
    }
}

/// Exports `payload` as a `format` file of `size` pixels and hands it to the
/// platform as a download named `qr-code.<ext>`.
///
/// An empty payload is a no-op. SVG exports go through an object URL that is
/// revoked [`OBJECT_URL_TTL`] after the download starts; raster formats use a
/// `data:` URI.
///
/// # Arguments
///
/// * `engine` - The encoder that draws the symbol.
/// * `platform` - Where object URLs live and downloads are triggered.
/// * `format` - One of png, svg, jpg or webp.
/// * `payload` - The string to encode. Empty means nothing to export.
/// * `size` - Side length in pixels, between 1 and `MAX_SIZE`.
/// * `fg` - Color of dark modules.
/// * `bg` - Background color. Forced opaque for JPEG.
///
/// # Errors
///
/// Returns `QrError::InvalidSize` for an out-of-range size, `QrError::Encode`
/// if the payload does not fit, or the platform's error if the download fails.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use justqr::{download_qr, Color, ExportFormat, FsPlatform, QrEngine};
///
/// # #[tokio::main]
/// # async fn main() -> justqr::Result<()> {
/// let platform = Arc::new(FsPlatform::new("exports"));
/// download_qr(&QrEngine, &platform, ExportFormat::Svg, "sms:+123", 512, Color::BLACK, Color::WHITE).await?;
/// // exports/qr-code.svg now exists
/// # Ok(())
/// # }
/// ```
pub async fn download_qr<E, P>(
    engine: &E,
    platform: &Arc<P>,
    format: ExportFormat,
    payload: &str,
    size: u32,
    fg: Color,
    bg: Color,
) -> Result<()>
where
    E: Encoder + Clone + 'static,
    P: Platform,
{
    if payload.is_empty() {
        debug!("empty payload, nothing to export");
        return Ok(());
    }

    let style = RenderStyle::new(fg, bg, size)?;
    let filename = format.file_name();

    if format == ExportFormat::Svg {
        let engine = engine.clone();
        let payload = payload.to_string();
        let svg = tokio::task::spawn_blocking(move || engine.render_svg(&payload, &style)).await??;

        let url = platform.create_object_url(Blob::new(svg.into_bytes(), MIME_SVG));
        let result = platform.trigger_download(&filename, &url).await;
        schedule_revoke(platform, url);
        return result;
    }

    let engine = engine.clone();
    let payload = payload.to_string();
    let href = tokio::task::spawn_blocking(move || -> Result<String> {
        let mut canvas = Surface::new();
        engine.render_to_surface(&mut canvas, &payload, &style)?;

        let export = match format {
            ExportFormat::Jpg => composite_opaque(&canvas, style.size, style.background),
            _ => canvas,
        };
        export.to_data_uri(format.mime(), EXPORT_QUALITY)
    })
    .await??;

    debug!(%format, size, "raster export encoded");
    platform.trigger_download(&filename, &href).await
}

/// Draws `canvas` over a `size x size` surface filled with the opaque version
/// of `background`.
///
/// JPEG has no alpha channel; without this, transparent pixels would be
/// flattened to black.
pub fn composite_opaque(canvas: &Surface, size: u32, background: Color) -> Surface {
    let mut opaque = Surface::with_size(size, size);
    opaque.fill(background.opaque());
    opaque.draw_surface(canvas, 0, 0);
    opaque
}

fn schedule_revoke<P: Platform>(platform: &Arc<P>, url: String) {
    let platform = Arc::clone(platform);
    tokio::spawn(async move {
        tokio::time::sleep(OBJECT_URL_TTL).await;
        platform.revoke_object_url(&url);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::QrEngine;
    use crate::platform::{decode_data_uri, FsPlatform};
    use std::sync::Mutex;

    /// Records downloads instead of writing them.
    #[derive(Default)]
    struct RecordingPlatform {
        created: Mutex<Vec<Blob>>,
        revoked: Mutex<Vec<String>>,
        downloads: Mutex<Vec<(String, String)>>,
    }

    impl Platform for RecordingPlatform {
        fn create_object_url(&self, blob: Blob) -> String {
            let mut created = self.created.lock().unwrap();
            created.push(blob);
            format!("blob:test/{}", created.len())
        }

        fn revoke_object_url(&self, url: &str) {
            self.revoked.lock().unwrap().push(url.to_string());
        }

        async fn trigger_download(&self, filename: &str, href: &str) -> Result<()> {
            self.downloads.lock().unwrap().push((filename.to_string(), href.to_string()));
            Ok(())
        }
    }

    fn decode_download(platform: &RecordingPlatform) -> image::DynamicImage {
        let downloads = platform.downloads.lock().unwrap();
        let bytes = decode_data_uri(&downloads[0].1).unwrap();
        image::load_from_memory(&bytes).unwrap()
    }

    #[test]
    fn test_format_names() {
        assert_eq!(ExportFormat::Png.file_name(), "qr-code.png");
        assert_eq!(ExportFormat::Jpg.file_name(), "qr-code.jpg");
        assert_eq!(ExportFormat::Svg.mime(), "image/svg+xml");
        assert_eq!("JPEG".parse::<ExportFormat>().unwrap(), ExportFormat::Jpg);
        assert!("gif".parse::<ExportFormat>().is_err());
    }

    #[tokio::test]
    async fn test_empty_payload_is_a_no_op() {
        let platform = Arc::new(RecordingPlatform::default());
        for format in ExportFormat::ALL {
            download_qr(&QrEngine, &platform, format, "", 256, Color::BLACK, Color::WHITE)
                .await
                .unwrap();
        }
        assert!(platform.created.lock().unwrap().is_empty());
        assert!(platform.downloads.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_png_export_uses_data_uri_and_size() {
        let platform = Arc::new(RecordingPlatform::default());
        download_qr(&QrEngine, &platform, ExportFormat::Png, "https://a.com", 512, Color::BLACK, Color::WHITE)
            .await
            .unwrap();

        {
            let downloads = platform.downloads.lock().unwrap();
            assert_eq!(downloads.len(), 1);
            assert_eq!(downloads[0].0, "qr-code.png");
            assert!(downloads[0].1.starts_with("data:image/png;base64,"));
        }
        assert!(platform.created.lock().unwrap().is_empty());

        let img = decode_download(&platform);
        assert_eq!((img.width(), img.height()), (512, 512));
    }

    #[tokio::test]
    async fn test_webp_export() {
        let platform = Arc::new(RecordingPlatform::default());
        download_qr(&QrEngine, &platform, ExportFormat::Webp, "hello", 128, Color::BLACK, Color::WHITE)
            .await
            .unwrap();

        let downloads = platform.downloads.lock().unwrap();
        assert_eq!(downloads[0].0, "qr-code.webp");
        assert!(downloads[0].1.starts_with("data:image/webp;base64,"));
    }

    #[tokio::test]
    async fn test_jpg_export_composites_background() {
        let platform = Arc::new(RecordingPlatform::default());
        let transparent_teal = Color::rgba(0, 128, 128, 0);
        download_qr(&QrEngine, &platform, ExportFormat::Jpg, "hello", 256, Color::BLACK, transparent_teal)
            .await
            .unwrap();

        assert_eq!(platform.downloads.lock().unwrap()[0].0, "qr-code.jpg");
        let rgb = decode_download(&platform).to_rgb8();

        // Light modules must carry the teal background rather than collapse
        // to black. JPEG is lossy, so compare channel averages.
        let light: Vec<_> = rgb.pixels().filter(|p| p.0[1] > 64).collect();
        assert!(light.len() > rgb.pixels().len() / 4, "background mostly lost");

        let mean = |channel: usize| {
            light.iter().map(|p| u64::from(p.0[channel])).sum::<u64>() / light.len() as u64
        };
        assert!(mean(0) < 30, "red mean {}", mean(0));
        assert!((108..=148).contains(&mean(1)), "green mean {}", mean(1));
        assert!((108..=148).contains(&mean(2)), "blue mean {}", mean(2));
    }

    #[test]
    fn test_composite_opaque_fills_transparent_pixels() {
        let mut canvas = Surface::with_size(4, 4);
        canvas.put_pixel(0, 0, Color::BLACK);

        let bg = Color::rgba(10, 200, 30, 0);
        let out = composite_opaque(&canvas, 4, bg);
        assert_eq!(out.pixel(0, 0), Color::BLACK);
        assert_eq!(out.pixel(3, 3), Color::rgb(10, 200, 30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_svg_export_revokes_object_url_after_delay() {
        let platform = Arc::new(RecordingPlatform::default());
        download_qr(&QrEngine, &platform, ExportFormat::Svg, "hello", 300, Color::BLACK, Color::WHITE)
            .await
            .unwrap();

        {
            let created = platform.created.lock().unwrap();
            assert_eq!(created.len(), 1);
            assert_eq!(created[0].mime, MIME_SVG);
            let svg = String::from_utf8(created[0].bytes.clone()).unwrap();
            assert!(svg.contains("width=\"300\""));

            let downloads = platform.downloads.lock().unwrap();
            assert_eq!(downloads[0], ("qr-code.svg".to_string(), "blob:test/1".to_string()));
        }
        assert!(platform.revoked.lock().unwrap().is_empty());

        tokio::time::sleep(OBJECT_URL_TTL + Duration::from_millis(10)).await;
        assert_eq!(*platform.revoked.lock().unwrap(), vec!["blob:test/1".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_svg_export_to_filesystem() {
        let dir = tempfile::tempdir().unwrap();
        let platform = Arc::new(FsPlatform::new(dir.path()));
        download_qr(&QrEngine, &platform, ExportFormat::Svg, "hello", 256, Color::BLACK, Color::WHITE)
            .await
            .unwrap();

        let svg = std::fs::read_to_string(dir.path().join("qr-code.svg")).unwrap();
        assert!(svg.contains("<svg"));
        assert_eq!(platform.live_object_urls(), 1);

        tokio::time::sleep(OBJECT_URL_TTL * 2).await;
        assert_eq!(platform.live_object_urls(), 0);
    }

    #[tokio::test]
    async fn test_oversized_payload_fails_before_download() {
        let platform = Arc::new(RecordingPlatform::default());
        let payload = "x".repeat(4000);
        let err = download_qr(&QrEngine, &platform, ExportFormat::Svg, &payload, 256, Color::BLACK, Color::WHITE)
            .await
            .unwrap_err();

        assert!(matches!(err, QrError::Encode(_)));
        assert!(platform.created.lock().unwrap().is_empty());
    }
}
