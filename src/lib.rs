//! # justqr
//!
//! A Rust library for building QR code payloads from structured input and
//! exporting them as images.
//!
//! `justqr` turns a URL, free text, Wi-Fi credentials, an email draft, an SMS
//! or a contact card into the exact string a QR reader expects, renders a
//! preview, and exports the symbol as PNG, SVG, JPEG or WebP. Symbols always
//! use error-correction level H and no quiet zone.
//!
//! ## Features
//!
//! - Payload templates for `url`, `text`, `wifi`, `email`, `sms` and `vcard`.
//! - Custom foreground and background colors, including transparency.
//! - Raster export at any pixel size, SVG export scaled to the same size.
//! - JPEG export composited onto the background color.
//! - Debounced live preview session.
//!
//! ## Example
//!
//! Build a Wi-Fi payload:
//!
//! ```rust
//! use justqr::content::{build_content, field, ContentType, FormFields};
//!
//! let fields = FormFields::new()
//!     .with(field::WIFI_SSID, "Net")
//!     .with(field::WIFI_PASS, "pw");
//! assert_eq!(build_content(ContentType::Wifi, &fields), "WIFI:T:WPA;S:Net;P:pw;;");
//! ```
//!
//! Export it as a PNG into `output/qr-code.png`:
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use justqr::{download_qr, Color, ExportFormat, FsPlatform, QrEngine};
//!
//! # async fn run() -> justqr::Result<()> {
//! let platform = Arc::new(FsPlatform::new("output"));
//! download_qr(&QrEngine, &platform, ExportFormat::Png, "WIFI:T:WPA;S:Net;P:pw;;", 512, Color::BLACK, Color::WHITE).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`content`]: Payload templates per content type.
//! - [`style`]: Colors and render options.
//! - [`engine`]: The encoder seam and its `qrcode`-backed implementation.
//! - [`surface`]: Raster drawing surface with data-URI export.
//! - [`platform`]: Object URLs and downloads.
//! - [`preview`], [`export`]: The render and export pipeline.
//! - [`live`]: Debounced live preview session.
//! - [`config`]: TOML configuration.

pub mod config;
pub mod content;
pub mod engine;
pub mod error;
pub mod export;
pub mod live;
pub mod platform;
pub mod preview;
pub mod style;
pub mod surface;

pub use content::{build_content, ContentType, FormFields};
pub use engine::{Encoder, QrEngine};
pub use error::{QrError, Result};
pub use export::{download_qr, ExportFormat};
pub use platform::{Blob, FsPlatform, Platform};
pub use preview::{render_qr, PreviewTarget};
pub use style::{Color, RenderStyle};
pub use surface::Surface;
