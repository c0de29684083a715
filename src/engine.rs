//! The encoding engine seam.
//!
//! The render and export pipeline depends on exactly two engine operations:
//! drawing a symbol onto a caller-supplied [`Surface`] and producing SVG
//! markup. [`QrEngine`] implements both on top of the `qrcode` crate.

use qrcode::{Color as Module, QrCode};
use tracing::debug;

use crate::error::Result;
use crate::style::RenderStyle;
use crate::surface::Surface;

/// Pixels per module when the requested size is smaller than the symbol.
const FALLBACK_SCALE: u32 = 4;

/// Quiet zone used for the terminal rendering only.
const TEXT_BORDER: i32 = 4;

/// A QR encoding engine.
pub trait Encoder: Send + Sync {
    /// Resizes `surface` and draws the symbol for `payload` onto it.
    fn render_to_surface(&self, surface: &mut Surface, payload: &str, style: &RenderStyle) -> Result<()>;

    /// Returns an SVG document depicting the symbol for `payload`.
    fn render_svg(&self, payload: &str, style: &RenderStyle) -> Result<String>;
}

/// Module matrix of an encoded symbol.
struct Matrix {
    width: u32,
    modules: Vec<Module>,
}

impl Matrix {
    fn encode(payload: &str, style: &RenderStyle) -> Result<Self> {
        let code = QrCode::with_error_correction_level(payload.as_bytes(), style.error_correction())?;
        let width = code.width() as u32;
        debug!(version = ?code.version(), width, bytes = payload.len(), "encoded QR symbol");
        Ok(Self { width, modules: code.to_colors() })
    }

    /// Whether the module at `(x, y)` is dark. Out-of-range coordinates are light.
    fn is_dark(&self, x: i32, y: i32) -> bool {
        let w = self.width as i32;
        if x < 0 || y < 0 || x >= w || y >= w {
            return false;
        }
        self.modules[(y * w + x) as usize] == Module::Dark
    }
}

/// [`Encoder`] backed by the `qrcode` crate.
#[derive(Clone, Copy, Debug, Default)]
pub struct QrEngine;

impl QrEngine {
    pub fn new() -> Self {
        Self
    }

    /// Renders the symbol as block characters for a terminal, surrounded by a
    /// four-module quiet zone. Uses Unix newlines.
    pub fn render_text(&self, payload: &str, style: &RenderStyle) -> Result<String> {
        let matrix = Matrix::encode(payload, style)?;
        let size = matrix.width as i32;
        let mut result = String::new();
        for y in -TEXT_BORDER..size + TEXT_BORDER {
            for x in -TEXT_BORDER..size + TEXT_BORDER {
                let c = if matrix.is_dark(x, y) { '█' } else { ' ' };
                result.push(c);
                result.push(c);
            }
            result.push('\n');
        }
        Ok(result)
    }
}

impl Encoder for QrEngine {
    fn render_to_surface(&self, surface: &mut Surface, payload: &str, style: &RenderStyle) -> Result<()> {
        let matrix = Matrix::encode(payload, style)?;
        let modules = matrix.width + 2 * style.margin();

        // Stretch the symbol to the requested size; below one pixel per module
        // fall back to a fixed scale so the symbol stays readable.
        let side = if style.size >= modules { style.size } else { modules * FALLBACK_SCALE };
        surface.resize(side, side);

        let margin = style.margin() as i64;
        for y in 0..side {
            for x in 0..side {
                let mx = (u64::from(x) * u64::from(modules) / u64::from(side)) as i64 - margin;
                let my = (u64::from(y) * u64::from(modules) / u64::from(side)) as i64 - margin;
                let color = if matrix.is_dark(mx as i32, my as i32) {
                    style.foreground
                } else {
                    style.background
                };
                surface.put_pixel(x, y, color);
            }
        }

        debug!(side, modules, "rasterized QR symbol");
        Ok(())
    }

    fn render_svg(&self, payload: &str, style: &RenderStyle) -> Result<String> {
        let matrix = Matrix::encode(payload, style)?;
        let border = style.margin() as i32;
        let dimension = matrix.width as i32 + border * 2;

        let mut result = String::new();
        result += "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";
        result += &format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" version=\"1.1\" width=\"{0}\" height=\"{0}\" viewBox=\"0 0 {1} {1}\" stroke=\"none\" shape-rendering=\"crispEdges\">\n",
            style.size, dimension
        );
        result += &format!(
            "\t<rect width=\"100%\" height=\"100%\" fill=\"{}\"{}/>\n",
            style.background.to_hex_rgb(),
            opacity_attr(style.background.alpha_fraction())
        );
        result += "\t<path d=\"";
        let mut first = true;
        for y in 0..matrix.width as i32 {
            for x in 0..matrix.width as i32 {
                if matrix.is_dark(x, y) {
                    if !first {
                        result += " ";
                    }
                    first = false;
                    result += &format!("M{},{}h1v1h-1z", x + border, y + border);
                }
            }
        }
        result += &format!(
            "\" fill=\"{}\"{}/>\n",
            style.foreground.to_hex_rgb(),
            opacity_attr(style.foreground.alpha_fraction())
        );
        result += "</svg>\n";
        Ok(result)
    }
}

fn opacity_attr(alpha: f32) -> String {
    if alpha >= 1.0 {
        String::new()
    } else {
        format!(" fill-opacity=\"{:.2}\"", alpha)
    }
}
