//! Terminal image display
//!
//! Picks an output protocol from the environment and paints selection
//! overlays into the raw pixels before they are handed to an encoder.

pub mod halfblocks;
pub mod iterm2;
pub mod kitty;

use ratatui::{buffer::Buffer, layout::Rect, widgets::Widget};

use crate::select::PixelRect;

/// How page images reach the terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Protocol {
    /// Kitty graphics protocol (kitty, ghostty)
    Kitty,
    /// iTerm2 inline images (iTerm2, WezTerm, mintty)
    Iterm2,
    /// Unicode half-block cells, works everywhere
    Halfblocks,
}

/// Detect the best protocol for the current terminal.
#[must_use]
pub fn detect_protocol() -> Protocol {
    if std::env::var_os("KITTY_WINDOW_ID").is_some() {
        return Protocol::Kitty;
    }
    let term = std::env::var("TERM").unwrap_or_default();
    if term.contains("kitty") || term.contains("ghostty") {
        return Protocol::Kitty;
    }
    let term_program = std::env::var("TERM_PROGRAM").unwrap_or_default();
    if term_program.contains("iTerm")
        || term_program.contains("WezTerm")
        || term_program.contains("mintty")
    {
        return Protocol::Iterm2;
    }
    Protocol::Halfblocks
}

/// Terminal cell dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CellGeometry {
    pub width_px: u16,
    pub height_px: u16,
}

impl CellGeometry {
    /// Used when the terminal does not report pixel dimensions.
    pub const FALLBACK: Self = Self {
        width_px: 8,
        height_px: 16,
    };

    /// Ask the terminal for its window size in pixels and derive the
    /// cell size. Falls back to a common 8x16 raster.
    #[must_use]
    pub fn probe() -> Self {
        match crossterm::terminal::window_size() {
            Ok(size) if size.columns > 0 && size.rows > 0 && size.width > 0 && size.height > 0 => {
                Self {
                    width_px: (size.width / size.columns).max(1),
                    height_px: (size.height / size.rows).max(1),
                }
            }
            _ => Self::FALLBACK,
        }
    }

    /// Cells needed to place an image of the given pixel size.
    #[must_use]
    pub fn cells_for(&self, width_px: u32, height_px: u32) -> (u16, u16) {
        let w = width_px.div_ceil(u32::from(self.width_px));
        let h = height_px.div_ceil(u32::from(self.height_px));
        (w.min(u32::from(u16::MAX)) as u16, h.min(u32::from(u16::MAX)) as u16)
    }
}

/// Borrowed RGB frame handed to protocol encoders.
#[derive(Clone, Copy, Debug)]
pub struct RgbFrame<'a> {
    /// Raw RGB data, 3 bytes per pixel
    pub pixels: &'a [u8],
    pub width: u32,
    pub height: u32,
}

/// Paint a rectangle outline into an RGB pixel buffer.
///
/// Used for the selection rectangle: the overlay is baked into the
/// pixels so every protocol (including half-blocks) shows it.
pub fn paint_rect_outline(
    pixels: &mut [u8],
    width: u32,
    height: u32,
    rect: PixelRect,
    rgb: (u8, u8, u8),
    thickness: u32,
) {
    if width == 0 || height == 0 {
        return;
    }
    let x0 = rect.x0.min(width);
    let y0 = rect.y0.min(height);
    let x1 = rect.x1.min(width);
    let y1 = rect.y1.min(height);
    if x0 >= x1 || y0 >= y1 {
        return;
    }

    let mut set_px = |x: u32, y: u32| {
        let idx = ((y * width + x) * 3) as usize;
        if idx + 2 < pixels.len() {
            pixels[idx] = rgb.0;
            pixels[idx + 1] = rgb.1;
            pixels[idx + 2] = rgb.2;
        }
    };

    for t in 0..thickness {
        let top = y0.saturating_add(t);
        let bottom = y1.saturating_sub(1 + t);
        if top <= bottom {
            for x in x0..x1 {
                set_px(x, top);
                set_px(x, bottom);
            }
        }
        let left = x0.saturating_add(t);
        let right = x1.saturating_sub(1 + t);
        if left <= right {
            for y in y0..y1 {
                set_px(left, y);
                set_px(right, y);
            }
        }
    }
}

/// A widget that marks an area as containing an image.
///
/// Sets `skip=true` on all cells in the area, telling ratatui to
/// preserve whatever the graphics protocol already placed there.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageRegion;

impl Widget for ImageRegion {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let buffer_area = buf.area();
        let x_end = area.x.saturating_add(area.width).min(buffer_area.right());
        let y_end = area.y.saturating_add(area.height).min(buffer_area.bottom());
        let x_start = area.x.max(buffer_area.left());
        let y_start = area.y.max(buffer_area.top());

        for y in y_start..y_end {
            for x in x_start..x_end {
                buf[(x, y)].set_skip(true);
            }
        }
    }
}
