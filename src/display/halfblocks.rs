//! Unicode half-block fallback
//!
//! Each terminal cell shows two vertically stacked pixels via `▀` with
//! foreground = upper pixel and background = lower pixel. Coarse, but it
//! works in any terminal and needs no escape-sequence round trips.

use ratatui::{buffer::Buffer, layout::Rect, style::Color, widgets::Widget};

use super::RgbFrame;

/// Renders an RGB frame into the buffer as half-block cells.
pub struct Halfblocks<'a> {
    frame: RgbFrame<'a>,
}

impl<'a> Halfblocks<'a> {
    #[must_use]
    pub fn new(frame: RgbFrame<'a>) -> Self {
        Self { frame }
    }
}

impl Widget for Halfblocks<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 || self.frame.width == 0 || self.frame.height == 0 {
            return;
        }

        let rows_px = u32::from(area.height) * 2;
        let cols_px = u32::from(area.width);

        for cy in 0..area.height {
            for cx in 0..area.width {
                let x = area.x + cx;
                let y = area.y + cy;
                if !buf.area().contains(ratatui::layout::Position::new(x, y)) {
                    continue;
                }

                let src_x = u32::from(cx) * self.frame.width / cols_px;
                let top_y = u32::from(cy) * 2 * self.frame.height / rows_px;
                let bottom_y = (u32::from(cy) * 2 + 1) * self.frame.height / rows_px;

                let (tr, tg, tb) = self.pixel(src_x, top_y);
                let (br, bg, bb) = self.pixel(src_x, bottom_y);

                buf[(x, y)]
                    .set_symbol("▀")
                    .set_fg(Color::Rgb(tr, tg, tb))
                    .set_bg(Color::Rgb(br, bg, bb));
            }
        }
    }
}

impl Halfblocks<'_> {
    fn pixel(&self, x: u32, y: u32) -> (u8, u8, u8) {
        let x = x.min(self.frame.width.saturating_sub(1));
        let y = y.min(self.frame.height.saturating_sub(1));
        let idx = ((y * self.frame.width + x) * 3) as usize;
        match self.frame.pixels.get(idx..idx + 3) {
            Some(px) => (px[0], px[1], px[2]),
            None => (0, 0, 0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_and_bottom_pixels_map_to_fg_and_bg() {
        // 1x2 image: red above blue
        let pixels = vec![255, 0, 0, 0, 0, 255];
        let frame = RgbFrame {
            pixels: &pixels,
            width: 1,
            height: 2,
        };

        let mut buf = Buffer::empty(Rect::new(0, 0, 1, 1));
        Halfblocks::new(frame).render(Rect::new(0, 0, 1, 1), &mut buf);

        let cell = &buf[(0, 0)];
        assert_eq!(cell.symbol(), "▀");
        assert_eq!(cell.fg, Color::Rgb(255, 0, 0));
        assert_eq!(cell.bg, Color::Rgb(0, 0, 255));
    }

    #[test]
    fn render_outside_buffer_does_not_panic() {
        let pixels = vec![9u8; 4 * 4 * 3];
        let frame = RgbFrame {
            pixels: &pixels,
            width: 4,
            height: 4,
        };
        let mut buf = Buffer::empty(Rect::new(0, 0, 2, 2));
        Halfblocks::new(frame).render(Rect::new(0, 0, 10, 10), &mut buf);
        assert_eq!(buf[(1, 1)].fg, Color::Rgb(9, 9, 9));
    }

    #[test]
    fn empty_frame_is_a_noop() {
        let frame = RgbFrame {
            pixels: &[],
            width: 0,
            height: 0,
        };
        let mut buf = Buffer::empty(Rect::new(0, 0, 2, 2));
        Halfblocks::new(frame).render(Rect::new(0, 0, 2, 2), &mut buf);
        assert_ne!(buf[(0, 0)].symbol(), "▀");
    }
}
