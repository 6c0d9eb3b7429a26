//! Render scale computation
//!
//! The render scale is pixels-per-PDF-point: a fit-to-width base derived
//! from the viewport, multiplied by the user zoom factor.

/// Largest pixel dimension we will ask the engine to rasterize.
/// Terminal graphics protocols reject anything bigger.
pub const MAX_RENDER_DIMENSION: f32 = 10_000.0;

/// Horizontal padding kept around the page inside the viewport.
const FIT_PADDING_PX: f32 = 16.0;

/// Lower bound on the fit target, for degenerate viewports.
const MIN_TARGET_WIDTH_PX: f32 = 100.0;

/// Pre-computed rasterization parameters for a page.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FitSpec {
    /// Output width in pixels.
    pub width_px: u32,
    /// Output height in pixels.
    pub height_px: u32,
    /// Effective scale in pixels per PDF point.
    pub scale: f32,
}

impl FitSpec {
    /// Compute the output size and scale for a page.
    ///
    /// `page_size_pt` is the page's width and height in PDF points,
    /// `viewport_width_px` the pixel width available for display.
    #[must_use]
    pub fn compute(page_size_pt: (f32, f32), viewport_width_px: f32, zoom: f32) -> Self {
        let (page_w, page_h) = page_size_pt;
        let page_w = page_w.max(1.0);
        let page_h = page_h.max(1.0);

        let target_w = (viewport_width_px - FIT_PADDING_PX * 2.0).max(MIN_TARGET_WIDTH_PX);
        let base = target_w / page_w;
        let mut scale = base * Zoom::clamp_factor(zoom);

        let mut out_w = page_w * scale;
        let mut out_h = page_h * scale;
        let max_dim = out_w.max(out_h);
        if max_dim > MAX_RENDER_DIMENSION {
            let reduction = MAX_RENDER_DIMENSION / max_dim;
            scale *= reduction;
            out_w *= reduction;
            out_h *= reduction;
        }

        Self {
            width_px: out_w.round().max(1.0) as u32,
            height_px: out_h.round().max(1.0) as u32,
            scale,
        }
    }
}

/// User zoom state for the viewer.
#[derive(Clone, Copy, Debug)]
pub struct Zoom {
    factor: f32,
}

impl Default for Zoom {
    fn default() -> Self {
        Self { factor: 1.0 }
    }
}

impl Zoom {
    /// Zoom in multiplier per step.
    pub const ZOOM_IN_RATE: f32 = 1.1;
    /// Zoom out multiplier per step.
    pub const ZOOM_OUT_RATE: f32 = 0.9;
    /// Minimum allowed zoom factor.
    pub const MIN_FACTOR: f32 = 0.1;
    /// Maximum allowed zoom factor.
    pub const MAX_FACTOR: f32 = 10.0;

    #[must_use]
    pub fn factor(&self) -> f32 {
        self.factor
    }

    pub fn step_in(&mut self) {
        self.factor = Self::clamp_factor(self.factor * Self::ZOOM_IN_RATE);
    }

    pub fn step_out(&mut self) {
        self.factor = Self::clamp_factor(self.factor * Self::ZOOM_OUT_RATE);
    }

    pub fn reset(&mut self) {
        self.factor = 1.0;
    }

    /// Clamp to the valid range, handling NaN/Inf.
    #[must_use]
    pub fn clamp_factor(factor: f32) -> f32 {
        if !factor.is_finite() {
            1.0
        } else {
            factor.clamp(Self::MIN_FACTOR, Self::MAX_FACTOR)
        }
    }
}
