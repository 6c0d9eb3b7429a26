//! Region selection state over the rendered page image
//!
//! Points arrive in image-pixel coordinates (top-left origin, same
//! orientation as the raster). The finished rectangle maps to PDF point
//! space by dividing through the render scale.

/// Smallest scale we will divide by when mapping back to PDF points.
const MIN_SCALE: f32 = 1e-6;

/// A point on the rendered page image, in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PixelPoint {
    pub x: u32,
    pub y: u32,
}

/// Normalized, clamped selection rectangle in image pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelRect {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl PixelRect {
    #[must_use]
    pub fn width(&self) -> u32 {
        self.x1.saturating_sub(self.x0)
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.y1.saturating_sub(self.y0)
    }

    /// Map to PDF point space: `rect_pdf = rect_px / scale`.
    ///
    /// Orientation is preserved (top-left origin in both spaces).
    #[must_use]
    pub fn to_pdf(&self, scale: f32) -> PdfRect {
        let px_to_pt = 1.0 / scale.max(MIN_SCALE);
        PdfRect {
            x0: self.x0 as f32 * px_to_pt,
            y0: self.y0 as f32 * px_to_pt,
            x1: self.x1 as f32 * px_to_pt,
            y1: self.y1 as f32 * px_to_pt,
        }
    }
}

/// Rectangle in PDF points, top-left origin.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PdfRect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl PdfRect {
    #[must_use]
    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    #[must_use]
    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }
}

/// Mouse-driven selection over the page image.
#[derive(Clone, Debug, Default)]
pub struct SelectionState {
    start: Option<PixelPoint>,
    end: Option<PixelPoint>,
    dragging: bool,
}

impl SelectionState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a new selection at a point inside the image.
    pub fn start_at(&mut self, point: PixelPoint) {
        self.start = Some(point);
        self.end = Some(point);
        self.dragging = true;
    }

    /// Update the moving corner while the button is held.
    pub fn update_end(&mut self, point: PixelPoint) {
        if self.dragging {
            self.end = Some(point);
        }
    }

    /// Finalize the selection on button release.
    pub fn finish(&mut self) {
        self.dragging = false;
    }

    pub fn clear(&mut self) {
        self.start = None;
        self.end = None;
        self.dragging = false;
    }

    #[must_use]
    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    #[must_use]
    pub fn has_selection(&self) -> bool {
        self.start.is_some() && self.end.is_some()
    }

    /// Normalized rectangle clamped to the image bounds.
    ///
    /// Returns `None` until both corners exist or when the clamped area
    /// is smaller than one pixel in either dimension.
    #[must_use]
    pub fn rect(&self, image_width: u32, image_height: u32) -> Option<PixelRect> {
        let (start, end) = (self.start?, self.end?);

        let x0 = start.x.min(end.x).min(image_width);
        let y0 = start.y.min(end.y).min(image_height);
        let x1 = start.x.max(end.x).min(image_width);
        let y1 = start.y.max(end.y).min(image_height);

        if x1 - x0 < 1 || y1 - y0 < 1 {
            return None;
        }
        Some(PixelRect { x0, y0, x1, y1 })
    }
}
