//! Render request and response types

use std::sync::Arc;

use crate::select::PdfRect;
use crate::svg::VectorOptions;

/// Unique identifier for render requests
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RequestId(pub u64);

impl RequestId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

/// Parameters for rasterizing a page preview
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RasterParams {
    /// Viewport width available for the page image, in pixels
    pub viewport_width_px: u32,
    /// User zoom multiplier on top of the fit-to-width base scale
    pub zoom: f32,
}

/// A rasterized page ready for terminal display
#[derive(Clone)]
pub struct PageImage {
    /// Raw RGB pixel data (3 bytes per pixel)
    pub pixels: Vec<u8>,
    /// Image width in pixels
    pub width_px: u32,
    /// Image height in pixels
    pub height_px: u32,
    /// Page number (0-indexed)
    pub page_num: usize,
    /// Scale used for rendering, in pixels per PDF point
    pub scale: f32,
    /// Page width in PDF points
    pub page_width_pt: f32,
    /// Page height in PDF points
    pub page_height_pt: f32,
}

impl std::fmt::Debug for PageImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageImage")
            .field("page_num", &self.page_num)
            .field("width_px", &self.width_px)
            .field("height_px", &self.height_px)
            .field("scale", &self.scale)
            .finish_non_exhaustive()
    }
}

/// Request sent to render workers
#[derive(Debug)]
pub enum RenderRequest {
    /// Rasterize a page (high priority)
    Page {
        id: RequestId,
        page: usize,
        params: RasterParams,
    },

    /// Rasterize a page ahead of navigation (low priority)
    Prefetch {
        id: RequestId,
        page: usize,
        params: RasterParams,
    },

    /// Produce the exported SVG for a page region
    ExportSvg {
        id: RequestId,
        page: usize,
        clip: PdfRect,
        options: VectorOptions,
    },

    /// Shutdown the worker
    Shutdown,
}

/// Errors from render workers
#[derive(Debug, thiserror::Error)]
pub enum WorkerFault {
    #[error("PDF engine: {0}")]
    Pdf(#[from] mupdf::error::Error),

    #[error("{detail}")]
    Generic { detail: String },
}

impl WorkerFault {
    pub fn generic(msg: impl Into<String>) -> Self {
        Self::Generic { detail: msg.into() }
    }
}

/// Response from render workers
#[derive(Debug)]
pub enum RenderResponse {
    /// Rasterized page data
    Page {
        id: RequestId,
        page: usize,
        data: Arc<PageImage>,
    },

    /// Exported SVG document
    Svg { id: RequestId, svg: String },

    /// Error during rendering
    Error { id: RequestId, error: WorkerFault },
}
