//! PDF render worker - runs in separate thread(s)

use std::path::Path;
use std::sync::{Arc, Mutex};

use flume::{Receiver, Sender};
use mupdf::{Colorspace, Document, Matrix, Pixmap};

use super::cache::{CacheKey, PageCache};
use super::request::{
    PageImage, RasterParams, RenderRequest, RenderResponse, RequestId, WorkerFault,
};
use super::scale::FitSpec;
use crate::select::PdfRect;
use crate::svg::{self, VectorOptions};

/// Main worker function - runs in a dedicated thread
pub fn render_worker(
    doc_path: &Path,
    requests: Receiver<RenderRequest>,
    responses: Sender<RenderResponse>,
    cache: Arc<Mutex<PageCache>>,
) {
    let doc = match Document::open(doc_path.to_string_lossy().as_ref()) {
        Ok(d) => d,
        Err(e) => {
            let _ = responses.send(RenderResponse::Error {
                id: RequestId::new(0),
                error: WorkerFault::Pdf(e),
            });
            return;
        }
    };

    for request in requests {
        match request {
            RenderRequest::Page { id, page, params }
            | RenderRequest::Prefetch { id, page, params } => {
                handle_page_request(&doc, id, page, &params, &cache, &responses);
            }

            RenderRequest::ExportSvg {
                id,
                page,
                clip,
                options,
            } => match export_svg(&doc, page, &clip, &options) {
                Ok(svg) => {
                    let _ = responses.send(RenderResponse::Svg { id, svg });
                }
                Err(e) => {
                    let _ = responses.send(RenderResponse::Error { id, error: e });
                }
            },

            RenderRequest::Shutdown => break,
        }
    }
}

fn handle_page_request(
    doc: &Document,
    id: RequestId,
    page_num: usize,
    params: &RasterParams,
    cache: &Arc<Mutex<PageCache>>,
    responses: &Sender<RenderResponse>,
) {
    let key = CacheKey::from_params(page_num, params);

    let cached = cache
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .get(&key);
    if let Some(cached) = cached {
        let _ = responses.send(RenderResponse::Page {
            id,
            page: page_num,
            data: Arc::clone(&cached),
        });
        return;
    }

    match render_page(doc, page_num, params) {
        Ok(data) => {
            let cached = cache
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .insert(key, data);
            let _ = responses.send(RenderResponse::Page {
                id,
                page: page_num,
                data: Arc::clone(&cached),
            });
        }
        Err(e) => {
            let _ = responses.send(RenderResponse::Error { id, error: e });
        }
    }
}

/// Rasterize a single page at the fit-to-width scale
pub fn render_page(
    doc: &Document,
    page_num: usize,
    params: &RasterParams,
) -> Result<PageImage, WorkerFault> {
    let page = doc.load_page(page_num as i32)?;

    let bounds = page.bounds()?;
    let page_size = (bounds.x1 - bounds.x0, bounds.y1 - bounds.y0);

    let spec = FitSpec::compute(page_size, params.viewport_width_px as f32, params.zoom);

    let rgb = Colorspace::device_rgb();
    let matrix = Matrix::new_scale(spec.scale, spec.scale);
    let pixmap = page.to_pixmap(&matrix, &rgb, false, false)?;

    let pixels = pixmap_to_rgb(&pixmap)?;

    Ok(PageImage {
        width_px: pixmap.width(),
        height_px: pixmap.height(),
        pixels,
        page_num,
        scale: spec.scale,
        page_width_pt: page_size.0,
        page_height_pt: page_size.1,
    })
}

/// Produce the exported SVG for a clipped page region
fn export_svg(
    doc: &Document,
    page_num: usize,
    clip: &PdfRect,
    options: &VectorOptions,
) -> Result<String, WorkerFault> {
    let page = doc.load_page(page_num as i32)?;
    svg::render_region(&page, clip, options)
}

fn pixmap_to_rgb(pixmap: &Pixmap) -> Result<Vec<u8>, WorkerFault> {
    let n = pixmap.n() as usize;
    if n < 3 {
        return Err(WorkerFault::generic(format!(
            "Unsupported pixmap format: {n} channels"
        )));
    }

    let width = pixmap.width() as usize;
    let height = pixmap.height() as usize;
    let stride = pixmap.stride() as usize;
    let samples = pixmap.samples();
    let row_bytes = width * n;
    let expected_min = stride.saturating_mul(height);
    if samples.len() < expected_min || row_bytes > stride {
        return Err(WorkerFault::generic("Pixmap buffer size mismatch"));
    }

    let mut out = Vec::with_capacity(width * height * 3);
    for y in 0..height {
        let row_start = y * stride;
        let row = &samples[row_start..row_start + row_bytes];
        if n == 3 {
            out.extend_from_slice(row);
        } else {
            for px in row.chunks_exact(n) {
                out.extend_from_slice(&px[..3]);
            }
        }
    }

    Ok(out)
}
