//! Render service - manages worker threads and the page cache

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use flume::{Receiver, Sender};
use mupdf::Document;

use super::cache::{CacheKey, PageCache};
use super::request::{
    PageImage, RasterParams, RenderRequest, RenderResponse, RequestId, WorkerFault,
};
use super::worker::render_worker;
use crate::select::PdfRect;
use crate::svg::VectorOptions;

pub const DEFAULT_WORKERS: usize = 2;
pub const DEFAULT_CACHE_SIZE: usize = 16;

/// Document metadata loaded up front
#[derive(Clone, Debug)]
pub struct DocumentInfo {
    pub page_count: usize,
    pub title: Option<String>,
}

/// Events the UI consumes after draining worker responses
#[derive(Debug)]
pub enum ServiceEvent {
    /// A rasterized page is ready for display
    Page { page: usize, data: Arc<PageImage> },
    /// An exported SVG document is ready
    Svg(String),
    /// A request failed
    Failed(String),
}

/// Manages PDF rendering with worker threads and caching
pub struct RenderService {
    request_tx: Sender<RenderRequest>,
    response_rx: Receiver<RenderResponse>,
    next_request_id: u64,
    cache: Arc<Mutex<PageCache>>,
    num_workers: usize,
    doc_info: Option<DocumentInfo>,
}

impl RenderService {
    /// Create a new render service with default configuration
    #[must_use]
    pub fn open(doc_path: PathBuf) -> Self {
        Self::with_config(doc_path, DEFAULT_WORKERS, DEFAULT_CACHE_SIZE)
    }

    /// Create a new render service with custom configuration
    #[must_use]
    pub fn with_config(doc_path: PathBuf, num_workers: usize, cache_size: usize) -> Self {
        let cache = Arc::new(Mutex::new(PageCache::new(cache_size)));

        // flume gives us MPMC channels: multiple workers pull from one
        // shared request queue, which std/tokio mpsc receivers cannot do.
        let (request_tx, request_rx) = flume::unbounded();
        let (response_tx, response_rx) = flume::unbounded();

        // Each worker opens its own Document; the engine handle is not Sync.
        for _ in 0..num_workers.max(1) {
            let path = doc_path.clone();
            let rx = request_rx.clone();
            let tx = response_tx.clone();
            let cache_clone = cache.clone();

            std::thread::spawn(move || {
                render_worker(&path, rx, tx, cache_clone);
            });
        }

        let doc_info = Self::load_document_info(&doc_path);

        Self {
            request_tx,
            response_rx,
            next_request_id: 1,
            cache,
            num_workers: num_workers.max(1),
            doc_info,
        }
    }

    fn load_document_info(doc_path: &Path) -> Option<DocumentInfo> {
        let doc = Document::open(doc_path.to_string_lossy().as_ref()).ok()?;
        let page_count = doc.page_count().ok()? as usize;

        if page_count == 0 {
            return None;
        }

        let title = doc
            .metadata(mupdf::MetadataName::Title)
            .ok()
            .filter(|t| !t.is_empty());

        Some(DocumentInfo { page_count, title })
    }

    /// Get document metadata
    #[must_use]
    pub fn document_info(&self) -> Option<&DocumentInfo> {
        self.doc_info.as_ref()
    }

    #[must_use]
    pub fn page_count(&self) -> usize {
        self.doc_info.as_ref().map_or(0, |i| i.page_count)
    }

    /// Request a page raster at the given parameters
    pub fn request_page(&mut self, page: usize, params: RasterParams) {
        let id = self.next_id();
        log::debug!("request page {page} viewport={} zoom={}", params.viewport_width_px, params.zoom);
        let _ = self.request_tx.send(RenderRequest::Page { id, page, params });
    }

    /// Queue low-priority rasters for the pages adjacent to `page`
    pub fn prefetch_neighbors(&mut self, page: usize, params: RasterParams) {
        let count = self.page_count();
        let neighbors = [page.checked_sub(1), page.checked_add(1)];
        for neighbor in neighbors.into_iter().flatten() {
            if neighbor >= count {
                continue;
            }
            let key = CacheKey::from_params(neighbor, &params);
            let already_cached = self
                .cache
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .contains(&key);
            if already_cached {
                continue;
            }
            let id = self.next_id();
            let _ = self.request_tx.send(RenderRequest::Prefetch {
                id,
                page: neighbor,
                params,
            });
        }
    }

    /// Request the exported SVG for a page region
    pub fn request_export(&mut self, page: usize, clip: PdfRect, options: VectorOptions) {
        let id = self.next_id();
        log::info!(
            "export page {page} clip=({:.1},{:.1})-({:.1},{:.1})",
            clip.x0,
            clip.y0,
            clip.x1,
            clip.y1
        );
        let _ = self.request_tx.send(RenderRequest::ExportSvg {
            id,
            page,
            clip,
            options,
        });
    }

    /// Drain all pending worker responses into UI events
    pub fn drain_events(&mut self) -> Vec<ServiceEvent> {
        let mut events = Vec::new();
        while let Ok(response) = self.response_rx.try_recv() {
            match response {
                RenderResponse::Page { page, data, .. } => {
                    events.push(ServiceEvent::Page { page, data });
                }
                RenderResponse::Svg { svg, .. } => {
                    events.push(ServiceEvent::Svg(svg));
                }
                RenderResponse::Error { id, error } => {
                    log::warn!("render request {id:?} failed: {error}");
                    events.push(ServiceEvent::Failed(fault_message(&error)));
                }
            }
        }
        events
    }

    fn next_id(&mut self) -> RequestId {
        let id = RequestId::new(self.next_request_id);
        self.next_request_id += 1;
        id
    }
}

fn fault_message(fault: &WorkerFault) -> String {
    fault.to_string()
}

impl Drop for RenderService {
    fn drop(&mut self) {
        for _ in 0..self.num_workers {
            let _ = self.request_tx.send(RenderRequest::Shutdown);
        }
    }
}
