//! LRU cache for rasterized pages

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;

use super::request::{PageImage, RasterParams};

/// Cache key for rasterized pages
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Page number
    pub page: usize,
    /// Viewport width the raster was fit to
    pub viewport_width_px: u32,
    /// Zoom factor (stored as millionths for stable hashing)
    pub zoom_millionths: u32,
}

impl CacheKey {
    /// Create a cache key from raster parameters
    #[must_use]
    pub fn from_params(page: usize, params: &RasterParams) -> Self {
        Self {
            page,
            viewport_width_px: params.viewport_width_px,
            zoom_millionths: (params.zoom * 1_000_000.0) as u32,
        }
    }
}

/// LRU cache for rendered page data
pub struct PageCache {
    cache: LruCache<CacheKey, Arc<PageImage>>,
}

impl PageCache {
    /// Create a new cache with the given capacity
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(1).expect("1 is non-zero")),
            ),
        }
    }

    /// Get a cached page, promoting it in the LRU order
    #[must_use]
    pub fn get(&mut self, key: &CacheKey) -> Option<Arc<PageImage>> {
        self.cache.get(key).cloned()
    }

    /// Check if a key is in the cache without promoting it
    #[must_use]
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.cache.contains(key)
    }

    /// Insert a page into the cache, returning an Arc to the data
    pub fn insert(&mut self, key: CacheKey, data: PageImage) -> Arc<PageImage> {
        let arc = Arc::new(data);
        self.cache.put(key, arc.clone());
        arc
    }

    /// Clear all cached pages
    pub fn invalidate_all(&mut self) {
        self.cache.clear();
    }

    /// Number of cached pages
    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Check if cache is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_params() -> RasterParams {
        RasterParams {
            viewport_width_px: 1200,
            zoom: 1.0,
        }
    }

    fn test_page_image(page: usize) -> PageImage {
        PageImage {
            pixels: vec![0; 300],
            width_px: 10,
            height_px: 10,
            page_num: page,
            scale: 1.0,
            page_width_pt: 612.0,
            page_height_pt: 792.0,
        }
    }

    #[test]
    fn cache_insert_and_get() {
        let mut cache = PageCache::new(10);
        let params = test_params();
        let key = CacheKey::from_params(0, &params);

        cache.insert(key.clone(), test_page_image(0));

        assert!(cache.contains(&key));
        assert!(cache.get(&key).is_some());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn cache_lru_eviction() {
        let mut cache = PageCache::new(2);
        let params = test_params();

        for i in 0..3 {
            let key = CacheKey::from_params(i, &params);
            cache.insert(key, test_page_image(i));
        }

        assert_eq!(cache.len(), 2);
        assert!(!cache.contains(&CacheKey::from_params(0, &params)));
        assert!(cache.contains(&CacheKey::from_params(1, &params)));
        assert!(cache.contains(&CacheKey::from_params(2, &params)));
    }

    #[test]
    fn zoom_change_is_a_different_key() {
        let params = test_params();
        let zoomed = RasterParams {
            zoom: 1.1,
            ..params
        };
        assert_ne!(
            CacheKey::from_params(0, &params),
            CacheKey::from_params(0, &zoomed)
        );
    }

    #[test]
    fn float_jitter_below_quantum_shares_a_key() {
        let params = test_params();
        let jittered = RasterParams {
            zoom: 1.0 + 1e-9,
            ..params
        };
        assert_eq!(
            CacheKey::from_params(0, &params),
            CacheKey::from_params(0, &jittered)
        );
    }

    #[test]
    fn cache_invalidate_all() {
        let mut cache = PageCache::new(10);
        let params = test_params();

        for i in 0..5 {
            cache.insert(CacheKey::from_params(i, &params), test_page_image(i));
        }

        assert_eq!(cache.len(), 5);
        cache.invalidate_all();
        assert!(cache.is_empty());
    }
}
