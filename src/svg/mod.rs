//! SVG export and post-processing

pub mod export;
pub mod passes;

pub use export::{VectorOptions, render_region};
pub use passes::{RewriteOptions, apply, desaturate, merge_kerning, strip_background};
