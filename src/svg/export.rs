//! Builds the exported SVG for a page region
//!
//! The engine renders the whole page as vector art; the region is cut out
//! by rewriting the root element's viewport so the document is sized to
//! the selection and its origin sits at the selection's top-left corner.
//! Text preservation appends a selectable text layer built from the
//! structured text of the page, which the kerning pass can then simplify.

use mupdf::text_page::TextBlockType;
use mupdf::{Matrix, Page, TextPageFlags};
use regex::Regex;

use super::passes::{self, RewriteOptions};
use crate::pdf::WorkerFault;
use crate::select::PdfRect;

/// Options controlling a vector export.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VectorOptions {
    /// Keep text selectable instead of leaving it as outlines only.
    pub preserve_text: bool,
    /// Collapse per-glyph positioning (only meaningful with `preserve_text`).
    pub merge_kerning: bool,
    /// Drop white background rects/paths.
    pub strip_background: bool,
    /// Convert all colors to luminance gray.
    pub grayscale: bool,
}

impl Default for VectorOptions {
    fn default() -> Self {
        Self {
            preserve_text: true,
            merge_kerning: false,
            strip_background: false,
            grayscale: false,
        }
    }
}

/// Render the clipped region of `page` to a standalone SVG string.
pub fn render_region(
    page: &Page,
    clip: &PdfRect,
    options: &VectorOptions,
) -> Result<String, WorkerFault> {
    if clip.width() <= 0.0 || clip.height() <= 0.0 {
        return Err(WorkerFault::generic("Selection has zero size"));
    }

    let svg = page.to_svg(&Matrix::IDENTITY)?;
    let mut svg = crop_viewport(&svg, clip);

    if options.preserve_text {
        let overlay = text_overlay(page, clip)?;
        if !overlay.is_empty() {
            if let Some(pos) = svg.rfind("</svg>") {
                svg.insert_str(pos, &overlay);
            }
        }
    }

    let rewrites = RewriteOptions {
        merge_kerning: options.preserve_text && options.merge_kerning,
        strip_background: options.strip_background,
        grayscale: options.grayscale,
    };
    Ok(passes::apply(&svg, &rewrites))
}

/// Rewrite the root element so only `clip` is visible.
///
/// width/height become the selection's size in points and the viewBox is
/// moved to the selection rectangle, so the visible origin is the
/// selection's top-left corner. Content outside the viewport is clipped
/// by the SVG viewport itself.
fn crop_viewport(svg: &str, clip: &PdfRect) -> String {
    let root = Regex::new(r"<svg[^>]*>").expect("Failed to compile svg root regex");
    let Some(m) = root.find(svg) else {
        return svg.to_string();
    };

    let mut tag = m.as_str().to_string();
    tag = set_attr(&tag, "width", &format!("{}pt", clip.width()));
    tag = set_attr(&tag, "height", &format!("{}pt", clip.height()));
    tag = set_attr(
        &tag,
        "viewBox",
        &format!("{} {} {} {}", clip.x0, clip.y0, clip.width(), clip.height()),
    );

    let mut out = String::with_capacity(svg.len());
    out.push_str(&svg[..m.start()]);
    out.push_str(&tag);
    out.push_str(&svg[m.end()..]);
    out
}

/// Replace `name="..."` inside an element tag, or insert it when absent.
fn set_attr(tag: &str, name: &str, value: &str) -> String {
    let attr = Regex::new(&format!(r#" {name}="[^"]*""#))
        .expect("Failed to compile attribute regex");
    let replacement = format!(r#" {name}="{value}""#);
    if attr.is_match(tag) {
        attr.replace(tag, regex::NoExpand(&replacement)).into_owned()
    } else if let Some(body) = tag.strip_suffix('>') {
        format!("{body}{replacement}>")
    } else {
        tag.to_string()
    }
}

/// Build the selectable text layer for lines intersecting `clip`.
///
/// Each line becomes one `<text>` element with per-glyph x positions and
/// the line baseline as y, invisible but selectable on top of the
/// outline-rendered glyphs underneath.
fn text_overlay(page: &Page, clip: &PdfRect) -> Result<String, WorkerFault> {
    let text_page = page.to_text_page(TextPageFlags::empty())?;
    let mut runs = String::new();

    for block in text_page.blocks() {
        if block.r#type() != TextBlockType::Text {
            continue;
        }
        for line in block.lines() {
            let bbox = line.bounds();
            if bbox.x1 < clip.x0
                || bbox.x0 > clip.x1
                || bbox.y1 < clip.y0
                || bbox.y0 > clip.y1
            {
                continue;
            }

            let mut xs = String::new();
            let mut content = String::new();
            let mut baseline = None;
            let mut font_size: f32 = 0.0;

            for ch in line.chars() {
                let Some(c) = ch.char() else { continue };
                let origin = ch.origin();
                if baseline.is_none() {
                    baseline = Some(origin.y);
                }
                if !xs.is_empty() {
                    xs.push(' ');
                }
                xs.push_str(&format!("{:.1}", origin.x));
                push_escaped(&mut content, c);
                let size = ch.size();
                if size.is_finite() {
                    font_size = font_size.max(size);
                }
            }

            if let Some(y) = baseline {
                if !content.is_empty() {
                    runs.push_str(&format!(
                        "<text x=\"{xs}\" y=\"{y:.1}\" font-size=\"{font_size:.1}\">{content}</text>\n"
                    ));
                }
            }
        }
    }

    if runs.is_empty() {
        Ok(String::new())
    } else {
        Ok(format!("<g fill=\"#000000\" fill-opacity=\"0\">\n{runs}</g>\n"))
    }
}

fn push_escaped(out: &mut String, c: char) {
    match c {
        '&' => out.push_str("&amp;"),
        '<' => out.push_str("&lt;"),
        '>' => out.push_str("&gt;"),
        _ => out.push(c),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROOT: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" version="1.1" width="612pt" height="792pt" viewBox="0 0 612 792">"#;

    fn clip() -> PdfRect {
        PdfRect {
            x0: 100.0,
            y0: 200.0,
            x1: 300.0,
            y1: 250.0,
        }
    }

    #[test]
    fn crop_rewrites_viewport_to_selection() {
        let svg = format!("{ROOT}\n<rect x=\"0\" y=\"0\"/>\n</svg>");
        let out = crop_viewport(&svg, &clip());
        assert!(out.contains(r#"width="200pt""#));
        assert!(out.contains(r#"height="50pt""#));
        assert!(out.contains(r#"viewBox="100 200 200 50""#));
        // body untouched
        assert!(out.contains(r#"<rect x="0" y="0"/>"#));
    }

    #[test]
    fn crop_without_root_is_noop() {
        let svg = "<g><rect/></g>";
        assert_eq!(crop_viewport(svg, &clip()), svg);
    }

    #[test]
    fn set_attr_inserts_when_missing() {
        let tag = r#"<svg xmlns="x">"#;
        let out = set_attr(tag, "viewBox", "1 2 3 4");
        assert_eq!(out, r#"<svg xmlns="x" viewBox="1 2 3 4">"#);
    }

    #[test]
    fn set_attr_replaces_existing() {
        let tag = r#"<svg width="612pt" height="792pt">"#;
        let out = set_attr(tag, "width", "10pt");
        assert_eq!(out, r#"<svg width="10pt" height="792pt">"#);
    }

    #[test]
    fn escape_covers_markup_characters() {
        let mut s = String::new();
        for c in "a<b>&".chars() {
            push_escaped(&mut s, c);
        }
        assert_eq!(s, "a&lt;b&gt;&amp;");
    }
}
