//! Rewrite passes over SVG source text
//!
//! Each pass is a stateless string transform: if nothing matches, the
//! document comes back unchanged. Passes compose in a fixed order
//! (kerning -> background -> grayscale) via [`apply`].

use regex::{Captures, Regex};

/// Which rewrite passes to run on an exported document.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RewriteOptions {
    /// Collapse per-glyph text positioning to a single anchor point.
    pub merge_kerning: bool,
    /// Drop white rectangles and large white paths.
    pub strip_background: bool,
    /// Rewrite all rgb()/hex colors to their luminance gray.
    pub grayscale: bool,
}

/// Run the enabled passes in order: kerning -> background -> grayscale.
#[must_use]
pub fn apply(svg: &str, opts: &RewriteOptions) -> String {
    let mut out = svg.to_string();
    if opts.merge_kerning {
        out = merge_kerning(&out);
    }
    if opts.strip_background {
        out = strip_background(&out);
    }
    if opts.grayscale {
        out = desaturate(&out);
    }
    out
}

/// Collapse per-glyph positioning on text elements.
///
/// A text run like `<text x="10 17 24" y="50 50 50">abc</text>` becomes
/// `<text x="10" y="50">abc</text>`. Elements with a single coordinate
/// pair are left alone, as is the text content itself. This trades glyph
/// placement fidelity for output that text editors can actually reflow.
#[must_use]
pub fn merge_kerning(svg: &str) -> String {
    let text_run = Regex::new(r#"<text[^>]*x="[^"]*\s[^"]*"[^>]*y="[^"]*"[^>]*>[^<]+</text>"#)
        .expect("Failed to compile text run regex");
    let x_attr = Regex::new(r#"x="([^"]+)""#).expect("Failed to compile x attribute regex");
    let y_attr = Regex::new(r#"y="([^"]+)""#).expect("Failed to compile y attribute regex");

    text_run
        .replace_all(svg, |caps: &Captures| {
            let tag = &caps[0];
            let first_x = x_attr
                .captures(tag)
                .and_then(|c| c.get(1))
                .and_then(|m| m.as_str().split_whitespace().next().map(str::to_string));
            let first_y = y_attr
                .captures(tag)
                .and_then(|c| c.get(1))
                .and_then(|m| m.as_str().split_whitespace().next().map(str::to_string));

            match (first_x, first_y) {
                (Some(x), Some(y)) => {
                    let rebuilt = x_attr.replace(tag, format!(r#"x="{x}""#).as_str());
                    y_attr
                        .replace(&rebuilt, format!(r#"y="{y}""#).as_str())
                        .into_owned()
                }
                _ => tag.to_string(),
            }
        })
        .into_owned()
}

/// Drop elements that look like page backgrounds.
///
/// A line is removed when it carries a pure-white fill and is either a
/// rect positioned at the origin, or a path whose data contains an H/V
/// command with a 3+ digit magnitude (a large axis-aligned shape). This
/// is a heuristic; anything it misses or over-matches stays acceptable.
#[must_use]
pub fn strip_background(svg: &str) -> String {
    let large_hv =
        Regex::new(r"[HV]\s*\d{3,}").expect("Failed to compile path dimension regex");

    let filtered: Vec<&str> = svg
        .split('\n')
        .filter(|line| {
            let is_white = line.contains(r##"fill="#ffffff""##)
                || line.contains(r##"fill="#fff""##)
                || line.contains(r#"fill="rgb(255,255,255)""#)
                || line.contains(r#"fill="white""#);
            if !is_white {
                return true;
            }
            if line.contains("<rect") && (line.contains(r#"x="0""#) || line.contains(r#"y="0""#)) {
                return false;
            }
            if line.contains("<path") && large_hv.is_match(line) {
                return false;
            }
            true
        })
        .collect();

    filtered.join("\n")
}

/// Rewrite every `rgb(r,g,b)` triple and 6-digit hex color to gray.
///
/// Uses the Rec. 601 luminance weights (0.299, 0.587, 0.114), truncated
/// to an integer. 3-digit hex and named colors other than white are not
/// converted.
#[must_use]
pub fn desaturate(svg: &str) -> String {
    let rgb_color = Regex::new(r"rgb\(([^)]+)\)").expect("Failed to compile rgb color regex");
    let hex_color =
        Regex::new(r"#([0-9a-fA-F]{6})").expect("Failed to compile hex color regex");

    let pass1 = rgb_color.replace_all(svg, |caps: &Captures| {
        let channels: Vec<&str> = caps[1].split(',').collect();
        if channels.len() != 3 {
            return caps[0].to_string();
        }
        let parsed: Option<Vec<u8>> = channels
            .iter()
            .map(|v| v.trim().parse::<u8>().ok())
            .collect();
        match parsed {
            Some(c) => {
                let gray = luminance(c[0], c[1], c[2]);
                format!("rgb({gray},{gray},{gray})")
            }
            None => caps[0].to_string(),
        }
    });

    hex_color
        .replace_all(&pass1, |caps: &Captures| {
            let hex = &caps[1];
            let r = u8::from_str_radix(&hex[0..2], 16);
            let g = u8::from_str_radix(&hex[2..4], 16);
            let b = u8::from_str_radix(&hex[4..6], 16);
            match (r, g, b) {
                (Ok(r), Ok(g), Ok(b)) => {
                    let gray = luminance(r, g, b);
                    format!("#{gray:02x}{gray:02x}{gray:02x}")
                }
                _ => caps[0].to_string(),
            }
        })
        .into_owned()
}

#[inline]
fn luminance(r: u8, g: u8, b: u8) -> u8 {
    (0.299 * f32::from(r) + 0.587 * f32::from(g) + 0.114 * f32::from(b)) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kerning_collapses_to_first_pair() {
        let svg = r#"<text x="10 17.5 24" y="50 50 50" font-size="12">abc</text>"#;
        let out = merge_kerning(svg);
        assert_eq!(
            out,
            r#"<text x="10" y="50" font-size="12">abc</text>"#
        );
    }

    #[test]
    fn kerning_leaves_single_pair_alone() {
        let svg = r#"<text x="10" y="50">abc</text>"#;
        assert_eq!(merge_kerning(svg), svg);
    }

    #[test]
    fn kerning_preserves_text_content() {
        let svg = r#"<text x="1 2 3" y="9">a b</text>"#;
        let out = merge_kerning(svg);
        assert!(out.contains(">a b<"));
        assert!(out.contains(r#"x="1""#));
    }

    #[test]
    fn kerning_handles_multiple_runs() {
        let svg = concat!(
            r#"<text x="1 2" y="5">ab</text>"#,
            "\n",
            r#"<text x="7 8 9" y="6">cde</text>"#
        );
        let out = merge_kerning(svg);
        assert!(out.contains(r#"<text x="1" y="5">ab</text>"#));
        assert!(out.contains(r#"<text x="7" y="6">cde</text>"#));
    }

    #[test]
    fn kerning_noop_without_text_elements() {
        let svg = r#"<rect x="0" y="0" width="10" height="10"/>"#;
        assert_eq!(merge_kerning(svg), svg);
    }

    #[test]
    fn background_drops_white_origin_rect() {
        let svg = "<rect x=\"0\" y=\"0\" width=\"612\" height=\"792\" fill=\"#ffffff\"/>\n<rect x=\"5\" y=\"5\" width=\"10\" height=\"10\" fill=\"#ff0000\"/>";
        let out = strip_background(svg);
        assert!(!out.contains("612"));
        assert!(out.contains("ff0000"));
    }

    #[test]
    fn background_keeps_white_rect_away_from_origin() {
        let svg = r#"<rect x="20" y="30" width="10" height="10" fill="#ffffff"/>"#;
        assert_eq!(strip_background(svg), svg);
    }

    #[test]
    fn background_drops_large_white_path() {
        let svg = "<path fill=\"white\" d=\"M 0 0 H 612 V 792 H 0 Z\"/>\n<path fill=\"white\" d=\"M 1 1 H 20 V 12\"/>";
        let out = strip_background(svg);
        assert!(!out.contains("612"));
        assert!(out.contains("H 20"));
    }

    #[test]
    fn background_matches_all_white_spellings() {
        for fill in [
            r##"fill="#ffffff""##,
            r##"fill="#fff""##,
            r#"fill="rgb(255,255,255)""#,
            r#"fill="white""#,
        ] {
            let svg = format!(r#"<rect x="0" y="4" width="9" height="9" {fill}/>"#);
            assert_eq!(strip_background(&svg), "", "fill spelling: {fill}");
        }
    }

    #[test]
    fn background_keeps_colored_origin_rect() {
        let svg = r#"<rect x="0" y="0" width="612" height="792" fill="#112233"/>"#;
        assert_eq!(strip_background(svg), svg);
    }

    #[test]
    fn grayscale_converts_rgb_triples() {
        // 0.299*255 + 0.587*0 + 0.114*0 = 76.245 -> 76
        let out = desaturate(r#"fill="rgb(255,0,0)""#);
        assert_eq!(out, r#"fill="rgb(76,76,76)""#);
    }

    #[test]
    fn grayscale_converts_hex_colors() {
        // #ff0000 -> gray 76 -> #4c4c4c
        let out = desaturate(r##"stroke="#FF0000""##);
        assert_eq!(out, r##"stroke="#4c4c4c""##);
    }

    #[test]
    fn grayscale_truncates_toward_zero() {
        // 0.299*10 + 0.587*20 + 0.114*30 = 18.15 -> 18
        let out = desaturate("rgb(10,20,30)");
        assert_eq!(out, "rgb(18,18,18)");
    }

    #[test]
    fn grayscale_leaves_malformed_rgb_alone() {
        let svg = "rgb(10,20)";
        assert_eq!(desaturate(svg), svg);
        let svg = "rgb(10,20,abc)";
        assert_eq!(desaturate(svg), svg);
    }

    #[test]
    fn grayscale_skips_short_hex() {
        let svg = r##"fill="#f00""##;
        assert_eq!(desaturate(svg), svg);
    }

    #[test]
    fn grayscale_is_idempotent() {
        let once = desaturate(r#"<path fill="rgb(12,200,80)" stroke="#abcdef"/>"#);
        let twice = desaturate(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn passes_are_noops_on_empty_options() {
        let svg = r#"<svg><text x="1 2" y="3">hi</text></svg>"#;
        assert_eq!(apply(svg, &RewriteOptions::default()), svg);
    }

    #[test]
    fn passes_compose_in_order() {
        let svg = concat!(
            "<rect x=\"0\" y=\"0\" width=\"612\" height=\"792\" fill=\"#ffffff\"/>\n",
            "<text x=\"10 20\" y=\"40\" fill=\"rgb(200,100,0)\">hi</text>"
        );
        let opts = RewriteOptions {
            merge_kerning: true,
            strip_background: true,
            grayscale: true,
        };
        let out = apply(svg, &opts);
        assert!(!out.contains("ffffff"));
        assert!(out.contains(r#"x="10""#));
        // 0.299*200 + 0.587*100 + 0.114*0 = 118.5 -> 118
        assert!(out.contains("rgb(118,118,118)"));
    }

    #[test]
    fn apply_untouched_when_nothing_matches() {
        let svg = "<g><circle cx=\"5\" cy=\"5\" r=\"2\"/></g>";
        let opts = RewriteOptions {
            merge_kerning: true,
            strip_background: true,
            grayscale: true,
        };
        assert_eq!(apply(svg, &opts), svg);
    }
}
