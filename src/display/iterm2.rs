//! iTerm2 inline image transmission (also understood by WezTerm/mintty)

use std::io::{self, Write};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::{ExtendedColorType, ImageEncoder, codecs::png::PngEncoder};

use super::RgbFrame;

/// Encode the frame as PNG and emit it at the current cursor position.
///
/// `width_cells`/`height_cells` pin the displayed size so the terminal
/// does not rescale to its own idea of the image dimensions.
pub fn transmit(
    out: &mut impl Write,
    frame: &RgbFrame<'_>,
    width_cells: u16,
    height_cells: u16,
) -> io::Result<()> {
    let png = encode_png(frame)?;
    let encoded = STANDARD.encode(&png);

    write!(
        out,
        "\x1b]1337;File=inline=1;size={};width={width_cells};height={height_cells};preserveAspectRatio=1:",
        png.len()
    )?;
    out.write_all(encoded.as_bytes())?;
    write!(out, "\x07")
}

fn encode_png(frame: &RgbFrame<'_>) -> io::Result<Vec<u8>> {
    let mut png = Vec::new();
    PngEncoder::new(&mut png)
        .write_image(frame.pixels, frame.width, frame.height, ExtendedColorType::Rgb8)
        .map_err(io::Error::other)?;
    Ok(png)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emits_osc_1337_with_png_payload() {
        let pixels = vec![200u8; 2 * 2 * 3];
        let frame = RgbFrame {
            pixels: &pixels,
            width: 2,
            height: 2,
        };
        let mut out = Vec::new();
        transmit(&mut out, &frame, 1, 1).unwrap();
        let s = String::from_utf8(out).unwrap();
        assert!(s.starts_with("\x1b]1337;File=inline=1;size="));
        assert!(s.ends_with("\x07"));

        // payload decodes back to a PNG signature
        let b64 = s
            .split(':')
            .nth(1)
            .unwrap()
            .trim_end_matches('\x07');
        let decoded = STANDARD.decode(b64).unwrap();
        assert_eq!(&decoded[1..4], b"PNG");
    }

    #[test]
    fn bad_frame_dimensions_error_instead_of_panicking() {
        let pixels = vec![0u8; 3];
        let frame = RgbFrame {
            pixels: &pixels,
            width: 10,
            height: 10,
        };
        let mut out = Vec::new();
        assert!(transmit(&mut out, &frame, 1, 1).is_err());
    }
}
