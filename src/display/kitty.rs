//! Kitty graphics protocol transmission
//!
//! Pixels go out as zlib-compressed raw RGB, base64-encoded and split
//! into escape-sized chunks. `q=2` suppresses terminal responses so the
//! event loop never has to consume them.

use std::io::{self, Write};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use flate2::Compression;
use flate2::write::ZlibEncoder;

use super::RgbFrame;

/// Max payload bytes per escape chunk, per the protocol spec.
pub const CHUNK_LIMIT: usize = 4096;

/// Compress raw pixels and base64-encode for transmission.
pub fn compress_and_encode(pixels: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::fast());
    encoder.write_all(pixels)?;
    let compressed = encoder.finish()?;
    Ok(STANDARD.encode(compressed).into_bytes())
}

pub fn chunk_iterator(data: &[u8]) -> ChunkIter<'_> {
    ChunkIter {
        data,
        offset: 0,
        chunk_size: CHUNK_LIMIT - (CHUNK_LIMIT % 4),
    }
}

pub struct ChunkIter<'a> {
    data: &'a [u8],
    offset: usize,
    chunk_size: usize,
}

impl<'a> Iterator for ChunkIter<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.data.len() {
            return None;
        }
        let end = (self.offset + self.chunk_size).min(self.data.len());
        let chunk = &self.data[self.offset..end];
        self.offset = end;
        Some(chunk)
    }
}

/// Transmit and place an image at the current cursor position.
pub fn transmit(out: &mut impl Write, image_id: u32, frame: &RgbFrame<'_>) -> io::Result<()> {
    let payload = compress_and_encode(frame.pixels)?;
    if payload.is_empty() {
        return Ok(());
    }

    let mut chunks = chunk_iterator(&payload).peekable();
    let mut first = true;
    while let Some(chunk) = chunks.next() {
        let more = u8::from(chunks.peek().is_some());
        if first {
            write!(
                out,
                "\x1b_Ga=T,q=2,i={image_id},f=24,s={},v={},o=z,m={more};",
                frame.width, frame.height
            )?;
            first = false;
        } else {
            write!(out, "\x1b_Gq=2,m={more};")?;
        }
        out.write_all(chunk)?;
        write!(out, "\x1b\\")?;
    }
    Ok(())
}

/// Delete a previously transmitted image and its placements.
pub fn delete(out: &mut impl Write, image_id: u32) -> io::Result<()> {
    write!(out, "\x1b_Ga=d,d=i,i={image_id},q=2\x1b\\")
}

/// Delete every image this process placed. Used on shutdown/panic.
pub fn delete_all(out: &mut impl Write) -> io::Result<()> {
    write!(out, "\x1b_Ga=d,d=A,q=2\x1b\\")
}
