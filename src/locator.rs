//! Resolves user input into an openable document
//!
//! Accepts plain filesystem paths, `file://` URLs and `http(s)://` URLs.
//! Remote documents are downloaded into a temp file that stays alive for
//! the session. A `#page=N` fragment selects the initial page (1-indexed
//! on the way in, 0-indexed in the result).

use std::io::Write;
use std::path::PathBuf;

use tempfile::NamedTempFile;

/// A resolved document source ready to be opened.
#[derive(Debug)]
pub struct ResolvedSource {
    /// Local path of the document (possibly a temp download).
    pub path: PathBuf,
    /// 0-indexed page requested via `#page=N`, if any.
    pub target_page: Option<usize>,
    /// Keeps a downloaded file alive; `None` for local sources.
    pub download: Option<NamedTempFile>,
}

impl ResolvedSource {
    /// Whether the source is a local file (worth remembering in recents).
    #[must_use]
    pub fn is_local(&self) -> bool {
        self.download.is_none()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LocatorError {
    #[error("unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    #[error("file not found: {0}")]
    NotFound(PathBuf),

    #[error("download failed: {0}")]
    Download(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Resolve a path or URL into a local document.
pub fn resolve(input: &str) -> Result<ResolvedSource, LocatorError> {
    let input = input.trim();
    let (body, fragment) = match input.split_once('#') {
        Some((body, fragment)) => (body, Some(fragment)),
        None => (input, None),
    };
    let target_page = fragment.and_then(parse_page_fragment);

    if let Some(rest) = body.strip_prefix("file://") {
        let path = PathBuf::from(percent_decode(strip_host(rest)));
        if !path.exists() {
            return Err(LocatorError::NotFound(path));
        }
        return Ok(ResolvedSource {
            path,
            target_page,
            download: None,
        });
    }

    if body.starts_with("http://") || body.starts_with("https://") {
        return download(body, target_page);
    }

    if let Some((scheme, _)) = body.split_once("://") {
        return Err(LocatorError::UnsupportedScheme(scheme.to_string()));
    }

    let path = PathBuf::from(body);
    if !path.exists() {
        return Err(LocatorError::NotFound(path));
    }
    Ok(ResolvedSource {
        path,
        target_page,
        download: None,
    })
}

fn download(url: &str, target_page: Option<usize>) -> Result<ResolvedSource, LocatorError> {
    log::info!("downloading {url}");
    let bytes = reqwest::blocking::get(url)?.error_for_status()?.bytes()?;

    let mut temp = tempfile::Builder::new().suffix(".pdf").tempfile()?;
    temp.write_all(&bytes)?;
    temp.flush()?;

    Ok(ResolvedSource {
        path: temp.path().to_path_buf(),
        target_page,
        download: Some(temp),
    })
}

/// `page=N` with N 1-indexed; anything unparsable is ignored.
fn parse_page_fragment(fragment: &str) -> Option<usize> {
    let n: usize = fragment.strip_prefix("page=")?.parse().ok()?;
    n.checked_sub(1)
}

/// Drop the authority part of `file://host/path` forms.
fn strip_host(rest: &str) -> &str {
    if rest.starts_with('/') {
        rest
    } else {
        match rest.find('/') {
            Some(idx) => &rest[idx..],
            None => rest,
        }
    }
}

/// Minimal percent-decoding for file URLs (`%20` and friends).
fn percent_decode(input: &str) -> String {
    fn hex_digit(b: u8) -> Option<u8> {
        match b {
            b'0'..=b'9' => Some(b - b'0'),
            b'a'..=b'f' => Some(b - b'a' + 10),
            b'A'..=b'F' => Some(b - b'A' + 10),
            _ => None,
        }
    }

    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex_digit(bytes[i + 1]), hex_digit(bytes[i + 2])) {
                out.push(hi * 16 + lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
