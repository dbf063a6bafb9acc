//! Blocking HTTP download helpers shared by the URL and archive sources.

use super::errors::SourceError;
use std::io::{Cursor, Read};
use std::path::Path;
use tracing::debug;

/// Name used when neither the response nor the URL names the file.
const FALLBACK_NAME: &str = "download";

/// A fully buffered response body together with its resolved file name.
#[derive(Debug)]
pub struct Download {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// GET `url`, following redirects, and buffer the whole body.
pub fn get(url: &str) -> Result<Download, SourceError> {
    let response = ureq::get(url).call().map_err(|error| match error {
        ureq::Error::Status(status, _) => SourceError::Status {
            url: url.to_string(),
            status,
        },
        other => SourceError::Http {
            url: url.to_string(),
            source: Box::new(other),
        },
    })?;

    let filename = response
        .header("content-disposition")
        .and_then(filename_from_disposition)
        .or_else(|| filename_from_url(response.get_url()))
        .unwrap_or_else(|| fallback_name(response.content_type()));

    let mut bytes = Vec::new();
    response
        .into_reader()
        .read_to_end(&mut bytes)
        .map_err(|source| SourceError::Body {
            url: url.to_string(),
            source,
        })?;

    debug!(url, filename = %filename, bytes = bytes.len(), "downloaded");
    Ok(Download { filename, bytes })
}

/// Extract a zip archive held in memory into `destination`.
pub fn extract_zip(url: &str, bytes: Vec<u8>, destination: &Path) -> Result<(), SourceError> {
    let archive_error = |source| SourceError::Archive {
        url: url.to_string(),
        source,
    };
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).map_err(archive_error)?;
    archive.extract(destination).map_err(archive_error)?;
    debug!(url, files = archive.len(), destination = %destination.display(), "extracted archive");
    Ok(())
}

/// File name from a `Content-Disposition` header.
///
/// `filename*=` (RFC 8187) wins over a plain `filename=`.
pub fn filename_from_disposition(header: &str) -> Option<String> {
    let mut plain = None;
    for param in header.split(';') {
        let Some((key, value)) = param.trim().split_once('=') else {
            continue;
        };
        match key.trim().to_ascii_lowercase().as_str() {
            "filename*" => {
                // charset'language'percent-encoded-name
                let encoded = value.trim().splitn(3, '\'').nth(2);
                if let Some(name) = encoded.and_then(|encoded| sanitize(&percent_decode(encoded))) {
                    return Some(name);
                }
            }
            "filename" => plain = sanitize(value.trim().trim_matches('"')),
            _ => {}
        }
    }
    plain
}

/// Last non-empty path segment of a URL, without query or fragment.
pub fn filename_from_url(url: &str) -> Option<String> {
    let without_query = url.split(['?', '#']).next()?;
    let path = without_query.split_once("://").map_or(without_query, |(_, rest)| rest);
    let (_, path) = path.split_once('/')?;
    sanitize(&percent_decode(path.rsplit('/').next()?))
}

fn fallback_name(content_type: &str) -> String {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    // octet-stream maps to dozens of extensions and says nothing useful.
    if essence == "application/octet-stream" {
        return FALLBACK_NAME.to_string();
    }
    match mime_guess::get_mime_extensions_str(&essence).and_then(|extensions| extensions.first()) {
        Some(extension) => format!("{FALLBACK_NAME}.{extension}"),
        None => FALLBACK_NAME.to_string(),
    }
}

// Only the final component is kept so a hostile name cannot escape the
// destination directory.
fn sanitize(name: &str) -> Option<String> {
    let name = Path::new(name).file_name()?.to_str()?;
    if name.is_empty() || name == "." || name == ".." {
        None
    } else {
        Some(name.to_string())
    }
}

fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut idx = 0;
    while idx < bytes.len() {
        if bytes[idx] == b'%' && idx + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[idx + 1..idx + 3]).ok();
            if let Some(value) = hex.and_then(|hex| u8::from_str_radix(hex, 16).ok()) {
                decoded.push(value);
                idx += 3;
                continue;
            }
        }
        decoded.push(bytes[idx]);
        idx += 1;
    }
    String::from_utf8_lossy(&decoded).into_owned()
}
