//! Single byte-range downloads.

use axum::{
    body::{Body, Bytes},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use std::io::{self, SeekFrom};
use std::path::Path;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use crate::http::response::{json_error, text};

/// Bytes read per chunk when streaming a file.
pub const CHUNK_SIZE: usize = 81920;

/// Inclusive byte range within a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RangeError {
    #[error("malformed range header: {0}")]
    Malformed(String),

    #[error("range not satisfiable for size {size}")]
    Unsatisfiable { size: u64 },
}

impl IntoResponse for RangeError {
    fn into_response(self) -> Response {
        match self {
            RangeError::Malformed(_) => json_error(StatusCode::BAD_REQUEST, "Invalid Range header"),
            RangeError::Unsatisfiable { size } => (
                StatusCode::RANGE_NOT_SATISFIABLE,
                [(header::CONTENT_RANGE, format!("bytes */{size}"))],
            )
                .into_response(),
        }
    }
}

/// Parse a `Range` header against a file of `size` bytes.
///
/// Headers without the `bytes=` unit are ignored (`Ok(None)`), as is an
/// absent header. A missing end (`bytes=5` or `bytes=5-`) means the last
/// byte, and an end past the last byte is clamped.
pub fn parse_range(header: Option<&str>, size: u64) -> Result<Option<ByteRange>, RangeError> {
    let Some(value) = header else {
        return Ok(None);
    };
    let Some(spec) = value.trim().strip_prefix("bytes=") else {
        return Ok(None);
    };

    let malformed = || RangeError::Malformed(value.to_string());
    let (start, end) = spec.split_once('-').unwrap_or((spec, ""));

    let start: u64 = start.trim().parse().map_err(|_| malformed())?;
    let end = match end.trim() {
        "" => None,
        end => Some(end.parse::<u64>().map_err(|_| malformed())?),
    };

    if start >= size {
        return Err(RangeError::Unsatisfiable { size });
    }
    let last = size - 1;
    let end = end.map_or(last, |end| end.min(last));
    if end < start {
        return Err(RangeError::Unsatisfiable { size });
    }

    Ok(Some(ByteRange { start, end }))
}

/// Stream `path`, whole or the requested range, as `application/octet-stream`.
///
/// A `Range` value that is not visible ASCII is answered like any other
/// malformed range.
pub async fn serve_file_range(
    path: &Path,
    range_header: Option<&HeaderValue>,
) -> io::Result<Response> {
    let mut file = match tokio::fs::File::open(path).await {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Ok(text(StatusCode::NOT_FOUND, "Not found"));
        }
        Err(e) => return Err(e),
    };
    let metadata = file.metadata().await?;
    if !metadata.is_file() {
        return Ok(text(StatusCode::NOT_FOUND, "Not found"));
    }
    let size = metadata.len();

    let range_header = match range_header.map(HeaderValue::to_str).transpose() {
        Ok(value) => value,
        Err(_) => {
            let raw = range_header.map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned());
            return Ok(RangeError::Malformed(raw.unwrap_or_default()).into_response());
        }
    };
    let range = match parse_range(range_header, size) {
        Ok(range) => range,
        Err(e) => return Ok(e.into_response()),
    };

    let (status, offset, length) = match range {
        Some(r) => (StatusCode::PARTIAL_CONTENT, r.start, r.end - r.start + 1),
        None => (StatusCode::OK, 0, size),
    };
    if offset > 0 {
        file.seek(SeekFrom::Start(offset)).await?;
    }

    let stream = futures_util::stream::try_unfold((file, length), |(mut file, remaining)| async move {
        if remaining == 0 {
            return Ok::<_, io::Error>(None);
        }
        let want = remaining.min(CHUNK_SIZE as u64) as usize;
        let mut buf = vec![0u8; want];
        let read = file.read(&mut buf).await?;
        if read == 0 {
            return Ok(None);
        }
        buf.truncate(read);
        Ok(Some((Bytes::from(buf), (file, remaining - read as u64))))
    });

    let mut builder = Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(header::ACCEPT_RANGES, "bytes")
        .header(header::CONTENT_LENGTH, length);
    if let Some(r) = range {
        builder = builder.header(
            header::CONTENT_RANGE,
            format!("bytes {}-{}/{}", r.start, r.end, size),
        );
    }

    builder
        .body(Body::from_stream(stream))
        .map_err(io::Error::other)
}
