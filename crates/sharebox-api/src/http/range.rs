//! Single-range `Range` support for downloads.

use axum::body::Body;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, header};
use axum::response::Response;
use chrono::{DateTime, Utc};

use sharebox_core::error::AppError;
use sharebox_core::result::AppResult;
use sharebox_core::traits::storage::ByteStream;
use sharebox_core::types::range::ByteRange;

use super::encoding::{attachment_disposition, http_date};

const DOWNLOAD_CACHE_CONTROL: &str = "private, max-age=0, must-revalidate";

/// Parse a `Range` header against a resource of `total` bytes.
///
/// Accepts exactly one of `bytes=A-B`, `bytes=A-` and `bytes=-N`. Returns
/// `None` when the header cannot be satisfied: several ranges, bad syntax,
/// an empty resource, or a start at or past the end.
pub fn parse_range_header(value: &str, total: u64) -> Option<ByteRange> {
    let value = value.trim();
    let spec = value
        .get(..6)
        .filter(|unit| unit.eq_ignore_ascii_case("bytes="))
        .map(|_| &value[6..])?;
    if spec.contains(',') || total == 0 {
        return None;
    }

    let (start, end) = spec.split_once('-')?;
    let (start, end) = (start.trim(), end.trim());
    let last = total - 1;

    match (start.is_empty(), end.is_empty()) {
        (true, true) => None,
        (true, false) => {
            let suffix: u64 = end.parse().ok()?;
            if suffix == 0 {
                return None;
            }
            ByteRange::new(total.saturating_sub(suffix), last)
        }
        (false, _) => {
            let start: u64 = start.parse().ok()?;
            if start >= total {
                return None;
            }
            let end = if end.is_empty() {
                last
            } else {
                end.parse::<u64>().ok()?.min(last)
            };
            ByteRange::new(start, end)
        }
    }
}

/// Builds download responses that honor `Range` and `HEAD`.
///
/// Every response carries `Accept-Ranges: bytes`. `HEAD` is answered with
/// the full length and no range handling; a satisfiable range yields
/// `206` with `Content-Range`.
#[derive(Debug, Clone)]
pub struct RangeResponder {
    total: u64,
    range: Option<ByteRange>,
    headers: HeaderMap,
}

impl RangeResponder {
    /// Responder for a resource of `total` bytes.
    pub fn new(total: u64) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
        headers.insert(
            header::CACHE_CONTROL,
            HeaderValue::from_static(DOWNLOAD_CACHE_CONTROL),
        );
        Self {
            total,
            range: None,
            headers,
        }
    }

    /// Apply the request's method and `Range` header.
    pub fn resolve(mut self, method: &Method, request_headers: &HeaderMap) -> AppResult<Self> {
        if method == Method::HEAD {
            return Ok(self);
        }
        let Some(value) = request_headers.get(header::RANGE) else {
            return Ok(self);
        };

        let range = value
            .to_str()
            .ok()
            .and_then(|v| parse_range_header(v, self.total))
            .ok_or_else(|| AppError::range_not_satisfiable(self.total))?;
        self.range = Some(range);
        Ok(self)
    }

    /// The range to read, `None` for the whole resource.
    pub fn range(&self) -> Option<ByteRange> {
        self.range
    }

    /// Set `Content-Type`.
    pub fn content_type(self, mime_type: &str) -> Self {
        self.header(header::CONTENT_TYPE, mime_type)
    }

    /// Set an attachment `Content-Disposition` for `file_name`.
    pub fn attachment(self, file_name: &str) -> Self {
        self.header(header::CONTENT_DISPOSITION, &attachment_disposition(file_name))
    }

    /// Set `ETag`.
    pub fn etag(self, etag: &str) -> Self {
        self.header(header::ETAG, etag)
    }

    /// Set `Last-Modified`.
    pub fn last_modified(self, time: DateTime<Utc>) -> Self {
        self.header(header::LAST_MODIFIED, &http_date(time))
    }

    /// Replace the default `Cache-Control`.
    pub fn cache_control(self, value: &str) -> Self {
        self.header(header::CACHE_CONTROL, value)
    }

    fn header(mut self, name: HeaderName, value: &str) -> Self {
        if let Ok(value) = HeaderValue::from_str(value) {
            self.headers.insert(name, value);
        }
        self
    }

    /// Headers only.
    pub fn head(self) -> Response {
        self.finish(Body::empty())
    }

    /// Stream `body`, which must already be limited to [`Self::range`].
    pub fn body(self, body: ByteStream) -> Response {
        self.finish(Body::from_stream(body))
    }

    fn finish(self, body: Body) -> Response {
        let mut headers = self.headers;
        let (status, length) = match self.range {
            Some(range) => {
                let content_range = format!("bytes {}-{}/{}", range.start, range.end, self.total);
                if let Ok(value) = HeaderValue::from_str(&content_range) {
                    headers.insert(header::CONTENT_RANGE, value);
                }
                (StatusCode::PARTIAL_CONTENT, range.len())
            }
            None => (StatusCode::OK, self.total),
        };
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));

        let mut response = Response::new(body);
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        response
    }
}
