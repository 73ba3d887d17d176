//! HTTP protocol helpers shared by the handlers: byte ranges, header
//! encodings, and resumable upload headers.

pub mod encoding;
pub mod range;
pub mod upload_headers;

pub use encoding::{attachment_disposition, http_date, query_component};
pub use range::{RangeResponder, parse_range_header};
pub use upload_headers::{UPLOAD_ID_HEADER, chunk_request};
