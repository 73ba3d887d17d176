//! Byte-range view over a stream.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::Stream;

use sharebox_core::traits::storage::ByteStream;
use sharebox_core::types::range::ByteRange;

/// Yields only the bytes of `inner` that fall inside an inclusive range.
///
/// Chunks before the range are drained and dropped; the inner stream is
/// released as soon as the last byte of the range has been yielded.
pub struct RangeSlice {
    inner: Option<ByteStream>,
    range: ByteRange,
    position: u64,
}

impl RangeSlice {
    /// Slice `inner` to `range`.
    pub fn new(inner: ByteStream, range: ByteRange) -> Self {
        Self {
            inner: Some(inner),
            range,
            position: 0,
        }
    }
}

impl Stream for RangeSlice {
    type Item = Result<Bytes, std::io::Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.as_mut().get_mut();
        loop {
            let Some(inner) = this.inner.as_mut() else {
                return Poll::Ready(None);
            };

            let chunk = match inner.as_mut().poll_next(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(None) => {
                    this.inner = None;
                    return Poll::Ready(None);
                }
                Poll::Ready(Some(Err(e))) => {
                    this.inner = None;
                    return Poll::Ready(Some(Err(e)));
                }
                Poll::Ready(Some(Ok(chunk))) => chunk,
            };

            let chunk_start = this.position;
            let chunk_end = chunk_start + chunk.len() as u64;
            this.position = chunk_end;

            if chunk_end <= this.range.start {
                continue;
            }

            let from = this.range.start.saturating_sub(chunk_start) as usize;
            let to = ((this.range.end + 1).min(chunk_end) - chunk_start) as usize;
            if chunk_end > this.range.end {
                this.inner = None;
            }
            return Poll::Ready(Some(Ok(chunk.slice(from..to))));
        }
    }
}
