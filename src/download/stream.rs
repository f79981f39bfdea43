//! Stream writer: drains a response body into the caller's sink.

use futures_util::StreamExt;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::trace;

use super::DownloadError;

/// Streams `response`'s body into `sink` chunk by chunk, returning bytes written.
///
/// Every non-empty chunk results in a write. The sink is neither flushed nor
/// shut down; its lifecycle belongs to the caller.
///
/// # Errors
///
/// Returns [`DownloadError::Network`] if the body stream fails and
/// [`DownloadError::Write`] if the sink rejects a write.
pub async fn stream_to_sink<W>(
    response: reqwest::Response,
    sink: &mut W,
    url: &str,
) -> Result<u64, DownloadError>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| DownloadError::from_transport(url, e))?;
        if chunk.is_empty() {
            continue;
        }

        sink.write_all(&chunk)
            .await
            .map_err(|e| DownloadError::write(url, e))?;

        bytes_written += chunk.len() as u64;
        trace!(chunk = chunk.len(), total = bytes_written, "wrote chunk");
    }

    Ok(bytes_written)
}
