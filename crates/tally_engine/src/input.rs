use std::io;

use futures_util::stream::{self, BoxStream, StreamExt};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Lazily yields the lines of `reader`.
///
/// Lines are split on `\n` with a trailing `\r` removed. Bytes that are not
/// valid UTF-8 are replaced rather than rejected, so a garbled line still
/// becomes a (failing) unit. Only a read error ends the stream, after being
/// yielded once.
pub fn line_stream<R>(reader: R) -> BoxStream<'static, io::Result<String>>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    stream::unfold(Some(reader.split(b'\n')), |segments| async move {
        let mut segments = segments?;
        match segments.next_segment().await {
            Ok(Some(raw)) => Some((Ok(decode_line(raw)), Some(segments))),
            Ok(None) => None,
            Err(err) => Some((Err(err), None)),
        }
    })
    .boxed()
}

fn decode_line(mut raw: Vec<u8>) -> String {
    if raw.last() == Some(&b'\r') {
        raw.pop();
    }
    match String::from_utf8(raw) {
        Ok(line) => line,
        Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
    }
}
