//! Stream decoding for chat completion responses.
//!
//! OpenAI-compatible servers stream completions as newline-delimited
//! `data: {json}` events terminated by a `data: [DONE]` sentinel. This
//! module converts the raw byte stream of an HTTP response body into a
//! stream of text deltas, in arrival order.

use bytes::{Bytes, BytesMut};
use futures::stream::{self, Stream, StreamExt};

use crate::error::{Error, Result};
use crate::observability::{STREAM_CHUNKS, STREAM_DELTAS, STREAM_ERRORS, STREAM_SKIPPED_LINES};
use crate::types::ChatCompletionChunk;

/// Terminal sentinel marking clean end-of-stream. Checked before JSON
/// parsing because it is not valid JSON.
const DONE_SENTINEL: &str = "[DONE]";

/// Outcome of decoding a single framed line.
enum Line {
    /// A text delta to yield.
    Delta(String),
    /// Blank, heartbeat, or malformed line; continue with the next one.
    Skip,
    /// The terminal sentinel; the stream ends cleanly.
    Done,
}

/// Decoder state threaded through the unfold below.
struct DecodeState {
    buffer: BytesMut,
    eof: bool,
    finished: bool,
}

/// Process a stream of response bytes into a stream of text deltas.
///
/// Each yielded item is the delta content of one streamed chunk,
/// HTML-entity-unescaped. Lines that fail JSON parsing or lack the
/// expected shape are counted and skipped; the stream continues.
/// Transport failures mid-stream yield one terminal error and end the
/// stream. Dropping the returned stream closes the underlying response
/// body, which is the cancellation path.
///
/// Framing is byte-oriented: lines are split on `\n` in the raw buffer
/// and each complete line is decoded as UTF-8 on its own, so a
/// multi-byte character split across network chunks is reassembled
/// before decoding.
pub fn decode_deltas<S>(byte_stream: S) -> impl Stream<Item = Result<String>>
where
    S: Stream<Item = std::result::Result<Bytes, reqwest::Error>> + Unpin + 'static,
{
    // Convert reqwest errors to our error type
    let stream = byte_stream.map(|result| {
        result
            .map_err(|e| Error::streaming(format!("Error in HTTP stream: {e}"), Some(Box::new(e))))
    });

    let state = DecodeState {
        buffer: BytesMut::new(),
        eof: false,
        finished: false,
    };

    stream::unfold((stream, state), move |(mut stream, mut state)| async move {
        loop {
            if state.finished {
                return None;
            }

            // Drain complete lines already buffered before reading more.
            while let Some(line) = take_line(&mut state.buffer) {
                match decode_line(&line) {
                    Ok(Line::Delta(delta)) => {
                        STREAM_DELTAS.click();
                        return Some((Ok(delta), (stream, state)));
                    }
                    Ok(Line::Skip) => continue,
                    Ok(Line::Done) => return None,
                    Err(err) => {
                        STREAM_ERRORS.click();
                        state.finished = true;
                        return Some((Err(err), (stream, state)));
                    }
                }
            }

            if state.eof {
                // A final line may arrive without a trailing newline.
                if state.buffer.is_empty() {
                    return None;
                }
                let line = state.buffer.split_to(state.buffer.len()).freeze();
                state.finished = true;
                match decode_line(&line) {
                    Ok(Line::Delta(delta)) => {
                        STREAM_DELTAS.click();
                        return Some((Ok(delta), (stream, state)));
                    }
                    Ok(Line::Skip) | Ok(Line::Done) => return None,
                    Err(err) => {
                        STREAM_ERRORS.click();
                        return Some((Err(err), (stream, state)));
                    }
                }
            }

            match stream.next().await {
                Some(Ok(bytes)) => {
                    STREAM_CHUNKS.click();
                    state.buffer.extend_from_slice(&bytes);
                }
                Some(Err(e)) => {
                    STREAM_ERRORS.click();
                    state.finished = true;
                    return Some((Err(e), (stream, state)));
                }
                None => {
                    state.eof = true;
                }
            }
        }
    })
}

/// Removes and returns the next newline-terminated line from the buffer.
fn take_line(buffer: &mut BytesMut) -> Option<Bytes> {
    let newline = buffer.iter().position(|&b| b == b'\n')?;
    let mut line = buffer.split_to(newline + 1);
    line.truncate(newline);
    Some(line.freeze())
}

/// Decodes one framed line into a delta, a skip, or the end sentinel.
fn decode_line(raw: &[u8]) -> Result<Line> {
    let raw = std::str::from_utf8(raw).map_err(|e| {
        Error::encoding(format!("Invalid UTF-8 in stream: {e}"), Some(Box::new(e)))
    })?;
    let line = raw.trim();
    if line.is_empty() {
        return Ok(Line::Skip);
    }
    let payload = match line.strip_prefix("data:") {
        Some(stripped) => stripped.trim(),
        None => line,
    };
    if payload.is_empty() {
        return Ok(Line::Skip);
    }
    if payload == DONE_SENTINEL {
        return Ok(Line::Done);
    }
    match serde_json::from_str::<ChatCompletionChunk>(payload) {
        Ok(chunk) => match chunk.delta_content() {
            Some(content) => Ok(Line::Delta(
                html_escape::decode_html_entities(content).into_owned(),
            )),
            None => Ok(Line::Skip),
        },
        Err(_) => {
            // Non-JSON heartbeat or partial frame; tolerate and move on.
            STREAM_SKIPPED_LINES.click();
            Ok(Line::Skip)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn byte_stream(
        chunks: Vec<&'static [u8]>,
    ) -> impl Stream<Item = std::result::Result<Bytes, reqwest::Error>> + Unpin {
        Box::pin(stream::iter(
            chunks.into_iter().map(|c| Ok(Bytes::from(c))),
        ))
    }

    async fn collect_deltas(chunks: Vec<&'static [u8]>) -> Vec<String> {
        let mut deltas = Vec::new();
        let mut decoded = Box::pin(decode_deltas(byte_stream(chunks)));
        while let Some(item) = decoded.next().await {
            deltas.push(item.expect("stream should not error"));
        }
        deltas
    }

    #[tokio::test]
    async fn single_delta_then_done() {
        let deltas = collect_deltas(vec![
            b"data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\n",
            b"data: [DONE]\n",
        ])
        .await;
        assert_eq!(deltas, vec!["Hi"]);
    }

    #[tokio::test]
    async fn malformed_line_skipped() {
        let deltas = collect_deltas(vec![
            b"data: not-json\n",
            b"data: {\"choices\":[{\"delta\":{\"content\":\"ok\"}}]}\n",
            b"data: [DONE]\n",
        ])
        .await;
        assert_eq!(deltas, vec!["ok"]);
    }

    #[tokio::test]
    async fn blank_and_empty_payload_lines_skipped() {
        let deltas = collect_deltas(vec![
            b"\n",
            b"data:\n",
            b"data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n",
            b"data: [DONE]\n",
        ])
        .await;
        assert_eq!(deltas, vec!["a"]);
    }

    #[tokio::test]
    async fn line_split_across_chunks() {
        let deltas = collect_deltas(vec![
            b"data: {\"choices\":[{\"delta\":",
            b"{\"content\":\"joined\"}}]}\ndata: [DONE]\n",
        ])
        .await;
        assert_eq!(deltas, vec!["joined"]);
    }

    #[tokio::test]
    async fn multibyte_character_split_across_chunks() {
        let deltas = collect_deltas(vec![
            b"data: {\"choices\":[{\"delta\":{\"content\":\"caf\xc3",
            b"\xa9\"}}]}\ndata: [DONE]\n",
        ])
        .await;
        assert_eq!(deltas, vec!["caf\u{e9}"]);
    }

    #[tokio::test]
    async fn multiple_deltas_in_order() {
        let deltas = collect_deltas(vec![
            b"data: {\"choices\":[{\"delta\":{\"content\":\"one \"}}]}\ndata: {\"choices\":[{\"delta\":{\"content\":\"two\"}}]}\n",
            b"data: [DONE]\n",
        ])
        .await;
        assert_eq!(deltas, vec!["one ", "two"]);
    }

    #[tokio::test]
    async fn html_entities_unescaped() {
        let deltas = collect_deltas(vec![
            b"data: {\"choices\":[{\"delta\":{\"content\":\"1 &lt; 2 &amp; 3\"}}]}\n",
            b"data: [DONE]\n",
        ])
        .await;
        assert_eq!(deltas, vec!["1 < 2 & 3"]);
    }

    #[tokio::test]
    async fn missing_delta_content_skipped() {
        let deltas = collect_deltas(vec![
            b"data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\"}]}\n",
            b"data: [DONE]\n",
        ])
        .await;
        assert!(deltas.is_empty());
    }

    #[tokio::test]
    async fn final_line_without_newline() {
        let deltas = collect_deltas(vec![
            b"data: {\"choices\":[{\"delta\":{\"content\":\"tail\"}}]}",
        ])
        .await;
        assert_eq!(deltas, vec!["tail"]);
    }

    #[tokio::test]
    async fn nothing_after_done_sentinel() {
        let deltas = collect_deltas(vec![
            b"data: [DONE]\ndata: {\"choices\":[{\"delta\":{\"content\":\"late\"}}]}\n",
        ])
        .await;
        assert!(deltas.is_empty());
    }

    #[tokio::test]
    async fn invalid_utf8_line_is_terminal_error() {
        let mut decoded = Box::pin(decode_deltas(byte_stream(vec![
            b"data: \xff\xfe\ndata: {\"choices\":[{\"delta\":{\"content\":\"late\"}}]}\n",
        ])));
        let first = decoded.next().await.expect("one item");
        assert!(first.is_err());
        assert!(decoded.next().await.is_none());
    }
}
