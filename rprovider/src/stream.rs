//! Streaming frame contracts and the provider-stream normalizer.
//!
//! ```rust
//! use rprovider::{BoxedFrameStream, StreamFrame, VecFrameStream};
//!
//! let stream = VecFrameStream::new(vec![Ok(StreamFrame::Delta("hello".into()))]);
//! let _boxed: BoxedFrameStream<'static> = Box::pin(stream);
//! ```

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use async_stream::try_stream;
use futures_core::Stream;
use futures_util::StreamExt;

use crate::{AdapterError, FinishReason, transport::RawByteStream};

/// One incremental unit of a streamed completion: a text delta or the
/// terminal finish signal. Errors travel as the `Err` arm of the stream item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamFrame {
    Delta(String),
    Finish(FinishReason),
}

/// Provider frame stream contract.
///
/// Invariants for consumers:
/// - Frames arrive in provider-emission order.
/// - `Delta` may appear zero or more times.
/// - The sequence terminates at the first `Finish` frame, the first `Err`
///   item, or transport closure, whichever comes first.
/// - Once terminated, no further items are yielded. A new call must be
///   issued to retry; streams are not restartable.
/// - Dropping the stream cancels the in-flight call and releases the
///   transport; no further frames are observed.
pub trait FrameStream: Stream<Item = Result<StreamFrame, AdapterError>> + Send {}

impl<T> FrameStream for T where T: Stream<Item = Result<StreamFrame, AdapterError>> + Send {}

pub type BoxedFrameStream<'a> = Pin<Box<dyn FrameStream + 'a>>;

/// Decodes one raw `data:` payload into zero or more canonical frames.
/// A structured error envelope embedded in the payload must surface as an
/// `Err`, which the normalizer treats as terminal.
pub trait FrameDecoder: Send {
    fn decode(&mut self, payload: &str) -> Result<Vec<StreamFrame>, AdapterError>;
}

/// Converts a raw SSE byte stream into the canonical frame sequence.
///
/// Buffers transport chunks into lines, handles `data:` framing and the
/// `[DONE]` marker, and stops at the first terminal frame. A `[DONE]` seen
/// before any finish frame is normalized into `Finish(Stop)` so consumers
/// always observe a terminal frame on orderly shutdown.
pub fn normalize_sse<'a, D>(mut bytes: RawByteStream<'a>, mut decoder: D) -> BoxedFrameStream<'a>
where
    D: FrameDecoder + 'a,
{
    let stream = try_stream! {
        let mut buffer = String::new();
        let mut terminated = false;

        while let Some(chunk) = bytes.next().await {
            let chunk = chunk?;
            let text = std::str::from_utf8(&chunk)
                .map_err(|err| AdapterError::transport(format!("invalid utf-8 in stream: {err}")))?;
            buffer.push_str(text);

            while let Some(newline_index) = buffer.find('\n') {
                let line = buffer.drain(..=newline_index).collect::<String>();
                let line = line.trim();

                if !line.starts_with("data:") {
                    continue;
                }

                let payload = line.trim_start_matches("data:").trim();
                if payload == "[DONE]" {
                    yield StreamFrame::Finish(FinishReason::Stop);
                    terminated = true;
                    break;
                }

                for frame in decoder.decode(payload)? {
                    let is_finish = matches!(frame, StreamFrame::Finish(_));
                    yield frame;
                    if is_finish {
                        terminated = true;
                        break;
                    }
                }

                if terminated {
                    break;
                }
            }

            if terminated {
                break;
            }
        }
    };

    Box::pin(stream)
}

/// Drains a frame stream into the final assistant text: the in-order
/// concatenation of every delta up to (not including) the terminal frame.
pub async fn collect_text(mut stream: BoxedFrameStream<'_>) -> Result<String, AdapterError> {
    let mut text = String::new();

    while let Some(frame) = stream.next().await {
        match frame? {
            StreamFrame::Delta(delta) => text.push_str(&delta),
            StreamFrame::Finish(_) => break,
        }
    }

    Ok(text)
}

#[derive(Debug)]
pub struct VecFrameStream {
    frames: VecDeque<Result<StreamFrame, AdapterError>>,
}

impl VecFrameStream {
    pub fn new(frames: Vec<Result<StreamFrame, AdapterError>>) -> Self {
        Self {
            frames: frames.into(),
        }
    }
}

impl Stream for VecFrameStream {
    type Item = Result<StreamFrame, AdapterError>;

    fn poll_next(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<Result<StreamFrame, AdapterError>>> {
        Poll::Ready(self.frames.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AdapterErrorKind, ProviderKind};

    struct LineDecoder;

    impl FrameDecoder for LineDecoder {
        fn decode(&mut self, payload: &str) -> Result<Vec<StreamFrame>, AdapterError> {
            if payload.contains("\"error\"") {
                return Err(AdapterError::provider(ProviderKind::OpenAi, "upstream failed"));
            }
            if payload == "finish" {
                return Ok(vec![StreamFrame::Finish(FinishReason::Stop)]);
            }
            Ok(vec![StreamFrame::Delta(payload.to_string())])
        }
    }

    fn byte_stream(chunks: Vec<&str>) -> RawByteStream<'static> {
        let owned: Vec<Result<Vec<u8>, AdapterError>> = chunks
            .into_iter()
            .map(|chunk| Ok(chunk.as_bytes().to_vec()))
            .collect();
        Box::pin(futures_util::stream::iter(owned))
    }

    #[tokio::test]
    async fn normalizer_reassembles_split_lines_in_order() {
        let bytes = byte_stream(vec!["data: hel", "lo\ndata: world\n", "data: [DONE]\n"]);
        let mut frames = normalize_sse(bytes, LineDecoder);

        let mut collected = Vec::new();
        while let Some(frame) = frames.next().await {
            collected.push(frame.expect("frame should be ok"));
        }

        assert_eq!(
            collected,
            vec![
                StreamFrame::Delta("hello".to_string()),
                StreamFrame::Delta("world".to_string()),
                StreamFrame::Finish(FinishReason::Stop),
            ]
        );
    }

    #[tokio::test]
    async fn normalizer_stops_after_finish_frame() {
        let bytes = byte_stream(vec!["data: finish\ndata: late\n"]);
        let mut frames = normalize_sse(bytes, LineDecoder);

        let first = frames.next().await.expect("finish frame").expect("ok");
        assert_eq!(first, StreamFrame::Finish(FinishReason::Stop));
        assert!(frames.next().await.is_none());
    }

    #[tokio::test]
    async fn mid_stream_error_envelope_is_terminal() {
        let bytes = byte_stream(vec![
            "data: hello\n",
            "data: {\"error\":{\"message\":\"boom\"}}\n",
            "data: after\n",
        ]);
        let mut frames = normalize_sse(bytes, LineDecoder);

        assert_eq!(
            frames.next().await.expect("delta").expect("ok"),
            StreamFrame::Delta("hello".to_string())
        );

        let error = frames
            .next()
            .await
            .expect("error item")
            .expect_err("should be terminal error");
        assert_eq!(error.kind, AdapterErrorKind::Provider);
        assert!(frames.next().await.is_none());
    }

    #[tokio::test]
    async fn transport_closure_ends_the_sequence_without_finish() {
        let bytes = byte_stream(vec!["data: only\n"]);
        let mut frames = normalize_sse(bytes, LineDecoder);

        assert_eq!(
            frames.next().await.expect("delta").expect("ok"),
            StreamFrame::Delta("only".to_string())
        );
        assert!(frames.next().await.is_none());
    }

    #[tokio::test]
    async fn collect_text_concatenates_deltas_up_to_terminal() {
        let stream = VecFrameStream::new(vec![
            Ok(StreamFrame::Delta("hello".to_string())),
            Ok(StreamFrame::Delta(" world".to_string())),
            Ok(StreamFrame::Finish(FinishReason::Stop)),
        ]);

        let text = collect_text(Box::pin(stream)).await.expect("text");
        assert_eq!(text, "hello world");
    }

    #[tokio::test]
    async fn vec_frame_stream_yields_frames_in_order() {
        let mut stream = Box::pin(VecFrameStream::new(vec![
            Ok(StreamFrame::Delta("one".into())),
            Ok(StreamFrame::Delta("two".into())),
        ]));

        assert_eq!(
            stream.next().await,
            Some(Ok(StreamFrame::Delta("one".into())))
        );
        assert_eq!(
            stream.next().await,
            Some(Ok(StreamFrame::Delta("two".into())))
        );
        assert_eq!(stream.next().await, None);
    }
}
