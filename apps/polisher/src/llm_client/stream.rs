//! Provider-neutral streaming primitives: SSE framing, normalized stream
//! events, and the accumulator that folds them into a `CompletionResult`.

use std::sync::Arc;
use std::time::Duration;

use bytes::{Buf, BytesMut};
use futures::stream::{BoxStream, StreamExt};
use reqwest::Response;

use super::{CompletionResult, LlmError};

/// Characters per token used when a provider reports no usage.
const CHARS_PER_TOKEN: usize = 4;

/// Token counts as reported by a provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// A non-streaming reply after family-specific decoding. `usage` is `None`
/// when the provider did not report it.
#[derive(Debug, Clone, PartialEq)]
pub struct RawCompletion {
    pub text: String,
    pub usage: Option<TokenUsage>,
}

/// One decoded event from a provider stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    TextDelta(String),
    InputTokens(u32),
    OutputTokens(u32),
    Usage(TokenUsage),
}

pub type EventStream = BoxStream<'static, Result<StreamEvent, LlmError>>;

/// Callback invoked after every text delta with (delta, cumulative chars).
pub type ChunkCallback<'a> = &'a mut (dyn FnMut(&str, usize) + Send);

pub fn estimate_tokens(text: &str) -> u32 {
    let chars = text.chars().count();
    u32::try_from(chars.div_ceil(CHARS_PER_TOKEN)).unwrap_or(u32::MAX)
}

/// Fills in usage only when the provider reported none at all.
pub fn resolve_usage(prompt: &str, text: &str, usage: Option<TokenUsage>) -> TokenUsage {
    match usage {
        Some(u) if u.input_tokens != 0 || u.output_tokens != 0 => u,
        _ => TokenUsage {
            input_tokens: estimate_tokens(prompt),
            output_tokens: estimate_tokens(text),
        },
    }
}

impl RawCompletion {
    pub fn into_result(self, prompt: &str) -> CompletionResult {
        let usage = resolve_usage(prompt, &self.text, self.usage);
        CompletionResult {
            text: self.text,
            input_tokens: usage.input_tokens,
            output_tokens: usage.output_tokens,
        }
    }
}

/// Folds stream events into the final text and usage.
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    text: String,
    char_count: usize,
    usage: TokenUsage,
}

impl StreamAccumulator {
    pub fn apply(&mut self, event: StreamEvent, on_chunk: &mut Option<ChunkCallback<'_>>) {
        match event {
            StreamEvent::TextDelta(delta) => {
                if delta.is_empty() {
                    return;
                }
                self.char_count += delta.chars().count();
                self.text.push_str(&delta);
                if let Some(callback) = on_chunk.as_mut() {
                    callback(&delta, self.char_count);
                }
            }
            StreamEvent::InputTokens(n) => self.usage.input_tokens = n,
            StreamEvent::OutputTokens(n) => self.usage.output_tokens = n,
            StreamEvent::Usage(usage) => self.usage = usage,
        }
    }

    pub fn finish(self, prompt: &str) -> CompletionResult {
        RawCompletion {
            text: self.text,
            usage: Some(self.usage),
        }
        .into_result(prompt)
    }
}

/// Drains `events` into a `CompletionResult`, stopping at the first error.
pub async fn collect_stream(
    mut events: EventStream,
    prompt: &str,
    mut on_chunk: Option<ChunkCallback<'_>>,
) -> Result<CompletionResult, LlmError> {
    let mut acc = StreamAccumulator::default();
    while let Some(event) = events.next().await {
        acc.apply(event?, &mut on_chunk);
    }
    Ok(acc.finish(prompt))
}

/// Incremental Server-Sent Events decoder. Network chunks may split lines
/// anywhere, so bytes are buffered until a full line is available.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: BytesMut,
    data: Vec<String>,
}

impl SseDecoder {
    /// Feeds raw bytes and returns the `data` payloads of every event
    /// completed by them.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();

        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line = self.buffer.split_to(pos);
            self.buffer.advance(1);
            let line = String::from_utf8_lossy(&line);
            let line = line.strip_suffix('\r').unwrap_or(&line);
            self.handle_line(line, &mut events);
        }

        events
    }

    /// Flushes an event left unterminated when the body ended.
    pub fn finish(&mut self) -> Vec<String> {
        let mut events = Vec::new();
        if !self.buffer.is_empty() {
            let rest = self.buffer.split();
            let line = String::from_utf8_lossy(&rest).into_owned();
            self.handle_line(line.trim_end_matches('\r'), &mut events);
        }
        if !self.data.is_empty() {
            events.push(self.data.drain(..).collect::<Vec<_>>().join("\n"));
        }
        events
    }

    fn handle_line(&mut self, line: &str, events: &mut Vec<String>) {
        if line.is_empty() {
            if !self.data.is_empty() {
                events.push(self.data.drain(..).collect::<Vec<_>>().join("\n"));
            }
        } else if let Some(value) = line.strip_prefix("data:") {
            self.data
                .push(value.strip_prefix(' ').unwrap_or(value).to_string());
        }
        // `event:`, `id:`, `retry:` and comments carry nothing the decoders need.
    }
}

/// Turns an SSE response body into decoded events using a family-specific
/// `decode` function, which may yield zero or more events per payload.
/// A decode error ends the stream.
pub fn sse_events<F>(response: Response, decode: F, timeout: Duration) -> EventStream
where
    F: Fn(&str) -> Result<Vec<StreamEvent>, LlmError> + Send + Sync + 'static,
{
    let decode = Arc::new(decode);
    let body = Box::pin(response.bytes_stream());

    futures::stream::unfold(
        (body, SseDecoder::default(), false),
        move |(mut body, mut decoder, done)| {
            let decode = Arc::clone(&decode);
            async move {
                if done {
                    return None;
                }
                let (payloads, done) = match body.next().await {
                    Some(Ok(chunk)) => (decoder.push(&chunk), false),
                    Some(Err(e)) => {
                        let err = LlmError::from_transport(e, timeout);
                        return Some((vec![Err(err)], (body, decoder, true)));
                    }
                    None => (decoder.finish(), true),
                };

                let mut events = Vec::new();
                // Blank payloads are proxy keepalives.
                for payload in payloads.iter().filter(|p| !p.trim().is_empty()) {
                    match decode(payload) {
                        Ok(decoded) => events.extend(decoded.into_iter().map(Ok)),
                        Err(e) => {
                            events.push(Err(e));
                            return Some((events, (body, decoder, true)));
                        }
                    }
                }
                Some((events, (body, decoder, done)))
            }
        },
    )
    .flat_map(futures::stream::iter)
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deltas(parts: &[&str]) -> EventStream {
        let events: Vec<Result<StreamEvent, LlmError>> = parts
            .iter()
            .map(|p| Ok(StreamEvent::TextDelta(p.to_string())))
            .collect();
        futures::stream::iter(events).boxed()
    }

    #[tokio::test]
    async fn test_deltas_accumulate_with_increasing_lengths() {
        let mut seen = Vec::new();
        let mut callback = |delta: &str, total: usize| seen.push((delta.to_string(), total));

        let result = collect_stream(deltas(&["Hello", ", ", "world"]), "hi", Some(&mut callback))
            .await
            .unwrap();

        assert_eq!(result.text, "Hello, world");
        let lengths: Vec<usize> = seen.iter().map(|(_, n)| *n).collect();
        assert_eq!(lengths, vec![5, 7, 12]);
        assert_eq!(seen[1].0, ", ");
    }

    #[tokio::test]
    async fn test_missing_usage_is_estimated_from_characters() {
        let prompt = "p".repeat(400);
        let output = "o".repeat(100);
        let result = collect_stream(deltas(&[&output]), &prompt, None).await.unwrap();
        assert_eq!(result.input_tokens, 100);
        assert_eq!(result.output_tokens, 25);
    }

    #[tokio::test]
    async fn test_reported_usage_is_kept() {
        let events: Vec<Result<StreamEvent, LlmError>> = vec![
            Ok(StreamEvent::InputTokens(42)),
            Ok(StreamEvent::TextDelta("abc".to_string())),
            Ok(StreamEvent::OutputTokens(7)),
        ];
        let result = collect_stream(futures::stream::iter(events).boxed(), "prompt", None)
            .await
            .unwrap();
        assert_eq!((result.input_tokens, result.output_tokens), (42, 7));
    }

    #[tokio::test]
    async fn test_partial_usage_is_not_corrected() {
        // Zero output tokens despite text: reported counts win.
        let events: Vec<Result<StreamEvent, LlmError>> = vec![
            Ok(StreamEvent::TextDelta("some output".to_string())),
            Ok(StreamEvent::Usage(TokenUsage {
                input_tokens: 12,
                output_tokens: 0,
            })),
        ];
        let result = collect_stream(futures::stream::iter(events).boxed(), "prompt", None)
            .await
            .unwrap();
        assert_eq!((result.input_tokens, result.output_tokens), (12, 0));
    }

    #[tokio::test]
    async fn test_stream_error_propagates() {
        let events: Vec<Result<StreamEvent, LlmError>> = vec![
            Ok(StreamEvent::TextDelta("partial".to_string())),
            Err(LlmError::Api {
                status: 529,
                message: "overloaded".to_string(),
            }),
        ];
        let err = collect_stream(futures::stream::iter(events).boxed(), "p", None)
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Api { status: 529, .. }));
    }

    #[test]
    fn test_estimate_rounds_up() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abc"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
    }

    #[test]
    fn test_sse_decoder_handles_split_chunks() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push(b"event: message_start\nda").is_empty());
        assert!(decoder.push(b"ta: {\"a\":1}").is_empty());
        let events = decoder.push(b"\r\n\r\ndata: [DONE]\n\n");
        assert_eq!(events, vec!["{\"a\":1}".to_string(), "[DONE]".to_string()]);
    }

    #[test]
    fn test_sse_decoder_flushes_unterminated_event() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push(b"data: tail").is_empty());
        assert_eq!(decoder.finish(), vec!["tail".to_string()]);
    }
}
