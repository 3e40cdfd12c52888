//! Streaming response handling

use std::collections::VecDeque;
use std::fmt::Display;
use std::pin::Pin;

use futures::stream;
use futures::Stream;
use futures::StreamExt;
use serde::Deserialize;

use crate::errors::ProfragError;
use crate::errors::Result;

/// Ordered sequence of generated text fragments
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Streaming response from LLM
pub struct StreamingResponse {
    stream: TokenStream,
}

impl StreamingResponse {
    pub fn new(stream: TokenStream) -> Self {
        Self { stream }
    }

    /// Response over an already-known list of fragments
    pub fn from_fragments<I>(fragments: I) -> Self
    where
        I: IntoIterator<Item = String>,
        I::IntoIter: Send + 'static,
    {
        Self::new(Box::pin(stream::iter(fragments.into_iter().map(Ok))))
    }

    /// Collect all chunks into a single string
    pub async fn collect_all(mut self) -> Result<String> {
        let mut result = String::new();
        while let Some(chunk) = self.stream.next().await {
            result.push_str(&chunk?);
        }
        Ok(result)
    }

    /// Get the underlying stream
    pub fn into_stream(self) -> TokenStream {
        self.stream
    }
}

#[derive(Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: Option<ChunkDelta>,
}

#[derive(Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

/// Incremental decoder for OpenAI-style `text/event-stream` bodies.
///
/// Bytes are buffered until a full line is available, so multi-byte
/// characters split across network chunks decode intact.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    done: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the `[DONE]` sentinel has been seen
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Feed raw body bytes, pushing every complete content delta onto `out`.
    pub fn feed(&mut self, chunk: &[u8], out: &mut VecDeque<String>) -> Result<()> {
        if self.done {
            return Ok(());
        }
        self.buffer.extend_from_slice(chunk);
        while let Some(newline) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            self.decode_line(&line, out)?;
            if self.done {
                self.buffer.clear();
                break;
            }
        }
        Ok(())
    }

    /// Decode whatever is left once the body ends without a trailing newline.
    pub fn finish(&mut self, out: &mut VecDeque<String>) -> Result<()> {
        if self.done || self.buffer.is_empty() {
            return Ok(());
        }
        let line = std::mem::take(&mut self.buffer);
        self.decode_line(&line, out)
    }

    fn decode_line(&mut self, raw: &[u8], out: &mut VecDeque<String>) -> Result<()> {
        let line = String::from_utf8_lossy(raw);
        let line = line.trim_end_matches(['\n', '\r']);
        let Some(payload) = line.strip_prefix("data:") else {
            // Comments, `event:` and `id:` fields carry no content
            return Ok(());
        };
        let payload = payload.trim();
        if payload.is_empty() {
            return Ok(());
        }
        if payload == "[DONE]" {
            self.done = true;
            return Ok(());
        }

        let chunk: ChatChunk = serde_json::from_str(payload).map_err(|e| {
            ProfragError::CompletionStream(format!("Malformed stream chunk: {e}"))
        })?;
        if let Some(error) = chunk.error {
            return Err(ProfragError::CompletionStream(format!(
                "Provider reported an error mid-stream: {error}"
            )));
        }
        let content = chunk
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta)
            .and_then(|delta| delta.content)
            .unwrap_or_default();
        if !content.is_empty() {
            out.push_back(content);
        }
        Ok(())
    }
}

struct SseState<S> {
    body: Pin<Box<S>>,
    decoder: SseDecoder,
    pending: VecDeque<String>,
    failure: Option<ProfragError>,
    finished: bool,
}

/// Turn a raw SSE byte stream into a [`TokenStream`].
///
/// The body is only polled when the consumer asks for the next token, and it
/// is dropped together with the returned stream.
pub fn sse_token_stream<S, B, E>(body: S) -> TokenStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    let state = SseState {
        body: Box::pin(body),
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        failure: None,
        finished: false,
    };

    Box::pin(stream::unfold(state, |mut state| async move {
        loop {
            if let Some(token) = state.pending.pop_front() {
                return Some((Ok(token), state));
            }
            if let Some(err) = state.failure.take() {
                state.finished = true;
                return Some((Err(err), state));
            }
            if state.finished || state.decoder.is_done() {
                return None;
            }

            match state.body.next().await {
                Some(Ok(chunk)) => {
                    if let Err(e) = state.decoder.feed(chunk.as_ref(), &mut state.pending) {
                        state.failure = Some(e);
                    }
                }
                Some(Err(e)) => {
                    state.failure = Some(ProfragError::CompletionStream(e.to_string()));
                }
                None => {
                    state.finished = true;
                    if let Err(e) = state.decoder.finish(&mut state.pending) {
                        state.failure = Some(e);
                    }
                }
            }
        }
    }))
}
