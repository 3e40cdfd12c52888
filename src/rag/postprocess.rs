//! Incremental cleaning and gating of generated text
//!
//! Every fragment is appended to a running buffer and the whole buffer is
//! cleaned. A fragment is forwarded only once the cleaned buffer has content,
//! and what is forwarded is always the raw fragment: the cleaned text is used
//! for the decision only.

use futures::stream;
use futures::StreamExt;
use lazy_static::lazy_static;
use regex::Captures;
use regex::Regex;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::errors::Result;
use crate::llm::TokenStream;
use crate::rag::ChatPhase;

lazy_static! {
    /// First word character of the text, or of a sentence after `.`, `!` or `?`
    static ref SENTENCE_START: Regex =
        Regex::new(r"^[A-Za-z0-9_]|[.!?]\s*[A-Za-z0-9_]").expect("valid sentence-start pattern");
}

fn is_line_terminator(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

/// Collapse immediately repeated substrings (`XX...X` becomes `X`).
///
/// At each position the shortest repeating unit wins and is consumed
/// greedily. Units never span a line break.
pub fn collapse_repeats(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let n = chars.len();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;

    while i < n {
        let mut unit_len = None;
        let mut len = 1;
        while i + 2 * len <= n {
            if is_line_terminator(chars[i + len - 1]) {
                break;
            }
            if chars[i..i + len] == chars[i + len..i + 2 * len] {
                unit_len = Some(len);
                break;
            }
            len += 1;
        }

        match unit_len {
            Some(len) => {
                let unit = &chars[i..i + len];
                let mut end = i + len;
                while end + len <= n && &chars[end..end + len] == unit {
                    end += len;
                }
                out.extend(unit);
                i = end;
            }
            None => {
                out.push(chars[i]);
                i += 1;
            }
        }
    }

    out
}

fn space_after_punctuation(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        out.push(c);
        if matches!(c, '.' | ',' | '!' | '?') {
            if let Some(next) = chars.peek() {
                if !next.is_whitespace() {
                    out.push(' ');
                }
            }
        }
    }
    out
}

fn capitalize_sentences(text: &str) -> String {
    SENTENCE_START
        .replace_all(text, |caps: &Captures<'_>| caps[0].to_uppercase())
        .into_owned()
}

/// Full cleaning pass: collapse repeats, space punctuation, capitalize, trim.
pub fn clean_response(text: &str) -> String {
    let collapsed = collapse_repeats(text);
    let spaced = space_after_punctuation(&collapsed);
    capitalize_sentences(&spaced).trim().to_string()
}

/// A cleaned buffer is valid once it has any content
pub fn is_valid_response(cleaned: &str) -> bool {
    !cleaned.is_empty()
}

/// Per-stream gate state
#[derive(Debug, Default)]
pub struct StreamPostProcessor {
    buffer: String,
    open: bool,
    forwarded: usize,
    gated: usize,
}

impl StreamPostProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide whether `fragment` is emitted; returns the raw fragment if so.
    ///
    /// Cleaning never removes the last non-whitespace character, so once the
    /// gate opens it stays open and the buffer is not re-cleaned.
    pub fn process(&mut self, fragment: &str) -> Option<String> {
        if fragment.is_empty() {
            return None;
        }
        self.buffer.push_str(fragment);

        if !self.open {
            self.open = is_valid_response(&clean_response(&self.buffer));
        }

        if self.open {
            self.forwarded += 1;
            Some(fragment.to_string())
        } else {
            self.gated += 1;
            None
        }
    }

    pub fn forwarded(&self) -> usize {
        self.forwarded
    }

    pub fn gated(&self) -> usize {
        self.gated
    }

    /// Everything received so far, uncleaned
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Wrap `upstream` so only gated fragments come out.
    ///
    /// An upstream error is emitted once and ends the stream. Cancelling
    /// `cancel` ends the stream at the next suspension point; dropping the
    /// returned stream drops `upstream`.
    pub fn into_stream(self, upstream: TokenStream, cancel: CancellationToken) -> TokenStream {
        let state = GateState {
            upstream,
            processor: self,
            cancel,
            done: false,
        };

        Box::pin(stream::unfold(state, |mut state| async move {
            if state.done {
                return None;
            }
            loop {
                let step = tokio::select! {
                    biased;
                    () = state.cancel.cancelled() => Step::Cancelled,
                    item = state.upstream.next() => Step::Upstream(item),
                };

                match step {
                    Step::Cancelled => {
                        info!(
                            forwarded = state.processor.forwarded,
                            gated = state.processor.gated,
                            "Chat stream cancelled"
                        );
                        return None;
                    }
                    Step::Upstream(None) => {
                        state.processor.log_completion();
                        return None;
                    }
                    Step::Upstream(Some(Err(e))) => {
                        warn!(
                            phase = %ChatPhase::Failed,
                            forwarded = state.processor.forwarded,
                            gated = state.processor.gated,
                            error = %e,
                            "Completion stream terminated with error"
                        );
                        state.done = true;
                        return Some((Err(e), state));
                    }
                    Step::Upstream(Some(Ok(fragment))) => {
                        if let Some(out) = state.processor.process(&fragment) {
                            return Some((Ok(out), state));
                        }
                    }
                }
            }
        }))
    }

    fn log_completion(&self) {
        debug!(cleaned = %clean_response(&self.buffer), "Final cleaned response");
        info!(
            phase = %ChatPhase::Completed,
            forwarded = self.forwarded,
            gated = self.gated,
            "Chat stream completed"
        );
    }
}

struct GateState {
    upstream: TokenStream,
    processor: StreamPostProcessor,
    cancel: CancellationToken,
    done: bool,
}

enum Step {
    Cancelled,
    Upstream(Option<Result<String>>),
}
