//! Language-model completion
//!
//! [`CompletionProvider`] is the narrow contract the chat pipeline needs:
//! messages in, an ordered stream of text fragments out.

pub mod openai;
pub mod streaming;

use async_trait::async_trait;
pub use openai::ChatCompletionClient;
pub use streaming::SseDecoder;
pub use streaming::StreamingResponse;
pub use streaming::TokenStream;

use crate::errors::Result;
use crate::models::ConversationMessage;

/// Streams a completion for a message list.
///
/// An `Err` from `complete_stream` means generation never started; faults
/// after that arrive as `Err` items inside the stream.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete_stream(&self, messages: &[ConversationMessage])
        -> Result<StreamingResponse>;
}
