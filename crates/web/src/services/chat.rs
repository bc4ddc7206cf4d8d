//! Chat streaming service.
//!
//! A reply is a lazy, finite, non-restartable stream of text fragments.
//! Fragments are accumulated while they are forwarded; the assistant
//! message is committed to the transcript at most once, on clean
//! completion. A mid-stream error discards the partial accumulation.

use futures::{Stream, StreamExt};
use tracing::instrument;

use crate::backend::{BackendClient, BackendError};
use crate::models::ChatMessage;

/// Chat operations against the chat backend.
#[derive(Clone)]
pub struct ChatService {
    backend: BackendClient,
}

impl ChatService {
    #[must_use]
    pub const fn new(backend: BackendClient) -> Self {
        Self { backend }
    }

    /// Open the fragment stream for a reply to `transcript`.
    ///
    /// # Errors
    ///
    /// Returns an error if the stream cannot be opened.
    #[instrument(skip(self, transcript), fields(model = %model, turns = transcript.len()))]
    pub async fn reply_stream(
        &self,
        transcript: &[ChatMessage],
        model: &str,
    ) -> Result<impl Stream<Item = Result<String, BackendError>> + use<>, BackendError> {
        self.backend.chat_stream(transcript, model).await
    }
}

/// Drain a fragment stream into the complete reply.
///
/// Returns the accumulated text only if the stream finishes without an
/// error item; a failure discards everything accumulated so far.
///
/// # Errors
///
/// Returns the first stream error.
pub async fn collect_reply<S>(stream: S) -> Result<String, BackendError>
where
    S: Stream<Item = Result<String, BackendError>>,
{
    let mut stream = std::pin::pin!(stream);
    let mut reply = String::new();

    while let Some(item) = stream.next().await {
        reply.push_str(&item?);
    }

    Ok(reply)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use futures::stream;

    #[tokio::test]
    async fn test_collect_reply_accumulates_fragments() {
        let fragments = stream::iter(vec![
            Ok("Take ".to_owned()),
            Ok("two ".to_owned()),
            Ok("tablets".to_owned()),
        ]);
        let reply = collect_reply(fragments).await.unwrap();
        assert_eq!(reply, "Take two tablets");
    }

    #[tokio::test]
    async fn test_collect_reply_discards_partial_on_error() {
        let fragments = stream::iter(vec![
            Ok("Take ".to_owned()),
            Err(BackendError::Stream("connection reset".to_owned())),
            Ok("never seen".to_owned()),
        ]);
        let result = collect_reply(fragments).await;
        assert!(matches!(result, Err(BackendError::Stream(_))));
    }

    #[tokio::test]
    async fn test_collect_reply_empty_stream() {
        let fragments = stream::iter(Vec::<Result<String, BackendError>>::new());
        let reply = collect_reply(fragments).await.unwrap();
        assert!(reply.is_empty());
    }
}
