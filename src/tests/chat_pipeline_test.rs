/// End-to-end tests for the chat pipeline over in-process providers
///
/// Covers the request lifecycle from the raw conversation to the gated
/// output stream:
/// 1. Rejections before any provider call
/// 2. Context rendering with and without a match
/// 3. Streaming failures before and after the first token

#[cfg(test)]
mod chat_pipeline_tests {
    use std::sync::Arc;

    use futures::StreamExt;
    use tokio_util::sync::CancellationToken;

    use crate::config::AppConfig;
    use crate::errors::ProfragError;
    use crate::models::ConversationMessage;
    use crate::models::Role;
    use crate::rag::ChatOrchestrator;
    use crate::tests::fakes::review;
    use crate::tests::fakes::CountingEmbedder;
    use crate::tests::fakes::FakeCompletion;
    use crate::tests::fakes::ScriptedIndex;

    struct Harness {
        embedder: Arc<CountingEmbedder>,
        index: Arc<ScriptedIndex>,
        completion: Arc<FakeCompletion>,
        orchestrator: ChatOrchestrator,
    }

    fn harness(index: ScriptedIndex, completion: FakeCompletion) -> Harness {
        let embedder = Arc::new(CountingEmbedder::new());
        let index = Arc::new(index);
        let completion = Arc::new(completion);
        let orchestrator = ChatOrchestrator::from_services(
            &AppConfig::default(),
            embedder.clone(),
            index.clone(),
            completion.clone(),
        );
        Harness {
            embedder,
            index,
            completion,
            orchestrator,
        }
    }

    #[tokio::test]
    async fn test_whitespace_query_never_embeds() {
        let h = harness(ScriptedIndex::always_empty(), FakeCompletion::new(&["x"]));
        let conversation = vec![ConversationMessage::user("   \n\t")];

        let result = h
            .orchestrator
            .chat(&conversation, CancellationToken::new())
            .await;

        assert!(matches!(result, Err(ProfragError::EmptyQuery)));
        assert_eq!(h.embedder.calls(), 0);
        assert_eq!(h.completion.calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_conversation_is_malformed() {
        let h = harness(ScriptedIndex::always_empty(), FakeCompletion::new(&["x"]));

        let result = h.orchestrator.chat(&[], CancellationToken::new()).await;
        assert!(matches!(result, Err(ProfragError::MalformedRequest(_))));

        let result = h
            .orchestrator
            .chat(&[ConversationMessage::user("")], CancellationToken::new())
            .await;
        assert!(matches!(result, Err(ProfragError::MalformedRequest(_))));
        assert_eq!(h.embedder.calls(), 0);
    }

    #[tokio::test]
    async fn test_match_rating_reaches_prompt() {
        let h = harness(
            ScriptedIndex::new(vec![Ok(vec![review("m1", "Dr. Jane Smith", 4.0)])]),
            FakeCompletion::new(&["She is great."]),
        );
        let conversation = vec![ConversationMessage::user(
            "Tell me about Dr. Jane Smith please",
        )];

        let prepared = h.orchestrator.prepare(&conversation).await.unwrap();

        assert_eq!(prepared.search_key, "Dr. Jane Smith");
        assert_eq!(h.embedder.inputs(), vec!["Dr. Jane Smith".to_string()]);
        // Chat searches the namespace ingestion writes to
        assert_eq!(h.index.last_query(), Some((5, Some("ns1".to_string()))));
        assert!(prepared
            .prompt
            .final_user_turn()
            .content
            .contains("Rating: 4/5"));
    }

    #[tokio::test]
    async fn test_no_match_renders_not_found() {
        let h = harness(ScriptedIndex::always_empty(), FakeCompletion::new(&["Sorry."]));
        let conversation = vec![ConversationMessage::user("What about Dr. Jane Smith")];

        let prepared = h.orchestrator.prepare(&conversation).await.unwrap();

        assert!(prepared.selected.is_none());
        assert!(prepared
            .prompt
            .final_user_turn()
            .content
            .contains("No information found for \"Dr. Jane Smith\"."));
        // Three empty attempts with the default policy
        assert_eq!(h.embedder.calls(), 3);
        assert_eq!(h.index.query_calls(), 3);
    }

    #[tokio::test]
    async fn test_fallback_match_is_rendered() {
        let h = harness(
            ScriptedIndex::new(vec![Ok(vec![
                review("m1", "Dr. Alan Turing", 5.0),
                review("m2", "Dr. Grace Hopper", 4.5),
            ])]),
            FakeCompletion::new(&["ok"]),
        );
        let conversation = vec![ConversationMessage::user("Dr. Jane Smith")];

        let prepared = h.orchestrator.prepare(&conversation).await.unwrap();
        let selected = prepared.selected.unwrap();
        assert_eq!(selected.metadata.professor, "Dr. Alan Turing");
        assert!(prepared
            .prompt
            .final_user_turn()
            .content
            .contains("Name: Dr. Alan Turing"));
    }

    #[tokio::test]
    async fn test_stream_forwards_provider_fragments() {
        let h = harness(
            ScriptedIndex::new(vec![Ok(vec![review("m1", "Dr. A", 3.0)])]),
            FakeCompletion::new(&["  ", "Hi", "Hi", " there"]),
        );
        let conversation = vec![
            ConversationMessage::assistant("Hello! Ask me about a professor."),
            ConversationMessage::user("Dr. A"),
        ];

        let out: Vec<String> = h
            .orchestrator
            .chat(&conversation, CancellationToken::new())
            .await
            .unwrap()
            .map(|item| item.unwrap())
            .collect()
            .await;

        assert_eq!(out, vec!["Hi", "Hi", " there"]);

        let sent = h.completion.last_messages().unwrap();
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[0].role, Role::System);
        assert_eq!(sent[1].role, Role::Assistant);
        assert!(sent[2].content.starts_with("Dr. A\n\nHere is the information I found:\n"));
    }

    #[tokio::test]
    async fn test_provider_failure_before_first_token() {
        let h = harness(ScriptedIndex::always_empty(), FakeCompletion::failing());
        let conversation = vec![ConversationMessage::user("Dr. A")];

        let result = h
            .orchestrator
            .chat(&conversation, CancellationToken::new())
            .await;
        assert!(matches!(result, Err(ProfragError::LlmError(_))));
    }

    #[tokio::test]
    async fn test_mid_stream_failure_keeps_emitted_output() {
        let h = harness(
            ScriptedIndex::always_empty(),
            FakeCompletion::failing_after(&["one", " two", " three"], 2),
        );
        let conversation = vec![ConversationMessage::user("Dr. A")];

        let items: Vec<_> = h
            .orchestrator
            .chat(&conversation, CancellationToken::new())
            .await
            .unwrap()
            .collect()
            .await;

        assert_eq!(items.len(), 3);
        assert_eq!(items[0].as_deref().unwrap(), "one");
        assert_eq!(items[1].as_deref().unwrap(), " two");
        assert!(matches!(items[2], Err(ProfragError::CompletionStream(_))));
    }

    #[tokio::test]
    async fn test_zero_forwarded_tokens_still_completes() {
        let h = harness(ScriptedIndex::always_empty(), FakeCompletion::new(&[" ", "\n"]));
        let conversation = vec![ConversationMessage::user("Dr. A")];

        let out: Vec<_> = h
            .orchestrator
            .chat(&conversation, CancellationToken::new())
            .await
            .unwrap()
            .collect()
            .await;
        assert!(out.is_empty());
    }
}
