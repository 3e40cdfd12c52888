//! Shared doubles for router-level tests
#![allow(dead_code)]

use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use futures::stream;
use futures::StreamExt;
use profrag::api::AppState;
use profrag::config::AppConfig;
use profrag::embeddings::Embedder;
use profrag::ingest::IngestionService;
use profrag::ingest::PageScraper;
use profrag::ingest::ReviewPage;
use profrag::llm::CompletionProvider;
use profrag::llm::StreamingResponse;
use profrag::llm::TokenStream;
use profrag::models::ConversationMessage;
use profrag::models::RetrievedMatch;
use profrag::models::ReviewMetadata;
use profrag::models::VectorRecord;
use profrag::rag::ChatOrchestrator;
use profrag::vector::VectorIndex;
use profrag::ProfragError;
use profrag::Result;
use tokio_util::sync::CancellationToken;

pub struct StubEmbedder;

#[async_trait]
impl Embedder for StubEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(vec![0.5; 4])
    }
}

#[derive(Default)]
pub struct StubIndex {
    pub matches: Vec<RetrievedMatch>,
    pub upserted: Mutex<Vec<VectorRecord>>,
}

#[async_trait]
impl VectorIndex for StubIndex {
    async fn query(
        &self,
        _vector: &[f32],
        _top_k: usize,
        _namespace: Option<&str>,
    ) -> Result<Vec<RetrievedMatch>> {
        Ok(self.matches.clone())
    }

    async fn upsert(&self, records: &[VectorRecord], _namespace: Option<&str>) -> Result<usize> {
        self.upserted.lock().unwrap().extend_from_slice(records);
        Ok(records.len())
    }
}

pub enum CompletionScript {
    Fragments(Vec<&'static str>),
    /// Fragments, then a stream that never ends
    Hang(Vec<&'static str>),
    Fail,
}

pub struct StubCompletion {
    pub script: CompletionScript,
    pub received: Mutex<Vec<Vec<ConversationMessage>>>,
}

impl StubCompletion {
    pub fn new(script: CompletionScript) -> Self {
        Self {
            script,
            received: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl CompletionProvider for StubCompletion {
    async fn complete_stream(
        &self,
        messages: &[ConversationMessage],
    ) -> Result<StreamingResponse> {
        self.received.lock().unwrap().push(messages.to_vec());
        let stream: TokenStream = match &self.script {
            CompletionScript::Fragments(parts) => Box::pin(stream::iter(
                parts
                    .iter()
                    .map(|p| Ok((*p).to_string()))
                    .collect::<Vec<Result<String>>>(),
            )),
            CompletionScript::Hang(parts) => Box::pin(
                stream::iter(
                    parts
                        .iter()
                        .map(|p| Ok((*p).to_string()))
                        .collect::<Vec<Result<String>>>(),
                )
                .chain(stream::pending::<Result<String>>()),
            ),
            CompletionScript::Fail => {
                return Err(ProfragError::LlmError("upstream 500".to_string()));
            }
        };
        Ok(StreamingResponse::new(stream))
    }
}

pub struct StubScraper {
    pub page: Option<ReviewPage>,
}

#[async_trait]
impl PageScraper for StubScraper {
    async fn scrape(&self, _link: &str) -> Result<ReviewPage> {
        self.page
            .clone()
            .ok_or_else(|| ProfragError::ScrapeError("no page".to_string()))
    }
}

pub fn professor(name: &str, stars: f64) -> RetrievedMatch {
    RetrievedMatch {
        id: name.to_string(),
        score: 0.92,
        metadata: ReviewMetadata {
            professor: name.to_string(),
            subject: "Physics".to_string(),
            university: "State University".to_string(),
            stars,
            review: "Explains things clearly.".to_string(),
        },
    }
}

pub fn sample_page() -> ReviewPage {
    ReviewPage {
        professor_name: "Dr. Jane Smith".to_string(),
        overall_rating: "4.0".to_string(),
        reviews: vec!["Kind and clear.".to_string()],
    }
}

pub struct TestApp {
    pub state: AppState,
    pub index: Arc<StubIndex>,
    pub completion: Arc<StubCompletion>,
}

pub fn test_app(
    matches: Vec<RetrievedMatch>,
    script: CompletionScript,
    page: Option<ReviewPage>,
) -> TestApp {
    let config = AppConfig::default();
    let index = Arc::new(StubIndex {
        matches,
        ..StubIndex::default()
    });
    let completion = Arc::new(StubCompletion::new(script));

    let chat = ChatOrchestrator::from_services(
        &config,
        Arc::new(StubEmbedder),
        index.clone(),
        completion.clone(),
    );
    let ingest = IngestionService::from_services(
        &config,
        Arc::new(StubScraper { page }),
        Arc::new(StubEmbedder),
        index.clone(),
    );

    TestApp {
        state: AppState {
            chat: Arc::new(chat),
            ingest: Arc::new(ingest),
            shutdown: CancellationToken::new(),
        },
        index,
        completion,
    }
}
