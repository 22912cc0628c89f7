#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use intelhub_lib::application::services::{
    ChatBackend, ChatRequest, DomainClassifier, DomainCollection, ExpertGenerator, ExpertModels,
    Retriever, VectorStore,
};
use intelhub_lib::application::IntelligenceHub;
use intelhub_lib::domain::{Domain, DomainError, NewChunk, ScoredChunk};

pub const ROUTER_MODEL: &str = "router-model";

pub fn expert_models() -> ExpertModels {
    let models = HashMap::from([
        (Domain::Finance, "finance-expert".to_string()),
        (Domain::Medical, "medical-expert".to_string()),
        (Domain::News, "news-expert".to_string()),
    ]);
    ExpertModels::with_default_domain(models, Domain::News, "news-expert")
}

type Reply = Box<dyn Fn(&ChatRequest) -> Result<String, DomainError> + Send + Sync>;

/// Chat double: one scripted reply for the router model and one for experts.
/// Every request is recorded.
pub struct ScriptedChat {
    router: Reply,
    expert: Reply,
    pub requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedChat {
    pub fn new(
        router: impl Fn(&ChatRequest) -> Result<String, DomainError> + Send + Sync + 'static,
        expert: impl Fn(&ChatRequest) -> Result<String, DomainError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            router: Box::new(router),
            expert: Box::new(expert),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn expert_requests(&self) -> Vec<ChatRequest> {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.model != ROUTER_MODEL)
            .cloned()
            .collect()
    }
}

impl ChatBackend for ScriptedChat {
    fn chat(&self, request: &ChatRequest) -> Result<String, DomainError> {
        self.requests.lock().push(request.clone());
        if request.model == ROUTER_MODEL {
            (self.router)(request)
        } else {
            (self.expert)(request)
        }
    }
}

/// In-memory store returning canned chunks per domain, in order.
#[derive(Default)]
pub struct FixtureStore {
    chunks: HashMap<Domain, Vec<String>>,
    fail: bool,
}

impl FixtureStore {
    pub fn with(mut self, domain: Domain, chunks: &[&str]) -> Self {
        self.chunks
            .insert(domain, chunks.iter().map(|c| c.to_string()).collect());
        self
    }

    pub fn failing() -> Self {
        Self {
            chunks: HashMap::new(),
            fail: true,
        }
    }
}

struct FixtureCollection {
    domain: Domain,
    chunks: Vec<String>,
    fail: bool,
}

impl DomainCollection for FixtureCollection {
    fn domain(&self) -> Domain {
        self.domain
    }

    fn add(&self, chunks: &[NewChunk]) -> Result<usize, DomainError> {
        Ok(chunks.len())
    }

    fn query(&self, _text: &str, limit: usize) -> Result<Vec<ScoredChunk>, DomainError> {
        if self.fail {
            return Err(DomainError::storage("index unavailable"));
        }
        Ok(self
            .chunks
            .iter()
            .take(limit)
            .enumerate()
            .map(|(i, text)| ScoredChunk {
                id: uuid::Uuid::new_v4(),
                text: text.clone(),
                source: "fixture".into(),
                score: 1.0 - i as f32 * 0.1,
            })
            .collect())
    }

    fn count(&self) -> Result<usize, DomainError> {
        if self.fail {
            return Err(DomainError::storage("index unavailable"));
        }
        Ok(self.chunks.len())
    }
}

impl VectorStore for FixtureStore {
    fn collection(&self, domain: Domain) -> Result<Arc<dyn DomainCollection>, DomainError> {
        Ok(Arc::new(FixtureCollection {
            domain,
            chunks: self.chunks.get(&domain).cloned().unwrap_or_default(),
            fail: self.fail,
        }))
    }
}

pub fn hub(chat: Arc<ScriptedChat>, store: Arc<dyn VectorStore>) -> IntelligenceHub {
    let backend: Arc<dyn ChatBackend> = chat;
    IntelligenceHub::new(
        DomainClassifier::new(Arc::clone(&backend), ROUTER_MODEL, Domain::Finance),
        Retriever::new(store, 5),
        ExpertGenerator::new(backend, expert_models()),
    )
}
