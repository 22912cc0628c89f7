//! Expert generation: grounded prompt composition and the domain model call.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use super::{ChatBackend, ChatMessage, ChatRequest};
use crate::domain::Domain;

/// Context block used when retrieval found nothing.
pub const NO_CONTEXT_MARKER: &str = "(No relevant documents found.)";

/// Prefix of the answer returned when the expert call fails.
pub const EXPERT_ERROR_PREFIX: &str = "Error calling expert model:";

const EMPTY_COMPLETION: &str = "No response generated.";

/// Domain to expert model mapping with a guaranteed default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpertModels {
    models: HashMap<Domain, String>,
    default_model: String,
}

impl ExpertModels {
    pub fn new(models: HashMap<Domain, String>, default_model: impl Into<String>) -> Self {
        Self {
            models,
            default_model: default_model.into(),
        }
    }

    /// Mapping where `default_domain`'s model doubles as the default expert.
    /// Falls back to `default_model_hint` when that domain is unmapped.
    pub fn with_default_domain(
        models: HashMap<Domain, String>,
        default_domain: Domain,
        default_model_hint: &str,
    ) -> Self {
        let default_model = models
            .get(&default_domain)
            .cloned()
            .unwrap_or_else(|| default_model_hint.to_string());
        Self::new(models, default_model)
    }

    pub fn model_for(&self, domain: Domain) -> &str {
        self.models
            .get(&domain)
            .map(String::as_str)
            .filter(|model| !model.trim().is_empty())
            .unwrap_or(&self.default_model)
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    /// Distinct model names, default included, in a stable order.
    pub fn distinct_models(&self) -> Vec<String> {
        let mut models: Vec<String> = Domain::all()
            .iter()
            .map(|domain| self.model_for(*domain).to_string())
            .collect();
        models.push(self.default_model.clone());
        let mut seen = std::collections::HashSet::new();
        models.retain(|model| seen.insert(model.clone()));
        models
    }
}

/// Builds the grounded prompt handed to the expert model.
pub fn compose_prompt(query: &str, context_chunks: &[String]) -> String {
    let context = if context_chunks.is_empty() {
        NO_CONTEXT_MARKER.to_string()
    } else {
        context_chunks.join("\n\n")
    };

    format!(
        "Use the following context to answer the user question. If the context does not contain enough information, say so and answer from general knowledge.\n\
         \n\
         Context:\n\
         {context}\n\
         \n\
         User question: {query}\n\
         \n\
         Answer concisely and accurately."
    )
}

pub struct ExpertGenerator {
    backend: Arc<dyn ChatBackend>,
    models: ExpertModels,
}

impl ExpertGenerator {
    pub fn new(backend: Arc<dyn ChatBackend>, models: ExpertModels) -> Self {
        Self { backend, models }
    }

    pub fn models(&self) -> &ExpertModels {
        &self.models
    }

    /// Free-text answer from the domain's expert. Backend failures are folded into
    /// the returned text.
    pub fn generate(&self, domain: Domain, query: &str, context_chunks: &[String]) -> String {
        let model = self.models.model_for(domain);
        let prompt = compose_prompt(query, context_chunks);
        let request = ChatRequest::new(model, vec![ChatMessage::user(prompt)]);

        debug!(
            target: "intelhub::expert",
            %domain,
            model,
            context_chunks = context_chunks.len(),
            "calling expert model"
        );

        match self.backend.chat(&request) {
            Ok(answer) if answer.trim().is_empty() => EMPTY_COMPLETION.to_string(),
            Ok(answer) => answer,
            Err(err) => {
                warn!(target: "intelhub::expert", %domain, model, error = %err, "expert call failed");
                format!("{EXPERT_ERROR_PREFIX} {err}")
            }
        }
    }
}
