use tracing::{info, warn};

use super::{DomainClassifier, ExpertGenerator, Retriever};
use crate::application::dtos::HubAnswer;

/// Router → retrieval → expert pipeline.
///
/// Holds no per-request state; share it behind an `Arc` across concurrent callers.
pub struct IntelligenceHub {
    classifier: DomainClassifier,
    retriever: Retriever,
    generator: ExpertGenerator,
}

impl IntelligenceHub {
    pub fn new(
        classifier: DomainClassifier,
        retriever: Retriever,
        generator: ExpertGenerator,
    ) -> Self {
        Self {
            classifier,
            retriever,
            generator,
        }
    }

    /// Answer text for `query`. Never fails.
    pub fn query_intelligence_hub(&self, query: &str) -> String {
        self.run(query).answer
    }

    /// Runs the pipeline and reports how the answer was produced.
    pub fn run(&self, query: &str) -> HubAnswer {
        let routing = self.classifier.classify(query);
        let domain = routing.domain();

        let (chunks, retrieval_error) = match self.retriever.retrieve(domain, query, None) {
            Ok(chunks) => (chunks, None),
            Err(err) => {
                warn!(
                    target: "intelhub::retrieval",
                    %domain,
                    error = %err,
                    "retrieval failed; answering without context"
                );
                (Vec::new(), Some(err.to_string()))
            }
        };

        let answer = self.generator.generate(domain, query, &chunks);

        info!(
            target: "intelhub::hub",
            %domain,
            fallback = routing.is_fallback(),
            chunks = chunks.len(),
            "query answered"
        );

        HubAnswer {
            query: query.to_string(),
            domain,
            expert_model: self.generator.models().model_for(domain).to_string(),
            routing,
            chunks_retrieved: chunks.len(),
            retrieval_error,
            answer,
        }
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    pub fn classifier(&self) -> &DomainClassifier {
        &self.classifier
    }

    pub fn generator(&self) -> &ExpertGenerator {
        &self.generator
    }
}
