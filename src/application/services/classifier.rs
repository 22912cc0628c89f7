//! Query routing: asks a small router model to name the domain of a query.

use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{ChatBackend, ChatMessage, ChatRequest, ResponseFormat};
use crate::domain::{Domain, FallbackReason, RoutingDecision};

/// Result of scanning a router reply for `{"domain": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedRoute {
    Domain(Domain),
    /// An object was found but its value is not a configured domain.
    Unrecognized(String),
    /// Nothing resembling the expected object was found.
    Unparsed,
}

#[derive(Deserialize)]
struct RouteReply {
    domain: String,
}

fn route_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"\{[^{}]*"domain"\s*:\s*"[^"]+"\s*\}"#).expect("route pattern is valid")
    })
}

/// Extract the first `{"domain": "<value>"}` object from free text, tolerating
/// markdown fences or chatter around it.
pub fn parse_routing_reply(text: &str) -> ParsedRoute {
    let Some(found) = route_pattern().find(text) else {
        return ParsedRoute::Unparsed;
    };

    let Ok(reply) = serde_json::from_str::<RouteReply>(found.as_str()) else {
        return ParsedRoute::Unparsed;
    };

    let value = reply.domain.trim().to_lowercase();
    match value.parse::<Domain>() {
        Ok(domain) => ParsedRoute::Domain(domain),
        Err(_) => ParsedRoute::Unrecognized(value),
    }
}

/// Builds the router instruction for `query`.
pub fn routing_prompt(query: &str) -> String {
    format!(
        "Classify the following user query into exactly one domain. Reply with a JSON object only, no other text.\n\
         Domains: {domains}\n\
         \n\
         User query: {query}\n\
         \n\
         Respond with JSON in this exact format: {{\"domain\": \"<domain>\"}}",
        domains = Domain::names(),
    )
}

/// Maps queries to a domain. Never fails: any problem yields the fallback domain.
pub struct DomainClassifier {
    backend: Arc<dyn ChatBackend>,
    router_model: String,
    fallback: Domain,
}

impl DomainClassifier {
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        router_model: impl Into<String>,
        fallback: Domain,
    ) -> Self {
        Self {
            backend,
            router_model: router_model.into(),
            fallback,
        }
    }

    pub fn router_model(&self) -> &str {
        &self.router_model
    }

    pub fn fallback(&self) -> Domain {
        self.fallback
    }

    pub fn classify(&self, query: &str) -> RoutingDecision {
        let request = ChatRequest::new(
            &self.router_model,
            vec![ChatMessage::user(routing_prompt(query))],
        )
        .with_format(ResponseFormat::Json);

        let reply = match self.backend.chat(&request) {
            Ok(reply) => reply,
            Err(err) => {
                warn!(
                    target: "intelhub::router",
                    error = %err,
                    fallback = %self.fallback,
                    "router call failed"
                );
                return self.fall_back(FallbackReason::Backend(err.to_string()));
            }
        };

        match parse_routing_reply(&reply) {
            ParsedRoute::Domain(domain) => {
                debug!(target: "intelhub::router", %domain, "query classified");
                RoutingDecision::Classified { domain }
            }
            ParsedRoute::Unrecognized(value) => {
                warn!(
                    target: "intelhub::router",
                    value = %value,
                    fallback = %self.fallback,
                    "router named an unknown domain"
                );
                self.fall_back(FallbackReason::UnknownDomain(value))
            }
            ParsedRoute::Unparsed => {
                warn!(
                    target: "intelhub::router",
                    reply = %reply,
                    fallback = %self.fallback,
                    "router reply had no domain object"
                );
                self.fall_back(FallbackReason::Unparsed)
            }
        }
    }

    fn fall_back(&self, reason: FallbackReason) -> RoutingDecision {
        RoutingDecision::Fallback {
            domain: self.fallback,
            reason,
        }
    }
}
