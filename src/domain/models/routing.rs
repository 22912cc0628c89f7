#[cfg(feature = "mcp-server")]
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::Domain;

/// Why the router could not trust the model's answer.
#[cfg_attr(feature = "mcp-server", derive(JsonSchema))]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FallbackReason {
    /// No `{"domain": "..."}` object could be extracted from the reply.
    Unparsed,
    /// The reply named a domain outside the configured set.
    UnknownDomain(String),
    /// The completion call itself failed.
    Backend(String),
}

/// Outcome of classifying a query. Both variants carry a usable domain.
#[cfg_attr(feature = "mcp-server", derive(JsonSchema))]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RoutingDecision {
    Classified { domain: Domain },
    Fallback { domain: Domain, reason: FallbackReason },
}

impl RoutingDecision {
    pub fn domain(&self) -> Domain {
        match self {
            Self::Classified { domain } | Self::Fallback { domain, .. } => *domain,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }

    pub fn fallback_reason(&self) -> Option<&FallbackReason> {
        match self {
            Self::Classified { .. } => None,
            Self::Fallback { reason, .. } => Some(reason),
        }
    }
}
