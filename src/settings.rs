use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::application::services::{ChunkingConfig, ExpertModels};
use crate::domain::{Domain, DomainError};

/// Default filename used to persist configuration within the data directory.
const CONFIG_FILENAME: &str = "config.json";

pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";
pub const DEFAULT_ROUTER_MODEL: &str = "llama3.2:3b";
pub const DEFAULT_EMBEDDING_MODEL: &str = "nomic-embed-text";

/// Embedding backends compiled into the binary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "backend", rename_all = "kebab-case")]
pub enum EmbeddingBackend {
    /// Embeddings computed by the Ollama server.
    Ollama {
        #[serde(default = "default_ollama_embed_model")]
        model: String,
    },
    /// Deterministic hash embedder (offline, no model download).
    Simple {
        #[serde(default = "default_simple_model")]
        model: String,
        #[serde(default = "default_simple_dim")]
        dimensions: usize,
    },
    /// In-process ONNX embeddings through fastembed.
    #[cfg(feature = "fastembed-engine")]
    FastEmbed { model: String },
}

impl EmbeddingBackend {
    pub fn id(&self) -> &'static str {
        match self {
            EmbeddingBackend::Ollama { .. } => "ollama",
            EmbeddingBackend::Simple { .. } => "simple",
            #[cfg(feature = "fastembed-engine")]
            EmbeddingBackend::FastEmbed { .. } => "fastembed",
        }
    }

    pub fn model_name(&self) -> &str {
        match self {
            EmbeddingBackend::Ollama { model } => model,
            EmbeddingBackend::Simple { model, .. } => model,
            #[cfg(feature = "fastembed-engine")]
            EmbeddingBackend::FastEmbed { model } => model,
        }
    }

    /// Whether the embedding model has to be present on the Ollama server.
    pub fn uses_ollama(&self) -> bool {
        matches!(self, EmbeddingBackend::Ollama { .. })
    }

    /// Backend for `id` with its default model, or `model` when given.
    pub fn from_id(id: &str, model: Option<String>) -> Result<Self, DomainError> {
        let model = model.filter(|m| !m.trim().is_empty());
        match id.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(EmbeddingBackend::Ollama {
                model: model.unwrap_or_else(default_ollama_embed_model),
            }),
            "simple" => Ok(EmbeddingBackend::Simple {
                model: model.unwrap_or_else(default_simple_model),
                dimensions: default_simple_dim(),
            }),
            #[cfg(feature = "fastembed-engine")]
            "fastembed" => Ok(EmbeddingBackend::FastEmbed {
                model: model.unwrap_or_else(default_fastembed_model),
            }),
            other => Err(DomainError::validation(format!(
                "unknown embedding backend `{other}` (expected one of: {})",
                available_backends().join(", ")
            ))),
        }
    }

    fn with_model(&self, model: String) -> Self {
        match self {
            EmbeddingBackend::Ollama { .. } => EmbeddingBackend::Ollama { model },
            EmbeddingBackend::Simple { dimensions, .. } => EmbeddingBackend::Simple {
                model,
                dimensions: *dimensions,
            },
            #[cfg(feature = "fastembed-engine")]
            EmbeddingBackend::FastEmbed { .. } => EmbeddingBackend::FastEmbed { model },
        }
    }
}

impl Default for EmbeddingBackend {
    fn default() -> Self {
        EmbeddingBackend::Ollama {
            model: default_ollama_embed_model(),
        }
    }
}

/// Complete persisted configuration payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub ollama_host: String,
    pub router_model: String,
    pub expert_models: BTreeMap<Domain, String>,
    /// Domain whose expert answers when a domain has no model of its own.
    pub default_expert_domain: Domain,
    /// Domain used when the router's reply cannot be trusted.
    pub fallback_domain: Domain,
    pub embedding: EmbeddingBackend,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
    pub request_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        let expert_models = BTreeMap::from([
            (Domain::Finance, "qwen2.5:3b".to_string()),
            (Domain::Medical, "llama3.2:3b".to_string()),
            (Domain::News, "llama3.2:3b".to_string()),
        ]);

        Self {
            ollama_host: DEFAULT_OLLAMA_HOST.to_string(),
            router_model: DEFAULT_ROUTER_MODEL.to_string(),
            expert_models,
            default_expert_domain: Domain::News,
            fallback_domain: Domain::ALL[0],
            embedding: EmbeddingBackend::default(),
            chunk_size: 1000,
            chunk_overlap: 200,
            top_k: 5,
            request_timeout_secs: 120,
        }
    }
}

impl AppConfig {
    pub fn chunking(&self) -> ChunkingConfig {
        ChunkingConfig::new(self.chunk_size, self.chunk_overlap)
    }

    pub fn expert_models(&self) -> ExpertModels {
        let models: HashMap<Domain, String> = self
            .expert_models
            .iter()
            .map(|(domain, model)| (*domain, model.clone()))
            .collect();
        ExpertModels::with_default_domain(models, self.default_expert_domain, DEFAULT_ROUTER_MODEL)
    }

    /// Every model the Ollama server must provide for this configuration.
    pub fn required_models(&self) -> Vec<String> {
        let mut required = vec![self.router_model.clone()];
        required.extend(self.expert_models().distinct_models());
        if self.embedding.uses_ollama() {
            required.push(self.embedding.model_name().to_string());
        }
        let mut seen = std::collections::HashSet::new();
        required.retain(|model| seen.insert(model.clone()));
        required
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.chunk_size == 0 {
            return Err(DomainError::validation("chunk_size must be greater than zero"));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(DomainError::validation(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.top_k == 0 {
            return Err(DomainError::validation("top_k must be greater than zero"));
        }
        if self.router_model.trim().is_empty() {
            return Err(DomainError::validation("router_model cannot be empty"));
        }
        if self.ollama_host.trim().is_empty() {
            return Err(DomainError::validation("ollama_host cannot be empty"));
        }
        Ok(())
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), DomainError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`. Blank values are ignored.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), DomainError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(host) = get("OLLAMA_HOST") {
            self.ollama_host = host;
        }
        if let Some(model) = get("ROUTER_MODEL") {
            self.router_model = model;
        }
        for domain in Domain::all() {
            let key = format!("MODEL_{}", domain.as_str().to_ascii_uppercase());
            if let Some(model) = get(&key) {
                self.expert_models.insert(*domain, model);
            }
        }
        if let Some(domain) = get("DEFAULT_EXPERT_DOMAIN") {
            self.default_expert_domain = domain.parse()?;
        }
        if let Some(domain) = get("FALLBACK_DOMAIN") {
            self.fallback_domain = domain.parse()?;
        }

        let model = get("EMBEDDING_MODEL");
        match get("EMBEDDING_BACKEND") {
            Some(id) => self.embedding = EmbeddingBackend::from_id(&id, model)?,
            None => {
                if let Some(model) = model {
                    self.embedding = self.embedding.with_model(model);
                }
            }
        }

        if let Some(value) = get("CHUNK_SIZE") {
            self.chunk_size = parse_number("CHUNK_SIZE", &value)?;
        }
        if let Some(value) = get("CHUNK_OVERLAP") {
            self.chunk_overlap = parse_number("CHUNK_OVERLAP", &value)?;
        }
        if let Some(value) = get("TOP_K_RETRIEVAL") {
            self.top_k = parse_number("TOP_K_RETRIEVAL", &value)?;
        }
        if let Some(value) = get("REQUEST_TIMEOUT_SECS") {
            self.request_timeout_secs = parse_number("REQUEST_TIMEOUT_SECS", &value)?;
        }

        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, DomainError> {
    value
        .parse()
        .map_err(|_| {
            DomainError::validation(format!(
                "{key} must be a non-negative integer, got `{value}`"
            ))
        })
}

/// Thread-safe manager responsible for loading and persisting `AppConfig`.
pub struct ConfigManager {
    path: PathBuf,
    state: RwLock<AppConfig>,
}

impl ConfigManager {
    /// Create a manager rooted at `data_dir`. The JSON file lives at
    /// `<data_dir>/config.json`; a missing or unreadable file yields defaults.
    pub fn load(data_dir: impl AsRef<Path>) -> Result<Self, DomainError> {
        let path = data_dir.as_ref().join(CONFIG_FILENAME);
        let config = if path.exists() {
            fs::read(&path)
                .ok()
                .and_then(|bytes| serde_json::from_slice::<AppConfig>(&bytes).ok())
                .unwrap_or_default()
        } else {
            AppConfig::default()
        };

        Ok(Self {
            path,
            state: RwLock::new(config),
        })
    }

    /// Load from disk, then layer environment overrides on top and validate.
    pub fn load_with_env(data_dir: impl AsRef<Path>) -> Result<Self, DomainError> {
        let manager = Self::load(data_dir)?;
        {
            let mut guard = manager.state.write();
            guard.apply_env()?;
            guard.validate()?;
        }
        Ok(manager)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot of the current configuration.
    pub fn current(&self) -> AppConfig {
        self.state.read().clone()
    }

    /// Write the current configuration, environment overrides included, to disk.
    pub fn persist(&self) -> Result<(), DomainError> {
        let guard = self.state.read();
        self.persist_locked(&guard)
    }

    fn persist_locked(&self, config: &AppConfig) -> Result<(), DomainError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|err| {
                    DomainError::storage(format!("failed to create {:?}: {err}", parent))
                })?;
        }
        let payload = serde_json::to_vec_pretty(config)
            .map_err(|err| DomainError::other(format!("failed to encode config: {err}")))?;
        fs::write(&self.path, payload)
            .map_err(|err| DomainError::storage(format!("failed to write {:?}: {err}", self.path)))
    }
}

pub fn available_backends() -> Vec<&'static str> {
    let mut backends = vec!["ollama", "simple"];
    if cfg!(feature = "fastembed-engine") {
        backends.push("fastembed");
    }
    backends
}

const fn default_simple_dim() -> usize {
    256
}

fn default_simple_model() -> String {
    crate::infrastructure::embeddings::DEFAULT_SIMPLE_MODEL.to_string()
}

fn default_ollama_embed_model() -> String {
    DEFAULT_EMBEDDING_MODEL.to_string()
}

#[cfg(feature = "fastembed-engine")]
fn default_fastembed_model() -> String {
    "BAAI/bge-small-en-v1.5".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_the_shipped_models() {
        let config = AppConfig::default();
        assert_eq!(config.router_model, "llama3.2:3b");
        assert_eq!(config.expert_models[&Domain::Finance], "qwen2.5:3b");
        assert_eq!(config.fallback_domain, Domain::Finance);
        assert_eq!(config.expert_models().default_model(), "llama3.2:3b");
        assert_eq!(config.embedding.model_name(), "nomic-embed-text");
        assert_eq!(config.chunking(), ChunkingConfig::new(1000, 200));
        config.validate().unwrap();
    }

    #[test]
    fn required_models_are_distinct() {
        let config = AppConfig::default();
        assert_eq!(
            config.required_models(),
            vec!["llama3.2:3b", "qwen2.5:3b", "nomic-embed-text"]
        );

        let mut offline = config.clone();
        offline.embedding = EmbeddingBackend::from_id("simple", None).unwrap();
        assert!(!offline
            .required_models()
            .contains(&"nomic-embed-text".to_string()));
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = AppConfig::default();
        config
            .apply_overrides(env(&[
                ("OLLAMA_HOST", "http://gpu-box:11434"),
                ("MODEL_MEDICAL", "meditron:7b"),
                ("FALLBACK_DOMAIN", "News"),
                ("EMBEDDING_BACKEND", "simple"),
                ("TOP_K_RETRIEVAL", "3"),
                ("ROUTER_MODEL", "   "),
            ]))
            .unwrap();

        assert_eq!(config.ollama_host, "http://gpu-box:11434");
        assert_eq!(config.expert_models[&Domain::Medical], "meditron:7b");
        assert_eq!(config.fallback_domain, Domain::News);
        assert_eq!(config.embedding.id(), "simple");
        assert_eq!(config.top_k, 3);
        assert_eq!(config.router_model, DEFAULT_ROUTER_MODEL);
    }

    #[test]
    fn embedding_model_override_keeps_backend() {
        let mut config = AppConfig::default();
        config
            .apply_overrides(env(&[("EMBEDDING_MODEL", "mxbai-embed-large")]))
            .unwrap();
        assert_eq!(
            config.embedding,
            EmbeddingBackend::Ollama {
                model: "mxbai-embed-large".into()
            }
        );
    }

    #[test]
    fn invalid_overrides_are_rejected() {
        let mut config = AppConfig::default();
        assert!(config
            .apply_overrides(env(&[("FALLBACK_DOMAIN", "sports")]))
            .is_err());
        assert!(config.apply_overrides(env(&[("CHUNK_SIZE", "big")])).is_err());
        assert!(config
            .apply_overrides(env(&[("EMBEDDING_BACKEND", "word2vec")]))
            .is_err());

        let mut config = AppConfig::default();
        config.chunk_overlap = config.chunk_size;
        assert!(config.validate().is_err());
    }

    #[test]
    fn persisted_overrides_survive_reload() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ConfigManager::load(dir.path()).unwrap();
        assert!(!manager.path().exists());
        {
            let mut guard = manager.state.write();
            guard
                .apply_overrides(env(&[
                    ("TOP_K_RETRIEVAL", "8"),
                    ("DEFAULT_EXPERT_DOMAIN", "finance"),
                ]))
                .unwrap();
        }
        manager.persist().unwrap();

        let reloaded = ConfigManager::load(dir.path()).unwrap().current();
        assert_eq!(reloaded.top_k, 8);
        assert_eq!(reloaded.expert_models().default_model(), "qwen2.5:3b");
    }

    #[test]
    fn partial_config_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILENAME),
            r#"{"router_model": "phi3:mini", "embedding": {"backend": "simple"}}"#,
        )
        .unwrap();

        let config = ConfigManager::load(dir.path()).unwrap().current();
        assert_eq!(config.router_model, "phi3:mini");
        assert_eq!(config.top_k, 5);
        assert_eq!(
            config.embedding,
            EmbeddingBackend::Simple {
                model: default_simple_model(),
                dimensions: 256
            }
        );
    }
}
