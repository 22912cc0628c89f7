use std::sync::Arc;

use tracing::info;

use super::ModelRegistry;
use crate::application::dtos::ModelReport;
use crate::domain::DomainError;

/// True when `required` is installed exactly or as a tagged variant
/// (`llama3.2:3b` matches `llama3.2:3b-q4_0`).
pub fn model_is_present(required: &str, installed: &[String]) -> bool {
    installed
        .iter()
        .any(|name| name == required || name.starts_with(required))
}

/// Checks the model backend for required models and pulls the missing ones.
pub struct ModelInventory {
    registry: Arc<dyn ModelRegistry>,
}

impl ModelInventory {
    pub fn new(registry: Arc<dyn ModelRegistry>) -> Self {
        Self { registry }
    }

    pub fn missing(&self, required: &[String]) -> Result<Vec<String>, DomainError> {
        let installed = self.registry.list_models()?;
        Ok(required
            .iter()
            .filter(|model| !model_is_present(model, &installed))
            .cloned()
            .collect())
    }

    /// Pull whatever is missing. Stops at the first failed pull.
    pub fn ensure(
        &self,
        required: &[String],
        progress: &mut dyn FnMut(&str, &str),
    ) -> Result<ModelReport, DomainError> {
        let installed = self.registry.list_models()?;
        info!(target: "intelhub::models", installed = installed.len(), "listed installed models");

        let (present, missing): (Vec<String>, Vec<String>) = required
            .iter()
            .cloned()
            .partition(|model| model_is_present(model, &installed));

        let mut pulled = Vec::with_capacity(missing.len());
        for model in missing {
            info!(target: "intelhub::models", model = %model, "pulling model");
            self.registry
                .pull_model(&model, &mut |status| progress(&model, status))?;
            pulled.push(model);
        }

        Ok(ModelReport {
            installed,
            already_present: present,
            pulled,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct FakeRegistry {
        installed: Vec<String>,
        pulled: Mutex<Vec<String>>,
        fail_on: Option<String>,
    }

    impl ModelRegistry for FakeRegistry {
        fn list_models(&self) -> Result<Vec<String>, DomainError> {
            Ok(self.installed.clone())
        }

        fn pull_model(
            &self,
            model: &str,
            progress: &mut dyn FnMut(&str),
        ) -> Result<(), DomainError> {
            if self.fail_on.as_deref() == Some(model) {
                return Err(DomainError::backend("pull failed"));
            }
            progress("pulling manifest");
            progress("success");
            self.pulled.lock().push(model.to_string());
            Ok(())
        }
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn presence_accepts_exact_and_prefixed_names() {
        let installed = strings(&["llama3.2:3b-q4_0", "nomic-embed-text:latest"]);
        assert!(model_is_present("llama3.2:3b", &installed));
        assert!(model_is_present("nomic-embed-text", &installed));
        assert!(!model_is_present("qwen2.5:3b", &installed));
    }

    #[test]
    fn ensure_pulls_only_missing_models() {
        let registry = Arc::new(FakeRegistry {
            installed: strings(&["llama3.2:3b"]),
            pulled: Mutex::new(Vec::new()),
            fail_on: None,
        });
        let inventory = ModelInventory::new(registry.clone());

        let mut statuses = Vec::new();
        let report = inventory
            .ensure(&strings(&["llama3.2:3b", "qwen2.5:3b"]), &mut |model, status| {
                statuses.push(format!("{model}: {status}"))
            })
            .unwrap();

        assert_eq!(report.already_present, strings(&["llama3.2:3b"]));
        assert_eq!(report.pulled, strings(&["qwen2.5:3b"]));
        assert_eq!(*registry.pulled.lock(), strings(&["qwen2.5:3b"]));
        assert_eq!(statuses, strings(&["qwen2.5:3b: pulling manifest", "qwen2.5:3b: success"]));
    }

    #[test]
    fn failed_pull_is_reported() {
        let registry = Arc::new(FakeRegistry {
            installed: Vec::new(),
            pulled: Mutex::new(Vec::new()),
            fail_on: Some("qwen2.5:3b".into()),
        });
        let inventory = ModelInventory::new(registry);
        let err = inventory
            .ensure(&strings(&["qwen2.5:3b"]), &mut |_, _| {})
            .unwrap_err();
        assert!(matches!(err, DomainError::Backend(_)));
    }

    #[test]
    fn missing_lists_absent_models() {
        let inventory = ModelInventory::new(Arc::new(FakeRegistry {
            installed: strings(&["nomic-embed-text:latest"]),
            pulled: Mutex::new(Vec::new()),
            fail_on: None,
        }));
        let missing = inventory
            .missing(&strings(&["nomic-embed-text", "qwen2.5:3b"]))
            .unwrap();
        assert_eq!(missing, strings(&["qwen2.5:3b"]));
    }
}
