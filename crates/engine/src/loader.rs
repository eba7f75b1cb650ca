//! Load workflow definitions from a directory of JSON files.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::compile::{compile, CompiledWorkflow};
use crate::expression::ExpressionEvaluator;
use crate::models::WorkflowDefinition;
use crate::registry::WorkflowRegistry;
use crate::EngineError;

/// Reads `*.json` workflow documents, validates and compiles them.
pub struct WorkflowLoader {
    dir: PathBuf,
    evaluator: Arc<dyn ExpressionEvaluator>,
}

impl WorkflowLoader {
    pub fn new(dir: impl Into<PathBuf>, evaluator: Arc<dyn ExpressionEvaluator>) -> Self {
        Self {
            dir: dir.into(),
            evaluator,
        }
    }

    /// Load and compile one file.
    pub fn load_one(&self, path: impl AsRef<Path>) -> Result<CompiledWorkflow, EngineError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| EngineError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let definition = WorkflowDefinition::from_json(&content)?;
        let compiled = compile(&definition, self.evaluator.as_ref())?;
        debug!("loaded workflow '{}' from {}", compiled.id(), path.display());
        Ok(compiled)
    }

    /// Load every `*.json` file in the directory, in file-name order.
    pub fn load_all(&self) -> Result<Vec<CompiledWorkflow>, EngineError> {
        let io_error = |source| EngineError::Io {
            path: self.dir.clone(),
            source,
        };

        let mut paths: Vec<PathBuf> = std::fs::read_dir(&self.dir)
            .map_err(io_error)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<Result<_, _>>()
            .map_err(io_error)?;
        paths.retain(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"));
        paths.sort();

        paths.iter().map(|p| self.load_one(p)).collect()
    }

    /// Load everything and register it.  Returns how many workflows were registered.
    pub fn register_all(&self, registry: &WorkflowRegistry) -> Result<usize, EngineError> {
        let workflows = self.load_all()?;
        let count = workflows.len();
        for workflow in workflows {
            registry.register(workflow);
        }
        info!("registered {} workflow(s) from {}", count, self.dir.display());
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::JinjaExpressionEvaluator;
    use std::fs;
    use tempfile::tempdir;

    const SHIPPING: &str = r#"{
        "id": "shipping",
        "steps": [
            { "id": "pack", "actions": ["Pack"], "transitions": { "success": "send" } },
            { "id": "send", "actions": ["Send"], "is_final": true }
        ]
    }"#;

    const BILLING: &str = r#"{
        "id": "billing",
        "steps": [{ "id": "charge", "actions": ["Charge"], "is_final": true }]
    }"#;

    fn loader(dir: &Path) -> WorkflowLoader {
        WorkflowLoader::new(dir, Arc::new(JinjaExpressionEvaluator::new()))
    }

    #[test]
    fn loads_json_files_in_name_order() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("b_shipping.json"), SHIPPING).unwrap();
        fs::write(dir.path().join("a_billing.json"), BILLING).unwrap();
        fs::write(dir.path().join("notes.txt"), "not a workflow").unwrap();

        let workflows = loader(dir.path()).load_all().unwrap();
        let ids: Vec<&str> = workflows.iter().map(|w| w.id()).collect();
        assert_eq!(ids, vec!["billing", "shipping"]);
    }

    #[test]
    fn register_all_fills_the_registry() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("shipping.json"), SHIPPING).unwrap();

        let registry = WorkflowRegistry::new();
        assert_eq!(loader(dir.path()).register_all(&registry).unwrap(), 1);
        assert!(registry.has("shipping"));
    }

    #[test]
    fn invalid_definition_fails_the_load() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("broken.json"),
            r#"{ "id": "broken", "steps": [{ "id": "a", "actions": ["A"] }] }"#,
        )
        .unwrap();

        let err = loader(dir.path()).load_all().unwrap_err();
        assert!(matches!(err, EngineError::NoFinalStep(_)));
    }

    #[test]
    fn missing_directory_is_an_io_error() {
        let dir = tempdir().unwrap();
        let err = loader(&dir.path().join("nope")).load_all().unwrap_err();
        assert!(matches!(err, EngineError::Io { .. }));
    }
}
