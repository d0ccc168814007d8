//! Workflow Catalog - validated definitions keyed by id
//!
//! The catalog is an explicit object handed to the CLI and tests; there is
//! no global registry. Every definition is validated on registration, so a
//! workflow with a definition error is never offered.

use std::path::Path;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::ast::WorkflowDefinition;
use crate::dag::{validate_definition, ValidationReport};
use crate::error::{Result, SkillflowError};

/// Pipelines shipped with the binary
const BUILTIN: [(&str, &str); 3] = [
    (
        "job-application.yaml",
        include_str!("builtin/job-application.yaml"),
    ),
    (
        "interview-prep.yaml",
        include_str!("builtin/interview-prep.yaml"),
    ),
    (
        "post-interview.yaml",
        include_str!("builtin/post-interview.yaml"),
    ),
];

/// Insertion-ordered set of validated workflows
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    workflows: Vec<Arc<WorkflowDefinition>>,
    index: FxHashMap<String, usize>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog holding the built-in pipelines
    pub fn builtin() -> Result<Self> {
        let mut catalog = Self::new();
        for (file, yaml) in BUILTIN {
            let definition =
                WorkflowDefinition::from_yaml(yaml).map_err(|e| SkillflowError::ParseError {
                    details: format!("built-in {}: {}", file, e),
                })?;
            catalog.register(definition)?;
        }
        Ok(catalog)
    }

    /// Validate and add a definition
    ///
    /// Returns the validation warnings. A definition error or an id that is
    /// already registered leaves the catalog unchanged.
    pub fn register(&mut self, definition: WorkflowDefinition) -> Result<ValidationReport> {
        if self.index.contains_key(&definition.id) {
            return Err(SkillflowError::DuplicateWorkflow {
                id: definition.id.clone(),
            });
        }

        let report = validate_definition(&definition)?;
        debug!(workflow = %definition.id, steps = definition.steps.len(), "Registered workflow");

        self.index.insert(definition.id.clone(), self.workflows.len());
        self.workflows.push(Arc::new(definition));
        Ok(report)
    }

    /// Parse one YAML file and register it
    pub fn load_file(&mut self, path: &Path) -> Result<ValidationReport> {
        let content = std::fs::read_to_string(path)?;
        let definition =
            WorkflowDefinition::from_yaml(&content).map_err(|e| SkillflowError::ParseError {
                details: format!("{}: {}", path.display(), e),
            })?;
        self.register(definition)
    }

    /// Register every `*.yaml` / `*.yml` file in `dir` (not recursive)
    ///
    /// Files are loaded in name order. Returns how many were added. A missing
    /// directory adds nothing.
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize> {
        if !dir.is_dir() {
            warn!(dir = %dir.display(), "Workflows directory does not exist");
            return Ok(0);
        }

        let mut files = Vec::new();
        for ext in ["yaml", "yml"] {
            let pattern = dir.join(format!("*.{}", ext)).to_string_lossy().to_string();
            let entries = glob::glob(&pattern).map_err(|e| SkillflowError::ConfigError {
                reason: format!("bad workflows_dir pattern '{}': {}", pattern, e),
            })?;
            for entry in entries {
                let path = entry.map_err(|e| SkillflowError::Io(e.into_error()))?;
                files.push(path);
            }
        }
        files.sort();

        for path in &files {
            self.load_file(path)?;
        }
        Ok(files.len())
    }

    /// Look up a workflow by id
    pub fn get(&self, id: &str) -> Result<Arc<WorkflowDefinition>> {
        self.index
            .get(id)
            .map(|&idx| Arc::clone(&self.workflows[idx]))
            .ok_or_else(|| SkillflowError::WorkflowNotFound { id: id.to_string() })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Workflows in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<WorkflowDefinition>> {
        self.workflows.iter()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.workflows.iter().map(|w| w.id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.workflows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workflows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const EXTRA: &str = r#"
schema: skillflow/workflow@0.1
id: extra
name: Extra
global_inputs:
  - id: topic
    label: Topic
    required: true
steps:
  - id: s1
    skill_id: summarize
    name: Summarize
    output_key: summary
    input_mappings:
      text:
        type: global
        input_id: topic
"#;

    #[test]
    fn builtin_catalog_loads_in_order() {
        let catalog = Catalog::builtin().unwrap();
        assert_eq!(
            catalog.ids(),
            vec!["job-application", "interview-prep", "post-interview"]
        );
        assert!(catalog.get("interview-prep").is_ok());
    }

    #[test]
    fn unknown_id_is_not_found() {
        let catalog = Catalog::new();
        let err = catalog.get("nope").unwrap_err();
        assert_eq!(err.code(), "SKF-002");
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let mut catalog = Catalog::new();
        catalog
            .register(WorkflowDefinition::from_yaml(EXTRA).unwrap())
            .unwrap();
        let err = catalog
            .register(WorkflowDefinition::from_yaml(EXTRA).unwrap())
            .unwrap_err();
        assert_eq!(err.code(), "SKF-003");
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn definition_error_blocks_registration() {
        let broken = EXTRA.replace("input_id: topic", "input_id: ghost");
        let mut catalog = Catalog::new();
        let err = catalog
            .register(WorkflowDefinition::from_yaml(&broken).unwrap())
            .unwrap_err();
        assert!(err.is_definition_error());
        assert!(catalog.is_empty());
    }

    #[test]
    fn load_dir_picks_up_yaml_and_yml() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.yaml"), EXTRA).unwrap();
        std::fs::write(
            dir.path().join("b.yml"),
            EXTRA.replace("id: extra", "id: extra-two"),
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let mut catalog = Catalog::new();
        assert_eq!(catalog.load_dir(dir.path()).unwrap(), 2);
        assert_eq!(catalog.ids(), vec!["extra", "extra-two"]);
    }

    #[test]
    fn load_dir_missing_directory_adds_nothing() {
        let mut catalog = Catalog::new();
        let added = catalog
            .load_dir(Path::new("/definitely/not/a/real/dir"))
            .unwrap();
        assert_eq!(added, 0);
    }
}
