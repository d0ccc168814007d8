//! Skillflow Error Types with Error Codes
//!
//! Error code ranges:
//! - SKF-000-009: Workflow file / catalog errors
//! - SKF-010-019: Definition errors (caught before anything runs)
//! - SKF-020-029: Run errors (fatal to one run, confined to one batch item)
//! - SKF-030-039: Batch setup errors
//! - SKF-040-049: CSV errors
//! - SKF-050-059: Configuration / invoker errors

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SkillflowError>;

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

#[derive(Error, Debug)]
pub enum SkillflowError {
    // ═══════════════════════════════════════════
    // WORKFLOW FILE / CATALOG (000-009)
    // ═══════════════════════════════════════════
    #[error("[SKF-001] Failed to parse workflow: {details}")]
    ParseError { details: String },

    #[error("[SKF-002] Workflow '{id}' not found in catalog")]
    WorkflowNotFound { id: String },

    #[error("[SKF-003] Workflow '{id}' is already registered")]
    DuplicateWorkflow { id: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ═══════════════════════════════════════════
    // DEFINITION ERRORS (010-019)
    // ═══════════════════════════════════════════
    #[error("[SKF-010] Workflow '{workflow_id}' has no steps")]
    EmptyWorkflow { workflow_id: String },

    #[error("[SKF-011] Duplicate step id '{step_id}'")]
    DuplicateStepId { step_id: String },

    #[error("[SKF-012] Duplicate output key '{output_key}' (steps '{first}' and '{second}')")]
    DuplicateOutputKey {
        output_key: String,
        first: String,
        second: String,
    },

    #[error("[SKF-013] Duplicate global input '{input_id}'")]
    DuplicateGlobalInput { input_id: String },

    #[error("[SKF-014] Step '{step_id}' parameter '{param}' reads undeclared global input '{input_id}'")]
    UnknownGlobalInput {
        step_id: String,
        param: String,
        input_id: String,
    },

    #[error("[SKF-015] Step '{step_id}' parameter '{param}' references unknown step '{source_step}'")]
    UnknownSourceStep {
        step_id: String,
        param: String,
        source_step: String,
    },

    #[error("[SKF-016] Step '{step_id}' parameter '{param}' references '{source_step}', which does not run before it")]
    ForwardReference {
        step_id: String,
        param: String,
        source_step: String,
    },

    #[error("[SKF-017] Step '{step_id}' parameter '{param}' expects output '{expected}' from '{source_step}', but that step writes '{actual}'")]
    OutputKeyMismatch {
        step_id: String,
        param: String,
        source_step: String,
        expected: String,
        actual: String,
    },

    #[error("[SKF-018] Condition on step '{step_id}' reads '{source_step}', which does not run before it")]
    InvalidConditionSource { step_id: String, source_step: String },

    // ═══════════════════════════════════════════
    // RUN ERRORS (020-029)
    // ═══════════════════════════════════════════
    #[error("[SKF-020] Required input '{label}' is missing")]
    MissingRequiredInput { input_id: String, label: String },

    #[error("[SKF-021] Input '{label}' must be one of [{options}], got '{value}'")]
    InvalidOption {
        input_id: String,
        label: String,
        value: String,
        options: String,
    },

    #[error("[SKF-022] Step '{step_id}' parameter '{param}': no output from '{source_step}' in scope")]
    MappingResolution {
        step_id: String,
        param: String,
        source_step: String,
    },

    #[error("[SKF-023] Step '{step_id}' (skill '{skill_id}') failed: {reason}")]
    StepExecution {
        step_id: String,
        skill_id: String,
        reason: String,
    },

    // ═══════════════════════════════════════════
    // BATCH ERRORS (030-039)
    // ═══════════════════════════════════════════
    #[error("[SKF-030] Batch concurrency must be at least 1")]
    InvalidConcurrency,

    // ═══════════════════════════════════════════
    // CSV ERRORS (040-049)
    // ═══════════════════════════════════════════
    #[error("[SKF-040] Malformed CSV row at line {line}: {reason}")]
    CsvFormat { line: usize, reason: String },

    #[error("[SKF-041] Column '{column}' is not in the CSV header")]
    UnknownColumn { column: String },

    #[error("[SKF-042] Column mapping targets unknown input '{input_id}'")]
    UnknownMappingTarget { input_id: String },

    // ═══════════════════════════════════════════
    // CONFIG / INVOKER ERRORS (050-059)
    // ═══════════════════════════════════════════
    #[error("[SKF-050] Configuration error: {reason}")]
    ConfigError { reason: String },

    #[error("[SKF-051] Invoker '{kind}' is missing '{field}'")]
    InvokerConfig { kind: String, field: String },
}

impl SkillflowError {
    /// Error code for programmatic handling
    pub fn code(&self) -> &'static str {
        match self {
            Self::ParseError { .. } => "SKF-001",
            Self::WorkflowNotFound { .. } => "SKF-002",
            Self::DuplicateWorkflow { .. } => "SKF-003",
            Self::Io(_) => "SKF-IO",
            Self::Json(_) => "SKF-JSON",
            Self::EmptyWorkflow { .. } => "SKF-010",
            Self::DuplicateStepId { .. } => "SKF-011",
            Self::DuplicateOutputKey { .. } => "SKF-012",
            Self::DuplicateGlobalInput { .. } => "SKF-013",
            Self::UnknownGlobalInput { .. } => "SKF-014",
            Self::UnknownSourceStep { .. } => "SKF-015",
            Self::ForwardReference { .. } => "SKF-016",
            Self::OutputKeyMismatch { .. } => "SKF-017",
            Self::InvalidConditionSource { .. } => "SKF-018",
            Self::MissingRequiredInput { .. } => "SKF-020",
            Self::InvalidOption { .. } => "SKF-021",
            Self::MappingResolution { .. } => "SKF-022",
            Self::StepExecution { .. } => "SKF-023",
            Self::InvalidConcurrency => "SKF-030",
            Self::CsvFormat { .. } => "SKF-040",
            Self::UnknownColumn { .. } => "SKF-041",
            Self::UnknownMappingTarget { .. } => "SKF-042",
            Self::ConfigError { .. } => "SKF-050",
            Self::InvokerConfig { .. } => "SKF-051",
        }
    }

    /// Definition errors block a workflow from being offered at all
    pub fn is_definition_error(&self) -> bool {
        matches!(
            self,
            Self::EmptyWorkflow { .. }
                | Self::DuplicateStepId { .. }
                | Self::DuplicateOutputKey { .. }
                | Self::DuplicateGlobalInput { .. }
                | Self::UnknownGlobalInput { .. }
                | Self::UnknownSourceStep { .. }
                | Self::ForwardReference { .. }
                | Self::OutputKeyMismatch { .. }
                | Self::InvalidConditionSource { .. }
        )
    }
}

impl FixSuggestion for SkillflowError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            Self::ParseError { .. } => {
                Some("Check YAML syntax: indentation and quoting")
            }
            Self::WorkflowNotFound { .. } => Some("Run `skillflow list` to see available workflows"),
            Self::DuplicateWorkflow { .. } => Some("Give each workflow file a unique id"),
            Self::Io(_) => Some("Check file path and permissions"),
            Self::Json(_) => Some("Check the JSON input file syntax"),
            Self::EmptyWorkflow { .. } => Some("Add at least one step to the workflow"),
            Self::DuplicateStepId { .. } => Some("Use unique step ids within a workflow"),
            Self::DuplicateOutputKey { .. } => Some("Use unique output_key values within a workflow"),
            Self::DuplicateGlobalInput { .. } => Some("Use unique global input ids"),
            Self::UnknownGlobalInput { .. } => {
                Some("Declare the input under global_inputs or fix the input_id")
            }
            Self::UnknownSourceStep { .. } => Some("Verify the step_id exists in this workflow"),
            Self::ForwardReference { .. } | Self::InvalidConditionSource { .. } => {
                Some("Move the source step earlier: steps may only read outputs of steps above them")
            }
            Self::OutputKeyMismatch { .. } => {
                Some("Use the output_key declared on the source step")
            }
            Self::MissingRequiredInput { .. } => Some("Provide a non-empty value for every required input"),
            Self::InvalidOption { .. } => Some("Pick one of the listed options"),
            Self::MappingResolution { .. } => {
                Some("Validate the workflow definition: the source step must run first")
            }
            Self::StepExecution { .. } => Some("Check the skill invoker configuration and logs"),
            Self::InvalidConcurrency => Some("Pass --concurrency 1 or higher"),
            Self::CsvFormat { .. } => Some("Close every quoted field and double embedded quotes (\"\")"),
            Self::UnknownColumn { .. } => Some("Match --map column names to the CSV header exactly"),
            Self::UnknownMappingTarget { .. } => {
                Some("Map columns onto the workflow's global input ids")
            }
            Self::ConfigError { .. } => Some("Check ~/.config/skillflow/config.toml"),
            Self::InvokerConfig { .. } => {
                Some("Set the field under [invoker] or via SKILLFLOW_COMMAND / SKILLFLOW_ENDPOINT")
            }
        }
    }
}
