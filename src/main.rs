//! Skillflow CLI - run skill pipelines once or over a CSV batch

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use colored::Colorize;

use skillflow::ast::{Payload, WorkflowDefinition};
use skillflow::catalog::Catalog;
use skillflow::config::{InvokerKind, SkillflowConfig};
use skillflow::csv::{
    check_column_mapping, export_batch_results_to_csv, input_sets_from_table, parse_csv,
};
use skillflow::dag::{validate_definition, ExecutionPlan, ValidationReport};
use skillflow::error::{FixSuggestion, SkillflowError};
use skillflow::invoker::create_invoker;
use skillflow::runtime::{BatchHandle, BatchObserver, BatchOptions, BatchScheduler, StepExecutor};
use skillflow::store::{BatchItem, BatchProgress, BatchStatus, StepStatus};

#[derive(Parser)]
#[command(name = "skillflow")]
#[command(about = "Skillflow - chain skill invocations into pipelines and batches")]
#[command(version)]
struct Cli {
    /// Override the configured skill invoker (mock, command, http)
    #[arg(long, global = true)]
    invoker: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List catalog workflows
    List,

    /// Validate one workflow file, or the whole catalog
    Validate {
        /// Path to a workflow .yaml file
        file: Option<PathBuf>,
    },

    /// Print the step dependency plan of a workflow
    Plan {
        /// Workflow id or path to a .yaml file
        workflow: String,
    },

    /// Run a workflow once
    Run {
        /// Workflow id or path to a .yaml file
        workflow: String,

        /// Global input as key=value (repeatable)
        #[arg(short = 'i', long = "input", value_parser = parse_key_val)]
        inputs: Vec<(String, String)>,

        /// JSON object of global inputs (merged under -i values)
        #[arg(long)]
        inputs_file: Option<PathBuf>,
    },

    /// Run a workflow once per CSV row
    Batch {
        /// Workflow id or path to a .yaml file
        workflow: String,

        /// CSV file with one input set per row
        #[arg(long)]
        csv: PathBuf,

        /// Column mapping as Column=inputId (repeatable); defaults to
        /// columns named after an input's id or label
        #[arg(short = 'm', long = "map", value_parser = parse_key_val)]
        mappings: Vec<(String, String)>,

        /// Maximum runs in flight
        #[arg(short, long)]
        concurrency: Option<usize>,

        /// Minimum spacing between run starts
        #[arg(long)]
        delay_ms: Option<u64>,

        /// Write the results CSV here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", s))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{}'", s));
    }
    Ok((key.to_string(), value.to_string()))
}

#[tokio::main]
async fn main() {
    // Load .env file (ignore if not present)
    let _ = dotenvy::dotenv();

    // Logs go to stderr so stdout stays clean for outputs and CSV
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let result = match load_config(cli.invoker.as_deref()) {
        Ok(config) => match cli.command {
            Commands::List => list_workflows(&config),
            Commands::Validate { file } => validate(&config, file.as_deref()),
            Commands::Plan { workflow } => plan(&config, &workflow),
            Commands::Run {
                workflow,
                inputs,
                inputs_file,
            } => run_once(&config, &workflow, inputs, inputs_file.as_deref()).await,
            Commands::Batch {
                workflow,
                csv,
                mappings,
                concurrency,
                delay_ms,
                output,
            } => {
                let options = BatchOptions {
                    concurrency: concurrency.unwrap_or(config.batch.concurrency),
                    delay_ms: delay_ms.unwrap_or(config.batch.delay_ms),
                };
                run_batch(&config, &workflow, &csv, mappings, options, output.as_deref()).await
            }
        },
        Err(e) => Err(e),
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            if let Some(suggestion) = e.fix_suggestion() {
                eprintln!("  {} {}", "Fix:".yellow(), suggestion);
            }
            std::process::exit(1);
        }
    }
}

fn load_config(invoker_override: Option<&str>) -> Result<SkillflowConfig, SkillflowError> {
    let mut config = SkillflowConfig::load()?.with_env()?;
    if let Some(kind) = invoker_override {
        config.invoker.kind = kind.parse::<InvokerKind>()?;
    }
    Ok(config)
}

fn load_catalog(config: &SkillflowConfig) -> Result<Catalog, SkillflowError> {
    let mut catalog = Catalog::builtin()?;
    if let Some(dir) = &config.catalog.workflows_dir {
        catalog.load_dir(dir)?;
    }
    Ok(catalog)
}

/// Look a workflow up by id, or load it from a file path
fn resolve_workflow(
    config: &SkillflowConfig,
    workflow: &str,
) -> Result<Arc<WorkflowDefinition>, SkillflowError> {
    let path = Path::new(workflow);
    if path.is_file() {
        let mut catalog = Catalog::new();
        print_warnings(&catalog.load_file(path)?);
        return catalog
            .iter()
            .next()
            .cloned()
            .ok_or_else(|| SkillflowError::WorkflowNotFound {
                id: workflow.to_string(),
            });
    }
    load_catalog(config)?.get(workflow)
}

fn print_warnings(report: &ValidationReport) {
    for warning in &report.warnings {
        eprintln!(
            "  {} {} / {}: {}",
            "⚠".yellow(),
            warning.step_id,
            warning.param,
            warning.message
        );
    }
}

fn list_workflows(config: &SkillflowConfig) -> Result<bool, SkillflowError> {
    let catalog = load_catalog(config)?;
    println!("{} ({} workflows)", "Catalog".cyan().bold(), catalog.len());
    for workflow in catalog.iter() {
        let time = workflow
            .estimated_time
            .as_deref()
            .map(|t| format!(" ~{}", t))
            .unwrap_or_default();
        println!(
            "  {}  {} ({} steps{})",
            workflow.id.bold(),
            workflow.name,
            workflow.steps.len(),
            time.dimmed()
        );
        if let Some(description) = &workflow.description {
            println!("      {}", description.dimmed());
        }
    }
    Ok(true)
}

fn validate(config: &SkillflowConfig, file: Option<&Path>) -> Result<bool, SkillflowError> {
    match file {
        Some(path) => {
            let mut catalog = Catalog::new();
            let report = catalog.load_file(path)?;
            let workflow = catalog.iter().next().map(|w| w.id.clone()).unwrap_or_default();
            println!("{} Workflow '{}' is valid", "✓".green(), workflow);
            print_warnings(&report);
        }
        None => {
            let catalog = load_catalog(config)?;
            for workflow in catalog.iter() {
                let report = validate_definition(workflow)?;
                println!(
                    "{} {} ({} steps, {} inputs)",
                    "✓".green(),
                    workflow.id,
                    workflow.steps.len(),
                    workflow.global_inputs.len()
                );
                print_warnings(&report);
            }
        }
    }
    Ok(true)
}

fn plan(config: &SkillflowConfig, workflow: &str) -> Result<bool, SkillflowError> {
    let definition = resolve_workflow(config, workflow)?;
    let plan = ExecutionPlan::from_definition(&definition);
    println!("{}", plan.render(&definition));
    println!(
        "\n{} {} levels, up to {} independent steps",
        "→".cyan(),
        plan.levels.len(),
        plan.max_parallelism()
    );
    Ok(true)
}

async fn run_once(
    config: &SkillflowConfig,
    workflow: &str,
    inputs: Vec<(String, String)>,
    inputs_file: Option<&Path>,
) -> Result<bool, SkillflowError> {
    let definition = resolve_workflow(config, workflow)?;

    let mut globals: Payload = match inputs_file {
        Some(path) => serde_json::from_str(&tokio::fs::read_to_string(path).await?)?,
        None => Payload::new(),
    };
    globals.extend(inputs);

    let executor = StepExecutor::new(create_invoker(&config.invoker)?);
    println!(
        "{} Running '{}' with invoker: {}",
        "→".cyan(),
        definition.name.bold(),
        executor.invoker_name().cyan()
    );

    let run = executor.run_workflow(&definition, globals).await?;

    for step in &definition.steps {
        let marker = match run.step_status(&step.id) {
            Some(StepStatus::Completed) => "✓".green(),
            Some(StepStatus::Error) => "✗".red(),
            Some(StepStatus::Skipped) => "↷".yellow(),
            _ => "·".dimmed(),
        };
        println!("\n{} {} ({})", marker, step.name.bold(), step.skill_id.dimmed());
        if let Some(output) = run.output(&step.output_key) {
            println!("{}", output);
        }
    }

    match run.error() {
        None => {
            println!("\n{} Completed in {}ms", "✓".green(), run.duration_ms());
            Ok(true)
        }
        Some(reason) => {
            eprintln!("\n{} {}", "Run failed:".red().bold(), reason);
            Ok(false)
        }
    }
}

/// Columns named after an input's id or label (case-insensitive)
fn default_mapping(definition: &WorkflowDefinition, headers: &[String]) -> BTreeMap<String, String> {
    headers
        .iter()
        .filter_map(|header| {
            let wanted = header.to_lowercase();
            definition
                .global_inputs
                .iter()
                .find(|f| f.id.to_lowercase() == wanted || f.label.to_lowercase() == wanted)
                .map(|f| (header.clone(), f.id.clone()))
        })
        .collect()
}

async fn run_batch(
    config: &SkillflowConfig,
    workflow: &str,
    csv: &Path,
    mappings: Vec<(String, String)>,
    options: BatchOptions,
    output: Option<&Path>,
) -> Result<bool, SkillflowError> {
    let definition = resolve_workflow(config, workflow)?;
    let text = tokio::fs::read_to_string(csv).await?;
    let table = parse_csv(&text);

    let mapping: BTreeMap<String, String> = if mappings.is_empty() {
        default_mapping(&definition, &table.headers)
    } else {
        let mapping = mappings.into_iter().collect();
        check_column_mapping(&table, &mapping, &definition)?;
        mapping
    };
    let input_sets = input_sets_from_table(&table, &mapping);

    let executor = StepExecutor::new(create_invoker(&config.invoker)?);
    let scheduler = BatchScheduler::new(executor, options);
    eprintln!(
        "{} Batch '{}': {} rows ({} skipped), concurrency {}, delay {}ms",
        "→".cyan(),
        definition.name.bold(),
        input_sets.len(),
        table.skipped.len(),
        scheduler.options().concurrency,
        scheduler.options().delay_ms
    );
    let handle = BatchHandle::new();

    let ctrl_c = {
        let handle = handle.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("{} Cancelling: waiting for running items", "⚠".yellow());
                handle.cancel();
            }
        })
    };

    let batch = scheduler
        .run(
            Arc::clone(&definition),
            input_sets,
            Arc::new(ConsoleObserver::default()),
            handle,
        )
        .await;
    ctrl_c.abort();

    if let Some(err) = &batch.error {
        eprintln!("{} {}", "Batch failed:".red().bold(), err);
        return Ok(false);
    }

    let summary = batch.summary();
    eprintln!(
        "\n{} {}: {} completed, {} failed, {} not started ({:.0}% success, avg {:.0}ms)",
        "■".cyan(),
        batch.status.as_str().bold(),
        summary.completed.to_string().green(),
        summary.failed.to_string().red(),
        summary.pending,
        summary.success_rate,
        summary.avg_duration_ms
    );

    let results = export_batch_results_to_csv(&batch, &definition);
    match output {
        Some(path) => {
            tokio::fs::write(path, results).await?;
            eprintln!("{} Results written to {}", "✓".green(), path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{}", results)?;
        }
    }

    Ok(batch.status != BatchStatus::Error)
}

/// Prints item transitions and progress to stderr
#[derive(Default)]
struct ConsoleObserver {
    finished: AtomicUsize,
}

impl BatchObserver for ConsoleObserver {
    fn on_item_start(&self, item: &BatchItem) {
        eprintln!("  {} {} started", "→".cyan(), item.id);
    }

    fn on_item_complete(&self, item: &BatchItem) {
        eprintln!(
            "  {} {} completed ({}ms)",
            "✓".green(),
            item.id,
            item.duration_ms().unwrap_or_default()
        );
    }

    fn on_item_error(&self, item: &BatchItem, message: &str) {
        eprintln!("  {} {} failed: {}", "✗".red(), item.id, message);
    }

    fn on_progress(&self, progress: BatchProgress) {
        let finished = progress.finished();
        if self.finished.swap(finished, Ordering::Relaxed) != finished {
            eprintln!(
                "  {} {}/{} done ({} running)",
                "■".dimmed(),
                finished,
                progress.total,
                progress.running
            );
        }
    }

    fn on_batch_status(&self, status: BatchStatus) {
        let marker = if status.is_terminal() { "■".cyan() } else { "●".cyan() };
        eprintln!("{} Batch {}", marker, status.as_str());
    }
}
