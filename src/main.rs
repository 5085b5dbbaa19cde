//! Postcraft - staged LLM pipeline for blog articles.
//!
//! Plans, outlines, drafts, reviews and compiles an article in ten persisted
//! steps. Halted runs can be resumed by id.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use postcraft::agents::{AgentKind, AgentSet, BlogInputs, Stage};
use postcraft::completion::CompletionClient;
use postcraft::core::{Config, FileStore};
use postcraft::text::format_duration;
use postcraft::workflow::{
    RunArtifacts, RunRepository, StepStatus, WorkflowError, WorkflowEvent, WorkflowManager,
    WorkflowResult, WorkflowRun,
};

/// Staged LLM pipeline for blog articles
#[derive(Parser)]
#[command(name = "postcraft")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a new article run
    Run(RunArgs),

    /// Continue a halted run from its first unfinished step
    Resume {
        /// Run id
        id: String,

        /// Directory to write the article and report to
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// List stored runs
    List {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show one run and its steps
    Show {
        /// Run id
        id: String,

        /// Print the full run snapshot as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write the article, metadata report and step trace of a completed run
    Export {
        /// Run id
        id: String,

        /// Target directory
        #[arg(short, long)]
        out: PathBuf,
    },

    /// Delete a stored run
    Delete {
        /// Run id
        id: String,
    },

    /// Show which model each agent uses
    Models,

    /// Show configuration
    Config {
        /// Show config file path
        #[arg(long)]
        path: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Article title (generated when empty)
    #[arg(short, long, default_value = "")]
    title: String,

    /// Comma-separated keywords (generated when empty)
    #[arg(short, long, default_value = "")]
    keywords: String,

    /// Audience, tone and purpose (generated when empty)
    #[arg(short, long, default_value = "")]
    context: String,

    /// Do not permit research beyond the model's own knowledge
    #[arg(long)]
    no_web: bool,

    /// Directory to write the article and report to
    #[arg(short, long)]
    out: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // API keys may live in a local .env
    let _ = dotenvy::dotenv();

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Run(args) => cmd_run(args)?,
        Commands::Resume { id, out } => cmd_resume(&id, out)?,
        Commands::List { format } => cmd_list(&format)?,
        Commands::Show { id, json } => cmd_show(&id, json)?,
        Commands::Export { id, out } => cmd_export(&id, &out)?,
        Commands::Delete { id } => cmd_delete(&id)?,
        Commands::Models => cmd_models()?,
        Commands::Config { path } => cmd_config(path)?,
        Commands::Completions { shell } => cmd_completions(shell),
    }

    Ok(())
}

/// Start a new run.
fn cmd_run(args: RunArgs) -> Result<()> {
    let config = Config::load()?;
    let inputs = BlogInputs::new(args.title, args.keywords, args.context).with_web(!args.no_web);
    let manager = build_manager(&config)?;
    let out = args.out.or_else(|| config.general.output_dir.clone());

    let rt = tokio::runtime::Runtime::new()?;
    let result = rt.block_on(manager.start(inputs));

    report_outcome(result, out.as_deref())
}

/// Resume a halted run.
fn cmd_resume(id: &str, out: Option<PathBuf>) -> Result<()> {
    let config = Config::load()?;
    let manager = build_manager(&config)?;
    let out = out.or_else(|| config.general.output_dir.clone());

    let rt = tokio::runtime::Runtime::new()?;
    let result = rt.block_on(manager.resume(id));

    report_outcome(result, out.as_deref())
}

/// List stored runs.
fn cmd_list(format: &str) -> Result<()> {
    let runs = open_repository()?.list()?;

    match format {
        "json" => {
            let summaries: Vec<serde_json::Value> = runs
                .iter()
                .map(|run| {
                    serde_json::json!({
                        "id": run.id,
                        "title": run.title(),
                        "status": run.status,
                        "completed_steps": run.completed_steps(),
                        "progress": run.progress_percentage(),
                        "start_time": run.start_time,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&summaries)?);
        }
        _ => {
            if runs.is_empty() {
                println!("No runs found.");
                return Ok(());
            }
            for run in &runs {
                println!(
                    "{}  {:<9}  {:>2}/{}  {}  {}",
                    run.id,
                    run.status,
                    run.completed_steps(),
                    Stage::COUNT,
                    run.start_time.format("%Y-%m-%d %H:%M"),
                    display_title(run)
                );
            }
            println!("\nTotal: {} runs", runs.len());
        }
    }

    Ok(())
}

/// Show a single run.
fn cmd_show(id: &str, json: bool) -> Result<()> {
    let run = open_repository()?.load(id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&run)?);
        return Ok(());
    }

    println!("Run:      {}", run.id);
    println!("Title:    {}", display_title(&run));
    println!("Status:   {}", run.status);
    println!("Progress: {:.0}%", run.progress_percentage());
    println!("Started:  {}", run.start_time.format("%Y-%m-%d %H:%M:%S UTC"));
    if run.resumed_count > 0 {
        println!("Resumed:  {} times", run.resumed_count);
    }
    if let Some(error) = &run.error {
        println!("Error:    {error}");
    }

    println!("\nSteps:");
    for step in &run.steps {
        let marker = match step.status {
            StepStatus::Completed => "done",
            StepStatus::Running => "....",
            StepStatus::Error => "FAIL",
            StepStatus::Pending => "    ",
        };
        let timing = step.duration_ms().map(format_duration).unwrap_or_default();
        println!(
            "  [{marker}] {:>2}. {:<22} {:<18} {timing}",
            step.stage.index() + 1,
            step.stage.name(),
            step.agent.display_name()
        );
        if let Some(error) = &step.error {
            println!("         {error}");
        }
    }

    if let Some(output) = &run.final_output {
        let summary = &output.article.summary;
        println!(
            "\nArticle: {} words, {} min read, review {:.1}/10",
            output.article.word_count, output.article.reading_time_minutes, summary.review_score
        );
    } else if run.status.is_resumable() {
        println!("\nResume with: postcraft resume {}", run.id);
    }

    Ok(())
}

/// Export the artifacts of a completed run.
fn cmd_export(id: &str, out: &Path) -> Result<()> {
    let run = open_repository()?.load(id)?;
    write_artifacts(&run, out)
}

/// Delete a stored run.
fn cmd_delete(id: &str) -> Result<()> {
    open_repository()?.delete(id)?;
    println!("Deleted run {id}");
    Ok(())
}

/// Show model routing per agent kind.
fn cmd_models() -> Result<()> {
    let config = Config::load()?;

    println!("Model routing:\n");
    for kind in AgentKind::ALL {
        let stages: Vec<&str> =
            Stage::ALL.into_iter().filter(|s| s.agent() == kind).map(|s| s.name()).collect();
        println!("  {:<18} {}", kind.display_name(), config.models.model_for(kind));
        println!("  {:<18} {}", "", stages.join(", "));
    }

    Ok(())
}

/// Show configuration.
fn cmd_config(show_path: bool) -> Result<()> {
    if show_path {
        if let Some(path) = Config::config_dir() {
            println!("{}", path.join("config.toml").display());
        }
        return Ok(());
    }

    let config = Config::load()?;
    let toml = toml::to_string_pretty(&config)?;
    println!("{toml}");
    println!("# runs stored in {}", config.runs_dir().display());

    Ok(())
}

/// Generate shell completions.
fn cmd_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "postcraft", &mut io::stdout());
}

fn open_repository() -> Result<RunRepository> {
    let config = Config::load()?;
    Ok(RunRepository::new(Arc::new(FileStore::new(config.runs_dir()))))
}

/// Build the production manager and hook up progress output and Ctrl-C.
fn build_manager(config: &Config) -> Result<WorkflowManager> {
    let client = CompletionClient::from_config(config)?;
    let agents = AgentSet::new(Arc::new(client), config.brand.clone());
    let store = FileStore::new(config.runs_dir());
    let manager = WorkflowManager::new(Arc::new(agents), Arc::new(store));

    manager.events().subscribe(|event| {
        print_event(event);
        Ok(())
    });

    let token = manager.cancellation_token();
    ctrlc::set_handler(move || {
        eprintln!("\nCancelling after the current step...");
        token.cancel();
    })
    .context("Failed to install Ctrl-C handler")?;

    Ok(manager)
}

fn print_event(event: &WorkflowEvent) {
    match event {
        WorkflowEvent::RunStarted { run_id, .. } => println!("Run {run_id} started\n"),
        WorkflowEvent::RunResumed { run_id, from_step } => {
            println!("Run {run_id} resumed at step {}\n", from_step + 1);
        }
        WorkflowEvent::StepStarted { index, stage, agent, .. } => {
            println!("[{}/{}] {} ({})", index + 1, Stage::COUNT, stage, agent.display_name());
        }
        WorkflowEvent::StepCompleted { duration_ms, .. } => {
            println!("      done in {}", format_duration(*duration_ms));
        }
        WorkflowEvent::StepError { error, .. } => println!("      failed: {error}"),
        WorkflowEvent::ProgressUpdate { .. } => {}
        WorkflowEvent::RunCompleted { run } => {
            println!("\nRun {} completed in {}", run.id, format_run_duration(run));
        }
        WorkflowEvent::RunError { run_id, .. } => {
            println!("\nRun halted. Resume with: postcraft resume {run_id}");
        }
        WorkflowEvent::RunCancelled { run_id, completed } => {
            println!("\nRun cancelled after {completed}/{} steps.", Stage::COUNT);
            println!("Resume with: postcraft resume {run_id}");
        }
    }
}

fn report_outcome(result: WorkflowResult<WorkflowRun>, out: Option<&Path>) -> Result<()> {
    let run = match result {
        Ok(run) => run,
        Err(WorkflowError::Cancelled(_)) => return Ok(()),
        Err(e) if e.is_auth() => {
            return Err(anyhow::anyhow!(e)
                .context("Authentication with the completion service failed; check your API key"));
        }
        Err(e) => return Err(e.into()),
    };

    if let Some(output) = &run.final_output {
        let article = &output.article;
        println!("\n{}", display_title(&run));
        println!(
            "  Words:        {} ({} min read)",
            article.word_count, article.reading_time_minutes
        );
        println!(
            "  Review score: {:.1}/10 ({})",
            article.summary.review_score,
            if article.summary.publication_ready { "ready" } else { "needs revision" }
        );
    }

    match out {
        Some(dir) => write_artifacts(&run, dir),
        None => {
            println!("\nExport with: postcraft export {} --out <dir>", run.id);
            Ok(())
        }
    }
}

fn write_artifacts(run: &WorkflowRun, dir: &Path) -> Result<()> {
    let artifacts = RunArtifacts::from_run(run)?;
    for path in artifacts.write_to(dir)? {
        println!("Wrote {}", path.display());
    }
    Ok(())
}

fn display_title(run: &WorkflowRun) -> &str {
    match run.title() {
        "" => "(untitled)",
        title => title,
    }
}

fn format_run_duration(run: &WorkflowRun) -> String {
    format_duration(u64::try_from(run.duration().num_milliseconds()).unwrap_or(0))
}
