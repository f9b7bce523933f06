use std::io::IsTerminal;
use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use miette::{Context, IntoDiagnostic, Result};

use vigil_core::{OutputFormat, Severity, VigilConfig};
use vigil_review::ollama::OllamaClient;
use vigil_review::pipeline::ReviewPipeline;

#[derive(Parser)]
#[command(
    name = "vigil",
    version,
    about = "LLM-backed security screening for uncommitted git changes",
    long_about = "Vigil screens your uncommitted changes for malicious code before they land.\n\n\
                   Each changed file is summarized change-by-change and sent to a local model\n\
                   for a security verdict; findings at or above the configured severity fail\n\
                   the run with a non-zero exit code.\n\n\
                   Examples:\n  \
                     vigil review --model llama3.2       Screen the working tree\n  \
                     vigil review --file changes.patch   Screen a saved diff\n  \
                     vigil review --fail-on MEDIUM       Lower the failure threshold\n  \
                     vigil doctor                        Check setup and environment"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to configuration file (default: .vigil.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        global = true,
        default_value = "text",
        long_help = "Output format for command results.\n\n\
                       Formats:\n  \
                         text      Human-readable summaries (default)\n  \
                         json      Machine-readable JSON with camelCase keys\n  \
                         markdown  GitHub-flavored Markdown"
    )]
    format: OutputFormat,

    /// Echo raw model responses and fail fast on any request error
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Screen uncommitted changes with a local model
    #[command(long_about = "Screen uncommitted changes with a local model.\n\n\
        Runs `git diff` (or reads a saved diff with --file), groups each file's\n\
        line changes, and asks the model for a per-file security verdict.\n\
        Verdicts at or above the threshold are reported and fail the run.\n\n\
        Examples:\n  vigil review --model llama3.2\n  vigil review --model llama3.2 --fail-on MEDIUM\n  vigil review --file changes.patch --repo .")]
    Review {
        /// Local model to use (overrides [model] name in .vigil.toml)
        #[arg(long)]
        model: Option<String>,
        /// Repository path (default: current directory)
        #[arg(long, default_value = ".")]
        repo: PathBuf,
        /// Read a diff from this file instead of running git diff
        #[arg(long)]
        file: Option<PathBuf>,
        /// Fail on verdicts of this severity or higher
        #[arg(
            long,
            long_help = "Fail on verdicts of this severity or higher.\n\nSeverity ranking: HIGH > MEDIUM > LOW > NONE.\nDefaults to HIGH, or [review] fail_on from .vigil.toml."
        )]
        fail_on: Option<Severity>,
    },
    /// Create a default .vigil.toml configuration file
    #[command(long_about = "Create a default .vigil.toml configuration file.\n\n\
        Generates a commented-out template with all available options.\n\
        Fails if .vigil.toml already exists.")]
    Init,
    /// Check your Vigil setup and environment
    #[command(long_about = "Check your Vigil setup and environment.\n\n\
        Runs diagnostics for git repo, config file, model server reachability,\n\
        and the configured model. Use --format json for machine-readable output.")]
    Doctor,
}

fn read_diff_input(file: &Option<PathBuf>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .into_diagnostic()
            .wrap_err(format!("reading {}", path.display())),
        None => {
            let mut input = String::new();
            std::io::stdin()
                .read_to_string(&mut input)
                .into_diagnostic()
                .wrap_err("reading stdin")?;
            Ok(input)
        }
    }
}

fn git_repo_root(repo: &Path) -> Result<PathBuf> {
    let output = std::process::Command::new("git")
        .args(["-C", &repo.to_string_lossy(), "rev-parse", "--show-toplevel"])
        .output()
        .into_diagnostic()
        .wrap_err("Failed to run git rev-parse --show-toplevel")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        miette::bail!(miette::miette!(
            help = "Run vigil from inside a git repository, or pass --repo",
            "git rev-parse failed: {}",
            stderr.trim()
        ));
    }

    Ok(PathBuf::from(
        String::from_utf8_lossy(&output.stdout).trim(),
    ))
}

fn git_diff(root: &Path) -> Result<String> {
    let output = std::process::Command::new("git")
        .args(["-C", &root.to_string_lossy(), "diff"])
        .output()
        .into_diagnostic()
        .wrap_err("Failed to run git diff")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        miette::bail!("git diff failed: {}", stderr.trim());
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

#[derive(serde::Serialize)]
struct CheckResult {
    name: &'static str,
    status: &'static str,
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<String>,
}

impl CheckResult {
    fn pass(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            status: "pass",
            detail: detail.into(),
            hint: None,
        }
    }

    fn fail(name: &'static str, detail: impl Into<String>, hint: impl Into<String>) -> Self {
        Self {
            name,
            status: "fail",
            detail: detail.into(),
            hint: Some(hint.into()),
        }
    }

    fn info(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            status: "info",
            detail: detail.into(),
            hint: None,
        }
    }

    fn symbol(&self) -> &'static str {
        match self.status {
            "pass" => "\u{2713}",
            "fail" => "\u{2717}",
            _ => "~",
        }
    }
}

async fn run_doctor(config: &VigilConfig, format: OutputFormat) -> Result<()> {
    let mut checks: Vec<CheckResult> = Vec::new();

    // 1. Git repository
    let cwd = std::env::current_dir().into_diagnostic()?;
    let mut git_root = None;
    let mut dir = cwd.as_path();
    loop {
        if dir.join(".git").exists() {
            git_root = Some(dir.to_path_buf());
            break;
        }
        let Some(parent) = dir.parent() else {
            break;
        };
        dir = parent;
    }
    match &git_root {
        Some(root) => checks.push(CheckResult::pass(
            "git_repository",
            format!("detected at {}", root.display()),
        )),
        None => checks.push(CheckResult::fail(
            "git_repository",
            "not a git repository",
            "run vigil from inside a git repository",
        )),
    }

    // 2. Config file
    if Path::new(".vigil.toml").exists() {
        checks.push(CheckResult::pass("config_file", ".vigil.toml found"));
    } else {
        checks.push(CheckResult::fail(
            "config_file",
            ".vigil.toml not found",
            "run 'vigil init' to create a default config",
        ));
    }

    // 3. Model server + configured model
    checks.push(CheckResult::pass(
        "model_server",
        config.model.base_url.clone(),
    ));
    let client = OllamaClient::new(&config.model.base_url).into_diagnostic()?;
    match client.list_models().await {
        Ok(models) => {
            checks.push(CheckResult::pass(
                "model_listing",
                format!("{} local models", models.len()),
            ));
            match &config.model.name {
                Some(name) if models.iter().any(|m| m == name) => {
                    checks.push(CheckResult::pass("model", format!("{name} available")));
                }
                Some(name) => {
                    checks.push(CheckResult::fail(
                        "model",
                        format!("{name} not found on server"),
                        format!("pull it first, e.g.: ollama pull {name}"),
                    ));
                }
                None => {
                    checks.push(CheckResult::info(
                        "model",
                        "no model configured (set [model] name or pass --model)",
                    ));
                }
            }
        }
        Err(e) => {
            checks.push(CheckResult::fail(
                "model_listing",
                format!("server unreachable: {e}"),
                "start the Ollama server, e.g.: ollama serve",
            ));
        }
    }

    // Output
    match format {
        OutputFormat::Json => {
            let version = env!("CARGO_PKG_VERSION");
            let json = serde_json::json!({
                "version": version,
                "checks": checks,
            });
            println!("{}", serde_json::to_string_pretty(&json).into_diagnostic()?);
        }
        _ => {
            let version = env!("CARGO_PKG_VERSION");
            println!("Vigil v{version} — Environment Check\n");

            for check in &checks {
                let label = check.name.replace('_', " ");
                println!("  {} {label:<20} {}", check.symbol(), check.detail);
                if let Some(hint) = &check.hint {
                    println!("    hint: {hint}");
                }
            }

            let passed = checks.iter().filter(|c| c.status == "pass").count();
            let failed = checks.iter().filter(|c| c.status == "fail").count();
            let info = checks.iter().filter(|c| c.status == "info").count();
            println!("\n{passed} checks passed, {failed} failed, {info} info");
        }
    }

    Ok(())
}

const DEFAULT_CONFIG: &str = r#"# Vigil Configuration
# See: https://github.com/vigil-sec/vigil

[model]
# Name of the local model to use (overridden by --model)
# name = "llama3.2"
# Base URL of the Ollama server
# base_url = "http://localhost:11434"

[review]
# Fail on verdicts of this severity or higher: NONE, LOW, MEDIUM, HIGH
# fail_on = "HIGH"
# Glob patterns for files to skip
# skip_patterns = ["*.lock", "vendor/**"]
"#;

#[tokio::main]
async fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))
    .expect("miette handler");
    human_panic::setup_panic!();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => VigilConfig::from_file(path).into_diagnostic()?,
        None => {
            let default_path = Path::new(".vigil.toml");
            if default_path.exists() {
                VigilConfig::from_file(default_path).into_diagnostic()?
            } else {
                VigilConfig::default()
            }
        }
    };

    match cli.command {
        Command::Review {
            ref model,
            ref repo,
            ref file,
            fail_on,
        } => {
            // Resolve the model: CLI flag wins over config
            let Some(model) = model.clone().or_else(|| config.model.name.clone()) else {
                miette::bail!(miette::miette!(
                    help = "Pass --model <name>, or set name under [model] in .vigil.toml",
                    "No model configured"
                ));
            };

            // Apply CLI overrides to review config
            let mut review_config = config.review.clone();
            if let Some(threshold) = fail_on {
                review_config.fail_on = threshold;
            }

            let client = OllamaClient::new(&config.model.base_url).into_diagnostic()?;

            // Pre-flight: the model must exist locally before any diff work
            client
                .ensure_model(&model)
                .await
                .map_err(|e| miette::miette!(help = "List local models with: ollama list", "{e}"))?;

            let (repo_root, diff_input) = if let Some(diff_file) = file {
                (repo.clone(), read_diff_input(&Some(diff_file.clone()))?)
            } else {
                let root = git_repo_root(repo)?;
                let diff = git_diff(&root)?;
                (root, diff)
            };

            if diff_input.trim().is_empty() {
                println!("No uncommitted changes to review.");
                return Ok(());
            }

            let diffs = vigil_diff::parser::parse_unified_diff(&diff_input).into_diagnostic()?;

            let pipeline = ReviewPipeline::new(client, model, review_config, cli.verbose);

            let is_tty = std::io::stderr().is_terminal();
            let spinner = if is_tty && !cli.verbose {
                let pb = indicatif::ProgressBar::new_spinner();
                pb.set_style(
                    indicatif::ProgressStyle::with_template("{spinner:.cyan} {msg} ({elapsed})")
                        .into_diagnostic()?,
                );
                pb.set_message("Reviewing changes...");
                pb.enable_steady_tick(std::time::Duration::from_millis(120));
                Some(pb)
            } else {
                None
            };

            let result = pipeline.review(&repo_root, &diffs).await.inspect_err(|_e| {
                if let Some(pb) = &spinner {
                    pb.finish_with_message("Failed");
                }
            }).into_diagnostic()?;

            if let Some(pb) = spinner {
                pb.finish_and_clear();
            }

            if cli.verbose {
                eprintln!(
                    "Files reviewed: {} | Files skipped: {}",
                    result.stats.files_reviewed, result.stats.files_skipped
                );
            }

            match cli.format {
                OutputFormat::Json => {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&result).into_diagnostic()?
                    );
                }
                OutputFormat::Markdown => {
                    print!("{}", result.to_markdown());
                }
                OutputFormat::Text => {
                    print!("{result}");
                }
            }

            if !result.findings.is_empty() {
                std::process::exit(1);
            }
        }
        Command::Init => {
            let path = Path::new(".vigil.toml");
            if path.exists() {
                miette::bail!(".vigil.toml already exists");
            }
            std::fs::write(path, DEFAULT_CONFIG).into_diagnostic()?;
            println!("Created .vigil.toml with default configuration");
        }
        Command::Doctor => {
            run_doctor(&config, cli.format).await?;
        }
    }

    Ok(())
}
