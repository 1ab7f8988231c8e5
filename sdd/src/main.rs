//! `sdd` command-line entry point.

use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use sdd::core::extract::extract_code_blocks;
use sdd::core::schema::PhaseOutput;
use sdd::core::types::{FixAttempt, RepairReport};
use sdd::error::PipelineError;
use sdd::exit_codes;
use sdd::io::checkers::CheckerCollector;
use sdd::io::config::{DEFAULT_CONFIG_FILE, SddConfig, load_config};
use sdd::io::oracle::{CommandOracle, GenerationOracle, check_credentials};
use sdd::io::prompt::PromptEngine;
use sdd::io::run_log::RunLog;
use sdd::logging;
use sdd::phases::PhaseSettings;
use sdd::pipeline::{Pipeline, PipelineRequest};
use sdd::repair::{RepairConfig, run_repair};

#[derive(Parser)]
#[command(
    name = "sdd",
    version,
    about = "Generate a project from a natural-language spec and repair it until it checks clean"
)]
struct Cli {
    /// Config file (defaults to ./sdd.toml when present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log progress details to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run every generation phase for SPEC, then repair the result.
    Generate {
        /// Specification file (markdown or plain text).
        spec: PathBuf,
        /// Directory that receives the generated project.
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Remove the temp dir after a successful run.
        #[arg(long)]
        clean: bool,
        /// Skip the repair loop.
        #[arg(long)]
        no_fix: bool,
        #[arg(long)]
        max_attempts: Option<u32>,
    },
    /// Run the repair loop against an existing project.
    Fix {
        project: PathBuf,
        #[arg(long)]
        max_attempts: Option<u32>,
        /// Skip the type checker.
        #[arg(long)]
        no_types: bool,
        /// Skip the lint checker.
        #[arg(long)]
        no_lint: bool,
    },
    /// Print the files extracted from a saved oracle response as JSON.
    Extract { response: PathBuf },
}

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_code_for(&err));
        }
    }
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<PipelineError>() {
        Some(PipelineError::Configuration(_)) => exit_codes::CONFIG,
        _ => exit_codes::FAILED,
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    if cli.config.is_some() && !config_path.exists() {
        return Err(PipelineError::configuration(format!(
            "config file {} not found",
            config_path.display()
        ))
        .into());
    }

    match cli.command {
        Command::Generate {
            spec,
            output,
            clean,
            no_fix,
            max_attempts,
        } => {
            let mut cfg = load_config(&config_path)?;
            if let Some(output) = output {
                cfg.output_dir = output;
            }
            if no_fix {
                cfg.fix.enabled = false;
            }
            if let Some(max_attempts) = max_attempts {
                cfg.fix.max_attempts = max_attempts;
            }
            cmd_generate(&cfg, &spec, clean)
        }
        Command::Fix {
            project,
            max_attempts,
            no_types,
            no_lint,
        } => {
            let mut cfg = load_config(&config_path)?;
            if let Some(max_attempts) = max_attempts {
                cfg.fix.max_attempts = max_attempts;
            }
            if no_types {
                cfg.fix.check_types = false;
            }
            if no_lint {
                cfg.fix.check_lint = false;
            }
            cmd_fix(&cfg, &project)
        }
        Command::Extract { response } => cmd_extract(&response),
    }
}

fn cmd_generate(cfg: &SddConfig, spec_path: &Path, clean: bool) -> Result<i32> {
    cfg.validate()?;
    check_credentials(&cfg.oracle.required_env)?;
    let spec = fs::read_to_string(spec_path)
        .with_context(|| format!("read spec {}", spec_path.display()))?;

    let oracle: Rc<dyn GenerationOracle> = Rc::new(CommandOracle::new(cfg.oracle.clone()));
    let settings = PhaseSettings::new(&cfg.output_dir, &cfg.temp_dir, oracle.clone());
    let pipeline = Pipeline::standard(&settings, cfg.phases)?;
    let outcome = pipeline.run_with(&PipelineRequest { spec }, print_phase)?;

    let Some(project_dir) = outcome.project_dir() else {
        bail!("no phase produced a project directory");
    };
    println!(
        "generated {} files in {}",
        outcome.files_generated(),
        project_dir.display()
    );

    let run_log = RunLog::new(&cfg.temp_dir);
    let mut code = exit_codes::OK;
    if cfg.fix.enabled {
        let report = repair(cfg, project_dir, &*oracle, &settings.prompts)?;
        run_log.write_fix_report(&report)?;
        if !report.success {
            code = exit_codes::UNCONVERGED;
        }
    }
    if clean {
        run_log.clean()?;
    }
    Ok(code)
}

fn cmd_fix(cfg: &SddConfig, project: &Path) -> Result<i32> {
    cfg.validate()?;
    if !project.is_dir() {
        bail!("project directory {} does not exist", project.display());
    }
    check_credentials(&cfg.oracle.required_env)?;
    let oracle = CommandOracle::new(cfg.oracle.clone());
    let report = repair(cfg, project, &oracle, &PromptEngine::new())?;
    let path = RunLog::new(&cfg.temp_dir).write_fix_report(&report)?;
    println!("report: {}", path.display());
    Ok(if report.success {
        exit_codes::OK
    } else {
        exit_codes::UNCONVERGED
    })
}

fn cmd_extract(response_path: &Path) -> Result<i32> {
    let response = fs::read_to_string(response_path)
        .with_context(|| format!("read {}", response_path.display()))?;
    let blocks = extract_code_blocks(&response);
    let rendered = serde_json::to_string_pretty(&blocks).context("serialize blocks")?;
    println!("{rendered}");
    Ok(exit_codes::OK)
}

fn repair(
    cfg: &SddConfig,
    project_dir: &Path,
    oracle: &dyn GenerationOracle,
    prompts: &PromptEngine,
) -> Result<RepairReport> {
    let collector = CheckerCollector::from_config(&cfg.fix);
    let config = RepairConfig {
        max_attempts: cfg.fix.max_attempts,
    };
    let report = run_repair(project_dir, oracle, &collector, prompts, &config, print_attempt)?;
    print_report(&report);
    Ok(report)
}

fn print_phase(output: &PhaseOutput) {
    match output.files_generated() {
        0 => println!("[{}] done", output.phase()),
        files => println!("[{}] done ({files} files)", output.phase()),
    }
}

fn print_attempt(attempt: &FixAttempt) {
    println!(
        "[fix {}] {} errors found, {} fixed in {} files",
        attempt.attempt_number,
        attempt.errors_found,
        attempt.errors_fixed,
        attempt.files_modified.len()
    );
}

fn print_report(report: &RepairReport) {
    if report.success {
        println!(
            "project is clean after {} attempt(s); fixed {} errors",
            report.attempts,
            report.fixed_errors.len()
        );
    } else {
        println!(
            "{} errors remain after {} attempt(s)",
            report.remaining_errors.len(),
            report.attempts
        );
    }
    for failure in &report.tool_failures {
        println!("warning: {failure}");
    }
}
