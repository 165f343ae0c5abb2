use anyhow::{Result, bail};
use cheatguard_common::RunMode;
use cheatguard_common::observability::{LogConfig, init_logging};
use cheatguard_config::{
    CheatguardConfig, CheatguardConfigLoader, DEFAULT_CONFIG_FILE, default_config_path,
};
use cheatguard_pipeline::{ArticleRecord, RunReport, digest_query};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use wiring::{Overrides, build_pipeline};
mod wiring;

const BANNER: &str = "Welcome to CheatGuard.\nI look up articles about academic cheating and summarize them as JSON records.";

#[derive(Debug, Parser)]
#[command(name = "cheatguard", version, about = "Find and summarize articles about academic cheating")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Config file (YAML). Defaults to ./cheatguard.yaml and the user config dir.
    #[arg(long, global = true, env = "CHEATGUARD_CONFIG")]
    config: Option<PathBuf>,

    /// Query to run instead of prompting (interactive) or the dated default (digest).
    #[arg(long, short, global = true)]
    query: Option<String>,

    #[arg(long, global = true)]
    max_results: Option<usize>,

    /// Restrict results to a site; repeatable.
    #[arg(long = "include-site", global = true)]
    include_sites: Vec<String>,

    /// Drop results from a site; repeatable.
    #[arg(long = "exclude-site", global = true)]
    exclude_sites: Vec<String>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Ask for a query and print the records.
    Interactive,
    /// Search for this month's papers, print them, and mail a digest.
    Digest {
        #[arg(long)]
        no_email: bool,
    },
}

fn load_config(explicit: Option<&PathBuf>) -> Result<CheatguardConfig> {
    let loader = match explicit {
        Some(path) => CheatguardConfigLoader::new().with_file(path),
        None => CheatguardConfigLoader::new()
            .with_optional_file(default_config_path())
            .with_optional_file(DEFAULT_CONFIG_FILE),
    };
    Ok(loader.load()?)
}

async fn prompt_query() -> Result<String> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(b"Enter your query: ").await?;
    stdout.flush().await?;

    let mut line = String::new();
    BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
    Ok(line.trim().to_string())
}

fn print_record(record: &ArticleRecord) {
    match record.to_pretty_json() {
        Ok(json) => println!("=== JSON Output ===\n{json}\n"),
        Err(e) => tracing::error!(target: "app", error = %e, "app.print.failed"),
    }
}

fn report_issues(report: &RunReport) {
    for issue in &report.issues {
        tracing::info!(target: "app", %issue, "app.run.issue");
    }
    if report.records.is_empty() {
        eprintln!("No articles found for: {}", report.query);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1) Load config (env wins over files)
    let cfg = load_config(cli.config.as_ref())?;

    // 2) Logging
    let log_path = init_logging(LogConfig {
        log_dir: cfg.logging.dir.clone(),
        emit_stderr: cfg.logging.stderr,
        format: cfg.logging.format,
        default_filter: cfg.logging.filter.clone(),
        ..LogConfig::default()
    })?;
    tracing::debug!(target: "app", log = %log_path.display(), "app.logging.ready");

    let (mode, no_email) = match &cli.command {
        Some(Command::Interactive) => (RunMode::Interactive, false),
        Some(Command::Digest { no_email }) => (RunMode::Digest, *no_email),
        None => (cfg.mode, false),
    };
    let overrides = Overrides {
        max_results: cli.max_results,
        include_sites: cli.include_sites.clone(),
        exclude_sites: cli.exclude_sites.clone(),
        no_email,
    };

    // 3) Query
    let query = match (mode, cli.query.clone()) {
        (_, Some(q)) => q,
        (RunMode::Interactive, None) => {
            println!("{BANNER}\n");
            prompt_query().await?
        }
        (RunMode::Digest, None) => digest_query(chrono::Local::now().date_naive()),
    };
    if query.trim().is_empty() {
        bail!("no query given");
    }

    // 4) Run
    let pipeline = build_pipeline(&cfg, mode, &overrides).await?;
    let outcome = match mode {
        RunMode::Interactive => pipeline.run_with(&query, print_record).await,
        RunMode::Digest => pipeline.run(&query).await.inspect(|report| {
            report.records.iter().for_each(print_record);
        }),
    };

    match outcome {
        Ok(report) => {
            report_issues(&report);
            if report.emailed {
                eprintln!("Digest with {} record(s) sent.", report.records.len());
            }
            Ok(())
        }
        Err(aborted) => {
            if mode == RunMode::Digest {
                aborted.partial.records.iter().for_each(print_record);
            }
            report_issues(&aborted.partial);
            Err(aborted.into())
        }
    }
}
