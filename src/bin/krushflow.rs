//! CLI binary for krushflow-parser.
//!
//! A thin shim over the library crate: maps CLI flags to `WorkflowConfig`,
//! renders workflow events in the terminal, and hosts the parse API.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use krushflow_parser::{
    format_size, server, Confirmation, Document, DocumentId, ParsedResult, ServerConfig, Workflow,
    WorkflowConfig, WorkflowObserver,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── Terminal observer ────────────────────────────────────────────────────────

/// Renders workflow events: a spinner while parsing, alerts on stderr,
/// results as pretty JSON on stdout.
struct CliObserver {
    /// Spinner shown for the duration of a parse.
    spinner: Mutex<Option<ProgressBar>>,
    show_progress: bool,
    quiet: bool,
    capacity: usize,
    /// Results are printed only while this is set (off during restore in one-shot mode).
    print_results: AtomicBool,
}

impl CliObserver {
    fn new(show_progress: bool, quiet: bool, capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            spinner: Mutex::new(None),
            show_progress,
            quiet,
            capacity,
            print_results: AtomicBool::new(true),
        })
    }

    fn set_print_results(&self, v: bool) {
        self.print_results.store(v, Ordering::SeqCst);
    }

    fn stop_spinner(&self) {
        if let Some(bar) = self.spinner.lock().unwrap().take() {
            bar.finish_and_clear();
        }
    }
}

impl WorkflowObserver for CliObserver {
    fn on_documents_changed(&self, documents: &[Document]) {
        if !self.quiet {
            eprintln!(
                "{}",
                dim(&format!("{}/{} documents staged", documents.len(), self.capacity))
            );
        }
    }

    fn on_capacity_exceeded(&self, accepted: usize, capacity: usize) {
        eprintln!(
            "{} {}",
            red("⚠"),
            bold(&format!(
                "Only {accepted} documents added. Maximum {capacity} documents allowed."
            ))
        );
    }

    fn on_parse_start(&self, document_count: usize) {
        if self.show_progress {
            let bar = ProgressBar::new_spinner();
            bar.set_style(
                ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  ⏱ {elapsed}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner())
                    .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
            );
            bar.set_prefix("PARSING...");
            bar.set_message(format!("{document_count} documents"));
            bar.enable_steady_tick(Duration::from_millis(80));
            *self.spinner.lock().unwrap() = Some(bar);
        } else if !self.quiet {
            eprintln!("{} Parsing {document_count} documents…", cyan("◆"));
        }
    }

    fn on_results(&self, results: &[ParsedResult]) {
        if !self.print_results.load(Ordering::SeqCst) {
            return;
        }
        match serde_json::to_string_pretty(results) {
            Ok(json) => {
                let bar = self.spinner.lock().unwrap();
                match bar.as_ref() {
                    Some(b) => b.suspend(|| println!("{json}")),
                    None => println!("{json}"),
                }
            }
            Err(e) => eprintln!("{} {e}", red("✗")),
        }
    }

    fn on_results_cleared(&self) {
        if !self.quiet {
            eprintln!("{}", dim("Results cleared"));
        }
    }

    fn on_parse_complete(&self, result_count: usize) {
        self.stop_spinner();
        if !self.quiet {
            eprintln!(
                "{} {} documents parsed successfully!",
                green("✔"),
                bold(&result_count.to_string())
            );
        }
    }

    fn on_parse_failed(&self, message: &str) {
        self.stop_spinner();
        eprintln!("{} {}", red("✘"), red(message));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Start the parse API (another terminal)
  krushflow serve --addr 127.0.0.1:5000

  # Stage two files and parse them
  krushflow parse receipt.jpg contract.pdf

  # Keep a client-side copy of documents and results
  krushflow --save-client parse scans/*.png

  # Show what the last run left in local storage
  krushflow show

  # Interactive session (add / rm / ls / parse / clear / save / results)
  krushflow shell

  # Remove everything, including the client copy
  krushflow --save-client clear --yes

ACCEPTED FILES:
  image/*  and  application/pdf  (detected from the file extension).
  Anything else is silently skipped. At most 30 documents are staged.

ENVIRONMENT VARIABLES:
  KRUSHFLOW_ENDPOINT      Base URL of the parse API (default http://127.0.0.1:5000)
  KRUSHFLOW_STORAGE_DIR   Directory holding the local storage slots
  KRUSHFLOW_SAVE_CLIENT   Mirror documents and results into the client slot
  KRUSHFLOW_ADDR          Bind address for `serve`
  KRUSHFLOW_DATA_DIR      Session store directory for `serve`
  RUST_LOG                Override log filtering (e.g. krushflow_parser=debug)
"#;

/// Stage image and PDF files, parse them, and persist the results.
#[derive(Parser, Debug)]
#[command(
    name = "krushflow",
    version,
    about = "Stage image/PDF batches, parse them, and persist the results",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Base URL of the parse API.
    #[arg(long, global = true, env = "KRUSHFLOW_ENDPOINT", default_value = "http://127.0.0.1:5000")]
    endpoint: String,

    /// Directory holding the local storage slots.
    #[arg(long, global = true, env = "KRUSHFLOW_STORAGE_DIR")]
    storage_dir: Option<PathBuf>,

    /// Maximum number of staged documents.
    #[arg(long, global = true, env = "KRUSHFLOW_CAPACITY", default_value_t = 30)]
    capacity: usize,

    /// Simulated processing delay in milliseconds.
    #[arg(long, global = true, env = "KRUSHFLOW_DELAY_MS", default_value_t = 2000)]
    delay_ms: u64,

    /// Save documents and results client-side after each parse.
    #[arg(long, global = true, env = "KRUSHFLOW_SAVE_CLIENT")]
    save_client: bool,

    /// Give up on the parse endpoint after this many seconds.
    #[arg(long, global = true, env = "KRUSHFLOW_REQUEST_TIMEOUT")]
    request_timeout: Option<u64>,

    /// Disable the busy spinner.
    #[arg(long, global = true, env = "KRUSHFLOW_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "KRUSHFLOW_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and results.
    #[arg(short, long, global = true, env = "KRUSHFLOW_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Stage FILES and run one parse-and-persist.
    Parse {
        /// Image or PDF files to stage.
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Print the results restored from local storage.
    Show,

    /// Clear staged documents and results.
    Clear {
        /// Do not ask for confirmation.
        #[arg(short, long)]
        yes: bool,
    },

    /// Interactive session driving one workflow.
    Shell,

    /// Run the parse API server.
    Serve {
        /// Socket address to bind.
        #[arg(long, env = "KRUSHFLOW_ADDR", default_value = "127.0.0.1:5000")]
        addr: String,

        /// Directory holding server_data.json.
        #[arg(long, env = "KRUSHFLOW_DATA_DIR", default_value = "parsed_documents")]
        data_dir: PathBuf,

        /// Serve files from this directory for unmatched paths.
        #[arg(long, env = "KRUSHFLOW_STATIC_DIR")]
        static_dir: Option<PathBuf>,

        /// Request body limit in bytes.
        #[arg(long, env = "KRUSHFLOW_MAX_BODY_BYTES", default_value_t = 64 * 1024 * 1024)]
        max_body_bytes: usize,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner provides the feedback that matters while a parse runs;
    // INFO lines would tear it.
    let is_server = matches!(cli.command, Command::Serve { .. });
    let show_progress = !cli.quiet && !cli.no_progress && !is_server;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    if let Command::Serve {
        addr,
        data_dir,
        static_dir,
        max_body_bytes,
    } = &cli.command
    {
        let config = ServerConfig {
            addr: addr.clone(),
            data_dir: data_dir.clone(),
            static_dir: static_dir.clone(),
            max_body_bytes: *max_body_bytes,
        };
        server::serve(config).await.context("Server failed")?;
        return Ok(ExitCode::SUCCESS);
    }

    let config = build_config(&cli)?;
    let observer = CliObserver::new(show_progress, cli.quiet, config.capacity);
    let mut workflow = Workflow::new(config)
        .context("Invalid configuration")?
        .with_observer(observer.clone());

    match &cli.command {
        Command::Parse { files } => {
            // Restored results are superseded by this run; don't print them.
            observer.set_print_results(false);
            workflow.restore().await;
            observer.set_print_results(true);

            let report = workflow.add_paths(files).await;
            if report.accepted == 0 {
                eprintln!("{} No supported files to parse ({report})", red("✘"));
                return Ok(ExitCode::FAILURE);
            }
            Ok(run_parse(&mut workflow).await)
        }
        Command::Show => {
            let report = workflow.restore().await;
            if workflow.parsed_results().is_empty() && !cli.quiet {
                eprintln!("{}", dim("No stored results"));
            }
            if !cli.quiet {
                eprintln!(
                    "{}",
                    dim(&format!(
                        "client: {} documents / {} results, server: {} results",
                        report.client_documents, report.client_results, report.server_results
                    ))
                );
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Clear { yes } => {
            observer.set_print_results(false);
            workflow.restore().await;
            let confirmation = if *yes {
                Confirmation::Confirmed
            } else {
                let mut lines = BufReader::new(tokio::io::stdin()).lines();
                confirm(&mut lines).await?
            };
            if workflow.clear_all(confirmation).await {
                Ok(ExitCode::SUCCESS)
            } else {
                eprintln!("{}", dim("Nothing cleared"));
                Ok(ExitCode::FAILURE)
            }
        }
        Command::Shell => {
            workflow.restore().await;
            shell(&mut workflow).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Serve { .. } => unreachable!("handled above"),
    }
}

/// Map CLI args to `WorkflowConfig`.
fn build_config(cli: &Cli) -> Result<WorkflowConfig> {
    let storage_dir = cli.storage_dir.clone().unwrap_or_else(default_storage_dir);

    let mut builder = WorkflowConfig::builder()
        .endpoint(cli.endpoint.clone())
        .storage_dir(storage_dir)
        .capacity(cli.capacity)
        .simulated_delay_ms(cli.delay_ms)
        .persist_client_side(cli.save_client);

    if let Some(secs) = cli.request_timeout {
        builder = builder.request_timeout_secs(secs);
    }

    builder.build().context("Invalid configuration")
}

fn default_storage_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("krushflow"))
        .unwrap_or_else(|| PathBuf::from(".krushflow"))
}

async fn run_parse(workflow: &mut Workflow) -> ExitCode {
    // The observer already showed the generic message; the detail is in the log.
    match workflow.parse_and_persist().await {
        Ok(_) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}

async fn confirm(lines: &mut Lines<BufReader<Stdin>>) -> Result<Confirmation> {
    eprint!("Are you sure you want to clear all documents and data? [y/N] ");
    io::stderr().flush().ok();
    let answer = lines.next_line().await.context("Failed to read stdin")?;
    let yes = matches!(
        answer.as_deref().map(str::trim).map(str::to_lowercase).as_deref(),
        Some("y" | "yes")
    );
    Ok(yes.into())
}

const SHELL_HELP: &str = "\
  add <path>...   stage files
  rm <id>         remove one staged document
  ls              list staged documents
  parse           parse and persist everything staged
  results         print the current results
  save on|off     toggle the client-side copy
  clear           clear documents and results (asks first)
  help            this text
  quit            leave";

async fn shell(workflow: &mut Workflow) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    eprintln!(
        "{} {}",
        cyan("◆"),
        bold(&format!(
            "KrushFlow document parser: ready for up to {} documents (type `help`)",
            workflow.config().capacity
        ))
    );

    loop {
        eprint!("{} ", cyan("krushflow>"));
        io::stderr().flush().ok();

        let Some(line) = lines.next_line().await.context("Failed to read stdin")? else {
            break;
        };
        let mut words = line.split_whitespace();
        let Some(cmd) = words.next() else {
            continue;
        };

        match cmd {
            "add" => {
                let paths: Vec<&str> = words.collect();
                if paths.is_empty() {
                    eprintln!("usage: add <path>...");
                    continue;
                }
                if workflow.remaining_slots() == 0 {
                    let capacity = workflow.config().capacity;
                    eprintln!("{} Maximum {capacity} documents allowed", red("⚠"));
                    continue;
                }
                let report = workflow.add_paths(paths).await;
                eprintln!("{}", dim(&report.to_string()));
            }
            "rm" => match words.next().map(str::parse::<DocumentId>) {
                Some(Ok(id)) => {
                    if !workflow.remove(id) {
                        eprintln!("{}", dim(&format!("{id} is not staged")));
                    }
                }
                Some(Err(e)) => eprintln!("{} invalid id: {e}", red("✗")),
                None => eprintln!("usage: rm <id>"),
            },
            "ls" => list_documents(workflow.documents()),
            "parse" => {
                if workflow.documents().is_empty() {
                    eprintln!("{}", dim("Nothing staged"));
                    continue;
                }
                run_parse(workflow).await;
            }
            "results" => match serde_json::to_string_pretty(workflow.parsed_results()) {
                Ok(json) => println!("{json}"),
                Err(e) => eprintln!("{} {e}", red("✗")),
            },
            "save" => match words.next() {
                Some("on") => workflow.set_persist_client_side(true),
                Some("off") => workflow.set_persist_client_side(false),
                _ => eprintln!(
                    "client-side save is {}",
                    if workflow.persist_client_side() { "on" } else { "off" }
                ),
            },
            "clear" => {
                let confirmation = confirm(&mut lines).await?;
                workflow.clear_all(confirmation).await;
            }
            "help" | "?" => eprintln!("{SHELL_HELP}"),
            "quit" | "exit" => break,
            other => eprintln!("{} unknown command '{other}' (try `help`)", red("✗")),
        }
    }

    Ok(())
}

fn list_documents(documents: &[Document]) {
    if documents.is_empty() {
        eprintln!("{}", dim("No documents staged"));
        return;
    }
    for (i, doc) in documents.iter().enumerate() {
        println!(
            "{:>2}. {}  {:<32}  {:>12}  {}",
            i + 1,
            dim(&doc.id.to_string()),
            doc.name,
            format_size(doc.size),
            dim(&doc.mime_type),
        );
    }
}
