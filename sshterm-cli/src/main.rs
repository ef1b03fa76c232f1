//! `sshterm` CLI - Command-line interface for the `sshterm` session client
//!
//! Provides an interactive remote shell over SSH (or an offline simulated
//! shell), plus commands for managing saved transcripts and exported
//! transcript files.

use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use sshterm_core::config::{AppSettings, ConfigManager};
use sshterm_core::error::{ControllerError, TranscriptError};
use sshterm_core::models::{ConnectionParams, LineSource, LogLine, TranscriptRecord};
use sshterm_core::session::{ConnectionState, LogFeed, SessionController};
use sshterm_core::transcript::{FileTranscriptStore, TranscriptFile, TranscriptFiles, TranscriptStore};
use sshterm_core::transport::{HostKeyPolicy, RusshTransport, SimulatedTransport, Transport};
use tokio::io::{AsyncBufReadExt, BufReader};

/// Input line that ends the session locally
const ESCAPE_DISCONNECT: &str = "~.";

/// `sshterm` command-line interface for interactive remote shells
#[derive(Parser)]
#[command(name = "sshterm")]
#[command(author, version, about = "Interactive remote-session client")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration directory (default: ~/.config/sshterm)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v warn, -vv info, -vvv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Open an interactive shell on a remote host
    #[command(about = "Connect to a host and run an interactive shell")]
    Connect {
        /// Host address (hostname or IP)
        host: String,

        /// Username for authentication
        #[arg(short, long)]
        user: String,

        /// Port number (default from config, normally 22)
        #[arg(short, long)]
        port: Option<u16>,

        /// Password; prompted for when not given
        #[arg(long, env = "SSHTERM_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        /// Use the built-in simulated shell instead of SSH
        #[arg(long)]
        simulated: bool,

        /// Host key policy: known-hosts[:PATH], fingerprint:SHA256:..., accept-all
        #[arg(long, value_parser = parse_host_key_policy)]
        host_key: Option<HostKeyPolicy>,

        /// Connect timeout in milliseconds (default from config)
        #[arg(short, long)]
        timeout_ms: Option<u64>,

        /// Save the transcript to the transcript store on exit
        #[arg(long)]
        save: bool,

        /// Export the transcript as an ssh_session_<millis>.txt file on exit
        #[arg(long)]
        export: bool,
    },

    /// Manage saved transcripts
    #[command(subcommand, about = "Manage saved session transcripts")]
    Transcripts(TranscriptCommands),

    /// Manage exported transcript files
    #[command(subcommand, about = "Manage exported ssh_session_*.txt files")]
    Files(FileCommands),
}

/// Output format for list commands
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    /// Display as formatted table
    Table,
    /// Output as JSON
    Json,
}

/// Transcript store subcommands
#[derive(Subcommand)]
pub enum TranscriptCommands {
    /// List saved transcripts, newest first
    List {
        /// Output format
        #[arg(short, long, default_value = "table", value_enum)]
        format: OutputFormat,
    },

    /// Print one transcript
    Show {
        /// Transcript ID or unique ID prefix
        id: String,
    },

    /// Delete one transcript
    Delete {
        /// Transcript ID or unique ID prefix
        id: String,
    },
}

/// Exported file subcommands
#[derive(Subcommand)]
pub enum FileCommands {
    /// List exported files, newest first
    List,

    /// Print one exported file
    Show {
        /// File name (ssh_session_<millis>.txt)
        name: String,
    },

    /// Delete one exported file
    Delete {
        /// File name (ssh_session_<millis>.txt)
        name: String,
    },
}

fn parse_host_key_policy(s: &str) -> Result<HostKeyPolicy, String> {
    s.parse().map_err(|e: sshterm_core::ConfigError| e.to_string())
}

fn main() {
    let cli = Cli::parse();

    let code = match run(cli) {
        Ok(()) => exit_codes::SUCCESS,
        Err(e) => {
            eprintln!("{}", error_report(&e));
            e.exit_code()
        }
    };
    std::process::exit(code);
}

/// Message printed for a failed command
fn error_report(e: &CliError) -> String {
    if e.is_connection_failure() {
        format!("Error: {e}\nCheck the host, port, credentials and host key policy.")
    } else {
        format!("Error: {e}")
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config_manager = match &cli.config {
        Some(dir) => ConfigManager::with_config_dir(dir),
        None => ConfigManager::new()
            .map_err(|e| CliError::Config(format!("Failed to initialize config: {e}")))?,
    };
    let settings = config_manager
        .load_settings()
        .map_err(|e| CliError::Config(format!("Failed to load settings: {e}")))?;

    let verbosity = if cli.verbose > 0 {
        cli.verbose
    } else {
        settings.logging.verbosity
    };
    if let Err(e) = sshterm_core::logging::init_logging(verbosity) {
        eprintln!("Warning: logging unavailable: {e}");
    }

    match cli.command {
        Commands::Connect {
            host,
            user,
            port,
            password,
            simulated,
            host_key,
            timeout_ms,
            save,
            export,
        } => {
            let request = ConnectRequest {
                host,
                user,
                port,
                password,
                simulated,
                host_key,
                timeout_ms,
                save,
                export,
            };
            cmd_connect(&config_manager, &settings, request)
        }
        Commands::Transcripts(subcmd) => cmd_transcripts(&config_manager, subcmd),
        Commands::Files(subcmd) => cmd_files(&settings, subcmd),
    }
}

// ============================================================================
// Connect command
// ============================================================================

/// Arguments of the connect command
struct ConnectRequest {
    host: String,
    user: String,
    port: Option<u16>,
    password: Option<String>,
    simulated: bool,
    host_key: Option<HostKeyPolicy>,
    timeout_ms: Option<u64>,
    save: bool,
    export: bool,
}

/// Connect command handler
fn cmd_connect(
    config_manager: &ConfigManager,
    settings: &AppSettings,
    request: ConnectRequest,
) -> Result<(), CliError> {
    let password = match request.password {
        Some(password) => password,
        None if request.simulated => String::new(),
        None => prompt_password(&request.user, &request.host)?,
    };
    let params = ConnectionParams::new(
        request.host,
        request.port.unwrap_or(settings.connection.default_port),
        request.user,
        password,
    );

    let mut options = settings.session_options();
    if let Some(ms) = request.timeout_ms {
        options = options.with_connect_timeout(Duration::from_millis(ms));
    }

    let transport: Arc<dyn Transport> = if request.simulated {
        Arc::new(SimulatedTransport::new().with_banner([
            "Welcome to the sshterm demo shell.",
            "Type 'help' for available commands, 'exit' or '~.' to leave.",
        ]))
    } else {
        let policy = request
            .host_key
            .unwrap_or_else(|| settings.connection.host_key_policy.clone());
        Arc::new(RusshTransport::new(policy))
    };

    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::Config(format!("Failed to create async runtime: {e}")))?;

    let controller = SessionController::with_options(transport, options);
    tracing::debug!(
        transport = controller.transport_name(),
        peer = %params.display_target(),
        "Starting interactive session"
    );
    let outcome = runtime.block_on(run_session(&controller, params.clone()));

    // Transcript is kept even when the session failed part way
    if request.save {
        let store = FileTranscriptStore::new(config_manager.clone());
        match runtime.block_on(controller.save_transcript(&store)) {
            Ok(id) => println!("Transcript saved with ID: {id}"),
            Err(TranscriptError::Empty) => {}
            Err(e) => eprintln!("Warning: failed to save transcript: {e}"),
        }
    }
    if request.export {
        let files = transcript_files(settings)?;
        let path = files
            .export(&params.host, &params.username, &controller.transcript_text())
            .map_err(|e| CliError::Transcript(e.to_string()))?;
        println!("Log saved to {}", path.display());
    }

    // A stdin read may still be parked on the blocking pool
    runtime.shutdown_background();
    outcome
}

/// Runs one interactive session until stdin closes, the user escapes, or
/// the remote ends the shell
async fn run_session(
    controller: &SessionController,
    params: ConnectionParams,
) -> Result<(), CliError> {
    let mut feed = controller.subscribe();

    let connect = controller.connect(params);
    tokio::pin!(connect);
    let connected = loop {
        tokio::select! {
            result = &mut connect => break result,
            Some(line) = feed.recv() => print_line(&line),
        }
    };

    let result = match connected {
        Ok(()) => interact(controller, &mut feed).await,
        Err(e) => Err(e.into()),
    };
    controller.disconnect().await;

    for line in feed.drain() {
        print_line(&line);
    }
    result
}

async fn interact(controller: &SessionController, feed: &mut LogFeed) -> Result<(), CliError> {
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut state = controller.watch_state();

    loop {
        tokio::select! {
            Some(line) = feed.recv() => print_line(&line),
            line = stdin.next_line() => {
                let Some(line) = line? else {
                    return Ok(());
                };
                if line.trim() == ESCAPE_DISCONNECT {
                    return Ok(());
                }
                if let Err(e) = controller.send(&line).await {
                    if controller.state() == ConnectionState::Connected {
                        eprintln!("Error: {e}");
                    } else {
                        return Ok(());
                    }
                }
            }
            _ = state.wait_for(|s| !s.is_connected()) => return Ok(()),
        }
    }
}

fn print_line(line: &LogLine) {
    match line.source {
        LineSource::System => eprintln!("{}", line.text),
        LineSource::RemoteOutput | LineSource::LocalEcho => println!("{}", line.text),
        LineSource::Clear => print!("\x1b[H\x1b[2J"),
    }
}

fn prompt_password(user: &str, host: &str) -> Result<String, CliError> {
    use std::io::{BufRead, Write};

    eprint!("{user}@{host}'s password: ");
    std::io::stderr().flush()?;
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

// ============================================================================
// Transcript commands
// ============================================================================

/// Transcript command handler
fn cmd_transcripts(
    config_manager: &ConfigManager,
    subcmd: TranscriptCommands,
) -> Result<(), CliError> {
    let store = FileTranscriptStore::new(config_manager.clone());
    match subcmd {
        TranscriptCommands::List { format } => {
            let records = store
                .list()
                .map_err(|e| CliError::Transcript(format!("Failed to load transcripts: {e}")))?;
            match format {
                OutputFormat::Table => println!("{}", format_transcript_table(&records)),
                OutputFormat::Json => {
                    let json = serde_json::to_string_pretty(&records).map_err(|e| {
                        CliError::Transcript(format!("Failed to serialize to JSON: {e}"))
                    })?;
                    println!("{json}");
                }
            }
        }
        TranscriptCommands::Show { id } => {
            let record = find_transcript(&store, &id)?;
            println!("Host: {}", record.host);
            println!("Saved: {}", format_millis(record.timestamp_millis));
            println!();
            println!("{}", record.text);
        }
        TranscriptCommands::Delete { id } => {
            let record = find_transcript(&store, &id)?;
            store
                .delete(record.id)
                .map_err(|e| CliError::Transcript(e.to_string()))?;
            println!("Deleted transcript {} ({})", record.id, record.host);
        }
    }
    Ok(())
}

/// Finds a transcript by full ID or unique ID prefix
fn find_transcript(
    store: &dyn TranscriptStore,
    id_or_prefix: &str,
) -> Result<TranscriptRecord, CliError> {
    let records = store
        .list()
        .map_err(|e| CliError::Transcript(format!("Failed to load transcripts: {e}")))?;
    let needle = id_or_prefix.trim().to_ascii_lowercase();
    if needle.is_empty() {
        return Err(CliError::Invalid(
            "Transcript ID cannot be empty".to_string(),
        ));
    }
    let mut matches: Vec<TranscriptRecord> = records
        .into_iter()
        .filter(|r| r.id.to_string().starts_with(&needle))
        .collect();

    match matches.len() {
        0 => Err(CliError::NotFound(id_or_prefix.to_string())),
        1 => Ok(matches.remove(0)),
        n => Err(CliError::Transcript(format!(
            "ID prefix '{id_or_prefix}' matches {n} transcripts"
        ))),
    }
}

/// Format transcripts as a table string
#[must_use]
pub fn format_transcript_table(records: &[TranscriptRecord]) -> String {
    if records.is_empty() {
        return "No transcripts found.".to_string();
    }

    let mut output = String::new();
    let host_width = records
        .iter()
        .map(|r| r.host.len())
        .max()
        .unwrap_or(4)
        .max(4);
    let id_width = 8;
    let saved_width = 19;

    let _ = writeln!(
        output,
        "{:<id_width$}  {:<host_width$}  {:<saved_width$}  LINES",
        "ID", "HOST", "SAVED"
    );
    let _ = writeln!(
        output,
        "{:-<id_width$}  {:-<host_width$}  {:-<saved_width$}  -----",
        "", "", ""
    );
    for record in records {
        let id = record.id.to_string();
        let _ = writeln!(
            output,
            "{:<id_width$}  {:<host_width$}  {:<saved_width$}  {}",
            &id[..id_width],
            record.host,
            format_millis(record.timestamp_millis),
            record.line_count()
        );
    }

    output.trim_end().to_string()
}

fn format_millis(millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(millis).map_or_else(
        || millis.to_string(),
        |t| {
            t.with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        },
    )
}

// ============================================================================
// File commands
// ============================================================================

fn transcript_files(settings: &AppSettings) -> Result<TranscriptFiles, CliError> {
    settings
        .transcripts
        .resolved_directory()
        .map(TranscriptFiles::new)
        .ok_or_else(|| CliError::Config("No directory for transcript files".to_string()))
}

/// File command handler
fn cmd_files(settings: &AppSettings, subcmd: FileCommands) -> Result<(), CliError> {
    let files = transcript_files(settings)?;
    match subcmd {
        FileCommands::List => {
            let listed = files
                .list()
                .map_err(|e| CliError::Transcript(format!("Failed to list files: {e}")))?;
            println!("{}", format_file_table(&listed));
        }
        FileCommands::Show { name } => {
            let text = files.read(&name).map_err(map_file_error)?;
            println!("{text}");
        }
        FileCommands::Delete { name } => {
            files.delete(&name).map_err(map_file_error)?;
            println!("Deleted {name}");
        }
    }
    Ok(())
}

fn map_file_error(e: TranscriptError) -> CliError {
    match e {
        TranscriptError::NotFound(name) => CliError::NotFound(name),
        other => CliError::Transcript(other.to_string()),
    }
}

/// Format exported files as a table string
#[must_use]
pub fn format_file_table(files: &[TranscriptFile]) -> String {
    if files.is_empty() {
        return "No files found.".to_string();
    }

    let mut output = String::new();
    let name_width = files
        .iter()
        .map(|f| f.name.len())
        .max()
        .unwrap_or(4)
        .max(4);

    let _ = writeln!(output, "{:<name_width$}  {:>8}  MODIFIED", "NAME", "SIZE");
    for file in files {
        let modified = file.modified.map_or_else(
            || "-".to_string(),
            |t| {
                t.with_timezone(&chrono::Local)
                    .format("%Y-%m-%d %H:%M:%S")
                    .to_string()
            },
        );
        let _ = writeln!(
            output,
            "{:<name_width$}  {:>8}  {}",
            file.name, file.size, modified
        );
    }

    output.trim_end().to_string()
}

// ============================================================================
// Errors
// ============================================================================

/// Exit codes for CLI commands
pub mod exit_codes {
    /// Success - operation completed successfully
    pub const SUCCESS: i32 = 0;
    /// General error - configuration, validation, or other non-connection errors
    pub const GENERAL_ERROR: i32 = 1;
    /// Connection failure - the session could not be established
    pub const CONNECTION_FAILURE: i32 = 2;
}

/// CLI error type
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid arguments
    #[error("Invalid argument: {0}")]
    Invalid(String),

    /// Session could not be established
    #[error("{0}")]
    Connection(String),

    /// Transcript error
    #[error("Transcript error: {0}")]
    Transcript(String),

    /// Transcript or file not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ControllerError> for CliError {
    fn from(e: ControllerError) -> Self {
        match e {
            ControllerError::InvalidParams { .. } | ControllerError::InvalidState { .. } => {
                Self::Invalid(e.to_string())
            }
            ControllerError::Connect(_)
            | ControllerError::Channel(_)
            | ControllerError::Write(_)
            | ControllerError::Cancelled => Self::Connection(e.to_string()),
        }
    }
}

impl CliError {
    /// Returns the appropriate exit code for this error type.
    ///
    /// Exit codes:
    /// - 0: Success (not an error)
    /// - 1: General error (configuration, validation, transcripts, IO)
    /// - 2: Connection failure
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Connection(_) => exit_codes::CONNECTION_FAILURE,
            Self::Config(_)
            | Self::Invalid(_)
            | Self::Transcript(_)
            | Self::NotFound(_)
            | Self::Io(_) => exit_codes::GENERAL_ERROR,
        }
    }

    /// Returns true if this is a connection-related failure.
    #[must_use]
    pub const fn is_connection_failure(&self) -> bool {
        matches!(self, Self::Connection(_))
    }
}
