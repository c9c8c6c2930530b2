//! # GitHub App CLI
//!
//! Command-line interface for acting as a GitHub App installation.
//!
//! This module provides CLI commands for:
//! - Discovering installations and the repositories they grant
//! - Listing, creating and updating issues
//! - Per-user issue and pull request views
//! - Inspecting the installation's rate limit
//!
//! Settings come from an optional TOML file and `GITHUB_APP_*` environment
//! variables. Results go to stdout; logs go to stderr.

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use github_app_client::client::{CreateIssueRequest, UpdateIssueRequest};
use github_app_client::{
    Aggregated, AggregationQuery, ApiError, AppSettings, AuthError, ConfigError, GitHubClient,
    InstallationId, Issue, IssueState, PullRequest, StateFilter,
};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{debug, info};

// ============================================================================
// CLI Structure
// ============================================================================

/// GitHub App CLI - act as a GitHub App installation
#[derive(Parser)]
#[command(name = "github-app")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Act as a GitHub App installation from the command line")]
#[command(
    long_about = "Signs GitHub App assertions, exchanges them for installation tokens and queries repositories, issues and pull requests"
)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "GITHUB_APP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Installation to act as (overrides GITHUB_APP_INSTALLATION_ID)
    #[arg(short, long, global = true)]
    pub installation: Option<InstallationId>,

    /// Logging level (ignored when RUST_LOG is set)
    #[arg(short, long, default_value = "warn")]
    pub log_level: String,

    /// Enable JSON logging
    #[arg(long)]
    pub json_logs: bool,

    /// Output format
    #[arg(short = 'o', long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// List the App's installations
    Installations,

    /// Find the installation on an account
    FindInstallation {
        /// Account login (case-insensitive)
        login: String,
    },

    /// List repositories the installation can access
    Repos,

    /// Show a repository
    Repo {
        /// Repository as owner/name
        repository: RepoRef,
    },

    /// List one page of a repository's issues (pull requests excluded)
    Issues {
        /// Repository as owner/name
        repository: RepoRef,

        /// Issue state
        #[arg(short, long, default_value = "open")]
        state: StateArg,

        /// Page number (1-based)
        #[arg(long, default_value = "1")]
        page: u32,

        /// Results per page
        #[arg(long, default_value = "30", value_parser = clap::value_parser!(u32).range(1..=100))]
        per_page: u32,
    },

    /// Issues assigned to or created by a user
    UserIssues {
        /// Repository as owner/name
        repository: RepoRef,

        /// User login
        login: String,

        #[command(flatten)]
        scope: ScopeArgs,
    },

    /// Pull requests a user authored, is assigned to, or is asked to review
    UserPulls {
        /// Repository as owner/name
        repository: RepoRef,

        /// User login
        login: String,

        #[command(flatten)]
        scope: ScopeArgs,
    },

    /// Create an issue
    CreateIssue {
        /// Repository as owner/name
        repository: RepoRef,

        /// Issue title
        #[arg(short, long)]
        title: String,

        /// Issue body (Markdown)
        #[arg(short, long)]
        body: Option<String>,

        /// Label to apply (repeatable)
        #[arg(long = "label")]
        labels: Vec<String>,

        /// Login to assign (repeatable)
        #[arg(long = "assignee")]
        assignees: Vec<String>,
    },

    /// Update an issue
    UpdateIssue {
        /// Repository as owner/name
        repository: RepoRef,

        /// Issue number
        number: u64,

        /// New title
        #[arg(short, long)]
        title: Option<String>,

        /// New body (Markdown)
        #[arg(short, long)]
        body: Option<String>,

        /// Open or close the issue
        #[arg(short, long)]
        state: Option<IssueStateArg>,
    },

    /// Show the installation's core rate limit
    RateLimit,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// State scope shared by the per-user views
#[derive(clap::Args, Debug, Clone)]
pub struct ScopeArgs {
    /// Item state
    #[arg(short, long, default_value = "open")]
    pub state: StateArg,

    /// With --state all, list open items before closed ones
    #[arg(long)]
    pub prioritize_open: bool,

    /// Fail instead of printing partial results when a query fails
    #[arg(long)]
    pub strict: bool,
}

/// Output format options
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON output
    Json,
}

/// State filter options
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StateArg {
    Open,
    Closed,
    All,
}

impl From<StateArg> for StateFilter {
    fn from(state: StateArg) -> Self {
        match state {
            StateArg::Open => StateFilter::Open,
            StateArg::Closed => StateFilter::Closed,
            StateArg::All => StateFilter::All,
        }
    }
}

/// Issue state transitions
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum IssueStateArg {
    Open,
    Closed,
}

impl From<IssueStateArg> for IssueState {
    fn from(state: IssueStateArg) -> Self {
        match state {
            IssueStateArg::Open => IssueState::Open,
            IssueStateArg::Closed => IssueState::Closed,
        }
    }
}

/// Repository reference in `owner/name` form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl FromStr for RepoRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().split_once('/') {
            Some((owner, name))
                if !owner.is_empty() && !name.is_empty() && !name.contains('/') =>
            {
                Ok(Self {
                    owner: owner.to_string(),
                    name: name.to_string(),
                })
            }
            _ => Err(format!("expected owner/name, got '{}'", s)),
        }
    }
}

impl std::fmt::Display for RepoRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

// ============================================================================
// CLI Error Types
// ============================================================================

/// CLI error types
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("{0}")]
    Api(#[from] ApiError),

    #[error("Command failed: {message}")]
    CommandFailed { message: String },

    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Invalid argument: {arg} - {message}")]
    InvalidArgument { arg: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Output error: {0}")]
    Output(#[from] serde_json::Error),
}

impl CliError {
    /// Process exit code for this error.
    ///
    /// 1 configuration, 2 credentials or installation, 3 API failure,
    /// 4 not found or bad argument, 5 local I/O.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Configuration(_) => 1,
            CliError::Api(ApiError::Auth(AuthError::Config(_)))
            | CliError::Api(ApiError::Configuration { .. }) => 1,
            CliError::Api(ApiError::Auth(_)) => 2,
            CliError::Api(_) | CliError::CommandFailed { .. } => 3,
            CliError::NotFound { .. } | CliError::InvalidArgument { .. } => 4,
            CliError::Io(_) | CliError::Output(_) => 5,
        }
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

/// Parse arguments, set up logging and run the command against stdout.
pub async fn run_cli() -> Result<(), CliError> {
    let cli = Cli::parse();

    initialize_logging(&cli.log_level, cli.json_logs)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    run(cli, &mut out).await
}

/// Run a parsed command, writing results to `out`.
pub async fn run<W: Write>(cli: Cli, out: &mut W) -> Result<(), CliError> {
    if let Commands::Completions { shell } = cli.command {
        clap_complete::generate(shell, &mut Cli::command(), "github-app", out);
        return Ok(());
    }

    let settings = load_settings(cli.config, cli.installation)?;
    let client = GitHubClient::from_settings(&settings)?;

    execute_command(&client, cli.command, cli.format, out).await
}

/// Initialize the tracing subscriber, writing to stderr.
///
/// `RUST_LOG` takes precedence over `level`.
pub fn initialize_logging(level: &str, json: bool) -> Result<(), CliError> {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level).map_err(|e| CliError::InvalidArgument {
            arg: "log-level".to_string(),
            message: e.to_string(),
        })?,
    };

    let registry = tracing_subscriber::registry().with(filter);
    let result = if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };

    result.map_err(|e| CliError::CommandFailed {
        message: format!("Failed to initialize logging: {}", e),
    })
}

/// Default settings file: `<config dir>/github-app/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("github-app").join("config.toml"))
}

/// Load settings from the explicit file, else the default file if it exists,
/// then the environment. `installation` overrides the configured installation.
pub fn load_settings(
    config: Option<PathBuf>,
    installation: Option<InstallationId>,
) -> Result<AppSettings, CliError> {
    let path = config.or_else(|| default_config_path().filter(|p| p.is_file()));
    debug!(config = ?path, "Loading settings");

    let mut settings = AppSettings::load(path.as_deref())?;
    if let Some(installation) = installation {
        settings.installation_id = Some(installation.as_u64());
    }
    Ok(settings)
}

// ============================================================================
// Command Implementations
// ============================================================================

/// Execute one command with an already-built client.
pub async fn execute_command<W: Write>(
    client: &GitHubClient,
    command: Commands,
    format: OutputFormat,
    out: &mut W,
) -> Result<(), CliError> {
    match command {
        Commands::Installations => {
            let installations = client.list_installations().await?.into_data();
            match format {
                OutputFormat::Json => write_json(out, &installations)?,
                OutputFormat::Text => {
                    for installation in &installations {
                        writeln!(
                            out,
                            "{}\t{}\t{}",
                            installation.id,
                            installation.account.login,
                            installation.account.account_type.as_deref().unwrap_or("-")
                        )?;
                    }
                }
            }
        }

        Commands::FindInstallation { login } => {
            let found = client.find_installation_by_username(&login).await?;
            match (format, found) {
                (OutputFormat::Json, found) => write_json(
                    out,
                    &serde_json::json!({ "login": login, "installation_id": found }),
                )?,
                (OutputFormat::Text, Some(id)) => writeln!(out, "{}", id)?,
                (OutputFormat::Text, None) => {
                    return Err(CliError::NotFound {
                        message: format!("no installation for account '{}'", login),
                    })
                }
            }
        }

        Commands::Repos => {
            let repos = client
                .configured_installation()
                .list_accessible_repositories()
                .await?
                .into_data();
            match format {
                OutputFormat::Json => write_json(out, &repos)?,
                OutputFormat::Text => {
                    for repo in &repos {
                        let visibility = if repo.private { "private" } else { "public" };
                        writeln!(out, "{}\t{}", repo.full_name, visibility)?;
                    }
                }
            }
        }

        Commands::Repo { repository } => {
            let repo = client
                .configured_installation()
                .get_repository(&repository.owner, &repository.name)
                .await?
                .into_data();
            match format {
                OutputFormat::Json => write_json(out, &repo)?,
                OutputFormat::Text => {
                    writeln!(out, "{}", repo.full_name)?;
                    if let Some(description) = &repo.description {
                        writeln!(out, "{}", description)?;
                    }
                    writeln!(
                        out,
                        "default branch: {}",
                        repo.default_branch.as_deref().unwrap_or("-")
                    )?;
                    writeln!(out, "open issues: {}", repo.open_issues_count)?;
                    writeln!(out, "{}", repo.html_url)?;
                }
            }
        }

        Commands::Issues {
            repository,
            state,
            page,
            per_page,
        } => {
            let issues = client
                .configured_installation()
                .list_repository_issues(
                    &repository.owner,
                    &repository.name,
                    state.into(),
                    page,
                    per_page,
                )
                .await?
                .into_data();
            match format {
                OutputFormat::Json => write_json(out, &issues)?,
                OutputFormat::Text => write_issue_lines(out, &issues)?,
            }
        }

        Commands::UserIssues {
            repository,
            login,
            scope,
        } => {
            let query = aggregation_query(&repository, &login, &scope);
            let result = client.configured_installation().get_user_issues(&query).await?;
            check_partial(&result, &scope)?;
            match format {
                OutputFormat::Json => write_json(out, &result)?,
                OutputFormat::Text => write_issue_lines(out, &result.items)?,
            }
        }

        Commands::UserPulls {
            repository,
            login,
            scope,
        } => {
            let query = aggregation_query(&repository, &login, &scope);
            let result = client
                .configured_installation()
                .get_user_pull_requests(&query)
                .await?;
            check_partial(&result, &scope)?;
            match format {
                OutputFormat::Json => write_json(out, &result)?,
                OutputFormat::Text => write_pull_lines(out, &result.items)?,
            }
        }

        Commands::CreateIssue {
            repository,
            title,
            body,
            labels,
            assignees,
        } => {
            let request = CreateIssueRequest {
                title,
                body,
                labels: non_empty(labels),
                assignees: non_empty(assignees),
            };
            let issue = client
                .configured_installation()
                .create_issue(&repository.owner, &repository.name, &request)
                .await?
                .into_data();
            info!(repository = %repository, number = issue.number, "Created issue");
            match format {
                OutputFormat::Json => write_json(out, &issue)?,
                OutputFormat::Text => writeln!(out, "{}", issue.html_url)?,
            }
        }

        Commands::UpdateIssue {
            repository,
            number,
            title,
            body,
            state,
        } => {
            if title.is_none() && body.is_none() && state.is_none() {
                return Err(CliError::InvalidArgument {
                    arg: "update-issue".to_string(),
                    message: "nothing to update; pass --title, --body or --state".to_string(),
                });
            }
            let request = UpdateIssueRequest {
                title,
                body,
                state: state.map(IssueState::from),
                ..Default::default()
            };
            let issue = client
                .configured_installation()
                .update_issue(&repository.owner, &repository.name, number, &request)
                .await?
                .into_data();
            info!(repository = %repository, number, "Updated issue");
            match format {
                OutputFormat::Json => write_json(out, &issue)?,
                OutputFormat::Text => write_issue_lines(out, std::slice::from_ref(&issue))?,
            }
        }

        Commands::RateLimit => {
            let core = client
                .configured_installation()
                .get_rate_limit()
                .await?
                .into_data();
            match format {
                OutputFormat::Json => write_json(out, &core)?,
                OutputFormat::Text => {
                    writeln!(out, "limit: {}", core.limit)?;
                    writeln!(out, "remaining: {}", core.remaining)?;
                    match core.reset_at() {
                        Some(at) => writeln!(out, "resets: {}", at.to_rfc3339())?,
                        None => writeln!(out, "resets: -")?,
                    }
                }
            }
        }

        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "github-app", out);
        }
    }

    Ok(())
}

fn aggregation_query(repository: &RepoRef, login: &str, scope: &ScopeArgs) -> AggregationQuery {
    AggregationQuery::new(&repository.owner, &repository.name, login)
        .with_state(scope.state.into())
        .prioritize_open(scope.prioritize_open)
}

/// Report failed sub-queries; with `--strict` they become an error.
fn check_partial<T>(result: &Aggregated<T>, scope: &ScopeArgs) -> Result<(), CliError> {
    if !result.is_partial() {
        return Ok(());
    }

    let failures: Vec<String> = result
        .failed_queries
        .iter()
        .map(|f| format!("{} {} ({})", f.state, f.kind, f.message))
        .collect();

    if scope.strict {
        return Err(CliError::CommandFailed {
            message: format!("partial results: {}", failures.join("; ")),
        });
    }

    eprintln!(
        "warning: results are incomplete; failed queries: {}",
        failures.join("; ")
    );
    Ok(())
}

fn non_empty(values: Vec<String>) -> Option<Vec<String>> {
    if values.is_empty() {
        None
    } else {
        Some(values)
    }
}

fn write_json<W: Write, T: Serialize + ?Sized>(out: &mut W, value: &T) -> Result<(), CliError> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

fn state_label(state: IssueState) -> &'static str {
    match state {
        IssueState::Open => "open",
        IssueState::Closed => "closed",
    }
}

fn write_issue_lines<W: Write>(out: &mut W, issues: &[Issue]) -> Result<(), CliError> {
    for issue in issues {
        writeln!(
            out,
            "#{}\t{}\t{}\t{}",
            issue.number,
            state_label(issue.state),
            issue.updated_at.format("%Y-%m-%d"),
            issue.title
        )?;
    }
    Ok(())
}

fn write_pull_lines<W: Write>(out: &mut W, pulls: &[PullRequest]) -> Result<(), CliError> {
    for pull in pulls {
        let state = if pull.merged_at.is_some() {
            "merged"
        } else {
            state_label(pull.state)
        };
        writeln!(
            out,
            "#{}\t{}\t{}\t{}",
            pull.number,
            state,
            pull.updated_at.format("%Y-%m-%d"),
            pull.title
        )?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
