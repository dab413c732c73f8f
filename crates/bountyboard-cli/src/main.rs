//! Bountyboard CLI
//!
//! The `bountyboard` command computes security bounty leaderboards and keeps
//! the reward status comments on tracked issues up to date.
//!
//! ## Commands
//!
//! - `contributors`: blue and red team merged into one ranking
//! - `blue-team`: rewards earned by fixing issues
//! - `red-team`: bounties paid on migrated issues
//! - `update-comments`: reconcile status comments of one issue or a repository
//! - `webhook`: handle a stored webhook delivery

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use bountyboard_core::domain::RepoRef;
use bountyboard_core::{
    BountyConfig, BountyService, IssueReconciliation, KindOutcome, Leaderboard,
    RepositoryReconciliation, WebhookEvent, WebhookOutcome, METRICS,
};
use bountyboard_github::{verify_signature, GithubClient, GithubConfig};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::{info, warn, Level};

#[derive(Parser)]
#[command(name = "bountyboard")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Security bounty leaderboards and issue reward comments", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// TOML configuration file (defaults apply when omitted)
    #[arg(short, long, global = true, env = "BOUNTY_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Blue and red team merged into one ranking
    Contributors(BoardArgs),

    /// Rewards earned by fixing issues
    BlueTeam(BoardArgs),

    /// Bounties credited to hunters on migrated issues
    RedTeam(BoardArgs),

    /// Reconcile reward comments
    UpdateComments {
        /// Repository as `owner/name`
        #[arg(short, long)]
        repo: RepoRef,

        /// Only this issue (default: every issue of the repository)
        #[arg(short, long)]
        issue: Option<u64>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Handle a webhook delivery stored on disk
    Webhook {
        /// Delivery body (JSON)
        #[arg(short, long)]
        payload: PathBuf,

        /// `X-Hub-Signature-256` header of the delivery
        #[arg(short, long)]
        signature: Option<String>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
}

#[derive(Args)]
struct BoardArgs {
    /// Repository as `owner/name`; repeat for several
    #[arg(short, long = "repo", required = true)]
    repos: Vec<RepoRef>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Debug, Clone, Copy)]
enum Board {
    Contributors,
    Blue,
    Red,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    bountyboard_core::init_tracing(cli.json, level);

    let config = load_config(cli.config.as_deref())?;
    let github = GithubConfig::from_env().context("Invalid GitHub settings")?;

    let result = match cli.command {
        Commands::Contributors(args) => {
            cmd_board(&config, &github, Board::Contributors, args).await
        }
        Commands::BlueTeam(args) => cmd_board(&config, &github, Board::Blue, args).await,
        Commands::RedTeam(args) => cmd_board(&config, &github, Board::Red, args).await,
        Commands::UpdateComments {
            repo,
            issue,
            format,
        } => cmd_update_comments(&config, &github, &repo, issue, format).await,
        Commands::Webhook {
            payload,
            signature,
            format,
        } => cmd_webhook(&config, &github, &payload, signature.as_deref(), format).await,
    };

    METRICS.flush();
    result
}

/// File (if any) first, then `BOUNTY_*` overrides.
fn load_config(path: Option<&Path>) -> Result<BountyConfig> {
    let base = match path {
        Some(path) => BountyConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => BountyConfig::default(),
    };
    base.with_env_overrides()
        .context("Invalid BOUNTY_* environment override")
}

fn build_service(config: &BountyConfig, github: &GithubConfig) -> Result<BountyService> {
    let client = Arc::new(
        GithubClient::new(github.clone()).context("Failed to create GitHub client")?,
    );
    Ok(BountyService::new(client.clone(), client, config.clone()))
}

async fn cmd_board(
    config: &BountyConfig,
    github: &GithubConfig,
    board: Board,
    args: BoardArgs,
) -> Result<()> {
    let service = build_service(config, github)?;
    let leaderboard = match board {
        Board::Contributors => service.list_contributors(&args.repos).await,
        Board::Blue => service.list_blue_team(&args.repos).await,
        Board::Red => service.list_red_team(&args.repos).await,
    }
    .context("Failed to build leaderboard")?;

    for failure in &leaderboard.failed_repositories {
        warn!(repo = %failure.repository, error = %failure.error, "repository left out");
    }
    emit(&leaderboard, args.format, render_leaderboard)
}

async fn cmd_update_comments(
    config: &BountyConfig,
    github: &GithubConfig,
    repo: &RepoRef,
    issue: Option<u64>,
    format: OutputFormat,
) -> Result<()> {
    if github.token.is_none() {
        bail!("GITHUB_TOKEN must be set to write comments");
    }
    let service = build_service(config, github)?;
    let report = service
        .trigger_comment_update(repo, issue)
        .await
        .with_context(|| format!("Failed to update comments in {repo}"))?;
    emit(&report, format, render_repository)?;

    if report.error_count() > 0 || !report.failures.is_empty() {
        bail!(
            "{} comment error(s), {} issue(s) failed",
            report.error_count(),
            report.failures.len()
        );
    }
    Ok(())
}

async fn cmd_webhook(
    config: &BountyConfig,
    github: &GithubConfig,
    payload: &Path,
    signature: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let body = std::fs::read(payload)
        .with_context(|| format!("Failed to read payload {}", payload.display()))?;
    check_signature(github.webhook_secret.as_deref(), &body, signature)?;

    let event = WebhookEvent::from_slice(&body)?;
    info!(action = %event.action, repo = %event.repository.full_name, "handling delivery");

    let service = build_service(config, github)?;
    let outcome = service.receive_webhook_event(&event).await?;
    emit(&outcome, format, render_webhook)
}

/// Deliveries must be signed whenever a secret is configured.
fn check_signature(secret: Option<&str>, body: &[u8], signature: Option<&str>) -> Result<()> {
    match (secret, signature) {
        (Some(secret), Some(signature)) => verify_signature(secret.as_bytes(), body, signature)
            .context("Webhook signature rejected"),
        (Some(_), None) => bail!("GITHUB_WEBHOOK_SECRET is set but the delivery has no signature"),
        (None, Some(_)) => bail!("Cannot check the signature: GITHUB_WEBHOOK_SECRET is not set"),
        (None, None) => {
            warn!("no webhook secret configured; accepting unsigned delivery");
            Ok(())
        }
    }
}

fn emit<T: Serialize>(value: &T, format: OutputFormat, table: fn(&T) -> String) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Table => print!("{}", table(value)),
    }
    Ok(())
}

fn render_leaderboard(board: &Leaderboard) -> String {
    let mut out = String::new();
    if board.contributors.is_empty() {
        out.push_str("No rewarded contributors\n");
    } else {
        out.push_str(&format!(
            "{:<5} {:<24} {:>5} {:>8} {:>14}\n",
            "RANK", "LOGIN", "FIXES", "SEVERITY", "REWARD"
        ));
        for (rank, c) in board.contributors.iter().enumerate() {
            out.push_str(&format!(
                "{:<5} {:<24} {:>5} {:>8.2} {:>14}\n",
                rank + 1,
                c.login,
                c.fix_count,
                c.mean_severity,
                format!("{:.2} {}", c.reward_sum, board.currency)
            ));
        }
    }
    out.push_str(&format!(
        "\n{} issue(s) scored, {:.2} {} paid in total\n",
        board.issues_scored, board.total_rewards, board.currency
    ));
    if board.bounty_points > 0.0 {
        out.push_str(&format!(
            "{:.2} legacy bounty point(s) credited\n",
            board.bounty_points
        ));
    }
    for skipped in &board.skipped {
        out.push_str(&format!("skipped #{}: {}\n", skipped.number, skipped.reason));
    }
    for failed in &board.failed_repositories {
        out.push_str(&format!("failed {}: {}\n", failed.repository, failed.error));
    }
    out
}

fn summarize(outcome: &KindOutcome) -> String {
    let mut parts: Vec<String> = outcome
        .actions
        .iter()
        .map(|a| format!("{} #{}", a.name(), a.comment_id()))
        .collect();
    parts.extend(outcome.errors.iter().map(|e| format!("error: {e}")));
    if parts.is_empty() {
        "unchanged".to_string()
    } else {
        parts.join(", ")
    }
}

fn render_issue(issue: &IssueReconciliation) -> String {
    format!(
        "{}#{:<6} eligible: {:<30} reward: {}\n",
        issue.repository,
        issue.number,
        summarize(&issue.eligible),
        summarize(&issue.reward)
    )
}

fn render_repository(report: &RepositoryReconciliation) -> String {
    let mut out: String = report.issues.iter().map(render_issue).collect();
    for failure in &report.failures {
        out.push_str(&format!(
            "{}#{:<6} failed: {}\n",
            report.repository, failure.number, failure.error
        ));
    }
    out.push_str(&format!(
        "\n{} issue(s), {} write(s), {} error(s)\n",
        report.issues.len(),
        report.action_count(),
        report.error_count()
    ));
    out
}

fn render_webhook(outcome: &WebhookOutcome) -> String {
    match outcome {
        WebhookOutcome::Reconciled(issue) => render_issue(issue),
        WebhookOutcome::Ignored { reason } => format!("ignored: {reason}\n"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bountyboard_core::reconcile::CommentAction;
    use bountyboard_core::{CommentKind, Contributor, User};
    use chrono::Utc;
    use std::io::Write;

    #[test]
    fn test_parses_repeated_repos() {
        let cli = Cli::try_parse_from([
            "bountyboard",
            "blue-team",
            "--repo",
            "acme/web",
            "-r",
            "acme/api",
            "--format",
            "json",
        ])
        .unwrap();
        match cli.command {
            Commands::BlueTeam(args) => {
                assert_eq!(
                    args.repos,
                    vec![RepoRef::new("acme", "web"), RepoRef::new("acme", "api")]
                );
                assert_eq!(args.format, OutputFormat::Json);
            }
            _ => panic!("expected blue-team"),
        }
    }

    #[test]
    fn test_rejects_malformed_repo() {
        assert!(Cli::try_parse_from(["bountyboard", "contributors", "--repo", "acme"]).is_err());
        assert!(Cli::try_parse_from(["bountyboard", "red-team"]).is_err());
    }

    #[test]
    fn test_update_comments_args() {
        let cli = Cli::try_parse_from([
            "bountyboard",
            "--verbose",
            "update-comments",
            "--repo",
            "acme/web",
            "--issue",
            "12",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::UpdateComments { repo, issue, format } => {
                assert_eq!(repo.to_string(), "acme/web");
                assert_eq!(issue, Some(12));
                assert_eq!(format, OutputFormat::Table);
            }
            _ => panic!("expected update-comments"),
        }
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[reward]\ncurrency = \"EUR\"").unwrap();
        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.reward.currency, "EUR");
    }

    #[test]
    fn test_load_config_reports_bad_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[reward\n").unwrap();
        let err = load_config(Some(file.path())).unwrap_err();
        assert!(err.to_string().contains("Failed to load config"));
    }

    #[test]
    fn test_signature_policy() {
        let body = br#"{"action":"closed"}"#;
        let signature = bountyboard_github::sign(b"s3cret", body).unwrap();
        assert!(check_signature(Some("s3cret"), body, Some(&signature)).is_ok());
        assert!(check_signature(Some("other"), body, Some(&signature)).is_err());
        assert!(check_signature(Some("s3cret"), body, None).is_err());
        assert!(check_signature(None, body, Some(&signature)).is_err());
        assert!(check_signature(None, body, None).is_ok());
    }

    #[test]
    fn test_leaderboard_table() {
        let mut board = Leaderboard::empty("USD", Utc::now());
        let mut alice = Contributor::new(&User::named("alice"));
        alice.fix_count = 2;
        alice.reward_sum = 1462.5;
        board.contributors.push(alice);
        board.issues_scored = 2;
        board.total_rewards = 1462.5;

        let table = render_leaderboard(&board);
        assert!(table.starts_with("RANK"));
        assert!(table.contains("alice"));
        assert!(table.contains("1462.50 USD"));
        assert!(table.contains("2 issue(s) scored"));
    }

    #[test]
    fn test_reconciliation_summary() {
        let mut issue = IssueReconciliation::new("acme/web".to_string(), 4);
        issue
            .outcome_mut(CommentKind::Reward)
            .actions
            .push(CommentAction::Created { comment_id: 81 });
        issue
            .outcome_mut(CommentKind::Eligible)
            .errors
            .push("rate limited".to_string());

        let line = render_issue(&issue);
        assert!(line.starts_with("acme/web#4"));
        assert!(line.contains("error: rate limited"));
        assert!(line.contains("created #81"));
    }
}
