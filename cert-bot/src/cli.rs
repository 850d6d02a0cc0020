//! `cert-bot` command line: webhook server, report jobs and roster management.

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::runner::{self, JobContext};

/// First line of the `participants` draft.
pub const PARTICIPANTS_DRAFT_HEADER: &str = "# Telegram 관리자 + cert_events 일반 멤버 기준 사용자 목록 초안";

#[derive(Parser)]
#[command(name = "cert-bot")]
#[command(about = "Photo-cert bot: webhook server, weekly reports, roster management", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Log file (overrides LOG_FILE).
    #[arg(long, global = true)]
    pub log_file: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the Telegram webhook server.
    Serve,
    /// Send the current-week ranking to the group chat.
    DailyStatus,
    /// Send last week's fine settlement to the group chat.
    WeeklySettlement,
    /// Manage the user roster.
    User {
        #[command(subcommand)]
        command: UserCommands,
    },
    /// Print a PARTICIPANTS draft from chat administrators and recent cert authors.
    Participants,
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// Add or update a user as an active member.
    Add {
        #[arg(long)]
        id: String,
        #[arg(long)]
        name: String,
    },
    /// Mark a user inactive.
    Remove {
        #[arg(long)]
        id: String,
    },
    /// Mark a user active again.
    Reactivate {
        #[arg(long)]
        id: String,
    },
    /// Refresh a user from their live chat membership.
    Sync {
        #[arg(long)]
        id: String,
    },
}

pub async fn run(cli: Cli) -> Result<()> {
    let base = runner::init(cli.log_file.as_deref())?;
    let jobs = || JobContext::load(&base);

    match cli.command {
        Commands::Serve => runner::run_webhook(&base).await?,
        Commands::DailyStatus => {
            jobs()?.daily_status().await?;
        }
        Commands::WeeklySettlement => {
            jobs()?.weekly_settlement().await?;
        }
        Commands::User { command } => match command {
            UserCommands::Add { id, name } => {
                jobs()?.user_add(&id, &name).await?;
                println!("Added/updated user: {}:{}", id, name);
            }
            UserCommands::Remove { id } => {
                jobs()?.user_remove(&id).await?;
                println!("Marked user inactive: {}", id);
            }
            UserCommands::Reactivate { id } => {
                jobs()?.user_reactivate(&id).await?;
                println!("Marked user active: {}", id);
            }
            UserCommands::Sync { id } => {
                let (name, status, active) = jobs()?.user_sync(&id).await?;
                println!("Synced user: {}:{} status={} active={}", id, name, status, active);
            }
        },
        Commands::Participants => {
            let draft = jobs()?.participants().await?;
            println!("{}", PARTICIPANTS_DRAFT_HEADER);
            println!("{}", draft);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_user_add() {
        let cli = Cli::try_parse_from(["cert-bot", "user", "add", "--id", "42", "--name", "Ann"]).unwrap();
        match cli.command {
            Commands::User {
                command: UserCommands::Add { id, name },
            } => {
                assert_eq!(id, "42");
                assert_eq!(name, "Ann");
            }
            _ => panic!("expected user add"),
        }
    }

    #[test]
    fn test_parse_jobs_and_global_log_file() {
        let cli = Cli::try_parse_from(["cert-bot", "daily-status", "--log-file", "logs/job.log"]).unwrap();
        assert!(matches!(cli.command, Commands::DailyStatus));
        assert_eq!(cli.log_file.as_deref(), Some("logs/job.log"));

        assert!(matches!(
            Cli::try_parse_from(["cert-bot", "weekly-settlement"]).unwrap().command,
            Commands::WeeklySettlement
        ));
        assert!(Cli::try_parse_from(["cert-bot", "user", "remove"]).is_err());
    }

    #[test]
    fn test_participants_draft_header() {
        assert_eq!(
            PARTICIPANTS_DRAFT_HEADER,
            "# Telegram 관리자 + cert_events 일반 멤버 기준 사용자 목록 초안"
        );
        assert!(matches!(
            Cli::try_parse_from(["cert-bot", "participants"]).unwrap().command,
            Commands::Participants
        ));
    }
}
