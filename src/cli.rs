// src/cli.rs
use crate::config::AppConfig;
use crate::database::Database;
use crate::events::{EventSink, FetchEvent};
use crate::models::NewProfile;
use crate::orchestrator::FetchOrchestrator;
use crate::utils::parse_keywords;
use crate::web::start_web_server;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "sixseven")]
#[command(about = "Scrape job boards and score listings against profiles")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Overrides the configured database file
    #[arg(long, global = true)]
    pub database_path: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the REST API (default)
    Serve,
    /// Run one fetch and print every job as a JSON line
    Fetch {
        /// Search keyword; repeat the flag or separate with commas
        #[arg(long = "keyword", short = 'k', required = true, num_args = 1..)]
        keywords: Vec<String>,
        /// LinkedIn geo id
        #[arg(long)]
        location: Option<String>,
    },
    /// Manage users
    #[command(subcommand)]
    User(UserCommand),
    /// Manage search profiles
    #[command(subcommand)]
    Profile(ProfileCommand),
}

#[derive(Subcommand)]
pub enum UserCommand {
    Add { name: String, email: String },
    List,
}

#[derive(Subcommand)]
pub enum ProfileCommand {
    Add {
        #[arg(long)]
        user_id: i64,
        #[arg(long)]
        name: String,
        /// Comma separated search keywords
        #[arg(long)]
        keywords: String,
        #[arg(long)]
        location: Option<String>,
        /// Plain-text resume passed to the job matcher
        #[arg(long)]
        resume: Option<PathBuf>,
    },
    List,
}

pub async fn run(cli: Cli, mut config: AppConfig) -> Result<()> {
    if let Some(path) = cli.database_path {
        config.environment.database_path = path;
    }

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => start_web_server(config).await,
        Command::Fetch { keywords, location } => {
            let keywords: Vec<String> = keywords.iter().flat_map(|k| parse_keywords(k)).collect();
            let location = location.unwrap_or_else(|| config.fetch.default_location.clone());
            fetch(&config, keywords, location).await
        }
        Command::User(command) => {
            let db = Database::new(&config.environment.database_path).await?;
            handle_user_command(&db, command).await
        }
        Command::Profile(command) => {
            let db = Database::new(&config.environment.database_path).await?;
            handle_profile_command(&db, command).await
        }
    }
}

async fn fetch(config: &AppConfig, keywords: Vec<String>, location: String) -> Result<()> {
    info!(?keywords, %location, "Fetching jobs");

    let (sink, mut events) = EventSink::channel(64);
    let orchestrator = FetchOrchestrator::from_config(&config.fetch);
    let run = async move { orchestrator.run_job_fetch(&keywords, &location, &sink).await };
    let print = async {
        let stdout = std::io::stdout();
        let mut outcome: Result<()> = Ok(());
        while let Some(event) = events.recv().await {
            match event {
                FetchEvent::BatchReady { jobs, .. } => {
                    for job in jobs {
                        writeln!(stdout.lock(), "{}", serde_json::to_string(&job)?)?;
                    }
                }
                FetchEvent::StatusUpdate(message) => info!("{}", message),
                FetchEvent::Completed { summary, .. } => info!("{}", summary),
                FetchEvent::Failed(message) => {
                    error!("{}", message);
                    outcome = Err(anyhow::anyhow!(message));
                }
            }
        }
        outcome
    };

    let ((), outcome) = tokio::join!(run, print);
    outcome
}

async fn handle_user_command(db: &Database, command: UserCommand) -> Result<()> {
    match command {
        UserCommand::Add { name, email } => {
            let user = db.users().create_user(&name, &email).await?;
            println!("Created user {} <{}> with id {}", user.name, user.email, user.id);
        }
        UserCommand::List => {
            for user in db.users().get_all_users().await? {
                println!("{:>4}  {}  <{}>", user.id, user.name, user.email);
            }
        }
    }
    Ok(())
}

async fn handle_profile_command(db: &Database, command: ProfileCommand) -> Result<()> {
    match command {
        ProfileCommand::Add {
            user_id,
            name,
            keywords,
            location,
            resume,
        } => {
            let resume = match resume {
                Some(path) => Some(
                    tokio::fs::read_to_string(&path)
                        .await
                        .with_context(|| format!("Failed to read resume: {}", path.display()))?,
                ),
                None => None,
            };

            let profile = db
                .profiles()
                .create_profile(&NewProfile {
                    user_id,
                    name,
                    keywords: parse_keywords(&keywords),
                    location,
                    additional_context: None,
                    resume,
                })
                .await?;
            println!("Created profile {} with id {}", profile.name, profile.id);
        }
        ProfileCommand::List => {
            for profile in db.profiles().get_all_profiles().await? {
                println!(
                    "{:>4}  {}  user={}  keywords={}  location={}",
                    profile.id,
                    profile.name,
                    profile.user_id,
                    profile.keywords.join(", "),
                    profile.location.as_deref().unwrap_or("-")
                );
            }
        }
    }
    Ok(())
}
