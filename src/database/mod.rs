// src/database/mod.rs
//! SQLite persistence for users, profiles, scraped jobs and refresh sessions

mod jobs;
mod profile_jobs;
mod profiles;
mod refresh_status;

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

pub use jobs::JobRepository;
pub use profile_jobs::ProfileJobRepository;
pub use profiles::{ProfileRepository, UserRepository};
pub use refresh_status::RefreshStatusRepository;

// ===== Core Database Connection Management =====

#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if needed) the database file and run migrations
    pub async fn new(database_path: &Path) -> Result<Self> {
        if let Some(parent) = database_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.with_context(|| {
                    format!("Failed to create database directory: {}", parent.display())
                })?;
            }
        }

        let database_url = format!("sqlite:{}?mode=rwc", database_path.display());
        let db = Self::connect(&database_url).await?;

        info!("Database connection established: {}", database_path.display());
        Ok(db)
    }

    /// Connect by URL. In-memory databases are pinned to one connection so
    /// every query sees the same data.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("Invalid database URL: {}", database_url))?
            .foreign_keys(true);

        let pool_options = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to connect to database: {}", database_url))?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn jobs(&self) -> JobRepository<'_> {
        JobRepository::new(&self.pool)
    }

    pub fn profiles(&self) -> ProfileRepository<'_> {
        ProfileRepository::new(&self.pool)
    }

    pub fn users(&self) -> UserRepository<'_> {
        UserRepository::new(&self.pool)
    }

    pub fn profile_jobs(&self) -> ProfileJobRepository<'_> {
        ProfileJobRepository::new(&self.pool)
    }

    pub fn refresh_status(&self) -> RefreshStatusRepository<'_> {
        RefreshStatusRepository::new(&self.pool)
    }

    async fn migrate(&self) -> Result<()> {
        for &statement in MIGRATIONS {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .context("Failed to run database migration")?;
        }

        info!("Database migrations completed");
        Ok(())
    }

    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("Database health check failed")?;
        Ok(())
    }
}

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        updated_at TEXT NOT NULL DEFAULT (datetime('now'))
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS profiles (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        name TEXT NOT NULL,
        keywords TEXT NOT NULL DEFAULT '[]',
        location TEXT,
        additional_context TEXT,
        resume TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        updated_at TEXT NOT NULL DEFAULT (datetime('now'))
    );
    "#,
    "CREATE INDEX IF NOT EXISTS idx_profiles_name ON profiles(name);",
    r#"
    CREATE TABLE IF NOT EXISTS jobs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        source_id TEXT NOT NULL,
        source_job_id TEXT NOT NULL,
        link TEXT NOT NULL,
        company TEXT NOT NULL,
        position TEXT NOT NULL,
        location TEXT NOT NULL,
        date_posted TEXT NOT NULL,
        description TEXT NOT NULL,
        hash TEXT NOT NULL,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        updated_at TEXT NOT NULL DEFAULT (datetime('now')),
        UNIQUE (source_id, source_job_id)
    );
    "#,
    "CREATE INDEX IF NOT EXISTS idx_jobs_hash ON jobs(hash);",
    r#"
    CREATE TABLE IF NOT EXISTS profile_jobs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        profile_id INTEGER NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
        job_id INTEGER NOT NULL REFERENCES jobs(id) ON DELETE CASCADE,
        job_hash TEXT NOT NULL,
        score TEXT CHECK (score IN ('LOW', 'MEDIUM', 'HIGH', 'TOP')),
        explanation TEXT,
        first_skill_match TEXT,
        second_skill_match TEXT,
        third_skill_match TEXT,
        summary TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        updated_at TEXT NOT NULL DEFAULT (datetime('now')),
        UNIQUE (profile_id, job_id)
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS refresh_status (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        profile_id INTEGER NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
        status TEXT NOT NULL,
        step TEXT NOT NULL,
        description TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        updated_at TEXT NOT NULL DEFAULT (datetime('now'))
    );
    "#,
    "CREATE INDEX IF NOT EXISTS idx_refresh_status_profile ON refresh_status(profile_id);",
];
