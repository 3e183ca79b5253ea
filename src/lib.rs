//! Job board scraping with headless Chrome, persisted to SQLite and scored
//! against user profiles.

pub mod browser;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod events;
pub mod fetchers;
pub mod job_match;
pub mod models;
pub mod orchestrator;
pub mod refresh;
pub mod retry;
pub mod utils;
pub mod web;

pub use config::AppConfig;
pub use error::FetchError;
pub use events::{EventSink, FetchEvent};
pub use orchestrator::FetchOrchestrator;
pub use web::start_web_server;
