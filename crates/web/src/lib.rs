//! Web service: upload a song file, poll the job, download the deck.

pub mod config;
pub mod error;
pub mod files;
pub mod jobs;
pub mod routes;

pub use config::ServiceConfig;
pub use error::ApiError;
pub use jobs::{Job, JobRegistry, JobStatus};
pub use routes::{routes, AppState};
