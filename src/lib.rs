pub mod auth;
pub mod batch;
pub mod card;
pub mod config;
pub mod credentials;
pub mod error;
pub mod fetch;
pub mod logging;
pub mod spotify;
pub mod webhook;

pub use batch::{run, BatchOptions, RunCounters};
pub use config::Config;
pub use credentials::CredentialRecord;
pub use error::{ApiError, AuthError, FetchError};
