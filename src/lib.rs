pub mod api;
mod client;
pub mod config;
pub mod dispatch;
pub mod errors;
pub mod refresh;
pub mod session;
pub mod telemetry;
pub mod token;
pub mod types;

pub use client::ApiClient;
pub use config::ClientConfig;
pub use dispatch::{Call, Dispatcher};
pub use errors::{Error, RefreshFailure};
pub use session::{SessionManager, StoreSession};
pub use token::{Credential, CredentialStore, MemoryCredentialStore};
