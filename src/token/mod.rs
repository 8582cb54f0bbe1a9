mod credential;
mod store;

pub use credential::Credential;
pub use store::{CredentialStore, MemoryCredentialStore};
