//! Credential lifecycle: storage, validation, refresh, and linking state.

pub mod credential_store;
pub mod executor;
pub mod linking;
pub mod oauth;
pub mod refresher;
pub mod validator;

pub use credential_store::{Credential, CredentialStore, KeyringStore, MemoryStore};
pub use executor::AuthExecutor;
pub use linking::{LinkingManager, LinkingState};
pub use oauth::OAuthFlow;
pub use refresher::CredentialRefresher;
pub use validator::{expiry_buffer, is_usable};
