pub mod storage;
pub mod store;

pub use storage::{default_credentials_path, FileStorage, MemoryStorage, RefreshTokenStorage};
pub use store::CredentialStore;
