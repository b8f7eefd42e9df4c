pub mod session;
pub mod session_controller;
pub mod token_manager;
pub mod token_store;

pub use session::{Role, Session};
pub use session_controller::SessionController;
pub use token_manager::TokenManager;
pub use token_store::{KeyringStore, MemoryStore, TokenStore};
