pub mod app;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod ledger;
pub mod models;
pub mod persistence;
pub mod state;
pub mod storage;

pub use app::router;
pub use config::Config;
pub use ledger::Ledger;
pub use models::{Item, ItemKind};
pub use persistence::Persistence;
pub use state::AppState;
pub use storage::{load_data, KeyValueStore, LocalStorage};
