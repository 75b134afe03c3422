use crate::ledger::Ledger;
use crate::storage::LocalStorage;
use std::{path::PathBuf, sync::Arc};
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct AppState {
    pub data_path: PathBuf,
    pub ledger: Arc<Mutex<Ledger<LocalStorage>>>,
}

impl AppState {
    pub fn new(data_path: PathBuf, store: LocalStorage) -> Self {
        Self {
            data_path,
            ledger: Arc::new(Mutex::new(Ledger::load(store))),
        }
    }
}
