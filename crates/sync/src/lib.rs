pub mod engine;
pub mod error;
#[cfg(test)]
mod testing;

pub use engine::{EngineState, SyncConfig, SyncEngine, DEFAULT_DISCOVER_COOLDOWN, DEFAULT_SYNC_COOLDOWN};
pub use error::SyncError;
