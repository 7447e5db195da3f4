pub mod basic_db;
pub mod community_db;
pub mod document;
pub mod error;

pub use basic_db::{InnerDatabase, SafeDatabase};
pub use community_db::{CommunityDb, CommunityStore};
pub use error::DbError;
