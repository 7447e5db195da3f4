pub mod chains;
pub mod community_id;
pub mod error;
pub mod merge;
pub mod parser;
pub mod validate;

pub use chains::ChainRegistry;
pub use community_id::ResolvedId;
pub use error::ServiceError;
pub use merge::merge;
pub use parser::community::{Census, CensusType, Community, ContractAddress, HubResults, TriState};
pub use validate::validate;
