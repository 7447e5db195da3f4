pub mod binding;
pub mod error;
pub mod evm;
pub mod gateway;
pub mod mapper;

pub use binding::{BindingError, Connector, HubBinding};
pub use error::ChainError;
pub use evm::EvmConnector;
pub use gateway::{CommunityContract, ContractGateway, GatewayParams};
