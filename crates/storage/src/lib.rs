pub mod dto;
pub mod error;
pub mod gateway;
pub mod models;
pub mod services;

pub use error::{Result, StorageError};
pub use gateway::{Database, Gateway, GatewayTx, MemoryGateway, PgGateway, StoreOps};
