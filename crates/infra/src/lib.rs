//! Infrastructure layer: event log, command gateway, read models, projector.

pub mod cart_service;
pub mod config;
pub mod event_log;
pub mod gateway;
pub mod projections;
pub mod read_model;
pub mod retry;
pub mod schema;
pub mod workers;


pub use cart_service::{CartService, OpenedCart, UpdatedCart};
pub use config::{ConfigError, ProjectorConfig};
pub use gateway::{CommandGateway, GatewayError};
pub use retry::RetryPolicy;
