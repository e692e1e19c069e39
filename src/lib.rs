mod dispatch;
mod message;
mod transport;

pub use dispatch::Dispatcher;
pub use message::{Message, ValidationError};
pub use transport::{
	ConfigError, DeliveryResult, FailureReason, Transport, TransportType, DEFAULT_BINARY,
};
