pub mod error;
pub mod http_gateway;

pub use error::GatewayError;
pub use http_gateway::HttpRemoteGateway;
