pub mod attempt_gateway;
pub mod http_helpers;

pub use attempt_gateway::{HttpAttemptGateway, RemoteAttemptGateway};
