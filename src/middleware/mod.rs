pub mod auth;
pub mod response;

pub use auth::{resolve_security, security_context_middleware, Claims};
pub use response::RawJson;
