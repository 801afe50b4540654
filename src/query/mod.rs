pub mod compiler;
pub mod error;
pub mod literal;
pub mod mutation;
pub mod params;
pub mod types;

pub use compiler::{compile, CompiledQuery};
pub use error::CompileError;
pub use params::QueryParams;
pub use types::*;
