//! Core compiler: decoding, intrinsic resolution, conditions, typed extraction.

pub mod compiler;
pub mod conditions;
pub mod decoder;
pub mod defaults;
pub mod error;
pub mod functions;
pub mod intrinsics;
pub mod node;
pub mod resources;
pub mod schema;
pub mod types;
pub mod walker;
pub mod warnings;

pub use compiler::compile_template;
pub use error::{CompileError, DecodeError};
pub use intrinsics::Parameters;
pub use types::ParseResult;
