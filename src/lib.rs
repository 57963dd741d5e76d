pub mod cli;
pub mod compiler;
pub mod error;
pub mod mapper;
pub mod parser;
pub mod schema;
pub mod writer;

pub use cli::{Cli, Commands};
pub use compiler::{compile, compile_file, CompileOptions, CompiledUnit, Compiler};
pub use error::{CompileError, Diagnostic};
