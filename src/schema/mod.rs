pub mod dependencies;
pub mod embedding;
pub mod infer;
pub mod naming;
pub mod resolver;
pub mod types;

pub use dependencies::*;
pub use embedding::*;
pub use infer::*;
pub use naming::*;
pub use resolver::*;
pub use types::*;
