#[allow(clippy::module_inception)]
pub mod parser;
pub mod program;

pub use parser::{Line, ParseError, ParseErrorKind, Parser, Position};
pub use program::Program;
