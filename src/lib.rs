//! crust, a minimal stack-based bytecode virtual machine.
//!
//! Source text is a stream of whitespace separated tokens. Every mnemonic and its arguments
//! form one line, and lines are the targets of `jump` and `jumpl`:
//!
//! ```
//! use crust::{Program, Vm, VmConfig};
//!
//! let program: Program = "ipush 5 ipush 3 isub put".parse().unwrap();
//! let mut vm = Vm::with_output(&program, VmConfig::default(), Vec::new());
//! vm.run().unwrap();
//! assert_eq!(vm.into_output(), b"2");
//! ```

pub mod ir;
pub mod parser;
pub mod vm;

pub use ir::{ArgKind, Cell, OpCode};
pub use parser::{ParseError, ParseErrorKind, Parser, Program};
pub use vm::{Status, Value, Vm, VmConfig, VmError, VmErrorKind};
