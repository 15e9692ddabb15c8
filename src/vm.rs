use crate::ir::{ArgKind, Cell, OpCode};
use crate::parser::Program;
use std::error::Error;
use std::fmt::{Arguments, Display};
use std::io::{self, stdout, Stdout, Write};
use std::sync::Arc;
use tracing::{debug, trace};

/// A value on the operand stack
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Value {
    Int(i64),
    Text(Arc<str>),
}

impl Value {
    pub fn kind(&self) -> ArgKind {
        match self {
            Value::Int(_) => ArgKind::Int,
            Value::Text(_) => ArgKind::Text,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Int(val) => write!(f, "{}", val),
            Value::Text(val) => write!(f, "{}", val),
        }
    }
}

/// Outcome of a single successful [`Vm::step`]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Status {
    /// An instruction was executed
    Running,
    /// The instruction pointer reached the end of the program, nothing was executed
    Halted,
}

/// Configuration options for the virtual machine
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub struct VmConfig {
    /// emit a `tracing` event for every executed instruction
    pub debug: bool,
    /// evaluate `put` and `putln` without writing anything
    pub suppress_output: bool,
}

impl VmConfig {
    pub fn new(debug: bool, suppress_output: bool) -> VmConfig {
        VmConfig {
            debug,
            suppress_output,
        }
    }

    /// Returns a configuration that traces every executed instruction
    pub fn debug() -> VmConfig {
        VmConfig {
            debug: true,
            suppress_output: false,
        }
    }

    /// Returns a configuration that discards all program output
    pub fn suppressed() -> VmConfig {
        VmConfig {
            debug: false,
            suppress_output: true,
        }
    }
}

#[derive(Debug)]
pub enum VmErrorKind {
    StackUnderflow(OpCode, usize, usize),
    TypeMismatch(OpCode, ArgKind, ArgKind),
    InvalidJumpTarget(OpCode, i64, usize),
    InvalidCell(usize, Cell),
    TruncatedInstruction(OpCode, ArgKind),
    IOError(OpCode, io::Error),
}

impl Display for VmErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl VmErrorKind {
    fn throw<T>(self) -> Result<T, VmError> {
        let msg = match &self {
            VmErrorKind::StackUnderflow(op, needed, found) => format!(
                "stack underflow executing {}: needs {} value(s), stack holds {}",
                op, needed, found
            ),
            VmErrorKind::TypeMismatch(op, expected, found) => format!(
                "type mismatch executing {}: expected {} but got {}",
                op, expected, found
            ),
            VmErrorKind::InvalidJumpTarget(op, line, lines) => format!(
                "invalid jump target executing {}: line {} is not in 1..={}",
                op, line, lines
            ),
            VmErrorKind::InvalidCell(offset, cell) => format!(
                "invalid program, expected an op code at offset {} but found {:?}",
                offset, cell
            ),
            VmErrorKind::TruncatedInstruction(op, kind) => format!(
                "invalid program, {} is missing its {} argument",
                op, kind
            ),
            VmErrorKind::IOError(op, err) => {
                format!("failed writing output executing {}, details: {}", op, err)
            }
        };
        Err(VmError { msg, kind: self })
    }
}

#[derive(Debug)]
pub struct VmError {
    msg: String,
    kind: VmErrorKind,
}

impl VmError {
    pub fn kind(&self) -> &VmErrorKind {
        &self.kind
    }

    pub fn msg(&self) -> &str {
        &self.msg
    }
}

impl Error for VmError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.kind {
            VmErrorKind::IOError(_, err) => Some(err),
            _ => None,
        }
    }
}

impl Display for VmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.msg)
    }
}

/// The root component for the virtual machine.
///
/// Executes a borrowed [`Program`] against its own operand stack, writing everything the
/// program prints to `out`.
pub struct Vm<'p, W: Write = Stdout> {
    program: &'p Program,
    config: VmConfig,
    out: W,
    stack: Vec<Value>,
    instruction_pointer: usize,
}

impl<'p> Vm<'p, Stdout> {
    /// Creates a new virtual machine printing to standard output
    pub fn new(program: &'p Program, config: VmConfig) -> Vm<'p, Stdout> {
        Vm::with_output(program, config, stdout())
    }
}

impl<'p, W: Write> Vm<'p, W> {
    /// Creates a new virtual machine printing to `out`
    pub fn with_output(program: &'p Program, config: VmConfig, out: W) -> Vm<'p, W> {
        Vm {
            program,
            config,
            out,
            stack: Vec::with_capacity(64),
            instruction_pointer: 0,
        }
    }

    /// Executes instructions until the program runs off its end or fails
    pub fn run(&mut self) -> Result<(), VmError> {
        while self.step()? == Status::Running {}

        Ok(())
    }

    /// Executes a single instruction.
    ///
    /// Returns [`Status::Halted`] once the instruction pointer has reached the end of the
    /// program, and keeps returning it on every later call.
    pub fn step(&mut self) -> Result<Status, VmError> {
        let offset = self.instruction_pointer;
        let op = match self.next_cell() {
            None => return Ok(Status::Halted),
            Some(Cell::Op(op)) => *op,
            Some(cell) => return VmErrorKind::InvalidCell(offset, cell.clone()).throw(),
        };
        self.exec(offset, op)?;
        if self.config.debug {
            trace!(target: "crust::vm", stack = ?self.stack);
        }

        Ok(Status::Running)
    }

    /// Resets the machine to its initial state without re-parsing the program
    pub fn reset(&mut self) {
        self.stack.clear();
        self.instruction_pointer = 0;
    }

    pub fn stack(&self) -> &[Value] {
        &self.stack
    }

    pub fn instruction_pointer(&self) -> usize {
        self.instruction_pointer
    }

    pub fn program(&self) -> &'p Program {
        self.program
    }

    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn into_output(self) -> W {
        self.out
    }

    fn exec(&mut self, offset: usize, op: OpCode) -> Result<(), VmError> {
        match op {
            OpCode::Putln => {
                self.write(op, "\n")?;
                self.log(offset, op, format_args!("putln"));
            }
            OpCode::Dup => {
                let val = match self.stack.last() {
                    Some(val) => val.clone(),
                    None => return VmErrorKind::StackUnderflow(op, 1, 0).throw(),
                };
                self.log(offset, op, format_args!("dup {}", val));
                self.stack.push(val);
            }
            OpCode::Put => {
                let val = match self.stack.pop() {
                    Some(val) => val,
                    None => return VmErrorKind::StackUnderflow(op, 1, 0).throw(),
                };
                self.write(op, &val)?;
                self.log(offset, op, format_args!("put {}", val));
            }
            OpCode::Jump => {
                let line = self.next_int(op)?;
                self.instruction_pointer = self.jump_target(op, line)?;
                self.log(
                    offset,
                    op,
                    format_args!("jump {} => {}", line, self.instruction_pointer),
                );
            }
            OpCode::JumpLessThan => {
                let val = self.next_int(op)?;
                let line = self.next_int(op)?;
                let target = self.jump_target(op, line)?;
                let top = self.pop_int(op)?;
                let jumped = top < val;
                if jumped {
                    self.instruction_pointer = target;
                }
                self.log(
                    offset,
                    op,
                    format_args!(
                        "jump {} < {} ? {} => {} jumped={}",
                        top, val, line, self.instruction_pointer, jumped
                    ),
                );
            }
            OpCode::IntPush => {
                let val = self.next_int(op)?;
                self.stack.push(Value::Int(val));
                self.log(offset, op, format_args!("ipush {}", val));
            }
            OpCode::IntAdd => {
                self.check_operands(op, ArgKind::Int)?;
                let right = self.pop_int(op)?;
                let left = self.pop_int(op)?;
                let val = left.wrapping_add(right);
                self.stack.push(Value::Int(val));
                self.log(
                    offset,
                    op,
                    format_args!("iadd {} + {} = {}", left, right, val),
                );
            }
            OpCode::IntSubtract => {
                self.check_operands(op, ArgKind::Int)?;
                let right = self.pop_int(op)?;
                let left = self.pop_int(op)?;
                let val = left.wrapping_sub(right);
                self.stack.push(Value::Int(val));
                self.log(
                    offset,
                    op,
                    format_args!("isub {} - {} = {}", left, right, val),
                );
            }
            OpCode::StringPush => {
                let val = self.next_text(op)?;
                self.log(offset, op, format_args!("spush {}", val));
                self.stack.push(Value::Text(val));
            }
            OpCode::StringAdd => {
                self.check_operands(op, ArgKind::Text)?;
                let right = self.pop_text(op)?;
                let left = self.pop_text(op)?;
                let mut val = String::with_capacity(left.len() + right.len());
                val.push_str(&left);
                val.push_str(&right);
                self.log(
                    offset,
                    op,
                    format_args!("sadd {} + {} = {}", left, right, val),
                );
                self.stack.push(Value::Text(val.into()));
            }
        }

        Ok(())
    }

    fn log(&self, offset: usize, op: OpCode, detail: Arguments<'_>) {
        if !self.config.debug {
            return;
        }
        debug!(target: "crust::vm", ip = offset, op = op.mnemonic(), "{}", detail);
    }

    fn write<T: Display>(&mut self, op: OpCode, val: T) -> Result<(), VmError> {
        if self.config.suppress_output {
            return Ok(());
        }
        let res = write!(self.out, "{}", val).and_then(|_| self.out.flush());
        match res {
            Ok(()) => Ok(()),
            Err(err) => VmErrorKind::IOError(op, err).throw(),
        }
    }

    fn next_cell(&mut self) -> Option<&'p Cell> {
        let program = self.program;
        let cell = program.cells.get(self.instruction_pointer)?;
        self.instruction_pointer += 1;

        Some(cell)
    }

    fn next_int(&mut self, op: OpCode) -> Result<i64, VmError> {
        let offset = self.instruction_pointer;
        match self.next_cell() {
            Some(Cell::Int(val)) => Ok(*val),
            Some(cell) => VmErrorKind::InvalidCell(offset, cell.clone()).throw(),
            None => VmErrorKind::TruncatedInstruction(op, ArgKind::Int).throw(),
        }
    }

    fn next_text(&mut self, op: OpCode) -> Result<Arc<str>, VmError> {
        let offset = self.instruction_pointer;
        match self.next_cell() {
            Some(Cell::Text(val)) => Ok(Arc::clone(val)),
            Some(cell) => VmErrorKind::InvalidCell(offset, cell.clone()).throw(),
            None => VmErrorKind::TruncatedInstruction(op, ArgKind::Text).throw(),
        }
    }

    /// Translates a 1-based line number into the offset of that line's op code
    fn jump_target(&self, op: OpCode, line: i64) -> Result<usize, VmError> {
        let table = &self.program.jump_table;
        let target = line
            .checked_sub(1)
            .and_then(|index| usize::try_from(index).ok())
            .and_then(|index| table.get(index));
        match target {
            Some(offset) => Ok(*offset),
            None => VmErrorKind::InvalidJumpTarget(op, line, table.len()).throw(),
        }
    }

    /// Fails unless the top two values are both of `kind`, leaving the stack untouched
    fn check_operands(&self, op: OpCode, kind: ArgKind) -> Result<(), VmError> {
        let len = self.stack.len();
        if len < 2 {
            return VmErrorKind::StackUnderflow(op, 2, len).throw();
        }
        for val in self.stack[len - 2..].iter().rev() {
            if val.kind() != kind {
                return VmErrorKind::TypeMismatch(op, kind, val.kind()).throw();
            }
        }

        Ok(())
    }

    fn pop_int(&mut self, op: OpCode) -> Result<i64, VmError> {
        let val = match self.stack.last() {
            Some(Value::Int(val)) => *val,
            Some(other) => return VmErrorKind::TypeMismatch(op, ArgKind::Int, other.kind()).throw(),
            None => return VmErrorKind::StackUnderflow(op, 1, 0).throw(),
        };
        self.stack.pop();

        Ok(val)
    }

    fn pop_text(&mut self, op: OpCode) -> Result<Arc<str>, VmError> {
        match self.stack.pop() {
            Some(Value::Text(val)) => Ok(val),
            Some(other) => {
                let found = other.kind();
                self.stack.push(other);
                VmErrorKind::TypeMismatch(op, ArgKind::Text, found).throw()
            }
            None => VmErrorKind::StackUnderflow(op, 1, 0).throw(),
        }
    }
}
