use crate::ir::{Cell, OpCode};
use crate::parser::parser::{ParseError, ParseErrorKind, Parser};
use memmap::Mmap;
use std::fmt::Display;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

/// A parsed program: the flat cell sequence and the jump table indexing into it.
///
/// `jump_table[k]` is the offset of the opcode cell of source line `k + 1`. Programs are
/// immutable once parsed and may be shared between any number of virtual machines.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct Program {
    pub(crate) cells: Vec<Cell>,
    pub(crate) jump_table: Vec<usize>,
}

impl Program {
    /// Parses a program from source text
    pub fn parse(source: &str) -> Result<Program, ParseError> {
        let mut cells = Vec::with_capacity(64);
        let mut jump_table = vec![];

        for line in Parser::new(source) {
            let line = line?;
            jump_table.push(cells.len());
            cells.push(Cell::Op(line.op));
            cells.extend(line.args);
        }
        debug!(lines = jump_table.len(), cells = cells.len(), "parsed program");

        Ok(Program { cells, jump_table })
    }

    /// Reads the whole stream and parses it
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Program, ParseError> {
        let mut source = String::new();
        if let Err(err) = reader.read_to_string(&mut source) {
            return ParseErrorKind::Io(err).throw();
        }
        Program::parse(&source)
    }

    /// Memory maps the file at `path` and parses it. The mapping is released before returning.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Program, ParseError> {
        let file = match File::open(path.as_ref()) {
            Ok(content) => content,
            Err(err) => return ParseErrorKind::FileOpen(err).throw(),
        };
        let len = match file.metadata() {
            Ok(meta) => meta.len(),
            Err(err) => return ParseErrorKind::FileOpen(err).throw(),
        };
        // zero-length files cannot be mapped
        if len == 0 {
            return Program::parse("");
        }
        let source = unsafe {
            match Mmap::map(&file) {
                Ok(content) => content,
                Err(err) => return ParseErrorKind::MemoryMap(err).throw(),
            }
        };
        match std::str::from_utf8(&source) {
            Ok(text) => Program::parse(text),
            Err(err) => ParseErrorKind::InvalidEncoding(err).throw(),
        }
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn jump_table(&self) -> &[usize] {
        &self.jump_table
    }

    /// Number of parsed source lines
    pub fn lines(&self) -> usize {
        self.jump_table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Returns the opcode at `offset`, if that cell holds one
    pub fn op_at(&self, offset: usize) -> Option<OpCode> {
        match self.cells.get(offset) {
            Some(Cell::Op(op)) => Some(*op),
            _ => None,
        }
    }
}

impl FromStr for Program {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Program::parse(s)
    }
}

impl Display for Program {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (index, start) in self.jump_table.iter().enumerate() {
            let end = self
                .jump_table
                .get(index + 1)
                .copied()
                .unwrap_or(self.cells.len());
            write!(f, "{:>4} {:>6}", index + 1, start)?;
            for cell in &self.cells[*start..end] {
                match cell {
                    Cell::Op(op) => write!(f, "  {:<6}", op)?,
                    Cell::Int(val) => write!(f, " {}", val)?,
                    Cell::Text(val) => write!(f, " {:?}", val)?,
                }
            }
            writeln!(f)?;
        }

        Ok(())
    }
}
