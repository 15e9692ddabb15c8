use crate::ir::{ArgKind, Cell, OpCode};
use std::error::Error;
use std::fmt::Display;
use std::io;
use std::num::ParseIntError;
use std::str::Utf8Error;

/// 1-based location of a token in the source text
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug)]
pub enum ParseErrorKind {
    InvalidInstruction(String, Position),
    InvalidInteger(String, Position, ParseIntError),
    EndOfProgram(OpCode, ArgKind),
    Io(io::Error),
    FileOpen(io::Error),
    MemoryMap(io::Error),
    InvalidEncoding(Utf8Error),
}

impl ParseErrorKind {
    pub(crate) fn throw<T>(self) -> Result<T, ParseError> {
        let msg = match &self {
            ParseErrorKind::InvalidInstruction(token, pos) => {
                format!("invalid instruction {} at {}", token, pos)
            }
            ParseErrorKind::InvalidInteger(token, pos, err) => {
                format!("invalid integer argument {} at {}: {}", token, pos, err)
            }
            ParseErrorKind::EndOfProgram(op, kind) => format!(
                "end of program while reading {} argument of {}",
                kind, op
            ),
            ParseErrorKind::Io(err) => format!("unable to read program, details: {}", err),
            ParseErrorKind::FileOpen(err) => {
                format!("unable to open program file, details: {}", err)
            }
            ParseErrorKind::MemoryMap(err) => {
                format!("failed to memory map program file, details: {}", err)
            }
            ParseErrorKind::InvalidEncoding(err) => {
                format!("program file is not valid utf-8, details: {}", err)
            }
        };
        Err(ParseError { msg, kind: self })
    }
}

impl Display for ParseErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug)]
pub struct ParseError {
    pub(crate) msg: String,
    pub(crate) kind: ParseErrorKind,
}

impl ParseError {
    pub fn kind(&self) -> &ParseErrorKind {
        &self.kind
    }

    pub fn msg(&self) -> &str {
        &self.msg
    }
}

impl Error for ParseError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.kind {
            ParseErrorKind::InvalidInteger(_, _, err) => Some(err),
            ParseErrorKind::Io(err)
            | ParseErrorKind::FileOpen(err)
            | ParseErrorKind::MemoryMap(err) => Some(err),
            ParseErrorKind::InvalidEncoding(err) => Some(err),
            _ => None,
        }
    }
}

impl Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.msg)
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub(crate) struct Token<'s> {
    pub(crate) text: &'s str,
    pub(crate) pos: Position,
}

/// Splits source text on whitespace, tracking where each token starts
#[derive(Debug)]
pub(crate) struct Tokens<'s> {
    source: &'s str,
    index: usize,
    line: usize,
    column: usize,
}

impl<'s> Tokens<'s> {
    pub(crate) fn new(source: &'s str) -> Tokens<'s> {
        Tokens {
            source,
            index: 0,
            line: 1,
            column: 1,
        }
    }

    fn advance(&mut self, skipped: &str) {
        for c in skipped.chars() {
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
    }
}

impl<'s> Iterator for Tokens<'s> {
    type Item = Token<'s>;

    fn next(&mut self) -> Option<Self::Item> {
        let rest = &self.source[self.index..];
        let start = rest.find(|c: char| !c.is_whitespace())?;
        self.advance(&rest[..start]);

        let rest = &rest[start..];
        let len = rest.find(char::is_whitespace).unwrap_or(rest.len());
        let token = Token {
            text: &rest[..len],
            pos: Position {
                line: self.line,
                column: self.column,
            },
        };
        self.advance(token.text);
        self.index += start + len;

        Some(token)
    }
}

/// One source line: a mnemonic and the argument cells that follow it
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Line {
    pub op: OpCode,
    pub args: Vec<Cell>,
    pub pos: Position,
}

/// The component responsible for turning source text into lines of instructions
#[derive(Debug)]
pub struct Parser<'s> {
    tokens: Tokens<'s>,
    failed: bool,
}

impl<'s> Parser<'s> {
    pub fn new(source: &'s str) -> Parser<'s> {
        Parser {
            tokens: Tokens::new(source),
            failed: false,
        }
    }

    fn arg(&mut self, op: OpCode, kind: ArgKind) -> Result<Cell, ParseError> {
        let token = match self.tokens.next() {
            Some(token) => token,
            None => return ParseErrorKind::EndOfProgram(op, kind).throw(),
        };
        match kind {
            ArgKind::Int => match token.text.parse::<i64>() {
                Ok(val) => Ok(Cell::Int(val)),
                Err(err) => {
                    ParseErrorKind::InvalidInteger(token.text.to_string(), token.pos, err).throw()
                }
            },
            ArgKind::Text => Ok(Cell::Text(token.text.into())),
        }
    }

    fn instruction(&mut self) -> Option<Result<Line, ParseError>> {
        let token = self.tokens.next()?;
        let op = match OpCode::from_mnemonic(token.text) {
            Some(op) => op,
            None => {
                return Some(
                    ParseErrorKind::InvalidInstruction(token.text.to_string(), token.pos).throw(),
                )
            }
        };

        let mut args = Vec::with_capacity(op.args().len());
        for kind in op.args() {
            match self.arg(op, *kind) {
                Ok(cell) => args.push(cell),
                Err(err) => return Some(Err(err)),
            }
        }

        Some(Ok(Line {
            op,
            args,
            pos: token.pos,
        }))
    }
}

impl<'s> Iterator for Parser<'s> {
    type Item = Result<Line, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let line = self.instruction();
        if let Some(Err(_)) = line {
            self.failed = true;
        }
        line
    }
}

#[cfg(test)]
mod tests {
    use super::{Line, ParseError, ParseErrorKind, Parser, Position, Tokens};
    use crate::ir::{ArgKind, Cell, OpCode};

    fn pos(line: usize, column: usize) -> Position {
        Position { line, column }
    }

    #[test]
    fn tokenize_tracks_positions() {
        let tokens = Tokens::new("ipush 1\n\n  spush\thi  \r\n")
            .map(|t| (t.text, t.pos))
            .collect::<Vec<_>>();
        assert_eq!(
            tokens,
            vec![
                ("ipush", pos(1, 1)),
                ("1", pos(1, 7)),
                ("spush", pos(3, 3)),
                ("hi", pos(3, 9)),
            ]
        );
    }

    #[test]
    fn tokenize_empty() {
        assert_eq!(Tokens::new("").next(), None);
        assert_eq!(Tokens::new(" \n\t ").next(), None);
    }

    #[test]
    fn parse_lines() -> Result<(), ParseError> {
        let lines = Parser::new("ipush -4 spush hi\njumpl 10 2 putln")
            .collect::<Result<Vec<_>, _>>()?;
        assert_eq!(
            lines,
            vec![
                Line {
                    op: OpCode::IntPush,
                    args: vec![Cell::Int(-4)],
                    pos: pos(1, 1),
                },
                Line {
                    op: OpCode::StringPush,
                    args: vec![Cell::Text("hi".into())],
                    pos: pos(1, 10),
                },
                Line {
                    op: OpCode::JumpLessThan,
                    args: vec![Cell::Int(10), Cell::Int(2)],
                    pos: pos(2, 1),
                },
                Line {
                    op: OpCode::Putln,
                    args: vec![],
                    pos: pos(2, 12),
                },
            ]
        );

        Ok(())
    }

    #[test]
    fn mnemonic_like_text_argument() -> Result<(), ParseError> {
        let lines = Parser::new("spush putln").collect::<Result<Vec<_>, _>>()?;
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].args, vec![Cell::Text("putln".into())]);

        Ok(())
    }

    #[test]
    fn invalid_instruction() {
        let mut parser = Parser::new("ipush 1\n  pop");
        assert!(matches!(parser.next(), Some(Ok(_))));
        let err = parser.next().unwrap().unwrap_err();
        match err.kind() {
            ParseErrorKind::InvalidInstruction(token, at) => {
                assert_eq!(token, "pop");
                assert_eq!(*at, pos(2, 3));
            }
            kind => panic!("unexpected error kind {:?}", kind),
        }
        assert!(err.to_string().contains("invalid instruction pop"));
        assert!(parser.next().is_none());
    }

    #[test]
    fn invalid_integer() {
        let err = Parser::new("ipush 12x").next().unwrap().unwrap_err();
        assert!(matches!(
            err.kind(),
            ParseErrorKind::InvalidInteger(token, _, _) if token == "12x"
        ));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn integer_out_of_range() {
        let err = Parser::new("ipush 9223372036854775808")
            .next()
            .unwrap()
            .unwrap_err();
        assert!(matches!(err.kind(), ParseErrorKind::InvalidInteger(..)));
    }

    #[test]
    fn truncated_arguments() {
        let err = Parser::new("jumpl 10").next().unwrap().unwrap_err();
        assert!(matches!(
            err.kind(),
            ParseErrorKind::EndOfProgram(OpCode::JumpLessThan, ArgKind::Int)
        ));

        let err = Parser::new("spush").next().unwrap().unwrap_err();
        assert!(matches!(
            err.kind(),
            ParseErrorKind::EndOfProgram(OpCode::StringPush, ArgKind::Text)
        ));
    }
}
