use std::fmt::Display;
use std::sync::Arc;

/// The kind of an inline argument following an opcode
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ArgKind {
    Int,
    Text,
}

impl Display for ArgKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArgKind::Int => write!(f, "int"),
            ArgKind::Text => write!(f, "string"),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
#[repr(u8)]
pub enum OpCode {
    Putln = 1,
    Dup = 2,
    Put = 3,
    Jump = 4,
    JumpLessThan = 5,
    IntPush = 11,
    IntAdd = 12,
    IntSubtract = 14,
    StringPush = 21,
    StringAdd = 22,
}

const NO_ARGS: &[ArgKind] = &[];
const INT_ARG: &[ArgKind] = &[ArgKind::Int];
const INT_INT_ARGS: &[ArgKind] = &[ArgKind::Int, ArgKind::Int];
const TEXT_ARG: &[ArgKind] = &[ArgKind::Text];

impl OpCode {
    pub const ALL: [OpCode; 10] = [
        OpCode::Putln,
        OpCode::Dup,
        OpCode::Put,
        OpCode::Jump,
        OpCode::JumpLessThan,
        OpCode::IntPush,
        OpCode::IntAdd,
        OpCode::IntSubtract,
        OpCode::StringPush,
        OpCode::StringAdd,
    ];

    /// Looks up the opcode for a source mnemonic, `None` if the mnemonic is unknown
    pub fn from_mnemonic(mnemonic: &str) -> Option<OpCode> {
        Some(match mnemonic {
            "putln" => OpCode::Putln,
            "dup" => OpCode::Dup,
            "put" => OpCode::Put,
            "jump" => OpCode::Jump,
            "jumpl" => OpCode::JumpLessThan,
            "ipush" => OpCode::IntPush,
            "iadd" => OpCode::IntAdd,
            "isub" => OpCode::IntSubtract,
            "spush" => OpCode::StringPush,
            "sadd" => OpCode::StringAdd,
            _ => return None,
        })
    }

    pub fn mnemonic(&self) -> &'static str {
        match self {
            OpCode::Putln => "putln",
            OpCode::Dup => "dup",
            OpCode::Put => "put",
            OpCode::Jump => "jump",
            OpCode::JumpLessThan => "jumpl",
            OpCode::IntPush => "ipush",
            OpCode::IntAdd => "iadd",
            OpCode::IntSubtract => "isub",
            OpCode::StringPush => "spush",
            OpCode::StringAdd => "sadd",
        }
    }

    /// The inline arguments this opcode consumes, in source order
    pub fn args(&self) -> &'static [ArgKind] {
        match self {
            OpCode::Jump | OpCode::IntPush => INT_ARG,
            OpCode::JumpLessThan => INT_INT_ARGS,
            OpCode::StringPush => TEXT_ARG,
            _ => NO_ARGS,
        }
    }

    pub fn id(&self) -> u8 {
        *self as u8
    }
}

impl Display for OpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.mnemonic())
    }
}

/// One slot of the flat instruction sequence. Arguments are stored inline right after the
/// opcode that owns them, so the instruction pointer stays a single index.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Cell {
    Op(OpCode),
    Int(i64),
    Text(Arc<str>),
}

impl Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cell::Op(op) => write!(f, "{}", op),
            Cell::Int(val) => write!(f, "{}", val),
            Cell::Text(val) => write!(f, "{}", val),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ArgKind, OpCode};

    #[test]
    fn mnemonics_round_trip() {
        for op in OpCode::ALL {
            assert_eq!(OpCode::from_mnemonic(op.mnemonic()), Some(op));
        }
        assert_eq!(OpCode::from_mnemonic("PUTLN"), None);
        assert_eq!(OpCode::from_mnemonic("halt"), None);
    }

    #[test]
    fn opcode_ids() {
        let ids = OpCode::ALL.iter().map(|op| op.id()).collect::<Vec<_>>();
        assert_eq!(ids, vec![1, 2, 3, 4, 5, 11, 12, 14, 21, 22]);
    }

    #[test]
    fn signatures() {
        assert!(OpCode::Putln.args().is_empty());
        assert!(OpCode::StringAdd.args().is_empty());
        assert_eq!(OpCode::Jump.args(), &[ArgKind::Int]);
        assert_eq!(OpCode::JumpLessThan.args(), &[ArgKind::Int, ArgKind::Int]);
        assert_eq!(OpCode::IntPush.args(), &[ArgKind::Int]);
        assert_eq!(OpCode::StringPush.args(), &[ArgKind::Text]);
    }
}
