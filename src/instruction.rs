/// The machine's instruction set.
///
/// Every instruction is a single byte with no operands. A NUL byte or the
/// end of the program slice terminates execution; any other byte outside
/// this set is a fault.
///
/// Note that input is `.` and output is `,`, and neither goes through the
/// data pointer: input always lands in cell 0 and output always sends 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Instruction {
    Increment,
    Decrement,
    MoveRight,
    MoveLeft,
    Input,
    Output,
}

const PLUS: u8 = b'+';
const MINUS: u8 = b'-';
const GREATER: u8 = b'>';
const LESS: u8 = b'<';
const DOT: u8 = b'.';
const COMMA: u8 = b',';

/// End-of-program marker inside a program slice.
pub const TERMINATOR: u8 = 0;

impl Instruction {
    pub const ALL: [Instruction; 6] = [
        Self::Increment,
        Self::Decrement,
        Self::MoveRight,
        Self::MoveLeft,
        Self::Input,
        Self::Output,
    ];

    #[inline(always)]
    pub fn decode(byte: u8) -> Option<Self> {
        match byte {
            PLUS => Some(Self::Increment),
            MINUS => Some(Self::Decrement),
            GREATER => Some(Self::MoveRight),
            LESS => Some(Self::MoveLeft),
            DOT => Some(Self::Input),
            COMMA => Some(Self::Output),
            _ => None,
        }
    }

    pub fn symbol(self) -> u8 {
        match self {
            Self::Increment => PLUS,
            Self::Decrement => MINUS,
            Self::MoveRight => GREATER,
            Self::MoveLeft => LESS,
            Self::Input => DOT,
            Self::Output => COMMA,
        }
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Self::Increment => "INC",
            Self::Decrement => "DEC",
            Self::MoveRight => "RIGHT",
            Self::MoveLeft => "LEFT",
            Self::Input => "IN",
            Self::Output => "OUT",
        }
    }
}

/// Returns true if the byte decodes to an instruction.
pub fn is_instruction(byte: u8) -> bool {
    Instruction::decode(byte).is_some()
}

/// Length of the program up to (not including) its terminator.
pub fn program_len(program: &[u8]) -> usize {
    program
        .iter()
        .position(|&b| b == TERMINATOR)
        .unwrap_or(program.len())
}

/// Pretty-print a program one instruction per line, stopping at the terminator.
///
/// Bytes that would fault at run time are shown as `???` with their value.
pub fn disassemble(program: &[u8]) -> String {
    use std::fmt::Write;
    let mut out = String::new();
    for (offset, &byte) in program[..program_len(program)].iter().enumerate() {
        match Instruction::decode(byte) {
            Some(instr) => {
                let _ = writeln!(
                    out,
                    "{offset:05}: {}  {}",
                    instr.symbol() as char,
                    instr.mnemonic()
                );
            }
            None => {
                let _ = writeln!(out, "{offset:05}: {byte:#04x}  ???");
            }
        }
    }
    out
}
