/// Failures reported by [`Machine`](crate::machine::Machine) operations.
///
/// Runtime faults carry the offset of the offending instruction; the
/// machine's `instruction_pointer` is left at the same offset.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MachineError {
    #[error("no program loaded")]
    NoProgram,

    #[error("machine has been released")]
    Released,

    #[error("tape length must be at least one cell")]
    EmptyTape,

    #[error("failed to allocate a tape of {cells} cells")]
    Allocation { cells: usize },

    /// `>` with the data pointer already on the last cell.
    #[error("data pointer moved past the end of the tape at offset {offset}")]
    PointerOverflow { offset: usize },

    /// `<` with the data pointer already on cell 0.
    #[error("data pointer moved before the start of the tape at offset {offset}")]
    PointerUnderflow { offset: usize },

    #[error("unknown instruction {byte:#04x} at offset {offset}")]
    UnknownInstruction { byte: u8, offset: usize },
}

impl MachineError {
    /// Program offset of the instruction that faulted, if this is a runtime fault.
    pub fn offset(&self) -> Option<usize> {
        match *self {
            Self::PointerOverflow { offset }
            | Self::PointerUnderflow { offset }
            | Self::UnknownInstruction { offset, .. } => Some(offset),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_only_for_runtime_faults() {
        assert_eq!(MachineError::PointerOverflow { offset: 7 }.offset(), Some(7));
        assert_eq!(MachineError::PointerUnderflow { offset: 0 }.offset(), Some(0));
        assert_eq!(
            MachineError::UnknownInstruction { byte: b'#', offset: 3 }.offset(),
            Some(3)
        );
        assert_eq!(MachineError::NoProgram.offset(), None);
        assert_eq!(MachineError::Released.offset(), None);
        assert_eq!(MachineError::Allocation { cells: 1 }.offset(), None);
    }

    #[test]
    fn test_display_mentions_byte_and_offset() {
        let msg = MachineError::UnknownInstruction { byte: b'#', offset: 12 }.to_string();
        assert_eq!(msg, "unknown instruction 0x23 at offset 12");
    }
}
