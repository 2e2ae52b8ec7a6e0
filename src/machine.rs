use std::fmt;

use tracing::{debug, trace};

use crate::Cell;
use crate::error::MachineError;
use crate::instruction::{Instruction, TERMINATOR};
use crate::io::IoDriver;

/// Tape length used when no [`MachineConfig`] is given.
pub const DEFAULT_TAPE_LENGTH: usize = 30000;

/// Raw cursor value reported by a released machine.
pub const INVALID_CURSOR: isize = -1;

/// Configuration for a new machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineConfig {
    /// Number of cells on the tape. Must be at least 1.
    pub tape_length: usize,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            tape_length: DEFAULT_TAPE_LENGTH,
        }
    }
}

/// A tape machine executing single-byte instructions.
///
/// The machine owns its tape. The program and the I/O driver are borrowed
/// for `'p` and `'d` respectively and are never copied.
///
/// - data pointer: selects the active cell, always `< tape.len()` while
///   the machine is live; `<` on cell 0 and `>` on the last cell are faults
///   (no wraparound)
/// - instruction pointer: offset of the next byte to dispatch; it is not
///   reset by loading a program
///
/// Cell arithmetic wraps on overflow.
pub struct Machine<'p, 'd, C: ?Sized = ()> {
    tape: Vec<Cell>,
    data_pointer: usize,
    instruction_pointer: usize,
    released: bool,
    program: Option<&'p [u8]>,
    io_driver: Option<&'d IoDriver<'d, C>>,
}

fn allocate_tape(cells: usize) -> Result<Vec<Cell>, MachineError> {
    let mut tape = Vec::new();
    tape.try_reserve_exact(cells)
        .map_err(|_| MachineError::Allocation { cells })?;
    Ok(tape)
}

impl<'p, 'd, C: ?Sized> Machine<'p, 'd, C> {
    /// Create a machine with a zeroed tape of [`DEFAULT_TAPE_LENGTH`] cells.
    pub fn new(io_driver: &'d IoDriver<'d, C>) -> Result<Self, MachineError> {
        Self::with_config(io_driver, MachineConfig::default())
    }

    pub fn with_config(
        io_driver: &'d IoDriver<'d, C>,
        config: MachineConfig,
    ) -> Result<Self, MachineError> {
        if config.tape_length == 0 {
            return Err(MachineError::EmptyTape);
        }
        let mut tape = allocate_tape(config.tape_length)?;
        tape.resize(config.tape_length, 0);
        debug!(tape_length = config.tape_length, "machine initialized");
        Ok(Self {
            tape,
            data_pointer: 0,
            instruction_pointer: 0,
            released: false,
            program: None,
            io_driver: Some(io_driver),
        })
    }

    /// Free the tape and detach the program and driver.
    ///
    /// Afterwards the tape is empty, both cursors read as invalid and every
    /// operation except [`clear_program`](Self::clear_program) and `release`
    /// itself reports [`MachineError::Released`]. Releasing twice is a no-op.
    pub fn release(&mut self) {
        if !self.released {
            debug!(tape_length = self.tape.len(), "machine released");
        }
        self.tape = Vec::new();
        self.data_pointer = 0;
        self.instruction_pointer = 0;
        self.released = true;
        self.program = None;
        self.io_driver = None;
    }

    /// Copy this machine into a freshly allocated one.
    ///
    /// The new machine gets its own tape with identical contents; the program
    /// and driver references are shared, not duplicated. Nothing is created
    /// if the tape cannot be allocated.
    pub fn try_clone(&self) -> Result<Self, MachineError> {
        let mut tape = allocate_tape(self.tape.len())?;
        tape.extend_from_slice(&self.tape);
        Ok(Self {
            tape,
            data_pointer: self.data_pointer,
            instruction_pointer: self.instruction_pointer,
            released: self.released,
            program: self.program,
            io_driver: self.io_driver,
        })
    }

    /// Borrow `program` as the code to execute. Cursors are left where they are.
    pub fn load_program<P>(&mut self, program: &'p P) -> Result<(), MachineError>
    where
        P: AsRef<[u8]> + ?Sized,
    {
        if self.released {
            return Err(MachineError::Released);
        }
        let program = program.as_ref();
        debug!(len = program.len(), "program loaded");
        self.program = Some(program);
        Ok(())
    }

    pub fn clear_program(&mut self) {
        self.program = None;
    }

    /// Run the loaded program from the current instruction pointer until it
    /// reaches the terminator (a NUL byte or the end of the program).
    ///
    /// Returns the number of instructions dispatched by this call. On a fault
    /// the instruction pointer stays on the offending instruction and every
    /// change made before it is kept.
    pub fn execute(&mut self) -> Result<usize, MachineError> {
        if self.released {
            return Err(MachineError::Released);
        }
        let program = self.program.ok_or(MachineError::NoProgram)?;
        let start = self.instruction_pointer;

        loop {
            let offset = self.instruction_pointer;
            let byte = program.get(offset).copied().unwrap_or(TERMINATOR);
            if byte == TERMINATOR {
                break;
            }
            let result = match Instruction::decode(byte) {
                Some(instr) => self.dispatch(instr, offset),
                None => Err(MachineError::UnknownInstruction { byte, offset }),
            };
            if let Err(e) = result {
                debug!(offset, data_pointer = self.data_pointer, "execution stopped: {e}");
                return Err(e);
            }
            self.instruction_pointer += 1;
        }

        let steps = self.instruction_pointer - start;
        debug!(steps, data_pointer = self.data_pointer, "program terminated");
        Ok(steps)
    }

    #[inline(always)]
    fn dispatch(&mut self, instr: Instruction, offset: usize) -> Result<(), MachineError> {
        trace!(offset, ?instr, data_pointer = self.data_pointer);
        match instr {
            Instruction::Increment => {
                let cell = &mut self.tape[self.data_pointer];
                *cell = cell.wrapping_add(1);
            }
            Instruction::Decrement => {
                let cell = &mut self.tape[self.data_pointer];
                *cell = cell.wrapping_sub(1);
            }
            Instruction::MoveRight => {
                if self.data_pointer + 1 == self.tape.len() {
                    return Err(MachineError::PointerOverflow { offset });
                }
                self.data_pointer += 1;
            }
            Instruction::MoveLeft => {
                if self.data_pointer == 0 {
                    return Err(MachineError::PointerUnderflow { offset });
                }
                self.data_pointer -= 1;
            }
            // Input always lands in cell 0, not under the data pointer.
            Instruction::Input => {
                if let Some(value) = self.io_driver.and_then(|io| io.read_value()) {
                    self.tape[0] = value;
                }
            }
            // Output always sends 0, not the active cell.
            Instruction::Output => {
                if let Some(io) = self.io_driver {
                    io.write_value(0);
                }
            }
        }
        Ok(())
    }

    pub fn tape(&self) -> &[Cell] {
        &self.tape
    }

    pub fn tape_len(&self) -> usize {
        self.tape.len()
    }

    pub fn cell(&self, index: usize) -> Option<Cell> {
        self.tape.get(index).copied()
    }

    /// `None` once the machine has been released.
    pub fn data_pointer(&self) -> Option<usize> {
        (!self.released).then_some(self.data_pointer)
    }

    /// `None` once the machine has been released.
    pub fn instruction_pointer(&self) -> Option<usize> {
        (!self.released).then_some(self.instruction_pointer)
    }

    /// `(data_pointer, instruction_pointer)`, both [`INVALID_CURSOR`] after release.
    pub fn raw_cursors(&self) -> (isize, isize) {
        if self.released {
            (INVALID_CURSOR, INVALID_CURSOR)
        } else {
            (self.data_pointer as isize, self.instruction_pointer as isize)
        }
    }

    pub fn program(&self) -> Option<&'p [u8]> {
        self.program
    }

    pub fn io_driver(&self) -> Option<&'d IoDriver<'d, C>> {
        self.io_driver
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// The byte under the instruction pointer, or `None` at the terminator.
    pub fn current_instruction(&self) -> Option<u8> {
        let byte = self.program?.get(self.instruction_pointer).copied()?;
        (byte != TERMINATOR).then_some(byte)
    }
}

impl<C: ?Sized> Clone for Machine<'_, '_, C> {
    fn clone(&self) -> Self {
        Self {
            tape: self.tape.clone(),
            data_pointer: self.data_pointer,
            instruction_pointer: self.instruction_pointer,
            released: self.released,
            program: self.program,
            io_driver: self.io_driver,
        }
    }
}

/// State equality: tape contents and cursors by value, the borrowed program
/// and driver by identity.
impl<C: ?Sized> PartialEq for Machine<'_, '_, C> {
    fn eq(&self, other: &Self) -> bool {
        self.released == other.released
            && self.data_pointer == other.data_pointer
            && self.instruction_pointer == other.instruction_pointer
            && self.tape == other.tape
            && match (self.program, other.program) {
                (Some(a), Some(b)) => std::ptr::eq(a, b),
                (None, None) => true,
                _ => false,
            }
            && match (self.io_driver, other.io_driver) {
                (Some(a), Some(b)) => std::ptr::eq(a, b),
                (None, None) => true,
                _ => false,
            }
    }
}

impl<C: ?Sized> fmt::Debug for Machine<'_, '_, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (data_pointer, instruction_pointer) = self.raw_cursors();
        f.debug_struct("Machine")
            .field("tape_len", &self.tape.len())
            .field("data_pointer", &data_pointer)
            .field("instruction_pointer", &instruction_pointer)
            .field("program", &self.program.map(String::from_utf8_lossy))
            .field("io_driver", &self.io_driver)
            .finish()
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn program_bytes() -> impl Strategy<Value = Vec<u8>> {
        let byte = prop_oneof![
            8 => prop::sample::select(b"+-<>.,".to_vec()),
            1 => any::<u8>(),
        ];
        prop::collection::vec(byte, 0..256)
    }

    proptest! {
        #[test]
        fn random_programs_never_panic(
            program in program_bytes(),
            tape_length in 1usize..32,
        ) {
            let driver = IoDriver::default().with_reader(|| 5).with_writer(|_, _| {});
            let mut m = Machine::with_config(&driver, MachineConfig { tape_length }).unwrap();
            m.load_program(&program).unwrap();
            let _ = m.execute();
            prop_assert!(m.data_pointer().unwrap() < tape_length);
            prop_assert_eq!(m.tape_len(), tape_length);
        }

        #[test]
        fn faults_point_at_offending_instruction(
            program in program_bytes(),
            tape_length in 1usize..32,
        ) {
            let driver = IoDriver::default();
            let mut m = Machine::with_config(&driver, MachineConfig { tape_length }).unwrap();
            m.load_program(&program).unwrap();
            let ip = match m.execute() {
                Ok(steps) => {
                    prop_assert_eq!(Some(steps), m.instruction_pointer());
                    return Ok(());
                }
                Err(e) => {
                    let ip = m.instruction_pointer().unwrap();
                    prop_assert_eq!(e.offset(), Some(ip));
                    ip
                }
            };
            let byte = program[ip];
            match Instruction::decode(byte) {
                Some(Instruction::MoveLeft) => prop_assert_eq!(m.data_pointer(), Some(0)),
                Some(Instruction::MoveRight) => {
                    prop_assert_eq!(m.data_pointer(), Some(tape_length - 1))
                }
                Some(other) => prop_assert!(false, "{other:?} cannot fault"),
                None => prop_assert_ne!(byte, TERMINATOR),
            }
        }

        #[test]
        fn counter_programs_sum_into_cell_zero(
            program in prop::collection::vec(prop::sample::select(b"+-".to_vec()), 0..512),
        ) {
            let driver = IoDriver::default();
            let mut m = Machine::with_config(&driver, MachineConfig { tape_length: 4 }).unwrap();
            m.load_program(&program).unwrap();
            prop_assert_eq!(m.execute(), Ok(program.len()));
            let plus = program.iter().filter(|&&b| b == b'+').count() as Cell;
            let minus = program.len() as Cell - plus;
            prop_assert_eq!(m.cell(0), Some(plus - minus));
        }
    }
}
