pub mod error;
pub mod instruction;
pub mod io;
pub mod machine;

/// Value held by a single tape cell.
pub type Cell = i32;

pub use error::MachineError;
pub use io::IoDriver;
pub use machine::{Machine, MachineConfig};
