use std::fmt;

use crate::Cell;

type ReadFn<'c> = Box<dyn Fn() -> Cell + 'c>;

/// The pluggable input/output behavior handed to a [`Machine`](crate::machine::Machine).
///
/// Both capabilities are optional. A missing reader turns the input
/// instruction into a no-op, a missing writer does the same for output.
/// `context` is passed untouched to the writer on every call; the machine
/// itself never looks at it.
///
/// Drivers are built once and then only borrowed:
///
/// ```
/// use std::cell::RefCell;
/// use tapevm::io::IoDriver;
///
/// let sink = RefCell::new(Vec::new());
/// let driver = IoDriver::new(&sink)
///     .with_reader(|| 7)
///     .with_writer(|sink: &RefCell<Vec<i32>>, value| sink.borrow_mut().push(value));
/// assert!(driver.has_reader() && driver.has_writer());
/// ```
pub struct IoDriver<'c, C: ?Sized = ()> {
    read_value: Option<ReadFn<'c>>,
    write_value: Option<Box<dyn Fn(&C, Cell) + 'c>>,
    context: &'c C,
}

impl<'c, C: ?Sized> IoDriver<'c, C> {
    /// A driver with no capabilities bound to `context`.
    pub fn new(context: &'c C) -> Self {
        Self {
            read_value: None,
            write_value: None,
            context,
        }
    }

    /// Install the capability invoked by the input instruction.
    ///
    /// The reader is `Fn`, so one that consumes a stream keeps it behind a `RefCell`.
    pub fn with_reader(mut self, read_value: impl Fn() -> Cell + 'c) -> Self {
        self.read_value = Some(Box::new(read_value));
        self
    }

    /// Install the capability invoked by the output instruction.
    pub fn with_writer(mut self, write_value: impl Fn(&C, Cell) + 'c) -> Self {
        self.write_value = Some(Box::new(write_value));
        self
    }

    pub fn has_reader(&self) -> bool {
        self.read_value.is_some()
    }

    pub fn has_writer(&self) -> bool {
        self.write_value.is_some()
    }

    pub fn context(&self) -> &'c C {
        self.context
    }

    /// Ask the reader for a value. `None` when no reader is installed.
    pub fn read_value(&self) -> Option<Cell> {
        self.read_value.as_ref().map(|read| read())
    }

    /// Hand `value` to the writer together with the context.
    /// Returns whether a writer was installed.
    pub fn write_value(&self, value: Cell) -> bool {
        match &self.write_value {
            Some(write) => {
                write(self.context, value);
                true
            }
            None => false,
        }
    }
}

impl Default for IoDriver<'_, ()> {
    fn default() -> Self {
        Self::new(&())
    }
}

impl<C: ?Sized> fmt::Debug for IoDriver<'_, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IoDriver")
            .field("read_value", &self.has_reader())
            .field("write_value", &self.has_writer())
            .field("context", &(self.context as *const C))
            .finish()
    }
}
