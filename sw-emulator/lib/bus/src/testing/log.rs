/*++

Licensed under the Apache-2.0 license.

File Name:

    log.rs

Abstract:

    File contains a shared text log for recording calls in unit tests.

--*/
use std::{cell::RefCell, fmt::Write, rc::Rc};

/// Text log that can be appended to through `&self`.
///
/// Clones share the same buffer, so a test can keep a clone of the log of a
/// fake that has been moved into another object.
///
/// ```
/// use ks_emu_bus::testing::Log;
/// use std::fmt::Write;
///
/// let log = Log::new();
/// writeln!(log.w(), "start()").unwrap();
/// assert_eq!("start()\n", log.take());
/// assert_eq!("", log.take());
/// ```
#[derive(Clone, Default)]
pub struct Log {
    log: Rc<RefCell<String>>,
}
impl Log {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the accumulated text and leaves the log empty.
    pub fn take(&self) -> String {
        std::mem::take(&mut *self.log.borrow_mut())
    }

    /// Returns a writer that can be used with write!() or writeln!().
    pub fn w(&self) -> impl Write + '_ {
        LogWriter { log: &self.log }
    }
}

struct LogWriter<'a> {
    log: &'a RefCell<String>,
}
impl Write for LogWriter<'_> {
    fn write_str(&mut self, s: &str) -> std::fmt::Result {
        self.log.borrow_mut().write_str(s)
    }
}
