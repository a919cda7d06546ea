//! Output trait for the Wyrd interpreter
//!
//! The interpreter writes everything `print`, `prns`, `probe` and
//! `dump\state` produce through this trait, so the host decides where text
//! goes: a terminal, a log, or an in-memory buffer under test.

use std::cell::RefCell;
use std::io;
use std::rc::Rc;

/// Destination for interpreter output.
pub trait Output {
    /// Write bytes to the output.
    fn write(&mut self, data: &[u8]) -> io::Result<()>;

    /// Flush anything buffered.
    fn flush(&mut self) -> io::Result<()>;
}

// RUST CONCEPT: Shared handle to a capture buffer
// The interpreter owns one clone as its Box<dyn Output>; the caller keeps
// another and reads what was written through it.
#[derive(Clone, Default)]
pub struct BufferOutput {
    buffer: Rc<RefCell<Vec<u8>>>,
}

impl BufferOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, decoded lossily as UTF-8.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.borrow()).into_owned()
    }

    pub fn clear(&self) {
        self.buffer.borrow_mut().clear();
    }
}

impl Output for BufferOutput {
    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        self.buffer.borrow_mut().extend_from_slice(data);
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_output_is_shared_between_clones() {
        let capture = BufferOutput::new();
        let mut writer: Box<dyn Output> = Box::new(capture.clone());

        writer.write(b"Hello").unwrap();
        writer.write(b" ").unwrap();
        writer.write(b"World").unwrap();
        writer.flush().unwrap();

        assert_eq!(capture.contents(), "Hello World");
        capture.clear();
        assert_eq!(capture.contents(), "");
    }
}
