//! Stdout wrapper implementing Output

use crate::output::Output;
use std::io::{self, Write};

#[derive(Debug, Default)]
pub struct StdoutOutput;

impl StdoutOutput {
    pub fn new() -> Self {
        StdoutOutput
    }
}

impl Output for StdoutOutput {
    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        io::stdout().write_all(data)
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stdout().flush()
    }
}
