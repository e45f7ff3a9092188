//! Console port provider
//!
//! Serves IN from a line-oriented reader and prints OUT/INT events to a
//! writer. Generic over both ends so tests can use in-memory buffers.

use std::io::{self, BufRead, StdinLock, Stdout, Write};

use cellvm_core::{Event, PortError, Ports, Word};

/// Ports backed by a reader (one integer per line) and a writer
pub struct ConsolePorts<R, W> {
    reader: R,
    writer: W,
    prompt: bool,
}

impl ConsolePorts<StdinLock<'static>, Stdout> {
    /// Ports on the process's stdin and stdout
    pub fn stdio() -> Self {
        ConsolePorts::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> ConsolePorts<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        ConsolePorts {
            reader,
            writer,
            prompt: true,
        }
    }

    /// Disable the `Input from port N:` prompt
    pub fn without_prompt(mut self) -> Self {
        self.prompt = false;
        self
    }

    pub fn into_inner(self) -> (R, W) {
        (self.reader, self.writer)
    }
}

impl<R: BufRead, W: Write> Ports for ConsolePorts<R, W> {
    fn input(&mut self, port: Word) -> Result<Word, PortError> {
        if self.prompt {
            write!(self.writer, "Input from port {}: ", port)?;
            self.writer.flush()?;
        }

        let mut line = String::new();
        loop {
            line.clear();
            if self.reader.read_line(&mut line)? == 0 {
                return Err(PortError::InputExhausted { port });
            }
            let text = line.trim();
            if text.is_empty() {
                continue;
            }
            return text.parse::<Word>().map_err(|_| PortError::InvalidInput {
                port,
                input: text.to_string(),
            });
        }
    }

    fn emit(&mut self, event: Event) -> Result<(), PortError> {
        match event {
            Event::Output { port, value } => {
                writeln!(self.writer, "Output to port {}: {}", port, value)?
            }
            Event::Interrupt { code } => writeln!(self.writer, "Interrupt: {}", code)?,
        }
        self.writer.flush()?;
        Ok(())
    }
}
