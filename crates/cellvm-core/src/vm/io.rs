//! Port I/O boundary
//!
//! The machine never touches a console directly. IN, OUT and INT go through
//! an injected [`Ports`] provider, and observable effects are reported as
//! [`Event`] values for the host to present.

use std::collections::VecDeque;

use crate::error::PortError;
use super::Word;

/// Observable side effect of OUT or INT
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Output { port: Word, value: Word },
    Interrupt { code: Word },
}

/// Port-addressed input/output provider
pub trait Ports {
    /// Block until a value for `port` is available
    fn input(&mut self, port: Word) -> Result<Word, PortError>;

    /// Deliver an event to the host
    fn emit(&mut self, event: Event) -> Result<(), PortError>;
}

/// In-memory provider: pre-seeded input queue and captured events.
#[derive(Debug, Clone, Default)]
pub struct ScriptedPorts {
    inputs: VecDeque<Word>,
    requests: Vec<Word>,
    events: Vec<Event>,
}

impl ScriptedPorts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider that answers IN requests from `inputs`, in order
    pub fn with_inputs<I: IntoIterator<Item = Word>>(inputs: I) -> Self {
        ScriptedPorts {
            inputs: inputs.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn push_input(&mut self, value: Word) {
        self.inputs.push_back(value);
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Ports that IN requested, in order
    pub fn requests(&self) -> &[Word] {
        &self.requests
    }

    /// Take captured events, leaving the buffer empty
    pub fn drain_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn outputs(&self) -> Vec<(Word, Word)> {
        self.events
            .iter()
            .filter_map(|event| match *event {
                Event::Output { port, value } => Some((port, value)),
                Event::Interrupt { .. } => None,
            })
            .collect()
    }
}

impl Ports for ScriptedPorts {
    fn input(&mut self, port: Word) -> Result<Word, PortError> {
        self.requests.push(port);
        self.inputs
            .pop_front()
            .ok_or(PortError::InputExhausted { port })
    }

    fn emit(&mut self, event: Event) -> Result<(), PortError> {
        self.events.push(event);
        Ok(())
    }
}
