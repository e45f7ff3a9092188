//! Host integration for CellVM
//!
//! Console-backed ports, an event-logging port wrapper, and the colored
//! stderr logger used by CellVM binaries. The machine itself stays free of
//! any concrete I/O.

pub mod console;
#[macro_use]
pub mod log;

pub use cellvm_core::{Event, PortError, Ports, RunOutcome, VirtualMachine, VmResult, Word};
pub use console::ConsolePorts;

/// Wraps a provider and logs every request and event at info level.
pub struct LoggingPorts<P> {
    inner: P,
}

impl<P: Ports> LoggingPorts<P> {
    pub fn new(inner: P) -> Self {
        LoggingPorts { inner }
    }

    pub fn into_inner(self) -> P {
        self.inner
    }
}

impl<P: Ports> Ports for LoggingPorts<P> {
    fn input(&mut self, port: Word) -> Result<Word, PortError> {
        let value = self.inner.input(port)?;
        info!("IN port {} -> {}", port, value);
        Ok(value)
    }

    fn emit(&mut self, event: Event) -> Result<(), PortError> {
        match event {
            Event::Output { port, value } => info!("OUT port {} <- {}", port, value),
            Event::Interrupt { code } => info!("INT {}", code),
        }
        self.inner.emit(event)
    }
}

/// Run `vm` to completion (or its step budget) and log how it ended.
pub fn run_and_report<P: Ports + ?Sized>(
    vm: &mut VirtualMachine,
    ports: &mut P,
) -> VmResult<RunOutcome> {
    let result = vm.run(ports);
    match &result {
        Ok(RunOutcome::Halted) => {
            info!("halted after {} steps at ip {}", vm.steps(), vm.ip());
        }
        Ok(RunOutcome::StepLimitReached) => {
            warn!("step limit reached after {} steps at ip {}", vm.steps(), vm.ip());
        }
        Err(fault) => {
            error!("fault: {}", fault);
        }
    }
    result
}
