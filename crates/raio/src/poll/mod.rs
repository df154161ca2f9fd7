//! The polling state machine: run a cycle, idle for the interval, repeat.

pub mod runner;
pub mod shutdown;

pub use runner::{CycleReport, PollState, Poller};
pub use shutdown::{Shutdown, ShutdownSignal};
