//! Deadline-ordered event scheduler core for a cycle-accurate console
//! emulator.
//!
//! This crate is the timing heart that a machine core drives once per
//! CPU slice: register callbacks by name ([`EventTypeRegistry`]), queue
//! them for a future cycle count ([`Scheduler::schedule_event`]), and
//! let [`Scheduler::advance`] dispatch whatever has come due and reopen
//! the next slice. Everything the scheduler itself doesn't own — the
//! CPU's downcount register, the video FIFO, panic reporting, "am I on
//! the CPU thread" — is modeled as a trait in [`collaborators`] so a
//! real emulator can supply its own machine-specific implementations.

pub mod clock;
pub mod collaborators;
pub mod config;
pub mod diagnostics;
pub mod event_types;
pub mod ingress;
pub mod queue;
pub mod scheduler;
pub mod state;

pub use clock::{ClockState, MAX_SLICE_LENGTH};
pub use collaborators::{AlwaysCpuThread, CpuHandle, CurrentThread, LoggingPanicNotifier, NullCpu, NullVideoFifo, PanicNotifier, VideoFifo};
pub use config::TimingConfig;
pub use event_types::{Callback, EventTypeRegistry, TypeId};
pub use ingress::IngressQueue;
pub use queue::{CyclesLate, Deadline, Event, EventQueue, UserData};
pub use scheduler::{FromThread, Scheduler};
pub use state::{read_state, write_state, ClockSnapshot, PersistedEvent, StateError, StateResult};
