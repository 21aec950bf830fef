//! Cooperative session runtime.
//!
//! Each interactive command (`live`, `overview`, `settings edit`) runs one
//! loop on the main thread: it sleeps until the next timer deadline or an
//! inbound message, whichever comes first. Blocking readers (the push stream
//! and stdin) run on helper threads and only forward messages over a
//! channel.

pub mod input;
pub mod scheduler;

pub use scheduler::{Clock, ManualClock, Scheduler, SystemClock};
