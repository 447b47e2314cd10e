//! Shared utilities for the lattice node.

pub mod stats;
pub mod time;

pub use stats::{Stat, Stats, StatsSink};
pub use time::{format_duration, Clock, SystemClock};
