//! Set-associative cache simulator.
//!
//! Replays a memory trace against an LRU cache of `2^s` sets, `E` lines per
//! set and `2^b`-byte blocks, classifying every access as a hit, a miss, or a
//! miss that evicted a line.

pub mod cache;
pub mod config;
pub mod replace;
pub mod sim;
pub mod trace;

pub use cache::{Addr, Cache, CacheError};
pub use config::{Config, Summary};
pub use replace::AccessResult;
pub use sim::{Access, Counters, Op, Outcome, Simulator};
pub use trace::{Trace, TraceError};
