//! Channel layer for prompt matching over a live process.
//!
//! This module owns the output buffer and the one-expect-at-a-time
//! discipline: a [`Session`] sends input, then waits for the earliest of a
//! set of prompts, the end of the stream, or a deadline.

mod buffer;
mod patterns;
mod session;

pub use buffer::{BufferMatch, PatternBuffer};
pub use patterns::PromptSet;
pub use session::{Outcome, Session};
