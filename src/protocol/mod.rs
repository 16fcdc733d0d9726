//! Controller <-> worker message envelopes.

pub mod message;
