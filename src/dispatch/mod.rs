//! Controller side: job queueing, reply correlation, font resolution.

pub mod dispatcher;
