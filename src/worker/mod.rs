//! The worker context: owns the engine and runs jobs one at a time.

pub mod runtime;
