//! Command-buffer codec: the engine's flat numeric output <-> typed drawing commands.

pub mod color;
pub mod command;
pub mod decode;
pub mod encode;
pub mod reader;
