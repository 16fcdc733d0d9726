//! Font relay: how the worker obtains font bytes it does not have yet.

pub mod requests;
pub mod resolver;

#[cfg(test)]
#[path = "../../tests/unit/relay/resolver.rs"]
mod tests;
