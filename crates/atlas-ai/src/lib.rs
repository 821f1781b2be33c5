//! AI bridge for Atlas
//!
//! Best-effort structured analysis of files that have no native parser.
//! Providers turn a file's text into functions, classes, enums and import
//! specifiers; model replies are parsed leniently.

pub mod bridge;
pub mod prompt;
pub mod providers;

#[cfg(test)]
pub mod tests;

pub use bridge::*;
pub use providers::create_provider;
