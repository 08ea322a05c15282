//! Domain types: bars and their builder.

pub mod bar;

pub use bar::{Bar, BarBuilder, BarError};
