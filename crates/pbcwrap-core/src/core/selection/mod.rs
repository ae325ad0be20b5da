//! A VMD-style atom selection language.
//!
//! ```ignore
//! use pbcwrap::core::selection::select;
//!
//! let protein = select(&topology, "not water and not resname NA CL")?;
//! let anchors = select(&topology, "name CA and resid 10 to 20 or beta > 0.5")?;
//! ```
//!
//! Supported keywords:
//!
//! | Kind | Keywords | Values |
//! |---|---|---|
//! | constant | `all`, `none`, `water` | |
//! | string | `name`, `resname`, `chain`, `element` | words, `*`/`?` globs, quoted strings |
//! | integer | `index`, `serial`, `resid`, `residue`, `fragment` | numbers, `a to b`, `a-b`, `a:b` |
//! | real | `beta`, `occupancy` | numbers, or one comparison (`<`, `<=`, `>`, `>=`, `==`, `!=`) |
//!
//! Terms combine with `not`, `and`, `or` (in decreasing precedence) and parentheses.

pub mod eval;
pub mod parser;
pub mod token;

use crate::core::models::topology::Topology;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
#[error("Invalid selection '{input}': {message} (at characters {start}..{end})")]
pub struct SelectionError {
    pub message: String,
    pub input: String,
    pub start: usize,
    pub end: usize,
}

impl SelectionError {
    pub(crate) fn new(message: impl Into<String>, input: &str, span: (usize, usize)) -> Self {
        Self {
            message: message.into(),
            input: input.to_string(),
            start: span.0,
            end: span.1,
        }
    }
}

/// Parses `expression` and returns the matching atom indices in ascending order.
pub fn select(topology: &Topology, expression: &str) -> Result<Vec<usize>, SelectionError> {
    let expr = parser::parse(expression)?;
    Ok(eval::evaluate(&expr, topology))
}
