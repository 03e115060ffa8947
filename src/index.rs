//! Textual index and index-range parsing
//!
//! Translates index strings from the command layer into concrete positions
//! against a vector's current bounds:
//!
//! - plain integers, adjusted by the vector's `offset`
//! - `end` / `end-N` (Tcl-style end-relative arithmetic)
//! - `++end`, one past the last element, valid only as a write target
//! - the special statistic names `min`, `max`, `mean`, `sum`, `prod`,
//!   which read as a statistic over the vector's selected range
//! - anything else falls back to the expression evaluator and must produce
//!   a scalar with an integral value
//!
//! The fallback is the single non-literal path: there is no separate
//! integer-expression parser with its own error wording.

use crate::expr::{self, EvalError};
use crate::store::errors::StoreError;
use crate::store::registry::{VectorId, VectorStore};
use crate::store::vector::Vector;
use std::fmt;

/// A resolved index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Index {
    /// A concrete position in `[0, len)`
    At(usize),
    /// One past the last element (`++end`); an append target, never a read
    Append,
    /// A named statistic over the selected range; read-only
    Special(SpecialIndex),
}

/// Read-only statistic indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialIndex {
    Min,
    Max,
    Mean,
    Sum,
    Prod,
}

impl SpecialIndex {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "min" => Some(SpecialIndex::Min),
            "max" => Some(SpecialIndex::Max),
            "mean" => Some(SpecialIndex::Mean),
            "sum" => Some(SpecialIndex::Sum),
            "prod" => Some(SpecialIndex::Prod),
            _ => None,
        }
    }

    /// Compute the statistic over the vector's currently selected range.
    pub fn evaluate(self, vector: &Vector) -> f64 {
        let selected = vector.selected();
        match self {
            SpecialIndex::Min => crate::expr::funcs::vec_min(selected),
            SpecialIndex::Max => crate::expr::funcs::vec_max(selected),
            SpecialIndex::Mean => crate::expr::funcs::mean(selected),
            SpecialIndex::Sum => crate::expr::funcs::sum(selected),
            SpecialIndex::Prod => crate::expr::funcs::prod(selected),
        }
    }
}

/// Parsing options for [`parse_index`].
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexFlags {
    /// Require the resolved position to be `< len()`
    pub check_range: bool,
    /// Accept the special statistic names
    pub allow_special: bool,
}

/// Index parsing error type
#[derive(Debug, Clone, PartialEq)]
pub enum IndexError {
    /// The index string was empty
    Empty,
    /// The resolved position falls outside the vector's bounds
    OutOfRange { index: i64, length: usize },
    /// `first > last` after resolving both sides of a range
    RangeOrder { first: usize, last: usize },
    /// A special statistic name where one is not accepted
    SpecialNotAllowed { name: String },
    /// The fallback expression produced something other than a scalar
    /// integer
    BadIndex { text: String },
    /// The fallback expression itself failed
    Eval(EvalError),
    Store(StoreError),
}

impl fmt::Display for IndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexError::Empty => write!(f, "empty index"),
            IndexError::OutOfRange { index, length } => {
                write!(f, "index \"{}\" is out of range for a vector of length {}", index, length)
            }
            IndexError::RangeOrder { first, last } => {
                write!(f, "range \"{}:{}\" is out of order", first, last)
            }
            IndexError::SpecialNotAllowed { name } => {
                write!(f, "can't use special index \"{}\" here", name)
            }
            IndexError::BadIndex { text } => {
                write!(f, "bad index \"{}\": expected a scalar integer", text)
            }
            IndexError::Eval(err) => write!(f, "bad index expression: {}", err),
            IndexError::Store(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for IndexError {}

impl From<EvalError> for IndexError {
    fn from(err: EvalError) -> Self {
        IndexError::Eval(err)
    }
}

impl From<StoreError> for IndexError {
    fn from(err: StoreError) -> Self {
        IndexError::Store(err)
    }
}

/// Parse one index string against a vector's current bounds.
pub fn parse_index(
    store: &VectorStore,
    id: VectorId,
    text: &str,
    flags: IndexFlags,
) -> Result<Index, IndexError> {
    if text.is_empty() {
        return Err(IndexError::Empty);
    }
    let vector = store.vector(id)?;
    let length = vector.len();

    if text == "++end" {
        return Ok(Index::Append);
    }

    if let Some(rest) = text.strip_prefix("end") {
        let back: i64 = if rest.is_empty() {
            0
        } else if let Some(n) = rest.strip_prefix('-') {
            n.parse().map_err(|_| IndexError::BadIndex {
                text: text.to_string(),
            })?
        } else {
            return Err(IndexError::BadIndex {
                text: text.to_string(),
            });
        };
        let resolved = length as i64 - 1 - back;
        if resolved < 0 || resolved >= length as i64 {
            return Err(IndexError::OutOfRange {
                index: resolved,
                length,
            });
        }
        return Ok(Index::At(resolved as usize));
    }

    if let Some(special) = SpecialIndex::from_name(text) {
        if !flags.allow_special {
            return Err(IndexError::SpecialNotAllowed {
                name: text.to_string(),
            });
        }
        return Ok(Index::Special(special));
    }

    let raw = match text.parse::<i64>() {
        Ok(value) => value,
        Err(_) => scalar_integer(store, text)?,
    };
    let adjusted = raw - vector.offset();
    if adjusted < 0 || (flags.check_range && adjusted >= length as i64) {
        return Err(IndexError::OutOfRange {
            index: adjusted,
            length,
        });
    }
    Ok(Index::At(adjusted as usize))
}

/// Parse `first:last` (either side omissible) or a single index, returning
/// the resolved inclusive bounds.
pub fn parse_range(
    store: &VectorStore,
    id: VectorId,
    text: &str,
) -> Result<(usize, usize), IndexError> {
    let length = store.vector(id)?.len();
    let flags = IndexFlags {
        check_range: true,
        allow_special: false,
    };

    let (first, last) = match text.split_once(':') {
        Some((left, right)) => {
            let first = if left.is_empty() {
                0
            } else {
                positional(store, id, left, flags)?
            };
            let last = if right.is_empty() {
                length.saturating_sub(1)
            } else {
                positional(store, id, right, flags)?
            };
            (first, last)
        }
        None => {
            let index = positional(store, id, text, flags)?;
            (index, index)
        }
    };

    if first > last {
        return Err(IndexError::RangeOrder { first, last });
    }
    Ok((first, last))
}

fn positional(
    store: &VectorStore,
    id: VectorId,
    text: &str,
    flags: IndexFlags,
) -> Result<usize, IndexError> {
    match parse_index(store, id, text, flags)? {
        Index::At(index) => Ok(index),
        Index::Append | Index::Special(_) => Err(IndexError::BadIndex {
            text: text.to_string(),
        }),
    }
}

/// Evaluate a non-literal index expression; it must reduce to a scalar with
/// an integral value.
fn scalar_integer(store: &VectorStore, text: &str) -> Result<i64, IndexError> {
    let result = expr::evaluate(store, text)?;
    if result.len() != 1 || result[0].fract() != 0.0 || !result[0].is_finite() {
        return Err(IndexError::BadIndex {
            text: text.to_string(),
        });
    }
    Ok(result[0] as i64)
}

impl VectorStore {
    /// Parse a range string and install it as the vector's selected
    /// sub-range.
    pub fn select_range(&mut self, id: VectorId, text: &str) -> Result<(), IndexError> {
        let (first, last) = parse_range(self, id, text)?;
        self.live_entry_mut(id)?.vector.select(first, last);
        Ok(())
    }
}
