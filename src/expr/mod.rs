//! Vector expression evaluation
//!
//! This module provides the expression engine:
//! - [`lexer`]: tokenizes an expression string
//! - [`eval`]: precedence-climbing evaluation with scalar/vector
//!   broadcasting
//! - [`funcs`]: the built-in math and statistics function table
//!
//! # Evaluation Model
//!
//! Expressions are evaluated directly from the token stream; there is no
//! AST. Every intermediate value is a `Vec<f64>` (a scalar is length 1),
//! and binary operators broadcast a scalar across the other operand.
//!
//! `$var` and `[script]` substitutions are delegated to a caller-supplied
//! [`Substitutor`]; the engine itself knows nothing about the host's
//! variable or command machinery.

mod eval;
pub(crate) mod funcs;
mod lexer;

pub use eval::{evaluate, evaluate_into, evaluate_with};

use crate::store::errors::StoreError;
use std::fmt;

/// Classified floating-point failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathError {
    /// Result was NaN (argument outside the function's domain)
    Domain,
    /// Result overflowed to infinity
    Overflow,
    /// Result underflowed to a subnormal
    Underflow,
}

impl MathError {
    fn description(self) -> &'static str {
        match self {
            MathError::Domain => "domain error: argument not in valid range",
            MathError::Overflow => "floating-point value too large to represent",
            MathError::Underflow => "floating-point value too small to represent",
        }
    }
}

/// Expression evaluation error type
#[derive(Debug, Clone, PartialEq)]
pub enum EvalError {
    /// The token stream did not reduce to a single expression
    Syntax { message: String, pos: usize },
    /// A `(` with no matching `)`
    UnmatchedParen { pos: usize },
    /// Two vector operands of different lengths
    LengthMismatch { left: usize, right: usize },
    DivideByZero,
    Math(MathError),
    /// Defensive: an operator reached an application path it does not
    /// belong to. Should be unreachable.
    UnknownOperator,
    /// A shift amount that is not a scalar
    NonScalarShift,
    /// `$name` had no binding in the substitutor
    UnknownVariable(String),
    /// `[script]` substitution failed
    ScriptFailed(String),
    /// `$var` or `[script]` used without a substitutor
    NoSubstitutor,
    /// Vector name resolution failed, or the store rejected the result
    Store(StoreError),
}

impl EvalError {
    /// Machine-readable classification for arithmetic failures, mirroring
    /// the `ARITH`-class error codes the command layer attaches alongside
    /// the message. `None` for non-arithmetic errors.
    pub fn error_code(&self) -> Option<(&'static str, &'static str)> {
        match self {
            EvalError::DivideByZero => Some(("ARITH", "DIVZERO")),
            EvalError::Math(MathError::Domain) => Some(("ARITH", "DOMAIN")),
            EvalError::Math(MathError::Overflow) => Some(("ARITH", "OVERFLOW")),
            EvalError::Math(MathError::Underflow) => Some(("ARITH", "UNDERFLOW")),
            _ => None,
        }
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::Syntax { message, pos } => {
                write!(f, "syntax error at offset {}: {}", pos, message)
            }
            EvalError::UnmatchedParen { pos } => {
                write!(f, "unmatched parenthesis at offset {}", pos)
            }
            EvalError::LengthMismatch { left, right } => {
                write!(f, "vectors of different lengths: {} vs {}", left, right)
            }
            EvalError::DivideByZero => write!(f, "divide by zero"),
            EvalError::Math(err) => write!(f, "{}", err.description()),
            EvalError::UnknownOperator => write!(f, "unknown operator"),
            EvalError::NonScalarShift => write!(f, "shift amount must be a scalar"),
            EvalError::UnknownVariable(name) => {
                write!(f, "can't read variable \"{}\"", name)
            }
            EvalError::ScriptFailed(script) => {
                write!(f, "nested script \"{}\" failed", script)
            }
            EvalError::NoSubstitutor => {
                write!(f, "substitution is not available in this context")
            }
            EvalError::Store(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for EvalError {}

impl From<StoreError> for EvalError {
    fn from(err: StoreError) -> Self {
        EvalError::Store(err)
    }
}

impl From<lexer::LexError> for EvalError {
    fn from(err: lexer::LexError) -> Self {
        EvalError::Syntax {
            message: err.message,
            pos: err.pos,
        }
    }
}

/// Host hook for `$var` and `[script]` substitution.
///
/// The excluded command layer implements this against its interpreter; tests
/// implement it with a plain map. Each substitution result is re-parsed as a
/// number or a vector name.
pub trait Substitutor {
    /// Resolve `$name`. `None` means the variable does not exist.
    fn variable(&mut self, name: &str) -> Option<String>;

    /// Run `[script]` and return its result. `None` means it failed.
    fn command(&mut self, script: &str) -> Option<String>;
}
