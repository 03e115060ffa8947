//! # Introduction
//!
//! Vexel is a store of named, resizable `f64` vectors with client change
//! notification, plus an embedded arithmetic expression language that
//! broadcasts scalars across vectors. It is the data engine a plotting or
//! command layer sits on top of: that layer registers as a client, reads
//! vector contents when notified, and hands user expressions here for
//! evaluation.
//!
//! ## Evaluation pipeline
//!
//! ```text
//! Expression → Lexer → Evaluator → value list
//!                         ↑
//!            VectorStore (named vectors)
//! ```
//!
//! 1. [`store`] — the [`store::VectorStore`] registry: vector lifecycle,
//!    namespaces, client tokens, and notification scheduling.
//! 2. [`index`] — textual index and range parsing (`5`, `end-1`, `2:5`,
//!    `++end`, the special statistic names).
//! 3. [`expr`] — the expression engine: tokenizer, precedence-climbing
//!    evaluator with broadcasting, and the built-in math function table.
//! 4. [`chain`] — ordered container with stable links, backing each
//!    vector's client chain.
//!
//! ## Threading model
//!
//! Everything is single-threaded and cooperative. The only deferred work is
//! the `WhenIdle` notification policy, which coalesces mutations until the
//! host event loop calls [`store::VectorStore::flush_idle`].

pub mod chain;
pub mod expr;
pub mod index;
pub mod store;
