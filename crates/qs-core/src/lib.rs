//! # qs-core, the QUERYSCOPE data model
//!
//! Everything the synthesis engine knows how to say about a query lives
//! here: the lifecycle [`QueryEvent`] emitted by the engine, the
//! continuously-updated [`QueryRecord`] aggregate, the parsed operator
//! tree ([`PlanNode`]) and the per-fragment metric view ([`Fragment`]).
//!
//! This crate is deliberately pure: no async, no I/O, no shared state.
//! The parsers are deterministic functions of their input and are safe
//! to run in parallel across calls.

pub mod event;
pub mod fragment;
pub mod plan;
pub mod record;

pub use event::QueryEvent;
pub use fragment::Fragment;
pub use plan::PlanNode;
pub use record::QueryRecord;
