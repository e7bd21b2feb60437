//! Repository functions — one function per database operation.
//!
//! No business logic, no domain types — pure SQL.  Read paths take a
//! `&DbPool`; everything on the exclusive-write path takes a
//! `&mut PgConnection` so the caller controls the transaction boundary
//! (the engine runs the whole signing cascade in one transaction).

pub mod workflows;
pub mod actions;
pub mod audit;
