//! Record persistence.
//!
//! ## Structure
//!
//! - [`writer`] - [`RecordWriter`](writer::RecordWriter), which encodes a
//!   record and writes it (or logs it, in dry-run mode) to its destination.

pub mod writer;
