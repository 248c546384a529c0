//! Textual snapshot encoding
//!
//! Recursive values made of quoted strings, arrays (with an explicit gap
//! marker for omitted positions) and string-keyed maps. Used to persist the
//! molecule configuration inside the index.

pub mod codec;

pub use codec::{decode, encode, SnapshotError, SnapshotValue};
