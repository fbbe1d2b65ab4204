//! Diacritics pipeline - end-to-end restoration of Romanian diacritics.
//!
//! This crate ties the pieces together: problematic span handling,
//! chunking, cleaning, feature batches, model inference and reassembly
//! of the original text with predicted diacritics.

mod restorer;
mod spans;
mod text;

pub use diac_core::RestoreMode;
pub use restorer::DiacriticsRestorer;
pub use spans::{excise_spans, find_problematic_spans, reinsert_spans};
pub use text::{clean_chunk, reassemble, CleanedChunk, Reassembled};
