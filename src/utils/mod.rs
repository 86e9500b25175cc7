//! Utility functions

mod filename;

pub use filename::id_to_filename;
