//! laudiolin - Laudiolin client core with offline library mirroring

pub mod backend;
pub mod offline;
pub mod settings;
pub mod utils;
