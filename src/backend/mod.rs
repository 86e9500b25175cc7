//! Laudiolin backend client and live session

pub mod client;
pub mod models;
pub mod session;

pub use client::LaudiolinClient;
pub use models::*;
pub use session::UserSession;
