//! Chat session orchestration
//!
//! Information Hiding:
//! - Turn sequencing (extract, retrieve, stream, save) is internal to the controller
//! - Callers observe the transcript and the session state only

pub mod controller;

pub use controller::{ChatController, SendOutcome, SessionState};
