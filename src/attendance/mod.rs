//! QR-code attendance: day-scoped check-in tokens and the per-day
//! check-in/check-out state machine.

pub mod clock;
pub mod error;
pub mod mysql;
pub mod service;
pub mod state;
pub mod store;
pub mod token;
