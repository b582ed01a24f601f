//! Core types for Dirbridge

mod user;

pub use user::*;
