//! Domain services used by websocket and HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own room semantics and persistence so route handlers can
//! stay focused on protocol translation and auth plumbing.

pub mod auth;
pub mod persistence;
pub mod room;
pub mod store;
