//! Local drawing engine for a collaborative room.
//!
//! This crate is compiled to WebAssembly and runs in the browser. It turns raw
//! pointer input into shape operations, keeps the client's local shape list in
//! step with what the room broadcasts, and redraws the whole scene after every
//! state change. The host JavaScript layer only wires DOM events and the
//! websocket to the engine and forwards the returned [`engine::Action`]s.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Top-level engine and testable [`engine::EngineCore`] |
//! | [`input`] | Tools, UI state and the gesture state machine |
//! | [`hit`] | Eraser hit-testing and deletion-set resolution |
//! | [`geom`] | Points, segment distance and box containment |
//! | [`render`] | Scene drawing through the [`render::Surface`] seam |
//! | [`consts`] | Shared numeric constants (eraser threshold, stroke width) |

pub mod consts;
pub mod engine;
pub mod geom;
pub mod hit;
pub mod input;
pub mod render;
