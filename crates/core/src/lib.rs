//! Domain types for the virtual model studio.
//!
//! Pure data and rules: image payloads, reference asset slots, the undo/redo
//! history, and the traits through which a session reaches the outside
//! world. Nothing here knows about HTTP or a particular image service.

pub mod assets;
pub mod backend;
pub mod error;
pub mod history;
pub mod image_asset;
pub mod types;
