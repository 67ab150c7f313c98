//! Layer stack and command engine for a raster paint application.
//!
//! The [`state::LayerModel`] holds the ordered stack of layers. Structural changes to it are
//! described by [`commands::Command`]s, built by a [`commands::CommandFactory`] and run by a
//! [`queue::CommandManager`], which keeps the undo history and reports every completion to its
//! listeners.

pub mod blend;
pub mod color;
pub mod commands;
pub mod config;
pub mod id;
pub mod queue;
pub mod state;

pub use id::UniqueID;
