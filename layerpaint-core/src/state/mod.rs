//! # State
//!
//! The layer stack of a document, and the records of changes applied to it.

pub mod commands;
mod layer;
mod model;

pub use layer::{Layer, LayerID};
pub use model::{LayerModel, SharedLayerModel};
