//! # Commands
//!
//! Commands are the way the layer stack of a document is modified. A [`Command`] describes what
//! the user asked for; executing it against a [`LayerModel`] produces a [`LayerCommand`], the record
//! of what actually changed, which the history can later undo and redo.

mod factory;

pub use factory::{CommandFactory, DefaultCommandFactory};
pub use state::commands::Command as LayerCommand;

use crate::{
    blend::{Blend, SizeMismatch},
    state::{self, Layer, LayerModel},
};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CommandError {
    #[error("layer index {index} out of range for {count} layers")]
    IndexOutOfRange { index: usize, count: usize },
    #[error("can't remove the last remaining layer")]
    LastLayer,
    #[error("layer limit of {max} reached")]
    TooManyLayers { max: usize },
    #[error("command makes no changes")]
    NoOp,
    #[error(transparent)]
    SizeMismatch(#[from] SizeMismatch),
    #[error("layer referenced by the command is not found")]
    UnknownLayer,
    #[error("command constructed for a state that does not match the current state")]
    MismatchedState,
    #[error("nothing to undo")]
    NothingToUndo,
    #[error("nothing to redo")]
    NothingToRedo,
    #[error("command manager has shut down")]
    ShutDown,
}
pub trait CommandConsumer<C> {
    /// Apply a single command. If this generates an error,
    /// the state of `self` should *not* be observably changed.
    fn apply(&mut self, command: DoUndo<'_, C>) -> Result<(), CommandError>;
}

#[derive(PartialEq, Eq, Debug)]
pub enum DoUndo<'c, T> {
    Do(&'c T),
    Undo(&'c T),
}
impl<T> Clone for DoUndo<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for DoUndo<'_, T> {}

/// A request to change the layer stack. Indices refer to the stack at the moment the command
/// executes, 0 being the topmost layer.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Insert a blank layer of the model's size on top, and make it current.
    AddEmptyLayer,
    RemoveLayer { index: usize },
    /// Move the layer at `from` so that it ends up at `to`.
    ReorderLayers { from: usize, to: usize },
    /// Composite `top` onto `bottom`, drop `top`, and make `bottom` current.
    MergeLayers { top: usize, bottom: usize },
    SetBlend { index: usize, blend: Blend },
    SetVisible { index: usize, visible: bool },
}
impl Command {
    /// Apply the command to the model, returning the record of the change.
    /// On error, the model is left untouched.
    ///
    /// `max_layers` bounds [`Command::AddEmptyLayer`].
    pub fn execute(
        &self,
        model: &mut LayerModel,
        max_layers: usize,
    ) -> Result<LayerCommand, CommandError> {
        let record = self.plan(model, max_layers)?;
        if let Err(e) = model.apply(DoUndo::Do(&record)) {
            // Don't leave a staged layer behind.
            if let Some(id) = record.detached_while_undone() {
                model.forget_detached(id);
            }
            return Err(e);
        }
        Ok(record)
    }
    /// Validate against the model and resolve indices into a record.
    /// Only [`Command::AddEmptyLayer`] touches the model, staging its new layer off-stack.
    fn plan(&self, model: &mut LayerModel, max_layers: usize) -> Result<LayerCommand, CommandError> {
        fn layer_at(model: &LayerModel, index: usize) -> Result<&Layer, CommandError> {
            model.layer_at(index).ok_or(CommandError::IndexOutOfRange {
                index,
                count: model.layer_count(),
            })
        }
        let count = model.layer_count();
        match *self {
            Self::AddEmptyLayer => {
                if count >= max_layers {
                    return Err(CommandError::TooManyLayers { max: max_layers });
                }
                let layer = Layer::empty(model.width(), model.height());
                let target = layer.id();
                let previous_current = model.current_layer_id();
                model.stage(layer);
                Ok(LayerCommand::Created {
                    target,
                    index: 0,
                    previous_current,
                })
            }
            Self::RemoveLayer { index } => {
                let target = layer_at(model, index)?.id();
                if count == 1 {
                    return Err(CommandError::LastLayer);
                }
                Ok(LayerCommand::Removed {
                    target,
                    index,
                    previous_current: model.current_layer_id(),
                })
            }
            Self::ReorderLayers { from, to } => {
                let target = layer_at(model, from)?.id();
                layer_at(model, to)?;
                if from == to {
                    return Err(CommandError::NoOp);
                }
                Ok(LayerCommand::Moved { target, from, to })
            }
            Self::MergeLayers { top, bottom } => {
                let source = layer_at(model, top)?;
                let destination = layer_at(model, bottom)?;
                if top == bottom {
                    return Err(CommandError::NoOp);
                }
                let mut merged = destination.surface().clone();
                source
                    .blend
                    .composite_image(&mut merged, source.surface())?;
                Ok(LayerCommand::Merged {
                    source: source.id(),
                    source_index: top,
                    destination: destination.id(),
                    destination_before: std::sync::Arc::new(destination.surface().clone()),
                    destination_after: std::sync::Arc::new(merged),
                    previous_current: model.current_layer_id(),
                })
            }
            Self::SetBlend { index, blend } => {
                let layer = layer_at(model, index)?;
                if layer.blend == blend {
                    return Err(CommandError::NoOp);
                }
                Ok(LayerCommand::BlendChanged {
                    target: layer.id(),
                    from: layer.blend,
                    to: blend,
                })
            }
            Self::SetVisible { index, visible } => {
                let layer = layer_at(model, index)?;
                if layer.visible == visible {
                    return Err(CommandError::NoOp);
                }
                Ok(LayerCommand::VisibilityChanged {
                    target: layer.id(),
                    visible,
                })
            }
        }
    }
}
