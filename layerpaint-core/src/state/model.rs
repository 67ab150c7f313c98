use super::{commands::Command, Layer, LayerID};
use crate::commands::{CommandConsumer, CommandError, DoUndo};

/// The model as shared between the thread executing commands and everyone observing it.
pub type SharedLayerModel = std::sync::Arc<parking_lot::RwLock<LayerModel>>;

/// Ordered stack of layers, index 0 being the topmost, plus the "current" layer tools draw into.
///
/// Out-of-range indices never panic - they're reported through the `Option`/`Result` of the
/// operation, and the model is left as it was.
pub struct LayerModel {
    width: u32,
    height: u32,
    stack: Vec<Layer>,
    /// Layers taken off the stack by a command that may yet be undone (or an undone creation
    /// that may yet be redone). Owned here so the history can stay `Clone` and cheap.
    detached: hashbrown::HashMap<LayerID, Layer>,
    /// Always a member of `stack` when `Some`.
    current: Option<LayerID>,
}
impl LayerModel {
    /// An empty model, creating new layers at the given size.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            stack: Vec::new(),
            detached: hashbrown::HashMap::new(),
            current: None,
        }
    }
    #[must_use]
    pub fn into_shared(self) -> SharedLayerModel {
        std::sync::Arc::new(parking_lot::RwLock::new(self))
    }
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }
    /// Width of layers created from now on. Existing layers keep their size.
    pub fn set_width(&mut self, width: u32) {
        self.width = width;
    }
    /// Height of layers created from now on. Existing layers keep their size.
    pub fn set_height(&mut self, height: u32) {
        self.height = height;
    }
    #[must_use]
    pub fn layer_count(&self) -> usize {
        self.stack.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }
    #[must_use]
    pub fn layer_at(&self, index: usize) -> Option<&Layer> {
        self.stack.get(index)
    }
    pub fn layer_at_mut(&mut self, index: usize) -> Option<&mut Layer> {
        self.stack.get_mut(index)
    }
    #[must_use]
    pub fn index_of(&self, id: LayerID) -> Option<usize> {
        self.stack.iter().position(|layer| layer.id() == id)
    }
    /// Get a layer on the stack by ID.
    #[must_use]
    pub fn get(&self, id: LayerID) -> Option<&Layer> {
        self.stack.iter().find(|layer| layer.id() == id)
    }
    pub fn get_mut(&mut self, id: LayerID) -> Option<&mut Layer> {
        self.stack.iter_mut().find(|layer| layer.id() == id)
    }
    /// Iterate the stack, top to bottom.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Layer> + ExactSizeIterator + '_ {
        self.stack.iter()
    }
    /// Insert a layer such that it ends up at `index`. `index == layer_count()` appends at the bottom.
    ///
    /// Gives the layer back if the index is out of range or the layer is already in the model.
    pub fn add_layer_at(&mut self, index: usize, layer: Layer) -> Result<(), Layer> {
        if index > self.stack.len() || self.contains(layer.id()) {
            return Err(layer);
        }
        self.stack.insert(index, layer);
        Ok(())
    }
    /// Remove and return the layer at `index`, or None if out of range.
    ///
    /// If it was the current layer, the layer that takes its place becomes current
    /// (the new bottom, if the bottom was removed). Current is unset once the stack is empty.
    pub fn remove_layer_at(&mut self, index: usize) -> Option<Layer> {
        if index >= self.stack.len() {
            return None;
        }
        let layer = self.stack.remove(index);
        if self.current == Some(layer.id()) {
            self.current = self
                .stack
                .get(index)
                .or_else(|| self.stack.last())
                .map(Layer::id);
        }
        Some(layer)
    }
    #[must_use]
    pub fn current_layer(&self) -> Option<&Layer> {
        self.get(self.current?)
    }
    pub fn current_layer_mut(&mut self) -> Option<&mut Layer> {
        let current = self.current?;
        self.get_mut(current)
    }
    #[must_use]
    pub fn current_layer_id(&self) -> Option<LayerID> {
        self.current
    }
    /// Make the given layer current. Returns `false` and leaves current as-is if it isn't on the stack.
    pub fn set_current_layer(&mut self, id: LayerID) -> bool {
        if self.index_of(id).is_some() {
            self.current = Some(id);
            true
        } else {
            false
        }
    }
    pub fn clear_current_layer(&mut self) {
        self.current = None;
    }
    /// Number of layers held off-stack for the command history.
    #[must_use]
    pub fn detached_count(&self) -> usize {
        self.detached.len()
    }
    /// Flatten all visible layers, bottom to top, onto a transparent canvas of the model's size.
    /// Layers of a different size are skipped.
    #[must_use]
    pub fn composite(&self) -> image::RgbaImage {
        let mut canvas = image::RgbaImage::new(self.width, self.height);
        for layer in self.stack.iter().rev().filter(|layer| layer.visible) {
            if let Err(e) = layer.blend.composite_image(&mut canvas, layer.surface()) {
                log::warn!("skipping {} in composite: {e}", layer.id());
            }
        }
        canvas
    }
}
// Crate-private helpers for command execution.
impl LayerModel {
    fn contains(&self, id: LayerID) -> bool {
        self.index_of(id).is_some() || self.detached.contains_key(&id)
    }
    /// Hand a new layer to the model, off-stack, for a command to place.
    pub(crate) fn stage(&mut self, layer: Layer) {
        self.detached.insert(layer.id(), layer);
    }
    /// Drop an off-stack layer, once nothing can bring it back.
    pub(crate) fn forget_detached(&mut self, id: LayerID) -> Option<Layer> {
        self.detached.remove(&id)
    }
    /// Check that `id` sits at `index`, differentiating a stale command from an unknown layer.
    fn expect_at(&self, index: usize, id: LayerID) -> Result<(), CommandError> {
        match self.stack.get(index) {
            Some(layer) if layer.id() == id => Ok(()),
            _ if self.contains(id) => Err(CommandError::MismatchedState),
            _ => Err(CommandError::UnknownLayer),
        }
    }
    fn expect_detached(&self, id: LayerID) -> Result<(), CommandError> {
        if self.detached.contains_key(&id) {
            Ok(())
        } else if self.index_of(id).is_some() {
            Err(CommandError::MismatchedState)
        } else {
            Err(CommandError::UnknownLayer)
        }
    }
    /// Whether `current` would be valid once `joining` is on the stack (and `leaving` is not).
    fn valid_current(
        &self,
        current: Option<LayerID>,
        joining: Option<LayerID>,
        leaving: Option<LayerID>,
    ) -> bool {
        match current {
            None => true,
            Some(id) if Some(id) == leaving => false,
            Some(id) => Some(id) == joining || self.index_of(id).is_some(),
        }
    }
    /// Move a layer from the stack to the detached pool.
    fn detach_at(&mut self, index: usize) -> Result<(), CommandError> {
        let layer = self
            .remove_layer_at(index)
            .ok_or(CommandError::MismatchedState)?;
        self.detached.insert(layer.id(), layer);
        Ok(())
    }
    /// Move a layer from the detached pool onto the stack.
    fn attach_at(&mut self, index: usize, id: LayerID) -> Result<(), CommandError> {
        let layer = self
            .detached
            .remove(&id)
            .ok_or(CommandError::UnknownLayer)?;
        if let Err(layer) = self.add_layer_at(index, layer) {
            self.detached.insert(id, layer);
            return Err(CommandError::MismatchedState);
        }
        Ok(())
    }
}

impl CommandConsumer<Command> for LayerModel {
    // Every arm validates fully before touching anything, so an error leaves the model as it was.
    fn apply(&mut self, command: DoUndo<'_, Command>) -> Result<(), CommandError> {
        match command {
            DoUndo::Do(Command::Created { target, index, .. }) => {
                self.expect_detached(*target)?;
                if *index > self.stack.len() {
                    return Err(CommandError::MismatchedState);
                }
                self.attach_at(*index, *target)?;
                self.current = Some(*target);
                Ok(())
            }
            DoUndo::Undo(Command::Created {
                target,
                index,
                previous_current,
            }) => {
                self.expect_at(*index, *target)?;
                if !self.valid_current(*previous_current, None, Some(*target)) {
                    return Err(CommandError::MismatchedState);
                }
                self.detach_at(*index)?;
                self.current = *previous_current;
                Ok(())
            }
            DoUndo::Do(Command::Removed { target, index, .. }) => {
                self.expect_at(*index, *target)?;
                self.detach_at(*index)
            }
            DoUndo::Undo(Command::Removed {
                target,
                index,
                previous_current,
            }) => {
                self.expect_detached(*target)?;
                if *index > self.stack.len()
                    || !self.valid_current(*previous_current, Some(*target), None)
                {
                    return Err(CommandError::MismatchedState);
                }
                self.attach_at(*index, *target)?;
                self.current = *previous_current;
                Ok(())
            }
            DoUndo::Do(Command::Moved { target, from, to })
            | DoUndo::Undo(Command::Moved {
                target,
                from: to,
                to: from,
            }) => {
                self.expect_at(*from, *target)?;
                if *to >= self.stack.len() {
                    return Err(CommandError::MismatchedState);
                }
                let layer = self.stack.remove(*from);
                self.stack.insert(*to, layer);
                Ok(())
            }
            DoUndo::Do(Command::Merged {
                source,
                source_index,
                destination,
                destination_after,
                ..
            }) => {
                if source == destination {
                    return Err(CommandError::MismatchedState);
                }
                self.expect_at(*source_index, *source)?;
                let Some(dest) = self.get(*destination) else {
                    return Err(self.missing(*destination));
                };
                if dest.surface().dimensions() != destination_after.dimensions() {
                    return Err(CommandError::MismatchedState);
                }
                self.detach_at(*source_index)?;
                if let Some(dest) = self.get_mut(*destination) {
                    dest.replace_surface(image::RgbaImage::clone(destination_after));
                }
                self.current = Some(*destination);
                Ok(())
            }
            DoUndo::Undo(Command::Merged {
                source,
                source_index,
                destination,
                destination_before,
                previous_current,
                ..
            }) => {
                self.expect_detached(*source)?;
                let Some(dest) = self.get(*destination) else {
                    return Err(self.missing(*destination));
                };
                if dest.surface().dimensions() != destination_before.dimensions()
                    || *source_index > self.stack.len()
                    || !self.valid_current(*previous_current, Some(*source), None)
                {
                    return Err(CommandError::MismatchedState);
                }
                self.attach_at(*source_index, *source)?;
                if let Some(dest) = self.get_mut(*destination) {
                    dest.replace_surface(image::RgbaImage::clone(destination_before));
                }
                self.current = *previous_current;
                Ok(())
            }
            DoUndo::Do(Command::BlendChanged { target, from, to })
            | DoUndo::Undo(Command::BlendChanged {
                target,
                from: to,
                to: from,
            }) => {
                let missing = self.missing(*target);
                let layer = self.get_mut(*target).ok_or(missing)?;
                if layer.blend != *from {
                    return Err(CommandError::MismatchedState);
                }
                layer.blend = *to;
                Ok(())
            }
            DoUndo::Do(Command::VisibilityChanged { target, visible }) => {
                self.set_visibility(*target, !*visible, *visible)
            }
            DoUndo::Undo(Command::VisibilityChanged { target, visible }) => {
                self.set_visibility(*target, *visible, !*visible)
            }
        }
    }
}
impl LayerModel {
    /// Error for a layer that should be on the stack but isn't.
    fn missing(&self, id: LayerID) -> CommandError {
        if self.detached.contains_key(&id) {
            CommandError::MismatchedState
        } else {
            CommandError::UnknownLayer
        }
    }
    fn set_visibility(&mut self, id: LayerID, from: bool, to: bool) -> Result<(), CommandError> {
        let missing = self.missing(id);
        let layer = self.get_mut(id).ok_or(missing)?;
        if layer.visible != from {
            return Err(CommandError::MismatchedState);
        }
        layer.visible = to;
        Ok(())
    }
}
