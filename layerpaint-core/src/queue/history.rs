//! Linear undo/redo history of applied [`LayerCommand`]s.

use crate::{
    commands::{CommandConsumer, CommandError, DoUndo, LayerCommand},
    state::LayerModel,
};

pub struct History {
    /// Oldest first.
    done: std::collections::VecDeque<LayerCommand>,
    /// Most recently undone last.
    undone: Vec<LayerCommand>,
    limit: usize,
}
impl History {
    /// A history remembering at most `limit` undoable commands.
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            done: std::collections::VecDeque::new(),
            undone: Vec::new(),
            limit,
        }
    }
    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.done.is_empty()
    }
    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.undone.is_empty()
    }
    /// Number of undoable commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.done.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.done.is_empty()
    }
    /// Record a freshly applied command. Discards the redo branch, and the oldest entry if over the limit.
    pub fn push(&mut self, record: LayerCommand, model: &mut LayerModel) {
        for discarded in self.undone.drain(..) {
            if let Some(id) = discarded.detached_while_undone() {
                model.forget_detached(id);
            }
        }
        self.done.push_back(record);
        while self.done.len() > self.limit {
            let Some(oldest) = self.done.pop_front() else {
                break;
            };
            if let Some(id) = oldest.detached_while_done() {
                model.forget_detached(id);
            }
        }
    }
    /// Revert the newest applied command.
    ///
    /// If the model no longer matches the history (it was restructured behind the history's back),
    /// the whole history is dropped, as none of it can be trusted.
    pub fn undo(&mut self, model: &mut LayerModel) -> Result<(), CommandError> {
        let record = self.done.back().ok_or(CommandError::NothingToUndo)?;
        if let Err(e) = model.apply(DoUndo::Undo(record)) {
            log::warn!("History out of sync with the layer model ({e}), clearing.");
            self.clear(model);
            return Err(e);
        }
        if let Some(record) = self.done.pop_back() {
            self.undone.push(record);
        }
        Ok(())
    }
    /// Re-apply the most recently undone command.
    pub fn redo(&mut self, model: &mut LayerModel) -> Result<(), CommandError> {
        let record = self.undone.last().ok_or(CommandError::NothingToRedo)?;
        if let Err(e) = model.apply(DoUndo::Do(record)) {
            log::warn!("History out of sync with the layer model ({e}), clearing.");
            self.clear(model);
            return Err(e);
        }
        if let Some(record) = self.undone.pop() {
            self.done.push_back(record);
        }
        Ok(())
    }
    /// Forget everything, releasing any layers only the history was keeping alive.
    pub fn clear(&mut self, model: &mut LayerModel) {
        for record in self.done.drain(..) {
            if let Some(id) = record.detached_while_done() {
                model.forget_detached(id);
            }
        }
        for record in self.undone.drain(..) {
            if let Some(id) = record.detached_while_undone() {
                model.forget_detached(id);
            }
        }
    }
}
