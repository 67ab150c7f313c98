use std::sync::Arc;

use super::{
    history::History, Action, CommandListener, CommandManager, Completion, ListenerID, Listeners,
};
use crate::{
    commands::{Command, CommandError},
    config::EngineConfig,
    state::{LayerModel, SharedLayerModel},
};

/// Executes commands synchronously, on the thread that submits them.
pub struct DefaultCommandManager {
    model: SharedLayerModel,
    // Always locked after the model, never before.
    history: parking_lot::Mutex<History>,
    listeners: Listeners,
    max_layers: usize,
}
impl DefaultCommandManager {
    #[must_use]
    pub fn new(model: SharedLayerModel, config: &EngineConfig) -> Self {
        Self {
            model,
            history: parking_lot::Mutex::new(History::new(config.history_limit)),
            listeners: Listeners::default(),
            max_layers: config.max_layers,
        }
    }
    /// Number of commands that can currently be undone.
    #[must_use]
    pub fn history_len(&self) -> usize {
        self.history.lock().len()
    }
    /// Drop all undo and redo state.
    pub fn clear_history(&self) {
        let mut model = self.model.write();
        self.history.lock().clear(&mut model);
    }
    fn finish(&self, completion: &Completion) {
        match &completion.result {
            Ok(()) => log::debug!(
                "{} completed: {:?}",
                completion.action.as_ref(),
                completion.command
            ),
            Err(e) => log::warn!(
                "{} rejected: {:?}: {e}",
                completion.action.as_ref(),
                completion.command
            ),
        }
        self.listeners.notify(completion);
    }
    /// Lock the model then the history for the span of the closure.
    fn with_history<T>(&self, f: impl FnOnce(&mut History, &mut LayerModel) -> T) -> T {
        let mut model = self.model.write();
        let mut history = self.history.lock();
        f(&mut history, &mut model)
    }
}
impl CommandManager for DefaultCommandManager {
    fn add_command(&self, command: Command) {
        let result = self.with_history(|history, model| {
            let record = command.execute(model, self.max_layers)?;
            log::trace!("Applied {record:?}");
            history.push(record, model);
            Ok::<_, CommandError>(())
        });
        // Locks released - listeners are free to read the model.
        self.finish(&Completion {
            action: Action::Execute,
            command: Some(command),
            result,
        });
    }
    fn add_command_listener(&self, listener: Arc<dyn CommandListener>) -> ListenerID {
        self.listeners.add(listener)
    }
    fn remove_command_listener(&self, id: ListenerID) -> bool {
        self.listeners.remove(id)
    }
    fn undo(&self) {
        let result = self.with_history(|history, model| history.undo(model));
        self.finish(&Completion {
            action: Action::Undo,
            command: None,
            result,
        });
    }
    fn redo(&self) {
        let result = self.with_history(|history, model| history.redo(model));
        self.finish(&Completion {
            action: Action::Redo,
            command: None,
            result,
        });
    }
    fn is_undo_available(&self) -> bool {
        self.history.lock().can_undo()
    }
    fn is_redo_available(&self) -> bool {
        self.history.lock().can_redo()
    }
    /// Always false - work is done by the time `add_command` returns.
    fn is_busy(&self) -> bool {
        false
    }
    fn layer_model(&self) -> &SharedLayerModel {
        &self.model
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        commands::{CommandFactory, DefaultCommandFactory},
        queue::channel_listener,
        state::Layer,
    };

    fn manager() -> DefaultCommandManager {
        let mut model = LayerModel::new(50, 50);
        let layer = Layer::empty(50, 50);
        let id = layer.id();
        model.add_layer_at(0, layer).unwrap();
        model.set_current_layer(id);
        DefaultCommandManager::new(model.into_shared(), &EngineConfig::default())
    }

    #[test]
    fn notifies_once_per_command_in_order() {
        let manager = manager();
        let factory = DefaultCommandFactory;
        let (listener, completions) = channel_listener();
        manager.add_command_listener(listener);

        manager.add_command(factory.create_add_empty_layer_command());
        manager.add_command(factory.create_remove_layer_command(7));
        manager.add_command(factory.create_reorder_layers_command(0, 1));

        let seen: Vec<_> = completions.try_iter().collect();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0].command, Some(Command::AddEmptyLayer));
        assert!(seen[0].is_ok());
        assert_eq!(
            seen[1].result,
            Err(CommandError::IndexOutOfRange { index: 7, count: 2 })
        );
        assert_eq!(seen[2].command, Some(Command::ReorderLayers { from: 0, to: 1 }));
        assert!(seen[2].is_ok());
        // The rejected command wasn't recorded.
        assert_eq!(manager.history_len(), 2);
    }
    #[test]
    fn undo_redo_notify() {
        let manager = manager();
        let (listener, completions) = channel_listener();
        let id = manager.add_command_listener(listener);

        assert!(!manager.is_undo_available());
        manager.undo();
        assert_eq!(
            completions.try_recv().unwrap().result,
            Err(CommandError::NothingToUndo)
        );

        manager.add_command(Command::AddEmptyLayer);
        assert!(manager.is_undo_available());
        manager.undo();
        assert!(manager.is_redo_available());
        assert_eq!(manager.layer_model().read().layer_count(), 1);
        manager.redo();
        assert_eq!(manager.layer_model().read().layer_count(), 2);

        let actions: Vec<_> = completions.try_iter().map(|c| c.action).collect();
        assert_eq!(actions, [Action::Execute, Action::Undo, Action::Redo]);

        assert!(manager.remove_command_listener(id));
        manager.redo();
        assert!(completions.try_recv().is_err());
    }
    #[test]
    fn listener_may_read_model() {
        let manager = Arc::new(manager());
        let weak = Arc::downgrade(&manager);
        let (send, recv) = crossbeam::channel::unbounded();
        manager.add_command_listener(Arc::new(move |_: &Completion| {
            if let Some(manager) = weak.upgrade() {
                let _ = send.send(manager.layer_model().read().layer_count());
            }
        }));
        manager.add_command(Command::AddEmptyLayer);
        assert_eq!(recv.try_recv(), Ok(2));
    }
    #[test]
    fn clear_history_releases_layers() {
        let manager = manager();
        manager.add_command(Command::AddEmptyLayer);
        manager.add_command(Command::RemoveLayer { index: 1 });
        assert_eq!(manager.layer_model().read().detached_count(), 1);
        manager.clear_history();
        assert_eq!(manager.layer_model().read().detached_count(), 0);
        assert!(!manager.is_undo_available());
    }
}
