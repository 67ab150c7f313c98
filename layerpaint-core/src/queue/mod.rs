//! Command Queue
//!
//! Command managers take [`Command`]s from the application, execute them against the shared
//! [`LayerModel`](crate::state::LayerModel), keep the undo/redo history, and tell listeners once
//! each piece of work has completed.
//!
//! [`DefaultCommandManager`] does all of this on the calling thread. [`AsyncCommandManager`] wraps
//! any manager and moves the work onto a single worker thread, so submitting never blocks. Either
//! way, work completes in the order it was submitted and every listener hears about every
//! completion exactly once - including commands that failed, which leave the model untouched.

mod async_manager;
mod default_manager;
pub mod history;

use std::sync::Arc;

pub use async_manager::AsyncCommandManager;
pub use default_manager::DefaultCommandManager;

use crate::{
    commands::{Command, CommandError},
    state::SharedLayerModel,
};

pub type ListenerID = crate::UniqueID<Listeners>;

/// What kind of work completed.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, strum::AsRefStr)]
pub enum Action {
    Execute,
    Undo,
    Redo,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Completion {
    pub action: Action,
    /// The command that was executed. None for undo and redo.
    pub command: Option<Command>,
    /// Err if nothing was applied. The model is unchanged in that case.
    pub result: Result<(), CommandError>,
}
impl Completion {
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Observer of completed work. Called from whichever thread did the work.
pub trait CommandListener: Send + Sync {
    fn command_post_execute(&self, completion: &Completion);
}
impl<F> CommandListener for F
where
    F: Fn(&Completion) + Send + Sync,
{
    fn command_post_execute(&self, completion: &Completion) {
        self(completion);
    }
}

/// Create a listener that forwards every completion into a channel.
#[must_use]
pub fn channel_listener() -> (
    Arc<dyn CommandListener>,
    crossbeam::channel::Receiver<Completion>,
) {
    let (send, recv) = crossbeam::channel::unbounded();
    let listener: Arc<dyn CommandListener> = Arc::new(move |completion: &Completion| {
        // Receiver gone means nobody cares anymore.
        let _ = send.send(completion.clone());
    });
    (listener, recv)
}

pub trait CommandManager: Send + Sync {
    /// Submit a command. Its completion is reported to listeners.
    fn add_command(&self, command: Command);
    fn add_command_listener(&self, listener: Arc<dyn CommandListener>) -> ListenerID;
    /// Returns `false` if no such listener was registered.
    fn remove_command_listener(&self, id: ListenerID) -> bool;
    /// Revert the most recent applied command. Completion is reported to listeners.
    fn undo(&self);
    /// Re-apply the most recently undone command. Completion is reported to listeners.
    fn redo(&self);
    fn is_undo_available(&self) -> bool;
    fn is_redo_available(&self) -> bool;
    /// Whether submitted work is still outstanding.
    fn is_busy(&self) -> bool;
    fn layer_model(&self) -> &SharedLayerModel;
}

/// Set of registered listeners.
#[derive(Default)]
pub struct Listeners {
    // Usually one or two: the UI, and maybe a persistence layer.
    listeners: parking_lot::RwLock<smallvec::SmallVec<[(ListenerID, Arc<dyn CommandListener>); 2]>>,
}
impl Listeners {
    pub fn add(&self, listener: Arc<dyn CommandListener>) -> ListenerID {
        let id = ListenerID::next();
        self.listeners.write().push((id, listener));
        id
    }
    pub fn remove(&self, id: ListenerID) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() != before
    }
    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.read().is_empty()
    }
    /// Call every listener, in registration order.
    ///
    /// A panicking listener is logged and skipped, the rest still hear about the completion.
    pub fn notify(&self, completion: &Completion) {
        // Snapshot, so listeners may (un)register from within the callback without deadlocking.
        let listeners: smallvec::SmallVec<[Arc<dyn CommandListener>; 2]> = self
            .listeners
            .read()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            let notify = std::panic::AssertUnwindSafe(|| listener.command_post_execute(completion));
            if std::panic::catch_unwind(notify).is_err() {
                log::error!(
                    "Listener panicked on {} of {:?}",
                    completion.action.as_ref(),
                    completion.command
                );
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    #[test]
    fn listeners_add_remove() {
        let listeners = Listeners::default();
        let (listener, recv) = channel_listener();
        let id = listeners.add(listener.clone());
        let other = listeners.add(listener);
        assert_eq!(listeners.len(), 2);

        let completion = Completion {
            action: Action::Undo,
            command: None,
            result: Err(CommandError::NothingToUndo),
        };
        listeners.notify(&completion);
        assert_eq!(recv.try_iter().count(), 2);

        assert!(listeners.remove(id));
        assert!(!listeners.remove(id));
        listeners.notify(&completion);
        assert_eq!(recv.try_recv().unwrap(), completion);
        assert!(recv.try_recv().is_err());
        assert!(listeners.remove(other));
        assert!(listeners.is_empty());
    }
    #[test]
    fn panicking_listener_isolated() {
        let listeners = Listeners::default();
        listeners.add(Arc::new(|_: &Completion| panic!("listener failure")));
        let (listener, recv) = channel_listener();
        listeners.add(listener);

        let completion = Completion {
            action: Action::Redo,
            command: None,
            result: Err(CommandError::NothingToRedo),
        };
        listeners.notify(&completion);
        listeners.notify(&completion);
        assert_eq!(recv.try_iter().count(), 2);
    }
}
