use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use super::{Action, CommandListener, CommandManager, Completion, ListenerID, Listeners};
use crate::{
    commands::{Command, CommandError},
    state::SharedLayerModel,
};

enum Job {
    Execute(Command),
    Undo,
    Redo,
}
impl Job {
    fn into_rejection(self) -> Completion {
        let (action, command) = match self {
            Self::Execute(command) => (Action::Execute, Some(command)),
            Self::Undo => (Action::Undo, None),
            Self::Redo => (Action::Redo, None),
        };
        Completion {
            action,
            command,
            result: Err(CommandError::ShutDown),
        }
    }
}

/// Marks one job finished when dropped, even if it unwound.
struct PendingGuard<'a>(&'a AtomicUsize);
impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Wraps another manager, running all of its work on a single background thread.
///
/// Submitting never blocks. Jobs are drained in FIFO order, one at a time, and every listener is
/// notified from the worker thread once each finishes. Dropping the manager finishes all
/// outstanding work before returning.
pub struct AsyncCommandManager<M: CommandManager + 'static> {
    inner: Arc<M>,
    listeners: Arc<Listeners>,
    /// None once shut down.
    sender: parking_lot::Mutex<Option<crossbeam::channel::Sender<Job>>>,
    /// Jobs submitted but not yet finished.
    pending: Arc<AtomicUsize>,
    worker: parking_lot::Mutex<Option<std::thread::JoinHandle<()>>>,
}
impl<M: CommandManager + 'static> AsyncCommandManager<M> {
    /// Start the worker thread for `inner`.
    ///
    /// Listeners already registered on `inner` keep working, but will be called from the worker.
    pub fn new(inner: M) -> std::io::Result<Self> {
        let inner = Arc::new(inner);
        let listeners = Arc::new(Listeners::default());
        // Completions from the inner manager are reported through our own listeners,
        // so that rejections on shutdown reach the same place.
        let forward = Arc::clone(&listeners);
        inner.add_command_listener(Arc::new(move |completion: &Completion| {
            forward.notify(completion);
        }));

        let (sender, receiver) = crossbeam::channel::unbounded::<Job>();
        let pending = Arc::new(AtomicUsize::new(0));
        let worker = {
            let inner = Arc::clone(&inner);
            let pending = Arc::clone(&pending);
            std::thread::Builder::new()
                .name("Command worker".to_owned())
                .spawn(move || {
                    // Ends once every sender is dropped and the queue is drained.
                    for job in receiver {
                        let _pending = PendingGuard(&pending);
                        let run = std::panic::AssertUnwindSafe(|| match job {
                            Job::Execute(command) => inner.add_command(command),
                            Job::Undo => inner.undo(),
                            Job::Redo => inner.redo(),
                        });
                        // Keep draining, the rest of the queue is still owed its completions.
                        if std::panic::catch_unwind(run).is_err() {
                            log::error!("Command worker job panicked");
                        }
                    }
                    log::debug!("Command worker finished");
                })?
        };

        Ok(Self {
            inner,
            listeners,
            sender: parking_lot::Mutex::new(Some(sender)),
            pending,
            worker: parking_lot::Mutex::new(Some(worker)),
        })
    }
    /// The wrapped manager.
    #[must_use]
    pub fn inner(&self) -> &M {
        &self.inner
    }
    /// Stop accepting work, finish everything already submitted, and join the worker.
    /// Work submitted afterwards is reported to listeners as [`CommandError::ShutDown`].
    pub fn shutdown(&self) {
        // Dropping the last sender lets the worker fall out of its loop after draining.
        drop(self.sender.lock().take());
        let Some(worker) = self.worker.lock().take() else {
            return;
        };
        // A listener dropping us from the worker itself can't wait on itself.
        if worker.thread().id() == std::thread::current().id() {
            return;
        }
        if worker.join().is_err() {
            log::error!("Command worker panicked");
        }
    }
    fn submit(&self, job: Job) {
        let rejected = {
            // Held across the send so concurrent submitters can't interleave out of order
            // with a shutdown.
            let sender = self.sender.lock();
            match sender.as_ref() {
                Some(sender) => {
                    self.pending.fetch_add(1, Ordering::AcqRel);
                    sender.send(job).err().map(|e| {
                        self.pending.fetch_sub(1, Ordering::AcqRel);
                        e.into_inner()
                    })
                }
                None => Some(job),
            }
        };
        if let Some(job) = rejected {
            let completion = job.into_rejection();
            log::warn!(
                "{} rejected after shutdown: {:?}",
                completion.action.as_ref(),
                completion.command
            );
            self.listeners.notify(&completion);
        }
    }
}
impl<M: CommandManager + 'static> CommandManager for AsyncCommandManager<M> {
    fn add_command(&self, command: Command) {
        self.submit(Job::Execute(command));
    }
    fn add_command_listener(&self, listener: Arc<dyn CommandListener>) -> ListenerID {
        self.listeners.add(listener)
    }
    fn remove_command_listener(&self, id: ListenerID) -> bool {
        self.listeners.remove(id)
    }
    fn undo(&self) {
        self.submit(Job::Undo);
    }
    fn redo(&self) {
        self.submit(Job::Redo);
    }
    /// Reflects the inner manager as of the last finished job, not counting queued ones.
    fn is_undo_available(&self) -> bool {
        self.inner.is_undo_available()
    }
    /// Reflects the inner manager as of the last finished job, not counting queued ones.
    fn is_redo_available(&self) -> bool {
        self.inner.is_redo_available()
    }
    /// May still read `true` for a moment after the last completion has been reported.
    fn is_busy(&self) -> bool {
        self.pending.load(Ordering::Acquire) > 0 || self.inner.is_busy()
    }
    fn layer_model(&self) -> &SharedLayerModel {
        self.inner.layer_model()
    }
}
impl<M: CommandManager + 'static> Drop for AsyncCommandManager<M> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use super::*;
    use crate::{
        color::Color,
        commands::{CommandFactory, DefaultCommandFactory},
        config::EngineConfig,
        queue::{channel_listener, DefaultCommandManager},
        state::{Layer, LayerID, LayerModel},
    };

    const LAYER_WIDTH: u32 = 200;
    const LAYER_HEIGHT: u32 = 200;
    const TIMEOUT: Duration = Duration::from_secs(1);

    struct Fixture {
        factory: DefaultCommandFactory,
        manager: AsyncCommandManager<DefaultCommandManager>,
        model: SharedLayerModel,
    }
    fn set_up() -> Fixture {
        let mut model = LayerModel::new(LAYER_WIDTH, LAYER_HEIGHT);
        let layer = Layer::new(image::RgbaImage::new(LAYER_WIDTH, LAYER_HEIGHT));
        let id = layer.id();
        model.add_layer_at(0, layer).unwrap();
        model.set_current_layer(id);
        let model = model.into_shared();

        let inner = DefaultCommandManager::new(model.clone(), &EngineConfig::default());
        Fixture {
            factory: DefaultCommandFactory,
            manager: AsyncCommandManager::new(inner).unwrap(),
            model,
        }
    }
    fn id_at(model: &SharedLayerModel, index: usize) -> Option<LayerID> {
        model.read().layer_at(index).map(Layer::id)
    }

    #[test]
    fn create_many_layers() {
        let Fixture {
            factory,
            manager,
            model,
        } = set_up();
        let (listener, completions) = channel_listener();
        manager.add_command_listener(listener);
        for _ in 0..10 {
            manager.add_command(factory.create_add_empty_layer_command());
            manager.add_command(factory.create_remove_layer_command(1));
        }
        for _ in 0..20 {
            let completion = completions.recv_timeout(TIMEOUT).unwrap();
            assert!(completion.is_ok(), "{completion:?}");
        }
        assert_eq!(model.read().layer_count(), 1);
        // Each completion exactly once.
        assert!(completions.recv_timeout(Duration::from_millis(50)).is_err());
    }
    #[test]
    fn move_layer() {
        let Fixture {
            factory,
            manager,
            model,
        } = set_up();
        let (listener, completions) = channel_listener();
        manager.add_command_listener(listener);
        manager.add_command(factory.create_add_empty_layer_command());

        completions.recv_timeout(TIMEOUT).unwrap();
        assert_eq!(model.read().layer_count(), 2);
        let first = id_at(&model, 0);
        let second = id_at(&model, 1);

        manager.add_command(factory.create_reorder_layers_command(0, 1));

        completions.recv_timeout(TIMEOUT).unwrap();
        assert_eq!(model.read().layer_count(), 2);
        assert_eq!(id_at(&model, 0), second);
        assert_eq!(id_at(&model, 1), first);
    }
    #[test]
    fn merge_layers() {
        let Fixture {
            factory,
            manager,
            model,
        } = set_up();
        let (listener, completions) = channel_listener();
        let first = {
            let mut model = model.write();
            let first = model.layer_at_mut(0).unwrap();
            first.set_pixel(1, 1, Color::BLACK);
            first.set_pixel(1, 2, Color::BLACK);
            first.id()
        };
        manager.add_command_listener(listener);
        manager.add_command(factory.create_add_empty_layer_command());
        completions.recv_timeout(TIMEOUT).unwrap();

        {
            let mut model = model.write();
            let second_id = model.layer_at(0).map(Layer::id);
            assert_eq!(model.current_layer_id(), second_id);
            let second = model.layer_at_mut(0).unwrap();
            second.set_pixel(1, 1, Color::BLUE);
            second.set_pixel(2, 1, Color::BLUE);
        }

        manager.add_command(factory.create_merge_layers_command(0, 1));
        completions.recv_timeout(TIMEOUT).unwrap();

        let model = model.read();
        assert_eq!(model.layer_count(), 1);
        assert_eq!(model.current_layer_id(), Some(first));
        let merged = model.layer_at(0).unwrap();
        assert_eq!(merged.id(), first);
        assert_eq!(merged.pixel(1, 2), Some(Color::BLACK));
        assert_eq!(merged.pixel(2, 1), Some(Color::BLUE));
        assert_eq!(merged.pixel(1, 1), Some(Color::BLUE));
    }
    #[test]
    fn completions_arrive_in_submission_order() {
        let Fixture {
            factory, manager, ..
        } = set_up();
        let (listener, completions) = channel_listener();
        manager.add_command_listener(listener);
        let submitted: Vec<_> = (0..5)
            .flat_map(|_| {
                [
                    factory.create_add_empty_layer_command(),
                    factory.create_reorder_layers_command(0, 1),
                    factory.create_set_visible_command(0, false),
                ]
            })
            .collect();
        for command in &submitted {
            manager.add_command(command.clone());
        }
        let seen: Vec<_> = (0..submitted.len())
            .map(|_| completions.recv_timeout(TIMEOUT).unwrap().command.unwrap())
            .collect();
        assert_eq!(seen, submitted);
    }
    #[test]
    fn undo_through_queue() {
        let Fixture {
            factory,
            manager,
            model,
        } = set_up();
        let (listener, completions) = channel_listener();
        manager.add_command_listener(listener);
        let original = id_at(&model, 0);
        manager.add_command(factory.create_add_empty_layer_command());
        manager.undo();
        manager.redo();
        manager.undo();
        let actions: Vec<_> = (0..4)
            .map(|_| {
                let completion = completions.recv_timeout(TIMEOUT).unwrap();
                assert!(completion.is_ok());
                completion.action
            })
            .collect();
        assert_eq!(
            actions,
            [Action::Execute, Action::Undo, Action::Redo, Action::Undo]
        );
        assert_eq!(model.read().layer_count(), 1);
        assert_eq!(id_at(&model, 0), original);
        assert!(manager.is_redo_available());
    }
    #[test]
    fn panicking_listener_does_not_stall_queue() {
        let Fixture {
            factory,
            manager,
            model,
        } = set_up();
        let panicked = std::sync::atomic::AtomicBool::new(false);
        manager.add_command_listener(Arc::new(move |_: &Completion| {
            if !panicked.swap(true, Ordering::AcqRel) {
                panic!("listener failure");
            }
        }));
        let (listener, completions) = channel_listener();
        manager.add_command_listener(listener);

        for _ in 0..5 {
            manager.add_command(factory.create_add_empty_layer_command());
        }
        for _ in 0..5 {
            let completion = completions.recv_timeout(TIMEOUT).unwrap();
            assert!(completion.is_ok(), "{completion:?}");
        }
        assert_eq!(model.read().layer_count(), 6);

        // The worker is still alive and taking work.
        manager.add_command(factory.create_remove_layer_command(0));
        let completion = completions.recv_timeout(TIMEOUT).unwrap();
        assert_eq!(completion.result, Ok(()));

        manager.shutdown();
        assert!(!manager.is_busy());
        assert_eq!(model.read().layer_count(), 5);
    }
    #[test]
    fn shutdown_drains_then_rejects() {
        let Fixture {
            factory,
            manager,
            model,
        } = set_up();
        let (listener, completions) = channel_listener();
        manager.add_command_listener(listener);
        for _ in 0..3 {
            manager.add_command(factory.create_add_empty_layer_command());
        }
        manager.shutdown();
        // Everything submitted before shutdown ran.
        assert_eq!(model.read().layer_count(), 4);
        assert!(!manager.is_busy());
        assert_eq!(completions.try_iter().count(), 3);

        manager.add_command(factory.create_add_empty_layer_command());
        let rejected = completions.try_recv().unwrap();
        assert_eq!(rejected.result, Err(CommandError::ShutDown));
        assert_eq!(model.read().layer_count(), 4);
    }
}
