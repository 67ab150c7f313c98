//! Sessions: scripted lists of layer operations, read from TOML.
//!
//! ```toml
//! [[op]]
//! kind = "add_empty_layer"
//! [[op]]
//! kind = "set_blend"
//! index = 0
//! blend = { mode = "multiply", opacity = 0.5 }
//! [[op]]
//! kind = "merge_layers"
//! top = 0
//! bottom = 1
//! [[op]]
//! kind = "undo"
//! ```

use layerpaint_core::{
    blend::Blend,
    commands::CommandFactory,
    queue::{channel_listener, CommandManager, Completion},
};

#[derive(Clone, Debug, PartialEq, serde::Deserialize, strum::AsRefStr)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Op {
    AddEmptyLayer,
    RemoveLayer { index: usize },
    ReorderLayers { from: usize, to: usize },
    MergeLayers { top: usize, bottom: usize },
    SetBlend { index: usize, blend: Blend },
    SetVisible { index: usize, visible: bool },
    Undo,
    Redo,
}
impl Op {
    fn submit<M>(&self, factory: &impl CommandFactory, manager: &M)
    where
        M: CommandManager + ?Sized,
    {
        let command = match *self {
            Self::AddEmptyLayer => factory.create_add_empty_layer_command(),
            Self::RemoveLayer { index } => factory.create_remove_layer_command(index),
            Self::ReorderLayers { from, to } => factory.create_reorder_layers_command(from, to),
            Self::MergeLayers { top, bottom } => factory.create_merge_layers_command(top, bottom),
            Self::SetBlend { index, blend } => factory.create_set_blend_command(index, blend),
            Self::SetVisible { index, visible } => {
                factory.create_set_visible_command(index, visible)
            }
            Self::Undo => return manager.undo(),
            Self::Redo => return manager.redo(),
        };
        manager.add_command(command);
    }
}

#[derive(Clone, Debug, Default, PartialEq, serde::Deserialize)]
pub struct Session {
    #[serde(rename = "op", default)]
    pub ops: Vec<Op>,
}
impl Session {
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        let string = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&string)?)
    }
    /// Submit every op in order, then wait for all of them to complete.
    ///
    /// Completions are returned in the order they were reported, which is submission order.
    pub fn run<M>(
        &self,
        factory: &impl CommandFactory,
        manager: &M,
    ) -> anyhow::Result<Vec<Completion>>
    where
        M: CommandManager + ?Sized,
    {
        let (listener, completions) = channel_listener();
        let listener = manager.add_command_listener(listener);
        for op in &self.ops {
            log::trace!("Submitting {}", op.as_ref());
            op.submit(factory, manager);
        }
        let finished = (0..self.ops.len())
            .map(|_| completions.recv())
            .collect::<Result<Vec<_>, _>>();
        manager.remove_command_listener(listener);
        Ok(finished?)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use layerpaint_core::{
        blend::BlendMode,
        commands::{CommandError, DefaultCommandFactory},
        config::EngineConfig,
        queue::{Action, AsyncCommandManager, DefaultCommandManager},
        state::{Layer, LayerModel},
    };

    const SESSION: &str = r#"
[[op]]
kind = "add_empty_layer"
[[op]]
kind = "set_blend"
index = 0
blend = { mode = "multiply", opacity = 0.5 }
[[op]]
kind = "reorder_layers"
from = 0
to = 1
[[op]]
kind = "remove_layer"
index = 9
[[op]]
kind = "undo"
"#;

    fn model() -> layerpaint_core::state::SharedLayerModel {
        let mut model = LayerModel::new(8, 8);
        let layer = Layer::empty(8, 8);
        let id = layer.id();
        model.add_layer_at(0, layer).unwrap();
        model.set_current_layer(id);
        model.into_shared()
    }
    fn config() -> EngineConfig {
        EngineConfig {
            width: 8,
            height: 8,
            ..EngineConfig::default()
        }
    }

    #[test]
    fn parse() {
        let session: Session = toml::from_str(SESSION).unwrap();
        assert_eq!(session.ops.len(), 5);
        assert_eq!(session.ops[0], Op::AddEmptyLayer);
        assert_eq!(
            session.ops[1],
            Op::SetBlend {
                index: 0,
                blend: Blend {
                    mode: BlendMode::Multiply,
                    opacity: 0.5
                }
            }
        );
        assert_eq!(session.ops[4], Op::Undo);
        assert_eq!(toml::from_str::<Session>("").unwrap(), Session::default());
        assert!(toml::from_str::<Session>("[[op]]\nkind = \"paint\"").is_err());
    }
    #[test]
    fn run_sync() {
        let session: Session = toml::from_str(SESSION).unwrap();
        let manager = DefaultCommandManager::new(model(), &config());
        let completions = session.run(&DefaultCommandFactory, &manager).unwrap();
        let results: Vec<_> = completions.iter().map(|c| c.result.clone()).collect();
        assert_eq!(
            results,
            [
                Ok(()),
                Ok(()),
                Ok(()),
                Err(CommandError::IndexOutOfRange { index: 9, count: 2 }),
                Ok(()),
            ]
        );
        // The undo reverted the reorder, not the failed removal.
        let model = manager.layer_model().read();
        assert_eq!(model.layer_at(0).unwrap().blend.mode, BlendMode::Multiply);
    }
    #[test]
    fn run_async() {
        let session: Session = toml::from_str(SESSION).unwrap();
        let manager =
            AsyncCommandManager::new(DefaultCommandManager::new(model(), &config())).unwrap();
        let completions = session.run(&DefaultCommandFactory, &manager).unwrap();
        let actions: Vec<_> = completions.iter().map(|c| c.action).collect();
        assert_eq!(
            actions,
            [
                Action::Execute,
                Action::Execute,
                Action::Execute,
                Action::Execute,
                Action::Undo
            ]
        );
        assert_eq!(manager.layer_model().read().layer_count(), 2);
        assert!(manager.is_redo_available());
    }
}
