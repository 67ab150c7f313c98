use super::Command;
use crate::blend::Blend;

/// Source of layer commands, so callers can be handed a factory rather than build commands inline.
pub trait CommandFactory {
    fn create_add_empty_layer_command(&self) -> Command;
    fn create_remove_layer_command(&self, index: usize) -> Command;
    fn create_reorder_layers_command(&self, from: usize, to: usize) -> Command;
    fn create_merge_layers_command(&self, top: usize, bottom: usize) -> Command;
    fn create_set_blend_command(&self, index: usize, blend: Blend) -> Command;
    fn create_set_visible_command(&self, index: usize, visible: bool) -> Command;
}

#[derive(Copy, Clone, Debug, Default)]
pub struct DefaultCommandFactory;
impl CommandFactory for DefaultCommandFactory {
    fn create_add_empty_layer_command(&self) -> Command {
        Command::AddEmptyLayer
    }
    fn create_remove_layer_command(&self, index: usize) -> Command {
        Command::RemoveLayer { index }
    }
    fn create_reorder_layers_command(&self, from: usize, to: usize) -> Command {
        Command::ReorderLayers { from, to }
    }
    fn create_merge_layers_command(&self, top: usize, bottom: usize) -> Command {
        Command::MergeLayers { top, bottom }
    }
    fn create_set_blend_command(&self, index: usize, blend: Blend) -> Command {
        Command::SetBlend { index, blend }
    }
    fn create_set_visible_command(&self, index: usize, visible: bool) -> Command {
        Command::SetVisible { index, visible }
    }
}
