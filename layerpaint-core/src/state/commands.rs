use super::LayerID;
use crate::blend::Blend;

/// Snapshot of a surface, shared between the history and any clones of it.
pub type SurfaceSnapshot = std::sync::Arc<image::RgbaImage>;

/// Record of a change that has been applied to a [`super::LayerModel`].
/// Carries enough to both revert and re-apply it.
#[derive(Clone, Debug)]
pub enum Command {
    Created {
        target: LayerID,
        index: usize,
        previous_current: Option<LayerID>,
    },
    Removed {
        target: LayerID,
        index: usize,
        previous_current: Option<LayerID>,
    },
    Moved {
        target: LayerID,
        from: usize,
        to: usize,
    },
    Merged {
        source: LayerID,
        source_index: usize,
        destination: LayerID,
        destination_before: SurfaceSnapshot,
        destination_after: SurfaceSnapshot,
        previous_current: Option<LayerID>,
    },
    BlendChanged {
        target: LayerID,
        from: Blend,
        to: Blend,
    },
    VisibilityChanged {
        target: LayerID,
        visible: bool,
    },
}
impl Command {
    /// Layer kept alive off-stack by this record while it's done, if any.
    #[must_use]
    pub(crate) fn detached_while_done(&self) -> Option<LayerID> {
        match self {
            Self::Removed { target, .. } => Some(*target),
            Self::Merged { source, .. } => Some(*source),
            _ => None,
        }
    }
    /// Layer kept alive off-stack by this record while it's undone, if any.
    #[must_use]
    pub(crate) fn detached_while_undone(&self) -> Option<LayerID> {
        match self {
            Self::Created { target, .. } => Some(*target),
            _ => None,
        }
    }
}
