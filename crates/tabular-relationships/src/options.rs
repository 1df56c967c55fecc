use serde::{Deserialize, Serialize};

/// Limits applied to relationship graph walks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GraphOptions {
    /// Maximum number of hops a single walk may take before failing with
    /// [`RelationshipError::DepthExceeded`](crate::RelationshipError::DepthExceeded).
    ///
    /// Walks recurse once per hop, so this also bounds stack depth. Values above
    /// [`GraphOptions::DEPTH_LIMIT`] are clamped to it.
    pub max_depth: usize,
}

impl GraphOptions {
    pub const DEPTH_LIMIT: usize = 1024;

    /// `max_depth`, clamped to [`GraphOptions::DEPTH_LIMIT`].
    pub fn effective_max_depth(&self) -> usize {
        self.max_depth.min(Self::DEPTH_LIMIT)
    }
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self { max_depth: 256 }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ActivationOptions {
    pub graph: GraphOptions,
    /// Issue `commit` on the sink once the batch of reference edits has been sent.
    pub commit_after_batch: bool,
}

impl Default for ActivationOptions {
    fn default() -> Self {
        Self {
            graph: GraphOptions::default(),
            commit_after_batch: true,
        }
    }
}
