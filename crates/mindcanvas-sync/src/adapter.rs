use crate::{RemoteStore, Subscription, SyncError};
use mindcanvas_core::{Connection, MapId, Node, Operation};
use std::sync::Arc;
use tracing::{debug, warn};

/// Per-editor-session handle onto the remote store, scoped to one map.
/// Constructed when the editor opens and dropped on navigation away.
#[derive(Clone)]
pub struct SyncAdapter {
    store: Arc<dyn RemoteStore>,
    map: MapId,
}

impl SyncAdapter {
    pub fn new(store: Arc<dyn RemoteStore>, map: MapId) -> Self {
        Self { store, map }
    }

    pub fn map_id(&self) -> MapId {
        self.map
    }

    /// Applies the operations as one atomic batch. On `Err` nothing was
    /// applied; the error is logged here and surfaced by the caller.
    pub fn execute_batch(&self, ops: &[Operation]) -> Result<(), SyncError> {
        debug!(map = %self.map, ops = ops.len(), "committing batch");
        let result = self.store.commit(ops);
        if let Err(err) = &result {
            warn!(map = %self.map, %err, "batch rejected");
        }
        result
    }

    pub fn subscribe_nodes(&self) -> Subscription<Node> {
        self.store.subscribe_nodes(self.map)
    }

    pub fn subscribe_connections(&self) -> Subscription<Connection> {
        self.store.subscribe_connections(self.map)
    }
}
