use mindcanvas_core::{Connection, MapId, MindMap, Node, Operation};
use thiserror::Error;

mod adapter;
mod diff;
mod memory;

pub use adapter::SyncAdapter;
pub use diff::{ChangeKind, DiffBatch, DocChange, Subscription};
pub use memory::MemoryStore;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error("batch rejected by the store: {reason}")]
    Rejected { reason: String },
    #[error("map not found")]
    NotFound,
    #[error("store connection lost")]
    Disconnected,
}

impl SyncError {
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected {
            reason: reason.into(),
        }
    }
}

/// The opaque remote document store the editor collaborates with.
///
/// Batches are all-or-nothing: on `Err` the caller may assume nothing was
/// applied. Subscriptions are the only channel by which remote-origin changes
/// (including this client's own confirmed writes) become visible; the initial
/// snapshot arrives as one bulk `Added` batch. Diff order is guaranteed per
/// collection only — a connection diff may reference a node the node
/// subscription has not delivered yet.
pub trait RemoteStore: Send + Sync {
    fn commit(&self, ops: &[Operation]) -> Result<(), SyncError>;

    fn subscribe_nodes(&self, map: MapId) -> Subscription<Node>;
    fn subscribe_connections(&self, map: MapId) -> Subscription<Connection>;

    // Map library surface. These bypass the Action/undo pipeline.
    fn create_map(&self, name: &str, owner: &str) -> Result<MindMap, SyncError>;
    fn rename_map(&self, id: MapId, name: &str) -> Result<(), SyncError>;
    fn set_archived(&self, id: MapId, archived: bool) -> Result<(), SyncError>;
    fn delete_map(&self, id: MapId) -> Result<(), SyncError>;
    fn get_map(&self, id: MapId) -> Result<MindMap, SyncError>;
    fn subscribe_maps(&self, owner: &str) -> Subscription<MindMap>;
}
