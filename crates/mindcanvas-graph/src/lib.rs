use mindcanvas_core::{Connection, ConnectionId, Node, NodeId};
use mindcanvas_sync::{ChangeKind, DiffBatch};
use std::collections::HashMap;
use tracing::trace;

/// Render-time resolution of a connection's endpoints. A connection whose
/// endpoint is missing (node deleted while the connection diff was in
/// flight) is simply not drawn, never an error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EndpointLookup<'a> {
    Found { from: &'a Node, to: &'a Node },
    Missing,
}

/// Local mirror of one map's remote `nodes` and `connections` collections.
///
/// Mutated exclusively by applying diffs delivered through the sync
/// subscriptions, so it converges on the store's state rather than on
/// locally-issued writes; optimistic visuals live in the canvas controller,
/// not here. No cascading: removing a node leaves its connections in place,
/// to be pruned lazily by `endpoints` at render time.
#[derive(Debug, Default)]
pub struct GraphStore {
    nodes: HashMap<NodeId, Node>,
    connections: HashMap<ConnectionId, Connection>,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert-or-replace for added/modified, erase for removed. Applying the
    /// same added/modified batch twice is idempotent.
    pub fn apply_node_diff(&mut self, batch: &DiffBatch<Node>) {
        for change in batch {
            match change.kind {
                ChangeKind::Added | ChangeKind::Modified => {
                    self.nodes.insert(change.doc.id, change.doc.clone());
                }
                ChangeKind::Removed => {
                    self.nodes.remove(&change.doc.id);
                }
            }
        }
        trace!(nodes = self.nodes.len(), "node diff applied");
    }

    pub fn apply_connection_diff(&mut self, batch: &DiffBatch<Connection>) {
        for change in batch {
            match change.kind {
                ChangeKind::Added | ChangeKind::Modified => {
                    self.connections.insert(change.doc.id, change.doc);
                }
                ChangeKind::Removed => {
                    self.connections.remove(&change.doc.id);
                }
            }
        }
        trace!(connections = self.connections.len(), "connection diff applied");
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn connection(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&id)
    }

    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    pub fn endpoints(&self, connection: &Connection) -> EndpointLookup<'_> {
        match (self.nodes.get(&connection.from), self.nodes.get(&connection.to)) {
            (Some(from), Some(to)) => EndpointLookup::Found { from, to },
            _ => EndpointLookup::Missing,
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}
