use crate::diff::{DiffBatch, DocChange, Subscription};
use crate::{RemoteStore, SyncError};
use chrono::Utc;
use crossbeam_channel::{Sender, unbounded};
use mindcanvas_core::{
    Connection, ConnectionId, DocData, DocPath, MapId, MindMap, Node, NodeId, Operation,
};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

struct Watcher<K, T> {
    key: K,
    tx: Sender<DiffBatch<T>>,
    cancelled: Arc<AtomicBool>,
}

impl<K: PartialEq, T: Clone> Watcher<K, T> {
    /// Returns false once the watcher is dead and should be pruned.
    fn publish(&self, key: &K, batch: &DiffBatch<T>) -> bool {
        if self.cancelled.load(Ordering::Relaxed) {
            return false;
        }
        if &self.key != key {
            return true;
        }
        self.tx.send(batch.clone()).is_ok()
    }

    fn alive(&self) -> bool {
        !self.cancelled.load(Ordering::Relaxed)
    }
}

#[derive(Default)]
struct Inner {
    maps: HashMap<MapId, MindMap>,
    nodes: HashMap<MapId, HashMap<NodeId, Node>>,
    connections: HashMap<MapId, HashMap<ConnectionId, Connection>>,
    node_watchers: Vec<Watcher<MapId, Node>>,
    connection_watchers: Vec<Watcher<MapId, Connection>>,
    map_watchers: Vec<Watcher<String, MindMap>>,
}

impl Inner {
    fn publish_nodes(&mut self, map: MapId, batch: DiffBatch<Node>) {
        if batch.is_empty() {
            return;
        }
        self.node_watchers.retain(|w| w.publish(&map, &batch));
    }

    fn publish_connections(&mut self, map: MapId, batch: DiffBatch<Connection>) {
        if batch.is_empty() {
            return;
        }
        self.connection_watchers.retain(|w| w.publish(&map, &batch));
    }

    fn publish_map(&mut self, owner: &str, change: DocChange<MindMap>) {
        let owner = owner.to_string();
        let batch = vec![change];
        self.map_watchers.retain(|w| w.publish(&owner, &batch));
    }

    /// Marks the map as touched by a batch and notifies its owner's library
    /// subscriptions.
    fn bump_map(&mut self, map: MapId) {
        let Some(doc) = self.maps.get_mut(&map) else {
            return;
        };
        doc.updated_at = Utc::now();
        let (owner, doc) = (doc.owner.clone(), doc.clone());
        self.publish_map(&owner, DocChange::modified(doc));
    }
}

/// In-memory document store with the collaborator's contract: atomic batches,
/// per-collection in-order diff delivery, initial snapshots as bulk `Added`
/// batches. Backs tests and the local demo profile.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks the whole batch before anything is applied, so a rejection
    /// leaves the store untouched.
    fn validate(inner: &Inner, ops: &[Operation]) -> Result<(), SyncError> {
        for op in ops {
            let map = op.path().map();
            if !inner.maps.contains_key(&map) {
                return Err(SyncError::NotFound);
            }
            match op {
                Operation::Create { path, data } => match (path, data) {
                    (DocPath::Node { node, .. }, DocData::Node(doc)) => {
                        if doc.id != *node {
                            return Err(SyncError::rejected("document id does not match its path"));
                        }
                    }
                    (DocPath::Connection { connection, .. }, DocData::Connection(doc)) => {
                        if doc.id != *connection {
                            return Err(SyncError::rejected("document id does not match its path"));
                        }
                    }
                    _ => {
                        return Err(SyncError::rejected("payload kind does not match its path"));
                    }
                },
                Operation::Update { path, .. } => match path {
                    DocPath::Node { map, node } => {
                        let exists = inner
                            .nodes
                            .get(map)
                            .is_some_and(|nodes| nodes.contains_key(node));
                        if !exists {
                            return Err(SyncError::rejected(format!(
                                "update of missing node {node}"
                            )));
                        }
                    }
                    DocPath::Connection { .. } => {
                        return Err(SyncError::rejected("connections are immutable"));
                    }
                },
                // Deleting an already-absent document is a no-op, matching
                // the store collaborator's delete semantics.
                Operation::Delete { .. } => {}
            }
        }
        Ok(())
    }
}

impl RemoteStore for MemoryStore {
    fn commit(&self, ops: &[Operation]) -> Result<(), SyncError> {
        let mut inner = self.inner.write();
        Self::validate(&inner, ops)?;

        // Per-map diff batches, in apply order.
        let mut node_diffs: HashMap<MapId, DiffBatch<Node>> = HashMap::new();
        let mut connection_diffs: HashMap<MapId, DiffBatch<Connection>> = HashMap::new();

        for op in ops {
            let map = op.path().map();
            match op {
                Operation::Create {
                    data: DocData::Node(doc),
                    ..
                } => {
                    let replaced = inner
                        .nodes
                        .entry(map)
                        .or_default()
                        .insert(doc.id, doc.clone());
                    let change = if replaced.is_some() {
                        DocChange::modified(doc.clone())
                    } else {
                        DocChange::added(doc.clone())
                    };
                    node_diffs.entry(map).or_default().push(change);
                }
                Operation::Create {
                    data: DocData::Connection(doc),
                    ..
                } => {
                    let replaced = inner.connections.entry(map).or_default().insert(doc.id, *doc);
                    let change = if replaced.is_some() {
                        DocChange::modified(*doc)
                    } else {
                        DocChange::added(*doc)
                    };
                    connection_diffs.entry(map).or_default().push(change);
                }
                Operation::Update { path, data } => {
                    let DocPath::Node { node, .. } = path else {
                        // Rejected during validation.
                        continue;
                    };
                    let Some(doc) = inner.nodes.get_mut(&map).and_then(|n| n.get_mut(node)) else {
                        continue;
                    };
                    if let Some(position) = data.position {
                        doc.position = position;
                    }
                    if let Some(text) = &data.text {
                        doc.text = text.clone();
                    }
                    if let Some(color) = &data.color {
                        doc.color = color.clone();
                    }
                    let doc = doc.clone();
                    node_diffs.entry(map).or_default().push(DocChange::modified(doc));
                }
                Operation::Delete { path } => match path {
                    DocPath::Node { node, .. } => {
                        if let Some(doc) = inner.nodes.get_mut(&map).and_then(|n| n.remove(node)) {
                            node_diffs.entry(map).or_default().push(DocChange::removed(doc));
                        }
                    }
                    DocPath::Connection { connection, .. } => {
                        if let Some(doc) = inner
                            .connections
                            .get_mut(&map)
                            .and_then(|c| c.remove(connection))
                        {
                            connection_diffs
                                .entry(map)
                                .or_default()
                                .push(DocChange::removed(doc));
                        }
                    }
                },
            }
        }

        debug!(ops = ops.len(), "batch applied");

        let touched: Vec<MapId> = node_diffs
            .keys()
            .chain(connection_diffs.keys())
            .copied()
            .collect();
        for (map, batch) in node_diffs {
            inner.publish_nodes(map, batch);
        }
        for (map, batch) in connection_diffs {
            inner.publish_connections(map, batch);
        }
        for map in touched {
            inner.bump_map(map);
        }
        Ok(())
    }

    fn subscribe_nodes(&self, map: MapId) -> Subscription<Node> {
        let mut inner = self.inner.write();
        let (tx, rx) = unbounded();
        let cancelled = Arc::new(AtomicBool::new(false));

        let mut snapshot: Vec<&Node> = inner.nodes.get(&map).into_iter().flat_map(|n| n.values()).collect();
        snapshot.sort_by_key(|n| (n.created_at, n.id));
        let initial: DiffBatch<Node> = snapshot.into_iter().cloned().map(DocChange::added).collect();
        if !initial.is_empty() {
            let _ = tx.send(initial);
        }

        inner.node_watchers.push(Watcher {
            key: map,
            tx,
            cancelled: Arc::clone(&cancelled),
        });
        inner.node_watchers.retain(Watcher::alive);
        Subscription::new(rx, cancelled)
    }

    fn subscribe_connections(&self, map: MapId) -> Subscription<Connection> {
        let mut inner = self.inner.write();
        let (tx, rx) = unbounded();
        let cancelled = Arc::new(AtomicBool::new(false));

        let mut snapshot: Vec<&Connection> = inner
            .connections
            .get(&map)
            .into_iter()
            .flat_map(|c| c.values())
            .collect();
        snapshot.sort_by_key(|c| c.id);
        let initial: DiffBatch<Connection> =
            snapshot.into_iter().copied().map(DocChange::added).collect();
        if !initial.is_empty() {
            let _ = tx.send(initial);
        }

        inner.connection_watchers.push(Watcher {
            key: map,
            tx,
            cancelled: Arc::clone(&cancelled),
        });
        inner.connection_watchers.retain(Watcher::alive);
        Subscription::new(rx, cancelled)
    }

    fn create_map(&self, name: &str, owner: &str) -> Result<MindMap, SyncError> {
        let now = Utc::now();
        let map = MindMap {
            id: MapId::new(),
            name: name.to_string(),
            owner: owner.to_string(),
            archived: false,
            created_at: now,
            updated_at: now,
        };
        let mut inner = self.inner.write();
        inner.maps.insert(map.id, map.clone());
        inner.publish_map(owner, DocChange::added(map.clone()));
        Ok(map)
    }

    fn rename_map(&self, id: MapId, name: &str) -> Result<(), SyncError> {
        let mut inner = self.inner.write();
        let doc = inner.maps.get_mut(&id).ok_or(SyncError::NotFound)?;
        doc.name = name.to_string();
        doc.updated_at = Utc::now();
        let (owner, doc) = (doc.owner.clone(), doc.clone());
        inner.publish_map(&owner, DocChange::modified(doc));
        Ok(())
    }

    fn set_archived(&self, id: MapId, archived: bool) -> Result<(), SyncError> {
        let mut inner = self.inner.write();
        let doc = inner.maps.get_mut(&id).ok_or(SyncError::NotFound)?;
        doc.archived = archived;
        doc.updated_at = Utc::now();
        let (owner, doc) = (doc.owner.clone(), doc.clone());
        inner.publish_map(&owner, DocChange::modified(doc));
        Ok(())
    }

    fn delete_map(&self, id: MapId) -> Result<(), SyncError> {
        let mut inner = self.inner.write();
        let doc = inner.maps.remove(&id).ok_or(SyncError::NotFound)?;

        let nodes = inner.nodes.remove(&id).unwrap_or_default();
        let removed_nodes: DiffBatch<Node> =
            nodes.into_values().map(DocChange::removed).collect();
        inner.publish_nodes(id, removed_nodes);

        let connections = inner.connections.remove(&id).unwrap_or_default();
        let removed_connections: DiffBatch<Connection> =
            connections.into_values().map(DocChange::removed).collect();
        inner.publish_connections(id, removed_connections);

        let owner = doc.owner.clone();
        inner.publish_map(&owner, DocChange::removed(doc));
        Ok(())
    }

    fn get_map(&self, id: MapId) -> Result<MindMap, SyncError> {
        self.inner
            .read()
            .maps
            .get(&id)
            .cloned()
            .ok_or(SyncError::NotFound)
    }

    fn subscribe_maps(&self, owner: &str) -> Subscription<MindMap> {
        let mut inner = self.inner.write();
        let (tx, rx) = unbounded();
        let cancelled = Arc::new(AtomicBool::new(false));

        let mut snapshot: Vec<&MindMap> =
            inner.maps.values().filter(|m| m.owner == owner).collect();
        snapshot.sort_by_key(|m| (m.created_at, m.id));
        let initial: DiffBatch<MindMap> =
            snapshot.into_iter().cloned().map(DocChange::added).collect();
        if !initial.is_empty() {
            let _ = tx.send(initial);
        }

        inner.map_watchers.push(Watcher {
            key: owner.to_string(),
            tx,
            cancelled: Arc::clone(&cancelled),
        });
        inner.map_watchers.retain(Watcher::alive);
        Subscription::new(rx, cancelled)
    }
}
