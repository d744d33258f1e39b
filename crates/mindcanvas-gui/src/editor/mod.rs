mod canvas;
#[cfg(test)]
mod tests;

use mindcanvas_core::{
    Action, Connection, ConnectionId, HistoryManager, MindMap, Node, NodeId, Point,
};
use mindcanvas_graph::GraphStore;
use mindcanvas_sync::{RemoteStore, Subscription, SyncAdapter, SyncError};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Connection-drawing mode. Toggling "connect" arms the first pick; the
/// second distinct pick creates the connection and disarms the mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectState {
    Inactive,
    AwaitingFirst,
    AwaitingSecond(NodeId),
}

#[derive(Debug, Clone, Copy)]
struct DragState {
    node: NodeId,
    start: Point,
    current: Point,
}

/// One in-flight debounced text edit. Keyed by node id in the session so
/// concurrent edits to different nodes each commit independently.
#[derive(Debug, Clone)]
struct PendingEdit {
    original: String,
    text: String,
    deadline: Instant,
}

/// Messages the session surfaces to the app shell (toasts, navigation).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    SyncFailed(String),
    /// The map vanished under us; the shell redirects to the library.
    MapVanished,
}

/// One open editor. Owns the local mirror, the undo/redo history, the sync
/// adapter, and all interaction state; dropping the session cancels both
/// subscriptions. Nothing here outlives navigation away from the editor.
pub struct EditorSession {
    map: MindMap,
    adapter: SyncAdapter,
    graph: GraphStore,
    history: HistoryManager<Action>,
    nodes_sub: Subscription<Node>,
    connections_sub: Subscription<Connection>,

    selection: Vec<NodeId>,
    connect: ConnectState,
    drag: Option<DragState>,
    pending_edits: HashMap<NodeId, PendingEdit>,
    debounce: Duration,
    default_node_color: String,
    notices: Vec<Notice>,
    stale_logged: bool,

    // Canvas transform, owned per session.
    pub(crate) zoom: f32,
    pub(crate) pan: Point,
}

impl EditorSession {
    pub fn open(
        store: Arc<dyn RemoteStore>,
        map_id: mindcanvas_core::MapId,
        debounce: Duration,
        history_capacity: usize,
        default_node_color: String,
    ) -> Result<Self, SyncError> {
        let map = store.get_map(map_id)?;
        let adapter = SyncAdapter::new(store, map_id);
        let nodes_sub = adapter.subscribe_nodes();
        let connections_sub = adapter.subscribe_connections();
        info!(map = %map_id, name = %map.name, "editor session opened");
        Ok(Self {
            map,
            adapter,
            graph: GraphStore::new(),
            history: HistoryManager::new(history_capacity),
            nodes_sub,
            connections_sub,
            selection: Vec::new(),
            connect: ConnectState::Inactive,
            drag: None,
            pending_edits: HashMap::new(),
            debounce,
            default_node_color,
            notices: Vec::new(),
            stale_logged: false,
            zoom: 1.0,
            pan: Point::default(),
        })
    }

    /// Drains both subscriptions into the mirror. Called once per frame; a
    /// closed subscription leaves the editor stale but alive.
    pub fn pump(&mut self) {
        while let Some(batch) = self.nodes_sub.try_next() {
            self.graph.apply_node_diff(&batch);
        }
        while let Some(batch) = self.connections_sub.try_next() {
            self.graph.apply_connection_diff(&batch);
        }
        if (self.nodes_sub.is_closed() || self.connections_sub.is_closed()) && !self.stale_logged {
            warn!(map = %self.map.id, "change subscription closed; editor view is now stale");
            self.stale_logged = true;
        }
    }

    /// Write-confirmed history: the batch goes out first and the action is
    /// recorded only once the store accepted it. A rejected batch is
    /// discarded and surfaced, leaving history untouched.
    fn submit(&mut self, action: Action) {
        match self.adapter.execute_batch(&action.redo) {
            Ok(()) => self.history.add(action),
            Err(err) => self.report(err),
        }
    }

    fn report(&mut self, err: SyncError) {
        match err {
            SyncError::NotFound => self.notices.push(Notice::MapVanished),
            other => self.notices.push(Notice::SyncFailed(other.to_string())),
        }
    }

    pub fn undo(&mut self) {
        let Some(ops) = self.history.undo().map(|a| a.undo.clone()) else {
            return;
        };
        if let Err(err) = self.adapter.execute_batch(&ops) {
            self.report(err);
        }
    }

    pub fn redo(&mut self) {
        let Some(ops) = self.history.redo().map(|a| a.redo.clone()) else {
            return;
        };
        if let Err(err) = self.adapter.execute_batch(&ops) {
            self.report(err);
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub fn map(&self) -> &MindMap {
        &self.map
    }

    pub fn graph(&self) -> &GraphStore {
        &self.graph
    }

    pub fn selection(&self) -> &[NodeId] {
        &self.selection
    }

    pub fn is_selected(&self, id: NodeId) -> bool {
        self.selection.contains(&id)
    }

    pub fn connect_state(&self) -> ConnectState {
        self.connect
    }

    // ------------------------------------------------------------------
    // Gestures
    // ------------------------------------------------------------------

    pub fn create_node_at(&mut self, position: Point) {
        let node = Node {
            id: NodeId::new(),
            position,
            text: "New idea".to_string(),
            color: self.default_node_color.clone(),
            created_at: chrono::Utc::now(),
        };
        self.submit(Action::create_node(self.map.id, node));
    }

    pub fn toggle_connect_mode(&mut self) {
        self.selection.clear();
        self.connect = match self.connect {
            ConnectState::Inactive => ConnectState::AwaitingFirst,
            _ => ConnectState::Inactive,
        };
    }

    /// Click dispatch: feeds the connect-mode state machine when armed,
    /// otherwise toggles selection (additive with the platform modifier).
    pub fn click_node(&mut self, id: NodeId, additive: bool) {
        match self.connect {
            ConnectState::AwaitingFirst => {
                self.connect = ConnectState::AwaitingSecond(id);
            }
            ConnectState::AwaitingSecond(first) => {
                if first == id {
                    return;
                }
                let connection = Connection {
                    id: ConnectionId::new(),
                    from: first,
                    to: id,
                };
                self.submit(Action::create_connection(self.map.id, connection));
                self.connect = ConnectState::Inactive;
            }
            ConnectState::Inactive => {
                let was_selected = self.is_selected(id);
                if !additive {
                    self.selection.clear();
                }
                if was_selected && additive {
                    self.selection.retain(|s| *s != id);
                } else if !self.is_selected(id) {
                    self.selection.push(id);
                }
            }
        }
    }

    /// Clicking empty canvas: drops the pending first pick while connecting,
    /// clears the selection otherwise.
    pub fn click_background(&mut self) {
        match self.connect {
            ConnectState::Inactive => self.selection.clear(),
            _ => self.connect = ConnectState::AwaitingFirst,
        }
    }

    // ------------------------------------------------------------------
    // Node dragging: local motion only, one update action on release.
    // ------------------------------------------------------------------

    pub fn begin_drag(&mut self, id: NodeId) {
        let Some(node) = self.graph.node(id) else {
            return;
        };
        self.drag = Some(DragState {
            node: id,
            start: node.position,
            current: node.position,
        });
    }

    pub fn drag_by(&mut self, dx: f32, dy: f32) {
        if let Some(drag) = &mut self.drag {
            drag.current.x += dx;
            drag.current.y += dy;
        }
    }

    pub fn end_drag(&mut self) {
        let Some(drag) = self.drag.take() else {
            return;
        };
        if drag.start == drag.current {
            return;
        }
        self.submit(Action::move_node(
            self.map.id,
            drag.node,
            drag.start,
            drag.current,
        ));
    }

    pub fn dragging(&self) -> Option<NodeId> {
        self.drag.map(|d| d.node)
    }

    /// Where to draw the node this frame: the drag preview wins over the
    /// mirror while a gesture is in progress.
    pub fn node_display_position(&self, id: NodeId) -> Option<Point> {
        if let Some(drag) = &self.drag
            && drag.node == id
        {
            return Some(drag.current);
        }
        self.graph.node(id).map(|n| n.position)
    }

    // ------------------------------------------------------------------
    // Debounced text edits, keyed per node.
    // ------------------------------------------------------------------

    pub fn text_edited(&mut self, id: NodeId, text: String, now: Instant) {
        let Some(node) = self.graph.node(id) else {
            return;
        };
        let original = node.text.clone();
        let deadline = now + self.debounce;
        self.pending_edits
            .entry(id)
            .and_modify(|edit| {
                edit.text = text.clone();
                edit.deadline = deadline;
            })
            .or_insert(PendingEdit {
                original,
                text,
                deadline,
            });
    }

    /// The text to show for a node this frame: the uncommitted edit buffer
    /// wins over the mirror.
    pub fn node_display_text(&self, id: NodeId) -> Option<String> {
        if let Some(edit) = self.pending_edits.get(&id) {
            return Some(edit.text.clone());
        }
        self.graph.node(id).map(|n| n.text.clone())
    }

    /// Commits every edit whose quiet period has elapsed: one update action
    /// per node per pause in typing, never one per keystroke.
    pub fn flush_due_edits(&mut self, now: Instant) {
        let due: Vec<NodeId> = self
            .pending_edits
            .iter()
            .filter(|(_, edit)| edit.deadline <= now)
            .map(|(id, _)| *id)
            .collect();
        for id in due {
            let Some(edit) = self.pending_edits.remove(&id) else {
                continue;
            };
            if edit.text == edit.original {
                continue;
            }
            self.submit(Action::set_node_text(
                self.map.id,
                id,
                edit.original,
                edit.text,
            ));
        }
    }

    pub fn next_edit_deadline(&self) -> Option<Instant> {
        self.pending_edits.values().map(|e| e.deadline).min()
    }

    // ------------------------------------------------------------------
    // Compound selection actions.
    // ------------------------------------------------------------------

    /// One compound action for the whole selection, so a single undo
    /// recreates the entire group with its captured fields.
    pub fn delete_selection(&mut self) {
        let nodes: Vec<Node> = self
            .selection
            .iter()
            .filter_map(|id| self.graph.node(*id).cloned())
            .collect();
        if nodes.is_empty() {
            return;
        }
        for node in &nodes {
            self.pending_edits.remove(&node.id);
        }
        self.submit(Action::delete_nodes(self.map.id, &nodes));
        self.selection.clear();
    }

    pub fn recolor_selection(&mut self, color: &str) {
        let nodes: Vec<(NodeId, String)> = self
            .selection
            .iter()
            .filter_map(|id| self.graph.node(*id).map(|n| (*id, n.color.clone())))
            .collect();
        if nodes.is_empty() {
            return;
        }
        self.submit(Action::recolor_nodes(self.map.id, &nodes, color));
    }
}
