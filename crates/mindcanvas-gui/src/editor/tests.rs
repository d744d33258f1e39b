use super::*;
use mindcanvas_core::{MapId, Operation};
use mindcanvas_sync::MemoryStore;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Delegating store that counts committed batches, to assert "one write per
/// gesture" properties.
struct CountingStore {
    inner: MemoryStore,
    commits: AtomicUsize,
}

impl CountingStore {
    fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            commits: AtomicUsize::new(0),
        }
    }

    fn commit_count(&self) -> usize {
        self.commits.load(Ordering::Relaxed)
    }
}

impl RemoteStore for CountingStore {
    fn commit(&self, ops: &[Operation]) -> Result<(), SyncError> {
        self.commits.fetch_add(1, Ordering::Relaxed);
        self.inner.commit(ops)
    }

    fn subscribe_nodes(&self, map: MapId) -> Subscription<Node> {
        self.inner.subscribe_nodes(map)
    }

    fn subscribe_connections(&self, map: MapId) -> Subscription<Connection> {
        self.inner.subscribe_connections(map)
    }

    fn create_map(&self, name: &str, owner: &str) -> Result<MindMap, SyncError> {
        self.inner.create_map(name, owner)
    }

    fn rename_map(&self, id: MapId, name: &str) -> Result<(), SyncError> {
        self.inner.rename_map(id, name)
    }

    fn set_archived(&self, id: MapId, archived: bool) -> Result<(), SyncError> {
        self.inner.set_archived(id, archived)
    }

    fn delete_map(&self, id: MapId) -> Result<(), SyncError> {
        self.inner.delete_map(id)
    }

    fn get_map(&self, id: MapId) -> Result<MindMap, SyncError> {
        self.inner.get_map(id)
    }

    fn subscribe_maps(&self, owner: &str) -> Subscription<MindMap> {
        self.inner.subscribe_maps(owner)
    }
}

/// Store whose batches always bounce, for failure-path tests.
struct RejectingStore {
    inner: MemoryStore,
}

impl RemoteStore for RejectingStore {
    fn commit(&self, _ops: &[Operation]) -> Result<(), SyncError> {
        Err(SyncError::rejected("permission denied"))
    }

    fn subscribe_nodes(&self, map: MapId) -> Subscription<Node> {
        self.inner.subscribe_nodes(map)
    }

    fn subscribe_connections(&self, map: MapId) -> Subscription<Connection> {
        self.inner.subscribe_connections(map)
    }

    fn create_map(&self, name: &str, owner: &str) -> Result<MindMap, SyncError> {
        self.inner.create_map(name, owner)
    }

    fn rename_map(&self, id: MapId, name: &str) -> Result<(), SyncError> {
        self.inner.rename_map(id, name)
    }

    fn set_archived(&self, id: MapId, archived: bool) -> Result<(), SyncError> {
        self.inner.set_archived(id, archived)
    }

    fn delete_map(&self, id: MapId) -> Result<(), SyncError> {
        self.inner.delete_map(id)
    }

    fn get_map(&self, id: MapId) -> Result<MindMap, SyncError> {
        self.inner.get_map(id)
    }

    fn subscribe_maps(&self, owner: &str) -> Subscription<MindMap> {
        self.inner.subscribe_maps(owner)
    }
}

fn open_session(store: Arc<dyn RemoteStore>, map: MapId) -> EditorSession {
    EditorSession::open(
        store,
        map,
        Duration::from_millis(500),
        50,
        "#334155".to_string(),
    )
    .expect("session should open")
}

fn sorted_node_ids(session: &EditorSession) -> Vec<NodeId> {
    let mut nodes: Vec<&Node> = session.graph().nodes().collect();
    nodes.sort_by_key(|n| (n.created_at, n.id));
    nodes.iter().map(|n| n.id).collect()
}

#[test]
fn drag_release_records_exactly_one_action_and_one_batch() {
    let store = Arc::new(CountingStore::new());
    let map = store.create_map("plan", "ana").unwrap();
    let mut session = open_session(store.clone(), map.id);

    session.create_node_at(Point::new(100.0, 100.0));
    session.pump();
    let id = sorted_node_ids(&session)[0];
    let commits_before = store.commit_count();

    session.begin_drag(id);
    // Many mouse-move increments, no remote writes mid-drag.
    for _ in 0..20 {
        session.drag_by(10.0, 2.5);
    }
    assert_eq!(store.commit_count(), commits_before);
    session.end_drag();
    session.pump();

    assert_eq!(store.commit_count(), commits_before + 1);
    assert_eq!(session.history.len(), 2);
    assert_eq!(
        session.graph().node(id).unwrap().position,
        Point::new(300.0, 150.0)
    );

    // The recorded action pairs start and end positions.
    session.undo();
    session.pump();
    assert_eq!(
        session.graph().node(id).unwrap().position,
        Point::new(100.0, 100.0)
    );
}

#[test]
fn drag_without_movement_records_nothing() {
    let store = Arc::new(CountingStore::new());
    let map = store.create_map("plan", "ana").unwrap();
    let mut session = open_session(store.clone(), map.id);

    session.create_node_at(Point::new(0.0, 0.0));
    session.pump();
    let id = sorted_node_ids(&session)[0];
    let commits_before = store.commit_count();

    session.begin_drag(id);
    session.end_drag();
    assert_eq!(store.commit_count(), commits_before);
    assert_eq!(session.history.len(), 1);
}

#[test]
fn debounce_coalesces_bursts_within_the_quiet_window() {
    let store = Arc::new(CountingStore::new());
    let map = store.create_map("plan", "ana").unwrap();
    let mut session = open_session(store.clone(), map.id);

    session.create_node_at(Point::new(0.0, 0.0));
    session.pump();
    let id = sorted_node_ids(&session)[0];
    let commits_before = store.commit_count();

    let t0 = Instant::now();
    session.text_edited(id, "Hello".to_string(), t0);
    session.flush_due_edits(t0 + Duration::from_millis(300));
    // Second burst lands before the first one's quiet period elapses.
    session.text_edited(id, "Hello world".to_string(), t0 + Duration::from_millis(400));
    session.flush_due_edits(t0 + Duration::from_millis(600));
    assert_eq!(store.commit_count(), commits_before);

    session.flush_due_edits(t0 + Duration::from_millis(950));
    session.pump();
    assert_eq!(store.commit_count(), commits_before + 1);
    assert_eq!(session.graph().node(id).unwrap().text, "Hello world");
}

#[test]
fn bursts_separated_by_more_than_the_window_commit_twice() {
    let store = Arc::new(CountingStore::new());
    let map = store.create_map("plan", "ana").unwrap();
    let mut session = open_session(store.clone(), map.id);

    session.create_node_at(Point::new(0.0, 0.0));
    session.pump();
    let id = sorted_node_ids(&session)[0];
    let commits_before = store.commit_count();

    let t0 = Instant::now();
    session.text_edited(id, "Hello".to_string(), t0);
    session.flush_due_edits(t0 + Duration::from_millis(600));
    session.pump();
    assert_eq!(store.commit_count(), commits_before + 1);

    session.text_edited(id, "Hello world".to_string(), t0 + Duration::from_millis(700));
    session.flush_due_edits(t0 + Duration::from_millis(1300));
    session.pump();
    assert_eq!(store.commit_count(), commits_before + 2);
    assert_eq!(session.graph().node(id).unwrap().text, "Hello world");
}

#[test]
fn edits_to_different_nodes_debounce_independently() {
    let store = Arc::new(CountingStore::new());
    let map = store.create_map("plan", "ana").unwrap();
    let mut session = open_session(store.clone(), map.id);

    session.create_node_at(Point::new(0.0, 0.0));
    session.create_node_at(Point::new(200.0, 0.0));
    session.pump();
    let ids = sorted_node_ids(&session);

    let t0 = Instant::now();
    session.text_edited(ids[0], "first".to_string(), t0);
    session.text_edited(ids[1], "second".to_string(), t0 + Duration::from_millis(100));
    session.flush_due_edits(t0 + Duration::from_millis(1000));
    session.pump();

    assert_eq!(session.graph().node(ids[0]).unwrap().text, "first");
    assert_eq!(session.graph().node(ids[1]).unwrap().text, "second");
}

#[test]
fn failed_batch_leaves_history_untouched() {
    let inner = Arc::new(RejectingStore {
        inner: MemoryStore::new(),
    });
    let map = inner.inner.create_map("plan", "ana").unwrap();
    let mut session = open_session(inner, map.id);

    session.create_node_at(Point::new(0.0, 0.0));
    assert!(!session.can_undo());
    assert!(session.history.is_empty());
    let notices = session.take_notices();
    assert!(matches!(notices.as_slice(), [Notice::SyncFailed(_)]));
}

#[test]
fn connect_mode_builds_one_connection_then_disarms() {
    let store = Arc::new(CountingStore::new());
    let map = store.create_map("plan", "ana").unwrap();
    let mut session = open_session(store.clone(), map.id);

    session.create_node_at(Point::new(0.0, 0.0));
    session.create_node_at(Point::new(200.0, 0.0));
    session.pump();
    let ids = sorted_node_ids(&session);

    session.toggle_connect_mode();
    assert_eq!(session.connect_state(), ConnectState::AwaitingFirst);
    session.click_node(ids[0], false);
    assert_eq!(session.connect_state(), ConnectState::AwaitingSecond(ids[0]));
    // Clicking the same node again is not a valid second pick.
    session.click_node(ids[0], false);
    assert_eq!(session.connect_state(), ConnectState::AwaitingSecond(ids[0]));

    session.click_node(ids[1], false);
    session.pump();
    assert_eq!(session.connect_state(), ConnectState::Inactive);
    assert_eq!(session.graph().connection_count(), 1);
    let conn = session.graph().connections().next().unwrap();
    assert_eq!((conn.from, conn.to), (ids[0], ids[1]));
}

#[test]
fn background_click_while_connecting_drops_the_first_pick() {
    let store = Arc::new(CountingStore::new());
    let map = store.create_map("plan", "ana").unwrap();
    let mut session = open_session(store.clone(), map.id);

    session.create_node_at(Point::new(0.0, 0.0));
    session.pump();
    let id = sorted_node_ids(&session)[0];

    session.toggle_connect_mode();
    session.click_node(id, false);
    session.click_background();
    assert_eq!(session.connect_state(), ConnectState::AwaitingFirst);
}

#[test]
fn selection_toggles_additively_and_clears_on_background() {
    let store = Arc::new(CountingStore::new());
    let map = store.create_map("plan", "ana").unwrap();
    let mut session = open_session(store.clone(), map.id);

    session.create_node_at(Point::new(0.0, 0.0));
    session.create_node_at(Point::new(200.0, 0.0));
    session.pump();
    let ids = sorted_node_ids(&session);

    session.click_node(ids[0], false);
    session.click_node(ids[1], true);
    assert_eq!(session.selection().len(), 2);

    // Additive click on a selected node deselects it.
    session.click_node(ids[0], true);
    assert_eq!(session.selection(), &[ids[1]]);

    // Plain click replaces the selection.
    session.click_node(ids[0], false);
    assert_eq!(session.selection(), &[ids[0]]);

    session.click_background();
    assert!(session.selection().is_empty());
}

#[test]
fn delete_selection_is_one_compound_action_and_undo_restores_the_group() {
    let store = Arc::new(CountingStore::new());
    let map = store.create_map("plan", "ana").unwrap();
    let mut session = open_session(store.clone(), map.id);

    session.create_node_at(Point::new(0.0, 0.0));
    session.create_node_at(Point::new(200.0, 0.0));
    session.pump();
    let ids = sorted_node_ids(&session);
    let captured: Vec<Node> = ids
        .iter()
        .map(|id| session.graph().node(*id).unwrap().clone())
        .collect();

    session.click_node(ids[0], false);
    session.click_node(ids[1], true);
    let commits_before = store.commit_count();
    session.delete_selection();
    session.pump();
    assert_eq!(store.commit_count(), commits_before + 1);
    assert_eq!(session.graph().node_count(), 0);
    assert!(session.selection().is_empty());

    session.undo();
    session.pump();
    assert_eq!(session.graph().node_count(), 2);
    for node in &captured {
        // Field-for-field, original timestamps included.
        assert_eq!(session.graph().node(node.id), Some(node));
    }
}

#[test]
fn recolor_selection_is_one_compound_action() {
    let store = Arc::new(CountingStore::new());
    let map = store.create_map("plan", "ana").unwrap();
    let mut session = open_session(store.clone(), map.id);

    session.create_node_at(Point::new(0.0, 0.0));
    session.create_node_at(Point::new(200.0, 0.0));
    session.pump();
    let ids = sorted_node_ids(&session);

    session.click_node(ids[0], false);
    session.click_node(ids[1], true);
    session.recolor_selection("#ff0000");
    session.pump();
    for id in &ids {
        assert_eq!(session.graph().node(*id).unwrap().color, "#ff0000");
    }

    // A single undo reverts the whole group.
    session.undo();
    session.pump();
    for id in &ids {
        assert_eq!(session.graph().node(*id).unwrap().color, "#334155");
    }
}

#[test]
fn actions_on_a_vanished_map_surface_a_redirect_notice() {
    let store = Arc::new(CountingStore::new());
    let map = store.create_map("plan", "ana").unwrap();
    let mut session = open_session(store.clone(), map.id);

    store.delete_map(map.id).unwrap();
    session.create_node_at(Point::new(0.0, 0.0));
    let notices = session.take_notices();
    assert!(notices.contains(&Notice::MapVanished));
}

#[test]
fn new_action_after_undos_discards_the_redo_branch() {
    let store = Arc::new(CountingStore::new());
    let map = store.create_map("plan", "ana").unwrap();
    let mut session = open_session(store.clone(), map.id);

    for i in 0..3 {
        session.create_node_at(Point::new(i as f32 * 100.0, 0.0));
    }
    session.undo();
    session.undo();
    assert!(session.can_redo());

    session.create_node_at(Point::new(500.0, 0.0));
    assert!(!session.can_redo());
    session.pump();
    // Nodes 2 and 3 were undone and their redos discarded.
    assert_eq!(session.graph().node_count(), 2);
}
