use crate::{Connection, ConnectionId, MapId, Node, NodeId, Point};
use serde::{Deserialize, Serialize};

/// Address of a single document inside the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocPath {
    Node { map: MapId, node: NodeId },
    Connection { map: MapId, connection: ConnectionId },
}

impl DocPath {
    pub fn map(&self) -> MapId {
        match self {
            DocPath::Node { map, .. } | DocPath::Connection { map, .. } => *map,
        }
    }
}

/// Full document payload for a `Create` operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DocData {
    Node(Node),
    Connection(Connection),
}

/// Partial update of a node document. Unset fields are left untouched.
/// Connections carry no mutable fields, so updates only ever target nodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeUpdate {
    pub position: Option<Point>,
    pub text: Option<String>,
    pub color: Option<String>,
}

impl NodeUpdate {
    pub fn position(position: Point) -> Self {
        Self {
            position: Some(position),
            ..Self::default()
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn color(color: impl Into<String>) -> Self {
        Self {
            color: Some(color.into()),
            ..Self::default()
        }
    }
}

/// A single typed mutation against the remote store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operation {
    /// Set semantics: creates the document or overwrites it wholesale.
    Create { path: DocPath, data: DocData },
    Update { path: DocPath, data: NodeUpdate },
    Delete { path: DocPath },
}

impl Operation {
    pub fn path(&self) -> &DocPath {
        match self {
            Operation::Create { path, .. }
            | Operation::Update { path, .. }
            | Operation::Delete { path } => path,
        }
    }
}

/// A reversible unit of graph mutation: applying `redo` then `undo` restores
/// every touched entity to its prior observable state. Both lists describe
/// the same set of entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub undo: Vec<Operation>,
    pub redo: Vec<Operation>,
}

impl Action {
    pub fn create_node(map: MapId, node: Node) -> Self {
        let path = DocPath::Node { map, node: node.id };
        Self {
            undo: vec![Operation::Delete { path }],
            redo: vec![Operation::Create {
                path,
                data: DocData::Node(node),
            }],
        }
    }

    pub fn move_node(map: MapId, node: NodeId, from: Point, to: Point) -> Self {
        let path = DocPath::Node { map, node };
        Self {
            undo: vec![Operation::Update {
                path,
                data: NodeUpdate::position(from),
            }],
            redo: vec![Operation::Update {
                path,
                data: NodeUpdate::position(to),
            }],
        }
    }

    pub fn set_node_text(
        map: MapId,
        node: NodeId,
        old_text: impl Into<String>,
        new_text: impl Into<String>,
    ) -> Self {
        let path = DocPath::Node { map, node };
        Self {
            undo: vec![Operation::Update {
                path,
                data: NodeUpdate::text(old_text),
            }],
            redo: vec![Operation::Update {
                path,
                data: NodeUpdate::text(new_text),
            }],
        }
    }

    /// One compound action covering the whole selection, so a single undo
    /// reverts the group. `nodes` pairs each node id with its prior color.
    pub fn recolor_nodes(map: MapId, nodes: &[(NodeId, String)], new_color: &str) -> Self {
        Self {
            undo: nodes
                .iter()
                .map(|(node, old_color)| Operation::Update {
                    path: DocPath::Node { map, node: *node },
                    data: NodeUpdate::color(old_color.clone()),
                })
                .collect(),
            redo: nodes
                .iter()
                .map(|(node, _)| Operation::Update {
                    path: DocPath::Node { map, node: *node },
                    data: NodeUpdate::color(new_color),
                })
                .collect(),
        }
    }

    /// Compound delete. The undo side recreates each node from its captured
    /// document, original timestamps included.
    pub fn delete_nodes(map: MapId, nodes: &[Node]) -> Self {
        Self {
            undo: nodes
                .iter()
                .map(|node| Operation::Create {
                    path: DocPath::Node { map, node: node.id },
                    data: DocData::Node(node.clone()),
                })
                .collect(),
            redo: nodes
                .iter()
                .map(|node| Operation::Delete {
                    path: DocPath::Node { map, node: node.id },
                })
                .collect(),
        }
    }

    pub fn create_connection(map: MapId, connection: Connection) -> Self {
        let path = DocPath::Connection {
            map,
            connection: connection.id,
        };
        Self {
            undo: vec![Operation::Delete { path }],
            redo: vec![Operation::Create {
                path,
                data: DocData::Connection(connection),
            }],
        }
    }
}
