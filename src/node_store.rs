//! The address-space model (§4.2): an in-memory graph of typed nodes and references, organised
//! into namespaces, with the structural invariants of §3.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::{
    error::{Error, Result},
    ua::{AttributeId, LocalizedText, NodeClass, NodeId, QualifiedName, StatusCode, Variant},
};

/// Well-known numeric node id in namespace 0, the standard OPC UA namespace: the `ObjectsFolder`.
pub const OBJECTS_FOLDER: u32 = 85;
/// Well-known numeric node id in namespace 0: the `Organizes` reference type.
pub const ORGANIZES_REFERENCE_TYPE: u32 = 35;
/// Well-known numeric node id in namespace 0: the `ViewsFolder`, seed point for `BrowseView`.
pub const VIEWS_FOLDER: u32 = 86;

/// A timestamped value as returned by Read and stored by Variable/VariableType nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct DataValue {
    pub value: Variant,
    pub source_timestamp: crate::ua::DateTime,
    pub server_timestamp: crate::ua::DateTime,
    pub status: StatusCode,
}

impl DataValue {
    #[must_use]
    pub fn good(value: Variant) -> Self {
        Self {
            value,
            source_timestamp: crate::ua::DateTime::EPOCH,
            server_timestamp: crate::ua::DateTime::EPOCH,
            status: StatusCode::GOOD,
        }
    }
}

/// A directed, typed edge between two nodes (§3). References are stored on their source node and
/// mirrored on the target for efficient inverse browse; they are never stored as a separate node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub reference_type: NodeId,
    pub target: NodeId,
    /// `true` when this entry records the forward sense of the edge (as seen from the node it is
    /// stored on); mirrored entries on the target carry `false`.
    pub is_forward: bool,
}

/// Class-specific state carried by Variable/VariableType nodes.
#[derive(Debug, Clone)]
pub struct VariableData {
    pub data_type: NodeId,
    /// Value rank: `-1` for scalar, `>= 1` for a one-dimensional array of that many dimensions
    /// (the design reserves but does not implement multi-dimensional arrays).
    pub value_rank: i32,
    pub array_dimensions: Vec<u32>,
    pub minimum_sampling_interval: f64,
    value: RwLock<DataValue>,
}

impl VariableData {
    fn new(data_type: NodeId, value_rank: i32, array_dimensions: Vec<u32>, value: DataValue) -> Self {
        Self {
            data_type,
            value_rank,
            array_dimensions,
            minimum_sampling_interval: 0.0,
            value: RwLock::new(value),
        }
    }

    /// Reads the current value under a shared lock.
    #[must_use]
    pub fn read(&self) -> DataValue {
        self.value.read().clone()
    }

    /// Writes a new value under the node's own exclusive lock (§4.2 concurrency: "modifyVariableNode
    /// takes a per-node write lock").
    ///
    /// Validates that the new value's shape (scalar vs. array) matches `value_rank`: per §3, a
    /// Variable node with `value_rank >= 1` never silently accepts a scalar.
    fn write(&self, new_value: Variant) -> Result<()> {
        if self.value_rank >= 1 && !new_value.is_array() {
            return Err(Error::StatusCode(StatusCode::BAD_TYPE_MISMATCH));
        }
        if self.value_rank < 0 && new_value.is_array() {
            return Err(Error::StatusCode(StatusCode::BAD_TYPE_MISMATCH));
        }
        *self.value.write() = DataValue::good(new_value);
        Ok(())
    }
}

/// Class-specific state carried by Method nodes: argument shape only. The bound callable itself
/// lives in the method registry (§4.3), keyed by the same [`NodeId`].
#[derive(Debug, Clone, Default)]
pub struct MethodData {
    pub input_arguments: Vec<QualifiedName>,
    pub output_arguments: Vec<QualifiedName>,
}

/// The class-specific payload of a node; `None` kinds (Object, ObjectType, ReferenceType,
/// DataType, View) carry no additional value state (§3).
#[derive(Debug)]
pub enum NodeKind {
    Variable(VariableData),
    VariableType(VariableData),
    Object,
    ObjectType,
    ReferenceType,
    DataType,
    View,
    Method(MethodData),
}

impl NodeKind {
    const fn node_class(&self) -> NodeClass {
        match self {
            Self::Variable(_) => NodeClass::Variable,
            Self::VariableType(_) => NodeClass::VariableType,
            Self::Object => NodeClass::Object,
            Self::ObjectType => NodeClass::ObjectType,
            Self::ReferenceType => NodeClass::ReferenceType,
            Self::DataType => NodeClass::DataType,
            Self::View => NodeClass::View,
            Self::Method(_) => NodeClass::Method,
        }
    }
}

/// A node in the address space (§3): common attributes plus a class-specific [`NodeKind`].
#[derive(Debug)]
pub struct Node {
    node_id: NodeId,
    browse_name: QualifiedName,
    display_name: LocalizedText,
    access_level: u8,
    user_access_level: u8,
    write_mask: u32,
    user_write_mask: u32,
    kind: NodeKind,
    references: Vec<Reference>,
}

/// Bit in [`Node`]'s access-level masks granting read access.
pub const ACCESS_LEVEL_READ: u8 = 0x01;
/// Bit in [`Node`]'s access-level masks granting write access.
pub const ACCESS_LEVEL_WRITE: u8 = 0x02;

impl Node {
    #[must_use]
    pub const fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    #[must_use]
    pub const fn browse_name(&self) -> &QualifiedName {
        &self.browse_name
    }

    #[must_use]
    pub const fn display_name(&self) -> &LocalizedText {
        &self.display_name
    }

    #[must_use]
    pub const fn node_class(&self) -> NodeClass {
        self.kind.node_class()
    }

    #[must_use]
    pub const fn kind(&self) -> &NodeKind {
        &self.kind
    }

    #[must_use]
    pub fn references(&self) -> &[Reference] {
        &self.references
    }

    #[must_use]
    pub const fn is_readable(&self) -> bool {
        (self.access_level & ACCESS_LEVEL_READ) != 0
    }

    #[must_use]
    pub const fn is_writable(&self) -> bool {
        (self.access_level & ACCESS_LEVEL_WRITE) != 0
    }

    /// Projects a single attribute's current value, for the Read service (§4.5).
    pub fn read_attribute(&self, attribute_id: AttributeId) -> Result<DataValue> {
        match attribute_id {
            AttributeId::NODE_ID => Ok(DataValue::good(Variant::Scalar(
                crate::ua::Scalar::NodeId(self.node_id.clone()),
            ))),
            AttributeId::BROWSE_NAME => Ok(DataValue::good(Variant::Scalar(
                crate::ua::Scalar::QualifiedName(self.browse_name.clone()),
            ))),
            AttributeId::DISPLAY_NAME => Ok(DataValue::good(Variant::Scalar(
                crate::ua::Scalar::LocalizedText(self.display_name.clone()),
            ))),
            AttributeId::VALUE => match &self.kind {
                NodeKind::Variable(data) | NodeKind::VariableType(data) => Ok(data.read()),
                _ => Err(Error::StatusCode(StatusCode::BAD_ATTRIBUTE_ID_INVALID)),
            },
            _ => Err(Error::StatusCode(StatusCode::BAD_ATTRIBUTE_ID_INVALID)),
        }
    }
}

/// A URI-identified partition of `NodeId`s (§3); index 0 is the standard OPC UA namespace.
#[derive(Debug, Clone)]
pub struct Namespace {
    pub index: u16,
    pub uri: String,
}

/// Describes a node to be created via [`NodeStore::create_node`].
pub struct NodeItem {
    pub node_id: NodeId,
    pub browse_name: QualifiedName,
    pub display_name: LocalizedText,
    pub kind: NodeKind,
    /// Access level mask (read/write bits); defaults of [`ACCESS_LEVEL_READ`] `|`
    /// [`ACCESS_LEVEL_WRITE`] are applied by [`NodeItem::new`].
    pub access_level: u8,
    /// When set, an `Organizes` reference from this node to the new node is added as part of the
    /// same atomic insert (§4.2 `createNode`).
    pub source: Option<NodeId>,
}

impl NodeItem {
    #[must_use]
    pub fn new(node_id: NodeId, browse_name: QualifiedName, display_name: LocalizedText, kind: NodeKind) -> Self {
        Self {
            node_id,
            browse_name,
            display_name,
            kind,
            access_level: ACCESS_LEVEL_READ | ACCESS_LEVEL_WRITE,
            source: None,
        }
    }

    #[must_use]
    pub fn with_source(mut self, source: NodeId) -> Self {
        self.source = Some(source);
        self
    }

    #[must_use]
    pub const fn with_access_level(mut self, access_level: u8) -> Self {
        self.access_level = access_level;
        self
    }
}

/// Builds a Variable/VariableType's initial value cell with shape validated against `value_rank`.
#[must_use]
pub fn variable_data(data_type: NodeId, value_rank: i32, array_dimensions: Vec<u32>, initial: Variant) -> VariableData {
    VariableData::new(data_type, value_rank, array_dimensions, DataValue::good(initial))
}

struct Arena {
    nodes: Vec<Node>,
    index_by_id: HashMap<NodeId, usize>,
}

impl Arena {
    fn get(&self, node_id: &NodeId) -> Result<&Node> {
        self.index_by_id
            .get(node_id)
            .map(|&index| &self.nodes[index])
            .ok_or(Error::StatusCode(StatusCode::BAD_NODE_ID_UNKNOWN))
    }
}

/// The address space: nodes, references, and namespace directory, with the single-writer /
/// many-readers discipline of §4.2 (lock ordering: namespace directory → per-node value cell,
/// never the reverse).
pub struct NodeStore {
    namespaces: RwLock<Vec<Namespace>>,
    arena: RwLock<Arena>,
}

impl NodeStore {
    /// Creates a store seeded with namespace 0 (the standard OPC UA namespace) and its
    /// `ObjectsFolder` root, matching "namespace 0 ... is provided read-only" (§3).
    #[must_use]
    pub fn new() -> Self {
        let store = Self {
            namespaces: RwLock::new(vec![Namespace {
                index: 0,
                uri: "http://opcfoundation.org/UA/".to_owned(),
            }]),
            arena: RwLock::new(Arena {
                nodes: Vec::new(),
                index_by_id: HashMap::new(),
            }),
        };
        let root = NodeItem::new(
            NodeId::numeric(0, OBJECTS_FOLDER),
            QualifiedName::new(0, "Objects"),
            LocalizedText::plain("Objects"),
            NodeKind::Object,
        );
        store
            .insert_node(root)
            .expect("seeding the Objects root must not fail");
        let views = NodeItem::new(
            NodeId::numeric(0, VIEWS_FOLDER),
            QualifiedName::new(0, "Views"),
            LocalizedText::plain("Views"),
            NodeKind::View,
        );
        store
            .insert_node(views)
            .expect("seeding the Views root must not fail");
        store
    }

    /// `createNamespace` (§4.2): registers a new URI-identified namespace and seeds its root
    /// Object node. Fails with `BadAlreadyExists` if the URI collides with an existing namespace.
    pub fn create_namespace(
        &self,
        uri: impl Into<String>,
        root_id: NodeId,
        root_browse_name: QualifiedName,
        root_display_name: LocalizedText,
    ) -> Result<u16> {
        let uri = uri.into();
        let mut namespaces = self.namespaces.write();
        if namespaces.iter().any(|namespace| namespace.uri == uri) {
            return Err(Error::StatusCode(StatusCode::BAD_ALREADY_EXISTS));
        }
        let index = u16::try_from(namespaces.len())
            .map_err(|_| Error::invalid_argument("too many namespaces"))?;
        namespaces.push(Namespace {
            index,
            uri: uri.clone(),
        });
        drop(namespaces);

        self.insert_node(NodeItem::new(root_id, root_browse_name, root_display_name, NodeKind::Object))?;
        log::debug!("created namespace {index} ({uri})");
        Ok(index)
    }

    #[must_use]
    pub fn namespace_index(&self, uri: &str) -> Option<u16> {
        self.namespaces
            .read()
            .iter()
            .find(|namespace| namespace.uri == uri)
            .map(|namespace| namespace.index)
    }

    /// `createNode` (§4.2): atomically inserts a node and, if `item.source` is set, an
    /// `Organizes` reference from that node. Takes the arena's exclusive (write) lock.
    pub fn create_node(&self, item: NodeItem) -> Result<NodeId> {
        self.insert_node(item)
    }

    fn insert_node(&self, item: NodeItem) -> Result<NodeId> {
        let mut arena = self.arena.write();
        if arena.index_by_id.contains_key(&item.node_id) {
            return Err(Error::StatusCode(StatusCode::BAD_NODE_ID_EXISTS));
        }
        if let Some(source) = &item.source {
            if !arena.index_by_id.contains_key(source) {
                return Err(Error::StatusCode(StatusCode::BAD_PARENT_NODE_ID_INVALID));
            }
        }

        let node_id = item.node_id.clone();
        let node = Node {
            node_id: node_id.clone(),
            browse_name: item.browse_name,
            display_name: item.display_name,
            access_level: item.access_level,
            user_access_level: item.access_level,
            write_mask: 0,
            user_write_mask: 0,
            kind: item.kind,
            references: Vec::new(),
        };
        let new_index = arena.nodes.len();
        arena.nodes.push(node);
        arena.index_by_id.insert(node_id.clone(), new_index);

        if let Some(source) = item.source {
            Self::link(&mut arena, &source, NodeId::numeric(0, ORGANIZES_REFERENCE_TYPE), &node_id, true)?;
        }

        Ok(node_id)
    }

    /// `addReference` (§4.2): resolves both endpoints, then inserts the forward entry on `source`
    /// and the mirrored inverse entry on `target`. Idempotent for identical tuples.
    pub fn add_reference(&self, source: &NodeId, reference_type: NodeId, target: &NodeId, is_forward: bool) -> Result<()> {
        let mut arena = self.arena.write();
        if !arena.index_by_id.contains_key(source) {
            return Err(Error::StatusCode(StatusCode::BAD_SOURCE_NODE_ID_INVALID));
        }
        if !arena.index_by_id.contains_key(target) {
            return Err(Error::StatusCode(StatusCode::BAD_TARGET_NODE_ID_INVALID));
        }
        Self::link(&mut arena, source, reference_type, target, is_forward)
    }

    fn link(arena: &mut Arena, source: &NodeId, reference_type: NodeId, target: &NodeId, is_forward: bool) -> Result<()> {
        let source_index = arena.index_by_id[source];
        let forward_entry = Reference {
            reference_type: reference_type.clone(),
            target: target.clone(),
            is_forward,
        };
        if !arena.nodes[source_index].references.contains(&forward_entry) {
            arena.nodes[source_index].references.push(forward_entry);
        }

        let target_index = arena.index_by_id[target];
        let inverse_entry = Reference {
            reference_type,
            target: source.clone(),
            is_forward: !is_forward,
        };
        if !arena.nodes[target_index].references.contains(&inverse_entry) {
            arena.nodes[target_index].references.push(inverse_entry);
        }
        Ok(())
    }

    /// `modifyVariableNode` (§4.2): validates shape and commits under the node's own lock.
    pub fn modify_variable_node(&self, node_id: &NodeId, new_value: Variant) -> Result<()> {
        let arena = self.arena.read();
        let node = arena.get(node_id)?;
        if !node.is_writable() {
            return Err(Error::StatusCode(StatusCode::BAD_NOT_WRITABLE));
        }
        match &node.kind {
            NodeKind::Variable(data) | NodeKind::VariableType(data) => data.write(new_value),
            _ => Err(Error::StatusCode(StatusCode::BAD_NOT_WRITABLE)),
        }
    }

    /// `lookup` (§4.2): returns an owned snapshot of common attributes and, for Variable nodes,
    /// the current value. There is no way to mutate the store through the returned data.
    pub fn read_attribute(&self, node_id: &NodeId, attribute_id: AttributeId) -> Result<DataValue> {
        let arena = self.arena.read();
        let node = arena.get(node_id)?;
        if !node.is_readable() {
            return Err(Error::StatusCode(StatusCode::BAD_USER_ACCESS_DENIED));
        }
        node.read_attribute(attribute_id)
    }

    pub fn references(&self, node_id: &NodeId) -> Result<Vec<Reference>> {
        let arena = self.arena.read();
        Ok(arena.get(node_id)?.references().to_vec())
    }

    pub fn node_class(&self, node_id: &NodeId) -> Result<NodeClass> {
        let arena = self.arena.read();
        Ok(arena.get(node_id)?.node_class())
    }

    pub fn browse_name(&self, node_id: &NodeId) -> Result<QualifiedName> {
        let arena = self.arena.read();
        Ok(arena.get(node_id)?.browse_name().clone())
    }

    pub fn display_name(&self, node_id: &NodeId) -> Result<LocalizedText> {
        let arena = self.arena.read();
        Ok(arena.get(node_id)?.display_name().clone())
    }

    pub fn exists(&self, node_id: &NodeId) -> bool {
        self.arena.read().index_by_id.contains_key(node_id)
    }

    /// Deletes a node. Existing [`Reference`]s that still name it become dangling; callers
    /// (the subscription store, in particular) detect this via a failing [`Self::exists`] check.
    pub fn delete_node(&self, node_id: &NodeId) -> Result<()> {
        let mut arena = self.arena.write();
        let index = arena
            .index_by_id
            .remove(node_id)
            .ok_or(Error::StatusCode(StatusCode::BAD_NODE_ID_UNKNOWN))?;
        arena.nodes.remove(index);
        // Removing from the middle of `nodes` shifts every later index by one; rebuild the map
        // rather than patch it in place, since deletes are rare compared to lookups.
        arena.index_by_id = arena
            .nodes
            .iter()
            .enumerate()
            .map(|(new_index, node)| (node.node_id().clone(), new_index))
            .collect();
        Ok(())
    }
}

impl Default for NodeStore {
    fn default() -> Self {
        Self::new()
    }
}
