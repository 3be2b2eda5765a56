//! Arena-backed JSON syntax tree.
//!
//! A [`Tree`] owns every node in a flat `Vec` of slots addressed by [`NodeId`].
//! Each slot stores its payload and the id of its parent; arrays and objects
//! store the ids of their members. Parent ids never own anything, so the
//! two-way links cannot form ownership cycles.
//!
//! Reading goes through [`Node`] views, editing through [`NodeMut`] views.
//! Both borrow the tree, so an id obtained from a view can never outlive an
//! edit that released it.
//!
//! # Invariants
//!
//! - the payload always matches the node's [`Kind`]
//! - keys within one object are pairwise distinct
//! - the parent id of a member names the container that lists it
//! - member order is insertion order and is never changed
//!
//! [`Tree::validate`] checks all of these and reports violations as
//! [`JastError::Invariant`]. Mutations run it in debug builds.

use std::collections::HashSet;
use std::fmt;

use serde_json::{Map, Number, Value};
use tracing::debug;

use crate::error::{JastError, Result};

/// Index of a slot in a [`Tree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// JSON type of a node. `Error` marks "no node": an unresolved placeholder
/// left by a failed parse or a released slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Error,
    Null,
    Bool,
    Number,
    String,
    Array,
    Object,
}

impl Kind {
    pub fn is_container(self) -> bool {
        matches!(self, Kind::Array | Kind::Object)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Kind::Error => "Error",
            Kind::Null => "Null",
            Kind::Bool => "Bool",
            Kind::Number => "Number",
            Kind::String => "String",
            Kind::Array => "Array",
            Kind::Object => "Object",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Payload {
    Error,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<NodeId>),
    Object(Vec<(String, NodeId)>),
}

impl Payload {
    fn kind(&self) -> Kind {
        match self {
            Payload::Error => Kind::Error,
            Payload::Null => Kind::Null,
            Payload::Bool(_) => Kind::Bool,
            Payload::Number(_) => Kind::Number,
            Payload::String(_) => Kind::String,
            Payload::Array(_) => Kind::Array,
            Payload::Object(_) => Kind::Object,
        }
    }

    /// Member ids in order, empty for scalars.
    fn child_ids(&self) -> Vec<NodeId> {
        match self {
            Payload::Array(ids) => ids.clone(),
            Payload::Object(entries) => entries.iter().map(|(_, id)| *id).collect(),
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
struct Slot {
    payload: Payload,
    parent: Option<NodeId>,
    live: bool,
}

/// One JSON document (or fragment) held in an arena.
#[derive(Debug, Clone)]
pub struct Tree {
    slots: Vec<Slot>,
    free: Vec<NodeId>,
    root: NodeId,
}

/// A keyed value handed to [`NodeMut::add_children`]. Arrays ignore the key.
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub key: String,
    pub value: Tree,
}

impl Member {
    pub fn new(key: impl Into<String>, value: Tree) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }

    /// Member for an array, where keys play no part.
    pub fn element(value: Tree) -> Self {
        Self::new(String::new(), value)
    }

    /// Build a member from a single-value literal such as `"5"` or `"\"hi\""`.
    pub fn standalone(key: impl Into<String>, literal: &str) -> Result<Self> {
        Ok(Self::new(key, Tree::standalone(literal)?))
    }
}

// ============================================================================
// Construction
// ============================================================================

impl Tree {
    fn with_root(payload: Payload) -> Self {
        Self {
            slots: vec![Slot {
                payload,
                parent: None,
                live: true,
            }],
            free: Vec::new(),
            root: NodeId(0),
        }
    }

    /// A tree whose root is still unresolved. Used as the starting point of a
    /// parse or a conversion.
    pub(crate) fn placeholder() -> Self {
        Self::with_root(Payload::Error)
    }

    pub fn null() -> Self {
        Self::with_root(Payload::Null)
    }

    pub fn bool(value: bool) -> Self {
        Self::with_root(Payload::Bool(value))
    }

    pub fn number(value: f64) -> Self {
        Self::with_root(Payload::Number(value))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::with_root(Payload::String(value.into()))
    }

    pub fn empty_array() -> Self {
        Self::with_root(Payload::Array(Vec::new()))
    }

    pub fn empty_object() -> Self {
        Self::with_root(Payload::Object(Vec::new()))
    }

    /// Parse a single-value literal fragment for programmatic insertion.
    ///
    /// Scalars and empty containers are accepted; a non-empty array or object
    /// is rejected with [`JastError::NotStandalone`].
    pub fn standalone(literal: &str) -> Result<Self> {
        let tree = crate::parser::parse_str(literal)?;
        if tree.root().kind().is_container() && tree.root().len() > 0 {
            return Err(JastError::NotStandalone);
        }
        Ok(tree)
    }

    /// Build a tree from a `serde_json::Value`, keeping object order.
    pub fn from_value(value: &Value) -> Self {
        let mut tree = Self::placeholder();
        let root = tree.root;
        tree.fill_from_value(root, value);
        tree
    }

    fn fill_from_value(&mut self, id: NodeId, value: &Value) {
        let payload = match value {
            Value::Null => Payload::Null,
            Value::Bool(b) => Payload::Bool(*b),
            Value::Number(n) => Payload::Number(n.as_f64().unwrap_or(f64::NAN)),
            Value::String(s) => Payload::String(s.clone()),
            Value::Array(items) => {
                let mut ids = Vec::with_capacity(items.len());
                for item in items {
                    let child = self.alloc(Payload::Error, Some(id));
                    self.fill_from_value(child, item);
                    ids.push(child);
                }
                Payload::Array(ids)
            }
            Value::Object(map) => {
                let mut entries = Vec::with_capacity(map.len());
                for (key, item) in map {
                    let child = self.alloc(Payload::Error, Some(id));
                    self.fill_from_value(child, item);
                    entries.push((key.clone(), child));
                }
                Payload::Object(entries)
            }
        };
        self.slot_mut(id).payload = payload;
    }
}

// ============================================================================
// Arena plumbing
// ============================================================================

impl Tree {
    fn slot(&self, id: NodeId) -> &Slot {
        &self.slots[id.0]
    }

    fn slot_mut(&mut self, id: NodeId) -> &mut Slot {
        &mut self.slots[id.0]
    }

    pub(crate) fn payload(&self, id: NodeId) -> &Payload {
        &self.slot(id).payload
    }

    pub(crate) fn payload_mut(&mut self, id: NodeId) -> &mut Payload {
        &mut self.slot_mut(id).payload
    }

    pub(crate) fn set_payload(&mut self, id: NodeId, payload: Payload) {
        self.slot_mut(id).payload = payload;
    }

    pub(crate) fn parent_id(&self, id: NodeId) -> Option<NodeId> {
        self.slot(id).parent
    }

    pub(crate) fn kind_of(&self, id: NodeId) -> Kind {
        self.payload(id).kind()
    }

    pub(crate) fn alloc(&mut self, payload: Payload, parent: Option<NodeId>) -> NodeId {
        let slot = Slot {
            payload,
            parent,
            live: true,
        };
        match self.free.pop() {
            Some(id) => {
                self.slots[id.0] = slot;
                id
            }
            None => {
                self.slots.push(slot);
                NodeId(self.slots.len() - 1)
            }
        }
    }

    /// Release `id` and everything below it back to the free list.
    pub(crate) fn release(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            let slot = self.slot_mut(id);
            let payload = std::mem::replace(&mut slot.payload, Payload::Error);
            slot.parent = None;
            slot.live = false;
            stack.extend(payload.child_ids());
            self.free.push(id);
        }
    }

    /// Release only the members of `id`, leaving the slot itself in place.
    fn release_children(&mut self, id: NodeId) {
        for child in self.payload(id).child_ids() {
            self.release(child);
        }
    }

    /// Copy the subtree at `src_id` in `src` into this arena below `parent`.
    fn graft(&mut self, src: &Tree, src_id: NodeId, parent: Option<NodeId>) -> NodeId {
        let id = self.alloc(Payload::Error, parent);
        self.graft_into(id, src, src_id);
        id
    }

    /// Overwrite the payload of `id` with a copy of `src_id` from `src`.
    fn graft_into(&mut self, id: NodeId, src: &Tree, src_id: NodeId) {
        let payload = match src.payload(src_id) {
            Payload::Array(ids) => {
                Payload::Array(ids.iter().map(|&c| self.graft(src, c, Some(id))).collect())
            }
            Payload::Object(entries) => Payload::Object(
                entries
                    .iter()
                    .map(|(key, c)| (key.clone(), self.graft(src, *c, Some(id))))
                    .collect(),
            ),
            leaf => leaf.clone(),
        };
        self.set_payload(id, payload);
    }

    /// Independent copy of the subtree at `id`, rooted at the copy's root.
    fn copy_subtree(&self, id: NodeId) -> Tree {
        let mut out = Tree::placeholder();
        let root = out.root;
        out.graft_into(root, self, id);
        out
    }

    /// Resolve a dotted path relative to `from`.
    fn resolve(&self, from: NodeId, path: &str) -> Option<NodeId> {
        if path.is_empty() {
            return Some(from);
        }
        let mut current = from;
        for segment in path.split('.') {
            current = self.child_by_segment(current, segment)?;
        }
        Some(current)
    }

    fn child_by_segment(&self, id: NodeId, segment: &str) -> Option<NodeId> {
        match self.payload(id) {
            Payload::Object(entries) => entries
                .iter()
                .find(|(key, _)| key == segment)
                .map(|(_, child)| *child),
            Payload::Array(ids) => ids.get(parse_index(segment)?).copied(),
            _ => None,
        }
    }

    /// The segment `parent` uses to reach `id`: its key or its index.
    fn segment_of(&self, parent: NodeId, id: NodeId) -> Option<String> {
        match self.payload(parent) {
            Payload::Object(entries) => entries
                .iter()
                .find(|(_, child)| *child == id)
                .map(|(key, _)| key.clone()),
            Payload::Array(ids) => ids.iter().position(|c| *c == id).map(|i| i.to_string()),
            _ => None,
        }
    }

    pub(crate) fn key_of(&self, id: NodeId) -> String {
        let mut segments = Vec::new();
        let mut current = id;
        while let Some(parent) = self.parent_id(current) {
            if let Some(segment) = self.segment_of(parent, current) {
                segments.push(segment);
            }
            current = parent;
        }
        segments.reverse();
        segments.join(".")
    }
}

/// Array index segments must be plain decimal without leading zeros, so that
/// a node's key always reproduces the path that found it.
fn parse_index(segment: &str) -> Option<usize> {
    let canonical = !segment.is_empty()
        && segment.bytes().all(|b| b.is_ascii_digit())
        && (segment == "0" || !segment.starts_with('0'));
    if canonical {
        segment.parse().ok()
    } else {
        None
    }
}

// ============================================================================
// Public tree API
// ============================================================================

impl Tree {
    pub fn root_id(&self) -> NodeId {
        self.root
    }

    pub fn root(&self) -> Node<'_> {
        Node {
            tree: self,
            id: self.root,
        }
    }

    pub fn root_mut(&mut self) -> NodeMut<'_> {
        let id = self.root;
        NodeMut { tree: self, id }
    }

    /// View of a live node, `None` for ids that are out of range or released.
    pub fn node(&self, id: NodeId) -> Option<Node<'_>> {
        match self.slots.get(id.0) {
            Some(slot) if slot.live => Some(Node { tree: self, id }),
            _ => None,
        }
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<NodeMut<'_>> {
        match self.slots.get(id.0) {
            Some(slot) if slot.live => Some(NodeMut { tree: self, id }),
            _ => None,
        }
    }

    /// Shorthand for `root().get_child(path)`.
    pub fn get(&self, path: &str) -> Option<Node<'_>> {
        self.root().get_child(path)
    }

    /// Shorthand for `root_mut().into_child(path)`.
    pub fn get_mut(&mut self, path: &str) -> Option<NodeMut<'_>> {
        self.root_mut().into_child(path)
    }

    pub fn set_child(&mut self, path: &str, value: Tree) -> Result<()> {
        self.root_mut().set_child(path, value)
    }

    pub fn add_children<I>(&mut self, members: I) -> Result<()>
    where
        I: IntoIterator<Item = Member>,
    {
        self.root_mut().add_children(members)
    }

    pub fn remove_child(&mut self, path: &str) -> Result<Tree> {
        self.root_mut().remove_child(path)
    }

    /// Number of live nodes in the arena.
    pub fn node_count(&self) -> usize {
        self.slots.iter().filter(|s| s.live).count()
    }

    /// Check the direct members of `id`: each is live and links back to
    /// `id`, and object keys are unique.
    pub(crate) fn check_members(&self, id: NodeId) -> Result<()> {
        let attached = |child: NodeId| match self.slots.get(child.0) {
            Some(slot) if slot.live && slot.parent == Some(id) => Ok(()),
            _ => Err(JastError::Invariant(format!(
                "member {} of node {} is detached",
                child.0, id.0
            ))),
        };
        match self.payload(id) {
            Payload::Array(ids) => ids.iter().try_for_each(|child| attached(*child)),
            Payload::Object(entries) => {
                let mut keys = HashSet::with_capacity(entries.len());
                for (key, child) in entries {
                    if !keys.insert(key.as_str()) {
                        return Err(JastError::Invariant(format!(
                            "object {} holds key {:?} twice",
                            id.0, key
                        )));
                    }
                    attached(*child)?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Check every structural invariant reachable from the root.
    pub fn validate(&self) -> Result<()> {
        let mut seen = vec![false; self.slots.len()];
        let mut stack = vec![(self.root, None)];

        while let Some((id, expected_parent)) = stack.pop() {
            let slot = match self.slots.get(id.0) {
                Some(slot) if slot.live => slot,
                _ => {
                    return Err(JastError::Invariant(format!(
                        "node {} is reachable but not live",
                        id.0
                    )))
                }
            };
            if std::mem::replace(&mut seen[id.0], true) {
                return Err(JastError::Invariant(format!(
                    "node {} is reachable more than once",
                    id.0
                )));
            }
            if slot.parent != expected_parent {
                return Err(JastError::Invariant(format!(
                    "node {} has parent {:?}, expected {:?}",
                    id.0, slot.parent, expected_parent
                )));
            }
            match &slot.payload {
                Payload::Array(ids) => stack.extend(ids.iter().map(|c| (*c, Some(id)))),
                Payload::Object(entries) => {
                    let mut keys = HashSet::with_capacity(entries.len());
                    for (key, child) in entries {
                        if !keys.insert(key.as_str()) {
                            return Err(JastError::Invariant(format!(
                                "object {} holds key {:?} twice",
                                id.0, key
                            )));
                        }
                        stack.push((*child, Some(id)));
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }
}

impl PartialEq for Tree {
    fn eq(&self, other: &Self) -> bool {
        self.root() == other.root()
    }
}

// ============================================================================
// Read view
// ============================================================================

/// Read-only view of one node.
#[derive(Clone, Copy)]
pub struct Node<'a> {
    tree: &'a Tree,
    id: NodeId,
}

impl<'a> Node<'a> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn tree(&self) -> &'a Tree {
        self.tree
    }

    pub(crate) fn payload(&self) -> &'a Payload {
        self.tree.payload(self.id)
    }

    pub fn kind(&self) -> Kind {
        self.payload().kind()
    }

    pub fn parent(&self) -> Option<Node<'a>> {
        self.tree.parent_id(self.id).map(|id| Node {
            tree: self.tree,
            id,
        })
    }

    /// Dotted path from the root to this node: object members contribute
    /// their key, array members their index. Empty at the root.
    pub fn key(&self) -> String {
        self.tree.key_of(self.id)
    }

    /// Resolve a dotted path below this node. `""` is the node itself.
    /// Unknown keys, bad indices and descending into scalars all yield `None`.
    pub fn get_child(&self, path: &str) -> Option<Node<'a>> {
        self.tree.resolve(self.id, path).map(|id| Node {
            tree: self.tree,
            id,
        })
    }

    /// Immediate member count for containers, 1 for scalars, 0 for `Error`.
    pub fn len(&self) -> usize {
        match self.payload() {
            Payload::Array(ids) => ids.len(),
            Payload::Object(entries) => entries.len(),
            Payload::Error => 0,
            _ => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of nodes in this subtree, including this one.
    pub fn total(&self) -> usize {
        match self.payload() {
            Payload::Error => 0,
            Payload::Array(_) | Payload::Object(_) => {
                1 + self.children().map(|(_, child)| child.total()).sum::<usize>()
            }
            _ => 1,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.payload() {
            Payload::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self.payload() {
            Payload::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&'a str> {
        match self.payload() {
            Payload::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self.payload(), Payload::Null)
    }

    /// Members in order. Object members carry their key, array members `None`.
    pub fn children(&self) -> impl Iterator<Item = (Option<&'a str>, Node<'a>)> + 'a {
        let tree = self.tree;
        let (ids, entries): (&'a [NodeId], &'a [(String, NodeId)]) = match self.payload() {
            Payload::Array(ids) => (ids.as_slice(), &[]),
            Payload::Object(entries) => (&[], entries.as_slice()),
            _ => (&[], &[]),
        };
        ids.iter()
            .map(move |&id| (None, Node { tree, id }))
            .chain(
                entries
                    .iter()
                    .map(move |(key, id)| (Some(key.as_str()), Node { tree, id: *id })),
            )
    }

    /// Keys of an object's members or the indices of an array's elements,
    /// `None` for scalars.
    pub fn children_keys(&self) -> Option<Vec<String>> {
        match self.payload() {
            Payload::Object(entries) => Some(entries.iter().map(|(k, _)| k.clone()).collect()),
            Payload::Array(ids) => Some((0..ids.len()).map(|i| i.to_string()).collect()),
            _ => None,
        }
    }

    /// Generic dynamic value. `Null` and `Error` map to `Value::Null`, as do
    /// numbers that JSON cannot represent.
    pub fn value(&self) -> Value {
        match self.payload() {
            Payload::Error | Payload::Null => Value::Null,
            Payload::Bool(b) => Value::Bool(*b),
            Payload::Number(n) => Number::from_f64(*n).map_or(Value::Null, Value::Number),
            Payload::String(s) => Value::String(s.clone()),
            Payload::Array(_) => {
                Value::Array(self.children().map(|(_, child)| child.value()).collect())
            }
            Payload::Object(_) => {
                let mut map = Map::new();
                for (key, child) in self.children() {
                    map.insert(key.unwrap_or_default().to_string(), child.value());
                }
                Value::Object(map)
            }
        }
    }

    /// Deep copy of this subtree as a new, independent tree.
    pub fn copy(&self) -> Tree {
        self.tree.copy_subtree(self.id)
    }
}

/// Structural equality: arrays compare in order, objects by key set.
impl PartialEq for Node<'_> {
    fn eq(&self, other: &Node<'_>) -> bool {
        match (self.payload(), other.payload()) {
            (Payload::Array(a), Payload::Array(b)) => {
                a.len() == b.len()
                    && self
                        .children()
                        .zip(other.children())
                        .all(|((_, x), (_, y))| x == y)
            }
            (Payload::Object(a), Payload::Object(b)) => {
                a.len() == b.len()
                    && a.iter().all(|(key, id)| {
                        other.tree.child_by_segment(other.id, key).is_some_and(|oid| {
                            Node {
                                tree: self.tree,
                                id: *id,
                            } == Node {
                                tree: other.tree,
                                id: oid,
                            }
                        })
                    })
            }
            (a, b) => a == b,
        }
    }
}

impl fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({} {:?} {})", self.kind(), self.key(), self)
    }
}

// ============================================================================
// Write view
// ============================================================================

/// Mutable view of one node.
pub struct NodeMut<'a> {
    tree: &'a mut Tree,
    id: NodeId,
}

impl<'a> NodeMut<'a> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn kind(&self) -> Kind {
        self.tree.kind_of(self.id)
    }

    /// Reborrow as a read view.
    pub fn as_node(&self) -> Node<'_> {
        Node {
            tree: self.tree,
            id: self.id,
        }
    }

    /// Move the view down to the node at `path`.
    pub fn into_child(self, path: &str) -> Option<NodeMut<'a>> {
        let id = self.tree.resolve(self.id, path)?;
        Some(NodeMut {
            tree: self.tree,
            id,
        })
    }

    /// Replace the node at an existing `path` with `value`, keeping the
    /// target's slot, key and position. Missing paths are an error; no
    /// intermediate containers are created.
    pub fn set_child(&mut self, path: &str, value: Tree) -> Result<()> {
        let Some(target) = self.tree.resolve(self.id, path) else {
            debug!(path, "set_child on missing path");
            return Err(JastError::PathNotFound {
                path: path.to_string(),
            });
        };
        self.tree.release_children(target);
        self.tree.graft_into(target, &value, value.root);
        self.check(target)
    }

    /// Append members to this array or object.
    ///
    /// For objects the whole batch is checked first: every key must be
    /// non-empty and absent from both the object and the rest of the batch.
    /// On failure nothing is appended.
    pub fn add_children<I>(&mut self, members: I) -> Result<()>
    where
        I: IntoIterator<Item = Member>,
    {
        let members: Vec<Member> = members.into_iter().collect();
        match self.tree.payload(self.id) {
            Payload::Array(_) => {
                for member in &members {
                    let child = self.tree.graft(&member.value, member.value.root, Some(self.id));
                    if let Payload::Array(ids) = self.tree.payload_mut(self.id) {
                        ids.push(child);
                    }
                }
            }
            Payload::Object(entries) => {
                let mut taken: HashSet<&str> = entries.iter().map(|(k, _)| k.as_str()).collect();
                for member in &members {
                    if member.key.is_empty() {
                        debug!("add_children rejected an empty key");
                        return Err(JastError::EmptyKey);
                    }
                    if !taken.insert(member.key.as_str()) {
                        debug!(key = %member.key, "add_children rejected a duplicate key");
                        return Err(JastError::DuplicateKey {
                            key: member.key.clone(),
                        });
                    }
                }
                for member in &members {
                    let child = self.tree.graft(&member.value, member.value.root, Some(self.id));
                    if let Payload::Object(entries) = self.tree.payload_mut(self.id) {
                        entries.push((member.key.clone(), child));
                    }
                }
            }
            other => {
                return Err(JastError::NotAContainer { kind: other.kind() });
            }
        }
        self.check(self.id)
    }

    /// Detach the node at `path` and return it as an independent tree.
    /// Array indices after it shift down by one.
    pub fn remove_child(&mut self, path: &str) -> Result<Tree> {
        let not_found = || JastError::PathNotFound {
            path: path.to_string(),
        };
        if path.is_empty() {
            return Err(not_found());
        }
        let (parent_path, last) = path.rsplit_once('.').unwrap_or(("", path));
        let parent = self.tree.resolve(self.id, parent_path).ok_or_else(not_found)?;
        let child = self
            .tree
            .child_by_segment(parent, last)
            .ok_or_else(not_found)?;

        let detached = self.tree.copy_subtree(child);
        match self.tree.payload_mut(parent) {
            Payload::Array(ids) => ids.retain(|id| *id != child),
            Payload::Object(entries) => entries.retain(|(_, id)| *id != child),
            _ => {}
        }
        self.tree.release(child);
        self.check(parent)?;
        Ok(detached)
    }

    /// The container a mutation touched is checked in every build; debug
    /// builds also walk the whole tree.
    fn check(&self, changed: NodeId) -> Result<()> {
        self.tree.check_members(changed)?;
        #[cfg(debug_assertions)]
        self.tree.validate()?;
        Ok(())
    }
}

impl fmt::Debug for NodeMut<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.as_node(), f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_index_rejects_non_canonical_forms() {
        assert_eq!(parse_index("0"), Some(0));
        assert_eq!(parse_index("12"), Some(12));
        assert_eq!(parse_index("012"), None);
        assert_eq!(parse_index("+1"), None);
        assert_eq!(parse_index("-1"), None);
        assert_eq!(parse_index(""), None);
    }

    #[test]
    fn released_slots_are_reused() {
        let mut tree = Tree::empty_array();
        tree.add_children([Member::element(Tree::number(1.0))])
            .unwrap();
        let before = tree.slots.len();
        tree.remove_child("0").unwrap();
        assert_eq!(tree.free.len(), 1);
        tree.add_children([Member::element(Tree::bool(true))])
            .unwrap();
        assert_eq!(tree.slots.len(), before);
        assert!(tree.free.is_empty());
    }

    #[test]
    fn validate_detects_broken_parent_link() {
        let mut tree = Tree::empty_object();
        tree.add_children([Member::new("a", Tree::null())]).unwrap();
        let child = tree.get("a").unwrap().id();
        tree.slot_mut(child).parent = None;
        assert!(matches!(tree.validate(), Err(JastError::Invariant(_))));
    }

    #[test]
    fn member_check_covers_the_touched_container() {
        let mut tree = Tree::empty_object();
        tree.add_children([
            Member::new("a", Tree::null()),
            Member::new("b", Tree::from_value(&serde_json::json!([1, 2]))),
        ])
        .unwrap();
        let root = tree.root;
        let b = tree.get("b").unwrap().id();
        let first = tree.get("b.0").unwrap().id();
        assert!(tree.check_members(root).is_ok());

        tree.slot_mut(first).parent = Some(root);
        assert!(tree.check_members(root).is_ok());
        assert!(matches!(tree.check_members(b), Err(JastError::Invariant(_))));

        tree.slot_mut(first).parent = Some(b);
        tree.release(first);
        assert!(matches!(tree.check_members(b), Err(JastError::Invariant(_))));
    }

    #[test]
    fn member_check_rejects_duplicate_keys() {
        let mut tree = Tree::empty_object();
        tree.add_children([Member::new("a", Tree::null())]).unwrap();
        let root = tree.root;
        let extra = tree.alloc(Payload::Null, Some(root));
        if let Payload::Object(entries) = tree.payload_mut(root) {
            entries.push(("a".to_string(), extra));
        }
        assert!(matches!(
            tree.check_members(root),
            Err(JastError::Invariant(msg)) if msg.contains("\"a\" twice")
        ));
    }

    #[test]
    fn validate_detects_duplicate_keys() {
        let mut tree = Tree::empty_object();
        tree.add_children([Member::new("a", Tree::null())]).unwrap();
        let root = tree.root;
        let extra = tree.alloc(Payload::Null, Some(root));
        if let Payload::Object(entries) = tree.payload_mut(root) {
            entries.push(("a".to_string(), extra));
        }
        assert!(matches!(tree.validate(), Err(JastError::Invariant(_))));
    }

    #[test]
    fn node_lookup_ignores_released_slots() {
        let mut tree = Tree::empty_array();
        tree.add_children([Member::element(Tree::null())]).unwrap();
        let id = tree.get("0").unwrap().id();
        tree.remove_child("0").unwrap();
        assert!(tree.node(id).is_none());
    }
}
