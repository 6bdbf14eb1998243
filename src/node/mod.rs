//! The versioned document tree.
//!
//! A document is a tree of [`NodeRef`] handles. Every node keeps the history
//! of its own fields in [`VersionedCell`]s plus two [`VersionRollup`]s: one
//! for versions at which the node itself was edited and one for versions at
//! which anything below it changed. Together they answer "what did this
//! subtree look like at version v" without copying the tree per version.
//!
//! Snapshots are taken with [`NodeRef::fork`], which shares all children with
//! the source. Each container remembers which children it owns exclusively;
//! [`NodeRef::child_mut`] copies a shared child into its slot before handing
//! it out, so edits through one snapshot never leak into another.
//!
//! # Examples
//!
//! ```
//! use doctree::{NodeRef, VersionId};
//!
//! let root = NodeRef::root(vec![NodeRef::paragraph(vec![NodeRef::text("hello")])]);
//! let v1 = VersionId::new(1);
//! {
//!     let _root = root.edit(v1);
//!     let paragraph = root.child_mut(0);
//!     let _paragraph = paragraph.edit(v1);
//!     paragraph.push_child(NodeRef::text(" world"));
//! }
//! assert_eq!(root.len(), 11);
//! assert_eq!(root.len_at(VersionId::INITIAL), 5);
//! ```

mod container;
mod editing;
mod history;
mod math;

pub use editing::EditGuard;

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use bitflags::bitflags;

use crate::error::{Error, Result};
use crate::style::PropertyMap;
use crate::version::{VersionId, VersionRollup, VersionedCell};

/// Logical identity of a node.
///
/// Copy-on-write copies keep the id of the node they replace: they are the
/// same node as seen from another snapshot. Constructors and
/// [`NodeRef::clone_at`] allocate fresh ids.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u64);

impl NodeId {
    fn fresh() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Marks which container exclusively owns a node.
///
/// A container hands its tag to every child it attaches. Forking replaces
/// the tag, which releases all children at once without touching them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct OwnerTag(u64);

impl OwnerTag {
    pub(crate) fn fresh() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Kind of a node, without its payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeType {
    Root,
    Content,
    Paragraph,
    Heading,
    Emphasis,
    Text,
    Linebreak,
    Equation,
    Fraction,
}

bitflags! {
    /// Structural traits of a [`NodeType`].
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct NodeFlags: u8 {
        /// Starts a paragraph; receives paragraph style after layout.
        const BLOCK     = 0x01;
        /// Holds a versioned children list.
        const CONTAINER = 0x02;
        /// Has no children.
        const LEAF      = 0x04;
        /// Mathematical construct with fixed component slots.
        const MATH      = 0x08;
        /// Laid out as a single opaque fragment of length one.
        const FRAGMENT  = 0x10;
    }
}

impl NodeType {
    #[must_use]
    pub const fn flags(self) -> NodeFlags {
        match self {
            Self::Root | Self::Content | Self::Emphasis => NodeFlags::CONTAINER,
            Self::Paragraph | Self::Heading => NodeFlags::CONTAINER.union(NodeFlags::BLOCK),
            Self::Text | Self::Linebreak => NodeFlags::LEAF,
            Self::Equation | Self::Fraction => NodeFlags::MATH.union(NodeFlags::FRAGMENT),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::Content => "content",
            Self::Paragraph => "paragraph",
            Self::Heading => "heading",
            Self::Emphasis => "emphasis",
            Self::Text => "text",
            Self::Linebreak => "linebreak",
            Self::Equation => "equation",
            Self::Fraction => "fraction",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Element nodes: containers with a versioned children list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Root,
    Content,
    Paragraph,
    Heading { level: u8 },
    Emphasis,
}

impl ElementKind {
    #[must_use]
    pub const fn node_type(self) -> NodeType {
        match self {
            Self::Root => NodeType::Root,
            Self::Content => NodeType::Content,
            Self::Paragraph => NodeType::Paragraph,
            Self::Heading { .. } => NodeType::Heading,
            Self::Emphasis => NodeType::Emphasis,
        }
    }
}

/// Math nodes: a fixed set of named [`ElementKind::Content`] components.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MathKind {
    Equation { is_block: bool },
    Fraction,
}

impl MathKind {
    #[must_use]
    pub const fn node_type(self) -> NodeType {
        match self {
            Self::Equation { .. } => NodeType::Equation,
            Self::Fraction => NodeType::Fraction,
        }
    }

    /// Names of the component slots, in order.
    #[must_use]
    pub const fn component_names(self) -> &'static [&'static str] {
        match self {
            Self::Equation { .. } => &["nucleus"],
            Self::Fraction => &["numerator", "denominator"],
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct ElementData {
    pub(crate) children: VersionedCell<Vec<NodeRef>>,
    pub(crate) length: VersionedCell<usize>,
}

#[derive(Clone, Debug)]
pub(crate) enum Content {
    Text(VersionedCell<Rc<str>>),
    Linebreak,
    Element {
        kind: ElementKind,
        data: Rc<ElementData>,
    },
    Math {
        kind: MathKind,
        components: Rc<Vec<NodeRef>>,
    },
}

impl Content {
    const fn node_type(&self) -> NodeType {
        match self {
            Self::Text(_) => NodeType::Text,
            Self::Linebreak => NodeType::Linebreak,
            Self::Element { kind, .. } => kind.node_type(),
            Self::Math { kind, .. } => kind.node_type(),
        }
    }

    pub(crate) fn advance_version(&mut self, version: VersionId) {
        match self {
            Self::Text(cell) => cell.advance_version(version),
            Self::Element { data, .. } => {
                let data = Rc::make_mut(data);
                data.children.advance_version(version);
                data.length.advance_version(version);
            }
            Self::Linebreak | Self::Math { .. } => {}
        }
    }
}

#[derive(Debug)]
pub(crate) struct Node {
    pub(crate) id: NodeId,
    pub(crate) content: Content,
    pub(crate) own: VersionRollup,
    pub(crate) nested: VersionRollup,
    pub(crate) editing_level: u32,
    pub(crate) parent: Weak<RefCell<Node>>,
    pub(crate) owner: Option<OwnerTag>,
    pub(crate) slot_tag: OwnerTag,
    pub(crate) style: Option<Rc<PropertyMap>>,
}

impl Node {
    fn fresh(content: Content) -> Self {
        Self {
            id: NodeId::fresh(),
            content,
            own: VersionRollup::new(VersionId::INITIAL),
            nested: VersionRollup::new(VersionId::INITIAL),
            editing_level: 0,
            parent: Weak::new(),
            owner: None,
            slot_tag: OwnerTag::fresh(),
            style: None,
        }
    }

    /// Detached copy sharing content storage, with its own slot tag.
    pub(crate) fn shell_copy(&self) -> Self {
        Self {
            id: self.id,
            content: self.content.clone(),
            own: self.own.clone(),
            nested: self.nested.clone(),
            editing_level: 0,
            parent: Weak::new(),
            owner: None,
            slot_tag: OwnerTag::fresh(),
            style: None,
        }
    }

    pub(crate) fn subtree_version(&self) -> VersionId {
        self.own.last().max(self.nested.last())
    }

    fn len(&self) -> usize {
        match &self.content {
            Content::Text(cell) => cell.value().chars().count(),
            Content::Linebreak | Content::Math { .. } => 1,
            Content::Element { data, .. } => *data.length.value(),
        }
    }

    fn len_at(&self, version: VersionId) -> usize {
        match &self.content {
            Content::Text(cell) => cell.get(version).chars().count(),
            Content::Linebreak | Content::Math { .. } => 1,
            Content::Element { data, .. } => *data.length.get(version),
        }
    }
}

/// Shared handle to a tree node.
///
/// Equality is handle identity. Two handles with equal [`NodeRef::id`] but
/// different identity are views of one logical node from different snapshots.
#[derive(Clone)]
pub struct NodeRef(pub(crate) Rc<RefCell<Node>>);

impl PartialEq for NodeRef {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for NodeRef {}

impl fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let node = self.node();
        f.debug_struct("NodeRef")
            .field("id", &node.id)
            .field("type", &node.content.node_type())
            .field("version", &node.subtree_version())
            .finish()
    }
}

impl NodeRef {
    pub(crate) fn wrap(node: Node) -> Self {
        Self(Rc::new(RefCell::new(node)))
    }

    pub(crate) fn node(&self) -> Ref<'_, Node> {
        self.0.borrow()
    }

    pub(crate) fn node_mut(&self) -> RefMut<'_, Node> {
        self.0.borrow_mut()
    }

    pub(crate) fn addr(&self) -> usize {
        Rc::as_ptr(&self.0).cast::<()>() as usize
    }

    pub(crate) fn from_parent(parent: &Weak<RefCell<Node>>) -> Option<Self> {
        parent.upgrade().map(Self)
    }

    // ========================================================================
    // Construction
    // ========================================================================

    /// A text run.
    #[must_use]
    pub fn text(text: &str) -> Self {
        Self::wrap(Node::fresh(Content::Text(VersionedCell::new(Rc::from(text)))))
    }

    /// An explicit line break of length one.
    #[must_use]
    pub fn linebreak() -> Self {
        Self::wrap(Node::fresh(Content::Linebreak))
    }

    /// An element owning `children`.
    ///
    /// # Panics
    ///
    /// Panics if any child is already attached to another container.
    #[must_use]
    pub fn element(kind: ElementKind, children: Vec<Self>) -> Self {
        let length = children.iter().map(Self::len).sum();
        let data = ElementData {
            children: VersionedCell::new(children.clone()),
            length: VersionedCell::new(length),
        };
        let node = Self::wrap(Node::fresh(Content::Element {
            kind,
            data: Rc::new(data),
        }));
        for child in &children {
            child.attach_to(&node);
        }
        node
    }

    #[must_use]
    pub fn root(children: Vec<Self>) -> Self {
        Self::element(ElementKind::Root, children)
    }

    #[must_use]
    pub fn content(children: Vec<Self>) -> Self {
        Self::element(ElementKind::Content, children)
    }

    #[must_use]
    pub fn paragraph(children: Vec<Self>) -> Self {
        Self::element(ElementKind::Paragraph, children)
    }

    #[must_use]
    pub fn heading(level: u8, children: Vec<Self>) -> Self {
        Self::element(ElementKind::Heading { level }, children)
    }

    #[must_use]
    pub fn emphasis(children: Vec<Self>) -> Self {
        Self::element(ElementKind::Emphasis, children)
    }

    /// An equation whose nucleus holds `nucleus`.
    #[must_use]
    pub fn equation(is_block: bool, nucleus: Vec<Self>) -> Self {
        Self::math(MathKind::Equation { is_block }, vec![Self::content(nucleus)])
    }

    #[must_use]
    pub fn fraction(numerator: Vec<Self>, denominator: Vec<Self>) -> Self {
        Self::math(
            MathKind::Fraction,
            vec![Self::content(numerator), Self::content(denominator)],
        )
    }

    fn math(kind: MathKind, components: Vec<Self>) -> Self {
        debug_assert_eq!(components.len(), kind.component_names().len());
        let node = Self::wrap(Node::fresh(Content::Math {
            kind,
            components: Rc::new(components.clone()),
        }));
        for component in &components {
            component.attach_to(&node);
        }
        node
    }

    /// Record `parent` as the exclusive owner of this node.
    pub(crate) fn attach_to(&self, parent: &Self) {
        let tag = parent.node().slot_tag;
        let mut node = self.node_mut();
        assert!(
            node.owner.is_none(),
            "node {} is already attached to a container",
            node.id
        );
        node.owner = Some(tag);
        node.parent = Rc::downgrade(&parent.0);
        node.style = None;
    }

    /// Sever this node from `parent` if `parent` owns it.
    pub(crate) fn release_from(&self, parent: &Self) {
        let tag = parent.node().slot_tag;
        let mut node = self.node_mut();
        if node.owner == Some(tag) {
            node.owner = None;
            node.parent = Weak::new();
            node.style = None;
        }
    }

    pub(crate) fn is_owned_by(&self, parent: &Self) -> bool {
        let tag = parent.node().slot_tag;
        self.node().owner == Some(tag)
    }

    // ========================================================================
    // Reading
    // ========================================================================

    #[must_use]
    pub fn id(&self) -> NodeId {
        self.node().id
    }

    #[must_use]
    pub fn node_type(&self) -> NodeType {
        self.node().content.node_type()
    }

    #[must_use]
    pub fn flags(&self) -> NodeFlags {
        self.node_type().flags()
    }

    #[must_use]
    pub fn is_block(&self) -> bool {
        self.flags().contains(NodeFlags::BLOCK)
    }

    #[must_use]
    pub fn element_kind(&self) -> Option<ElementKind> {
        match &self.node().content {
            Content::Element { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    #[must_use]
    pub fn math_kind(&self) -> Option<MathKind> {
        match &self.node().content {
            Content::Math { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Last version at which this node's own content was edited.
    #[must_use]
    pub fn node_version(&self) -> VersionId {
        self.node().own.last()
    }

    /// Last version at which any descendant changed.
    #[must_use]
    pub fn max_nested_version(&self) -> VersionId {
        self.node().nested.last()
    }

    #[must_use]
    pub fn subtree_version(&self) -> VersionId {
        self.node().subtree_version()
    }

    /// Most recent change anywhere in this subtree at or before `version`.
    ///
    /// Two views of the same logical node with equal stamps have identical
    /// content.
    #[must_use]
    pub fn stamp_at(&self, version: VersionId) -> Option<VersionId> {
        let node = self.node();
        match (node.own.latest_at(version), node.nested.latest_at(version)) {
            (Some(own), Some(nested)) => Some(own.max(nested)),
            (own, nested) => own.or(nested),
        }
    }

    /// Layout length at the latest version.
    #[must_use]
    pub fn len(&self) -> usize {
        self.node().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Layout length at `version`.
    ///
    /// # Panics
    ///
    /// Panics if `version` is below the retained history.
    #[must_use]
    pub fn len_at(&self, version: VersionId) -> usize {
        self.node().len_at(version)
    }

    /// Text of a text node at the latest version.
    #[must_use]
    pub fn current_text(&self) -> Option<Rc<str>> {
        match &self.node().content {
            Content::Text(cell) => Some(Rc::clone(cell.value())),
            _ => None,
        }
    }

    #[must_use]
    pub fn text_at(&self, version: VersionId) -> Option<Rc<str>> {
        match &self.node().content {
            Content::Text(cell) => Some(Rc::clone(cell.get(version))),
            _ => None,
        }
    }

    #[must_use]
    pub fn child_count(&self) -> usize {
        match &self.node().content {
            Content::Element { data, .. } => data.children.value().len(),
            _ => 0,
        }
    }

    #[must_use]
    pub fn child_count_at(&self, version: VersionId) -> usize {
        match &self.node().content {
            Content::Element { data, .. } => data.children.get(version).len(),
            _ => 0,
        }
    }

    /// Child `index` at the latest version, without claiming ownership.
    ///
    /// # Panics
    ///
    /// Panics if this is not an element or `index` is out of range.
    #[must_use]
    pub fn child(&self, index: usize) -> Self {
        self.try_child(index).unwrap_or_else(|err| panic!("{err}"))
    }

    /// Checked form of [`child`](Self::child).
    pub fn try_child(&self, index: usize) -> Result<Self> {
        let node = self.node();
        match &node.content {
            Content::Element { data, .. } => {
                let children = data.children.value();
                children
                    .get(index)
                    .cloned()
                    .ok_or(Error::ChildOutOfRange {
                        index,
                        count: children.len(),
                    })
            }
            other => Err(Error::NotAContainer(other.node_type())),
        }
    }

    /// Child `index` as of `version`.
    ///
    /// # Panics
    ///
    /// Panics if this is not an element or `index` is out of range.
    #[must_use]
    pub fn child_at(&self, index: usize, version: VersionId) -> Self {
        let children = self.children_at(version);
        let count = children.len();
        children
            .into_iter()
            .nth(index)
            .unwrap_or_else(|| panic!("{}", Error::ChildOutOfRange { index, count }))
    }

    /// Children at the latest version. Empty for non-elements.
    #[must_use]
    pub fn children(&self) -> Vec<Self> {
        match &self.node().content {
            Content::Element { data, .. } => data.children.value().clone(),
            _ => Vec::new(),
        }
    }

    #[must_use]
    pub fn children_at(&self, version: VersionId) -> Vec<Self> {
        match &self.node().content {
            Content::Element { data, .. } => data.children.get(version).clone(),
            _ => Vec::new(),
        }
    }

    /// The container this node is attached to.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        Self::from_parent(&self.node().parent)
    }

    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.node().owner.is_some()
    }
}
