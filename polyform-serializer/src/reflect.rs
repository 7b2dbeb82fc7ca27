//! Reflection descriptors and the aggregate traversal entry points.

use crate::archive::{ArchiveNode, CLASS_NAME, EMPTY_NAME};
use crate::error::{ArchiveError, Result};
use crate::traits::Depth;

/// One descriptor entry: a member name and the member's type name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberEntry {
    pub name: &'static str,
    pub type_name: &'static str,
}

impl MemberEntry {
    pub const fn new(name: &'static str, type_name: &'static str) -> Self {
        MemberEntry { name, type_name }
    }
}

/// The ordered member list of a reflectable aggregate.
///
/// Descriptors have value identity: two are equivalent iff their sequences
/// of (name, type-name) pairs match. A derived type's descriptor is its
/// parent's entries followed by its own additions, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Descriptor {
    members: Vec<MemberEntry>,
}

impl Descriptor {
    pub fn new(members: Vec<MemberEntry>) -> Self {
        Descriptor { members }
    }

    pub fn members(&self) -> &[MemberEntry] {
        &self.members
    }

    pub fn into_members(self) -> Vec<MemberEntry> {
        self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// A reflectable aggregate: an ordered list of named member accessors, an
/// identity string and a post-load hook.
///
/// Usually generated by `#[derive(Reflect)]`. A parent embedded as a field
/// marked `#[reflect(base)]` contributes its members first, flattened into
/// the same node, which is how descriptor inheritance composes.
pub trait Reflect: Sized {
    /// Canonical type-identity string, identical across all formats.
    fn type_name() -> &'static str {
        std::any::type_name::<Self>()
    }

    fn descriptor() -> Descriptor;

    /// Write every member under a child node keyed by its member name.
    fn save_members<A: ArchiveNode>(&self, node: &mut A, depth: Depth) -> Result<()>;

    /// Read every member, in descriptor order, from its named child node.
    fn load_members<A: ArchiveNode>(&mut self, node: &mut A, depth: Depth) -> Result<()>;

    /// Invoked after all members have loaded; never invoked on save. May
    /// recompute transient state or re-validate invariants (returning an
    /// error rejects the object).
    fn initialize(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Save a reflectable by value: type attribute first, then the members.
pub fn save_aggregate<A: ArchiveNode, T: Reflect>(
    value: &T,
    node: &mut A,
    depth: Depth,
) -> Result<()> {
    let depth = depth.descend()?;
    node.put_type_name(T::type_name())?;
    value.save_members(node, depth)
}

/// Load a reflectable by value. An absent type attribute fails
/// `MissingField`; the empty sentinel leaves the object default-initialized;
/// otherwise members load in descriptor order and `initialize` runs.
pub fn load_aggregate<A: ArchiveNode, T: Reflect + Default>(
    node: &mut A,
    depth: Depth,
) -> Result<T> {
    let depth = depth.descend()?;
    let class_name = node.take_type_name()?;
    if class_name.is_empty() {
        return Err(ArchiveError::MissingField(format!(
            "{CLASS_NAME} attribute for {}",
            T::type_name()
        )));
    }

    let mut value = T::default();
    if class_name != EMPTY_NAME {
        value.load_members(node, depth)?;
        value.initialize()?;
    }
    Ok(value)
}
