//! Owned handles: nullable unique and shared ownership, plus the erased
//! shared handle that round-trips through the polymorphic registry.

use std::sync::Arc;

use crate::archive::{ArchiveNode, EMPTY_NAME};
use crate::error::{ArchiveError, Result};
use crate::traits::{Depth, Load, Polymorphic, Save};

/// Exclusive ownership of a target value, convertible to null.
///
/// Saving a null unique handle fails `NullPointer`; loading always installs
/// a freshly constructed target.
#[derive(Debug, PartialEq)]
pub struct Unique<T>(Option<Box<T>>);

impl<T> Default for Unique<T> {
    fn default() -> Self {
        Unique::null()
    }
}

impl<T> Unique<T> {
    pub fn new(value: T) -> Self {
        Unique(Some(Box::new(value)))
    }

    pub fn null() -> Self {
        Unique(None)
    }

    pub fn is_null(&self) -> bool {
        self.0.is_none()
    }

    pub fn get(&self) -> Option<&T> {
        self.0.as_deref()
    }

    pub fn get_mut(&mut self) -> Option<&mut T> {
        self.0.as_deref_mut()
    }

    pub fn take(&mut self) -> Option<T> {
        self.0.take().map(|boxed| *boxed)
    }
}

impl<T> From<T> for Unique<T> {
    fn from(value: T) -> Self {
        Unique::new(value)
    }
}

impl<T: Save> Save for Unique<T> {
    fn save<A: ArchiveNode>(&self, node: &mut A, depth: Depth) -> Result<()> {
        let depth = depth.descend()?;
        match &self.0 {
            None => Err(ArchiveError::NullPointer(format!(
                "cannot serialize a null unique handle to {}",
                std::any::type_name::<T>()
            ))),
            Some(value) => value.save(node, depth),
        }
    }
}

impl<T: Load> Load for Unique<T> {
    fn load<A: ArchiveNode>(node: &mut A, depth: Depth) -> Result<Self> {
        let depth = depth.descend()?;
        Ok(Unique::new(T::load(node, depth)?))
    }
}

/// Shared ownership of a target value, null-checkable.
///
/// The target serializes by value under its type name; sharing between
/// several handles is not preserved across a round trip — each load
/// installs its own freshly allocated target.
#[derive(Debug)]
pub struct Shared<T>(Option<Arc<T>>);

impl<T> Default for Shared<T> {
    fn default() -> Self {
        Shared::null()
    }
}

impl<T> Clone for Shared<T> {
    fn clone(&self) -> Self {
        Shared(self.0.clone())
    }
}

impl<T: PartialEq> PartialEq for Shared<T> {
    fn eq(&self, other: &Self) -> bool {
        match (&self.0, &other.0) {
            (Some(a), Some(b)) => a == b,
            (None, None) => true,
            _ => false,
        }
    }
}

impl<T> Shared<T> {
    pub fn new(value: T) -> Self {
        Shared(Some(Arc::new(value)))
    }

    pub fn from_arc(arc: Arc<T>) -> Self {
        Shared(Some(arc))
    }

    pub fn null() -> Self {
        Shared(None)
    }

    pub fn is_null(&self) -> bool {
        self.0.is_none()
    }

    pub fn get(&self) -> Option<&T> {
        self.0.as_deref()
    }

    pub fn arc(&self) -> Option<Arc<T>> {
        self.0.clone()
    }
}

impl<T> From<T> for Shared<T> {
    fn from(value: T) -> Self {
        Shared::new(value)
    }
}

impl<T: Save> Save for Shared<T> {
    fn save<A: ArchiveNode>(&self, node: &mut A, depth: Depth) -> Result<()> {
        let depth = depth.descend()?;
        match &self.0 {
            None => node.put_type_name(EMPTY_NAME),
            Some(value) => {
                // A reflectable pointee re-attaches its own name below; the
                // handle-level record keeps the byte stream symmetric.
                node.put_type_name(std::any::type_name::<T>())?;
                value.save(node, depth)
            }
        }
    }
}

impl<T: Load> Load for Shared<T> {
    fn load<A: ArchiveNode>(node: &mut A, depth: Depth) -> Result<Self> {
        let depth = depth.descend()?;
        let class_name = node.take_type_name()?;
        if class_name == EMPTY_NAME {
            return Ok(Shared::null());
        }
        Ok(Shared::new(T::load(node, depth)?))
    }
}

// Plain boxes and arcs are never null; they archive transparently as their
// targets.
impl<T: Save + ?Sized> Save for Box<T> {
    fn save<A: ArchiveNode>(&self, node: &mut A, depth: Depth) -> Result<()> {
        (**self).save(node, depth)
    }
}

impl<T: Load> Load for Box<T> {
    fn load<A: ArchiveNode>(node: &mut A, depth: Depth) -> Result<Self> {
        Ok(Box::new(T::load(node, depth)?))
    }
}

impl<T: Save + ?Sized> Save for Arc<T> {
    fn save<A: ArchiveNode>(&self, node: &mut A, depth: Depth) -> Result<()> {
        (**self).save(node, depth)
    }
}

impl<T: Load> Load for Arc<T> {
    fn load<A: ArchiveNode>(node: &mut A, depth: Depth) -> Result<Self> {
        Ok(Arc::new(T::load(node, depth)?))
    }
}

/// A nullable shared handle whose static element type is erased: the value
/// is owned behind `dyn Polymorphic` and round-trips through the per-format
/// registry under its concrete type name.
#[derive(Clone, Default)]
pub struct AnyShared(Option<Arc<dyn Polymorphic>>);

impl std::fmt::Debug for AnyShared {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.0 {
            Some(value) => write!(f, "AnyShared({})", value.type_name()),
            None => write!(f, "AnyShared(null)"),
        }
    }
}

impl AnyShared {
    pub fn new<T: Polymorphic>(value: T) -> Self {
        AnyShared(Some(Arc::new(value)))
    }

    pub fn from_arc<T: Polymorphic>(arc: Arc<T>) -> Self {
        AnyShared(Some(arc))
    }

    pub fn null() -> Self {
        AnyShared(None)
    }

    pub fn is_null(&self) -> bool {
        self.0.is_none()
    }

    /// Concrete type name of the target, if any.
    pub fn type_name(&self) -> Option<&'static str> {
        self.0.as_ref().map(|value| value.type_name())
    }

    /// Recover concrete ownership of the target.
    pub fn downcast<T: Polymorphic>(&self) -> Option<Arc<T>> {
        let value = self.0.clone()?;
        value.into_any().downcast::<T>().ok()
    }
}

impl Save for AnyShared {
    fn save<A: ArchiveNode>(&self, node: &mut A, depth: Depth) -> Result<()> {
        let depth = depth.descend()?;
        match &self.0 {
            None => node.put_type_name(EMPTY_NAME),
            Some(value) => {
                let class_name = value.type_name();
                node.put_type_name(class_name)?;
                let registry = A::registry();
                if !registry.has(class_name) {
                    return Err(ArchiveError::RegistryNotFound(class_name.to_string()));
                }
                registry.save(class_name, node, value.as_ref(), depth)
            }
        }
    }
}

impl Load for AnyShared {
    fn load<A: ArchiveNode>(node: &mut A, depth: Depth) -> Result<Self> {
        let depth = depth.descend()?;
        let class_name = node.take_type_name()?;
        if class_name == EMPTY_NAME {
            return Ok(AnyShared::null());
        }
        let registry = A::registry();
        if !registry.has(&class_name) {
            return Err(ArchiveError::RegistryNotFound(class_name));
        }
        Ok(AnyShared(Some(registry.load(&class_name, node, depth)?)))
    }
}
