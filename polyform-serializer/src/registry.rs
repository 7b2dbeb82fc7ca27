//! Per-format polymorphic registries: process-wide tables from type-identity
//! strings to monomorphized serialize/deserialize callbacks.
//!
//! Registration happens explicitly at program start, before the first save
//! or load; reads are lock-free afterwards. Callers performing runtime
//! registration must serialize it themselves.

use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;
use serde_json::Value;

use crate::archive::ArchiveNode;
use crate::binary::ByteStream;
use crate::error::{ArchiveError, Result};
use crate::traits::{Depth, Load, Polymorphic, Save};
use crate::xml::XmlElement;

struct PolyEntry<A: 'static> {
    save: fn(&mut A, &dyn Polymorphic, Depth) -> Result<()>,
    load: fn(&mut A, Depth) -> Result<Arc<dyn Polymorphic>>,
}

impl<A: 'static> Clone for PolyEntry<A> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<A: 'static> Copy for PolyEntry<A> {}

fn poly_save<A, T>(node: &mut A, value: &dyn Polymorphic, depth: Depth) -> Result<()>
where
    A: ArchiveNode,
    T: Polymorphic + Save,
{
    let concrete = value.as_any().downcast_ref::<T>().ok_or_else(|| {
        ArchiveError::Decode(format!(
            "registry callback for {} received a different concrete type",
            std::any::type_name::<T>()
        ))
    })?;
    concrete.save(node, depth)
}

fn poly_load<A, T>(node: &mut A, depth: Depth) -> Result<Arc<dyn Polymorphic>>
where
    A: ArchiveNode,
    T: Polymorphic + Load,
{
    Ok(Arc::new(T::load(node, depth)?))
}

/// One format's registry: type-identity string to callback pair.
pub struct PolyRegistry<A: 'static> {
    entries: DashMap<String, PolyEntry<A>>,
}

impl<A: ArchiveNode> PolyRegistry<A> {
    fn new() -> Self {
        PolyRegistry {
            entries: DashMap::new(),
        }
    }

    /// Constant-time membership probe.
    pub fn has(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    fn entry(&self, name: &str) -> Result<PolyEntry<A>> {
        // Copy the entry out so no shard guard is held while the callback
        // recurses (nested erased handles re-enter this registry).
        self.entries
            .get(name)
            .map(|entry| *entry)
            .ok_or_else(|| ArchiveError::RegistryNotFound(name.to_string()))
    }

    /// Invoke the save-direction callback: the erased value is downcast to
    /// the registered concrete type and saved recursively. The caller's
    /// depth carries through so the recursion cap spans registry hops.
    pub fn save(
        &self,
        name: &str,
        node: &mut A,
        value: &dyn Polymorphic,
        depth: Depth,
    ) -> Result<()> {
        (self.entry(name)?.save)(node, value, depth)
    }

    /// Invoke the load-direction callback: a value of the registered
    /// concrete type is constructed, loaded recursively and returned owned.
    pub fn load(&self, name: &str, node: &mut A, depth: Depth) -> Result<Arc<dyn Polymorphic>> {
        (self.entry(name)?.load)(node, depth)
    }

    fn register<T>(&self) -> Result<()>
    where
        T: Polymorphic + Save + Load,
    {
        let type_name = std::any::type_name::<T>();
        if self.entries.contains_key(type_name) {
            return Err(ArchiveError::DuplicateRegistration(type_name.to_string()));
        }

        let entry = PolyEntry {
            save: poly_save::<A, T>,
            load: poly_load::<A, T>,
        };
        self.entries.insert(type_name.to_string(), entry);

        // Also answer to the short trailing segment, first registration
        // wins. Full names always take precedence because they are checked
        // for duplicates above.
        if let Some(simple_name) = type_name.rsplit("::").next() {
            if simple_name != type_name && !self.entries.contains_key(simple_name) {
                self.entries.insert(simple_name.to_string(), entry);
            }
        }
        Ok(())
    }
}

/// Registry serving the JSON-shaped backing.
pub static JSON_REGISTRY: Lazy<PolyRegistry<Value>> = Lazy::new(PolyRegistry::new);

/// Registry serving the tagged-tree backing.
pub static XML_REGISTRY: Lazy<PolyRegistry<XmlElement>> = Lazy::new(PolyRegistry::new);

/// Registry serving the byte-stream backing.
pub static BINARY_REGISTRY: Lazy<PolyRegistry<ByteStream>> = Lazy::new(PolyRegistry::new);

/// Install a concrete type in all three format registries at once, keyed by
/// its type-identity string. A second registration of the same type is
/// rejected with `DuplicateRegistration`.
pub fn register_type<T>() -> Result<()>
where
    T: Polymorphic + Save + Load,
{
    let type_name = std::any::type_name::<T>();
    if JSON_REGISTRY.has(type_name) || XML_REGISTRY.has(type_name) || BINARY_REGISTRY.has(type_name)
    {
        return Err(ArchiveError::DuplicateRegistration(type_name.to_string()));
    }
    JSON_REGISTRY.register::<T>()?;
    XML_REGISTRY.register::<T>()?;
    BINARY_REGISTRY.register::<T>()?;
    Ok(())
}
