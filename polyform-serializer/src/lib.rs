//! Multi-format archive serialization with compile-time reflection.
//!
//! This crate converts object graphs to and from three interchangeable
//! archive formats — a JSON-shaped tree, an XML-shaped tagged tree and a
//! self-describing byte stream — from one compile-time description of each
//! user type. It provides:
//!
//! - A statically dispatched save/load engine over primitives, containers,
//!   fixed arrays, tuples, optionals, sums, owned handles and reflectable
//!   aggregates
//! - Derive macros (`Reflect`, `Variant`, `Enumerated`, `Polymorphic`) that
//!   generate the per-type descriptions, including descriptor inheritance
//!   via a flattened `#[reflect(base)]` field
//! - Per-format polymorphic registries so values owned behind an erased
//!   base round-trip under their concrete type names
//!
//! ```
//! use polyform_serializer::{load, save, Reflect};
//!
//! #[derive(Reflect, Default, PartialEq, Debug)]
//! struct Point {
//!     x: i32,
//!     y: i32,
//! }
//!
//! let point = Point { x: 1, y: 2 };
//! let mut node = serde_json::Value::Null;
//! save(&mut node, &point).unwrap();
//! let back: Point = load(&mut node).unwrap();
//! assert_eq!(back, point);
//! ```

pub mod archive;
pub mod binary;
mod containers;
pub mod error;
pub mod handle;
pub mod io;
mod primitives;
pub mod reflect;
pub mod registry;
pub mod traits;
mod tuples;
pub mod xml;

mod json;

// Re-export the derive macros so callers only depend on this crate.
pub use polyform_serializer_macros::*;

pub use archive::{
    ArchiveNode, Scalar, ScalarKind, CLASS_NAME, EMPTY_NAME, INDEX_NAME, SIZE_NAME, VALUE_NAME,
};
pub use binary::ByteStream;
pub use error::{ArchiveError, Result};
pub use handle::{AnyShared, Shared, Unique};
pub use primitives::{CanonicalString, Timestamp};
pub use reflect::{Descriptor, MemberEntry, Reflect};
pub use registry::{register_type, PolyRegistry, BINARY_REGISTRY, JSON_REGISTRY, XML_REGISTRY};
pub use traits::{Depth, Load, Polymorphic, Save};
pub use xml::XmlElement;

/// Serialize a value into an archive node.
pub fn save<A: ArchiveNode, T: Save + ?Sized>(node: &mut A, value: &T) -> Result<()> {
    value.save(node, Depth::root())
}

/// Reconstruct a value from an archive node.
pub fn load<A: ArchiveNode, T: Load>(node: &mut A) -> Result<T> {
    T::load(node, Depth::root())
}
