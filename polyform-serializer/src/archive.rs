//! The uniform archive node abstraction shared by the three backings.

use crate::error::Result;
use crate::registry::PolyRegistry;

/// Attribute key carrying a node's type-identity string
pub const CLASS_NAME: &str = "Class";
/// Attribute key carrying a declared child count in the tagged-tree backing
pub const SIZE_NAME: &str = "Size";
/// Attribute key carrying a sum value's active tag
pub const INDEX_NAME: &str = "Index";
/// Child key carrying a sum value's active alternative
pub const VALUE_NAME: &str = "Value";
/// Sentinel type name written for a null shared handle
pub const EMPTY_NAME: &str = "null object!";

/// A primitive payload, width-faithful so the byte-stream backing can use
/// native encodings.
///
/// `Enum` and `Timestamp` carry both of their forms on save; the backing
/// picks the one its format mandates (an enum is its canonical name in
/// text and its ordinal in binary; a date-like is numeric in the key-value
/// tree and the byte stream, its canonical string in the tagged tree). On
/// load the backing returns whichever repr it actually holds and the
/// caller resolves it.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Char(char),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Str(String),
    /// The empty-sum placeholder: JSON null, empty element, one marker byte
    Unit,
    Enum { name: &'static str, ordinal: u32 },
    Timestamp { seconds: f64, text: String },
}

/// What a load expects to read back; the byte stream needs this to know the
/// width of the next record, the tree backings use it for conversion checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Bool,
    Char,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Str,
    Unit,
    Enum,
    Timestamp,
}

/// Uniform key/index-addressable tree API over one archive backing.
///
/// The three implementations interpret the operations per their format:
/// the JSON tree addresses children by object key and array index, the
/// tagged tree by element name and position, and the byte stream resolves
/// every child access to its single cursor (`named` and `at` both return
/// the stream itself, positional semantics are implicit).
///
/// For any value written and read with the same static type, the sequence
/// of node addresses used by save and load coincides.
pub trait ArchiveNode: Sized + 'static {
    /// Store a primitive payload on this node.
    fn put_scalar(&mut self, value: Scalar) -> Result<()>;

    /// Read this node's primitive payload.
    fn take_scalar(&mut self, kind: ScalarKind) -> Result<Scalar>;

    /// Attach the type-identity string as this node's type attribute.
    fn put_type_name(&mut self, name: &str) -> Result<()>;

    /// Read the type attribute. A missing or malformed attribute in a tree
    /// backing yields an empty string after logging a warning; the byte
    /// stream fails with `Decode` on a truncated record.
    fn take_type_name(&mut self) -> Result<String>;

    /// Attach a named small-integer attribute (the variant tag).
    fn put_tag(&mut self, key: &str, tag: u8) -> Result<()>;

    /// Read a named small-integer attribute. A missing or non-numeric tag
    /// yields `InvalidVariant`.
    fn take_tag(&mut self, key: &str) -> Result<u8>;

    /// Declare that this node will hold `count` ordered children. The byte
    /// stream writes the count, the tagged tree records a `Size` attribute,
    /// the JSON tree needs no explicit declaration.
    fn begin_items(&mut self, count: usize) -> Result<()>;

    /// Read the declared child count.
    fn item_count(&mut self) -> Result<usize>;

    /// The child addressed by a textual name, created if absent.
    fn named(&mut self, key: &str) -> Result<&mut Self>;

    /// The child at an ordered position, created if absent.
    fn at(&mut self, index: usize) -> Result<&mut Self>;

    /// The polymorphic registry serving this backing.
    fn registry() -> &'static PolyRegistry<Self>;
}
