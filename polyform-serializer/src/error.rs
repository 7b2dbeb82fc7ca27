use thiserror::Error;

/// Error types for archive serialization and deserialization.
///
/// Any failure aborts the current save or load call; the archive is left
/// partially modified and must be discarded by the caller.
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// Declared child count disagrees with a static arity or parity rule
    #[error("Size mismatch: expected {expected} children, archive holds {found}")]
    SizeMismatch { expected: usize, found: usize },

    /// A sum value whose tag attribute is absent or unreadable
    #[error("Invalid variant: {0}")]
    InvalidVariant(String),

    /// A sum tag read from the archive is out of range for the target arity
    #[error("Variant tag {tag} out of range (arity {arity})")]
    InvalidIndex { tag: u8, arity: usize },

    /// Attempt to serialize a null unique handle
    #[error("Null pointer: {0}")]
    NullPointer(String),

    /// A required attribute is missing on load
    #[error("Missing field: {0}")]
    MissingField(String),

    /// A type name with no registry entry and no value fallback
    #[error("Type not registered: {0}")]
    RegistryNotFound(String),

    /// A second registration of an already-registered type name
    #[error("Type already registered: {0}")]
    DuplicateRegistration(String),

    /// Traversal exceeded the depth cap
    #[error("Recursion depth exceeds maximum of {0}")]
    RecursionLimit(u32),

    /// Backing-level parse or conversion failure
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for all archive operations
pub type Result<T> = std::result::Result<T, ArchiveError>;
