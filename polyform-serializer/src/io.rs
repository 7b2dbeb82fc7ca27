//! Thin file helpers binding a filesystem path to each archive format.

use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::binary::ByteStream;
use crate::error::{ArchiveError, Result};
use crate::xml::{self, XmlElement};

/// Pretty-print a JSON archive to a file (2-space indentation).
pub fn write_json(path: impl AsRef<Path>, root: &Value) -> Result<()> {
    let text = serde_json::to_string_pretty(root)
        .map_err(|e| ArchiveError::Decode(format!("JSON print failed: {e}")))?;
    fs::write(path, text)?;
    Ok(())
}

/// Parse a JSON archive from a file.
pub fn read_json(path: impl AsRef<Path>) -> Result<Value> {
    let text = fs::read_to_string(path)?;
    serde_json::from_str(&text).map_err(|e| ArchiveError::Decode(format!("malformed JSON: {e}")))
}

/// Print a tagged-tree archive to a file, indented.
pub fn write_xml(path: impl AsRef<Path>, root: &XmlElement) -> Result<()> {
    fs::write(path, xml::to_string(root)?)?;
    Ok(())
}

/// Parse a tagged-tree archive from a file.
pub fn read_xml(path: impl AsRef<Path>) -> Result<XmlElement> {
    xml::parse(&fs::read_to_string(path)?)
}

/// Write a byte-stream archive to a file verbatim.
pub fn write_binary(path: impl AsRef<Path>, stream: &ByteStream) -> Result<()> {
    fs::write(path, stream.as_bytes())?;
    Ok(())
}

/// Read a byte-stream archive from a file; the cursor starts at offset 0.
pub fn read_binary(path: impl AsRef<Path>) -> Result<ByteStream> {
    Ok(ByteStream::from_bytes(fs::read(path)?))
}
