//! Self-describing byte-stream backing: strictly positional, little-endian
//! fixed-width scalars, u32-length-prefixed strings.

use crate::archive::{ArchiveNode, Scalar, ScalarKind};
use crate::error::{ArchiveError, Result};
use crate::registry::{PolyRegistry, BINARY_REGISTRY};

/// A flat byte buffer with an independent read cursor. Writes append at the
/// end; reads consume from the cursor, so one stream instance supports a
/// save immediately followed by a load. Not safe for concurrent use.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ByteStream {
    buf: Vec<u8>,
    pos: usize,
}

impl ByteStream {
    pub fn new() -> Self {
        ByteStream::default()
    }

    /// Wrap raw bytes for reading; the cursor starts at the beginning.
    pub fn from_bytes(buf: Vec<u8>) -> Self {
        ByteStream { buf, pos: 0 }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Move the read cursor back to the start of the stream.
    pub fn rewind(&mut self) {
        self.pos = 0;
    }

    fn read_exact(&mut self, count: usize) -> Result<&[u8]> {
        if self.pos + count > self.buf.len() {
            return Err(ArchiveError::Decode(format!(
                "stream exhausted: need {count} bytes at offset {}, have {}",
                self.pos,
                self.buf.len() - self.pos
            )));
        }
        let slice = &self.buf[self.pos..self.pos + count];
        self.pos += count;
        Ok(slice)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let slice = self.read_exact(N)?;
        let mut bytes = [0u8; N];
        bytes.copy_from_slice(slice);
        Ok(bytes)
    }

    fn write_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    fn write_str(&mut self, text: &str) {
        self.write_u32(text.len() as u32);
        self.buf.extend_from_slice(text.as_bytes());
    }

    fn read_str(&mut self) -> Result<String> {
        let len = self.read_u32()? as usize;
        let bytes = self.read_exact(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| ArchiveError::Decode(format!("string record is not UTF-8: {e}")))
    }
}

impl ArchiveNode for ByteStream {
    fn put_scalar(&mut self, value: Scalar) -> Result<()> {
        match value {
            Scalar::Bool(v) => self.buf.push(u8::from(v)),
            Scalar::Char(v) => self.write_u32(v as u32),
            Scalar::I8(v) => self.buf.extend_from_slice(&v.to_le_bytes()),
            Scalar::I16(v) => self.buf.extend_from_slice(&v.to_le_bytes()),
            Scalar::I32(v) => self.buf.extend_from_slice(&v.to_le_bytes()),
            Scalar::I64(v) => self.buf.extend_from_slice(&v.to_le_bytes()),
            Scalar::U8(v) => self.buf.push(v),
            Scalar::U16(v) => self.buf.extend_from_slice(&v.to_le_bytes()),
            Scalar::U32(v) => self.write_u32(v),
            Scalar::U64(v) => self.buf.extend_from_slice(&v.to_le_bytes()),
            Scalar::F32(v) => self.buf.extend_from_slice(&v.to_le_bytes()),
            Scalar::F64(v) => self.buf.extend_from_slice(&v.to_le_bytes()),
            Scalar::Str(v) => self.write_str(&v),
            // one marker byte so the record occupies a slot
            Scalar::Unit => self.buf.push(0),
            Scalar::Enum { ordinal, .. } => self.write_u32(ordinal),
            Scalar::Timestamp { seconds, .. } => {
                self.buf.extend_from_slice(&seconds.to_le_bytes())
            }
        }
        Ok(())
    }

    fn take_scalar(&mut self, kind: ScalarKind) -> Result<Scalar> {
        let scalar = match kind {
            ScalarKind::Bool => Scalar::Bool(self.read_array::<1>()?[0] != 0),
            ScalarKind::Char => {
                let raw = self.read_u32()?;
                Scalar::Char(char::from_u32(raw).ok_or_else(|| {
                    ArchiveError::Decode(format!("{raw:#x} is not a character"))
                })?)
            }
            ScalarKind::I8 => Scalar::I8(i8::from_le_bytes(self.read_array()?)),
            ScalarKind::I16 => Scalar::I16(i16::from_le_bytes(self.read_array()?)),
            ScalarKind::I32 => Scalar::I32(i32::from_le_bytes(self.read_array()?)),
            ScalarKind::I64 => Scalar::I64(i64::from_le_bytes(self.read_array()?)),
            ScalarKind::U8 => Scalar::U8(self.read_array::<1>()?[0]),
            ScalarKind::U16 => Scalar::U16(u16::from_le_bytes(self.read_array()?)),
            ScalarKind::U32 => Scalar::U32(self.read_u32()?),
            ScalarKind::U64 => Scalar::U64(u64::from_le_bytes(self.read_array()?)),
            ScalarKind::F32 => Scalar::F32(f32::from_le_bytes(self.read_array()?)),
            ScalarKind::F64 => Scalar::F64(f64::from_le_bytes(self.read_array()?)),
            ScalarKind::Str => Scalar::Str(self.read_str()?),
            ScalarKind::Unit => {
                self.read_exact(1)?;
                Scalar::Unit
            }
            ScalarKind::Enum => Scalar::U64(u64::from(self.read_u32()?)),
            ScalarKind::Timestamp => Scalar::F64(f64::from_le_bytes(self.read_array()?)),
        };
        Ok(scalar)
    }

    fn put_type_name(&mut self, name: &str) -> Result<()> {
        self.write_str(name);
        Ok(())
    }

    fn take_type_name(&mut self) -> Result<String> {
        self.read_str()
    }

    fn put_tag(&mut self, _key: &str, tag: u8) -> Result<()> {
        self.buf.push(tag);
        Ok(())
    }

    fn take_tag(&mut self, _key: &str) -> Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    fn begin_items(&mut self, count: usize) -> Result<()> {
        let count = u32::try_from(count).map_err(|_| ArchiveError::SizeMismatch {
            expected: u32::MAX as usize,
            found: count,
        })?;
        self.write_u32(count);
        Ok(())
    }

    fn item_count(&mut self) -> Result<usize> {
        Ok(self.read_u32()? as usize)
    }

    // Child addressing collapses onto the cursor: positional semantics are
    // implicit in a flat stream.
    fn named(&mut self, _key: &str) -> Result<&mut Self> {
        Ok(self)
    }

    fn at(&mut self, _index: usize) -> Result<&mut Self> {
        Ok(self)
    }

    fn registry() -> &'static PolyRegistry<Self> {
        &BINARY_REGISTRY
    }
}
