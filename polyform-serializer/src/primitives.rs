//! Save/Load for the primitive category: numbers, booleans, characters,
//! strings, the empty-sum placeholder and single-string domain types.

use chrono::{DateTime, SecondsFormat};

use crate::archive::{ArchiveNode, Scalar, ScalarKind};
use crate::error::{ArchiveError, Result};
use crate::traits::{Depth, Load, Save};

macro_rules! impl_scalar_primitive {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl Save for $ty {
                fn save<A: ArchiveNode>(&self, node: &mut A, _depth: Depth) -> Result<()> {
                    node.put_scalar(Scalar::$variant(*self))
                }
            }

            impl Load for $ty {
                fn load<A: ArchiveNode>(node: &mut A, _depth: Depth) -> Result<Self> {
                    match node.take_scalar(ScalarKind::$variant)? {
                        Scalar::$variant(value) => Ok(value),
                        other => Err(ArchiveError::Decode(format!(
                            "expected {}, backing produced {other:?}",
                            stringify!($ty)
                        ))),
                    }
                }
            }
        )*
    };
}

impl_scalar_primitive!(
    bool => Bool,
    char => Char,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
);

impl Save for String {
    fn save<A: ArchiveNode>(&self, node: &mut A, _depth: Depth) -> Result<()> {
        node.put_scalar(Scalar::Str(self.clone()))
    }
}

impl Load for String {
    fn load<A: ArchiveNode>(node: &mut A, _depth: Depth) -> Result<Self> {
        match node.take_scalar(ScalarKind::Str)? {
            Scalar::Str(value) => Ok(value),
            other => Err(ArchiveError::Decode(format!(
                "expected string, backing produced {other:?}"
            ))),
        }
    }
}

// Borrowed strings save like owned ones; loading them has no defined
// ownership, so `str` deliberately has no Load impl.
impl Save for str {
    fn save<A: ArchiveNode>(&self, node: &mut A, _depth: Depth) -> Result<()> {
        node.put_scalar(Scalar::Str(self.to_owned()))
    }
}

impl Save for () {
    fn save<A: ArchiveNode>(&self, node: &mut A, _depth: Depth) -> Result<()> {
        node.put_scalar(Scalar::Unit)
    }
}

impl Load for () {
    fn load<A: ArchiveNode>(node: &mut A, _depth: Depth) -> Result<Self> {
        node.take_scalar(ScalarKind::Unit)?;
        Ok(())
    }
}

/// A domain type whose whole archived form is one canonical string (keys,
/// tenors and the like). Pair with [`impl_string_scalar!`] to give such a
/// type Save/Load in every backing.
pub trait CanonicalString: Sized {
    fn to_canonical(&self) -> String;
    fn from_canonical(text: &str) -> Result<Self>;
}

/// Implements `Save`/`Load` for a [`CanonicalString`] type: every backing
/// stores the canonical string form.
#[macro_export]
macro_rules! impl_string_scalar {
    ($ty:ty) => {
        impl $crate::Save for $ty {
            fn save<A: $crate::ArchiveNode>(
                &self,
                node: &mut A,
                _depth: $crate::Depth,
            ) -> $crate::Result<()> {
                node.put_scalar($crate::Scalar::Str($crate::CanonicalString::to_canonical(
                    self,
                )))
            }
        }

        impl $crate::Load for $ty {
            fn load<A: $crate::ArchiveNode>(
                node: &mut A,
                _depth: $crate::Depth,
            ) -> $crate::Result<Self> {
                match node.take_scalar($crate::ScalarKind::Str)? {
                    $crate::Scalar::Str(text) => {
                        <$ty as $crate::CanonicalString>::from_canonical(&text)
                    }
                    other => Err($crate::ArchiveError::Decode(format!(
                        "expected canonical string, backing produced {other:?}"
                    ))),
                }
            }
        }
    };
}

/// A date-like instant carried as seconds since the epoch.
///
/// The key-value tree and the byte stream store the numeric seconds; the
/// tagged tree, being textual, stores the RFC 3339 canonical string. Both
/// directions of each backing use the same form.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Timestamp(pub f64);

impl Timestamp {
    pub fn seconds(self) -> f64 {
        self.0
    }
}

impl From<f64> for Timestamp {
    fn from(seconds: f64) -> Self {
        Timestamp(seconds)
    }
}

impl CanonicalString for Timestamp {
    fn to_canonical(&self) -> String {
        let seconds = self.0;
        if !seconds.is_finite() {
            return seconds.to_string();
        }
        let whole = seconds.floor();
        let mut secs = whole as i64;
        let mut nanos = ((seconds - whole) * 1e9).round() as i64;
        if nanos >= 1_000_000_000 {
            secs += 1;
            nanos = 0;
        }
        match DateTime::from_timestamp(secs, nanos as u32) {
            Some(instant) => instant.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            // outside the representable date range, keep the raw number
            None => seconds.to_string(),
        }
    }

    fn from_canonical(text: &str) -> Result<Self> {
        if let Ok(seconds) = text.parse::<f64>() {
            return Ok(Timestamp(seconds));
        }
        let instant = DateTime::parse_from_rfc3339(text).map_err(|e| {
            ArchiveError::Decode(format!("cannot parse {text:?} as a timestamp: {e}"))
        })?;
        let seconds =
            instant.timestamp() as f64 + f64::from(instant.timestamp_subsec_nanos()) / 1e9;
        Ok(Timestamp(seconds))
    }
}

impl Save for Timestamp {
    fn save<A: ArchiveNode>(&self, node: &mut A, _depth: Depth) -> Result<()> {
        node.put_scalar(Scalar::Timestamp {
            seconds: self.0,
            text: self.to_canonical(),
        })
    }
}

impl Load for Timestamp {
    fn load<A: ArchiveNode>(node: &mut A, _depth: Depth) -> Result<Self> {
        match node.take_scalar(ScalarKind::Timestamp)? {
            Scalar::F64(seconds) => Ok(Timestamp(seconds)),
            Scalar::Str(text) => Timestamp::from_canonical(&text),
            other => Err(ArchiveError::Decode(format!(
                "expected timestamp, backing produced {other:?}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_canonical_form_is_rfc3339() {
        let instant = Timestamp(1_734_258_600.0);
        assert_eq!(instant.to_canonical(), "2024-12-15T10:30:00Z");
        assert_eq!(
            Timestamp::from_canonical("2024-12-15T10:30:00Z").unwrap(),
            instant
        );
    }

    #[test]
    fn timestamp_canonical_form_keeps_subsecond_precision() {
        let instant = Timestamp(0.5);
        let text = instant.to_canonical();
        assert_eq!(Timestamp::from_canonical(&text).unwrap(), instant);
    }

    #[test]
    fn timestamp_also_parses_a_plain_number() {
        assert_eq!(
            Timestamp::from_canonical("1.25").unwrap(),
            Timestamp(1.25)
        );
        assert!(Timestamp::from_canonical("yesterday").is_err());
    }
}
