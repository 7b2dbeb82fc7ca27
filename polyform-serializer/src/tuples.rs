//! Save/Load for tuple-likes and optionals.

use crate::archive::ArchiveNode;
use crate::error::{ArchiveError, Result};
use crate::traits::{Depth, Load, Save};

macro_rules! impl_tuple {
    ($arity:expr => $($idx:tt : $name:ident),+) => {
        impl<$($name: Save),+> Save for ($($name,)+) {
            fn save<A: ArchiveNode>(&self, node: &mut A, depth: Depth) -> Result<()> {
                let depth = depth.descend()?;
                node.begin_items($arity)?;
                $( self.$idx.save(node.at($idx)?, depth)?; )+
                Ok(())
            }
        }

        impl<$($name: Load),+> Load for ($($name,)+) {
            fn load<A: ArchiveNode>(node: &mut A, depth: Depth) -> Result<Self> {
                let depth = depth.descend()?;
                let count = node.item_count()?;
                if count != $arity {
                    return Err(ArchiveError::SizeMismatch {
                        expected: $arity,
                        found: count,
                    });
                }
                Ok(( $( $name::load(node.at($idx)?, depth)?, )+ ))
            }
        }
    };
}

impl_tuple!(2 => 0: T0, 1: T1);
impl_tuple!(3 => 0: T0, 1: T1, 2: T2);
impl_tuple!(4 => 0: T0, 1: T1, 2: T2, 3: T3);
impl_tuple!(5 => 0: T0, 1: T1, 2: T2, 3: T3, 4: T4);
impl_tuple!(6 => 0: T0, 1: T1, 2: T2, 3: T3, 4: T4, 5: T5);

// An optional archives as up to two positional children: the presence flag,
// then the value when present.
impl<T: Save> Save for Option<T> {
    fn save<A: ArchiveNode>(&self, node: &mut A, depth: Depth) -> Result<()> {
        let depth = depth.descend()?;
        node.begin_items(2)?;
        self.is_some().save(node.at(0)?, depth)?;
        if let Some(value) = self {
            value.save(node.at(1)?, depth)?;
        }
        Ok(())
    }
}

impl<T: Load> Load for Option<T> {
    fn load<A: ArchiveNode>(node: &mut A, depth: Depth) -> Result<Self> {
        let depth = depth.descend()?;
        let count = node.item_count()?;
        if count < 1 {
            // not even the presence flag is there
            return Err(ArchiveError::SizeMismatch {
                expected: 1,
                found: count,
            });
        }
        let has_value = bool::load(node.at(0)?, depth)?;
        if !has_value {
            return Ok(None);
        }
        if count < 2 {
            // the flag claims a value that was never archived
            return Err(ArchiveError::SizeMismatch {
                expected: 2,
                found: count,
            });
        }
        Ok(Some(T::load(node.at(1)?, depth)?))
    }
}
