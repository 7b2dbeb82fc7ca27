//! Save/Load for containers: sequences, sets, maps and fixed-size arrays.
//!
//! Sequences and sets archive as `n` positional children; map-likes archive
//! as `2n` children alternating key, value in the container's iteration
//! order. Unordered containers serialize in whatever order they iterate;
//! loading reconstructs by insertion, so equality is multiset equality.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::hash::{BuildHasher, Hash};

use crate::archive::ArchiveNode;
use crate::error::{ArchiveError, Result};
use crate::traits::{Depth, Load, Save};

// A malformed count record must not reserve unbounded memory before the
// first element read fails.
const PREALLOC_CAP: usize = 4096;

fn save_sequence<'a, A, T, I>(items: I, len: usize, node: &mut A, depth: Depth) -> Result<()>
where
    A: ArchiveNode,
    T: Save + 'a,
    I: Iterator<Item = &'a T>,
{
    let depth = depth.descend()?;
    node.begin_items(len)?;
    for (index, item) in items.enumerate() {
        item.save(node.at(index)?, depth)?;
    }
    Ok(())
}

impl<T: Save> Save for Vec<T> {
    fn save<A: ArchiveNode>(&self, node: &mut A, depth: Depth) -> Result<()> {
        save_sequence(self.iter(), self.len(), node, depth)
    }
}

impl<T: Load> Load for Vec<T> {
    fn load<A: ArchiveNode>(node: &mut A, depth: Depth) -> Result<Self> {
        let depth = depth.descend()?;
        let count = node.item_count()?;
        let mut items = Vec::with_capacity(count.min(PREALLOC_CAP));
        for index in 0..count {
            items.push(T::load(node.at(index)?, depth)?);
        }
        Ok(items)
    }
}

impl<T: Save> Save for VecDeque<T> {
    fn save<A: ArchiveNode>(&self, node: &mut A, depth: Depth) -> Result<()> {
        save_sequence(self.iter(), self.len(), node, depth)
    }
}

impl<T: Load> Load for VecDeque<T> {
    fn load<A: ArchiveNode>(node: &mut A, depth: Depth) -> Result<Self> {
        let depth = depth.descend()?;
        let count = node.item_count()?;
        let mut items = VecDeque::with_capacity(count.min(PREALLOC_CAP));
        for index in 0..count {
            items.push_back(T::load(node.at(index)?, depth)?);
        }
        Ok(items)
    }
}

impl<T: Save, S> Save for HashSet<T, S> {
    fn save<A: ArchiveNode>(&self, node: &mut A, depth: Depth) -> Result<()> {
        save_sequence(self.iter(), self.len(), node, depth)
    }
}

impl<T, S> Load for HashSet<T, S>
where
    T: Load + Eq + Hash,
    S: BuildHasher + Default,
{
    fn load<A: ArchiveNode>(node: &mut A, depth: Depth) -> Result<Self> {
        let depth = depth.descend()?;
        let count = node.item_count()?;
        let mut items = HashSet::with_capacity_and_hasher(count.min(PREALLOC_CAP), S::default());
        for index in 0..count {
            items.insert(T::load(node.at(index)?, depth)?);
        }
        Ok(items)
    }
}

impl<T: Save> Save for BTreeSet<T> {
    fn save<A: ArchiveNode>(&self, node: &mut A, depth: Depth) -> Result<()> {
        save_sequence(self.iter(), self.len(), node, depth)
    }
}

impl<T: Load + Ord> Load for BTreeSet<T> {
    fn load<A: ArchiveNode>(node: &mut A, depth: Depth) -> Result<Self> {
        let depth = depth.descend()?;
        let count = node.item_count()?;
        let mut items = BTreeSet::new();
        for index in 0..count {
            items.insert(T::load(node.at(index)?, depth)?);
        }
        Ok(items)
    }
}

fn save_map_entries<'a, A, K, V, I>(entries: I, len: usize, node: &mut A, depth: Depth) -> Result<()>
where
    A: ArchiveNode,
    K: Save + 'a,
    V: Save + 'a,
    I: Iterator<Item = (&'a K, &'a V)>,
{
    let depth = depth.descend()?;
    node.begin_items(2 * len)?;
    let mut slot = 0;
    for (key, value) in entries {
        key.save(node.at(slot)?, depth)?;
        value.save(node.at(slot + 1)?, depth)?;
        slot += 2;
    }
    Ok(())
}

fn load_map_pair_count<A: ArchiveNode>(node: &mut A) -> Result<usize> {
    let count = node.item_count()?;
    if count % 2 != 0 {
        // an odd count means a key without its value
        return Err(ArchiveError::SizeMismatch {
            expected: count + 1,
            found: count,
        });
    }
    Ok(count / 2)
}

impl<K: Save, V: Save, S> Save for HashMap<K, V, S> {
    fn save<A: ArchiveNode>(&self, node: &mut A, depth: Depth) -> Result<()> {
        save_map_entries(self.iter(), self.len(), node, depth)
    }
}

impl<K, V, S> Load for HashMap<K, V, S>
where
    K: Load + Eq + Hash,
    V: Load,
    S: BuildHasher + Default,
{
    fn load<A: ArchiveNode>(node: &mut A, depth: Depth) -> Result<Self> {
        let depth = depth.descend()?;
        let pairs = load_map_pair_count(node)?;
        let mut map = HashMap::with_capacity_and_hasher(pairs.min(PREALLOC_CAP), S::default());
        for index in 0..pairs {
            let key = K::load(node.at(2 * index)?, depth)?;
            let value = V::load(node.at(2 * index + 1)?, depth)?;
            map.insert(key, value);
        }
        Ok(map)
    }
}

impl<K: Save, V: Save> Save for BTreeMap<K, V> {
    fn save<A: ArchiveNode>(&self, node: &mut A, depth: Depth) -> Result<()> {
        save_map_entries(self.iter(), self.len(), node, depth)
    }
}

impl<K: Load + Ord, V: Load> Load for BTreeMap<K, V> {
    fn load<A: ArchiveNode>(node: &mut A, depth: Depth) -> Result<Self> {
        let depth = depth.descend()?;
        let pairs = load_map_pair_count(node)?;
        let mut map = BTreeMap::new();
        for index in 0..pairs {
            let key = K::load(node.at(2 * index)?, depth)?;
            let value = V::load(node.at(2 * index + 1)?, depth)?;
            map.insert(key, value);
        }
        Ok(map)
    }
}

impl<T: Save, const N: usize> Save for [T; N] {
    fn save<A: ArchiveNode>(&self, node: &mut A, depth: Depth) -> Result<()> {
        let depth = depth.descend()?;
        node.begin_items(N)?;
        for (index, item) in self.iter().enumerate() {
            item.save(node.at(index)?, depth)?;
        }
        Ok(())
    }
}

impl<T: Load, const N: usize> Load for [T; N] {
    fn load<A: ArchiveNode>(node: &mut A, depth: Depth) -> Result<Self> {
        let depth = depth.descend()?;
        let count = node.item_count()?;
        if count != N {
            return Err(ArchiveError::SizeMismatch {
                expected: N,
                found: count,
            });
        }
        let mut items = Vec::with_capacity(N);
        for index in 0..N {
            items.push(T::load(node.at(index)?, depth)?);
        }
        items
            .try_into()
            .map_err(|_| ArchiveError::Decode("array reconstruction failed".to_string()))
    }
}
