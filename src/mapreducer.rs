//! The Mapper and Reducer traits and associated types.

use crate::error::Result;
use crate::record_types::{MEmitter, MultiRecord, REmitter, Record};

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Default sharding function. The hasher uses fixed keys, so a key always lands in the same
/// shard for a given `n`.
pub fn std_shard<K: Hash + ?Sized>(n: usize, key: &K) -> usize {
    let mut h = DefaultHasher::new();
    key.hash(&mut h);
    (h.finish() % n as u64) as usize
}

pub trait Mapper: Send + Clone {
    type Key: Ord + Hash + Clone + Send;
    type Value: Send;

    /// Takes one input record and an emitter.
    /// The emitter is used to yield results from the map phase.
    ///
    /// Note that this method takes a &mut self; you can use this to cache expensive objects
    /// between runs (but not between partitions!)
    fn map(&mut self, em: &mut MEmitter<Self::Key, Self::Value>, record: Record) -> Result<()>;
}

/// State owned by one reduce shard and carried from group to group. All shards' states are merged
/// once every group of a stage has been reduced, and handed to `Reducer::finish`.
pub trait Accumulator: Default + Send {
    fn merge(&mut self, other: Self);
}

impl Accumulator for () {
    fn merge(&mut self, _: ()) {}
}

impl Accumulator for u64 {
    fn merge(&mut self, other: u64) {
        *self += other;
    }
}

pub trait Reducer: Send + Clone {
    type Key;
    type Value;
    type Acc: Accumulator;

    /// Takes one key and all of its values and emits zero or more output lines.
    /// Groups are disjoint; reduce() must not depend on the order in which groups or the values
    /// within a group arrive.
    fn reduce(&mut self,
              acc: &mut Self::Acc,
              em: &mut REmitter,
              records: MultiRecord<Self::Key, Self::Value>)
              -> Result<()>;

    /// Called once per stage, after all groups, with the merged accumulators. Its output is
    /// appended after all group outputs.
    fn finish(&mut self, _acc: Self::Acc, _em: &mut REmitter) -> Result<()> {
        Ok(())
    }
}
