//! Implements the Reduce phase.
//!

use std::fmt::Display;
use std::hash::Hash;
use std::iter::Peekable;
use std::marker::PhantomData;

use log::debug;

use crate::error::Result;
use crate::map::SortedRun;
use crate::mapreducer::Reducer;
use crate::parameters::MRParameters;
use crate::record_types::{MultiRecord, REmitter};
use crate::shard_merge::ShardMergeIterator;

/// Output of one reduce shard: the lines emitted for every group, keyed and in key order, and
/// the shard's accumulator.
pub struct ReduceOutput<K, A> {
    pub groups: Vec<MultiRecord<K, String>>,
    pub acc: A,
}

pub struct ReducePartition<R: Reducer> {
    reducer: R,
    params: MRParameters,
    // One sorted run per map partition, in partition order.
    srcruns: Vec<SortedRun<R::Key, R::Value>>,
}

impl<R: Reducer> ReducePartition<R>
    where R::Key: Ord + Clone
{
    /// Create a new Reduce partition.
    /// reducer is the reduce function.
    /// params is generic MR parameters as well as some applying directly to this reduce partition.
    /// srcruns are the sorted outputs of all map partitions destined for this shard.
    pub fn new(reducer: R,
               params: MRParameters,
               srcruns: Vec<SortedRun<R::Key, R::Value>>)
               -> ReducePartition<R> {
        ReducePartition {
            reducer: reducer,
            params: params,
            srcruns: srcruns,
        }
    }

    /// Run the Reduce partition.
    pub fn run(mut self) -> Result<ReduceOutput<R::Key, R::Acc>> {
        let mut acc = R::Acc::default();
        let mut groups = Vec::new();

        let runs = std::mem::take(&mut self.srcruns);
        let sorted_input = ShardMergeIterator::build(runs.into_iter()
            .map(|run| run.into_iter().map(|(k, vs)| MultiRecord::new(k, vs))));

        for group in RecordsToMultiRecords::new(sorted_input, self.params.reduce_group_prealloc_size) {
            let key = group.key().clone();
            let mut e = REmitter::new();
            self.reducer.reduce(&mut acc, &mut e, group)?;
            groups.push(MultiRecord::new(key, e._get()));
        }

        debug!("reduce shard {}: {} groups", self.params.shard_id, groups.len());
        Ok(ReduceOutput {
            groups: groups,
            acc: acc,
        })
    }
}

/// Iterator adapter: Coalesces subsequent MultiRecords with identical key into one.
/// The wrapped iterator must yield records in sorted order (or at least in an order where
/// identical keys are adjacent).
pub struct RecordsToMultiRecords<K, V, It: Iterator<Item = MultiRecord<K, V>>> {
    it: Peekable<It>,
    /// Efficiency knob: How big groups of records are expected to be. Default is 1.
    expected_group_size: usize,
}

impl<K, V, It: Iterator<Item = MultiRecord<K, V>>> RecordsToMultiRecords<K, V, It> {
    pub fn new(it: It, egs: usize) -> RecordsToMultiRecords<K, V, It> {
        RecordsToMultiRecords {
            it: it.peekable(),
            expected_group_size: egs,
        }
    }
}

impl<K: PartialEq, V, It: Iterator<Item = MultiRecord<K, V>>> Iterator for RecordsToMultiRecords<K, V, It> {
    type Item = MultiRecord<K, V>;
    fn next(&mut self) -> Option<Self::Item> {
        let (key, first) = self.it.next()?.into_parts();
        let mut collection = Vec::with_capacity(self.expected_group_size.max(first.len()));
        collection.extend(first);
        let mut group = MultiRecord::new(key, collection);

        while let Some(next) = self.it.next_if(|r| r.key() == group.key()) {
            group.absorb(next);
        }
        Some(group)
    }
}

/// Sums up integer values per key and emits `key<TAB>sum`. Only depends on the multiset of
/// values, so partial sums can be merged in any order.
pub struct SumReducer<K> {
    _key: PhantomData<fn() -> K>,
}

impl<K> SumReducer<K> {
    pub fn new() -> SumReducer<K> {
        SumReducer { _key: PhantomData }
    }
}

impl<K> Default for SumReducer<K> {
    fn default() -> SumReducer<K> {
        SumReducer::new()
    }
}

impl<K> Clone for SumReducer<K> {
    fn clone(&self) -> SumReducer<K> {
        SumReducer::new()
    }
}

impl<K: Display + Ord + Hash + Clone + Send> Reducer for SumReducer<K> {
    type Key = K;
    type Value = u64;
    type Acc = ();

    fn reduce(&mut self, _: &mut (), em: &mut REmitter, records: MultiRecord<K, u64>) -> Result<()> {
        let (key, values) = records.into_parts();
        let sum: u64 = values.into_iter().sum();
        em.emit_kv(&key, sum);
        Ok(())
    }
}
