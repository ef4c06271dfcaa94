//! Implements the Map phase.
//!

use std::collections::BTreeMap;

use log::debug;

use crate::error::Result;
use crate::mapreducer::{std_shard, Mapper};
use crate::parameters::MRParameters;
use crate::record_types::{MEmitter, Record};

/// Sorted output of one map partition for one reduce shard.
pub type SortedRun<K, V> = BTreeMap<K, Vec<V>>;

/// What one map partition produced: one sorted run per reduce shard, indexed by shard.
pub struct MapOutput<K, V> {
    pub runs: Vec<SortedRun<K, V>>,
    pub records: usize,
    pub emissions: usize,
}

/// This is the base of the mapping phase. It contains an input
/// and the sharded, sorted output.
/// Mapper threads run on this. Every mapper thread has one MapPartition
/// instance per input chunk.
pub struct MapPartition<M: Mapper, MapInput: Iterator<Item = Record>> {
    mapper: M,
    params: MRParameters,
    input: MapInput,
    sorted_output: Vec<SortedRun<M::Key, M::Value>>,
    records: usize,
    emissions: usize,
}

impl<M: Mapper, MapInput: Iterator<Item = Record>> MapPartition<M, MapInput> {
    pub fn new(params: MRParameters, input: MapInput, mapper: M) -> MapPartition<M, MapInput> {
        let sorted_output = (0..params.reducers).map(|_| BTreeMap::new()).collect();
        MapPartition {
            mapper: mapper,
            params: params,
            input: input,
            sorted_output: sorted_output,
            records: 0,
            emissions: 0,
        }
    }

    pub fn run(mut self) -> Result<MapOutput<M::Key, M::Value>> {
        self.do_map()?;
        debug!("map partition {}: {} records, {} emissions",
               self.params.shard_id,
               self.records,
               self.emissions);
        Ok(MapOutput {
            runs: self.sorted_output,
            records: self.records,
            emissions: self.emissions,
        })
    }

    /// Executes the mapping phase.
    fn do_map(&mut self) -> Result<()> {
        while let Some(record) = self.input.next() {
            let mut e = MEmitter::new();
            self.mapper.map(&mut e, record)?;
            self.records += 1;
            self.insert_result(e);
        }
        Ok(())
    }

    fn insert_result(&mut self, emitter: MEmitter<M::Key, M::Value>) {
        for (k, v) in emitter._get() {
            let shard = std_shard(self.params.reducers, &k);
            self.sorted_output[shard].entry(k).or_default().push(v);
            self.emissions += 1;
        }
    }
}
