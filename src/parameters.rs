//! Parameters for a mapreduce process.
//!

use std::env;
use std::path::PathBuf;

use crate::error::{MRError, Result};

#[derive(Clone, Debug)]
pub struct MRParameters {
    pub mappers: usize,
    pub reducers: usize,

    pub map_partition_size: usize,

    pub reduce_group_prealloc_size: usize,

    pub intermediate_location: PathBuf,
    pub intermediate_prefix: String,
    pub keep_temp_files: bool,

    // Internal parameters
    pub shard_id: usize,
}

impl Default for MRParameters {
    fn default() -> MRParameters {
        MRParameters::new()
    }
}

impl MRParameters {
    pub fn new() -> MRParameters {
        MRParameters {
            mappers: 4,
            reducers: 4,
            map_partition_size: 100 * 1024 * 1024,
            reduce_group_prealloc_size: 1,
            intermediate_location: env::temp_dir(),
            intermediate_prefix: String::from("intermediate_"),
            keep_temp_files: false,
            shard_id: 0,
        }
    }

    /// Determines how many parallel processes will be run. Mappers and reducers do not run
    /// at the same time (the reducers need to wait for the complete map output). The number of
    /// reducers also determines the sharding of the map output data.
    ///
    /// Default 4/4
    pub fn set_concurrency(mut self, mappers: usize, reducers: usize) -> MRParameters {
        self.mappers = mappers;
        self.reducers = reducers;
        self
    }

    /// This parameter determines the size of the chunks that the input is partitioned in
    /// before being processed by map shards. Entire chunks are held in memory at once, and at most
    /// `mappers` chunks are in flight; so your available RAM is the limit.
    /// The size is counted as the bytes of record keys and values.
    ///
    /// Default 100 MiB
    pub fn set_partition_size(mut self, size: usize) -> MRParameters {
        self.map_partition_size = size;
        self
    }

    /// How big are the groups of keys in the reduce phase expected to be? (used for
    /// pre-allocating buffers)
    ///
    /// Default 1.
    pub fn set_reduce_group_prealloc(mut self, prealloc_size: usize) -> MRParameters {
        self.reduce_group_prealloc_size = prealloc_size;
        self
    }

    /// Where a pipeline puts the outputs of all stages but the last one. Every run creates its
    /// own directory `<location>/<prefix><random>`; the store of stage `i` in it is named
    /// `<prefix><i>`.
    ///
    /// Default: the system temp directory and "intermediate_".
    pub fn set_intermediate(mut self, location: PathBuf, prefix: String) -> MRParameters {
        self.intermediate_location = location;
        self.intermediate_prefix = prefix;
        self
    }

    /// Keep intermediate stores once the pipeline is done (for debugging).
    /// Default: false
    pub fn set_keep_temp_files(mut self, keep: bool) -> MRParameters {
        self.keep_temp_files = keep;
        self
    }

    /// For internal use: Sets the ID of the executing partition or shard (for logging etc.)
    ///
    pub fn set_shard_id(mut self, n: usize) -> MRParameters {
        self.shard_id = n;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.mappers == 0 || self.reducers == 0 {
            return Err(MRError::Config(format!("need at least one mapper and one reducer, got {}/{}",
                                               self.mappers,
                                               self.reducers)));
        }
        if self.map_partition_size == 0 {
            return Err(MRError::Config(String::from("map partition size must not be zero")));
        }
        if self.intermediate_prefix.is_empty() {
            return Err(MRError::Config(String::from("intermediate prefix must not be empty")));
        }
        Ok(())
    }
}
