//! Implements mapreduce stages bounded to one machine, and pipelines chaining them
//! through intermediate stores.
//!
//! A stage maps all input records in parallel partitions, groups the emissions by key and
//! reduces every group, writing `key<TAB>value` lines in key order. `jobs` contains the
//! two-pass word count and the purchase network (item pair) count built on top of it.
//!

pub mod combinations;
pub mod controller;
pub mod error;
pub mod formats;
pub mod input_cache;
pub mod jobs;
pub mod map;
pub mod mapreducer;
pub mod pair_key;
pub mod parameters;
pub mod pipeline;
pub mod record_types;
pub mod reduce;
pub mod shard_merge;

pub use crate::controller::{MRController, StageStats};
pub use crate::error::{MRError, Result};
pub use crate::mapreducer::{Accumulator, Mapper, Reducer};
pub use crate::pair_key::PairKey;
pub use crate::parameters::MRParameters;
pub use crate::pipeline::{InputFormat, MRStage, Pipeline, Stage};
pub use crate::record_types::{MEmitter, MultiRecord, REmitter, Record};
