//! Chains mapreduce stages: the output store of one stage is the input of the next one.

use std::io::Write;
use std::path::Path;
use std::time::Instant;

use log::{debug, info, warn};
use tempfile::TempDir;
use time::ext::InstantExt;

use crate::controller::{MRController, StageStats};
use crate::error::{MRError, Result};
use crate::formats::lines;
use crate::formats::store::StoreWriter;
use crate::formats::util::{KeyValueRecordIterator, PosRecordIterator};
use crate::mapreducer::{Mapper, Reducer};
use crate::parameters::MRParameters;
use crate::record_types::Record;

/// How a stage turns the lines of its input into records.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputFormat {
    /// Every line is a value, keyed by its position (starting at 1).
    Lines,
    /// Every line is `key<TAB>value`, as written by `REmitter::emit_kv()`.
    KeyValue,
}

pub type RecordSource<'a> = Box<dyn Iterator<Item = Result<Record>> + 'a>;

/// One step of a pipeline.
pub trait Stage: Send + Sync {
    fn name(&self) -> &str;
    fn input_format(&self) -> InputFormat;
    /// Runs the stage over all of `input` and writes its output lines to `out`.
    fn run(&self, params: &MRParameters, input: RecordSource, out: &mut dyn Write) -> Result<StageStats>;
}

/// A stage built from a Mapper and a Reducer.
pub struct MRStage<M, R> {
    name: String,
    format: InputFormat,
    mapper: M,
    reducer: R,
}

impl<M, R> MRStage<M, R> {
    pub fn new<S: Into<String>>(name: S, format: InputFormat, mapper: M, reducer: R) -> MRStage<M, R> {
        MRStage {
            name: name.into(),
            format: format,
            mapper: mapper,
            reducer: reducer,
        }
    }
}

impl<M, R> Stage for MRStage<M, R>
    where M: Mapper + Sync,
          R: Reducer<Key = M::Key, Value = M::Value> + Sync
{
    fn name(&self) -> &str {
        &self.name
    }

    fn input_format(&self) -> InputFormat {
        self.format
    }

    fn run(&self, params: &MRParameters, input: RecordSource, out: &mut dyn Write) -> Result<StageStats> {
        MRController::run(self.mapper.clone(),
                          self.reducer.clone(),
                          params.clone(),
                          input,
                          out)
    }
}

pub struct Pipeline {
    params: MRParameters,
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    pub fn new(params: MRParameters) -> Pipeline {
        Pipeline {
            params: params,
            stages: Vec::new(),
        }
    }

    /// Appends a stage; stages run in the order they were added.
    pub fn stage<S: Stage + 'static>(mut self, stage: S) -> Pipeline {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn params(&self) -> &MRParameters {
        &self.params
    }

    /// Runs all stages in order. `input` may be a file or a directory of files. The last stage
    /// writes to `output`, which must not exist yet; all other stages write to intermediate stores
    /// in a directory of their own, created per run below the intermediate location (see
    /// `MRParameters::set_intermediate()`). Concurrent runs therefore never share a store.
    ///
    /// A stage only starts once the previous stage's store has been committed. If a stage fails,
    /// no later stage is run, its partial store is discarded and the error is returned as
    /// `MRError::Stage`.
    pub fn run(&self, input: &Path, output: &Path) -> Result<Vec<StageStats>> {
        self.params.validate()?;
        if self.stages.is_empty() {
            return Err(MRError::Config(String::from("pipeline has no stages")));
        }
        if output.exists() {
            return Err(MRError::Config(format!("output path {} already exists", output.display())));
        }

        let work_dir = tempfile::Builder::new()
            .prefix(&self.params.intermediate_prefix)
            .tempdir_in(&self.params.intermediate_location)
            .map_err(|e| MRError::Open {
                path: self.params.intermediate_location.clone(),
                source: e,
            })?;
        debug!("intermediate stores go to {}", work_dir.path().display());

        let result = self.run_stages(input, output, work_dir.path());
        self.clean_up(work_dir);
        result
    }

    fn run_stages(&self, input: &Path, output: &Path, work_dir: &Path) -> Result<Vec<StageStats>> {
        let start = Instant::now();
        let mut all_stats = Vec::with_capacity(self.stages.len());
        let mut source = input.to_path_buf();

        for (i, stage) in self.stages.iter().enumerate() {
            let last = i + 1 == self.stages.len();
            let destination = if last {
                output.to_path_buf()
            } else {
                work_dir.join(format!("{}{}", self.params.intermediate_prefix, i))
            };

            info!("stage {} ({}): {} -> {}",
                  i,
                  stage.name(),
                  source.display(),
                  destination.display());
            let stats = self.run_stage(stage.as_ref(), &source, &destination)
                .map_err(|e| MRError::Stage {
                    index: i,
                    name: stage.name().to_string(),
                    source: Box::new(e),
                })?;
            all_stats.push(stats);
            source = destination;
        }

        info!("pipeline of {} stages done in {} ms",
              self.stages.len(),
              Instant::now().signed_duration_since(start).whole_milliseconds());
        Ok(all_stats)
    }

    fn run_stage(&self, stage: &dyn Stage, source: &Path, destination: &Path) -> Result<StageStats> {
        let lines = lines::new_from_path(source)?;
        let records: RecordSource = match stage.input_format() {
            InputFormat::Lines => Box::new(PosRecordIterator::new(lines)),
            InputFormat::KeyValue => Box::new(KeyValueRecordIterator::new(lines)),
        };

        let mut store = StoreWriter::create(destination)?;
        let stats = stage.run(&self.params, records, &mut store)?;
        store.commit()?;
        Ok(stats)
    }

    fn clean_up(&self, work_dir: TempDir) {
        if self.params.keep_temp_files {
            let kept = work_dir.into_path();
            info!("keeping intermediate stores in {}", kept.display());
            return;
        }
        let path = work_dir.path().to_path_buf();
        if let Err(e) = work_dir.close() {
            warn!("could not remove intermediate stores in {}: {}", path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record_types::MEmitter;
    use crate::reduce::SumReducer;
    use std::ffi::OsString;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Emits (value, 1); fails on values starting with "bad".
    #[derive(Clone)]
    struct ValueMapper;

    impl Mapper for ValueMapper {
        type Key = String;
        type Value = u64;
        fn map(&mut self, e: &mut MEmitter<String, u64>, r: Record) -> Result<()> {
            if r.value.starts_with("bad") {
                return Err(MRError::parse(r.value, "bad record"));
            }
            e.emit(r.value, 1);
            Ok(())
        }
    }

    /// A stage that only counts how often it was started.
    struct CountingStage {
        runs: Arc<AtomicUsize>,
    }

    impl Stage for CountingStage {
        fn name(&self) -> &str {
            "Counting"
        }
        fn input_format(&self) -> InputFormat {
            InputFormat::KeyValue
        }
        fn run(&self, _: &MRParameters, input: RecordSource, out: &mut dyn Write) -> Result<StageStats> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            let n = input.count();
            writeln!(out, "records\t{}", n)?;
            Ok(StageStats::default())
        }
    }

    fn entries(dir: &Path) -> Vec<OsString> {
        let mut names: Vec<_> = fs::read_dir(dir).unwrap().map(|e| e.unwrap().file_name()).collect();
        names.sort();
        names
    }

    fn params(dir: &Path) -> MRParameters {
        MRParameters::new()
            .set_concurrency(2, 2)
            .set_intermediate(dir.to_path_buf(), String::from("pass_"))
    }

    #[test]
    fn test_two_stages() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.txt");
        let output = dir.path().join("out.txt");
        fs::write(&input, "b\na\nb\n").unwrap();

        let runs = Arc::new(AtomicUsize::new(0));
        let p = Pipeline::new(params(dir.path()))
            .stage(MRStage::new("Count", InputFormat::Lines, ValueMapper, SumReducer::<String>::new()))
            .stage(CountingStage { runs: runs.clone() });
        let stats = p.run(&input, &output).unwrap();

        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].groups, 2);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(fs::read_to_string(&output).unwrap(), "records\t2\n");
        assert_eq!(entries(dir.path()), vec![OsString::from("in.txt"), OsString::from("out.txt")]);
    }

    #[test]
    fn test_failed_stage_stops_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.txt");
        let output = dir.path().join("out.txt");
        fs::write(&input, "a\nbad apple\nc\n").unwrap();

        let runs = Arc::new(AtomicUsize::new(0));
        let p = Pipeline::new(params(dir.path()))
            .stage(MRStage::new("Count", InputFormat::Lines, ValueMapper, SumReducer::<String>::new()))
            .stage(CountingStage { runs: runs.clone() });

        match p.run(&input, &output) {
            Err(MRError::Stage { index, name, .. }) => {
                assert_eq!(index, 0);
                assert_eq!(name, "Count");
            }
            other => panic!("unexpected result: {:?}", other.map(|s| s.len())),
        }
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert!(!output.exists());
        assert_eq!(entries(dir.path()), vec![OsString::from("in.txt")]);
    }

    #[test]
    fn test_keep_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.txt");
        fs::write(&input, "x\n").unwrap();

        let p = Pipeline::new(params(dir.path()).set_keep_temp_files(true))
            .stage(MRStage::new("Count", InputFormat::Lines, ValueMapper, SumReducer::<String>::new()))
            .stage(CountingStage { runs: Arc::new(AtomicUsize::new(0)) });
        p.run(&input, &dir.path().join("out")).unwrap();

        let kept: Vec<_> = entries(dir.path())
            .into_iter()
            .filter(|n| n.to_string_lossy().starts_with("pass_"))
            .collect();
        assert_eq!(kept.len(), 1);
        let store = dir.path().join(&kept[0]).join("pass_0");
        assert_eq!(fs::read_to_string(store).unwrap(), "x\t1\n");
    }

    #[test]
    fn test_runs_do_not_share_stores() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.txt");
        fs::write(&input, "x\n").unwrap();

        let p = Pipeline::new(params(dir.path()).set_keep_temp_files(true))
            .stage(MRStage::new("Count", InputFormat::Lines, ValueMapper, SumReducer::<String>::new()))
            .stage(CountingStage { runs: Arc::new(AtomicUsize::new(0)) });
        p.run(&input, &dir.path().join("out1")).unwrap();
        p.run(&input, &dir.path().join("out2")).unwrap();

        let work_dirs = entries(dir.path())
            .into_iter()
            .filter(|n| n.to_string_lossy().starts_with("pass_"))
            .count();
        assert_eq!(work_dirs, 2);
    }

    #[test]
    fn test_configuration_errors() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.txt");
        fs::write(&input, "x\n").unwrap();

        let empty = Pipeline::new(params(dir.path()));
        assert!(empty.run(&input, &dir.path().join("out")).unwrap_err().is_config());

        let p = Pipeline::new(params(dir.path()))
            .stage(MRStage::new("Count", InputFormat::Lines, ValueMapper, SumReducer::<String>::new()));
        // existing output
        assert!(p.run(&input, &input).unwrap_err().is_config());
        // missing input
        let err = p.run(&dir.path().join("missing"), &dir.path().join("out")).unwrap_err();
        assert!(err.is_config());
        assert!(!dir.path().join("out").exists());
    }
}
