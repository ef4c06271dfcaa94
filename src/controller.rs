//! Controls the execution of one mapreduce stage.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, sync_channel};
use std::time::Instant;

use log::{debug, info, warn};
use scoped_threadpool::Pool;
use time::ext::InstantExt;
use time::Duration;

use crate::error::{MRError, Result};
use crate::input_cache::InputCache;
use crate::map::{MapOutput, MapPartition, SortedRun};
use crate::mapreducer::{Accumulator, Mapper, Reducer};
use crate::parameters::MRParameters;
use crate::record_types::{MultiRecord, REmitter, Record};
use crate::reduce::{ReduceOutput, ReducePartition};
use crate::shard_merge::ShardMergeIterator;

/// Counters of one finished stage.
#[derive(Clone, Debug)]
pub struct StageStats {
    pub map_partitions: usize,
    pub records: usize,
    pub emissions: usize,
    pub groups: usize,
    pub lines_written: usize,
    pub elapsed: Duration,
}

impl Default for StageStats {
    fn default() -> StageStats {
        StageStats {
            map_partitions: 0,
            records: 0,
            emissions: 0,
            groups: 0,
            lines_written: 0,
            elapsed: Duration::ZERO,
        }
    }
}

pub struct MRController<M: Mapper, R: Reducer<Key = M::Key, Value = M::Value>> {
    params: MRParameters,
    mapper: M,
    reducer: R,

    stats: StageStats,
}

impl<M, R> MRController<M, R>
    where M: Mapper,
          R: Reducer<Key = M::Key, Value = M::Value>
{
    /// Create a new mapreduce instance and execute it immediately.
    ///
    /// All input is mapped before the first group is reduced. Output lines are written to `out`
    /// in ascending key order, followed by whatever the reducer emits in `finish()`. Nothing is
    /// written if any phase fails.
    pub fn run<In, Out>(mapper: M,
                        reducer: R,
                        params: MRParameters,
                        mut input: In,
                        out: &mut Out)
                        -> Result<StageStats>
        where In: Iterator<Item = Result<Record>>,
              Out: Write + ?Sized
    {
        params.validate()?;
        let start = Instant::now();
        let mut controller = MRController {
            params: params,
            mapper: mapper,
            reducer: reducer,
            stats: StageStats::default(),
        };

        let map_outputs = controller.run_map(&mut input)?;
        info!("map phase done: {} partitions, {} records, {} emissions",
              controller.stats.map_partitions,
              controller.stats.records,
              controller.stats.emissions);

        let reduce_outputs = controller.run_reduce(map_outputs)?;
        controller.write_output(reduce_outputs, out)?;

        controller.stats.elapsed = Instant::now().signed_duration_since(start);
        info!("reduce phase done: {} groups, {} lines written; stage took {} ms",
              controller.stats.groups,
              controller.stats.lines_written,
              controller.stats.elapsed.whole_milliseconds());
        Ok(controller.stats)
    }

    fn read_map_input<In: Iterator<Item = Result<Record>>>(it: &mut In,
                                                           approx_bytes: usize)
                                                           -> Result<InputCache> {
        InputCache::from_iter(8192, approx_bytes, it)
    }

    fn run_map<In: Iterator<Item = Result<Record>>>(&mut self,
                                                    input: &mut In)
                                                    -> Result<Vec<MapOutput<M::Key, M::Value>>> {
        let mut pool = Pool::new(self.params.mappers as u32);
        // Tokens limit the number of partitions held in memory at once.
        let (send, recv) = sync_channel(self.params.mappers);
        let (result_send, result_recv) = channel();

        for _ in 0..self.params.mappers {
            let _ = send.send(());
        }

        // Set by the first failing partition; no new partitions are started after that.
        let failed_flag = AtomicBool::new(false);
        let failed = &failed_flag;
        let mapper = &self.mapper;
        let params = &self.params;
        let mut partitions = 0;
        let mut read_error = None;

        pool.scoped(|scope| {
            loop {
                let _ = recv.recv();
                if failed.load(Ordering::SeqCst) {
                    warn!("a map partition failed; not reading further input");
                    break;
                }

                let inp = match Self::read_map_input(&mut *input, params.map_partition_size) {
                    Err(e) => {
                        read_error = Some(e);
                        break;
                    }
                    Ok(inp) => inp,
                };
                if inp.is_empty() {
                    break;
                }

                let mapper = mapper.clone();
                let params = params.clone().set_shard_id(partitions);
                let done = send.clone();
                let results = result_send.clone();
                let part = partitions;

                scope.execute(move || {
                    let res = MapPartition::new(params, inp, mapper).run();
                    if res.is_err() {
                        failed.store(true, Ordering::SeqCst);
                    }
                    let _ = results.send((part, res));
                    let _ = done.send(());
                });
                partitions += 1;
            }

            scope.join_all();
        });
        drop(result_send);

        if let Some(e) = read_error {
            return Err(e);
        }

        let mut outputs: Vec<(usize, MapOutput<M::Key, M::Value>)> = Vec::with_capacity(partitions);
        for (part, res) in result_recv.iter() {
            outputs.push((part, res?));
        }
        if outputs.len() != partitions {
            return Err(MRError::Config(format!("{} of {} map partitions did not report back",
                                               partitions - outputs.len(),
                                               partitions)));
        }
        outputs.sort_by_key(|&(part, _)| part);

        self.stats.map_partitions = partitions;
        for &(_, ref o) in outputs.iter() {
            self.stats.records += o.records;
            self.stats.emissions += o.emissions;
        }
        Ok(outputs.into_iter().map(|(_, o)| o).collect())
    }

    /// Hands shard i of every map output, in partition order, to reduce shard i.
    fn shuffle(&self,
               map_outputs: Vec<MapOutput<M::Key, M::Value>>)
               -> Vec<Vec<SortedRun<M::Key, M::Value>>> {
        let mut shards: Vec<Vec<SortedRun<M::Key, M::Value>>> =
            (0..self.params.reducers).map(|_| Vec::with_capacity(map_outputs.len())).collect();
        for output in map_outputs {
            for (shard, run) in output.runs.into_iter().enumerate() {
                shards[shard].push(run);
            }
        }
        shards
    }

    fn run_reduce(&mut self,
                  map_outputs: Vec<MapOutput<M::Key, M::Value>>)
                  -> Result<Vec<ReduceOutput<M::Key, R::Acc>>> {
        let shards = self.shuffle(map_outputs);
        let mut pool = Pool::new(self.params.reducers as u32);
        let (result_send, result_recv) = channel();

        pool.scoped(|scope| {
            for (i, runs) in shards.into_iter().enumerate() {
                let reducer = self.reducer.clone();
                let params = self.params.clone().set_shard_id(i);
                let results = result_send.clone();

                scope.execute(move || {
                    let res = ReducePartition::new(reducer, params, runs).run();
                    let _ = results.send((i, res));
                });
            }
        });
        drop(result_send);

        let mut outputs = Vec::with_capacity(self.params.reducers);
        for (shard, res) in result_recv.iter() {
            outputs.push((shard, res?));
        }
        if outputs.len() != self.params.reducers {
            return Err(MRError::Config(format!("{} of {} reduce shards did not report back",
                                               self.params.reducers - outputs.len(),
                                               self.params.reducers)));
        }
        outputs.sort_by_key(|&(shard, _)| shard);
        debug!("all {} reduce shards finished", outputs.len());
        Ok(outputs.into_iter().map(|(_, o)| o).collect())
    }

    /// Merges the shard outputs by key and writes them, then the reducer's closing lines.
    fn write_output<Out: Write + ?Sized>(&mut self,
                                         outputs: Vec<ReduceOutput<M::Key, R::Acc>>,
                                         out: &mut Out)
                                         -> Result<()> {
        let mut acc = R::Acc::default();
        let mut groups = Vec::with_capacity(outputs.len());
        for o in outputs {
            acc.merge(o.acc);
            groups.push(o.groups.into_iter());
        }

        let mut closing = REmitter::new();
        self.reducer.finish(acc, &mut closing)?;

        for group in ShardMergeIterator::build(groups) {
            self.stats.groups += 1;
            self.write_lines(group, &mut *out)?;
        }
        let closing = closing._get();
        self.write_lines(MultiRecord::new((), closing), &mut *out)?;
        out.flush()?;
        Ok(())
    }

    fn write_lines<K, Out: Write + ?Sized>(&mut self,
                                           lines: MultiRecord<K, String>,
                                           out: &mut Out)
                                           -> Result<()> {
        for line in lines {
            out.write_all(line.as_bytes())?;
            out.write_all(b"\n")?;
            self.stats.lines_written += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record_types::MEmitter;
    use crate::reduce::SumReducer;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    #[derive(Clone)]
    struct WordMapper;

    impl Mapper for WordMapper {
        type Key = String;
        type Value = u64;
        fn map(&mut self, e: &mut MEmitter<String, u64>, r: Record) -> Result<()> {
            for w in r.value.split_whitespace() {
                if w == "poison" {
                    return Err(MRError::parse(r.value.clone(), "poisoned record"));
                }
                e.emit(String::from(w), 1);
            }
            Ok(())
        }
    }

    /// Counts groups and reports the count at the end.
    #[derive(Clone)]
    struct CountingReducer;

    impl Reducer for CountingReducer {
        type Key = String;
        type Value = u64;
        type Acc = u64;
        fn reduce(&mut self, acc: &mut u64, em: &mut REmitter, r: MultiRecord<String, u64>) -> Result<()> {
            *acc += 1;
            em.emit_kv(r.key(), r.len());
            Ok(())
        }
        fn finish(&mut self, acc: u64, em: &mut REmitter) -> Result<()> {
            em.emit(format!("groups: {}", acc));
            Ok(())
        }
    }

    fn get_input() -> Vec<Result<Record>> {
        let lines = vec!["the quick brown fox",
                         "jumps over the lazy dog",
                         "the dog sleeps",
                         "a fox runs"];
        lines.into_iter()
            .enumerate()
            .map(|(i, l)| Ok(Record::new(format!("{}", i + 1), l)))
            .collect()
    }

    fn run_with<R>(reducer: R, params: MRParameters, input: Vec<Result<Record>>) -> Result<(String, StageStats)>
        where R: Reducer<Key = String, Value = u64>
    {
        let mut out = Vec::new();
        let stats = MRController::run(WordMapper, reducer, params, input.into_iter(), &mut out)?;
        Ok((String::from_utf8(out).unwrap(), stats))
    }

    #[test]
    fn test_word_count_stage() {
        let (out, stats) = run_with(SumReducer::new(), MRParameters::new(), get_input()).unwrap();
        assert_eq!(out,
                   "a\t1\nbrown\t1\ndog\t2\nfox\t2\njumps\t1\nlazy\t1\nover\t1\nquick\t1\nruns\t1\n\
                    sleeps\t1\nthe\t3\n");
        assert_eq!(stats.records, 4);
        assert_eq!(stats.emissions, 15);
        assert_eq!(stats.groups, 11);
        assert_eq!(stats.lines_written, 11);
        assert!(!stats.elapsed.is_negative());
    }

    #[test]
    fn test_output_independent_of_concurrency() {
        let (reference, _) = run_with(SumReducer::new(),
                                      MRParameters::new().set_concurrency(1, 1),
                                      get_input())
            .unwrap();

        for &(m, r, part) in &[(2, 3, 1), (4, 7, 20), (3, 1, 1000)] {
            let params = MRParameters::new().set_concurrency(m, r).set_partition_size(part);
            let (out, stats) = run_with(SumReducer::new(), params, get_input()).unwrap();
            assert_eq!(out, reference);
            if part == 1 {
                assert_eq!(stats.map_partitions, 4);
            }
        }
    }

    #[test]
    fn test_finish_sees_all_shards() {
        let params = MRParameters::new().set_concurrency(2, 5).set_partition_size(10);
        let (out, _) = run_with(CountingReducer, params, get_input()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 12);
        assert_eq!(lines[0], "a\t1");
        assert_eq!(lines[11], "groups: 11");
    }

    #[test]
    fn test_map_error_fails_stage_without_output() {
        let mut input = get_input();
        input.push(Ok(Record::new("5", "poison pill")));
        let mut out = Vec::new();
        let res = MRController::run(WordMapper,
                                    SumReducer::new(),
                                    MRParameters::new().set_partition_size(16),
                                    input.into_iter(),
                                    &mut out);
        assert!(matches!(res, Err(MRError::Parse { .. })));
        assert!(out.is_empty());
    }

    /// Fails on every record and counts how often it was called.
    #[derive(Clone)]
    struct FailingMapper {
        calls: Arc<AtomicUsize>,
    }

    impl Mapper for FailingMapper {
        type Key = String;
        type Value = u64;
        fn map(&mut self, _: &mut MEmitter<String, u64>, r: Record) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(MRError::parse(r.value, "always fails"))
        }
    }

    #[test]
    fn test_map_error_stops_reading_input() {
        let calls = Arc::new(AtomicUsize::new(0));
        let input: Vec<Result<Record>> =
            (0..100).map(|i| Ok(Record::new(i.to_string(), "x"))).collect();
        let mut out = Vec::new();
        let res = MRController::run(FailingMapper { calls: calls.clone() },
                                    SumReducer::<String>::new(),
                                    MRParameters::new().set_concurrency(1, 1).set_partition_size(1),
                                    input.into_iter(),
                                    &mut out);
        assert!(matches!(res, Err(MRError::Parse { .. })));
        // One record per partition and one mapper: the second partition is never started.
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(out.is_empty());
    }

    #[test]
    fn test_read_error_fails_stage() {
        let mut input = get_input();
        input.insert(2, Err(MRError::parse("??", "unreadable")));
        let res = run_with(SumReducer::new(), MRParameters::new(), input);
        assert!(res.is_err());
    }

    #[test]
    fn test_empty_input() {
        let (out, stats) = run_with(CountingReducer, MRParameters::new(), Vec::new()).unwrap();
        assert_eq!(out, "groups: 0\n");
        assert_eq!(stats.map_partitions, 0);
    }
}
