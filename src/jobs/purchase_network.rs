//! Purchase network: counts how often every two items were bought together.
//!
//! Pass one maps every transaction (`Item A, Item B, Item C`) to its unordered item pairs and
//! sums them up per pair. Pass two re-reads the pair counts, passes them through and appends the
//! number of distinct pairs as `Total Pairs: <n>`.

use crate::combinations::pairs;
use crate::error::{MRError, Result};
use crate::mapreducer::{Mapper, Reducer};
use crate::pair_key::PairKey;
use crate::parameters::MRParameters;
use crate::pipeline::{InputFormat, MRStage, Pipeline};
use crate::record_types::{MEmitter, MultiRecord, REmitter, Record};
use crate::reduce::SumReducer;

pub const ITEM_SEPARATOR: char = ',';

/// Splits a transaction into its items. Items are trimmed; empty items are dropped.
///
/// The split is on every `,`, not only on `", "`: `"A,B"` is the two items `A` and `B`. Items
/// therefore never contain a comma, which keeps their rendered `PairKey` parseable.
pub fn split_items(line: &str) -> Vec<&str> {
    line.split(ITEM_SEPARATOR)
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .collect()
}

/// Emits `(PairKey, 1)` for every 2-combination of the items of a transaction.
#[derive(Clone, Default)]
pub struct PairMapper;

impl Mapper for PairMapper {
    type Key = PairKey;
    type Value = u64;

    fn map(&mut self, em: &mut MEmitter<PairKey, u64>, record: Record) -> Result<()> {
        let items = split_items(&record.value);
        for (a, b) in pairs(&items) {
            em.emit(PairKey::new(*a, *b), 1);
        }
        Ok(())
    }
}

/// Sums up the ones of a pair and emits `(a, b)<TAB>count`.
pub type PairCountReducer = SumReducer<PairKey>;

/// Reads a whole `(a, b)<TAB>count` line of pass one (`InputFormat::Lines`). The line is split
/// at its last tab, since items may contain tabs but the count never does.
#[derive(Clone, Default)]
pub struct PairTallyMapper;

impl Mapper for PairTallyMapper {
    type Key = PairKey;
    type Value = u64;

    fn map(&mut self, em: &mut MEmitter<PairKey, u64>, record: Record) -> Result<()> {
        let line = record.value;
        let (key, count) = match line.rsplit_once('\t') {
            Some(kv) => kv,
            None => return Err(MRError::parse(line.as_str(), "missing tab between pair and count")),
        };
        let key: PairKey = key.parse()?;
        let count = count.trim()
            .parse::<u64>()
            .map_err(|e| MRError::parse(line.as_str(), format!("pair count is not an integer: {}", e)))?;
        em.emit(key, count);
        Ok(())
    }
}

/// Passes every pair count through and counts the pairs; `finish()` appends the number of
/// distinct pairs.
#[derive(Clone, Default)]
pub struct PairTallyReducer;

impl Reducer for PairTallyReducer {
    type Key = PairKey;
    type Value = u64;
    type Acc = u64;

    fn reduce(&mut self, pairs_seen: &mut u64, em: &mut REmitter, records: MultiRecord<PairKey, u64>) -> Result<()> {
        let (key, counts) = records.into_parts();
        em.emit_kv(&key, counts.into_iter().sum::<u64>());
        *pairs_seen += 1;
        Ok(())
    }

    fn finish(&mut self, pairs_seen: u64, em: &mut REmitter) -> Result<()> {
        em.emit(format!("Total Pairs: {}", pairs_seen));
        Ok(())
    }
}

/// The full job: `PurchaseNetwork` followed by `PurchaseNetworkCounter`.
pub fn pipeline(params: MRParameters) -> Pipeline {
    Pipeline::new(params)
        .stage(MRStage::new("PurchaseNetwork",
                            InputFormat::Lines,
                            PairMapper,
                            PairCountReducer::new()))
        .stage(MRStage::new("PurchaseNetworkCounter",
                            InputFormat::Lines,
                            PairTallyMapper,
                            PairTallyReducer))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map_line(line: &str) -> Vec<(PairKey, u64)> {
        let mut e = MEmitter::new();
        PairMapper.map(&mut e, Record::new("1", line)).unwrap();
        e._get()
    }

    #[test]
    fn test_mapper() {
        let emitted = map_line("Whitey Toothpaste, Best Bread, Fluffy Pizza");
        assert_eq!(emitted.len(), 3);
        assert!(emitted.iter().all(|&(_, n)| n == 1));
        assert!(emitted.contains(&(PairKey::new("Best Bread", "Whitey Toothpaste"), 1)));
        assert!(emitted.contains(&(PairKey::new("Fluffy Pizza", "Whitey Toothpaste"), 1)));
        assert!(emitted.contains(&(PairKey::new("Best Bread", "Fluffy Pizza"), 1)));
    }

    #[test]
    fn test_mapper_needs_two_items() {
        assert!(map_line("Lonely Banana").is_empty());
        assert!(map_line("").is_empty());
        assert!(map_line(" , ,").is_empty());
    }

    #[test]
    fn test_split_items() {
        assert_eq!(split_items("Item A, Item B,Item C ,  "), vec!["Item A", "Item B", "Item C"]);
        assert_eq!(split_items("A,B"), vec!["A", "B"]);
    }

    #[test]
    fn test_reducer() {
        let mut e = REmitter::new();
        PairCountReducer::new()
            .reduce(&mut (),
                    &mut e,
                    MultiRecord::new(PairKey::new("Whitey Toothpaste", "Best Bread"), vec![1, 1]))
            .unwrap();
        assert_eq!(e._get(), vec!["(Best Bread, Whitey Toothpaste)\t2"]);
    }

    #[test]
    fn test_tally_mapper_parses_pass_one_output() {
        let mut e = MEmitter::new();
        PairTallyMapper.map(&mut e, Record::new("1", "(Best Bread, Whitey Toothpaste)\t2")).unwrap();
        assert_eq!(e._get(), vec![(PairKey::new("Whitey Toothpaste", "Best Bread"), 2)]);

        let mut e = MEmitter::new();
        assert!(PairTallyMapper.map(&mut e, Record::new("1", "Best Bread\t2")).is_err());
        assert!(PairTallyMapper.map(&mut e, Record::new("2", "(Best Bread, Milk)\tmany")).is_err());
        assert!(PairTallyMapper.map(&mut e, Record::new("3", "(Best Bread, Milk) 2")).is_err());
    }

    #[test]
    fn test_tally_mapper_keeps_tabs_in_items() {
        let mut e = MEmitter::new();
        PairTallyMapper.map(&mut e, Record::new("1", "(Bread, Milk\tFresh)\t4")).unwrap();
        assert_eq!(e._get(), vec![(PairKey::new("Milk\tFresh", "Bread"), 4)]);
    }

    #[test]
    fn test_tally_reducer_counts_groups_not_sums() {
        let mut r = PairTallyReducer;
        let mut seen = 0;
        let mut e = REmitter::new();
        r.reduce(&mut seen, &mut e, MultiRecord::new(PairKey::new("a", "b"), vec![4])).unwrap();
        r.reduce(&mut seen, &mut e, MultiRecord::new(PairKey::new("a", "c"), vec![7])).unwrap();
        r.finish(seen, &mut e).unwrap();
        assert_eq!(e._get(), vec!["(a, b)\t4", "(a, c)\t7", "Total Pairs: 2"]);
    }
}
