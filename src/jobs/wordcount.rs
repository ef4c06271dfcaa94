//! Two-pass word count: pass one counts every word, pass two re-reads those counts and adds the
//! total number of words and the number of distinct words.

use std::fmt;

use regex::Regex;

use crate::error::{MRError, Result};
use crate::mapreducer::Mapper;
use crate::parameters::MRParameters;
use crate::pipeline::{InputFormat, MRStage, Pipeline};
use crate::record_types::{MEmitter, Record};
use crate::reduce::SumReducer;

/// Lower-cases a line, splits it on runs of non-word characters and emits `(word, 1)` for every
/// non-empty token.
#[derive(Clone)]
pub struct WordCountMapper {
    separator: Regex,
}

impl WordCountMapper {
    pub fn new() -> WordCountMapper {
        WordCountMapper {
            separator: Regex::new(r"\W+").expect("static regex"),
        }
    }

    pub fn tokens<'a>(&'a self, line: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.separator.split(line).filter(|t| !t.is_empty())
    }
}

impl Default for WordCountMapper {
    fn default() -> WordCountMapper {
        WordCountMapper::new()
    }
}

impl Mapper for WordCountMapper {
    type Key = String;
    type Value = u64;

    fn map(&mut self, em: &mut MEmitter<String, u64>, record: Record) -> Result<()> {
        let line = record.value.to_lowercase();
        for token in self.tokens(&line) {
            em.emit(String::from(token), 1);
        }
        Ok(())
    }
}

/// Key space of the second pass. The two counters are separate variants instead of reserved
/// strings, so no token can collide with them; they sort after all words.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WordKey {
    Word(String),
    TotalWords,
    UniqueWords,
}

impl fmt::Display for WordKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            WordKey::Word(ref w) => f.write_str(w),
            WordKey::TotalWords => f.write_str("Total Words:"),
            WordKey::UniqueWords => f.write_str("Unique Words:"),
        }
    }
}

/// Reads one `word<TAB>count` record of pass one and emits the word count again, plus its
/// contribution to the total and unique word counters.
#[derive(Clone, Default)]
pub struct WordCountSumMapper;

impl Mapper for WordCountSumMapper {
    type Key = WordKey;
    type Value = u64;

    fn map(&mut self, em: &mut MEmitter<WordKey, u64>, record: Record) -> Result<()> {
        let count = record.value
            .trim()
            .parse::<u64>()
            .map_err(|e| MRError::parse(format!("{}\t{}", record.key, record.value),
                                        format!("count is not an integer: {}", e)))?;

        em.emit(WordKey::Word(record.key), count);
        em.emit(WordKey::TotalWords, count);
        em.emit(WordKey::UniqueWords, 1);
        Ok(())
    }
}

/// The full job: `WordCount` followed by `WordCountSum`, both reduced by summation.
pub fn pipeline(params: MRParameters) -> Pipeline {
    Pipeline::new(params)
        .stage(MRStage::new("WordCount",
                            InputFormat::Lines,
                            WordCountMapper::new(),
                            SumReducer::<String>::new()))
        .stage(MRStage::new("WordCountSum",
                            InputFormat::KeyValue,
                            WordCountSumMapper,
                            SumReducer::<WordKey>::new()))
}
