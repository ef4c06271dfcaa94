//! Various iterators/adapters used for input formats.

use std::io;

use crate::error::{MRError, Result};
use crate::record_types::Record;

/// Transforms an iterator over lines into an iterator over Records. It yields
/// records with the key being the position of the current line, starting with
/// 1. Used as input iterator in the mapping phase for sources that only
/// yield values (no keys).
pub struct PosRecordIterator<I: Iterator<Item = io::Result<String>>> {
    i: I,
    counter: u64,
}

impl<I: Iterator<Item = io::Result<String>>> PosRecordIterator<I> {
    pub fn new(it: I) -> PosRecordIterator<I> {
        PosRecordIterator {
            i: it,
            counter: 0,
        }
    }
}

impl<I: Iterator<Item = io::Result<String>>> Iterator for PosRecordIterator<I> {
    type Item = Result<Record>;
    fn next(&mut self) -> Option<Result<Record>> {
        let line = self.i.next()?;
        self.counter += 1;
        Some(line.map(|val| Record::new(self.counter.to_string(), val))
            .map_err(MRError::from))
    }
}

/// Another transformation of lines -> records; this one splits every line at the first tab
/// into key and value, the format written by `REmitter::emit_kv()`.
pub struct KeyValueRecordIterator<I: Iterator<Item = io::Result<String>>> {
    i: I,
}

impl<I: Iterator<Item = io::Result<String>>> KeyValueRecordIterator<I> {
    pub fn new(it: I) -> KeyValueRecordIterator<I> {
        KeyValueRecordIterator { i: it }
    }
}

impl<I: Iterator<Item = io::Result<String>>> Iterator for KeyValueRecordIterator<I> {
    type Item = Result<Record>;
    fn next(&mut self) -> Option<Result<Record>> {
        let line = match self.i.next()? {
            Err(e) => return Some(Err(e.into())),
            Ok(l) => l,
        };
        Some(parse_kv_line(line))
    }
}

pub fn parse_kv_line(line: String) -> Result<Record> {
    match line.split_once('\t') {
        None => Err(MRError::parse(line, "missing tab between key and value")),
        Some((k, v)) => Ok(Record::new(k, v)),
    }
}
