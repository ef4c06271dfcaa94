use std::vec;

use crate::error::Result;
use crate::record_types::Record;

/// Holds inputs to the Map phase in memory: one map partition.
/// Records are read from the source until roughly `max_bytes` of key and value data have been
/// collected.
pub struct InputCache {
    records: vec::IntoIter<Record>,
    len: usize,
    bytes: usize,
}

impl InputCache {
    pub fn from_iter<It: Iterator<Item = Result<Record>>>(chunk_length: usize,
                                                          max_bytes: usize,
                                                          it: &mut It)
                                                          -> Result<Self> {
        let mut chunk = Vec::with_capacity(chunk_length);
        let mut bytes_read: usize = 0;

        for v in it {
            let v = v?;
            bytes_read += v.key.len() + v.value.len();
            chunk.push(v);

            if bytes_read >= max_bytes {
                break;
            }
        }

        Ok(InputCache {
            len: chunk.len(),
            bytes: bytes_read,
            records: chunk.into_iter(),
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn bytes(&self) -> usize {
        self.bytes
    }
}

impl Iterator for InputCache {
    type Item = Record;
    fn next(&mut self) -> Option<Self::Item> {
        self.records.next()
    }
}
