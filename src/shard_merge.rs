//! Implements a merge tree to merge an arbitrary number of sorted runs (map outputs, or reduce
//! shard outputs). Genericized in order to build arbitrary merge trees.

use std::iter::{self, Peekable};

type Source<'a, T> = Peekable<Box<dyn Iterator<Item = T> + 'a>>;

/// See module description.
/// This type uses dynamic instead of static dispatch because it realizes an arbitrary structure
/// and can therefore not work with a single type signature.
///
/// On equal items the left side wins, so items from earlier sources come first.
pub struct ShardMergeIterator<'a, T: Ord> {
    left: Source<'a, T>,
    right: Source<'a, T>,
}

impl<'a, T: Ord> Iterator for ShardMergeIterator<'a, T> {
    type Item = T;
    fn next(&mut self) -> Option<Self::Item> {
        let take_left = match (self.left.peek(), self.right.peek()) {
            (None, None) => return None,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (Some(l), Some(r)) => l <= r,
        };
        if take_left {
            self.left.next()
        } else {
            self.right.next()
        }
    }
}

impl<'a, T: Ord + 'a> ShardMergeIterator<'a, T> {
    fn new<L, R>(left: L, right: R) -> ShardMergeIterator<'a, T>
        where L: Iterator<Item = T> + 'a,
              R: Iterator<Item = T> + 'a
    {
        let left: Box<dyn Iterator<Item = T> + 'a> = Box::new(left);
        let right: Box<dyn Iterator<Item = T> + 'a> = Box::new(right);
        ShardMergeIterator {
            left: left.peekable(),
            right: right.peekable(),
        }
    }

    fn empty() -> ShardMergeIterator<'a, T> {
        ShardMergeIterator::new(iter::empty(), iter::empty())
    }

    /// Takes multiple iterators of type It and generates one ShardMergeIterator
    /// (yes, iterator over a collection of iterators).
    pub fn build<It, ItIt>(sources: ItIt) -> ShardMergeIterator<'a, T>
        where It: Iterator<Item = T> + 'a,
              ItIt: IntoIterator<Item = It>
    {
        let mut merged: Vec<ShardMergeIterator<'a, T>> = Vec::new();
        let mut sources = sources.into_iter();

        // Initial merging: Merge pairs of input iterators together.
        while let Some(src1) = sources.next() {
            match sources.next() {
                None => merged.push(ShardMergeIterator::new(src1, iter::empty())),
                Some(src2) => merged.push(ShardMergeIterator::new(src1, src2)),
            }
        }

        // Recursively build the merge tree from the leaves.
        ShardMergeIterator::merge(merged)
    }

    /// Merge multiple ShardMergeIterators, recursively (meaning it will result in a more or less
    /// balanced merge sort tree).
    fn merge(mut its: Vec<ShardMergeIterator<'a, T>>) -> ShardMergeIterator<'a, T> {
        match its.len() {
            0 => ShardMergeIterator::empty(),
            1 => its.remove(0),
            _ => {
                // its is left part, right is right part
                let split_at = its.len() / 2;
                let right = its.split_off(split_at);
                ShardMergeIterator::new(ShardMergeIterator::merge(its),
                                        ShardMergeIterator::merge(right))
            }
        }
    }
}
