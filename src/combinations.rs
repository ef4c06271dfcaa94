//! Enumeration of 2-combinations.

/// Iterator over all pairs `(items[i], items[j])` with `i < j`, in source order:
/// `(0,1), (0,2), .., (0,n-1), (1,2), ..`. Yields `n*(n-1)/2` pairs; equal items at different
/// positions still form a pair.
///
/// Cloning the iterator (or calling `pairs()` again) restarts from the current position
/// independently.
#[derive(Clone, Debug)]
pub struct Pairs<'a, T> {
    items: &'a [T],
    i: usize,
    j: usize,
}

pub fn pairs<T>(items: &[T]) -> Pairs<'_, T> {
    Pairs {
        items: items,
        i: 0,
        j: 1,
    }
}

impl<'a, T> Iterator for Pairs<'a, T> {
    type Item = (&'a T, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        if self.j >= self.items.len() {
            self.i += 1;
            self.j = self.i + 1;
            if self.j >= self.items.len() {
                return None;
            }
        }
        let pair = (&self.items[self.i], &self.items[self.j]);
        self.j += 1;
        Some(pair)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.items.len();
        let left = if self.j >= n {
            // Row i is done; all pairs of the rows after it are left.
            let rest = n.saturating_sub(self.i + 1);
            rest * rest.saturating_sub(1) / 2
        } else {
            let rest = n - self.i - 1;
            (n - self.j) + rest * (rest - 1) / 2
        };
        (left, Some(left))
    }
}

impl<'a, T> ExactSizeIterator for Pairs<'a, T> {}
