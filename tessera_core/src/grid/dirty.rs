//! Row damage as a bitset.
//!
//! Sync sets one bit per row it writes. The renderer consumes the set with
//! [`DirtyTracker::drain`], which clears each bit as it yields it. Bits the
//! renderer does not get to stay set for the next frame.

use std::ops::Range;

const WORD: usize = u64::BITS as usize;

/// Set of damaged rows, one bit per row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirtyTracker {
    words: Vec<u64>,
    lines: usize,
}

impl DirtyTracker {
    /// A clean set over `lines` rows.
    pub fn new(lines: usize) -> Self {
        Self {
            words: vec![0; lines.div_ceil(WORD)],
            lines,
        }
    }

    pub fn lines(&self) -> usize {
        self.lines
    }

    /// Out-of-range rows are ignored.
    pub fn mark(&mut self, line: usize) {
        if line < self.lines {
            self.words[line / WORD] |= 1u64 << (line % WORD);
        }
    }

    /// Mark every row in `lines`, clipped to the tracked rows.
    pub fn mark_range(&mut self, lines: Range<usize>) {
        for line in lines.start..lines.end.min(self.lines) {
            self.mark(line);
        }
    }

    pub fn mark_all(&mut self) {
        self.words.fill(u64::MAX);
        // Padding bits past the last row stay clear.
        let tail = self.lines % WORD;
        if tail != 0 {
            if let Some(last) = self.words.last_mut() {
                *last = (1u64 << tail) - 1;
            }
        }
    }

    pub fn is_dirty(&self, line: usize) -> bool {
        line < self.lines && self.words[line / WORD] & (1u64 << (line % WORD)) != 0
    }

    pub fn is_any_dirty(&self) -> bool {
        self.words.iter().any(|&w| w != 0)
    }

    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Dirty rows in ascending order, each cleared as it is yielded.
    pub fn drain(&mut self) -> DirtyIter<'_> {
        DirtyIter {
            words: &mut self.words,
            word: 0,
        }
    }

    /// Track `lines` rows. The whole new extent is damaged.
    pub fn resize(&mut self, lines: usize) {
        self.lines = lines;
        self.words.resize(lines.div_ceil(WORD), 0);
        self.mark_all();
    }
}

/// Consuming iterator from [`DirtyTracker::drain`].
pub struct DirtyIter<'a> {
    words: &'a mut [u64],
    word: usize,
}

impl Iterator for DirtyIter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        while let Some(bits) = self.words.get_mut(self.word) {
            if *bits != 0 {
                let bit = bits.trailing_zeros() as usize;
                // Clear the lowest set bit.
                *bits &= *bits - 1;
                return Some(self.word * WORD + bit);
            }
            self.word += 1;
        }
        None
    }
}
