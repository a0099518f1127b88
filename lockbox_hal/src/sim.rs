//! Heap-backed register block for tests and off-target runs.

use crate::block::RegisterBlock;
use lockbox_common::consts::WORD_SIZE;

/// Zero-initialized words standing in for a mapped block.
#[derive(Debug, Clone)]
pub struct SimBlock {
    words: Vec<u32>,
}

impl SimBlock {
    /// A block of `len` bytes, rounded up to whole words.
    pub fn new(len: usize) -> Self {
        Self {
            words: vec![0; len.div_ceil(WORD_SIZE)],
        }
    }
}

impl RegisterBlock for SimBlock {
    fn len(&self) -> usize {
        self.words.len() * WORD_SIZE
    }

    fn read(&self, offset: usize) -> u32 {
        self.words[offset / WORD_SIZE]
    }

    fn write(&mut self, offset: usize, value: u32) {
        self.words[offset / WORD_SIZE] = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_zeroed_and_rounds_up() {
        let block = SimBlock::new(0x0D);
        assert_eq!(block.len(), 0x10);
        assert!((0..block.len()).step_by(WORD_SIZE).all(|o| block.read(o) == 0));
    }
}
