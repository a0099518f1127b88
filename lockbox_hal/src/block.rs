//! Register block handles.
//!
//! A [`RegisterBlock`] is raw word storage: the FPGA window behind
//! `/dev/mem` or a heap buffer in simulation. A [`RegisterWindow`] owns one
//! block and is the only way the loop models touch it:
//!
//! - offsets are checked (inside the block, word aligned) before any access
//! - every read-modify-write runs under one `parking_lot::Mutex`, so two
//!   callers changing different bits of the same word never lose an update
//! - the block is released when the window is dropped

use crate::regs;
use lockbox_common::consts::WORD_SIZE;
use lockbox_common::error::{LockboxError, LockboxResult};
use parking_lot::Mutex;
use std::fmt;

/// Word-granular storage backing one register block.
///
/// Implementations may assume `offset` is word aligned and inside
/// `0..len()`; [`RegisterWindow`] guarantees both.
pub trait RegisterBlock: Send {
    /// Block size in bytes.
    fn len(&self) -> usize;

    /// True for a zero-sized block.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Load the word at byte `offset`.
    fn read(&self, offset: usize) -> u32;

    /// Store `value` at byte `offset`.
    fn write(&mut self, offset: usize, value: u32);
}

/// Serialized, bounds-checked access to one register block.
pub struct RegisterWindow {
    name: &'static str,
    len: usize,
    block: Mutex<Box<dyn RegisterBlock>>,
}

impl fmt::Debug for RegisterWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterWindow")
            .field("name", &self.name)
            .field("len", &self.len)
            .finish_non_exhaustive()
    }
}

impl RegisterWindow {
    /// Take ownership of `block`.
    pub fn new(name: &'static str, block: impl RegisterBlock + 'static) -> Self {
        let len = block.len();
        Self {
            name,
            len,
            block: Mutex::new(Box::new(block)),
        }
    }

    /// Block name used in logs and errors.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Block size in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True for a zero-sized block.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn check(&self, offset: usize) -> LockboxResult<()> {
        let end = offset.checked_add(WORD_SIZE);
        if offset % WORD_SIZE != 0 || end.is_none_or(|end| end > self.len) {
            return Err(LockboxError::out_of_range(
                "register offset",
                i64::try_from(offset).unwrap_or(i64::MAX),
            ));
        }
        Ok(())
    }

    /// Raw word at `offset`.
    pub fn read_word(&self, offset: usize) -> LockboxResult<u32> {
        self.check(offset)?;
        Ok(self.block.lock().read(offset))
    }

    /// Overwrite the whole word at `offset`.
    pub fn write_word(&self, offset: usize, value: u32) -> LockboxResult<()> {
        self.check(offset)?;
        self.block.lock().write(offset, value);
        Ok(())
    }

    /// Read, transform and write back one word while holding the lock.
    ///
    /// Returns the word as written.
    pub fn modify(&self, offset: usize, f: impl FnOnce(u32) -> u32) -> LockboxResult<u32> {
        self.check(offset)?;
        let mut block = self.block.lock();
        let next = f(block.read(offset));
        block.write(offset, next);
        Ok(next)
    }

    /// Field `mask << shift` of the word at `offset`.
    pub fn get_field(&self, offset: usize, mask: u32, shift: u32) -> LockboxResult<u32> {
        Ok(regs::get_field(self.read_word(offset)?, mask, shift))
    }

    /// Replace field `mask << shift` of the word at `offset` with `value`
    /// (truncated to `mask`).
    pub fn set_field(&self, offset: usize, value: u32, mask: u32, shift: u32) -> LockboxResult<()> {
        self.modify(offset, |word| regs::set_field(word, value, mask, shift))
            .map(|_| ())
    }

    /// Set `bits & mask` in the word at `offset`.
    pub fn set_bits(&self, offset: usize, bits: u32, mask: u32) -> LockboxResult<()> {
        self.modify(offset, |word| regs::set_bits(word, bits, mask))
            .map(|_| ())
    }

    /// Clear `bits & mask` in the word at `offset`.
    pub fn clear_bits(&self, offset: usize, bits: u32, mask: u32) -> LockboxResult<()> {
        self.modify(offset, |word| regs::clear_bits(word, bits, mask))
            .map(|_| ())
    }

    /// True if all of `bits & mask` are set in the word at `offset`.
    pub fn bits_set(&self, offset: usize, bits: u32, mask: u32) -> LockboxResult<bool> {
        Ok(regs::bits_set(self.read_word(offset)?, bits, mask))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimBlock;
    use lockbox_common::error::ErrorKind;

    fn window() -> RegisterWindow {
        RegisterWindow::new("test", SimBlock::new(0x10))
    }

    #[test]
    fn rejects_offsets_outside_block() {
        let w = window();
        for offset in [0x10, 0x0E, 0x02, usize::MAX - 1] {
            let err = w.read_word(offset).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::OutOfRange, "offset {offset:#x}");
        }
        assert!(w.read_word(0x0C).is_ok());
    }

    #[test]
    fn set_field_leaves_neighbours_alone() {
        let w = window();
        w.write_word(0x4, 0xAAAA_AAAA).unwrap();
        w.set_field(0x4, 0x55, 0xFF, 16).unwrap();
        assert_eq!(w.read_word(0x4).unwrap(), 0xAA55_AAAA);
        assert_eq!(w.get_field(0x4, 0xFF, 16).unwrap(), 0x55);
    }

    #[test]
    fn bit_ops_go_through_the_lock() {
        let w = window();
        w.set_bits(0, 0b101, u32::MAX).unwrap();
        assert!(w.bits_set(0, 0b100, u32::MAX).unwrap());
        w.clear_bits(0, 0b100, u32::MAX).unwrap();
        assert_eq!(w.read_word(0).unwrap(), 0b001);
    }

    #[test]
    fn modify_returns_written_word() {
        let w = window();
        assert_eq!(w.modify(0x8, |v| v + 7).unwrap(), 7);
        assert_eq!(w.read_word(0x8).unwrap(), 7);
    }
}
