//! Linux physical register mapping through a memory device

use crate::block::RegisterBlock;
use lockbox_common::consts::WORD_SIZE;
use lockbox_common::error::{LockboxError, LockboxResult};
use memmap2::{MmapMut, MmapOptions};
use nix::unistd::{SysconfVar, sysconf};
use std::fs::OpenOptions;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use tracing::{debug, info};

const FALLBACK_PAGE_SIZE: usize = 4096;

/// System page size, falling back to 4 KiB if `sysconf` has no answer.
pub fn page_size() -> usize {
    match sysconf(SysconfVar::PAGE_SIZE) {
        Ok(Some(size)) if size > 0 => size as usize,
        _ => FALLBACK_PAGE_SIZE,
    }
}

/// One register block mapped from physical memory.
///
/// The mapping is created in [`DevMemBlock::open`] and released on drop.
pub struct DevMemBlock {
    name: &'static str,
    phys_addr: usize,
    len: usize,
    page_offset: usize,
    map: MmapMut,
}

impl DevMemBlock {
    /// Map `len` bytes at physical address `phys_addr` from `device`.
    ///
    /// The device is opened read/write with `O_SYNC` so accesses are
    /// uncached.
    ///
    /// # Errors
    /// - `OutOfRange` if `phys_addr` is not word aligned
    /// - `ResourceUnavailable` if the device cannot be opened or mapped
    pub fn open(
        device: &Path,
        name: &'static str,
        phys_addr: usize,
        len: usize,
    ) -> LockboxResult<Self> {
        if phys_addr % WORD_SIZE != 0 {
            return Err(LockboxError::out_of_range(
                "physical address",
                i64::try_from(phys_addr).unwrap_or(i64::MAX),
            ));
        }

        let page = page_size();
        let base = phys_addr & !(page - 1);
        let page_offset = phys_addr - base;
        debug!(block = name, page, base = format_args!("{base:#x}"), "mapping register block");

        let unavailable = |source| LockboxError::ResourceUnavailable { block: name, source };

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_SYNC)
            .open(device)
            .map_err(unavailable)?;

        let map = unsafe {
            MmapOptions::new()
                .offset(base as u64)
                .len(page_offset + len)
                .map_mut(&file)
        }
        .map_err(unavailable)?;

        info!(
            block = name,
            device = %device.display(),
            addr = format_args!("{phys_addr:#x}"),
            len,
            "register block mapped"
        );

        Ok(Self {
            name,
            phys_addr,
            len,
            page_offset,
            map,
        })
    }

    /// Physical address of the first register.
    pub fn phys_addr(&self) -> usize {
        self.phys_addr
    }

    fn word_ptr(&self, offset: usize) -> *const u32 {
        let start = self.page_offset + offset;
        self.map[start..start + WORD_SIZE].as_ptr().cast()
    }
}

impl RegisterBlock for DevMemBlock {
    fn len(&self) -> usize {
        self.len
    }

    fn read(&self, offset: usize) -> u32 {
        // Word aligned: the mapping starts on a page and both offsets are multiples of 4.
        unsafe { std::ptr::read_volatile(self.word_ptr(offset)) }
    }

    fn write(&mut self, offset: usize, value: u32) {
        let start = self.page_offset + offset;
        let ptr = self.map[start..start + WORD_SIZE].as_mut_ptr().cast::<u32>();
        unsafe { std::ptr::write_volatile(ptr, value) }
    }
}

impl Drop for DevMemBlock {
    fn drop(&mut self) {
        info!(
            block = self.name,
            addr = format_args!("{:#x}", self.phys_addr),
            "register block unmapped"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lockbox_common::error::ErrorKind;

    #[test]
    fn page_size_is_power_of_two() {
        assert!(page_size().is_power_of_two());
    }

    #[test]
    fn missing_device_is_resource_unavailable() {
        let err = DevMemBlock::open(Path::new("/nonexistent/mem"), "pid", 0x4030_0000, 0x90)
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::ResourceUnavailable);
    }

    #[test]
    fn misaligned_address_is_rejected() {
        let err = DevMemBlock::open(Path::new("/dev/mem"), "pid", 0x4030_0002, 0x90)
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::OutOfRange);
    }

    #[test]
    fn maps_a_regular_file_like_a_device() {
        let file = tempfile::NamedTempFile::new().unwrap();
        file.as_file().set_len(page_size() as u64 * 2).unwrap();

        let mut block = DevMemBlock::open(file.path(), "sim", page_size() + 0x10, 0x20).unwrap();
        block.write(0x4, 0xCAFE_F00D);
        assert_eq!(block.read(0x4), 0xCAFE_F00D);
        assert_eq!(block.len(), 0x20);
    }
}
