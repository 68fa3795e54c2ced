use log::error;

use crate::consts::{BlockPointer, BLOCKMAP_INDEX, BLOCK_SIZE, FIRST_FREE_BLOCK, MAX_BLOCK_COUNT};
use crate::driver::DeviceDriver;
use crate::io::IO;
use crate::util::error::{Error, Result};

/// In-memory mirror of the allocation bitmap in block 1. Every change is
/// written through before the call returns.
pub struct BlockMap {
    block_count: u32,
    data: Vec<u8>,
}

impl BlockMap {
    /// A fresh map with only the superblock and the bitmap itself in use.
    pub fn new(block_count: u32) -> BlockMap {
        debug_assert!(block_count <= MAX_BLOCK_COUNT);
        let mut map = BlockMap { block_count, data: vec![0; BLOCK_SIZE] };
        for i in 0..FIRST_FREE_BLOCK {
            map.mark_used_mem(i);
        }
        map
    }

    pub fn read<D: DeviceDriver>(io: &IO<D>, block_count: u32) -> Result<BlockMap> {
        let data = io.read_block(BLOCKMAP_INDEX)?;
        let mut map = BlockMap { block_count, data };
        // older images may not have the reserved blocks marked
        for i in 0..FIRST_FREE_BLOCK {
            map.mark_used_mem(i);
        }
        Ok(map)
    }

    pub fn write<D: DeviceDriver>(&self, io: &mut IO<D>) -> Result<()> {
        io.write_block(BLOCKMAP_INDEX, &self.data)
    }

    /// First free block at or after block 2.
    pub fn allocate<D: DeviceDriver>(&mut self, io: &mut IO<D>) -> Result<BlockPointer> {
        let index = (FIRST_FREE_BLOCK..self.block_count)
            .find(|&i| self.is_free(i))
            .ok_or(Error::NoSpace)?;

        self.mark_used_mem(index);
        if let Err(e) = self.write(io) {
            self.mark_free_mem(index);
            return Err(e);
        }
        Ok(index)
    }

    /// Releasing a reserved, out of range or already free block is a bug in
    /// the caller. It is logged and otherwise ignored.
    pub fn free<D: DeviceDriver>(&mut self, io: &mut IO<D>, index: BlockPointer) -> Result<()> {
        if index < FIRST_FREE_BLOCK || index >= self.block_count {
            error!("refusing to free block {} (outside 2..{})", index, self.block_count);
            return Ok(());
        }
        if self.is_free(index) {
            error!("block {} is already free", index);
            return Ok(());
        }

        self.mark_free_mem(index);
        if let Err(e) = self.write(io) {
            self.mark_used_mem(index);
            return Err(e);
        }
        Ok(())
    }

    pub fn is_used(&self, index: BlockPointer) -> bool {
        index < self.block_count && !self.is_free(index)
    }

    pub fn free_count(&self) -> u32 {
        (0..self.block_count).filter(|&i| self.is_free(i)).count() as u32
    }

    #[inline]
    fn is_free(&self, index: BlockPointer) -> bool {
        self.data[(index / 8) as usize] & (1 << (index % 8)) == 0
    }

    fn mark_used_mem(&mut self, index: BlockPointer) {
        self.data[(index / 8) as usize] |= 1 << (index % 8);
    }

    fn mark_free_mem(&mut self, index: BlockPointer) {
        self.data[(index / 8) as usize] &= !(1 << (index % 8));
    }
}
