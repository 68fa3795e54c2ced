use std::io;

use log::{debug, warn};

use crate::consts::{BlockPointer, InodeNumber, BLOCK_SIZE, MAX_FILE_SIZE};
use crate::driver::DeviceDriver;
use crate::ops::FileSystem;
use crate::structure::inode::{self, Inode};
use crate::util::error::{Error, Result};

/// A regular file's inode, loaded for the span of one operation.
pub(crate) struct File {
    inum: InodeNumber,
    inode: Inode,
}

impl File {
    pub fn open<D: DeviceDriver>(fs: &FileSystem<D>, inum: InodeNumber) -> Result<File> {
        let inode = fs.read_inode(inum)?;
        if inode.is_directory() {
            return Err(Error::IsADirectory);
        }
        Ok(File { inum, inode })
    }

    fn pointer(&self, index: usize) -> Result<BlockPointer> {
        match self.inode.pointers.get(index) {
            Some(&pointer) if pointer != 0 => Ok(pointer),
            _ => Err(Error::Device(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("inode {} has no block at position {}", self.inum, index),
            ))),
        }
    }

    pub fn read<D: DeviceDriver>(&self, fs: &FileSystem<D>, offset: u64, length: usize) -> Result<Vec<u8>> {
        let size = self.inode.size as u64;
        if offset >= size {
            return Ok(Vec::new());
        }
        let end = size.min(offset.saturating_add(length as u64));

        let mut data = Vec::with_capacity((end - offset) as usize);
        let mut position = offset;
        while position < end {
            let index = (position / BLOCK_SIZE as u64) as usize;
            let start = (position % BLOCK_SIZE as u64) as usize;
            let count = (BLOCK_SIZE - start).min((end - position) as usize);

            let block = fs.read_data_block(self.pointer(index)?)?;
            data.extend_from_slice(&block[start..start + count]);
            position += count as u64;
        }
        Ok(data)
    }

    /// Writes `data` at `offset`. The offset may not lie past the end of the
    /// file. Blocks allocated here are released again if anything fails.
    pub fn write<D: DeviceDriver>(&mut self, fs: &mut FileSystem<D>, offset: u64, data: &[u8]) -> Result<usize> {
        let size = self.inode.size as u64;
        if offset > size {
            return Err(Error::InvalidArgument("write would leave a hole"));
        }
        if data.is_empty() {
            return Ok(0);
        }
        let end = offset + data.len() as u64;
        if end > MAX_FILE_SIZE {
            return Err(Error::FileTooLarge);
        }

        let fresh = self.grow(fs, Inode::blocks_for_size(end))?;
        let result = self
            .write_blocks(fs, offset, data, &fresh)
            .and_then(|_| {
                let mut inode = self.inode.clone();
                inode.size = inode.size.max(end as u32);
                inode.touch(inode::now());
                fs.write_inode(self.inum, &inode)?;
                Ok(inode)
            });

        match result {
            Ok(inode) => {
                self.inode = inode;
                Ok(data.len())
            }
            Err(e) => {
                self.release(fs, &fresh);
                Err(e)
            }
        }
    }

    /// Makes sure the first `needed` pointers are set, returning the indices
    /// of the ones that had to be allocated.
    fn grow<D: DeviceDriver>(&mut self, fs: &mut FileSystem<D>, needed: usize) -> Result<Vec<usize>> {
        let mut fresh = Vec::new();
        for index in 0..needed {
            if self.inode.pointers[index] != 0 {
                continue;
            }
            match fs.allocate_block() {
                Ok(block) => {
                    self.inode.pointers[index] = block;
                    fresh.push(index);
                }
                Err(e) => {
                    debug!("growing inode {} failed after {} new blocks: {}", self.inum, fresh.len(), e);
                    self.release(fs, &fresh);
                    return Err(e);
                }
            }
        }
        Ok(fresh)
    }

    fn release<D: DeviceDriver>(&mut self, fs: &mut FileSystem<D>, fresh: &[usize]) {
        for &index in fresh {
            let block = self.inode.pointers[index];
            self.inode.pointers[index] = 0;
            if let Err(e) = fs.free_block(block) {
                warn!("could not release block {} of inode {}: {}", block, self.inum, e);
            }
        }
    }

    fn write_blocks<D: DeviceDriver>(
        &self,
        fs: &mut FileSystem<D>,
        offset: u64,
        data: &[u8],
        fresh: &[usize],
    ) -> Result<()> {
        let mut written = 0;
        while written < data.len() {
            let position = offset + written as u64;
            let index = (position / BLOCK_SIZE as u64) as usize;
            let start = (position % BLOCK_SIZE as u64) as usize;
            let count = (BLOCK_SIZE - start).min(data.len() - written);
            let pointer = self.pointer(index)?;

            // new blocks may still hold whatever their last owner left
            let mut block = if count == BLOCK_SIZE || fresh.contains(&index) {
                vec![0; BLOCK_SIZE]
            } else {
                fs.read_data_block(pointer)?
            };
            block[start..start + count].copy_from_slice(&data[written..written + count]);
            fs.write_data_block(pointer, &block)?;
            written += count;
        }
        Ok(())
    }

    /// Only truncation to zero is supported. The inode is cleared on disk
    /// before its blocks go back to the bitmap.
    pub fn truncate<D: DeviceDriver>(&mut self, fs: &mut FileSystem<D>, length: u64) -> Result<()> {
        if length != 0 {
            return Err(Error::InvalidArgument("only truncation to zero is supported"));
        }

        let mut inode = self.inode.clone();
        let released: Vec<BlockPointer> = inode.used_pointers().collect();
        inode.pointers.iter_mut().for_each(|p| *p = 0);
        inode.size = 0;
        inode.touch(inode::now());
        fs.write_inode(self.inum, &inode)?;
        self.inode = inode;

        for block in released {
            fs.free_block(block)?;
        }
        Ok(())
    }
}

impl<D: DeviceDriver> FileSystem<D> {
    pub fn read_file(&self, inum: InodeNumber, offset: u64, length: usize) -> Result<Vec<u8>> {
        File::open(self, inum)?.read(self, offset, length)
    }

    pub fn write_file(&mut self, inum: InodeNumber, offset: u64, data: &[u8]) -> Result<usize> {
        let mut file = File::open(self, inum)?;
        file.write(self, offset, data)
    }

    pub fn truncate_file(&mut self, inum: InodeNumber, length: u64) -> Result<()> {
        let mut file = File::open(self, inum)?;
        file.truncate(self, length)
    }

    pub fn read(&self, path: &str, offset: u64, length: usize) -> Result<Vec<u8>> {
        debug!("read {} at {} ({} bytes)", path, offset, length);
        self.read_file(self.resolve(path)?, offset, length)
    }

    pub fn write(&mut self, path: &str, offset: u64, data: &[u8]) -> Result<usize> {
        debug!("write {} at {} ({} bytes)", path, offset, data.len());
        let inum = self.resolve(path)?;
        self.write_file(inum, offset, data)
    }

    pub fn truncate(&mut self, path: &str, length: u64) -> Result<()> {
        debug!("truncate {} to {}", path, length);
        if length != 0 {
            return Err(Error::InvalidArgument("only truncation to zero is supported"));
        }
        let inum = self.resolve(path)?;
        self.truncate_file(inum, length)
    }
}
