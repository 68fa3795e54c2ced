use log::{debug, info};

use crate::consts::{BlockPointer, InodeNumber, BLOCK_SIZE, FIRST_FREE_BLOCK, MAX_BLOCK_COUNT, ROOT_INODE};
use crate::driver::DeviceDriver;
use crate::io::IO;
use crate::structure::blockmap::BlockMap;
use crate::structure::directory::DirectoryBlock;
use crate::structure::inode::{self, Inode};
use crate::structure::superblock::SuperBlock;
use crate::util::error::{Error, Result};
use crate::util::format::pretty_size_from_bytes;

mod directory;
mod file;
pub mod meta;
mod path;

pub use directory::DirectoryEntry;
pub use meta::{Attrs, InodeKind, StatFs, UTimes};

/// Credentials of whoever issued an operation.
#[derive(Debug, Clone, Copy, Default)]
pub struct Context {
    pub uid: u32,
    pub gid: u32,
}

impl Context {
    pub fn new(uid: u32, gid: u32) -> Context {
        Context { uid, gid }
    }
}

/// A mounted filesystem. Owns the device along with the cached superblock
/// and bitmap; everything else is read from disk per operation.
pub struct FileSystem<D: DeviceDriver> {
    io: IO<D>,
    superblock: SuperBlock,
    blockmap: BlockMap,
}

impl<D: DeviceDriver> FileSystem<D> {
    pub fn mount(device: D) -> Result<FileSystem<D>> {
        let io = IO::new(device);
        let superblock = SuperBlock::read(&io)?;
        let blockmap = BlockMap::read(&io, superblock.disk_size)?;

        let fs = FileSystem { io, superblock, blockmap };
        let root = fs.read_inode(ROOT_INODE)?;
        if !root.is_directory() {
            return Err(Error::BadImage(format!("inode {} is not a directory", ROOT_INODE)));
        }

        info!(
            "mounted {} ({} blocks, {} free)",
            pretty_size_from_bytes(fs.superblock.disk_size as u64 * BLOCK_SIZE as u64),
            fs.superblock.disk_size,
            fs.blockmap.free_count()
        );
        Ok(fs)
    }

    /// Writes an empty filesystem covering the device (up to the most blocks
    /// a single bitmap block can track) and mounts it.
    pub fn format(device: D, ctx: &Context) -> Result<FileSystem<D>> {
        let mut io = IO::new(device);
        let disk_size = io.get_block_count().min(MAX_BLOCK_COUNT as u64) as u32;
        if disk_size < FIRST_FREE_BLOCK + 2 {
            return Err(Error::BadImage(format!("a device of {} blocks is too small", disk_size)));
        }

        let superblock = SuperBlock::new(disk_size);
        superblock.write(&mut io)?;
        let blockmap = BlockMap::new(disk_size);
        blockmap.write(&mut io)?;

        let mut fs = FileSystem { io, superblock, blockmap };
        let root = fs.allocate_block()?;
        let root_block = fs.allocate_block()?;
        debug_assert_eq!(root, ROOT_INODE);

        let mut inode = Inode::new_directory(0o755, ctx.uid, ctx.gid, inode::now());
        inode.size = BLOCK_SIZE as u32;
        inode.pointers[0] = root_block;
        fs.write_directory_block(root_block, &DirectoryBlock::empty())?;
        fs.write_inode(root, &inode)?;

        info!(
            "formatted {} ({} blocks)",
            pretty_size_from_bytes(disk_size as u64 * BLOCK_SIZE as u64),
            disk_size
        );
        Ok(fs)
    }

    pub fn into_device(self) -> D {
        self.io.into_device()
    }

    #[cfg(test)]
    pub(crate) fn device_mut(&mut self) -> &mut D {
        self.io.device_mut()
    }

    pub fn disk_size(&self) -> u32 {
        self.superblock.disk_size
    }

    pub(crate) fn read_inode(&self, inum: InodeNumber) -> Result<Inode> {
        if inum >= self.superblock.disk_size {
            return Err(Error::NotFound);
        }
        Inode::read(&self.io, inum)
    }

    pub(crate) fn write_inode(&mut self, inum: InodeNumber, inode: &Inode) -> Result<()> {
        if inum >= self.superblock.disk_size {
            return Err(Error::NotFound);
        }
        inode.write(&mut self.io, inum)
    }

    pub(crate) fn allocate_block(&mut self) -> Result<BlockPointer> {
        let index = self.blockmap.allocate(&mut self.io)?;
        debug!("allocated block {}", index);
        Ok(index)
    }

    pub(crate) fn free_block(&mut self, index: BlockPointer) -> Result<()> {
        debug!("freeing block {}", index);
        self.blockmap.free(&mut self.io, index)
    }

    /// Frees every data block of `inode` and then the inode block itself.
    pub(crate) fn release_inode(&mut self, inum: InodeNumber, inode: &Inode) -> Result<()> {
        for pointer in inode.used_pointers() {
            self.free_block(pointer)?;
        }
        self.free_block(inum)
    }

    pub(crate) fn read_directory_block(&self, index: BlockPointer) -> Result<DirectoryBlock> {
        Ok(DirectoryBlock::from_block(self.io.read_block(index)?))
    }

    pub(crate) fn write_directory_block(&mut self, index: BlockPointer, block: &DirectoryBlock) -> Result<()> {
        self.io.write_block(index, block.as_block())
    }

    pub(crate) fn read_data_block(&self, index: BlockPointer) -> Result<Vec<u8>> {
        self.io.read_block(index)
    }

    pub(crate) fn write_data_block(&mut self, index: BlockPointer, block: &[u8]) -> Result<()> {
        self.io.write_block(index, block)
    }
}
