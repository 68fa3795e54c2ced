use std::ffi::OsString;
use std::os::unix::ffi::OsStringExt;

use log::{debug, warn};

use crate::consts::{BlockPointer, InodeNumber, BLOCK_SIZE};
use crate::driver::DeviceDriver;
use crate::ops::meta::Attrs;
use crate::ops::{Context, FileSystem};
use crate::structure::directory::{check_name, DirectoryBlock, Slot};
use crate::structure::inode::{self, Inode};
use crate::util::error::{Error, Result};
use crate::util::mode::ModeBits;

#[derive(Debug, Clone, PartialEq)]
pub struct DirectoryEntry {
    pub name: OsString,
    pub attrs: Attrs,
}

/// A directory inode together with its single entry block.
pub(crate) struct Directory {
    pub inum: InodeNumber,
    pub block: DirectoryBlock,
    block_index: BlockPointer,
}

impl Directory {
    pub fn open<D: DeviceDriver>(fs: &FileSystem<D>, inum: InodeNumber) -> Result<Directory> {
        let inode = fs.read_inode(inum)?;
        if !inode.is_directory() {
            return Err(Error::NotADirectory);
        }
        let block_index = inode.pointers[0];
        let block = fs.read_directory_block(block_index)?;
        Ok(Directory { inum, block, block_index })
    }

    pub fn save<D: DeviceDriver>(&self, fs: &mut FileSystem<D>) -> Result<()> {
        fs.write_directory_block(self.block_index, &self.block)
    }

    fn find(&self, name: &[u8]) -> Result<(Slot, InodeNumber)> {
        let slot = self.block.find(name).ok_or(Error::NotFound)?;
        Ok((slot, self.block.get(slot).inode))
    }

    /// Checks that `name` can be added before anything gets allocated.
    fn check_insert(&self, name: &[u8]) -> Result<()> {
        check_name(name)?;
        if self.block.find(name).is_some() {
            return Err(Error::AlreadyExists);
        }
        if !self.block.has_free_slot() {
            return Err(Error::NoSpace);
        }
        Ok(())
    }
}

impl<D: DeviceDriver> FileSystem<D> {
    pub fn list_directory(&self, inum: InodeNumber) -> Result<Vec<DirectoryEntry>> {
        let directory = Directory::open(self, inum)?;
        directory
            .block
            .entries()
            .map(|(_, entry)| {
                let attrs = self.attrs_of(entry.inode)?;
                Ok(DirectoryEntry { name: OsString::from_vec(entry.name().to_vec()), attrs })
            })
            .collect()
    }

    /// Creates an empty regular file. Only the permission bits of `mode` are
    /// used.
    pub fn create_at(&mut self, ctx: &Context, parent: InodeNumber, name: &[u8], mode: ModeBits) -> Result<InodeNumber> {
        let mut directory = Directory::open(self, parent)?;
        directory.check_insert(name)?;

        let inum = self.allocate_block()?;
        let inode = Inode::new_file(mode, ctx.uid, ctx.gid, inode::now());
        self.link_new_inode(&mut directory, name, inum, &inode, None)?;
        Ok(inum)
    }

    pub fn mkdir_at(&mut self, ctx: &Context, parent: InodeNumber, name: &[u8], mode: ModeBits) -> Result<InodeNumber> {
        let mut directory = Directory::open(self, parent)?;
        directory.check_insert(name)?;

        let inum = self.allocate_block()?;
        let block = match self.allocate_block() {
            Ok(block) => block,
            Err(e) => {
                self.free_block(inum)?;
                return Err(e);
            }
        };

        let mut inode = Inode::new_directory(mode, ctx.uid, ctx.gid, inode::now());
        inode.size = BLOCK_SIZE as u32;
        inode.pointers[0] = block;
        self.link_new_inode(&mut directory, name, inum, &inode, Some(block))?;
        Ok(inum)
    }

    /// Writes the new inode (and its empty entry block), then the parent's
    /// entry. On failure the freshly allocated blocks are released.
    fn link_new_inode(
        &mut self,
        directory: &mut Directory,
        name: &[u8],
        inum: InodeNumber,
        inode: &Inode,
        entry_block: Option<BlockPointer>,
    ) -> Result<()> {
        let result = entry_block
            .map_or(Ok(()), |block| self.write_directory_block(block, &DirectoryBlock::empty()))
            .and_then(|_| self.write_inode(inum, inode))
            .and_then(|_| directory.block.insert(name, inum))
            .and_then(|_| directory.save(self));

        if let Err(e) = result {
            for block in entry_block.into_iter().chain([inum]) {
                if let Err(free_error) = self.free_block(block) {
                    warn!("could not release block {}: {}", block, free_error);
                }
            }
            return Err(e);
        }
        debug!("linked inode {} into directory {}", inum, directory.inum);
        Ok(())
    }

    pub fn unlink_at(&mut self, parent: InodeNumber, name: &[u8]) -> Result<()> {
        let mut directory = Directory::open(self, parent)?;
        let (slot, inum) = directory.find(name)?;
        let inode = self.read_inode(inum)?;
        if inode.is_directory() {
            return Err(Error::IsADirectory);
        }

        directory.block.invalidate(slot);
        directory.save(self)?;
        self.release_inode(inum, &inode)
    }

    pub fn rmdir_at(&mut self, parent: InodeNumber, name: &[u8]) -> Result<()> {
        let mut directory = Directory::open(self, parent)?;
        let (slot, inum) = directory.find(name)?;
        let child = Directory::open(self, inum)?;
        if !child.block.is_empty() {
            return Err(Error::NotEmpty);
        }

        let inode = self.read_inode(inum)?;
        directory.block.invalidate(slot);
        directory.save(self)?;
        self.release_inode(inum, &inode)
    }

    pub fn rename_at(&mut self, parent: InodeNumber, name: &[u8], new_parent: InodeNumber, new_name: &[u8]) -> Result<()> {
        if parent != new_parent {
            return Err(Error::InvalidArgument("cannot move between directories"));
        }
        check_name(new_name)?;

        let mut directory = Directory::open(self, parent)?;
        let (slot, _) = directory.find(name)?;
        if directory.block.find(new_name).is_some() {
            return Err(Error::AlreadyExists);
        }

        directory.block.rename(slot, new_name)?;
        directory.save(self)
    }

    pub fn readdir(&self, path: &str) -> Result<Vec<DirectoryEntry>> {
        debug!("readdir {}", path);
        self.list_directory(self.resolve(path)?)
    }

    pub fn create(&mut self, ctx: &Context, path: &str, mode: ModeBits) -> Result<InodeNumber> {
        debug!("create {} {:o}", path, mode);
        let (parent, leaf) = self.resolve_parent(path)?;
        self.create_at(ctx, parent, leaf.as_bytes(), mode)
    }

    pub fn mkdir(&mut self, ctx: &Context, path: &str, mode: ModeBits) -> Result<InodeNumber> {
        debug!("mkdir {} {:o}", path, mode);
        let (parent, leaf) = self.resolve_parent(path)?;
        self.mkdir_at(ctx, parent, leaf.as_bytes(), mode)
    }

    pub fn unlink(&mut self, path: &str) -> Result<()> {
        debug!("unlink {}", path);
        let (parent, leaf) = self.resolve_parent(path)?;
        self.unlink_at(parent, leaf.as_bytes())
    }

    pub fn rmdir(&mut self, path: &str) -> Result<()> {
        debug!("rmdir {}", path);
        let (parent, leaf) = self.resolve_parent(path)?;
        self.rmdir_at(parent, leaf.as_bytes())
    }

    pub fn rename(&mut self, from: &str, to: &str) -> Result<()> {
        debug!("rename {} -> {}", from, to);
        let (parent, name) = self.resolve_parent(from)?;
        let (new_parent, new_name) = self.resolve_parent(to)?;
        self.rename_at(parent, name.as_bytes(), new_parent, new_name.as_bytes())
    }
}
