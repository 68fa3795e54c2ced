use std::time::SystemTime;

use log::debug;

use crate::consts::{InodeNumber, BLOCK_SIZE, FILE_NAME_LENGTH, FIRST_FREE_BLOCK};
use crate::driver::DeviceDriver;
use crate::ops::FileSystem;
use crate::structure::inode::{self, Inode};
use crate::util::error::Result;
use crate::util::mode::{ModeBits, ModeBitsHelper};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InodeKind {
    File,
    Directory,
}

pub type UserId = u32;
pub type GroupId = u32;

/// What `getattr` reports. There are no hard links, so `nlinks` is always 1,
/// and the access time is the modification time.
#[derive(Debug, Clone, PartialEq)]
pub struct Attrs {
    pub inode: InodeNumber,
    pub kind: InodeKind,
    pub perm: u16,
    pub mode: ModeBits,
    pub uid: UserId,
    pub gid: GroupId,
    pub size: u64,
    pub blocks: u64,
    pub nlinks: u32,
    pub modified_at: SystemTime,
    pub accessed_at: SystemTime,
    pub created_at: SystemTime,
}

impl Attrs {
    fn from_inode(inum: InodeNumber, inode: &Inode) -> Attrs {
        let modified_at = inode::from_timestamp(inode.mtime);
        Attrs {
            inode: inum,
            kind: if inode.is_directory() { InodeKind::Directory } else { InodeKind::File },
            perm: inode.mode.get_permissions(),
            mode: inode.mode,
            uid: inode.uid as UserId,
            gid: inode.gid as GroupId,
            size: inode.size as u64,
            blocks: inode.used_pointer_count() as u64,
            nlinks: 1,
            modified_at,
            accessed_at: modified_at,
            created_at: inode::from_timestamp(inode.ctime),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct UTimes {
    pub accessed: SystemTime,
    pub modified: SystemTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatFs {
    pub block_size: u32,
    pub total_blocks: u64,
    pub free_blocks: u64,
    pub name_max: u32,
}

impl<D: DeviceDriver> FileSystem<D> {
    pub fn attrs_of(&self, inum: InodeNumber) -> Result<Attrs> {
        let inode = self.read_inode(inum)?;
        Ok(Attrs::from_inode(inum, &inode))
    }

    /// Replaces the permission bits, keeping the file type.
    pub fn set_mode(&mut self, inum: InodeNumber, mode: ModeBits) -> Result<Attrs> {
        let mut inode = self.read_inode(inum)?;
        inode.mode = inode.mode.with_permissions(mode);
        self.write_inode(inum, &inode)?;
        Ok(Attrs::from_inode(inum, &inode))
    }

    /// Only the modification time is stored; the access time follows it.
    pub fn set_times(&mut self, inum: InodeNumber, times: &UTimes) -> Result<Attrs> {
        let mut inode = self.read_inode(inum)?;
        inode.mtime = inode::to_timestamp(times.modified);
        self.write_inode(inum, &inode)?;
        Ok(Attrs::from_inode(inum, &inode))
    }

    pub fn getattr(&self, path: &str) -> Result<Attrs> {
        debug!("getattr {}", path);
        self.attrs_of(self.resolve(path)?)
    }

    pub fn chmod(&mut self, path: &str, mode: ModeBits) -> Result<()> {
        debug!("chmod {} {:o}", path, mode);
        let inum = self.resolve(path)?;
        self.set_mode(inum, mode).map(|_| ())
    }

    pub fn utime(&mut self, path: &str, times: &UTimes) -> Result<()> {
        debug!("utime {}", path);
        let inum = self.resolve(path)?;
        self.set_times(inum, times).map(|_| ())
    }

    /// The path is not looked at; there is only one filesystem to report on.
    pub fn statfs(&self, _path: &str) -> Result<StatFs> {
        Ok(StatFs {
            block_size: BLOCK_SIZE as u32,
            total_blocks: (self.superblock.disk_size - FIRST_FREE_BLOCK) as u64,
            free_blocks: self.blockmap.free_count() as u64,
            name_max: FILE_NAME_LENGTH as u32,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, UNIX_EPOCH};

    use super::{InodeKind, UTimes};
    use crate::ops::tests::{empty_fs, fixture, ROOT, ROOT_CTX};
    use crate::util::error::Error;

    #[test]
    fn getattr_root() {
        let fs = fixture();
        let attrs = fs.getattr(ROOT).unwrap();
        assert_eq!(attrs.kind, InodeKind::Directory);
        assert_eq!(attrs.size, 4096);
        assert_eq!(attrs.nlinks, 1);
    }

    #[test]
    fn getattr_file() {
        let fs = fixture();
        let attrs = fs.getattr("/file.1k").unwrap();
        assert_eq!(attrs.kind, InodeKind::File);
        assert_eq!(attrs.size, 1000);
        assert_eq!(attrs.blocks, 1);
        assert_eq!(attrs.accessed_at, attrs.modified_at);
        assert_eq!(attrs.mode & 0o170000, 0o100000);
    }

    #[test]
    fn getattr_missing() {
        let fs = fixture();
        assert!(matches!(fs.getattr("/nonexistent"), Err(Error::NotFound)));
        assert!(matches!(fs.getattr("/file.1k/child"), Err(Error::NotADirectory)));
    }

    #[test]
    fn chmod_keeps_type() {
        let mut fs = fixture();
        fs.chmod("/file.1k", 0o600).unwrap();
        let attrs = fs.getattr("/file.1k").unwrap();
        assert_eq!(attrs.perm, 0o600);
        assert_eq!(attrs.kind, InodeKind::File);

        fs.chmod("/dir2", 0o100700).unwrap();
        let attrs = fs.getattr("/dir2").unwrap();
        assert_eq!(attrs.kind, InodeKind::Directory);
        assert_eq!(attrs.perm, 0o700);

        assert!(matches!(fs.chmod("/missing", 0o600), Err(Error::NotFound)));
    }

    #[test]
    fn utime_sets_modification_time() {
        let mut fs = empty_fs(16);
        fs.create(&ROOT_CTX, "/f", 0o644).unwrap();
        let before = fs.getattr("/f").unwrap();

        let when = UNIX_EPOCH + Duration::from_secs(1_000_000);
        fs.utime("/f", &UTimes { accessed: when, modified: when }).unwrap();

        let after = fs.getattr("/f").unwrap();
        assert_eq!(after.modified_at, when);
        assert_eq!(after.accessed_at, when);
        assert_eq!(after.created_at, before.created_at);
        assert!(matches!(fs.utime("/missing", &UTimes { accessed: when, modified: when }), Err(Error::NotFound)));
    }

    #[test]
    fn statfs_counts() {
        let mut fs = empty_fs(400);
        let stats = fs.statfs(ROOT).unwrap();
        assert_eq!(stats.block_size, 4096);
        assert_eq!(stats.total_blocks, 398);
        assert_eq!(stats.free_blocks, 396);
        assert_eq!(stats.name_max, 27);

        fs.mkdir(&ROOT_CTX, "/d", 0o755).unwrap();
        assert_eq!(fs.statfs(ROOT).unwrap().free_blocks, 394);
    }
}
