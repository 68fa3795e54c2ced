use std::ffi::OsStr;
use std::os::unix::ffi::OsStrExt;
use std::time::{Duration, SystemTime};

use fuser::{
    FileAttr, FileType, Filesystem, KernelConfig, ReplyAttr, ReplyCreate, ReplyData, ReplyDirectory, ReplyEmpty,
    ReplyEntry, ReplyStatfs, ReplyWrite, Request, TimeOrNow, FUSE_ROOT_ID,
};
use libc::c_int;
use log::{debug, info, warn};

use crate::consts::{InodeNumber, BLOCK_SIZE, ROOT_INODE};
use crate::driver::DeviceDriver;
use crate::ops::{Attrs, Context, FileSystem, InodeKind, UTimes};
use crate::util::error::{Error, Result};

const TTL: Duration = Duration::from_secs(1);

/// Serves a mounted `FileSystem` to the kernel. FUSE numbers its root 1, so
/// that number and the root inode swap places; everything else is passed
/// through.
pub struct FuseDriver<D: DeviceDriver> {
    fs: FileSystem<D>,
}

impl<D: DeviceDriver> FuseDriver<D> {
    pub fn new(fs: FileSystem<D>) -> FuseDriver<D> {
        FuseDriver { fs }
    }

    pub fn into_inner(self) -> FileSystem<D> {
        self.fs
    }

    fn reply_entry(&self, result: Result<InodeNumber>, reply: ReplyEntry) {
        match result.and_then(|inum| self.fs.attrs_of(inum)) {
            Ok(attrs) => reply.entry(&TTL, &to_file_attr(&attrs), 0),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn set_attributes(
        &mut self,
        inum: InodeNumber,
        mode: Option<u32>,
        size: Option<u64>,
        mtime: Option<TimeOrNow>,
    ) -> Result<Attrs> {
        if let Some(mode) = mode {
            self.fs.set_mode(inum, mode)?;
        }
        if let Some(size) = size {
            self.fs.truncate_file(inum, size)?;
        }
        if let Some(mtime) = mtime {
            let modified = match mtime {
                TimeOrNow::SpecificTime(time) => time,
                TimeOrNow::Now => SystemTime::now(),
            };
            self.fs.set_times(inum, &UTimes { accessed: modified, modified })?;
        }
        self.fs.attrs_of(inum)
    }
}

impl<D: DeviceDriver> Filesystem for FuseDriver<D> {
    fn init(&mut self, _req: &Request<'_>, _config: &mut KernelConfig) -> std::result::Result<(), c_int> {
        info!("serving {} blocks", self.fs.disk_size());
        Ok(())
    }

    fn destroy(&mut self) {
        info!("unmounted");
    }

    fn lookup(&mut self, _req: &Request, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let result = to_inum(parent).and_then(|parent| self.fs.lookup(parent, name.as_bytes()));
        self.reply_entry(result, reply);
    }

    fn getattr(&mut self, _req: &Request, ino: u64, reply: ReplyAttr) {
        match to_inum(ino).and_then(|inum| self.fs.attrs_of(inum)) {
            Ok(attrs) => reply.attr(&TTL, &to_file_attr(&attrs)),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn setattr(
        &mut self,
        _req: &Request,
        ino: u64,
        mode: Option<u32>,
        _uid: Option<u32>,
        _gid: Option<u32>,
        size: Option<u64>,
        _atime: Option<TimeOrNow>,
        mtime: Option<TimeOrNow>,
        _ctime: Option<SystemTime>,
        _fh: Option<u64>,
        _crtime: Option<SystemTime>,
        _chgtime: Option<SystemTime>,
        _bkuptime: Option<SystemTime>,
        _flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        debug!("setattr {} mode={:?} size={:?} mtime={:?}", ino, mode, size, mtime);
        match to_inum(ino).and_then(|inum| self.set_attributes(inum, mode, size, mtime)) {
            Ok(attrs) => reply.attr(&TTL, &to_file_attr(&attrs)),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn readdir(&mut self, _req: &Request, ino: u64, _fh: u64, offset: i64, mut reply: ReplyDirectory) {
        let entries = match to_inum(ino).and_then(|inum| self.fs.list_directory(inum)) {
            Ok(entries) => entries,
            Err(e) => {
                reply.error(e.errno());
                return;
            }
        };

        let listing = [(ino, FileType::Directory, OsStr::new(".")), (ino, FileType::Directory, OsStr::new(".."))]
            .into_iter()
            .chain(
                entries
                    .iter()
                    .map(|entry| (to_ino(entry.attrs.inode), to_file_type(entry.attrs.kind), entry.name.as_os_str())),
            );

        for (index, (entry_ino, kind, name)) in listing.enumerate().skip(offset.max(0) as usize) {
            if reply.add(entry_ino, (index + 1) as i64, kind, name) {
                break;
            }
        }
        reply.ok();
    }

    fn mkdir(&mut self, req: &Request, parent: u64, name: &OsStr, mode: u32, umask: u32, reply: ReplyEntry) {
        let ctx = Context::new(req.uid(), req.gid());
        let result = to_inum(parent).and_then(|parent| self.fs.mkdir_at(&ctx, parent, name.as_bytes(), mode & !umask));
        self.reply_entry(result, reply);
    }

    fn create(
        &mut self,
        req: &Request,
        parent: u64,
        name: &OsStr,
        mode: u32,
        umask: u32,
        _flags: i32,
        reply: ReplyCreate,
    ) {
        let ctx = Context::new(req.uid(), req.gid());
        let result = to_inum(parent)
            .and_then(|parent| self.fs.create_at(&ctx, parent, name.as_bytes(), mode & !umask))
            .and_then(|inum| self.fs.attrs_of(inum));
        match result {
            Ok(attrs) => reply.created(&TTL, &to_file_attr(&attrs), 0, 0, 0),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn unlink(&mut self, _req: &Request, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        match to_inum(parent).and_then(|parent| self.fs.unlink_at(parent, name.as_bytes())) {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn rmdir(&mut self, _req: &Request, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        match to_inum(parent).and_then(|parent| self.fs.rmdir_at(parent, name.as_bytes())) {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn rename(
        &mut self,
        _req: &Request,
        parent: u64,
        name: &OsStr,
        newparent: u64,
        newname: &OsStr,
        flags: u32,
        reply: ReplyEmpty,
    ) {
        if flags != 0 {
            warn!("rename with flags {:#x} is not supported", flags);
            reply.error(libc::EINVAL);
            return;
        }
        let result = to_inum(parent).and_then(|parent| {
            let new_parent = to_inum(newparent)?;
            self.fs.rename_at(parent, name.as_bytes(), new_parent, newname.as_bytes())
        });
        match result {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn read(
        &mut self,
        _req: &Request,
        ino: u64,
        _fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        let result = to_inum(ino)
            .and_then(|inum| Ok((inum, to_offset(offset)?)))
            .and_then(|(inum, offset)| self.fs.read_file(inum, offset, size as usize));
        match result {
            Ok(data) => reply.data(&data),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn write(
        &mut self,
        _req: &Request,
        ino: u64,
        _fh: u64,
        offset: i64,
        data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyWrite,
    ) {
        let result = to_inum(ino)
            .and_then(|inum| Ok((inum, to_offset(offset)?)))
            .and_then(|(inum, offset)| self.fs.write_file(inum, offset, data));
        match result {
            Ok(written) => reply.written(written as u32),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn statfs(&mut self, _req: &Request, _ino: u64, reply: ReplyStatfs) {
        match self.fs.statfs("/") {
            Ok(stats) => reply.statfs(
                stats.total_blocks,
                stats.free_blocks,
                stats.free_blocks,
                stats.total_blocks,
                stats.free_blocks,
                stats.block_size,
                stats.name_max,
                stats.block_size,
            ),
            Err(e) => reply.error(e.errno()),
        }
    }
}

fn to_inum(ino: u64) -> Result<InodeNumber> {
    if ino == FUSE_ROOT_ID {
        return Ok(ROOT_INODE);
    }
    match InodeNumber::try_from(ino) {
        Ok(ROOT_INODE) => Ok(FUSE_ROOT_ID as InodeNumber),
        Ok(inum) => Ok(inum),
        Err(_) => Err(Error::NotFound),
    }
}

fn to_ino(inum: InodeNumber) -> u64 {
    match inum {
        ROOT_INODE => FUSE_ROOT_ID,
        inum if inum as u64 == FUSE_ROOT_ID => ROOT_INODE as u64,
        inum => inum as u64,
    }
}

fn to_offset(offset: i64) -> Result<u64> {
    u64::try_from(offset).map_err(|_| Error::InvalidArgument("negative offset"))
}

fn to_file_type(kind: InodeKind) -> FileType {
    match kind {
        InodeKind::File => FileType::RegularFile,
        InodeKind::Directory => FileType::Directory,
    }
}

/// `blocks` counts 512-byte sectors.
fn to_file_attr(attrs: &Attrs) -> FileAttr {
    FileAttr {
        ino: to_ino(attrs.inode),
        size: attrs.size,
        blocks: attrs.blocks * (BLOCK_SIZE as u64 / 512),
        atime: attrs.accessed_at,
        mtime: attrs.modified_at,
        ctime: attrs.modified_at,
        crtime: attrs.created_at,
        kind: to_file_type(attrs.kind),
        perm: attrs.perm,
        nlink: attrs.nlinks,
        uid: attrs.uid,
        gid: attrs.gid,
        rdev: 0,
        blksize: BLOCK_SIZE as u32,
        flags: 0,
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, UNIX_EPOCH};

    use fuser::{FileType, TimeOrNow, FUSE_ROOT_ID};

    use super::{to_file_attr, to_inum, to_ino, to_offset, FuseDriver};
    use crate::consts::ROOT_INODE;
    use crate::ops::tests::{assert_consistent, fixture, ROOT};
    use crate::util::error::Error;

    #[test]
    fn root_numbers_swap() {
        assert_eq!(to_inum(FUSE_ROOT_ID).unwrap(), ROOT_INODE);
        assert_eq!(to_ino(ROOT_INODE), FUSE_ROOT_ID);
        assert_eq!(to_inum(17).unwrap(), 17);
        assert_eq!(to_ino(17), 17);
        assert!(matches!(to_inum(u64::MAX), Err(Error::NotFound)));
    }

    #[test]
    fn negative_offsets_are_invalid() {
        assert_eq!(to_offset(10).unwrap(), 10);
        assert_eq!(to_offset(-1).unwrap_err().errno(), libc::EINVAL);
    }

    #[test]
    fn file_attr_conversion() {
        let fs = fixture();
        let attr = to_file_attr(&fs.getattr("/file.8k+").unwrap());
        assert_eq!(attr.size, 8200);
        assert_eq!(attr.blocks, 24);
        assert_eq!(attr.kind, FileType::RegularFile);
        assert_eq!(attr.blksize, 4096);
        assert_eq!(attr.perm, 0o644);
        assert_eq!(attr.uid, 500);

        let root = to_file_attr(&fs.getattr(ROOT).unwrap());
        assert_eq!(root.ino, FUSE_ROOT_ID);
        assert_eq!(root.kind, FileType::Directory);
    }

    #[test]
    fn setattr_applies_mode_size_and_mtime() {
        let mut driver = FuseDriver::new(fixture());
        let inum = driver.fs.resolve("/file.8k+").unwrap();
        let when = UNIX_EPOCH + Duration::from_secs(5_000);

        let attrs = driver
            .set_attributes(inum, Some(0o100600), Some(0), Some(TimeOrNow::SpecificTime(when)))
            .unwrap();
        assert_eq!(attrs.perm, 0o600);
        assert_eq!(attrs.size, 0);
        assert_eq!(attrs.blocks, 0);
        assert_eq!(attrs.modified_at, when);

        let fs = driver.into_inner();
        assert!(fs.read("/file.8k+", 0, 200).unwrap().is_empty());
        assert_consistent(&fs);
    }

    #[test]
    fn setattr_size_on_directory_fails() {
        let mut driver = FuseDriver::new(fixture());
        let inum = driver.fs.resolve("/dir2").unwrap();
        let error = driver.set_attributes(inum, None, Some(0), None).unwrap_err();
        assert_eq!(error.errno(), libc::EISDIR);
    }
}
