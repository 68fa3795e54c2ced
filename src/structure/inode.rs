use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::consts::{BlockPointer, InodeNumber, BLOCK_SIZE, DIRECT_POINTERS, FIRST_FREE_BLOCK};
use crate::driver::DeviceDriver;
use crate::io::IO;
use crate::util::error::{Error, Result};
use crate::util::mode::{ModeBits, ModeBitsHelper, IS_DIR_MASK, IS_FILE_MASK};
use crate::util::serializable::{read_u16, read_u32, ByteSerializable};

const NULL_POINTER: BlockPointer = 0;
const HEADER_SIZE: usize = 20;

pub type Timestamp = u32;

/// One inode fills one block and is addressed by that block's index.
#[derive(Debug, Clone, PartialEq)]
pub struct Inode {
    pub uid: u16,
    pub gid: u16,
    pub mode: ModeBits,
    pub ctime: Timestamp,
    pub mtime: Timestamp,
    pub size: u32,
    pub pointers: Vec<BlockPointer>,
}

impl Inode {
    pub fn new(mode: ModeBits, uid: u32, gid: u32, now: Timestamp) -> Inode {
        Inode {
            uid: uid as u16,
            gid: gid as u16,
            mode,
            ctime: now,
            mtime: now,
            size: 0,
            pointers: vec![NULL_POINTER; DIRECT_POINTERS],
        }
    }

    pub fn new_file(permissions: ModeBits, uid: u32, gid: u32, now: Timestamp) -> Inode {
        Inode::new(IS_FILE_MASK.with_permissions(permissions), uid, gid, now)
    }

    pub fn new_directory(permissions: ModeBits, uid: u32, gid: u32, now: Timestamp) -> Inode {
        Inode::new(IS_DIR_MASK.with_permissions(permissions), uid, gid, now)
    }

    /// Inode numbers are block numbers; 0 and 1 hold the superblock and bitmap.
    pub fn read<D: DeviceDriver>(io: &IO<D>, inum: InodeNumber) -> Result<Inode> {
        Self::check_number(io, inum)?;
        let block = io.read_block(inum)?;
        Ok(Inode::from_bytes(&block))
    }

    pub fn write<D: DeviceDriver>(&self, io: &mut IO<D>, inum: InodeNumber) -> Result<()> {
        Self::check_number(io, inum)?;
        io.write_block(inum, &self.to_bytes())
    }

    fn check_number<D: DeviceDriver>(io: &IO<D>, inum: InodeNumber) -> Result<()> {
        if inum < FIRST_FREE_BLOCK || inum as u64 >= io.get_block_count() {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    pub fn is_directory(&self) -> bool {
        self.mode.is_directory()
    }

    pub fn is_file(&self) -> bool {
        self.mode.is_file()
    }

    /// Non-zero pointers, in order.
    pub fn used_pointers(&self) -> impl Iterator<Item = BlockPointer> + '_ {
        self.pointers.iter().copied().filter(|&p| p != NULL_POINTER)
    }

    pub fn used_pointer_count(&self) -> usize {
        self.used_pointers().count()
    }

    pub fn blocks_for_size(size: u64) -> usize {
        size.div_ceil(BLOCK_SIZE as u64) as usize
    }

    pub fn touch(&mut self, now: Timestamp) {
        self.mtime = now;
    }
}

pub fn now() -> Timestamp {
    to_timestamp(SystemTime::now())
}

pub fn to_timestamp(time: SystemTime) -> Timestamp {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().min(Timestamp::MAX as u64) as Timestamp)
        .unwrap_or(0)
}

pub fn from_timestamp(timestamp: Timestamp) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(timestamp as u64)
}

impl ByteSerializable for Inode {
    fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::<u8>::with_capacity(BLOCK_SIZE);
        bytes.extend_from_slice(&self.uid.to_le_bytes());
        bytes.extend_from_slice(&self.gid.to_le_bytes());
        bytes.extend_from_slice(&self.mode.to_le_bytes());
        bytes.extend_from_slice(&self.ctime.to_le_bytes());
        bytes.extend_from_slice(&self.mtime.to_le_bytes());
        bytes.extend_from_slice(&self.size.to_le_bytes());
        for pointer in &self.pointers {
            bytes.extend_from_slice(&pointer.to_le_bytes());
        }
        bytes.resize(BLOCK_SIZE, 0);
        bytes
    }

    fn from_bytes(bytes: &[u8]) -> Self {
        let pointers = (0..DIRECT_POINTERS)
            .map(|i| read_u32(bytes, HEADER_SIZE + i * 4))
            .collect();

        Inode {
            uid: read_u16(bytes, 0),
            gid: read_u16(bytes, 2),
            mode: read_u32(bytes, 4),
            ctime: read_u32(bytes, 8),
            mtime: read_u32(bytes, 12),
            size: read_u32(bytes, 16),
            pointers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::memory_drive::MemoryDrive;

    #[test]
    fn test_inode_to_bytes() {
        let mut inode = Inode::new_file(0o644, 500, 500, 1_700_000_000);
        inode.size = 1000;
        inode.pointers[0] = 7;

        let bytes = inode.to_bytes();
        assert_eq!(bytes.len(), BLOCK_SIZE);
        assert_eq!(&bytes[0..4], &[0xf4, 0x01, 0xf4, 0x01]);
        assert_eq!(read_u32(&bytes, 4), 0o100644);
        assert_eq!(read_u32(&bytes, 16), 1000);
        assert_eq!(read_u32(&bytes, 20), 7);
    }

    #[test]
    fn test_inode_from_bytes() {
        let mut inode = Inode::new_directory(0o755, 0, 0, 42);
        inode.size = BLOCK_SIZE as u32;
        inode.pointers[0] = 3;
        inode.pointers[DIRECT_POINTERS - 1] = 9;

        let decoded = Inode::from_bytes(&inode.to_bytes());
        assert_eq!(decoded, inode);
        assert!(decoded.is_directory());
        assert_eq!(decoded.used_pointers().collect::<Vec<_>>(), vec![3, 9]);
    }

    #[test]
    fn read_write_inode() {
        let mut io = IO::new(MemoryDrive::new(16));
        let inode = Inode::new_file(0o600, 1, 2, 3);
        inode.write(&mut io, 5).unwrap();
        assert_eq!(Inode::read(&io, 5).unwrap(), inode);
    }

    #[test]
    fn reserved_numbers_are_not_inodes() {
        let mut io = IO::new(MemoryDrive::new(16));
        assert!(matches!(Inode::read(&io, 0), Err(Error::NotFound)));
        assert!(matches!(Inode::read(&io, 1), Err(Error::NotFound)));
        assert!(matches!(Inode::read(&io, 16), Err(Error::NotFound)));
        let inode = Inode::new_file(0o600, 0, 0, 0);
        assert!(matches!(inode.write(&mut io, 1), Err(Error::NotFound)));
    }

    #[test]
    fn blocks_for_size() {
        assert_eq!(Inode::blocks_for_size(0), 0);
        assert_eq!(Inode::blocks_for_size(1), 1);
        assert_eq!(Inode::blocks_for_size(4096), 1);
        assert_eq!(Inode::blocks_for_size(4097), 2);
    }
}
