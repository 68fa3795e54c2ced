use crate::consts::{BLOCK_SIZE, MAX_BLOCK_COUNT, SUPERBLOCK_INDEX};
use crate::driver::DeviceDriver;
use crate::io::IO;
use crate::util::error::{Error, Result};
use crate::util::serializable::{read_u32, ByteSerializable, KnownSize};

pub const MAGIC: u32 = 0x37363030;

#[derive(Debug, PartialEq)]
pub struct SuperBlock {
    pub magic: u32,
    pub disk_size: u32,
}

impl SuperBlock {
    pub fn new(disk_size: u32) -> SuperBlock {
        SuperBlock { magic: MAGIC, disk_size }
    }

    pub fn read<D: DeviceDriver>(io: &IO<D>) -> Result<SuperBlock> {
        let buffer = io.read_block(SUPERBLOCK_INDEX)?;
        let superblock = SuperBlock::from_bytes(&buffer);

        if superblock.magic != MAGIC {
            return Err(Error::BadImage(format!("unknown magic {:#010x}", superblock.magic)));
        }
        if superblock.disk_size < 3 {
            return Err(Error::BadImage(format!("disk size of {} blocks is too small", superblock.disk_size)));
        }
        if superblock.disk_size > MAX_BLOCK_COUNT {
            return Err(Error::BadImage(format!(
                "disk size of {} blocks does not fit the bitmap",
                superblock.disk_size
            )));
        }
        if superblock.disk_size as u64 > io.get_block_count() {
            return Err(Error::BadImage(format!(
                "disk size of {} blocks is larger than the device ({} blocks)",
                superblock.disk_size,
                io.get_block_count()
            )));
        }

        Ok(superblock)
    }

    pub fn write<D: DeviceDriver>(&self, io: &mut IO<D>) -> Result<()> {
        let mut buffer = self.to_bytes();
        buffer.resize(BLOCK_SIZE, 0);
        io.write_block(SUPERBLOCK_INDEX, &buffer)
    }
}

impl KnownSize for SuperBlock {
    fn size_on_disk() -> usize {
        8
    }
}

impl ByteSerializable for SuperBlock {
    fn to_bytes(&self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(Self::size_on_disk());
        buffer.extend_from_slice(&self.magic.to_le_bytes());
        buffer.extend_from_slice(&self.disk_size.to_le_bytes());
        buffer
    }

    fn from_bytes(bytes: &[u8]) -> Self {
        SuperBlock {
            magic: read_u32(bytes, 0),
            disk_size: read_u32(bytes, 4),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::memory_drive::MemoryDrive;

    #[test]
    fn read_write_superblock() {
        let mut io = IO::new(MemoryDrive::new(64));
        let superblock = SuperBlock::new(64);
        superblock.write(&mut io).unwrap();
        assert_eq!(SuperBlock::read(&io).unwrap(), superblock);
    }

    #[test]
    fn layout() {
        let bytes = SuperBlock::new(400).to_bytes();
        assert_eq!(bytes, vec![0x30, 0x30, 0x36, 0x37, 0x90, 0x01, 0, 0]);
    }

    #[test]
    fn rejects_blank_device() {
        let io = IO::new(MemoryDrive::new(64));
        assert!(matches!(SuperBlock::read(&io), Err(Error::BadImage(_))));
    }

    #[test]
    fn rejects_disk_larger_than_device() {
        let mut io = IO::new(MemoryDrive::new(64));
        SuperBlock::new(128).write(&mut io).unwrap();
        assert!(matches!(SuperBlock::read(&io), Err(Error::BadImage(_))));
    }
}
