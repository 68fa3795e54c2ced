use log::trace;

use crate::consts::{BlockPointer, BLOCK_SIZE};
use crate::driver::DeviceDriver;
use crate::util::error::{Error, Result};

pub(crate) struct IO<D: DeviceDriver> {
    device: D,
    block_count: u64,
}

impl<D: DeviceDriver> IO<D> {
    pub fn new(device: D) -> IO<D> {
        let block_count = device.get_block_count();
        IO { device, block_count }
    }

    pub fn get_block_count(&self) -> u64 {
        self.block_count
    }

    pub fn into_device(self) -> D {
        self.device
    }

    #[cfg(test)]
    pub(crate) fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub(crate) fn write_block(&mut self, index: BlockPointer, block: &[u8]) -> Result<()> {
        if block.len() != BLOCK_SIZE {
            return Err(Error::InvalidArgument("block size mismatch"));
        }
        self.check_range(index)?;

        trace!("write block {}", index);
        self.device.write_block(index as u64, block)?;
        Ok(())
    }

    pub(crate) fn read_block(&self, index: BlockPointer) -> Result<Vec<u8>> {
        self.check_range(index)?;

        trace!("read block {}", index);
        let block = self.device.read_block(index as u64)?;
        if block.len() != BLOCK_SIZE {
            return Err(Error::InvalidArgument("device returned a short block"));
        }
        Ok(block)
    }

    #[inline]
    fn check_range(&self, index: BlockPointer) -> Result<()> {
        if index as u64 >= self.block_count {
            return Err(Error::BlockOutOfRange(index as u64));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::consts::BLOCK_SIZE;
    use crate::driver::memory_drive::MemoryDrive;
    use crate::util::error::Error;

    #[test]
    fn read_write() {
        let mut io = super::IO::new(MemoryDrive::new(8));

        let block = vec![42; BLOCK_SIZE];
        io.write_block(3, &block).unwrap();
        assert_eq!(io.read_block(3).unwrap(), block);

        let block = vec![0x1; BLOCK_SIZE];
        io.write_block(3, &block).unwrap();
        assert_eq!(io.read_block(3).unwrap(), block);
    }

    #[test]
    fn out_of_range() {
        let mut io = super::IO::new(MemoryDrive::new(8));
        assert!(matches!(io.read_block(8), Err(Error::BlockOutOfRange(8))));
        assert!(matches!(io.write_block(9, &vec![0; BLOCK_SIZE]), Err(Error::BlockOutOfRange(9))));
    }

    #[test]
    fn wrong_length() {
        let mut io = super::IO::new(MemoryDrive::new(8));
        assert!(matches!(io.write_block(2, &vec![0; 512]), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn device_failure_is_reported() {
        let mut drive = MemoryDrive::new(8);
        drive.fail_block(5);
        let io = super::IO::new(drive);
        let error = io.read_block(5).unwrap_err();
        assert_eq!(error.errno(), libc::EIO);
    }
}
