use std::collections::{HashMap, HashSet};
use std::io;

use crate::consts::BLOCK_SIZE;
use crate::driver::DeviceDriver;

/// A drive kept entirely in memory. Blocks never written read back as zeros
/// and take no space. Blocks can be marked as failing to simulate a bad
/// device.
pub struct MemoryDrive {
    block_count: u64,
    blocks: HashMap<u64, Vec<u8>>,
    failing: HashSet<u64>,
}

impl MemoryDrive {
    pub fn new(block_count: u64) -> MemoryDrive {
        MemoryDrive {
            block_count,
            blocks: HashMap::new(),
            failing: HashSet::new(),
        }
    }

    /// Every later read or write of `index` fails.
    pub fn fail_block(&mut self, index: u64) {
        self.failing.insert(index);
    }

    pub fn heal_block(&mut self, index: u64) {
        self.failing.remove(&index);
    }

    fn check(&self, index: u64) -> io::Result<()> {
        if self.failing.contains(&index) {
            return Err(io::Error::new(io::ErrorKind::Other, format!("block {} is unreadable", index)));
        }
        if index >= self.block_count {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, format!("block {} does not exist", index)));
        }
        Ok(())
    }
}

impl DeviceDriver for MemoryDrive {
    fn get_block_count(&self) -> u64 {
        self.block_count
    }

    fn read_block(&self, index: u64) -> io::Result<Vec<u8>> {
        self.check(index)?;
        Ok(self.blocks.get(&index).cloned().unwrap_or_else(|| vec![0; BLOCK_SIZE]))
    }

    fn write_block(&mut self, index: u64, data: &[u8]) -> io::Result<()> {
        self.check(index)?;
        if data.len() != BLOCK_SIZE {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "partial block write"));
        }
        self.blocks.insert(index, data.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failing_block() {
        let mut drive = MemoryDrive::new(4);
        drive.write_block(2, &vec![1; BLOCK_SIZE]).unwrap();
        drive.fail_block(2);
        assert!(drive.read_block(2).is_err());
        assert!(drive.write_block(2, &vec![2; BLOCK_SIZE]).is_err());
        drive.heal_block(2);
        assert_eq!(drive.read_block(2).unwrap(), vec![1; BLOCK_SIZE]);
    }
}
