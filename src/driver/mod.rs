use std::io;

pub mod file_drive;
pub mod memory_drive;

/// A device made of fixed-size blocks. Reads and writes are whole blocks and
/// a write is either fully visible or not at all.
pub trait DeviceDriver {
    fn get_block_count(&self) -> u64;
    fn read_block(&self, index: u64) -> io::Result<Vec<u8>>;
    fn write_block(&mut self, index: u64, data: &[u8]) -> io::Result<()>;
}
