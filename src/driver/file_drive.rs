use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::FileExt;
use std::path::Path;

use crate::consts::BLOCK_SIZE;
use crate::driver::DeviceDriver;

/// A disk image file.
pub struct FileDrive {
    file: File,
    block_count: u64,
}

impl FileDrive {
    /// Creates a new zero-filled image. Fails if the file already exists.
    pub fn create<P: AsRef<Path>>(path: P, block_count: u64) -> io::Result<FileDrive> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)?;
        file.set_len(block_count * BLOCK_SIZE as u64)?;
        Ok(FileDrive { file, block_count })
    }

    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<FileDrive> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let block_count = file.metadata()?.len() / BLOCK_SIZE as u64;
        Ok(FileDrive { file, block_count })
    }
}

impl DeviceDriver for FileDrive {
    fn get_block_count(&self) -> u64 {
        self.block_count
    }

    fn read_block(&self, index: u64) -> io::Result<Vec<u8>> {
        let mut buffer = vec![0; BLOCK_SIZE];
        self.file.read_exact_at(&mut buffer, index * BLOCK_SIZE as u64)?;
        Ok(buffer)
    }

    fn write_block(&mut self, index: u64, data: &[u8]) -> io::Result<()> {
        self.file.write_all_at(data, index * BLOCK_SIZE as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drive.img");
        let mut drive = FileDrive::create(&path, 16).unwrap();
        assert_eq!(drive.get_block_count(), 16);

        let block3 = vec![0x42; BLOCK_SIZE];
        let block15 = vec![0x8; BLOCK_SIZE];
        drive.write_block(3, &block3).unwrap();
        drive.write_block(15, &block15).unwrap();

        assert_eq!(drive.read_block(3).unwrap(), block3);
        assert_eq!(drive.read_block(15).unwrap(), block15);
        assert_eq!(drive.read_block(4).unwrap(), vec![0; BLOCK_SIZE]);
    }

    #[test]
    fn reopen_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drive.img");
        {
            let mut drive = FileDrive::create(&path, 8).unwrap();
            drive.write_block(7, &vec![0x52; BLOCK_SIZE]).unwrap();
        }
        let drive = FileDrive::open(&path).unwrap();
        assert_eq!(drive.get_block_count(), 8);
        assert_eq!(drive.read_block(7).unwrap(), vec![0x52; BLOCK_SIZE]);
    }

    #[test]
    fn create_refuses_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drive.img");
        FileDrive::create(&path, 4).unwrap();
        assert!(FileDrive::create(&path, 4).is_err());
    }
}
