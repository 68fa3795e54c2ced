use crate::consts::{InodeNumber, BLOCK_SIZE, DIR_ENTRIES_PER_BLOCK, DIR_ENTRY_SIZE, FILE_NAME_LENGTH};
use crate::util::error::{Error, Result};
use crate::util::serializable::{read_u32, ByteSerializable, KnownSize};

const VALID_BIT: u32 = 1;
const NAME_OFFSET: usize = 4;

pub type Slot = usize;

/// One 32-byte record: a valid flag and inode number packed into the first
/// word, then a NUL padded name. The last name byte is always NUL.
#[derive(Debug, Clone, PartialEq)]
pub struct DirEntry {
    pub valid: bool,
    pub inode: InodeNumber,
    name: [u8; DIR_ENTRY_SIZE - NAME_OFFSET],
}

impl DirEntry {
    pub fn new(name: &[u8], inode: InodeNumber) -> Result<DirEntry> {
        let mut entry = DirEntry { valid: true, inode, name: [0; DIR_ENTRY_SIZE - NAME_OFFSET] };
        entry.set_name(name)?;
        Ok(entry)
    }

    pub fn name(&self) -> &[u8] {
        let end = self.name.iter().position(|&b| b == 0).unwrap_or(self.name.len());
        &self.name[..end]
    }

    pub fn set_name(&mut self, name: &[u8]) -> Result<()> {
        check_name(name)?;
        self.name = [0; DIR_ENTRY_SIZE - NAME_OFFSET];
        self.name[..name.len()].copy_from_slice(name);
        Ok(())
    }
}

/// Names must fit the entry and must not contain a separator or NUL.
pub fn check_name(name: &[u8]) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidArgument("empty file name"));
    }
    if name.len() > FILE_NAME_LENGTH {
        return Err(Error::NameTooLong);
    }
    if name.iter().any(|&b| b == b'/' || b == 0) {
        return Err(Error::InvalidArgument("file name contains '/' or NUL"));
    }
    Ok(())
}

impl KnownSize for DirEntry {
    fn size_on_disk() -> usize {
        DIR_ENTRY_SIZE
    }
}

impl ByteSerializable for DirEntry {
    fn to_bytes(&self) -> Vec<u8> {
        let word = (self.inode << 1) | if self.valid { VALID_BIT } else { 0 };
        let mut bytes = Vec::with_capacity(DIR_ENTRY_SIZE);
        bytes.extend_from_slice(&word.to_le_bytes());
        bytes.extend_from_slice(&self.name);
        bytes
    }

    fn from_bytes(bytes: &[u8]) -> Self {
        let word = read_u32(bytes, 0);
        let mut name = [0; DIR_ENTRY_SIZE - NAME_OFFSET];
        name.copy_from_slice(&bytes[NAME_OFFSET..DIR_ENTRY_SIZE]);
        // never trust the image to terminate the name
        name[FILE_NAME_LENGTH] = 0;
        DirEntry { valid: word & VALID_BIT != 0, inode: word >> 1, name }
    }
}

/// The single data block of a directory, seen as 128 entry slots.
pub struct DirectoryBlock {
    data: Vec<u8>,
}

impl DirectoryBlock {
    pub fn empty() -> DirectoryBlock {
        DirectoryBlock { data: vec![0; BLOCK_SIZE] }
    }

    pub fn from_block(data: Vec<u8>) -> DirectoryBlock {
        debug_assert_eq!(data.len(), BLOCK_SIZE);
        DirectoryBlock { data }
    }

    pub fn as_block(&self) -> &[u8] {
        &self.data
    }

    pub fn get(&self, slot: Slot) -> DirEntry {
        let offset = slot * DIR_ENTRY_SIZE;
        DirEntry::from_bytes(&self.data[offset..offset + DIR_ENTRY_SIZE])
    }

    pub fn set(&mut self, slot: Slot, entry: &DirEntry) {
        let offset = slot * DIR_ENTRY_SIZE;
        self.data[offset..offset + DIR_ENTRY_SIZE].copy_from_slice(&entry.to_bytes());
    }

    /// Valid entries with their slots. Order carries no meaning.
    pub fn entries(&self) -> impl Iterator<Item = (Slot, DirEntry)> + '_ {
        (0..DIR_ENTRIES_PER_BLOCK)
            .map(|slot| (slot, self.get(slot)))
            .filter(|(_, entry)| entry.valid)
    }

    pub fn find(&self, name: &[u8]) -> Option<Slot> {
        self.entries().find(|(_, entry)| entry.name() == name).map(|(slot, _)| slot)
    }

    pub fn lookup(&self, name: &[u8]) -> Option<InodeNumber> {
        self.find(name).map(|slot| self.get(slot).inode)
    }

    fn first_free_slot(&self) -> Option<Slot> {
        (0..DIR_ENTRIES_PER_BLOCK).find(|&slot| !self.get(slot).valid)
    }

    pub fn has_free_slot(&self) -> bool {
        self.first_free_slot().is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().next().is_none()
    }

    pub fn insert(&mut self, name: &[u8], inode: InodeNumber) -> Result<Slot> {
        let entry = DirEntry::new(name, inode)?;
        if self.find(name).is_some() {
            return Err(Error::AlreadyExists);
        }
        let slot = self.first_free_slot().ok_or(Error::NoSpace)?;
        self.set(slot, &entry);
        Ok(slot)
    }

    pub fn invalidate(&mut self, slot: Slot) {
        let mut entry = self.get(slot);
        entry.valid = false;
        self.set(slot, &entry);
    }

    pub fn rename(&mut self, slot: Slot, name: &[u8]) -> Result<()> {
        let mut entry = self.get(slot);
        entry.set_name(name)?;
        self.set(slot, &entry);
        Ok(())
    }
}
