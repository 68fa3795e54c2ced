pub const BLOCK_SIZE: usize = 4096;

pub const SUPERBLOCK_INDEX: BlockPointer = 0;
pub const BLOCKMAP_INDEX: BlockPointer = 1;
pub const FIRST_FREE_BLOCK: BlockPointer = 2;
pub const ROOT_INODE: InodeNumber = 2;

/// The bitmap is a single block, so that's the most blocks a disk can have.
pub const MAX_BLOCK_COUNT: u32 = (BLOCK_SIZE * 8) as u32;

// 20 header bytes in the inode, everything else is pointers
pub const DIRECT_POINTERS: usize = BLOCK_SIZE / 4 - 5;
pub const MAX_FILE_SIZE: u64 = (DIRECT_POINTERS * BLOCK_SIZE) as u64;

pub const DIR_ENTRY_SIZE: usize = 32;
pub const DIR_ENTRIES_PER_BLOCK: usize = BLOCK_SIZE / DIR_ENTRY_SIZE;
pub const FILE_NAME_LENGTH: usize = 27;

pub const MAX_PATH_COMPONENTS: usize = 10;

pub type BlockPointer = u32;
pub type InodeNumber = u32;
