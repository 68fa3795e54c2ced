pub(crate) mod blockmap;
pub(crate) mod directory;
pub(crate) mod inode;
pub(crate) mod superblock;
