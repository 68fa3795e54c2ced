pub type ModeBits = u32;

pub const PERMISSIONS_MASK: ModeBits = 0o7777;
pub const TYPE_MASK: ModeBits = 0o170000;
pub const IS_DIR_MASK: ModeBits = 0o040000;
pub const IS_FILE_MASK: ModeBits = 0o100000;

pub trait ModeBitsHelper {
    fn get_permissions(&self) -> u16;
    fn get_type(&self) -> ModeBits;
    fn is_directory(&self) -> bool;
    fn is_file(&self) -> bool;
    fn with_permissions(&self, permissions: ModeBits) -> ModeBits;
}

impl ModeBitsHelper for ModeBits {
    fn get_permissions(&self) -> u16 {
        (self & PERMISSIONS_MASK) as u16
    }

    fn get_type(&self) -> ModeBits {
        self & TYPE_MASK
    }

    fn is_directory(&self) -> bool {
        self.get_type() == IS_DIR_MASK
    }

    fn is_file(&self) -> bool {
        self.get_type() == IS_FILE_MASK
    }

    fn with_permissions(&self, permissions: ModeBits) -> ModeBits {
        self.get_type() | (permissions & PERMISSIONS_MASK)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_bits() {
        let dir: ModeBits = 0o040755;
        let file: ModeBits = 0o100644;
        assert!(dir.is_directory());
        assert!(!dir.is_file());
        assert!(file.is_file());
        assert_eq!(file.get_permissions(), 0o644);
    }

    #[test]
    fn replace_permissions_keeps_type() {
        let file: ModeBits = 0o100644;
        // type bits in the argument must not leak through
        let changed = file.with_permissions(0o040600);
        assert_eq!(changed, 0o100600);
    }
}
