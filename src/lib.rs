pub mod consts;
pub mod driver;
pub mod fuse;
pub(crate) mod io;
pub mod logging;
pub mod ops;
pub(crate) mod structure;
pub mod util;

pub use ops::{Attrs, Context, DirectoryEntry, FileSystem, InodeKind, StatFs, UTimes};
pub use util::error::{Error, Result};
