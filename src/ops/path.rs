use crate::consts::{InodeNumber, MAX_PATH_COMPONENTS, ROOT_INODE};
use crate::driver::DeviceDriver;
use crate::ops::directory::Directory;
use crate::ops::FileSystem;
use crate::structure::directory::check_name;
use crate::util::error::{Error, Result};

/// Splits an absolute path into its components. Empty components (`//`,
/// trailing `/`) are skipped.
pub(crate) fn split(path: &str) -> Result<Vec<&str>> {
    if !path.starts_with('/') {
        return Err(Error::InvalidArgument("path must be absolute"));
    }

    let components: Vec<&str> = path.split('/').filter(|c| !c.is_empty()).collect();
    if components.len() > MAX_PATH_COMPONENTS {
        return Err(Error::NameTooLong);
    }
    for component in &components {
        check_name(component.as_bytes())?;
    }
    Ok(components)
}

impl<D: DeviceDriver> FileSystem<D> {
    /// Finds `name` in the directory `parent`.
    pub fn lookup(&self, parent: InodeNumber, name: &[u8]) -> Result<InodeNumber> {
        let directory = Directory::open(self, parent)?;
        directory.block.lookup(name).ok_or(Error::NotFound)
    }

    pub fn resolve(&self, path: &str) -> Result<InodeNumber> {
        let components = split(path)?;
        self.walk(&components)
    }

    /// Resolves everything but the last component. The leaf is returned as
    /// given; whether it exists is up to the caller.
    pub fn resolve_parent<'p>(&self, path: &'p str) -> Result<(InodeNumber, &'p str)> {
        let components = split(path)?;
        let (leaf, parents) = components
            .split_last()
            .ok_or(Error::InvalidArgument("the root has no parent"))?;
        let parent = self.walk(parents)?;
        Ok((parent, *leaf))
    }

    fn walk(&self, components: &[&str]) -> Result<InodeNumber> {
        components
            .iter()
            .try_fold(ROOT_INODE, |current, component| self.lookup(current, component.as_bytes()))
    }
}
