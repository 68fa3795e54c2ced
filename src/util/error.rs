use std::io;
use std::os::raw::c_int;

use thiserror::Error;

type ErrorNum = c_int;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("no such file or directory")]
    NotFound,
    #[error("not a directory")]
    NotADirectory,
    #[error("is a directory")]
    IsADirectory,
    #[error("file exists")]
    AlreadyExists,
    #[error("directory not empty")]
    NotEmpty,
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    #[error("file name too long")]
    NameTooLong,
    #[error("file too large")]
    FileTooLarge,
    #[error("no space left on device")]
    NoSpace,
    #[error("device error: {0}")]
    Device(#[from] io::Error),
    #[error("block {0} is outside of the device")]
    BlockOutOfRange(u64),
    #[error("not a valid image: {0}")]
    BadImage(String),
}

impl Error {
    pub fn errno(&self) -> ErrorNum {
        match self {
            Error::NotFound => libc::ENOENT,
            Error::NotADirectory => libc::ENOTDIR,
            Error::IsADirectory => libc::EISDIR,
            Error::AlreadyExists => libc::EEXIST,
            Error::NotEmpty => libc::ENOTEMPTY,
            Error::InvalidArgument(_) => libc::EINVAL,
            Error::NameTooLong => libc::ENAMETOOLONG,
            Error::FileTooLarge => libc::EFBIG,
            Error::NoSpace => libc::ENOSPC,
            Error::Device(_) | Error::BlockOutOfRange(_) => libc::EIO,
            Error::BadImage(_) => libc::EINVAL,
        }
    }
}
