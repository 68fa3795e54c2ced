mod filesystem;

pub use filesystem::FuseDriver;
