use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use fuser::MountOption;
use log::{error, info};

use inodefs::consts::BLOCK_SIZE;
use inodefs::driver::file_drive::FileDrive;
use inodefs::fuse::FuseDriver;
use inodefs::util::format::pretty_size_from_bytes;
use inodefs::{logging, Context, FileSystem};

#[derive(Parser)]
#[command(name = "inodefs")]
#[command(about = "Create and mount inodefs disk images")]
struct Args {
    /// Log level (error, warn, info, debug, trace); defaults to $INODEFS_LOG or info
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Format a new disk image
    Mkfs {
        image: PathBuf,

        /// Size of the image in 4 KiB blocks
        #[arg(long, default_value_t = 400)]
        blocks: u64,
    },
    /// Serve an image through FUSE until unmounted
    Mount {
        image: PathBuf,
        mountpoint: PathBuf,

        #[arg(long)]
        read_only: bool,

        #[arg(long)]
        allow_other: bool,
    },
}

fn mkfs(image: &Path, blocks: u64) -> Result<(), String> {
    let drive = FileDrive::create(image, blocks).map_err(|e| format!("cannot create {}: {}", image.display(), e))?;
    // SAFETY: getuid and getgid cannot fail.
    let ctx = unsafe { Context::new(libc::getuid(), libc::getgid()) };
    let fs = FileSystem::format(drive, &ctx).map_err(|e| format!("cannot format {}: {}", image.display(), e))?;
    info!(
        "{}: {} usable",
        image.display(),
        pretty_size_from_bytes(fs.statfs("/").map_err(|e| e.to_string())?.total_blocks * BLOCK_SIZE as u64)
    );
    Ok(())
}

fn mount(image: &Path, mountpoint: &Path, read_only: bool, allow_other: bool) -> Result<(), String> {
    let drive = FileDrive::open(image).map_err(|e| format!("cannot open {}: {}", image.display(), e))?;
    let fs = FileSystem::mount(drive).map_err(|e| format!("cannot mount {}: {}", image.display(), e))?;

    let mut options = vec![
        MountOption::FSName("inodefs".to_string()),
        MountOption::DefaultPermissions,
        if read_only { MountOption::RO } else { MountOption::RW },
    ];
    if allow_other {
        options.push(MountOption::AllowOther);
    }

    info!("mounting {} on {}", image.display(), mountpoint.display());
    fuser::mount2(FuseDriver::new(fs), mountpoint, &options).map_err(|e| format!("fuse session failed: {}", e))
}

fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(e) = logging::init(args.log_level.as_deref()) {
        eprintln!("cannot install logger: {}", e);
    }

    let result = match &args.command {
        Command::Mkfs { image, blocks } => mkfs(image, *blocks),
        Command::Mount { image, mountpoint, read_only, allow_other } => {
            mount(image, mountpoint, *read_only, *allow_other)
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            error!("{}", message);
            ExitCode::FAILURE
        }
    }
}
