use std::env;
use std::io::Write;
use std::str::FromStr;

use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};

pub const LOG_ENV: &str = "INODEFS_LOG";

static LOGGER: Logger = Logger;

struct Logger;

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let color_code: u8 = match record.level() {
            Level::Error => 31,
            Level::Warn => 93,
            Level::Info => 34,
            Level::Debug => 32,
            Level::Trace => 90,
        };

        let _ = writeln!(
            std::io::stderr().lock(),
            "\x1b[{color_code}m[{:>5}] {}\x1b[0m",
            record.level(),
            record.args(),
        );
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

/// `requested` wins over `INODEFS_LOG`; anything unparsable falls back to info.
pub fn level_from(requested: Option<&str>, env: Option<&str>) -> LevelFilter {
    requested
        .or(env)
        .and_then(|s| LevelFilter::from_str(s).ok())
        .unwrap_or(LevelFilter::Info)
}

pub fn init(requested: Option<&str>) -> Result<(), SetLoggerError> {
    let env = env::var(LOG_ENV).ok();
    log::set_logger(&LOGGER)?;
    log::set_max_level(level_from(requested, env.as_deref()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use log::LevelFilter;

    use super::level_from;

    #[test]
    fn level_precedence() {
        assert_eq!(level_from(None, None), LevelFilter::Info);
        assert_eq!(level_from(None, Some("trace")), LevelFilter::Trace);
        assert_eq!(level_from(Some("warn"), Some("trace")), LevelFilter::Warn);
        assert_eq!(level_from(Some("loud"), None), LevelFilter::Info);
    }
}
