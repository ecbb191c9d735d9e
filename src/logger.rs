//! Host side logging, `[LEVEL][module] message` lines on stderr.
use std::io::{self, Write};

use log::{LevelFilter, Record, SetLoggerError};

/// Level for `-v` repeated `verbosity` times; warnings and errors are always shown
pub fn level_for(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Logger writing to stderr at the level picked by `verbosity`
pub fn builder(verbosity: u8) -> env_logger::Builder {
    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(level_for(verbosity))
        .format(|buf, record| write_record(buf, record));
    builder
}

pub fn init(verbosity: u8) -> Result<(), SetLoggerError> {
    builder(verbosity).try_init()
}

fn write_record<W: Write>(out: &mut W, record: &Record) -> io::Result<()> {
    writeln!(
        out,
        "[{:5}][{}] {}",
        record.level(),
        record.module_path().unwrap_or_else(|| record.target()),
        record.args()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::Level;

    #[test]
    fn should_format_level_and_module() {
        let mut out = Vec::new();
        write_record(
            &mut out,
            &Record::builder()
                .level(Level::Warn)
                .module_path(Some("plum8::machine"))
                .args(format_args!("ILLOP {:#06x} at {:#06x}", 0x5121, 0x0204))
                .build(),
        )
        .unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "[WARN ][plum8::machine] ILLOP 0x5121 at 0x0204\n"
        );
    }

    #[test]
    fn should_map_verbosity_to_level() {
        assert_eq!(level_for(0), LevelFilter::Warn);
        assert_eq!(level_for(1), LevelFilter::Info);
        assert_eq!(level_for(2), LevelFilter::Debug);
        assert_eq!(level_for(9), LevelFilter::Trace);
    }
}
