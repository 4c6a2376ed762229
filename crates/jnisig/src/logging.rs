//! Log output for the command line.

use anyhow::Result;

/// Level for the given `-v` count; `-q` wins over `-v`.
pub fn level_for(verbose: u8, quiet: bool) -> log::LevelFilter {
    if quiet {
        return log::LevelFilter::Warn;
    }
    match verbose {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    }
}

/// Send log records to stderr, timestamped.
pub fn init(level: log::LevelFilter) -> Result<()> {
    fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "{} [{:5}] {}{}",
                chrono::Local::now().format("%H:%M:%S%.3f"),
                record.level(),
                if level == log::LevelFilter::Trace {
                    format!("{}: ", record.target())
                } else {
                    String::new()
                },
                message
            ))
        })
        .level(level)
        .level_for("rustyline", log::LevelFilter::Warn)
        .chain(std::io::stderr())
        .apply()?;
    Ok(())
}
