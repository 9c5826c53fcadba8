use log::{info, LevelFilter};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoggerInitError {
    #[error("An error occured while setting up the logger: {0}")]
    FernInitError(#[from] log::SetLoggerError),
}

/// Installs the global logger. Log lines go to stderr so stdout carries only
/// operator output.
pub fn logger_init(min_level: LevelFilter) -> Result<(), LoggerInitError> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {:5} {}] {}",
                chrono::Local::now().format("%H:%M:%S%.3f"),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(min_level)
        .chain(std::io::stderr())
        .apply()?;

    info!("Logging initialised at {:?}", min_level);

    Ok(())
}
