use std::fs::{self, File};

pub const LOG_FILE: &str = "trendsketch-current.log";

/// Dependency targets that are only logged from `Warn` up.
const NOISY_TARGETS: [&str; 6] = ["wgpu", "naga", "cosmic_text", "iced_wgpu", "reqwest", "hyper"];

pub fn setup(level: log::LevelFilter) -> Result<(), fern::InitError> {
    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}:[{}:{}] -- {}",
                chrono::Local::now().format("%H:%M:%S%.3f"),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level);

    for target in NOISY_TARGETS {
        dispatch = dispatch.level_for(target, log::LevelFilter::Warn.min(level));
    }

    let dispatch = dispatch.chain(std::io::stdout());

    match log_file() {
        Ok(file) => dispatch.chain(file).apply()?,
        Err(e) => {
            dispatch.apply()?;
            log::warn!("Logging to stdout only: {e}");
        }
    }

    Ok(())
}

fn log_file() -> Result<File, std::io::Error> {
    let dir = data::data_path(None);
    fs::create_dir_all(&dir)?;

    File::create(dir.join(LOG_FILE))
}
