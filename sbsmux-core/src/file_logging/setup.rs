use anyhow::Result;
use log::LevelFilter;
use log4rs::{
    append::file::FileAppender,
    config::{Appender, Config, Root},
    encode::pattern::PatternEncoder,
};
use std::path::Path;

/// Routes the `log` facade to `log_file` at `log_level`.
///
/// Can only succeed once per process; a second call returns an error.
pub fn setup_file_logging(log_file: &Path, log_level: LevelFilter) -> Result<()> {
    if let Some(parent) = log_file.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file_appender = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(
            "{d(%Y-%m-%d %H:%M:%S)} [{l}] {m}{n}",
        )))
        .build(log_file)?;

    let config = Config::builder()
        .appender(Appender::builder().build("run_log", Box::new(file_appender)))
        .build(Root::builder().appender("run_log").build(log_level))?;

    log4rs::init_config(config)?;
    Ok(())
}
