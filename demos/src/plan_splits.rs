use atomic_input::logging::{init_logger, level_from_str};
use atomic_input::*;
use itertools::Itertools;

// plan_splits [input paths] [config.toml]
// Input paths are comma separated and may be globs. ATOMIC_* variables
// override the config file, relative paths resolve against the current
// directory unless atomic.working.dir is set.
fn main() -> Result<()> {
    let level = std::env::var("ATOMIC_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    init_logger(level_from_str(&level), None)?;

    let mut args = std::env::args().skip(1);
    let inputs = args.next();
    let job = match args.next() {
        Some(file) => JobConf::from_toml_file(&file)?,
        None => JobConf::new(),
    };
    job.load_from_env()?;
    if let Some(inputs) = inputs {
        job.set_input_paths_str(&inputs);
    }

    log::debug!("Job configuration:\n{}", job.to_debug_string());

    let format = FileInputFormat::new(LocalFileSystem::from_conf(&job));
    let splits = format.get_splits(&job)?;
    for split in &splits {
        println!(
            "{:>5}  {}  [{}]",
            split.get_index(),
            split,
            split.hosts().iter().join(", ")
        );
    }
    log::info!(
        "{} splits over {} files",
        splits.len(),
        job.get_u64(config::INPUT_FILES, 0)
    );
    Ok(())
}
