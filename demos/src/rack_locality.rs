use atomic_input::logging::init_logger;
use atomic_input::*;
use itertools::Itertools;
use log::LevelFilter;

const MIB: u64 = 1024 * 1024;

// Three racks of three hosts, blocks replicated three ways: twice on one rack
// and once off-rack.
fn cluster() -> InMemoryFileSystem {
    let placements = vec![
        vec!["/rack-a/a1:9866", "/rack-a/a2:9866", "/rack-b/b1:9866"],
        vec!["/rack-a/a2:9866", "/rack-a/a3:9866", "/rack-c/c1:9866"],
        vec!["/rack-b/b1:9866", "/rack-b/b2:9866", "/rack-a/a1:9866"],
        vec!["/rack-c/c2:9866", "/rack-c/c3:9866", "/rack-b/b3:9866"],
        vec!["/rack-b/b2:9866", "/rack-b/b3:9866", "/rack-c/c1:9866"],
    ];
    let fs = InMemoryFileSystem::new();
    fs.add_placed_file("/logs/2024/01/events.log", 700 * MIB, 128 * MIB, &placements)
        .add_placed_file("/logs/2024/02/events.log", 300 * MIB, 64 * MIB, &placements[2..])
        .add_placed_file("/logs/2024/02/_SUCCESS", 0, 64 * MIB, &[]);
    fs
}

fn main() -> Result<()> {
    init_logger(LevelFilter::Debug, None)?;

    let job = JobConf::new();
    job.set_input_paths(&["/logs/2024/*"]);
    // twice the block size, so every split spans blocks on several racks
    job.set_min_input_split_size(256 * MIB);

    let format = FileInputFormat::new(cluster());
    for split in format.get_splits(&job)? {
        println!(
            "{}  {} MiB @ {} MiB  ->  {}",
            split.path(),
            split.length() / MIB,
            split.start() / MIB,
            split.hosts().iter().join(" > ")
        );
    }
    Ok(())
}
