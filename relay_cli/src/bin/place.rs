//! The placement cli.

use std::{
    fs::{create_dir_all, read_dir},
    path::{Path, PathBuf},
    process::ExitCode,
    sync::atomic::{AtomicU64, Ordering},
    time::Instant,
};

use clap::Parser;
use rayon::prelude::*;
use relaycore::{
    config::{SearchConfig, parse_estimation, parse_method},
    file::{PlacementOutput, load_datasets, write_file},
    search::find_placement,
    units::Time,
    verification::verify_all,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[arg(short, long)]
    quiet: bool,

    #[arg(short, long)]
    verbose: bool,

    /// Dataset file or directory containing dataset files
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// File name for output or folder to put placement results into
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Overrides the dataset's method (brute-force or branch-and-bound)
    #[arg(long)]
    method: Option<String>,

    /// Overrides the dataset's estimation method (ilp, knapsack or lp)
    #[arg(long)]
    estimation: Option<String>,

    /// Split the branch-and-bound tree across threads
    #[arg(long)]
    parallel: bool,

    #[arg(long)]
    node_limit: Option<u64>,

    /// Seconds
    #[arg(long)]
    time_limit: Option<f64>,

    /// Check every outcome before writing it
    #[arg(long)]
    verify: bool,

    /// Show timing information
    #[arg(long)]
    time: bool,

    #[arg(long)]
    json: bool,
}

struct Overrides {
    method: Option<String>,
    estimation: Option<String>,
    parallel: bool,
    node_limit: Option<u64>,
    time_limit: Option<f64>,
}

impl Overrides {
    fn apply(&self, config: SearchConfig) -> Result<SearchConfig, String> {
        let mut config = config;
        if let Some(method) = &self.method {
            config = config.with_method(parse_method(method).map_err(|e| e.to_string())?);
        }
        if let Some(estimation) = &self.estimation {
            config = config.with_estimation(parse_estimation(estimation).map_err(|e| e.to_string())?);
        }
        if self.parallel {
            config = config.with_parallel(true);
        }
        if self.node_limit.is_some() {
            config.node_limit = self.node_limit;
        }
        if let Some(seconds) = self.time_limit {
            config.time_limit = Some(Time::from_seconds(seconds));
        }
        Ok(config)
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    let level = match (args.quiet, args.verbose) {
        (true, _) => "warn",
        (false, true) => "debug",
        (false, false) => "info",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();

    let input_path = args.input.unwrap_or("dataset.json".into());
    let use_rmp = !args.json;
    let do_timing = args.time;
    let verify = args.verify;

    let overrides = Overrides {
        method: args.method,
        estimation: args.estimation,
        parallel: args.parallel,
        node_limit: args.node_limit,
        time_limit: args.time_limit,
    };

    let files: Vec<PathBuf> = if input_path.is_dir() {
        match read_dir(&input_path) {
            Ok(entries) => entries
                .filter_map(|entry| match entry {
                    Ok(entry) => Some(entry.path()),
                    Err(e) => {
                        error!("{e}");
                        None
                    }
                })
                .filter(|path| path.is_file())
                .collect(),
            Err(e) => {
                error!(path = ?input_path, "{e}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        vec![input_path.clone()]
    };

    let output_path = match args.output {
        Some(path) => path,
        None if !input_path.is_dir() => DEFAULT_OUTPUT.into(),
        None => match next_output_dir() {
            Ok(path) => path,
            Err(e) => {
                error!("could not create output directory: {e}");
                return ExitCode::FAILURE;
            }
        },
    };

    if input_path.is_dir() {
        if let Err(e) = create_dir_all(&output_path) {
            error!(path = ?output_path, "{e}");
            return ExitCode::FAILURE;
        }
    }

    let timer = do_timing.then(Instant::now);
    let count = AtomicU64::new(0);
    let failures = AtomicU64::new(0);

    files.par_iter().for_each(|file| {
        let datasets = match load_datasets(file) {
            Ok(loaded) => loaded,
            Err(e) => {
                warn!(file = ?file, "{e}");
                return;
            }
        };
        let single = datasets.len() == 1 && files.len() == 1;
        let target = OutputTarget::new(&output_path, single, use_rmp);
        if let Err(e) = target.prepare() {
            error!(path = ?output_path, "{e}");
            failures.fetch_add(1, Ordering::Relaxed);
            return;
        }
        let stem = file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        for (name, dataset) in datasets {
            let prepared = match dataset.prepare() {
                Ok(prepared) => prepared,
                Err(e) => {
                    error!(dataset = %name, "{e}");
                    failures.fetch_add(1, Ordering::Relaxed);
                    continue;
                }
            };

            let config = match overrides.apply(prepared.config) {
                Ok(config) => config,
                Err(e) => {
                    error!(dataset = %name, "{e}");
                    failures.fetch_add(1, Ordering::Relaxed);
                    continue;
                }
            };

            info!(dataset = %name, "running placement search");
            count.fetch_add(1, Ordering::Relaxed);

            let outcome = match find_placement(&prepared.problem, &config) {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(dataset = %name, "{e}");
                    failures.fetch_add(1, Ordering::Relaxed);
                    continue;
                }
            };

            match &outcome.best {
                Some(best) => info!(
                    dataset = %name,
                    status = ?outcome.status,
                    assignment = %best.assignment,
                    noncoverage = %best.noncoverage,
                    cost = best.cost,
                    "placement found"
                ),
                None => info!(dataset = %name, status = ?outcome.status, "no placement"),
            }

            if verify && !verify_all(&prepared.problem, &outcome, config.place_all_stations) {
                error!(dataset = %name, "outcome failed verification");
                failures.fetch_add(1, Ordering::Relaxed);
            }

            let out = target.path_for(&stem, &name);
            let output = PlacementOutput::new(&name, &dataset, &config, outcome);
            info!(path = ?out, "writing output");

            if let Err(e) = write_file(&out, &output, use_rmp) {
                error!(path = ?out, "{e}");
                failures.fetch_add(1, Ordering::Relaxed);
            }
        }
    });

    if let Some(timer) = timer {
        let final_count = count.load(Ordering::Relaxed);
        let final_time = timer.elapsed().as_secs_f32();
        println!(
            "Ran {final_count} searches in {:.4}s ({} searches / s)",
            final_time,
            final_count as f32 / final_time
        )
    }

    if failures.load(Ordering::Relaxed) > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn next_output_dir() -> std::io::Result<PathBuf> {
    create_dir_all("outputs")?;
    let count = read_dir("outputs")?.count();
    let out: PathBuf = format!("outputs/{count}").into();
    create_dir_all(&out)?;
    Ok(out)
}

/// Written when a single dataset file is searched without `--output`.
const DEFAULT_OUTPUT: &str = "placement_output.json";

/// Where the outputs of one input file go.
#[derive(Debug, Clone, PartialEq)]
enum OutputTarget {
    /// The one dataset searched is written to this file.
    File(PathBuf),
    /// One file per dataset inside this directory.
    Directory { dir: PathBuf, extension: &'static str },
}

impl OutputTarget {
    fn new(output_path: &Path, single: bool, use_rmp: bool) -> Self {
        if single && !output_path.is_dir() {
            return OutputTarget::File(output_path.to_path_buf());
        }

        // the default file name becomes a directory of the same stem
        let dir = if output_path == Path::new(DEFAULT_OUTPUT) {
            output_path.with_extension("")
        } else {
            output_path.to_path_buf()
        };
        let extension = if use_rmp { "rmp" } else { "json" };
        OutputTarget::Directory { dir, extension }
    }

    fn prepare(&self) -> std::io::Result<()> {
        match self {
            OutputTarget::File(_) => Ok(()),
            OutputTarget::Directory { dir, .. } => create_dir_all(dir),
        }
    }

    /// Datasets named after their file keep one name, keyed datasets are
    /// prefixed with the file stem so equal keys in different files stay apart.
    fn path_for(&self, stem: &str, name: &str) -> PathBuf {
        match self {
            OutputTarget::File(path) => path.clone(),
            OutputTarget::Directory { dir, extension } if stem.is_empty() || stem == name => {
                dir.join(format!("output_{name}.{extension}"))
            }
            OutputTarget::Directory { dir, extension } => {
                dir.join(format!("output_{stem}_{name}.{extension}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_dataset_goes_to_the_file() {
        let target = OutputTarget::new(Path::new("result.json"), true, false);
        assert_eq!(target, OutputTarget::File("result.json".into()));
        assert_eq!(target.path_for("a", "a"), PathBuf::from("result.json"));
    }

    #[test]
    fn keyed_file_gets_a_directory() {
        let target = OutputTarget::new(Path::new(DEFAULT_OUTPUT), false, false);
        assert_eq!(
            target,
            OutputTarget::Directory {
                dir: "placement_output".into(),
                extension: "json"
            }
        );
        assert_eq!(
            target.path_for("multi", "1"),
            PathBuf::from("placement_output/output_multi_1.json")
        );

        let dir = std::env::temp_dir().join(format!("relay-place-{}", std::process::id()));
        let target = OutputTarget::new(&dir, false, true);
        target.prepare().unwrap();
        assert!(dir.is_dir());
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn equal_keys_in_different_files_stay_apart() {
        let target = OutputTarget::new(Path::new("outputs/3"), false, true);
        let a = target.path_for("north", "1");
        let b = target.path_for("south", "1");
        assert_ne!(a, b);
        assert_eq!(target.path_for("line_4", "line_4"), PathBuf::from("outputs/3/output_line_4.rmp"));
    }
}
