use std::{
    fs::create_dir_all,
    path::PathBuf,
    process::ExitCode,
};

use clap::Parser;
use rand::Rng;
use relaycore::{
    dataset::{
        DatasetIdentity,
        generation::{DatasetGenerator, StationMix},
    },
    file::{load_file, write_file},
    units::Length,
};

#[derive(Parser, Debug)]
#[command()]
struct Args {
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Evenly spaced candidates with some jitter, instead of uniform random ones
    #[arg(long)]
    jittered: bool,

    /// Metres between the gateways
    #[arg(long, default_value_t = 1500.0)]
    length: f64,

    #[arg(long, default_value_t = 8)]
    positions: usize,

    #[arg(long, default_value_t = 4)]
    stations: usize,

    #[arg(long, default_value_t = 12)]
    cost_limit: u64,

    /// Seconds
    #[arg(long, default_value_t = 1.0)]
    delay_limit: f64,

    #[arg(long)]
    seed: Option<u64>,

    /// Write this many datasets, with consecutive seeds, into the output directory
    #[arg(long)]
    count: Option<u64>,

    /// Generate from an identity
    #[arg(long)]
    id: Option<PathBuf>,

    /// Generate as an identity
    #[arg(long)]
    asid: bool,

    /// Use JSON instead of rust messagepack
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    let seed: u64 = args.seed.unwrap_or_else(|| rand::rng().random());
    let use_rmp = !args.json;

    let length = Length::from_metres(args.length);
    let generator = if args.jittered {
        DatasetGenerator::JitteredLine {
            length,
            positions: args.positions,
            stations: args.stations,
            jitter: length / (4.0 * (args.positions as f64 + 1.0)),
            mix: StationMix::default(),
            cost_limit: args.cost_limit,
            delay_limit: args.delay_limit,
        }
    } else {
        DatasetGenerator::UniformLine {
            length,
            positions: args.positions,
            stations: args.stations,
            mix: StationMix::default(),
            cost_limit: args.cost_limit,
            delay_limit: args.delay_limit,
        }
    };

    if let Some(id_path) = args.id {
        let identity: DatasetIdentity = match load_file(&id_path) {
            Ok(identity) => identity,
            Err(e) => {
                eprintln!("<Error> {e}");
                return ExitCode::FAILURE;
            }
        };
        let Some(dataset) = identity.create() else {
            eprintln!("<Error> {id_path:?} does not describe a generated dataset");
            return ExitCode::FAILURE;
        };

        let output_file = args.output.unwrap_or("dataset.json".into());
        return match write_file(output_file, &dataset, use_rmp) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("<Error> {e}");
                ExitCode::FAILURE
            }
        };
    }

    let extension = if use_rmp { "rmp" } else { "json" };
    let targets: Vec<(u64, PathBuf)> = match args.count {
        Some(count) => {
            let dir = args.output.unwrap_or("datasets".into());
            if let Err(e) = create_dir_all(&dir) {
                eprintln!("<Error> {e}");
                return ExitCode::FAILURE;
            }
            (seed..seed.saturating_add(count))
                .map(|s| (s, dir.join(format!("line_{s}.{extension}"))))
                .collect()
        }
        None => vec![(seed, args.output.unwrap_or("dataset.json".into()))],
    };

    for (seed, path) in targets {
        let dataset = generator.generate(seed);
        let result = if args.asid {
            write_file(&path, &dataset.identity, use_rmp)
        } else {
            write_file(&path, &dataset, use_rmp)
        };

        if let Err(e) = result {
            eprintln!("<Error> {path:?}: {e}");
            return ExitCode::FAILURE;
        }
    }

    ExitCode::SUCCESS
}
