use std::{
    fs::{File, read_dir},
    io::{self, Write},
    path::PathBuf,
};

use clap::Parser;
use rayon::iter::{IndexedParallelIterator, IntoParallelIterator, ParallelIterator};
use relaycore::{
    config::{Method, parse_method},
    dataset::DatasetIdentity,
    file::{PlacementOutput, load_file},
    search::find_placement,
    verification::verify_all,
};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// A file containing a list of dataset identities that will be searched.
    /// This overrides `results`.
    #[arg(long)]
    pack: Option<PathBuf>,

    /// Methods to use if running a pack `--pack`.
    /// Defaults to both methods.
    #[arg(long)]
    methods: Option<Vec<String>>,

    #[arg(long)]
    no_verify: bool,

    /// Results file or directory containing results files
    #[arg(short, long)]
    results: Option<PathBuf>,

    #[arg(short, long)]
    output: Option<PathBuf>,

    #[arg(short, long)]
    verbose: bool,
}

const METHOD_LIST: [Method; 2] = [Method::BruteForce, Method::BranchAndBound];

fn main() {
    let args = Args::parse();

    let no_verify = args.no_verify;
    let verbose = args.verbose;
    let results_path = args.results.unwrap_or("placement_output.json".into());

    let method_list: Vec<Method> = match args.methods {
        Some(list) => list
            .iter()
            .filter_map(|name| match parse_method(name) {
                Ok(method) => Some(method),
                Err(e) => {
                    eprintln!("<Error> {e}");
                    None
                }
            })
            .collect(),
        None => METHOD_LIST.to_vec(),
    };

    if let Some(pack_path) = args.pack {
        let identities = match load_file::<Vec<DatasetIdentity>>(&pack_path) {
            Ok(identities) => identities,
            Err(e) => {
                eprintln!("<Error> {e}");
                return;
            }
        };

        for method in method_list {
            let mut table: Vec<Option<TableEntry>> = Vec::new();
            identities
                .clone()
                .into_par_iter()
                .enumerate()
                .map(|(i, identity)| run_identity(i, identity, method, no_verify, verbose))
                .collect_into_vec(&mut table);

            eprintln!("Finished {method:?}");
            let table: Vec<TableEntry> = table.into_iter().flatten().collect();
            let out_path = args
                .output
                .as_ref()
                .map(|x| x.join(format!("{method:?}.csv")));
            write_table(out_path, &table);
        }
    } else {
        let table: Vec<TableEntry> = load_result_files(results_path)
            .into_iter()
            .map(|x| make_table_entry(no_verify, verbose, x))
            .collect();

        write_table(args.output, &table);
    }
}

fn run_identity(
    index: usize,
    identity: DatasetIdentity,
    method: Method,
    no_verify: bool,
    verbose: bool,
) -> Option<TableEntry> {
    let Some(dataset) = identity.create() else {
        eprintln!("<Warning> pack entry {index} is not a generated dataset");
        return None;
    };

    let prepared = match dataset.prepare() {
        Ok(prepared) => prepared,
        Err(e) => {
            eprintln!("<Error> pack entry {index}: {e}");
            return None;
        }
    };

    let config = prepared.config.with_method(method);
    let outcome = match find_placement(&prepared.problem, &config) {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("<Error> pack entry {index}: {e}");
            return None;
        }
    };

    let output = PlacementOutput::new(&index.to_string(), &dataset, &config, outcome);
    Some(make_table_entry(no_verify, verbose, output))
}

fn write_table(maybe_path: Option<PathBuf>, table: &[TableEntry]) {
    let write = match maybe_path {
        Some(out_path) => match File::create(&out_path) {
            Ok(file) => Box::new(file) as Box<dyn Write>,
            Err(e) => {
                eprintln!("<Error> {out_path:?}: {e}");
                return;
            }
        },
        None => Box::new(io::stdout()),
    };

    let mut writer = csv::Writer::from_writer(write);
    for entry in table {
        if let Err(e) = writer.serialize(entry) {
            eprintln!("<Error> {e}");
            return;
        }
    }
    if let Err(e) = writer.flush() {
        eprintln!("<Error> {e}");
    }
}

fn make_table_entry(no_verify: bool, verbose: bool, results: PlacementOutput) -> TableEntry {
    let PlacementOutput { identity, outcome } = &results;
    let best = outcome.best.as_ref();
    let statistics = &outcome.statistics;

    let entry = TableEntry {
        dataset_name: identity.dataset_name.clone(),
        dataset_identity: serde_json::to_string(&identity.dataset_identity).unwrap_or_default(),
        version: identity.version.clone(),
        method: format!("{:?}", identity.config.method),
        estimation: format!("{:?}", identity.config.estimation),
        parallel: identity.config.parallel,
        place_all_stations: identity.config.place_all_stations,
        status: format!("{:?}", outcome.status),
        termination: format!("{:?}", outcome.termination),
        assignment: best.map(|b| b.assignment.to_string()).unwrap_or_default(),
        noncoverage: best.map(|b| b.noncoverage.metres()),
        noncoverage_ratio: best.map(|b| b.noncoverage_ratio),
        cost: best.map(|b| b.cost),
        delay: best.map(|b| b.delay.seconds()),
        alternatives: outcome.alternatives.len(),
        nodes_explored: statistics.nodes_explored,
        leaves_evaluated: statistics.leaves_evaluated,
        prunings_infeasible: statistics.prunings_infeasible,
        prunings_bound: statistics.prunings_bound,
        solutions_found: statistics.solutions_found,
        time_total: statistics.time_total.as_secs_f64(),
    };

    if verbose {
        printout(&results);
    }

    if !no_verify {
        verify_output(&results);
    }

    entry
}

/// Only generated datasets can be rebuilt from an output, hand written ones are skipped.
fn verify_output(results: &PlacementOutput) {
    let Some(dataset) = results.identity.dataset_identity.create() else {
        return;
    };

    match dataset.prepare() {
        Ok(prepared) => {
            if !verify_all(
                &prepared.problem,
                &results.outcome,
                results.identity.config.place_all_stations,
            ) {
                eprintln!(
                    "<Error> Verification failed for {:#?}",
                    results.identity
                );
            }
        }
        Err(e) => eprintln!("<Error> {}: {e}", results.identity.dataset_name),
    }
}

fn load_result_files(results_path: PathBuf) -> Vec<PlacementOutput> {
    let mut outputs: Vec<PlacementOutput> = Vec::new();

    if results_path.is_file() {
        match load_file(results_path) {
            Ok(loaded) => outputs.push(loaded),
            Err(e) => {
                eprintln!("<Error> {e}");
            }
        }
        return outputs;
    }

    let entries = match read_dir(&results_path) {
        Ok(entries) => entries,
        Err(e) => {
            eprintln!("<Error> {results_path:?}: {e}");
            return outputs;
        }
    };

    for thing in entries {
        let file = match thing {
            Ok(file) => file,
            Err(e) => {
                eprintln!("<Error> {e}");
                continue;
            }
        };

        match load_file(file.path()) {
            Ok(loaded) => outputs.push(loaded),
            Err(e) => {
                eprintln!("<Warning> {e}");
                continue;
            }
        };
    }
    outputs
}

#[derive(Debug, Clone, Serialize)]
struct TableEntry {
    dataset_name: String,
    dataset_identity: String,
    version: String,
    method: String,
    estimation: String,
    parallel: bool,
    place_all_stations: bool,
    status: String,
    termination: String,
    assignment: String,
    noncoverage: Option<f64>,
    noncoverage_ratio: Option<f64>,
    cost: Option<u64>,
    delay: Option<f64>,
    alternatives: usize,

    nodes_explored: u64,
    leaves_evaluated: u64,
    prunings_infeasible: u64,
    prunings_bound: u64,
    solutions_found: u64,
    time_total: f64,
}

fn printout(results: &PlacementOutput) {
    let PlacementOutput { identity, outcome } = results;

    println!();
    println!(
        "{} with {:?} ({:?})",
        identity.dataset_name, identity.config.method, identity.config.estimation
    );
    println!("status: {:?}   version: {}", outcome.status, identity.version);
    match &outcome.best {
        Some(best) => println!(
            "Placement: {}  Non-coverage: {:.3} m ({:.4})  Cost: {}  Delay: {:.6} s",
            best.assignment,
            best.noncoverage.metres(),
            best.noncoverage_ratio,
            best.cost,
            best.delay.seconds(),
        ),
        None => println!("No placement"),
    }
    println!("{}", outcome.statistics);
}
