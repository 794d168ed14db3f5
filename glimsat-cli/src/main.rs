use std::env;
use std::fs;
use std::io::{self, Read, Write};

use anyhow::Error;
use clap::{values_t, App, AppSettings, Arg};
use env_logger::{fmt, Builder, Target};
use log::{error, info};
use log::{Level, LevelFilter, Record};

use glimsat::config::{SolverConfig, SolverConfigUpdate};
use glimsat::{ProofFormat, Solver};

fn main() {
    let exit_code = match main_with_err() {
        Err(err) => {
            error!("{}", err);
            1
        }
        Ok(exit_code) => exit_code,
    };
    std::process::exit(exit_code);
}

fn init_logging() {
    let format = |buf: &mut fmt::Formatter, record: &Record| {
        if record.level() == Level::Info {
            writeln!(buf, "c {}", record.args())
        } else {
            writeln!(buf, "c {}: {}", record.level(), record.args())
        }
    };

    let mut builder = Builder::new();
    builder
        .target(Target::Stdout)
        .format(format)
        .filter(None, LevelFilter::Info);

    if let Ok(ref env_var) = env::var("GLIMSAT_LOG") {
        builder.parse_filters(env_var);
    }

    builder.init();
}

fn banner() {
    info!("This is glimsat {}", env!("CARGO_PKG_VERSION"));
}

fn print_stats(solver: &Solver) {
    let stats = solver.stats();
    info!("conflicts:    {}", stats.conflicts);
    info!("decisions:    {}", stats.decisions);
    info!("propagations: {}", stats.propagations);
    info!(
        "restarts:     {} ({} blocked)",
        stats.restarts, stats.blocked_restarts
    );
    info!(
        "reductions:   {} ({} clauses deleted)",
        stats.reductions, stats.reduced_clauses
    );
    info!("minimized:    {} literals", stats.minimized_lits);
}

fn main_with_err() -> Result<i32, Error> {
    let matches = App::new("glimsat")
        .version(env!("CARGO_PKG_VERSION"))
        .setting(AppSettings::DisableHelpSubcommand)
        .arg_from_usage("[INPUT] 'The input file to use (stdin if omitted)'")
        .arg_from_usage("[config-file] --config=[FILE] 'Read parameters from configuration file'")
        .arg(
            Arg::from_usage("[config-option] -C --config-option")
                .value_name("OPTION>=<VALUE")
                .help("Specify a single config option, see 'glimsat -C help' for a list of options.")
                .multiple(true)
                .number_of_values(1),
        )
        .arg_from_usage("[proof-file] --proof=[FILE] 'Write a DRAT proof to the specified file'")
        .arg(
            Arg::from_usage(
                "[proof-format] --proof-format=[FORMAT] 'Specify the proof format to use.'",
            )
            .possible_values(&["drat", "binary-drat"])
            .default_value("drat")
            .case_insensitive(true),
        )
        .get_matches();

    if values_t!(matches, "config-option", String)
        .unwrap_or(vec![])
        .iter()
        .any(|option| option == "help")
    {
        print!("{}", SolverConfig::help());
        return Ok(0);
    }

    init_logging();
    banner();

    let mut config_update = SolverConfigUpdate::new();

    if let Some(config_path) = matches.value_of("config-file") {
        let mut config_contents = String::new();
        fs::File::open(config_path)?.read_to_string(&mut config_contents)?;

        config_update.merge(toml::from_str(&config_contents)?);
    }

    for config_option in values_t!(matches, "config-option", String).unwrap_or(vec![]) {
        config_update.merge(toml::from_str(&config_option)?);
    }

    let mut solver = Solver::new();

    solver.config(&config_update)?;

    let stdin = io::stdin();

    let mut locked_stdin;
    let mut opened_file;

    let file = match matches.value_of("INPUT") {
        Some(path) => {
            info!("Reading file '{}'", path);
            opened_file = fs::File::open(path)?;
            &mut opened_file as &mut dyn Read
        }
        None => {
            info!("Reading from stdin");
            locked_stdin = stdin.lock();
            &mut locked_stdin as &mut dyn Read
        }
    };

    if let Some(path) = matches.value_of("proof-file") {
        let proof_format_str = matches
            .value_of("proof-format")
            .unwrap()
            .to_ascii_lowercase();

        let proof_format = match &proof_format_str[..] {
            "drat" => ProofFormat::Drat,
            "binary-drat" => ProofFormat::BinaryDrat,
            _ => unreachable!(),
        };

        info!("Writing {} proof to file '{}'", proof_format_str, path);

        solver.write_proof(fs::File::create(path)?, proof_format);
    }

    solver.add_dimacs_cnf(file)?;

    let result = solver.solve();

    solver.close_proof();
    if let Some(err) = solver.proof_io_error() {
        error!("error writing the proof file: {}", err);
    }

    print_stats(&solver);

    match result {
        Some(true) => {
            println!("s SATISFIABLE");
            print!("v");
            for l in solver.model().unwrap() {
                print!(" {}", l);
            }
            println!(" 0");
            Ok(10)
        }
        Some(false) => {
            println!("s UNSATISFIABLE");
            Ok(20)
        }
        None => {
            println!("s UNKNOWN");
            Ok(0)
        }
    }
}
