//! Switchyard - drives the configured directors over in-memory backends and
//! reports how traffic would be spread.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
    thread,
};

use clap::Parser;
use log::{error, info};
use thiserror::Error;

use switchyard_config::{
    config::Director as DirectorConfig, validator::validate as validate_config,
};
use switchyard_lb::{
    BackendSet, ConfigureError, Context, Director, PolicyConfig, RandomSource, SeededRandom,
    SetError, StaticBackend, ThreadRandom,
};

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Config file
    #[arg(short, long, default_value = "./config/config.yaml")]
    config: String,

    /// Resolves per director
    #[arg(short, long, default_value_t = 1000)]
    requests: usize,

    /// Concurrent resolving threads
    #[arg(short, long, default_value_t = 4)]
    workers: usize,

    /// Only run this director
    #[arg(short, long)]
    director: Option<String>,

    /// Seed for least-connections draws
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Debug, Error)]
enum SetupError {
    #[error(transparent)]
    Policy(#[from] ConfigureError),

    #[error(transparent)]
    Backend(#[from] SetError),
}

#[derive(Default)]
struct Report {
    picks: BTreeMap<String, usize>,
    failures: usize,
}

impl Report {
    fn merge(&mut self, other: Report) {
        for (name, count) in other.picks {
            *self.picks.entry(name).or_insert(0) += count;
        }
        self.failures += other.failures;
    }
}

fn build_director(
    name: &str,
    config: &DirectorConfig,
    seed: Option<u64>,
) -> Result<Director, SetupError> {
    let director = Director::new(name, Arc::new(BackendSet::new()));

    let random: Arc<dyn RandomSource> = match seed {
        Some(seed) => Arc::new(SeededRandom::new(seed)),
        None => Arc::new(ThreadRandom),
    };
    director.configure_with_random(PolicyConfig::from_config(config)?, random)?;

    for backend in &config.backends {
        director.add_backend(Arc::new(StaticBackend::from_config(backend)), backend.weight)?;
    }

    Ok(director)
}

fn simulate(director: &Director, requests: usize, workers: usize) -> Report {
    let workers = workers.max(1);

    thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|worker| {
                // spread the remainder over the first workers
                let share = requests / workers + usize::from(worker < requests % workers);
                scope.spawn(move || {
                    let ctx = Context::new();
                    let mut picks: HashMap<String, usize> = HashMap::new();
                    let mut failures = 0;
                    for _ in 0..share {
                        match director.resolve(&ctx) {
                            Ok(backend) => {
                                *picks.entry(backend.name().to_string()).or_insert(0) += 1
                            }
                            Err(_) => failures += 1,
                        }
                    }
                    Report {
                        picks: picks.into_iter().collect(),
                        failures,
                    }
                })
            })
            .collect();

        let mut report = Report::default();
        for handle in handles {
            match handle.join() {
                Ok(partial) => report.merge(partial),
                Err(_) => error!("{}: worker panicked", director.name()),
            }
        }
        report
    })
}

fn print_report(director: &Director, report: &Report, requests: usize) {
    let ctx = Context::new();
    println!(
        "director {} ({})",
        director.name(),
        director.policy_name().unwrap_or("unconfigured")
    );

    for status in director.list(&ctx) {
        let count = report.picks.get(&status.name).copied().unwrap_or(0);
        let share = if requests == 0 {
            0.0
        } else {
            count as f64 * 100.0 / requests as f64
        };
        println!(
            "  {:<20} weight {:>6.2}  {:<9}  {:>8} picks  {:>6.2}%",
            status.name,
            status.weight,
            if status.healthy { "healthy" } else { "unhealthy" },
            count,
            share
        );
    }
    println!("  failed resolves: {}", report.failures);

    match director.uptime(&ctx) {
        Some(uptime) => println!(
            "  uptime: changed at {:?}, load {:.2}",
            uptime.changed_at, uptime.load
        ),
        None => println!("  uptime: not reported"),
    }
}

fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Read configuration file
    let config = match switchyard_config::loader::read_config(&cli.config) {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("Error loading config: {}", err);
            std::process::exit(1);
        }
    };

    // Initialize the Logger
    if let Err(err) =
        switchyard_utils::logger::init_logger(&config.log.level, config.log.file.as_deref())
    {
        eprintln!("Error initializing logger: {}", err);
        std::process::exit(1);
    }

    // Validate Configurations
    if !validate_config(&config) {
        error!("Configuration validation failed. Exiting...");
        std::process::exit(1);
    }

    if let Some(name) = &cli.director {
        if !config.directors.contains_key(name) {
            error!("Unknown director '{}'", name);
            std::process::exit(1);
        }
    }

    info!("Switchyard is starting");
    for (name, director_config) in &config.directors {
        if cli.director.as_ref().is_some_and(|only| only != name) {
            continue;
        }

        let director = match build_director(name, director_config, cli.seed) {
            Ok(director) => director,
            Err(err) => {
                error!("{}: {}", name, err);
                std::process::exit(1);
            }
        };

        let report = simulate(&director, cli.requests, cli.workers);
        print_report(&director, &report, cli.requests);
        director.teardown();
    }
}
