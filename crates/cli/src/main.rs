use chrono::Utc;
use clap::{Parser, Subcommand};
use edq_core::{
    constants::DEFAULT_DATA_DIR, CoreConfig, FileStore, MockPatientGenerator, QueueService,
    SimulationSettings, SortKey,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "edq")]
#[command(about = "Emergency department queue simulator CLI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the current queue, running an update pass if one is due
    Queue {
        /// Sort key: id, triage_category, arrival_time, queue_position, time_elapsed, status
        #[arg(long, default_value = "arrival_time")]
        sort: String,
    },
    /// Show one patient
    Patient {
        /// Patient id (32 lowercase hex characters)
        id: String,
    },
    /// Force one update pass now
    Advance,
    /// Show category statistics over a generated sample
    Stats,
    /// Delete every patient and the update cursor
    Reset,
}

fn build_service() -> Result<QueueService, Box<dyn std::error::Error>> {
    let data_dir = std::env::var("EDQ_DATA_DIR").unwrap_or_else(|_| DEFAULT_DATA_DIR.into());
    let settings = SimulationSettings::from_env_values(|key| std::env::var(key).ok())?;
    let cfg = Arc::new(CoreConfig::new(PathBuf::from(&data_dir), settings)?);

    let rng = match std::env::var("EDQ_SEED") {
        Ok(seed) => StdRng::seed_from_u64(seed.trim().parse()?),
        Err(_) => StdRng::from_entropy(),
    };
    let generator = Arc::new(MockPatientGenerator::new(cfg.settings().backlog_window));
    let store = Arc::new(FileStore::new(cfg.data_dir()));

    Ok(QueueService::new(cfg, store, generator, rng))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("Use 'edq --help' for commands");
        return Ok(());
    };

    let service = build_service()?;
    let now = Utc::now();

    match command {
        Commands::Queue { sort } => {
            let sort: SortKey = sort.parse()?;
            let snapshot = service.queue(now, sort)?;
            println!(
                "Waiting: {}, longest wait: {} min",
                snapshot.waiting_count, snapshot.longest_wait_minutes
            );
            for patient in &snapshot.patients {
                println!(
                    "#{:<3} cat {} (#{:<2}) {} {:>4} min  {}",
                    patient.queue_position.global,
                    patient.triage_category,
                    patient.queue_position.category,
                    patient.id,
                    patient.time_elapsed(now),
                    patient.phase()
                );
            }
        }
        Commands::Patient { id } => match service.patient(&id, now) {
            Ok(patient) => {
                println!("ID: {}", patient.id);
                println!("Triage category: {}", patient.triage_category);
                println!("Arrived: {}", patient.arrival_time.to_rfc3339());
                println!("Waiting: {} min", patient.time_elapsed(now));
                println!("Phase: {}", patient.phase());
                if let Some(tests) = &patient.status.investigations {
                    for (kind, state) in tests {
                        println!("  {}: {}", kind.as_str(), state.as_str());
                    }
                }
                println!(
                    "Position: {} overall, {} in category",
                    patient.queue_position.global, patient.queue_position.category
                );
            }
            Err(e) => eprintln!("Error looking up patient: {}", e),
        },
        Commands::Advance => {
            let report = service.advance(now)?;
            println!(
                "Advanced {} patients, removed {}, added {} replacements{}; population {}",
                report.advanced,
                report.removed.len(),
                report.replacements,
                if report.grown { " and 1 arrival" } else { "" },
                report.population
            );
        }
        Commands::Stats => {
            let stats = service.stats(now)?;
            for (category, count) in &stats.category_breakdown {
                let average = stats.average_wait_minutes.get(category).copied().unwrap_or(0);
                println!("Category {}: {} patients, average wait {} min", category, count, average);
            }
        }
        Commands::Reset => {
            service.reset()?;
            println!("Queue reset.");
        }
    }

    Ok(())
}
