use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{AppState, router};
use edq_core::constants::DEFAULT_DATA_DIR;
use edq_core::{
    CoreConfig, FileStore, MemoryStore, MockPatientGenerator, PatientStore, QueueService,
    SimulationSettings,
};

/// Main entry point for the EDQ application
///
/// Resolves configuration once, picks the patient store and serves the REST API.
///
/// # Environment Variables
/// - `EDQ_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `EDQ_STORE`: `file` (default) or `memory`
/// - `EDQ_DATA_DIR`: Directory for the file store (default: "queue_data")
/// - `EDQ_SEED`: Optional RNG seed for reproducible runs
/// - `EDQ_POPULATION_FLOOR`, `EDQ_BOOTSTRAP_POPULATION`, `EDQ_UPDATE_INTERVAL_MINUTES`,
///   `EDQ_MAX_PASSES_PER_REQUEST`, `EDQ_GROWTH_PROBABILITY`, `EDQ_ADMISSION_PROBABILITY`,
///   `EDQ_PATIENT_TTL_HOURS`: simulation settings
///
/// # Returns
/// * `Ok(())` - If the server starts and runs successfully
/// * `Err(anyhow::Error)` - If configuration is invalid or the server fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("edq=info".parse()?))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("EDQ_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let data_dir = std::env::var("EDQ_DATA_DIR").unwrap_or_else(|_| DEFAULT_DATA_DIR.into());

    let settings = SimulationSettings::from_env_values(|key| std::env::var(key).ok())?;
    let cfg = Arc::new(CoreConfig::new(PathBuf::from(data_dir), settings)?);

    let store: Arc<dyn PatientStore> = match std::env::var("EDQ_STORE").as_deref() {
        Ok("memory") => Arc::new(MemoryStore::new()),
        Ok("file") | Err(_) => Arc::new(FileStore::new(cfg.data_dir())),
        Ok(other) => anyhow::bail!("EDQ_STORE must be 'file' or 'memory', got {other:?}"),
    };

    let rng = match std::env::var("EDQ_SEED") {
        Ok(seed) => StdRng::seed_from_u64(
            seed.trim()
                .parse()
                .with_context(|| format!("EDQ_SEED={seed:?} is not a u64"))?,
        ),
        Err(_) => StdRng::from_entropy(),
    };

    let generator = Arc::new(MockPatientGenerator::new(cfg.settings().backlog_window));
    let service = Arc::new(QueueService::new(cfg.clone(), store, generator, rng));

    tracing::info!(
        data_dir = %cfg.data_dir().display(),
        interval_minutes = cfg.settings().update_interval.num_minutes(),
        "++ Starting EDQ REST on {}",
        rest_addr
    );

    let app = router(AppState { service });
    let listener = tokio::net::TcpListener::bind(&rest_addr)
        .await
        .with_context(|| format!("failed to bind {rest_addr}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}
