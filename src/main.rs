use anyhow::Context;
use dotenv::dotenv;
use tracing::{info, warn};

use grid_discovery::adapters::AdapterTable;
use grid_discovery::config::ConfigManager;
use grid_discovery::core::broker::{Broker, BrokerFactory};
use grid_discovery::core::logging::init_logging_with_config;
use grid_discovery::core::retrieval::{ComputingServiceOptions, ComputingServiceRetriever};
use grid_discovery::domain::entities::JobRequirement;

async fn load_job(path: &str) -> anyhow::Result<JobRequirement> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read job file {}", path))?;
    let job: JobRequirement =
        serde_yaml::from_str(&content).with_context(|| format!("Invalid job file {}", path))?;
    Ok(job)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let mut config_manager = ConfigManager::new();
    config_manager.load().await?;
    let config = config_manager.get().await;

    init_logging_with_config(&config.logging)?;
    info!(
        config_path = ?config_manager.config_path(),
        seeds = config.services.len(),
        "🚀 Starting grid discovery"
    );

    let adapters = AdapterTable::from_settings(&config.adapters)?;
    let retriever = ComputingServiceRetriever::new(
        adapters.registry.clone(),
        adapters.info.clone(),
        config.credentials.clone(),
        ComputingServiceOptions::from(&config.discovery),
    )
    .await;

    retriever.add_endpoints(config.seed_endpoints()).await;
    retriever.wait().await;

    println!("Endpoint statuses:");
    for (endpoint, status) in retriever.all_statuses().await {
        println!("  {:<60} {}", endpoint.to_string(), status);
    }

    let services = retriever.services().await;
    println!("Computing services ({}):", services.len());
    for service in &services {
        println!(
            "  {} [{}] via {}",
            service.id, service.name, service.original_endpoint
        );
    }

    let job_path = match std::env::var("GRID_JOB_FILE") {
        Ok(path) => path,
        Err(_) => {
            info!("No GRID_JOB_FILE set, skipping brokering");
            return Ok(());
        }
    };
    let job = load_job(&job_path).await?;

    let plugin = BrokerFactory::new().create(&config.broker.name, config.broker.argument.as_deref())?;
    let mut broker = Broker::new(plugin).with_reject_targets(config.broker.reject_targets.clone());

    let targets = retriever
        .execution_targets(&config.discovery.requested_submission_interfaces)
        .await;
    let kept = broker.pre_filter_targets(targets, &job)?;
    if kept == 0 {
        warn!(broker = %broker.name(), "No target matches the job");
    }

    println!("Ranked targets ({} broker):", broker.name());
    let mut rank = 1;
    while let Some(target) = broker.get_best_target().await? {
        println!(
            "  {:>3}. {} (free: {:?}, waiting: {:?})",
            rank,
            target.identity(),
            target.share.free_slots,
            target.share.waiting_jobs
        );
        rank += 1;
    }

    Ok(())
}
