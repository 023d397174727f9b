//! Dispatch tracker - command line entry point.
//!
//! Takes one or more TMS screenshot paths, runs the enrichment pipeline,
//! and prints a per-customer email draft for each group.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Local;
use futures::future::try_join_all;

use dispatch_tracker::email::compose_draft;
use dispatch_tracker::extract::ShipmentExtractor;
use dispatch_tracker::geo::GeoResolver;
use dispatch_tracker::pipeline::{group_by_customer, ShipmentProcessor};
use dispatch_tracker::route::cache::RouteCache;
use dispatch_tracker::route::RouteService;
use dispatch_tracker::telemetry::{PipelineObserver, TracingObserver};
use dispatch_tracker::{config, RawShipmentRecord};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    dotenvy::dotenv().ok();

    let images: Vec<String> = std::env::args().skip(1).collect();
    if images.is_empty() {
        anyhow::bail!("usage: dispatch_tracker <screenshot.png>...");
    }

    let observer: Arc<dyn PipelineObserver> = Arc::new(TracingObserver);
    let extractor = ShipmentExtractor::from_env().context("extraction client setup failed")?;
    let geo = GeoResolver::from_env(Arc::clone(&observer)).context("geocoder setup failed")?;
    let cache = Arc::new(RouteCache::with_file(config::cache_path()));
    let routes = RouteService::from_env(cache, Arc::clone(&observer))
        .context("route service setup failed")?;

    // All screenshots extract concurrently; any failure aborts the run.
    let extractions = images.iter().map(|path| {
        let extractor = &extractor;
        async move {
            let bytes =
                std::fs::read(path).with_context(|| format!("failed to read screenshot {path}"))?;
            extractor
                .extract(&bytes)
                .await
                .with_context(|| format!("extraction failed for {path}"))
        }
    });
    let raw: Vec<RawShipmentRecord> = try_join_all(extractions)
        .await?
        .into_iter()
        .flatten()
        .collect();
    let processor = ShipmentProcessor::new(Arc::new(geo), Arc::new(routes));
    let processed = processor.process(raw).await;
    let groups = group_by_customer(processed);

    let today = Local::now().date_naive();
    for group in &groups {
        let draft = compose_draft(group, today);
        println!("Subject: {}", draft.subject);
        println!("{}", draft.body);
        println!("\n{}\n", "-".repeat(60));
    }

    Ok(())
}
