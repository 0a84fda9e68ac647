use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use rota_core::store::MemoryStore;
use rota_events::EventBus;
use rota_worker::{RotaService, WorkerConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const USAGE: &str = "usage: rota-worker <snapshot.json> <request.json> [--write <out.json>]";

struct Args {
    snapshot: PathBuf,
    request: PathBuf,
    write_to: Option<PathBuf>,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut args = std::env::args().skip(1);
    let (Some(snapshot), Some(request)) = (args.next(), args.next()) else {
        bail!(USAGE);
    };
    let write_to = match (args.next().as_deref(), args.next()) {
        (None, _) => None,
        (Some("--write"), Some(path)) => Some(PathBuf::from(path)),
        _ => bail!(USAGE),
    };
    Ok(Args {
        snapshot: snapshot.into(),
        request: request.into(),
        write_to,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Logs go to stderr so stdout stays valid JSON.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rota_worker=info,rota_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = parse_args()?;
    let config = WorkerConfig::from_env().context("loading worker configuration")?;

    let snapshot = std::fs::read_to_string(&args.snapshot)
        .with_context(|| format!("reading snapshot {}", args.snapshot.display()))?;
    let store: MemoryStore = serde_json::from_str(&snapshot)
        .with_context(|| format!("parsing snapshot {}", args.snapshot.display()))?;

    let raw_request = std::fs::read_to_string(&args.request)
        .with_context(|| format!("reading request {}", args.request.display()))?;
    let request = config
        .generation_request(serde_json::from_str(&raw_request)?)
        .with_context(|| format!("parsing request {}", args.request.display()))?;

    tracing::info!(
        start = %request.start_date,
        end = %request.end_date,
        templates = request.template_ids.len(),
        "Rota worker starting generation",
    );

    let bus = Arc::new(EventBus::new(config.event_capacity));
    let service = RotaService::new(store, config, bus);
    let outcome = service.generate(&request).await?;

    println!("{}", serde_json::to_string_pretty(&outcome)?);

    if let Some(path) = args.write_to {
        let updated = serde_json::to_string_pretty(&service.snapshot().await)?;
        std::fs::write(&path, updated)
            .with_context(|| format!("writing snapshot {}", path.display()))?;
        tracing::info!(path = %path.display(), "Updated snapshot written");
    }
    Ok(())
}
