//! coldap-sync: converge an LDAP directory onto the collaborations of the
//! source API, then exit.

mod config;
mod logging;

use std::path::PathBuf;

use clap::Parser;
use coldap_directory::{DryRunDirectory, LdapDirectory};
use coldap_notify::{LoggingPublisher, NotifyResult, Publisher, UdpPublisher};
use coldap_source::{SourceClient, SourceSnapshot};
use coldap_sync::{Orchestrator, RunReport, SyncOptions, SyncResult};
use tracing::{error, info};

use crate::config::{NotifyTransport, SyncConfig};

#[derive(Debug, Parser)]
#[command(name = "coldap-sync", version, about)]
struct Args {
    /// Compute every change but write nothing and publish nothing.
    #[arg(long)]
    dry_run: bool,

    /// Load variables from this file instead of `.env`.
    #[arg(long, value_name = "PATH")]
    env_file: Option<PathBuf>,
}

fn main() {
    let args = Args::parse();

    match &args.env_file {
        Some(path) => {
            if let Err(e) = dotenvy::from_path(path) {
                eprintln!("Failed to load {}: {e}", path.display());
                std::process::exit(1);
            }
        }
        None => {
            let _ = dotenvy::dotenv();
        }
    }

    let config = SyncConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Configuration error: {e}");
        std::process::exit(1);
    });

    logging::init_logging(&config.log_level, config.log_format);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap_or_else(|e| {
            eprintln!("Runtime error: {e}");
            std::process::exit(1);
        });

    match runtime.block_on(sync(config, args.dry_run)) {
        Ok(report) => {
            info!(changed = report.has_changes(), "Sync complete");
        }
        Err(e) => {
            error!(error_code = e.error_code(), error = %e, "Sync failed");
            std::process::exit(1);
        }
    }
}

async fn sync(config: SyncConfig, dry_run: bool) -> SyncResult<RunReport> {
    info!(
        source = %config.source.url,
        host = %config.host,
        ldap = %config.ldap.url,
        base_dn = %config.base_dn,
        dry_run,
        "Starting sync"
    );

    let client = SourceClient::new(&config.source)?;
    let snapshot = SourceSnapshot::fetch(&client, config.host.clone()).await?;

    let directory = LdapDirectory::connect(config.ldap.clone()).await?;

    let options = SyncOptions::new(config.base_dn.clone(), config.host.clone())
        .with_topic(config.topic.clone())
        .with_group_pruning(config.prune_group_members)
        .with_dry_run(dry_run);

    if dry_run {
        let directory = DryRunDirectory::new(directory);
        let report = Orchestrator::new(&directory, &LoggingPublisher, options)
            .run(&snapshot)
            .await?;
        info!(skipped_writes = directory.skipped(), "Dry run finished");
        return Ok(report);
    }

    let publisher = open_publisher(&config.notify).await?;
    Orchestrator::new(&directory, publisher.as_ref(), options)
        .run(&snapshot)
        .await
}

async fn open_publisher(transport: &NotifyTransport) -> NotifyResult<Box<dyn Publisher>> {
    match transport {
        NotifyTransport::Udp { host, port } => Ok(Box::new(UdpPublisher::connect(host, *port).await?)),
        #[cfg(feature = "kafka")]
        NotifyTransport::Kafka { brokers, topic } => {
            let publisher = coldap_notify::KafkaPublisher::new(brokers, topic.clone())?;
            info!(brokers = %brokers, topic = %topic, "Publishing notifications to Kafka");
            Ok(Box::new(publisher))
        }
        #[cfg(not(feature = "kafka"))]
        NotifyTransport::Kafka { brokers, .. } => Err(coldap_notify::NotifyError::connection_failed(
            brokers,
            "built without the kafka feature",
        )),
    }
}
