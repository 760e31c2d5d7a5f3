use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::error;

use harvest_indexer::clients::{
    LogNotifier, MetadataSource, Notifier, PurlClient, SearchIndex, SendmailNotifier, SolrClient,
};
use harvest_indexer::config::IndexerConfig;
use harvest_indexer::harvest::Harvester;
use harvest_indexer::logging;
use harvest_indexer::merge::{CatalogMerger, SolrRecordMerger};

#[derive(Parser)]
#[command(name = "harvest_indexer")]
#[command(about = "Digital repository harvest and Solr indexing pipeline")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Harvest a configured collection and index every member object
    Harvest {
        /// Path to the collection config file (TOML)
        #[arg(long)]
        config: PathBuf,
        /// Skip the index commit at the end of the run
        #[arg(long)]
        no_commit: bool,
        /// Index only these druids (comma-separated), overriding the config whitelist
        #[arg(long)]
        druids: Option<String>,
    },
    /// Load a collection config and print the resolved settings
    CheckConfig {
        /// Path to the collection config file (TOML)
        #[arg(long)]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Harvest {
            config,
            no_commit,
            druids,
        } => {
            let mut config = IndexerConfig::load(&config)?;
            logging::init_logging(&config.log.dir, &config.log.name);

            if let Some(list) = druids {
                config.harvest.whitelist = list
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
            }

            println!(
                "🚀 Starting harvest for collection {}",
                config.harvest.collection
            );

            let source: Arc<dyn MetadataSource> = Arc::new(PurlClient::new(
                &config.purl.url,
                Duration::from_secs(config.purl.timeout_seconds),
                config.purl.fetch_retries,
            )?);
            let index: Arc<dyn SearchIndex> = Arc::new(SolrClient::new(&config.solr.url));
            let merger: Option<Arc<dyn CatalogMerger>> = config.catalog.as_ref().map(|catalog| {
                Arc::new(SolrRecordMerger::new(
                    Arc::new(SolrClient::new(&catalog.url)),
                    index.clone(),
                )) as Arc<dyn CatalogMerger>
            });

            let send_notification =
                config.notify.email.is_some() && config.on_production_host();
            let notifier: Arc<dyn Notifier> = match &config.notify.email {
                Some(email) => Arc::new(SendmailNotifier::new(email, &config.notify.from)),
                None => Arc::new(LogNotifier),
            };

            let harvester = Harvester {
                config,
                source,
                index,
                merger,
                notifier,
                send_notification,
                hooks: Vec::new(),
            };

            match harvester.run(no_commit).await {
                Ok(outcome) => {
                    println!("\n📊 Harvest results:\n{}", outcome.summary);
                    if outcome.stats.errored > 0 {
                        println!(
                            "\n⚠️  {} objects failed; see the log for details",
                            outcome.stats.errored
                        );
                    } else {
                        println!("\n✅ Harvest run completed successfully");
                    }
                }
                Err(e) => {
                    error!("Harvest run failed: {}", e);
                    println!("❌ Harvest run failed: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Commands::CheckConfig { config } => {
            let config = IndexerConfig::load(&config)?;
            println!("✅ Config OK");
            println!("   Collection: {}", config.harvest.collection);
            println!("   Workers: {}", config.harvest.workers);
            println!("   Merge policy: {:?}", config.harvest.merge_policy);
            if config.harvest.whitelist.is_empty() {
                println!("   Harvest: full collection");
            } else {
                println!("   Whitelist: {} druids", config.harvest.whitelist.len());
            }
            println!("   Purl: {}", config.purl.url);
            println!("   Solr: {}", config.solr.url);
            match &config.catalog {
                Some(catalog) => println!("   Catalog: {}", catalog.url),
                None => println!("   Catalog: none (standalone indexing only)"),
            }
            println!(
                "   Publication year bounds: {}..={}",
                config.dates.min_pub_year, config.dates.max_pub_year
            );
            match &config.notify.email {
                Some(email) => println!("   Notify: {}", email),
                None => println!("   Notify: log only"),
            }
        }
    }
    Ok(())
}
