use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use metrics::{counter, histogram};
use tracing::{info, warn};
use uuid::Uuid;

use crate::clients::{MetadataSource, Notifier, SearchIndex};
use crate::collection::CollectionContext;
use crate::config::IndexerConfig;
use crate::error::Result;
use crate::indexer::{IndexingHook, ObjectIndexer};
use crate::merge::CatalogMerger;
use crate::report::RunReporter;
use crate::stats::RunStats;

/// What a completed run hands back to the caller: the final statistics and
/// the formatted summary that was logged and (maybe) mailed.
#[derive(Debug)]
pub struct RunOutcome {
    pub run_id: Uuid,
    pub stats: RunStats,
    pub summary: String,
}

/// Drives one collection harvest end to end: enumerate druids, fan the
/// object indexer out over a fixed worker pool, index the collection record
/// after the members drain, commit, verify, report.
///
/// Only setup failures (unusable config, unreachable source or index)
/// propagate out of `run`; per-object failures are contained below and
/// surface solely in the statistics.
pub struct Harvester {
    pub config: IndexerConfig,
    pub source: Arc<dyn MetadataSource>,
    pub index: Arc<dyn SearchIndex>,
    pub merger: Option<Arc<dyn CatalogMerger>>,
    pub notifier: Arc<dyn Notifier>,
    pub send_notification: bool,
    pub hooks: Vec<Arc<dyn IndexingHook>>,
}

impl Harvester {
    pub async fn run(&self, no_commit: bool) -> Result<RunOutcome> {
        let run_id = Uuid::new_v4();
        let collection_druid = self.config.harvest.collection.clone();
        let t_run = Instant::now();
        counter!("harvest_runs_total").increment(1);
        info!(run_id = %run_id, collection = %collection_druid, "starting harvest run");

        // Enumerate members: explicit whitelist bypasses the full harvest.
        let whitelisted = !self.config.harvest.whitelist.is_empty();
        let member_druids: Vec<String> = if whitelisted {
            self.config.harvest.whitelist.clone()
        } else {
            self.source.member_druids(&collection_druid).await?
        };
        info!(
            count = member_druids.len(),
            whitelisted, "enumerated member objects"
        );
        histogram!("harvest_objects_per_run").record(member_druids.len() as f64);

        let stats = Arc::new(Mutex::new(RunStats::new()));
        stats.lock().expect("stats lock poisoned").discovered = member_druids.len() + 1;

        let context = Arc::new(CollectionContext::new(self.source.clone()));
        // Resolve the run's own collection up front; item workers then hit
        // the cache, and an unreachable source fails the run before any
        // object work starts.
        let collection_info = context.info(&collection_druid).await?;

        let indexer = Arc::new(ObjectIndexer {
            source: self.source.clone(),
            index: self.index.clone(),
            merger: self.merger.clone(),
            context: context.clone(),
            stats: stats.clone(),
            hooks: self.hooks.clone(),
            purl_base: self.config.purl.url.clone(),
            merge_policy: self.config.harvest.merge_policy,
            bounds: self.config.bounds(),
        });

        // Fixed worker pool over a shared queue; each worker runs one
        // object's whole flow to completion before pulling the next druid.
        let queue: Arc<Mutex<VecDeque<String>>> =
            Arc::new(Mutex::new(member_druids.iter().cloned().collect()));
        let workers = self.config.harvest.workers.max(1);
        let mut handles = Vec::with_capacity(workers);
        for worker_id in 0..workers {
            let queue = queue.clone();
            let indexer = indexer.clone();
            handles.push(tokio::spawn(async move {
                loop {
                    let next = queue.lock().expect("queue lock poisoned").pop_front();
                    match next {
                        Some(druid) => indexer.index_and_record(&druid).await,
                        None => break,
                    }
                }
                tracing::debug!(worker_id, "worker drained queue");
            }));
        }
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "indexing worker panicked");
            }
        }

        // The collection record goes in strictly after the member fan-out
        // so its aggregate facets see every item's contribution.
        indexer.index_and_record(&collection_druid).await;

        if no_commit {
            info!("commit skipped for this run");
        } else {
            let t_commit = Instant::now();
            self.index.commit().await?;
            let commit_secs = t_commit.elapsed().as_secs_f64();
            histogram!("harvest_commit_duration_seconds").record(commit_secs);
            stats.lock().expect("stats lock poisoned").commit_secs = commit_secs;
        }

        let elapsed_secs = t_run.elapsed().as_secs_f64();
        histogram!("harvest_run_duration_seconds").record(elapsed_secs);
        stats.lock().expect("stats lock poisoned").elapsed_secs = elapsed_secs;

        let final_stats = stats.lock().expect("stats lock poisoned").clone();
        counter!("harvest_objects_errored_total").increment(final_stats.errored as u64);

        let reporter = RunReporter {
            notifier: self.notifier.clone(),
            send_notification: self.send_notification,
        };
        let summary = reporter
            .report(
                run_id,
                &collection_info,
                whitelisted,
                &final_stats,
                self.index.as_ref(),
            )
            .await;

        Ok(RunOutcome {
            run_id,
            stats: final_stats,
            summary,
        })
    }
}
