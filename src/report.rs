use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::clients::{Notifier, SearchIndex};
use crate::collection::CollectionInfo;
use crate::stats::RunStats;

/// Counts read back from the index after the run, for the summary's
/// verification line.
#[derive(Debug, Clone, Copy, Default)]
pub struct VerifiedCounts {
    pub member_docs: u64,
    pub collection_record_found: bool,
}

impl VerifiedCounts {
    pub fn total(&self) -> u64 {
        self.member_docs + self.collection_record_found as u64
    }
}

/// Turns run statistics into the end-of-run log summary and, on production
/// hosts, an email notification. Reporting never fails a run: verification
/// queries and notification delivery both degrade to logged warnings.
pub struct RunReporter {
    pub notifier: Arc<dyn Notifier>,
    pub send_notification: bool,
}

impl RunReporter {
    pub async fn report(
        &self,
        run_id: Uuid,
        collection: &CollectionInfo,
        whitelisted: bool,
        stats: &RunStats,
        index: &dyn SearchIndex,
    ) -> String {
        let verified = self.verify(collection, index).await;
        let summary = self.summary_text(run_id, collection, whitelisted, stats, verified);

        info!("harvest run summary\n{}", summary);

        if self.send_notification {
            let subject = format!(
                "Harvest of {} complete: {} indexed, {} errors",
                collection.title, stats.indexed, stats.errored
            );
            if let Err(e) = self.notifier.notify(&subject, &summary).await {
                warn!(error = %e, "could not deliver run notification");
            }
        }

        summary
    }

    /// Query the index back: member count by collection facet plus an
    /// explicit lookup of the collection record by its own id.
    async fn verify(&self, collection: &CollectionInfo, index: &dyn SearchIndex) -> VerifiedCounts {
        let member_docs = match index.query_count("collection", collection.index_id()).await {
            Ok(count) => count,
            Err(e) => {
                warn!(error = %e, "could not verify member count against index");
                0
            }
        };
        let collection_record_found = match index.fetch_doc(&collection.druid).await {
            Ok(doc) => doc.is_some(),
            Err(e) => {
                warn!(error = %e, "could not look up collection record in index");
                false
            }
        };
        VerifiedCounts {
            member_docs,
            collection_record_found,
        }
    }

    fn summary_text(
        &self,
        run_id: Uuid,
        collection: &CollectionInfo,
        whitelisted: bool,
        stats: &RunStats,
        verified: VerifiedCounts,
    ) -> String {
        let mut lines = Vec::new();
        lines.push(format!(
            "Harvest run {} for collection {} ({})",
            run_id, collection.title, collection.druid
        ));
        let mode = if whitelisted { "whitelisted" } else { "harvested" };
        lines.push(format!("  Objects {}: {}", mode, stats.discovered));
        lines.push(format!("  Indexed: {}", stats.indexed));
        lines.push(format!(
            "  Index-verified: {} ({} member docs, collection record {})",
            verified.total(),
            verified.member_docs,
            if verified.collection_record_found {
                "found"
            } else {
                "missing"
            }
        ));
        if stats.indexed as u64 != verified.total() {
            lines.push(format!(
                "  WARNING: success count {} does not match index-verified count {}",
                stats.indexed,
                verified.total()
            ));
        }
        lines.push(format!("  Errors: {}", stats.errored));
        lines.push(format!("  Total processed: {}", stats.total_processed()));
        if !stats.failed_druids.is_empty() {
            lines.push(format!("  Failed druids: {}", stats.failed_druids.join(", ")));
        }
        lines.push(format!(
            "  Avg fetch: {:.3}s, avg transform: {:.3}s, commit: {:.3}s",
            stats.avg_fetch_secs(),
            stats.avg_transform_secs(),
            stats.commit_secs
        ));
        lines.push(format!("  Elapsed: {:.1}s", stats.elapsed_secs));
        if !stats.validation_messages.is_empty() {
            lines.push(format!(
                "  Validation messages: {}",
                stats.validation_messages.len()
            ));
        }
        lines.join("\n")
    }
}
