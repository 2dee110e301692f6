use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt, TryStreamExt};
use thiserror::Error;
use catalog_client::{CatalogClient, CatalogError};
use shared::types::{DesiredDefinition, ObservedRecord, Registration};
use super::identity::{canonical_tags, has_all_tags};
use super::plan::{plan, ObservedSet, Step};

/// Endpoint lists fetched from the catalog at the same time
pub const ENDPOINT_FETCH_CONCURRENCY: usize = 8;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Outcome counters of one run
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub dry_run: bool,
    pub in_sync: usize,
    pub kept: usize,
    pub keep_missing: usize,
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl SyncReport {
    fn new(dry_run: bool) -> Self {
        let now = Utc::now();
        Self {
            dry_run,
            in_sync: 0,
            kept: 0,
            keep_missing: 0,
            added: 0,
            updated: 0,
            removed: 0,
            started_at: now,
            finished_at: now,
        }
    }

    /// Registrations and deregistrations issued (or that would have been)
    pub fn mutations(&self) -> usize {
        self.added + self.updated + self.removed
    }
}

/// Converges the catalog entries scoped by a tag set to a desired list.
///
/// Changing the tag set orphans entries registered under the old one; they
/// are no longer found and have to be removed by hand.
#[derive(Debug, Clone)]
pub struct Syncer {
    catalog: CatalogClient,
    dry_run: bool,
}

impl Syncer {
    pub fn new(catalog: CatalogClient) -> Self {
        Self {
            catalog,
            dry_run: false,
        }
    }

    /// Count mutations without sending them
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub async fn run(
        &self,
        definitions: Vec<DesiredDefinition>,
        required_tags: &[String],
    ) -> Result<SyncReport, SyncError> {
        require_tags(required_tags)?;
        let mut report = SyncReport::new(self.dry_run);

        // Required tags are part of every definition so entries are found again next run
        let definitions: Vec<DesiredDefinition> = definitions
            .into_iter()
            .map(|mut definition| {
                definition.tags = canonical_tags(&definition.tags, required_tags);
                definition
            })
            .collect();

        for definition in &definitions {
            if !definition.has_stable_identity() {
                tracing::warn!(
                    "{} has no service_id; the catalog assigns one, so it will be re-added and removed on alternate runs",
                    definition.describe()
                );
            }
        }

        let observed = ObservedSet::new(self.observed(required_tags).await?);
        tracing::debug!(
            "Reconciling {} definitions against {} catalog entries",
            definitions.len(),
            observed.len()
        );

        for step in plan(&definitions, observed) {
            self.apply(&step, &mut report).await?;
        }

        report.finished_at = Utc::now();
        Ok(report)
    }

    /// Catalog entries carrying every required tag
    pub async fn observed(&self, required_tags: &[String]) -> Result<Vec<ObservedRecord>, SyncError> {
        let first = require_tags(required_tags)?;

        // The directory only filters on one tag; the rest is checked here
        let directory = self.catalog.services_tagged(first).await?;
        let names: Vec<String> = directory
            .into_iter()
            .filter(|(_, tags)| has_all_tags(tags, required_tags))
            .map(|(name, _)| name)
            .collect();

        let endpoint_lists: Vec<Vec<ObservedRecord>> = stream::iter(&names)
            .map(|name| {
                tracing::info!("Getting service endpoints for {}", name);
                self.catalog.service_endpoints(name)
            })
            .buffered(ENDPOINT_FETCH_CONCURRENCY)
            .try_collect()
            .await?;

        // Only this per-record check is authoritative
        Ok(endpoint_lists
            .into_iter()
            .flatten()
            .filter(|record| {
                let scoped = has_all_tags(&record.tags, required_tags);
                if !scoped {
                    tracing::debug!("Ignoring {}: missing required tags", record.describe());
                }
                scoped
            })
            .collect())
    }

    async fn apply(&self, step: &Step, report: &mut SyncReport) -> Result<(), SyncError> {
        let prefix = if self.dry_run { "[dry-run] " } else { "" };

        match step {
            Step::InSync(desired) => {
                tracing::debug!("Found {} in catalog", desired.describe());
                report.in_sync += 1;
            }
            Step::Kept(desired) => {
                tracing::debug!("Keeping {} in catalog", desired.describe());
                report.kept += 1;
            }
            Step::KeepMissing(desired) => {
                tracing::warn!("Could not keep {} in catalog: not found", desired.describe());
                report.keep_missing += 1;
            }
            Step::Update { desired, previous } => {
                tracing::info!(
                    "{}Updating {} in catalog (was {}:{} tags {:?})",
                    prefix,
                    desired.describe(),
                    previous.address,
                    previous.port,
                    previous.tags
                );
                self.register(desired).await?;
                report.updated += 1;
            }
            Step::Add(desired) => {
                tracing::info!("{}Adding {} in catalog", prefix, desired.describe());
                self.register(desired).await?;
                report.added += 1;
            }
            Step::Remove(record) => {
                tracing::info!("{}Removing {} in catalog", prefix, record.describe());
                if !self.dry_run {
                    self.catalog
                        .deregister(&record.node, &record.service_id)
                        .await?;
                }
                report.removed += 1;
            }
        }

        Ok(())
    }

    async fn register(&self, desired: &DesiredDefinition) -> Result<(), SyncError> {
        if !self.dry_run {
            self.catalog.register(&Registration::from(desired)).await?;
        }
        Ok(())
    }
}

/// Reconcile and return the number of mutations issued (or that would be in
/// dry-run mode).
pub async fn sync(
    catalog: CatalogClient,
    definitions: Vec<DesiredDefinition>,
    required_tags: &[String],
    dry_run: bool,
) -> Result<usize, SyncError> {
    let report = Syncer::new(catalog)
        .dry_run(dry_run)
        .run(definitions, required_tags)
        .await?;
    Ok(report.mutations())
}

// Tags are the only thing keeping apps sharing a catalog from removing each other's entries
fn require_tags(required_tags: &[String]) -> Result<&String, SyncError> {
    required_tags.first().ok_or_else(|| {
        SyncError::InvalidArgument("need at least one tag to reliably scope endpoints".to_string())
    })
}
