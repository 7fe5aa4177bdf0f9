use crate::config::DelayRange;
use crate::traits::LaneTask;
use std::sync::Arc;
use std::time::Instant;
use tokio::signal;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn, Instrument};

/// Splits `items` into `group_count` contiguous groups.
///
/// The count is clamped to `[1, items.len()]`. Sizes differ by at most one and
/// the first `len % count` groups take the extra item. Relative order is kept.
/// An empty input yields no groups.
pub fn partition_groups<T>(items: Vec<T>, group_count: usize) -> Vec<Vec<T>> {
    if items.is_empty() {
        return Vec::new();
    }

    let count = group_count.clamp(1, items.len());
    let base = items.len() / count;
    let remainder = items.len() % count;

    let mut groups = Vec::with_capacity(count);
    let mut iter = items.into_iter();
    for i in 0..count {
        let size = base + usize::from(i < remainder);
        groups.push(iter.by_ref().take(size).collect());
    }
    groups
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub groups: usize,
    pub processed: usize,
    pub failed_groups: usize,
    pub cancelled: bool,
}

/// Runs groups of items concurrently, items inside a group one after another.
pub struct GroupRunner {
    group_count: usize,
    delay: DelayRange,
    token: CancellationToken,
}

impl GroupRunner {
    pub fn new(group_count: usize, delay: DelayRange) -> Self {
        Self {
            group_count,
            delay,
            token: CancellationToken::new(),
        }
    }

    /// Token observed by every lane between items.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Cancels the run on Ctrl+C. Items already started are allowed to finish.
    pub fn cancel_on_ctrl_c(self) -> Self {
        let token = self.token.clone();
        tokio::spawn(async move {
            match signal::ctrl_c().await {
                Ok(()) => {
                    info!("🛑 Received Ctrl+C. No new accounts will be started...");
                    token.cancel();
                }
                Err(err) => {
                    error!("Unable to listen for shutdown signal: {}", err);
                }
            }
        });
        self
    }

    /// Partitions `items` and waits until every lane has drained.
    pub async fn run<T, W>(&self, items: Vec<T>, task: Arc<W>) -> RunSummary
    where
        T: Send + 'static,
        W: LaneTask<T> + 'static,
    {
        let groups = partition_groups(items, self.group_count);
        if groups.is_empty() {
            warn!("Nothing to run: no items supplied");
            return RunSummary::default();
        }

        let start_time = Instant::now();
        let group_total = groups.len();
        info!("Starting {} groups...", group_total);

        let mut set = JoinSet::new();
        for (group_id, group) in groups.into_iter().enumerate() {
            let task = Arc::clone(&task);
            let token = self.token.clone();
            let delay = self.delay;
            let span = tracing::info_span!("group", group_id = group_id);

            set.spawn(
                async move { run_lane(group_id, group, task, delay, token).await }
                    .instrument(span),
            );
        }

        let mut summary = RunSummary {
            groups: group_total,
            ..Default::default()
        };

        while let Some(res) = set.join_next().await {
            match res {
                Ok(processed) => summary.processed += processed,
                Err(e) => {
                    summary.failed_groups += 1;
                    error!("A group task panicked or failed to join: {:?}", e);
                }
            }
        }
        summary.cancelled = self.token.is_cancelled();

        info!(
            "All groups finished in {:.1}s | Processed: {} | Failed groups: {}",
            start_time.elapsed().as_secs_f64(),
            summary.processed,
            summary.failed_groups
        );

        summary
    }
}

async fn run_lane<T, W>(
    group_id: usize,
    group: Vec<T>,
    task: Arc<W>,
    delay: DelayRange,
    token: CancellationToken,
) -> usize
where
    W: LaneTask<T> + ?Sized,
{
    let mut processed = 0;
    for (i, item) in group.into_iter().enumerate() {
        if token.is_cancelled() {
            warn!("Group {} stopping early: run cancelled", group_id);
            break;
        }

        // The very first item of the run starts immediately.
        if i != 0 || group_id != 0 {
            let wait = delay.sample();
            info!(
                "{} Sleeping for {} seconds",
                task.describe(&item),
                wait.as_secs()
            );
            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = token.cancelled() => {
                    warn!("Group {} stopping early: run cancelled", group_id);
                    break;
                }
            }
        }

        info!("Running {}", task.describe(&item));
        task.run(item).await;
        processed += 1;
    }
    processed
}
