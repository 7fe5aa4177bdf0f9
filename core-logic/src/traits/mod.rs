use async_trait::async_trait;

/// One unit of work executed by a lane of the [`GroupRunner`](crate::GroupRunner).
///
/// Implementors are shared read-only across lanes; the item itself is moved
/// into `run` so it stays owned by exactly one lane.
#[async_trait]
pub trait LaneTask<T>: Send + Sync {
    /// Short human-readable description used in lane logs.
    fn describe(&self, item: &T) -> String;

    /// Processes one item. Failures are handled (and logged) inside.
    async fn run(&self, item: T);
}
