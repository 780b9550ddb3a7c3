//! Bounded concurrent write application

use std::future::Future;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use super::OrderingError;

/// Runs one batch of independent writes with at most `limit` in flight.
///
/// All batches of a transaction share one token. The first failure cancels
/// it: writes not yet started never start, and in-flight ones resolve to
/// [`OrderingError::Cancelled`].
pub struct FanOut {
    limit: usize,
    token: CancellationToken,
}

impl FanOut {
    /// A fan-out whose token is a child of `parent`, so cancelling the
    /// request also stops the writes.
    pub fn new(limit: usize, parent: &CancellationToken) -> Self {
        Self {
            limit: limit.max(1),
            token: parent.child_token(),
        }
    }

    #[cfg(test)]
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Apply `op` to every item. Returns the number of completed writes, or
    /// the first error.
    pub async fn run<I, F, Fut>(&self, items: I, op: F) -> Result<usize, OrderingError>
    where
        I: IntoIterator,
        F: Fn(I::Item) -> Fut,
        Fut: Future<Output = Result<(), OrderingError>>,
    {
        if self.token.is_cancelled() {
            return Err(OrderingError::Cancelled);
        }

        let token = &self.token;
        let op = &op;
        let mut results = futures::stream::iter(items)
            .map(|item| async move {
                if token.is_cancelled() {
                    return Err(OrderingError::Cancelled);
                }
                tokio::select! {
                    biased;
                    _ = token.cancelled() => Err(OrderingError::Cancelled),
                    res = op(item) => res,
                }
            })
            .buffer_unordered(self.limit);

        let mut done = 0;
        while let Some(res) = results.next().await {
            if let Err(e) = res {
                token.cancel();
                return Err(e);
            }
            done += 1;
        }
        Ok(done)
    }
}
