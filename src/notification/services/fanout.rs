//! Bounded-concurrency fan-out.

use futures::stream::{self, StreamExt};
use std::future::Future;

/// Runs `call` for every item with at most `concurrency` calls in flight and
/// waits for all of them. Output order is completion order.
pub(crate) async fn fan_out<T, F, Fut>(
    items: Vec<T>,
    concurrency: usize,
    call: F,
) -> Vec<Fut::Output>
where
    F: FnMut(T) -> Fut,
    Fut: Future,
{
    stream::iter(items)
        .map(call)
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await
}
