//! Stream composition primitives shared by every pipeline stage.
//!
//! Streams are lazy, possibly-infinite, and not restartable once consumed.
//! Cancellation has no explicit signal here: dropping an `EventStream` drops
//! every constituent stream transitively, which is the idiomatic Rust way to
//! observe "stop pulling, right now" and satisfies the spec's requirement that
//! cancellation of a merged stream propagate to every input.

use futures::stream::{self, BoxStream};
use futures::{Future, StreamExt};

use crate::error::EngineResult;
use crate::event::CollectedEvent;

/// A lazy, boxed sequence of events. `Err` items represent a stage failure that
/// must surface to the pipeline's retry policy rather than being silently dropped.
pub type EventStream = BoxStream<'static, EngineResult<CollectedEvent>>;

/// Fairly interleaves N event sources into one. Closes once every input is
/// exhausted; an input erroring surfaces that error as an item in the merged
/// stream without otherwise disturbing the remaining inputs.
///
/// No ordering is guaranteed across the constituent streams.
pub fn merge(streams: Vec<EventStream>) -> EventStream {
    stream::select_all(streams).boxed()
}

/// Applies a fallible, possibly-expanding transformation to every element of
/// `upstream`, concatenating the results in order.
///
/// `f` is run to completion for one upstream item before the next is pulled,
/// so chaining `flat_map` calls yields a stable depth-first order: every
/// descendant of one input is produced before the next input is even requested
/// from the stage above.
pub fn flat_map<F, Fut>(upstream: EventStream, f: F) -> EventStream
where
    F: FnMut(EngineResult<CollectedEvent>) -> Fut + Send + 'static,
    Fut: Future<Output = Vec<EngineResult<CollectedEvent>>> + Send + 'static,
{
    upstream.then(f).flat_map(stream::iter).boxed()
}
