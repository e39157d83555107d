//! Historical and live access to contract event logs.
//!
//! Historical queries page `eth_getLogs` over bounded block windows and
//! yield decoded events lazily; live watches run a background task that
//! forwards each decoded log to a caller-supplied sink until cancelled or
//! the underlying subscription fails.

use std::collections::VecDeque;

use alloy::{
    primitives::Address,
    providers::Provider,
    rpc::types::{Filter, Log},
    sol_types::SolEvent,
    transports::TransportErrorKind,
};
use futures::{Stream, StreamExt};
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tracing::{debug, error};

use crate::error::StakingError;

/// Number of blocks covered per `eth_getLogs` request when iterating
/// historical events.
const LOG_PAGE_SPAN: u64 = 10_000;

/// Block range covered by a historical event query.
///
/// A `to_block` of `None` means the chain head at the time the query opens.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FilterRange {
    pub from_block: u64,
    pub to_block: Option<u64>,
}

impl FilterRange {
    /// Everything from `from_block` up to the current chain head.
    pub fn since(from_block: u64) -> Self {
        Self {
            from_block,
            to_block: None,
        }
    }

    /// The inclusive range `from_block..=to_block`.
    pub fn between(from_block: u64, to_block: u64) -> Self {
        Self {
            from_block,
            to_block: Some(to_block),
        }
    }
}

/// Base log filter for event `E` emitted by `contract`.
pub(crate) fn event_filter<E: SolEvent>(contract: Address) -> Filter {
    Filter::new()
        .address(contract)
        .event_signature(E::SIGNATURE_HASH)
}

/// Cursor over an inclusive block range, handing out bounded query windows.
#[derive(Clone, Copy, Debug)]
struct LogPager {
    start: u64,
    next: u64,
    end: u64,
    finished: bool,
}

impl LogPager {
    fn new(start: u64, end: u64) -> Self {
        Self {
            start,
            next: start,
            end,
            finished: false,
        }
    }

    /// Next window of at most [`LOG_PAGE_SPAN`] blocks, inclusive on both
    /// ends, or `None` once the range is covered.
    fn next_window(&mut self) -> Option<(u64, u64)> {
        if self.finished || self.next > self.end {
            self.finished = true;
            return None;
        }
        let from = self.next;
        let to = self.end.min(from.saturating_add(LOG_PAGE_SPAN - 1));
        match to.checked_add(1) {
            Some(next) => self.next = next,
            None => self.finished = true,
        }
        Some((from, to))
    }

    fn rewind(&mut self) {
        self.next = self.start;
        self.finished = false;
    }
}

/// Lazy iterator over decoded historical event logs.
///
/// Events are yielded in ledger block/log order, each carrying its raw log
/// context. Once the range is exhausted or a failure occurs no further
/// records are produced; the failure stays queryable through
/// [`error`](Self::error) and [`rewind`](Self::rewind) restarts the
/// sequence. Dropping the iterator releases it.
pub struct EventLogIterator<P, E: SolEvent> {
    provider: P,
    filter: Filter,
    pager: LogPager,
    buffer: VecDeque<Log<E>>,
    failed: Option<StakingError>,
}

impl<P: Provider, E: SolEvent> EventLogIterator<P, E> {
    /// Open an iterator over `range`. When `to_block` is not given, the
    /// range end is pinned to the chain head once, here.
    pub(crate) async fn new(
        provider: P,
        filter: Filter,
        range: FilterRange,
    ) -> Result<Self, StakingError> {
        let end = match range.to_block {
            Some(end) => end,
            None => provider
                .get_block_number()
                .await
                .map_err(StakingError::LogRetrieval)?,
        };
        Ok(Self {
            provider,
            filter,
            pager: LogPager::new(range.from_block, end),
            buffer: VecDeque::new(),
            failed: None,
        })
    }

    /// Advance to the next event, or `None` once the range is exhausted or
    /// a failure occurred. After `None`, [`error`](Self::error)
    /// distinguishes the two.
    pub async fn next(&mut self) -> Option<Log<E>> {
        loop {
            if let Some(log) = self.buffer.pop_front() {
                return Some(log);
            }
            if self.failed.is_some() {
                return None;
            }
            let (from, to) = self.pager.next_window()?;
            let filter = self.filter.clone().from_block(from).to_block(to);
            let logs = match self.provider.get_logs(&filter).await {
                Ok(logs) => logs,
                Err(err) => {
                    self.failed = Some(StakingError::LogRetrieval(err));
                    return None;
                }
            };
            debug!(from, to, count = logs.len(), event = E::SIGNATURE, "fetched log page");
            for log in &logs {
                match log.log_decode_validate::<E>() {
                    Ok(decoded) => self.buffer.push_back(decoded),
                    Err(err) => {
                        self.failed = Some(StakingError::Decode(err));
                        break;
                    }
                }
            }
        }
    }

    /// The retrieval or decoding failure that stopped iteration, if any.
    pub fn error(&self) -> Option<&StakingError> {
        self.failed.as_ref()
    }

    /// Restart the sequence from the first block of the range, clearing any
    /// recorded failure.
    pub fn rewind(&mut self) {
        self.pager.rewind();
        self.buffer.clear();
        self.failed = None;
    }
}

/// Subscribe to live logs matching `filter` and spawn a task forwarding
/// decoded events to `sink`.
pub(crate) async fn watch<P, E>(
    provider: &P,
    filter: Filter,
    sink: mpsc::Sender<Log<E>>,
) -> Result<EventSubscription, StakingError>
where
    P: Provider,
    E: SolEvent + Send + 'static,
{
    let sub = provider
        .subscribe_logs(&filter)
        .await
        .map_err(StakingError::Subscription)?;
    debug!(event = E::SIGNATURE, "event watch started");
    Ok(EventSubscription::spawn(sub.into_stream(), sink))
}

/// Handle to a background task delivering decoded event logs to a sink.
///
/// The task forwards logs in arrival order and never drops one: when the
/// sink is full it waits until the send is accepted or the subscription is
/// cancelled. It terminates on cancellation, when the sink closes, when the
/// source stream ends, or when a log fails to decode. Dropping the handle
/// cancels the subscription.
pub struct EventSubscription {
    cancel: oneshot::Sender<()>,
    task: JoinHandle<Result<(), StakingError>>,
}

impl EventSubscription {
    pub(crate) fn spawn<S, E>(stream: S, sink: mpsc::Sender<Log<E>>) -> Self
    where
        S: Stream<Item = Log> + Send + Unpin + 'static,
        E: SolEvent + Send + 'static,
    {
        let (cancel, cancelled) = oneshot::channel();
        let task = tokio::spawn(forward_logs(stream, sink, cancelled));
        Self { cancel, task }
    }

    /// Whether the background task has already terminated.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the subscription and wait for the background task to settle.
    ///
    /// Returns `Ok(())` after a clean cancellation; if the task had already
    /// terminated on a failure, that failure is returned instead.
    pub async fn unsubscribe(self) -> Result<(), StakingError> {
        let _ = self.cancel.send(());
        flatten(self.task.await)
    }

    /// Wait for the task to terminate on its own, without cancelling it.
    /// This only returns once the source stream ends or fails, the sink
    /// closes, or a log fails to decode.
    pub async fn join(self) -> Result<(), StakingError> {
        let Self { cancel, task } = self;
        let out = flatten(task.await);
        drop(cancel);
        out
    }
}

fn flatten(
    joined: Result<Result<(), StakingError>, tokio::task::JoinError>,
) -> Result<(), StakingError> {
    match joined {
        Ok(out) => out,
        Err(err) => Err(StakingError::Subscription(TransportErrorKind::custom(err))),
    }
}

async fn forward_logs<S, E>(
    mut stream: S,
    sink: mpsc::Sender<Log<E>>,
    mut cancelled: oneshot::Receiver<()>,
) -> Result<(), StakingError>
where
    S: Stream<Item = Log> + Send + Unpin,
    E: SolEvent,
{
    loop {
        tokio::select! {
            _ = &mut cancelled => return Ok(()),
            next = stream.next() => {
                let Some(log) = next else {
                    error!(event = E::SIGNATURE, "event log stream closed");
                    return Err(StakingError::Subscription(TransportErrorKind::backend_gone()));
                };
                let decoded = log.log_decode_validate::<E>()?;
                tokio::select! {
                    _ = &mut cancelled => return Ok(()),
                    sent = sink.send(decoded) => {
                        // A closed sink counts as cancellation.
                        if sent.is_err() {
                            return Ok(());
                        }
                    }
                }
            }
        }
    }
}
