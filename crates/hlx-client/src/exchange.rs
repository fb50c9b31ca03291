//! The command exchange pipeline.
//!
//! An exchange pairs a request with the response patterns that can
//! complete it, a monotonically increasing serial, a deadline, and a
//! waiter. Exactly one exchange is in flight per connection; further
//! submissions queue FIFO and are dispatched as the prior exchange
//! completes, errors, or times out. A timeout completes the waiter with
//! `Timeout` and frees the slot without tearing the connection down.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::Instant;

use hlx_proto::{Error, Request, Response, ResponsePattern};

/// Who is waiting on an exchange: an external caller holding the reply
/// channel, or the refresh orchestrator tracking its own progress.
pub(crate) enum Waiter {
    Caller(oneshot::Sender<Result<Response, Error>>),
    Refresh,
}

pub(crate) struct Exchange {
    pub request: Request,
    pub waiter: Waiter,
    /// Per-exchange deadline override; the manager default applies when
    /// absent.
    pub timeout: Option<Duration>,
}

pub(crate) struct Pending {
    pub serial: u64,
    pub expects: &'static [ResponsePattern],
    pub waiter: Waiter,
    pub deadline: Instant,
}

pub(crate) struct CommandManager {
    pending: Option<Pending>,
    queue: VecDeque<Exchange>,
    next_serial: u64,
    default_timeout: Duration,
}

impl CommandManager {
    pub(crate) fn new(default_timeout: Duration) -> CommandManager {
        CommandManager {
            pending: None,
            queue: VecDeque::new(),
            next_serial: 1,
            default_timeout,
        }
    }

    pub(crate) fn enqueue(&mut self, exchange: Exchange) {
        self.queue.push_back(exchange);
    }

    pub(crate) fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub(crate) fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.deadline)
    }

    /// Dequeue the next exchange for transmission. Only legal while no
    /// exchange is in flight.
    pub(crate) fn take_next(&mut self) -> Option<Exchange> {
        if self.pending.is_some() {
            return None;
        }
        self.queue.pop_front()
    }

    /// Mark an exchange as in flight after its request has been written.
    pub(crate) fn arm(&mut self, request: &Request, waiter: Waiter, timeout: Option<Duration>) {
        let serial = self.next_serial;
        self.next_serial += 1;
        self.pending = Some(Pending {
            serial,
            expects: request.expected_responses(),
            waiter,
            deadline: Instant::now() + timeout.unwrap_or(self.default_timeout),
        });
    }

    /// Complete the in-flight exchange if `pattern` is one it expects.
    pub(crate) fn try_complete(&mut self, pattern: ResponsePattern) -> Option<Pending> {
        if self
            .pending
            .as_ref()
            .is_some_and(|p| p.expects.contains(&pattern))
        {
            self.pending.take()
        } else {
            None
        }
    }

    /// Take the in-flight exchange if its deadline has passed.
    pub(crate) fn take_timed_out(&mut self, now: Instant) -> Option<Pending> {
        if self.pending.as_ref().is_some_and(|p| p.deadline <= now) {
            self.pending.take()
        } else {
            None
        }
    }

    /// Fail the in-flight exchange and everything queued behind it.
    pub(crate) fn fail_all(&mut self) -> Vec<Waiter> {
        let mut waiters = Vec::with_capacity(self.queue.len() + 1);
        if let Some(pending) = self.pending.take() {
            waiters.push(pending.waiter);
        }
        waiters.extend(self.queue.drain(..).map(|ex| ex.waiter));
        waiters
    }
}
