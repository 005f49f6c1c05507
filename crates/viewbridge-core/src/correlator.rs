//! Blocking send reply correlation.
//!
//! A blocking send records the sequence number its reply will carry, sends,
//! then waits on a single-slot channel. Inbound messages pass through
//! [`ReplyCorrelator::should_dispatch`] before decoding: the awaited reply is
//! posted to the waiter and withheld from dispatch.
//!
//! # Invariants
//!
//! - At most one blocking send is outstanding; callers hold
//!   [`ReplyCorrelator::exclusive`] for the whole send-and-wait.
//! - The expectation is recorded before the message is sent, so a reply
//!   arriving immediately is still matched.
//! - A timed-out waiter clears its expectation; later messages with that
//!   sequence number are dispatched normally.

use std::time::Duration;

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::{Mutex, MutexGuard};
use viewbridge_proto::reply_seqno;

struct Expected {
    seqno: u32,
    reply: Sender<String>,
}

/// Matches inbound replies to the outstanding blocking send.
#[derive(Default)]
pub struct ReplyCorrelator {
    send_lock: Mutex<()>,
    expected: Mutex<Option<Expected>>,
}

impl ReplyCorrelator {
    /// Correlator with nothing outstanding.
    pub fn new() -> Self {
        Self::default()
    }

    /// Exclusive right to perform a blocking send.
    pub fn exclusive(&self) -> MutexGuard<'_, ()> {
        self.send_lock.lock()
    }

    /// Record that a reply carrying `seqno` is expected.
    pub fn expect(&self, seqno: u32) -> ReplyWaiter<'_> {
        let (reply, receiver) = channel::bounded(1);
        *self.expected.lock() = Some(Expected { seqno, reply });
        ReplyWaiter { correlator: self, seqno, receiver }
    }

    /// A reply is currently expected.
    pub fn is_expecting(&self) -> bool {
        self.expected.lock().is_some()
    }

    /// Whether `raw` should go to the dispatch table.
    ///
    /// While a reply is expected, a message that is not JSON is dropped and
    /// a message whose numeric `seqno` matches is handed to the waiter.
    /// Everything else is dispatched.
    pub fn should_dispatch(&self, raw: &str) -> bool {
        let mut expected = self.expected.lock();
        let Some(current) = expected.as_ref() else {
            return true;
        };

        match reply_seqno(raw) {
            Err(e) => {
                tracing::error!(error = %e, "error whilst parsing message");
                false
            },
            Ok(Some(seqno)) if seqno == current.seqno => {
                if let Some(current) = expected.take()
                    && current.reply.try_send(raw.to_string()).is_err()
                {
                    tracing::debug!(seqno, "reply waiter already gone");
                }
                false
            },
            Ok(_) => true,
        }
    }
}

/// Receiving side of one blocking send.
pub struct ReplyWaiter<'a> {
    correlator: &'a ReplyCorrelator,
    seqno: u32,
    receiver: Receiver<String>,
}

impl ReplyWaiter<'_> {
    /// Sequence number the reply must carry.
    pub fn seqno(&self) -> u32 {
        self.seqno
    }

    /// Wait up to `timeout` for the reply.
    ///
    /// Returns `None` on timeout after clearing the expectation.
    pub fn wait(self, timeout: Duration) -> Option<String> {
        if let Ok(reply) = self.receiver.recv_timeout(timeout) {
            return Some(reply);
        }

        {
            let mut expected = self.correlator.expected.lock();
            if expected.as_ref().is_some_and(|current| current.seqno == self.seqno) {
                *expected = None;
            }
        }
        // A reply matched between the timeout and the clear above.
        self.receiver.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use super::*;

    #[test]
    fn not_expecting_dispatches_everything() {
        let correlator = ReplyCorrelator::new();
        assert!(correlator.should_dispatch("not json"));
        assert!(correlator.should_dispatch(r#"{"seqno": 1}"#));
    }

    #[test]
    fn matching_reply_is_intercepted() {
        let correlator = ReplyCorrelator::new();
        let waiter = correlator.expect(5);

        assert!(correlator.should_dispatch(r#"{"seqno": 4, "type": "x"}"#));
        assert!(correlator.should_dispatch(r#"{"seqno": "5"}"#));
        assert!(!correlator.should_dispatch(r#"{"seqno": 5, "payload": {}}"#));
        assert!(!correlator.is_expecting());

        let reply = waiter.wait(Duration::from_millis(10)).expect("reply delivered");
        assert!(reply.contains("\"seqno\": 5"));
    }

    #[test]
    fn garbage_dropped_while_expecting() {
        let correlator = ReplyCorrelator::new();
        let _waiter = correlator.expect(1);
        assert!(!correlator.should_dispatch("{"));
        assert!(correlator.is_expecting());
    }

    #[test]
    fn timeout_clears_expectation() {
        let correlator = ReplyCorrelator::new();
        let waiter = correlator.expect(2);
        assert!(waiter.wait(Duration::from_millis(5)).is_none());
        assert!(!correlator.is_expecting());
        assert!(correlator.should_dispatch(r#"{"seqno": 2}"#));
    }

    #[test]
    fn reply_from_another_thread() {
        let correlator = Arc::new(ReplyCorrelator::new());
        let _exclusive = correlator.exclusive();
        let waiter = correlator.expect(11);

        let transport = Arc::clone(&correlator);
        let handle = thread::spawn(move || transport.should_dispatch(r#"{"seqno": 11}"#));

        assert_eq!(waiter.wait(Duration::from_secs(5)).as_deref(), Some(r#"{"seqno": 11}"#));
        assert!(!handle.join().expect("transport thread"));
    }
}
