//! Request/response channel to an isolated sandbox.
//!
//! Work that must not run on the document thread (pixel crunching) is handed
//! to a [`Sandbox`] that runs on a blocking worker. Every request carries a
//! fresh [`RequestId`] and the reply is routed back to the caller waiting on
//! that id, so concurrent callers never see each other's results.
//!
//! ```text
//!  transform() ──Envelope──▶ requests ──▶ sandbox pump (blocking thread)
//!       ▲                                         │
//!  oneshot ◀── router task ◀── replies ◀──Envelope┘
//! ```

pub mod invert;

pub use invert::InvertColors;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};

use crate::errors::PluginError;
use crate::log::{debug, warn};

/// Requests queued towards the sandbox before callers have to wait
const QUEUE_DEPTH: usize = 32;

/// Correlation id of one request
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub u64);

/// What travels over the channel in either direction
#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    Bytes(Vec<u8>),
    Text(String),
    Empty,
}

impl Payload {
    pub fn kind(&self) -> &'static str {
        match self {
            Payload::Bytes(_) => "bytes",
            Payload::Text(_) => "text",
            Payload::Empty => "nothing",
        }
    }

    fn describe(&self) -> String {
        match self {
            Payload::Text(text) => format!("text {text:?}"),
            other => other.kind().to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Envelope {
    pub id: RequestId,
    pub payload: Payload,
}

/// Work executed inside the sandbox. Runs on a blocking thread, one request
/// at a time.
pub trait Sandbox: Send + 'static {
    fn handle(&mut self, payload: Payload) -> Payload;
}

/// The sandbox's end of a channel: requests in, replies out.
///
/// Replies may be sent in any order. Dropping the link closes the sandbox.
#[derive(Debug)]
pub struct SandboxLink {
    pub requests: mpsc::Receiver<Envelope>,
    pub replies: mpsc::Sender<Envelope>,
}

type Pending = Arc<Mutex<HashMap<RequestId, oneshot::Sender<Payload>>>>;

fn lock(pending: &Pending) -> MutexGuard<'_, HashMap<RequestId, oneshot::Sender<Payload>>> {
    pending.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The caller's end of a sandbox channel.
#[derive(Debug)]
pub struct DelegationChannel {
    requests: mpsc::Sender<Envelope>,
    pending: Pending,
    next_id: AtomicU64,
    timeout: Duration,
}

impl DelegationChannel {
    /// Create a channel and hand back the sandbox's end of it.
    ///
    /// Must be called from inside a tokio runtime; the reply router is
    /// spawned onto it.
    pub fn connect(timeout: Duration) -> Result<(Self, SandboxLink), PluginError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| PluginError::Other(format!("delegation needs a tokio runtime: {e}")))?;

        let (request_tx, request_rx) = mpsc::channel(QUEUE_DEPTH);
        let (reply_tx, reply_rx) = mpsc::channel(QUEUE_DEPTH);
        let pending: Pending = Arc::default();
        runtime.spawn(route(reply_rx, Arc::clone(&pending)));

        let channel = DelegationChannel {
            requests: request_tx,
            pending,
            next_id: AtomicU64::new(1),
            timeout,
        };
        let link = SandboxLink {
            requests: request_rx,
            replies: reply_tx,
        };
        Ok((channel, link))
    }

    /// Create a channel served by `sandbox` on a blocking worker thread.
    pub fn spawn<S: Sandbox>(sandbox: S, timeout: Duration) -> Result<Self, PluginError> {
        let (channel, link) = Self::connect(timeout)?;
        tokio::task::spawn_blocking(move || pump(sandbox, link));
        debug!(timeout_ms = timeout.as_millis() as u64, "sandbox started");
        Ok(channel)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Requests still waiting for a reply.
    pub fn in_flight(&self) -> usize {
        lock(&self.pending).len()
    }

    /// Send image bytes to the sandbox and wait for the transformed bytes.
    pub async fn transform(&self, bytes: Vec<u8>) -> Result<Vec<u8>, PluginError> {
        let id = RequestId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (reply_tx, reply_rx) = oneshot::channel();
        lock(&self.pending).insert(id, reply_tx);

        let exchange = async {
            let envelope = Envelope {
                id,
                payload: Payload::Bytes(bytes),
            };
            if self.requests.send(envelope).await.is_err() {
                return None;
            }
            reply_rx.await.ok()
        };

        let reply = match tokio::time::timeout(self.timeout, exchange).await {
            Ok(reply) => reply,
            Err(_) => {
                lock(&self.pending).remove(&id);
                warn!(id = id.0, "sandbox request timed out");
                return Err(PluginError::TransformTimeout {
                    id: id.0,
                    millis: self.timeout.as_millis() as u64,
                });
            }
        };

        match reply {
            Some(Payload::Bytes(bytes)) => Ok(bytes),
            Some(other) => Err(PluginError::ProtocolMismatch {
                got: other.describe(),
            }),
            None => {
                lock(&self.pending).remove(&id);
                Err(PluginError::SandboxClosed { id: id.0 })
            }
        }
    }
}

/// Deliver each reply to whoever is waiting on its id.
async fn route(mut replies: mpsc::Receiver<Envelope>, pending: Pending) {
    while let Some(Envelope { id, payload }) = replies.recv().await {
        let waiter = lock(&pending).remove(&id);
        match waiter {
            Some(waiter) => {
                if waiter.send(payload).is_err() {
                    debug!(id = id.0, "caller stopped waiting before the reply arrived");
                }
            }
            None => warn!(id = id.0, "dropping reply for unknown request"),
        }
    }

    // Dropping the senders wakes every remaining caller with a closed error
    let orphaned = lock(&pending).drain().count();
    if orphaned > 0 {
        warn!(orphaned, "sandbox closed with requests in flight");
    }
}

fn pump<S: Sandbox>(mut sandbox: S, mut link: SandboxLink) {
    while let Some(Envelope { id, payload }) = link.requests.blocking_recv() {
        let reply = Envelope {
            id,
            payload: sandbox.handle(payload),
        };
        if link.replies.blocking_send(reply).is_err() {
            break;
        }
    }
    debug!("sandbox stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHORT: Duration = Duration::from_millis(50);
    const LONG: Duration = Duration::from_secs(5);

    struct Echo;

    impl Sandbox for Echo {
        fn handle(&mut self, payload: Payload) -> Payload {
            payload
        }
    }

    #[tokio::test]
    async fn spawned_sandbox_answers() {
        let channel = DelegationChannel::spawn(Echo, LONG).unwrap();
        assert_eq!(channel.transform(vec![1, 2, 3]).await.unwrap(), vec![1, 2, 3]);
        assert_eq!(channel.transform(vec![4]).await.unwrap(), vec![4]);
        assert_eq!(channel.in_flight(), 0);
    }

    #[tokio::test]
    async fn out_of_order_replies_reach_their_callers() {
        let (channel, mut link) = DelegationChannel::connect(LONG).unwrap();

        let sandbox = async {
            let first = link.requests.recv().await.unwrap();
            let second = link.requests.recv().await.unwrap();
            for request in [second, first] {
                let Payload::Bytes(mut bytes) = request.payload else {
                    panic!("expected bytes");
                };
                bytes.push(0xff);
                let reply = Envelope {
                    id: request.id,
                    payload: Payload::Bytes(bytes),
                };
                link.replies.send(reply).await.unwrap();
            }
        };

        let (a, b, ()) = tokio::join!(channel.transform(vec![1]), channel.transform(vec![2]), sandbox);
        assert_eq!(a.unwrap(), vec![1, 0xff]);
        assert_eq!(b.unwrap(), vec![2, 0xff]);
    }

    #[tokio::test]
    async fn text_reply_is_a_protocol_mismatch() {
        let (channel, mut link) = DelegationChannel::connect(LONG).unwrap();
        let sandbox = async {
            let request = link.requests.recv().await.unwrap();
            let reply = Envelope {
                id: request.id,
                payload: Payload::Text("boom".into()),
            };
            link.replies.send(reply).await.unwrap();
        };

        let (result, ()) = tokio::join!(channel.transform(vec![0]), sandbox);
        let err = result.unwrap_err();
        assert!(matches!(err, PluginError::ProtocolMismatch { .. }));
        assert_eq!(
            err.kind(),
            crate::errors::ErrorKind::ProtocolMismatch
        );
    }

    #[tokio::test]
    async fn timeout_clears_the_pending_entry() {
        let (channel, mut link) = DelegationChannel::connect(SHORT).unwrap();

        let err = channel.transform(vec![9]).await.unwrap_err();
        assert!(matches!(err, PluginError::TransformTimeout { id: 1, millis: 50 }));
        assert_eq!(channel.in_flight(), 0);

        // the late reply is dropped and the channel keeps working
        let late = link.requests.recv().await.unwrap();
        link.replies
            .send(Envelope { id: late.id, payload: Payload::Bytes(vec![]) })
            .await
            .unwrap();

        let sandbox = async {
            let request = link.requests.recv().await.unwrap();
            link.replies.send(request).await.unwrap();
        };
        let (result, ()) = tokio::join!(channel.transform(vec![7]), sandbox);
        assert_eq!(result.unwrap(), vec![7]);
    }

    #[tokio::test]
    async fn closed_sandbox_fails_pending_requests() {
        let (channel, mut link) = DelegationChannel::connect(LONG).unwrap();
        let sandbox = async move {
            let _request = link.requests.recv().await.unwrap();
            drop(link);
        };

        let (result, ()) = tokio::join!(channel.transform(vec![1]), sandbox);
        assert!(matches!(result.unwrap_err(), PluginError::SandboxClosed { id: 1 }));
        assert_eq!(channel.in_flight(), 0);

        let err = channel.transform(vec![2]).await.unwrap_err();
        assert!(matches!(err, PluginError::SandboxClosed { id: 2 }));
    }

    #[test]
    fn connect_needs_a_runtime() {
        assert!(DelegationChannel::connect(SHORT).is_err());
    }
}
