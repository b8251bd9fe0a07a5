//! Per-connection poll-and-forward loop.
//!
//! A [`StreamSession`] exclusively owns one [`RecordSource`] and the sending
//! half of the channel backing one client's SSE response. It runs on its own
//! tokio task: the broker's pull API can park for a full poll interval, and
//! that must never stall request handling or other sessions.
//!
//! Lifecycle: the session runs until the broker errors or the client
//! disconnects. In every exit path the source is released exactly once,
//! together with the sender. On error the client is notified through the
//! channel before the source is closed; a disconnect is cleanup, not an
//! error.

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::consumer::RecordSource;
use crate::error::{Error, Result};

/// One item pushed to the connected client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A consumed record's payload, forwarded in poll order.
    Record(String),
    /// Content-free signal emitted once per poll cycle to keep the
    /// transport from idling out.
    KeepAlive,
}

pub struct StreamSession<S> {
    source: S,
    events: mpsc::Sender<Result<StreamEvent>>,
    poll_interval: Duration,
}

impl<S: RecordSource> StreamSession<S> {
    pub fn new(
        source: S,
        events: mpsc::Sender<Result<StreamEvent>>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            source,
            events,
            poll_interval,
        }
    }

    /// Drive the session to completion. Consumes the session; when this
    /// returns, both the source and the sender have been released.
    pub async fn run(mut self) {
        match self.forward_loop().await {
            Ok(never) => match never {},
            Err(Error::StreamClosed) => {
                debug!("stream session finished: client disconnected");
            }
            Err(err) => {
                warn!(error = %err, "stream session failed");
                // Best effort: the peer may already be gone.
                let _ = self.events.send(Err(err)).await;
            }
        }
        self.source.close();
    }

    /// Poll-and-forward until a terminal condition. Records are pushed in
    /// arrival order; after each poll cycle, even an empty one, exactly one
    /// keep-alive is pushed.
    async fn forward_loop(&mut self) -> std::result::Result<std::convert::Infallible, Error> {
        loop {
            let cycle = tokio::time::sleep(self.poll_interval);
            tokio::pin!(cycle);
            loop {
                tokio::select! {
                    _ = &mut cycle => break,
                    // Resolves when the receiving half is dropped, so a
                    // disconnect is observed even while parked in recv.
                    _ = self.events.closed() => return Err(Error::StreamClosed),
                    record = self.source.next_record() => {
                        let record = record?;
                        self.emit(StreamEvent::Record(record.value)).await?;
                    }
                }
            }
            self.emit(StreamEvent::KeepAlive).await?;
        }
    }

    async fn emit(&self, event: StreamEvent) -> Result<()> {
        self.events
            .send(Ok(event))
            .await
            .map_err(|_| Error::StreamClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consumer::Record;
    use async_trait::async_trait;
    use rdkafka::error::KafkaError;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    enum Step {
        Yield(&'static str),
        Fail,
    }

    /// Scripted source: yields its steps, then parks forever.
    struct ScriptedSource {
        steps: VecDeque<Step>,
        closed: Arc<AtomicUsize>,
    }

    impl ScriptedSource {
        fn new(steps: Vec<Step>) -> (Self, Arc<AtomicUsize>) {
            let closed = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    steps: steps.into(),
                    closed: Arc::clone(&closed),
                },
                closed,
            )
        }
    }

    #[async_trait]
    impl RecordSource for ScriptedSource {
        async fn next_record(&mut self) -> Result<Record> {
            match self.steps.pop_front() {
                Some(Step::Yield(value)) => Ok(Record {
                    value: value.to_owned(),
                }),
                Some(Step::Fail) => Err(Error::Poll(KafkaError::NoMessageReceived)),
                None => std::future::pending().await,
            }
        }

        fn close(&mut self) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    const INTERVAL: Duration = Duration::from_secs(5);

    #[tokio::test(start_paused = true)]
    async fn records_forwarded_in_order_then_keepalive() {
        let (source, _closed) =
            ScriptedSource::new(vec![Step::Yield("a"), Step::Yield("b")]);
        let (tx, mut rx) = mpsc::channel(16);
        tokio::spawn(StreamSession::new(source, tx, INTERVAL).run());

        assert_eq!(rx.recv().await.unwrap().unwrap(), StreamEvent::Record("a".into()));
        assert_eq!(rx.recv().await.unwrap().unwrap(), StreamEvent::Record("b".into()));
        assert_eq!(rx.recv().await.unwrap().unwrap(), StreamEvent::KeepAlive);
    }

    #[tokio::test(start_paused = true)]
    async fn idle_session_emits_one_keepalive_per_cycle() {
        let (source, _closed) = ScriptedSource::new(vec![]);
        let (tx, mut rx) = mpsc::channel(16);
        tokio::spawn(StreamSession::new(source, tx, INTERVAL).run());

        for _ in 0..3 {
            assert_eq!(rx.recv().await.unwrap().unwrap(), StreamEvent::KeepAlive);
        }
        // Still running: the sender has not been dropped.
        assert!(tokio::time::timeout(Duration::from_millis(1), rx.recv())
            .await
            .is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn poll_error_notifies_client_then_releases_source() {
        let (source, closed) = ScriptedSource::new(vec![Step::Yield("a"), Step::Fail]);
        let (tx, mut rx) = mpsc::channel(16);
        let session = tokio::spawn(StreamSession::new(source, tx, INTERVAL).run());

        assert_eq!(rx.recv().await.unwrap().unwrap(), StreamEvent::Record("a".into()));
        assert!(matches!(rx.recv().await.unwrap(), Err(Error::Poll(_))));
        // Terminal: the sender is dropped after the error.
        assert!(rx.recv().await.is_none());

        session.await.unwrap();
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn client_disconnect_releases_source_exactly_once() {
        let (source, closed) = ScriptedSource::new(vec![]);
        let (tx, rx) = mpsc::channel(16);
        let session = tokio::spawn(StreamSession::new(source, tx, INTERVAL).run());

        drop(rx);
        session.await.unwrap();
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_during_full_channel_is_treated_as_peer_closed() {
        // Capacity 1 and an eager source: the session blocks pushing "b"
        // while the client goes away without draining.
        let (source, closed) = ScriptedSource::new(vec![Step::Yield("a"), Step::Yield("b")]);
        let (tx, mut rx) = mpsc::channel(1);
        let session = tokio::spawn(StreamSession::new(source, tx, INTERVAL).run());

        assert_eq!(rx.recv().await.unwrap().unwrap(), StreamEvent::Record("a".into()));
        drop(rx);
        session.await.unwrap();
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }
}
