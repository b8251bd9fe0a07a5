//! Long-lived SSE consume endpoint.
//!
//! Each request gets a dedicated consumer subscribed to the requested topics
//! and a stream session spawned onto the runtime. The response stream stays
//! open until the session ends with a broker error or the client disconnects.

use axum::extract::{Query, State};
use axum::response::sse::{Event, Sse};
use futures::stream::Stream;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;

use kafka_bridge_client::{StreamEvent, StreamSession};

use crate::api::error::{self, ApiError};
use crate::app::AppState;

/// Buffered events per session; bounds memory for slow clients and pushes
/// backpressure into the poll loop.
const SESSION_CHANNEL_CAPACITY: usize = 16;

/// `GET /api/kafka/consume?topic=<t>&...` — subscribe a fresh consumer and
/// forward every record value as one SSE event. Repeated `topic` parameters
/// select the subscription; all other query parameters are overlaid onto the
/// base consumer configuration.
pub async fn consume(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, ApiError> {
    let (topics, overrides): (Vec<_>, Vec<_>) =
        params.into_iter().partition(|(key, _)| key == "topic");
    let topics: Vec<String> = topics.into_iter().map(|(_, topic)| topic).collect();
    if topics.is_empty() {
        return Err(error::bad_request(
            "at least one topic query parameter is required",
        ));
    }
    debug!(?topics, "consume request");

    let permit = state
        .sessions
        .clone()
        .try_acquire_owned()
        .map_err(|_| error::session_limit_reached())?;

    let mut settings = state.consumer_settings.clone();
    settings.apply_overrides(overrides);
    // Subscription failures end the session before it starts streaming.
    let source = state.sources.create(&settings, &topics)?;

    let (events, rx) = mpsc::channel(SESSION_CHANNEL_CAPACITY);
    let session = StreamSession::new(source, events, state.poll_interval);
    tokio::spawn(async move {
        let _permit = permit;
        session.run().await;
    });

    let stream = ReceiverStream::new(rx).map(|item| match item {
        Ok(StreamEvent::Record(value)) => Ok(Event::default().data(value)),
        Ok(StreamEvent::KeepAlive) => Ok(Event::default().comment("")),
        Err(err) => Err(axum::Error::new(err)),
    });
    Ok(Sse::new(stream))
}
