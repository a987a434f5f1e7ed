//! 变更推送 (SSE)
//!
//! 每次提交后的 [`ChangeEvent`] 以 `event: <resource>` 推送给浏览器，
//! 客户端据此重新拉取数据。落后太多的订阅者会丢弃中间事件。

use std::convert::Infallible;

use axum::{
    Router,
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
};
use futures::Stream;
use tokio::sync::broadcast::{self, error::RecvError};

use crate::core::{ChangeEvent, ServerState};

pub fn router() -> Router<ServerState> {
    Router::new().route("/api/events", get(events))
}

/// GET /api/events
pub async fn events(
    State(state): State<ServerState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    Sse::new(change_stream(state.subscribe())).keep_alive(KeepAlive::default())
}

fn change_stream(
    rx: broadcast::Receiver<ChangeEvent>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    futures::stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(change) => {
                    let event = Event::default()
                        .event(change.resource.clone())
                        .id(change.version.to_string())
                        .json_data(&change)
                        .unwrap_or_else(|_| Event::default().comment("unserializable"));
                    return Some((Ok::<_, Infallible>(event), rx));
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "SSE subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn stream_ends_when_sender_dropped() {
        let (tx, rx) = broadcast::channel(4);
        tx.send(ChangeEvent {
            resource: "order".into(),
            version: 1,
            action: "created".into(),
            id: "1".into(),
            data: None,
        })
        .unwrap();
        drop(tx);

        let items: Vec<_> = change_stream(rx).collect().await;
        assert_eq!(items.len(), 1);
    }
}
