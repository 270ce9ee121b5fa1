//! Subscribe endpoint: one server-sent event stream per observer.

use axum::{
    extract::State,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
};
use futures::stream::StreamExt;
use std::convert::Infallible;
use std::sync::Arc;

use crate::state::AppState;

/// Open an observer stream.
///
/// The cached snapshot (if any) is the first event; every later event is a
/// relayed envelope. Each event is framed as `data: <json>\n\n`.
pub async fn events_handler(State(state): State<Arc<AppState>>) -> Response {
    let subscription = state.connect_observer();
    let events = subscription.map(|frame| Ok::<_, Infallible>(Event::default().data(&*frame)));

    let sse = Sse::new(events);
    match state.config.keep_alive {
        Some(interval) => sse
            .keep_alive(KeepAlive::new().interval(interval))
            .into_response(),
        None => sse.into_response(),
    }
}
