//! Encodes task events into SSE frames.
//!
//! Each frame is a JSON-RPC success envelope, keyed by the id of the
//! `message/stream` request that started the task, whose `result` is the event.

use std::convert::Infallible;
use std::time::Duration;

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::{Stream, StreamExt};
use serde_json::Value;

use a2a_core::TaskEvent;

use crate::orchestrator::{EventSource, StreamFrame};
use crate::rpc::RpcResponse;

/// Serialize `event` into the envelope carried by one SSE `data:` line.
pub fn encode_event(correlation_id: Option<&Value>, event: &TaskEvent) -> Result<String, serde_json::Error> {
    serde_json::to_string(&RpcResponse::success(correlation_id.cloned(), event))
}

/// Parse a frame produced by [`encode_event`] back into its event.
pub fn decode_event(data: &str) -> Result<TaskEvent, serde_json::Error> {
    let envelope: RpcResponse<TaskEvent> = serde_json::from_str(data)?;
    envelope
        .result
        .ok_or_else(|| serde::de::Error::missing_field("result"))
}

pub fn frame_to_sse(frame: StreamFrame) -> Event {
    Event::default().data(frame.data)
}

/// Adapt an event source into an axum SSE response body. Dropping the
/// response drops the source, which the orchestrator treats as a disconnect.
pub fn into_sse(
    source: EventSource,
    keep_alive: Duration,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = source.map(|frame| Ok::<_, Infallible>(frame_to_sse(frame)));
    Sse::new(stream).keep_alive(KeepAlive::new().interval(keep_alive))
}

#[cfg(test)]
mod tests {
    use super::*;
    use a2a_core::{TaskId, TaskState};
    use serde_json::json;

    #[test]
    fn envelope_wraps_event() {
        let id = TaskId::from_raw("t1");
        let event = TaskEvent::status(&id, TaskState::Submitted, "Task submitted", false);
        let data = encode_event(Some(&json!("req-1")), &event).unwrap();
        let v: Value = serde_json::from_str(&data).unwrap();
        assert_eq!(v["jsonrpc"], "2.0");
        assert_eq!(v["id"], "req-1");
        assert_eq!(v["result"]["kind"], "status-update");
        assert_eq!(v["result"]["taskId"], "t1");
        assert_eq!(v["result"]["status"]["state"], "submitted");
    }

    #[test]
    fn decode_reverses_encode() {
        let id = TaskId::from_raw("t2");
        let event = TaskEvent::final_text(&id, "done");
        let data = encode_event(None, &event).unwrap();
        assert_eq!(decode_event(&data).unwrap(), event);
    }

    #[test]
    fn decode_rejects_error_envelope() {
        let data = serde_json::to_string(&RpcResponse::parse_error()).unwrap();
        assert!(decode_event(&data).is_err());
    }
}
