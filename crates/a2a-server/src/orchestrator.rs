//! Task stream orchestrator: runs one streamed task per `message/stream`
//! call and feeds its events to a single consumer.
//!
//! The `TaskOrchestrator` trait is what the dispatcher talks to.
//! `StreamingTaskOrchestrator` is the production implementation; it drives each
//! task through `submitted → working → artifact-partial → completed` on its own
//! tokio task, with the lookup itself on the blocking pool.
//!
//! Exactly one terminal event is ever emitted per task. Every state change is a
//! compare-and-set on the task's atomic state; the sender mutex only orders
//! sends so that nothing can follow the terminal frame.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::{Stream, StreamExt};
use parking_lot::Mutex;
use pin_project_lite::pin_project;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::{CancellationToken, DropGuard};

use a2a_core::{TaskEvent, TaskId, TaskState};
use a2a_engine::{EngineError, LookupAgent};

use crate::event_bridge;

const SUBMITTED_TEXT: &str = "Task submitted";
const DEFAULT_WORKING_TEXT: &str = "Processing";
const CANCELED_TEXT: &str = "Task canceled";
const FAILED_TEXT: &str = "Task failed";
const TIMED_OUT_TEXT: &str = "Stream timed out";

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),

    #[error("task already active: {0}")]
    TaskConflict(TaskId),

    #[error("event encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),
}

#[derive(Clone, Debug)]
pub struct OrchestratorConfig {
    /// Pause between pipeline stages.
    pub stream_delay: Duration,
    /// A stage that takes longer than this fails the task. `None` disables.
    pub idle_timeout: Option<Duration>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            stream_delay: Duration::from_millis(150),
            idle_timeout: None,
        }
    }
}

/// Everything needed to start one streamed task.
#[derive(Clone, Debug, Default)]
pub struct StreamRequest {
    /// Id of the originating RPC request; echoed in every frame envelope.
    pub correlation_id: Option<Value>,
    /// Caller-chosen task id. Blank or absent generates one.
    pub task_id: Option<TaskId>,
    /// Conversation id, shown in the working message.
    pub session_id: Option<String>,
    /// Login session id, shown in the working message.
    pub login_session_id: Option<String>,
    pub summary: String,
    pub query: String,
}

impl StreamRequest {
    /// Progress text for the `working` status.
    pub fn working_message(&self) -> String {
        let mut parts = Vec::new();
        if let Some(s) = non_blank(self.session_id.as_deref()) {
            parts.push(format!("sessionId={s}"));
        }
        if let Some(s) = non_blank(self.login_session_id.as_deref()) {
            parts.push(format!("agentLoginSessionId={s}"));
        }
        if !self.query.trim().is_empty() {
            parts.push(format!("query=\"{}\"", self.query));
        }
        if parts.is_empty() {
            DEFAULT_WORKING_TEXT.to_string()
        } else {
            parts.join(", ")
        }
    }

    fn reasoning_text(&self) -> String {
        if self.query.is_empty() {
            "Analyzing request: <empty>".to_string()
        } else {
            format!("Analyzing request: {}", self.query)
        }
    }
}

/// `tasks/cancel` result: `{id, status: {state}}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CancelResult {
    pub id: TaskId,
    pub status: CancelStatus,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CancelStatus {
    pub state: TaskState,
}

/// One event as delivered to the consumer, with its encoded wire form.
#[derive(Clone, Debug)]
pub struct StreamFrame {
    pub event: TaskEvent,
    pub data: String,
}

pin_project! {
    /// Single-consumer handle on a task's events, in emission order. Ends
    /// after the terminal frame. Dropping it before then cancels the task.
    pub struct EventSource {
        task_id: TaskId,
        #[pin]
        frames: UnboundedReceiverStream<StreamFrame>,
        disconnect: DropGuard,
    }
}

impl EventSource {
    pub fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    pub async fn recv(&mut self) -> Option<StreamFrame> {
        self.next().await
    }
}

impl Stream for EventSource {
    type Item = StreamFrame;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<StreamFrame>> {
        self.project().frames.poll_next(cx)
    }
}

/// Trait for running streamed tasks.
pub trait TaskOrchestrator: Send + Sync {
    /// Register a task and start it. The `submitted` frame is already queued
    /// when this returns.
    fn start_stream(&self, request: StreamRequest) -> Result<EventSource, OrchestratorError>;
    fn cancel_task(&self, task_id: &TaskId) -> Result<CancelResult, OrchestratorError>;
    fn has_active_task(&self, task_id: &TaskId) -> bool;
    fn active_count(&self) -> usize;
    /// Cancel every live task. Returns how many were signalled.
    fn abort_all(&self) -> usize;
}

/// Live state of one task. Owned by the orchestrator; the worker and the
/// cancel path share it through an `Arc`.
struct TaskHandle {
    id: TaskId,
    correlation_id: Option<Value>,
    state: AtomicU8,
    sender: Mutex<Option<mpsc::UnboundedSender<StreamFrame>>>,
    cancel: CancellationToken,
}

impl TaskHandle {
    fn state(&self) -> TaskState {
        TaskState::from_repr(self.state.load(Ordering::Acquire)).unwrap_or(TaskState::Failed)
    }

    fn frame(&self, event: TaskEvent) -> Result<StreamFrame, serde_json::Error> {
        let data = event_bridge::encode_event(self.correlation_id.as_ref(), &event)?;
        Ok(StreamFrame { event, data })
    }

    /// Send a non-terminal event if `current → next` is still legal.
    /// `Ok(false)` means the task already reached a terminal state.
    fn advance(&self, next: TaskState, event: TaskEvent) -> Result<bool, serde_json::Error> {
        let sender = self.sender.lock();
        let Some(tx) = sender.as_ref() else {
            return Ok(false);
        };
        let current = self.state();
        if !current.can_transition_to(next) {
            return Ok(false);
        }
        let frame = self.frame(event)?;
        if self
            .state
            .compare_exchange(current as u8, next as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(false);
        }
        if tx.send(frame).is_err() {
            tracing::debug!(task_id = %self.id, state = %next, "consumer gone, frame dropped");
        }
        Ok(true)
    }
}

type TaskTable = DashMap<TaskId, Arc<TaskHandle>>;

/// Move `handle` to `state` unless it is already terminal, send the terminal
/// frame, drop the task from the table and close the stream. Returns the
/// terminal state the task ended in, whoever won.
fn terminate(tasks: &TaskTable, handle: &Arc<TaskHandle>, state: TaskState, frame: Option<StreamFrame>) -> TaskState {
    let claimed = handle
        .state
        .fetch_update(Ordering::AcqRel, Ordering::Acquire, |raw| {
            TaskState::from_repr(raw)
                .filter(|s| !s.is_terminal())
                .map(|_| state as u8)
        });
    if let Err(previous) = claimed {
        return TaskState::from_repr(previous).unwrap_or(TaskState::Failed);
    }

    handle.cancel.cancel();
    let mut sender = handle.sender.lock();
    if let (Some(tx), Some(frame)) = (sender.as_ref(), frame) {
        if tx.send(frame).is_err() {
            tracing::debug!(task_id = %handle.id, "consumer gone before terminal frame");
        }
    }
    // The id must be free before the consumer can observe end-of-stream.
    tasks.remove_if(&handle.id, |_, live| Arc::ptr_eq(live, handle));
    sender.take();
    drop(sender);

    tracing::info!(task_id = %handle.id, state = %state, "task closed");
    state
}

/// Terminal status frame. An encoding failure is logged and the stream
/// closes without it.
fn terminal_frame(handle: &TaskHandle, state: TaskState, text: &str) -> Option<StreamFrame> {
    match handle.frame(TaskEvent::status(&handle.id, state, text, true)) {
        Ok(frame) => Some(frame),
        Err(e) => {
            tracing::error!(task_id = %handle.id, error = %e, "failed to encode terminal event");
            None
        }
    }
}

/// Why a stage was cut short.
enum Interrupt {
    Canceled,
    TimedOut,
}

/// Production orchestrator: one tokio task per stream, lookups on the
/// blocking pool.
pub struct StreamingTaskOrchestrator {
    agent: Arc<dyn LookupAgent>,
    config: OrchestratorConfig,
    tasks: Arc<TaskTable>,
}

impl StreamingTaskOrchestrator {
    pub fn new(agent: Arc<dyn LookupAgent>, config: OrchestratorConfig) -> Self {
        Self {
            agent,
            config,
            tasks: Arc::new(DashMap::new()),
        }
    }
}

impl TaskOrchestrator for StreamingTaskOrchestrator {
    fn start_stream(&self, request: StreamRequest) -> Result<EventSource, OrchestratorError> {
        let task_id = request
            .task_id
            .clone()
            .filter(|id| !id.is_blank())
            .unwrap_or_default();

        let (tx, rx) = mpsc::unbounded_channel();
        let handle = Arc::new(TaskHandle {
            id: task_id.clone(),
            correlation_id: request.correlation_id.clone(),
            state: AtomicU8::new(TaskState::Submitted as u8),
            sender: Mutex::new(None),
            cancel: CancellationToken::new(),
        });

        let submitted = handle.frame(TaskEvent::status(&task_id, TaskState::Submitted, SUBMITTED_TEXT, false))?;

        match self.tasks.entry(task_id.clone()) {
            Entry::Occupied(_) => {
                tracing::warn!(task_id = %task_id, "rejecting duplicate task id");
                return Err(OrchestratorError::TaskConflict(task_id));
            }
            Entry::Vacant(slot) => {
                // Receiver is still local, so this cannot fail.
                let _ = tx.send(submitted);
                *handle.sender.lock() = Some(tx);
                slot.insert(Arc::clone(&handle));
            }
        }

        tracing::info!(task_id = %task_id, summary = %request.summary, "task submitted");

        let source = EventSource {
            task_id,
            frames: UnboundedReceiverStream::new(rx),
            disconnect: handle.cancel.clone().drop_guard(),
        };

        let worker = Worker {
            tasks: Arc::clone(&self.tasks),
            handle,
            agent: Arc::clone(&self.agent),
            config: self.config.clone(),
        };
        tokio::spawn(worker.run(request));

        Ok(source)
    }

    fn cancel_task(&self, task_id: &TaskId) -> Result<CancelResult, OrchestratorError> {
        let handle = self
            .tasks
            .get(task_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| OrchestratorError::TaskNotFound(task_id.clone()))?;

        let frame = terminal_frame(&handle, TaskState::Canceled, CANCELED_TEXT);
        let state = terminate(&self.tasks, &handle, TaskState::Canceled, frame);
        if state != TaskState::Canceled {
            tracing::debug!(task_id = %task_id, state = %state, "cancel lost race to another terminal state");
        }

        Ok(CancelResult {
            id: task_id.clone(),
            status: CancelStatus { state },
        })
    }

    fn has_active_task(&self, task_id: &TaskId) -> bool {
        self.tasks.contains_key(task_id)
    }

    fn active_count(&self) -> usize {
        self.tasks.len()
    }

    fn abort_all(&self) -> usize {
        let live: Vec<Arc<TaskHandle>> = self.tasks.iter().map(|e| Arc::clone(e.value())).collect();
        for handle in &live {
            let frame = terminal_frame(handle, TaskState::Canceled, CANCELED_TEXT);
            terminate(&self.tasks, handle, TaskState::Canceled, frame);
        }
        if !live.is_empty() {
            tracing::info!(count = live.len(), "aborted all active tasks");
        }
        live.len()
    }
}

/// Drives a single task to a terminal state.
struct Worker {
    tasks: Arc<TaskTable>,
    handle: Arc<TaskHandle>,
    agent: Arc<dyn LookupAgent>,
    config: OrchestratorConfig,
}

impl Worker {
    async fn run(self, request: StreamRequest) {
        let task_id = self.handle.id.clone();
        match self.pipeline(&request).await {
            Ok(()) => {}
            Err(Interrupt::Canceled) => {
                // Explicit cancels have already terminated; this catches disconnects.
                if !self.handle.state().is_terminal() {
                    tracing::info!(task_id = %task_id, "consumer disconnected, canceling task");
                }
                self.finish(TaskState::Canceled, CANCELED_TEXT);
            }
            Err(Interrupt::TimedOut) => {
                tracing::warn!(task_id = %task_id, "stream idle timeout");
                self.finish(TaskState::Failed, TIMED_OUT_TEXT);
            }
        }
    }

    async fn pipeline(&self, request: &StreamRequest) -> Result<(), Interrupt> {
        let id = &self.handle.id;

        self.guard(tokio::time::sleep(self.config.stream_delay)).await?;
        if !self.advance(TaskState::Working, TaskEvent::status(id, TaskState::Working, request.working_message(), false)) {
            return Ok(());
        }

        self.guard(tokio::time::sleep(self.config.stream_delay)).await?;
        if !self.advance(TaskState::ArtifactPartial, TaskEvent::reasoning(id, request.reasoning_text())) {
            return Ok(());
        }

        self.guard(tokio::time::sleep(self.config.stream_delay)).await?;
        let agent = Arc::clone(&self.agent);
        let query = request.query.clone();
        let lookup = tokio::task::spawn_blocking(move || agent.search(&query));

        let result = match self.guard(lookup).await? {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                tracing::warn!(task_id = %id, error = %e, "lookup failed");
                self.finish(TaskState::Failed, FAILED_TEXT);
                return Ok(());
            }
            Err(join) => {
                let err = EngineError::Panicked(join.to_string());
                tracing::error!(task_id = %id, error = %err, "lookup did not complete");
                self.finish(TaskState::Failed, FAILED_TEXT);
                return Ok(());
            }
        };

        let text = format!("{}\n{}", request.summary, result);
        self.complete(self.handle.frame(TaskEvent::final_text(id, text)));
        Ok(())
    }

    /// Run one stage, racing it against cancellation and the idle timeout.
    async fn guard<F: Future>(&self, stage: F) -> Result<F::Output, Interrupt> {
        let idle_timeout = self.config.idle_timeout;
        let bounded = async move {
            match idle_timeout {
                Some(limit) => tokio::time::timeout(limit, stage)
                    .await
                    .map_err(|_| Interrupt::TimedOut),
                None => Ok(stage.await),
            }
        };
        tokio::select! {
            biased;
            _ = self.handle.cancel.cancelled() => Err(Interrupt::Canceled),
            out = bounded => out,
        }
    }

    /// `false` once the task is terminal and the pipeline should stop.
    fn advance(&self, next: TaskState, event: TaskEvent) -> bool {
        match self.handle.advance(next, event) {
            Ok(sent) => sent,
            Err(e) => {
                tracing::error!(task_id = %self.handle.id, error = %e, "failed to encode event");
                self.finish(TaskState::Failed, FAILED_TEXT);
                false
            }
        }
    }

    /// Close as completed, or as failed when the final artifact did not encode.
    fn complete(&self, encoded: Result<StreamFrame, serde_json::Error>) {
        match encoded {
            Ok(frame) => {
                terminate(&self.tasks, &self.handle, TaskState::Completed, Some(frame));
            }
            Err(e) => {
                tracing::error!(task_id = %self.handle.id, error = %e, "failed to encode final artifact");
                self.finish(TaskState::Failed, FAILED_TEXT);
            }
        }
    }

    fn finish(&self, state: TaskState, text: &str) {
        let frame = terminal_frame(&self.handle, state, text);
        terminate(&self.tasks, &self.handle, state, frame);
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.trim().is_empty())
}
