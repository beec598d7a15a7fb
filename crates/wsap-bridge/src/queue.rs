//! Command queue pairing blocking submitters with a polling game
//!
//! Each submitted command gets its own oneshot channel. The sender half lives in
//! the waiter map until either the game posts a result or the submitter gives up;
//! whoever removes it from the map under the lock owns the outcome, so a result
//! and a timeout can never both be observed for the same id.

use crate::error::BridgeError;
use crate::protocol::{BridgeStatus, Command, CommandId, CommandType};
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// A poll within this window counts as a connected game
const CONNECTED_WINDOW: Duration = Duration::from_secs(5);

#[derive(Default)]
struct QueueState {
    pending: VecDeque<Command>,
    waiters: HashMap<CommandId, oneshot::Sender<serde_json::Value>>,
    last_poll: Option<Instant>,
    submitted: u64,
    delivered: u64,
    timed_out: u64,
    discarded_results: u64,
}

/// Thread-safe rendezvous between controller requests and game polls
#[derive(Default)]
pub struct CommandQueue {
    state: Mutex<QueueState>,
}

/// Removes a command's waiter and un-polled entry if its submitter goes away early
struct Registration<'a> {
    queue: &'a CommandQueue,
    id: CommandId,
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        let mut state = self.queue.lock();
        if state.waiters.remove(&self.id).is_some() {
            state.pending.retain(|c| c.id != self.id);
            debug!(command_id = %self.id, "Submitter dropped, command withdrawn");
        }
    }
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    // Critical sections never panic, so a poisoned lock still holds consistent state
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Queue a command and wait up to `timeout` for the game's result
    pub async fn submit(
        &self,
        command_type: CommandType,
        payload: serde_json::Map<String, serde_json::Value>,
        timeout: Duration,
    ) -> Result<serde_json::Value, BridgeError> {
        let id = Uuid::new_v4().to_string();
        let (tx, mut rx) = oneshot::channel();

        {
            let mut state = self.lock();
            state.waiters.insert(id.clone(), tx);
            state.pending.push_back(Command {
                id: id.clone(),
                command_type,
                payload,
            });
            state.submitted += 1;
        }
        let _registration = Registration {
            queue: self,
            id: id.clone(),
        };
        debug!(command_id = %id, command_type = command_type.as_str(), "Command queued");

        match tokio::time::timeout(timeout, &mut rx).await {
            Ok(Ok(result)) => {
                debug!(command_id = %id, "Command completed");
                Ok(result)
            }
            Ok(Err(_)) => Err(BridgeError::Closed(id)),
            Err(_) => {
                let mut state = self.lock();
                if state.waiters.remove(&id).is_some() {
                    state.pending.retain(|c| c.id != id);
                    state.timed_out += 1;
                    drop(state);
                    warn!(command_id = %id, ?timeout, "Command timed out");
                    return Err(BridgeError::Timeout { id, after: timeout });
                }
                drop(state);
                // The result won the race: it was sent under the lock before we took it
                rx.try_recv().map_err(|_| BridgeError::Closed(id.clone()))
            }
        }
    }

    /// Non-blocking dequeue for the game poller
    pub fn get_next_command(&self) -> Option<Command> {
        let mut state = self.lock();
        state.last_poll = Some(Instant::now());
        let command = state.pending.pop_front();
        if let Some(command) = &command {
            debug!(command_id = %command.id, "Command handed to poller");
        }
        command
    }

    /// Deliver the game's result; returns false when nobody is waiting for `id`
    pub fn submit_result(&self, id: &str, result: serde_json::Value) -> bool {
        let mut state = self.lock();
        match state.waiters.remove(id) {
            Some(waiter) => {
                if waiter.send(result).is_ok() {
                    state.delivered += 1;
                    true
                } else {
                    state.discarded_results += 1;
                    false
                }
            }
            None => {
                state.discarded_results += 1;
                drop(state);
                info!(command_id = %id, "Discarding result with no waiter");
                false
            }
        }
    }

    /// Counters and connection state for `GET /status`
    pub fn status(&self) -> BridgeStatus {
        let state = self.lock();
        BridgeStatus {
            status: "running".to_string(),
            connected: state
                .last_poll
                .is_some_and(|at| at.elapsed() <= CONNECTED_WINDOW),
            pending: state.pending.len(),
            in_flight: state.waiters.len(),
            submitted: state.submitted,
            delivered: state.delivered,
            timed_out: state.timed_out,
            discarded_results: state.discarded_results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    fn empty() -> serde_json::Map<String, serde_json::Value> {
        serde_json::Map::new()
    }

    #[tokio::test]
    async fn test_unpolled_command_times_out() {
        let queue = CommandQueue::new();
        let started = Instant::now();

        let result = queue
            .submit(CommandType::Observe, empty(), Duration::from_millis(100))
            .await;

        assert!(matches!(result, Err(BridgeError::Timeout { .. })));
        assert!(started.elapsed() >= Duration::from_millis(100));
        let status = queue.status();
        assert_eq!(status.pending, 0, "timed-out command must leave the queue");
        assert_eq!(status.in_flight, 0);
        assert_eq!(status.timed_out, 1);
    }

    #[tokio::test]
    async fn test_late_result_is_discarded() {
        let queue = Arc::new(CommandQueue::new());

        let err = queue
            .submit(CommandType::Observe, empty(), Duration::from_millis(50))
            .await
            .unwrap_err();
        let BridgeError::Timeout { id, .. } = err else {
            panic!("expected timeout, got {:?}", err);
        };

        // A second, live command must not be affected by the stray result
        let live = {
            let queue = queue.clone();
            tokio::spawn(async move {
                queue
                    .submit(CommandType::Act, empty(), Duration::from_secs(5))
                    .await
            })
        };
        let live_command = loop {
            if let Some(c) = queue.get_next_command() {
                break c;
            }
            tokio::task::yield_now().await;
        };

        assert!(!queue.submit_result(&id, json!({"stale": true})));
        assert!(queue.submit_result(&live_command.id, json!({"success": true})));

        assert_eq!(live.await.unwrap().unwrap(), json!({"success": true}));
        assert_eq!(queue.status().discarded_results, 1);
    }

    #[tokio::test]
    async fn test_polled_command_delivers_exact_result() {
        let queue = Arc::new(CommandQueue::new());
        let submitter = {
            let queue = queue.clone();
            tokio::spawn(async move {
                let mut payload = empty();
                payload.insert("action".into(), json!("jump"));
                queue
                    .submit(CommandType::Act, payload, Duration::from_secs(5))
                    .await
            })
        };

        let command = loop {
            if let Some(c) = queue.get_next_command() {
                break c;
            }
            tokio::task::yield_now().await;
        };
        assert_eq!(command.command_type, CommandType::Act);
        assert_eq!(command.payload["action"], "jump");

        assert!(queue.submit_result(&command.id, json!({"success": true, "message": "Jumped"})));
        // Duplicate delivery finds no waiter
        assert!(!queue.submit_result(&command.id, json!({"success": false})));

        let result = submitter.await.unwrap().unwrap();
        assert_eq!(result, json!({"success": true, "message": "Jumped"}));
        assert!(queue.status().connected);
    }

    #[tokio::test]
    async fn test_commands_are_polled_in_fifo_order() {
        let queue = Arc::new(CommandQueue::new());
        let mut handles = Vec::new();
        for kind in [CommandType::Reset, CommandType::Observe, CommandType::Act] {
            let submitter = queue.clone();
            handles.push(tokio::spawn(async move {
                submitter.submit(kind, empty(), Duration::from_secs(5)).await
            }));
            // Let each submitter enqueue before the next one starts
            while queue.status().pending < handles.len() {
                tokio::task::yield_now().await;
            }
        }

        let order: Vec<CommandType> = std::iter::from_fn(|| queue.get_next_command())
            .map(|c| {
                queue.submit_result(&c.id, json!({"type": c.command_type.as_str()}));
                c.command_type
            })
            .collect();
        assert_eq!(
            order,
            vec![CommandType::Reset, CommandType::Observe, CommandType::Act]
        );

        for handle in handles {
            tokio_test::assert_ok!(handle.await.unwrap());
        }
    }

    #[tokio::test]
    async fn test_result_racing_timeout_fires_once() {
        // Resolve right at the deadline many times; each submit sees exactly one outcome
        for _ in 0..50 {
            let queue = Arc::new(CommandQueue::new());
            let submitter = {
                let queue = queue.clone();
                tokio::spawn(async move {
                    queue
                        .submit(CommandType::Observe, empty(), Duration::from_millis(5))
                        .await
                })
            };
            let command = loop {
                if let Some(c) = queue.get_next_command() {
                    break c;
                }
                tokio::task::yield_now().await;
            };
            tokio::time::sleep(Duration::from_millis(5)).await;
            let accepted = queue.submit_result(&command.id, json!({"ok": true}));

            let outcome = submitter.await.unwrap();
            match outcome {
                Ok(value) => {
                    assert!(accepted);
                    assert_eq!(value, json!({"ok": true}));
                }
                Err(BridgeError::Timeout { .. }) => assert!(!accepted),
                Err(other) => panic!("unexpected outcome: {:?}", other),
            }
            assert_eq!(queue.status().in_flight, 0);
        }
    }

    #[tokio::test]
    async fn test_dropped_submitter_withdraws_command() {
        let queue = CommandQueue::new();
        let submit = queue.submit(CommandType::Observe, empty(), Duration::from_secs(30));
        // Polling the future once registers the command; dropping it withdraws it
        let _ = tokio::time::timeout(Duration::from_millis(10), submit).await;

        let status = queue.status();
        assert_eq!(status.pending, 0);
        assert_eq!(status.in_flight, 0);
        assert!(queue.get_next_command().is_none());
    }

    #[test]
    fn test_idle_poll_returns_none() {
        let queue = CommandQueue::new();
        assert!(queue.get_next_command().is_none());
        assert!(queue.status().connected);
    }
}
