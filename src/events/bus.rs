// ABOUTME: Bounded in-process queue for login events with resident and burst workers
// ABOUTME: Full queues and failing handlers go to the dead-letter log, never back to the caller
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Inhibitor Contributors

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use inhibitor_core::constants::events::WORKER_NAME_PREFIX;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, info_span, warn, Instrument};

use super::{LoginEventHandler, LoginSucceeded};
use crate::config::EventQueueConfig;

/// Idle time after which a burst worker exits
const BURST_WORKER_KEEP_ALIVE: Duration = Duration::from_secs(60);

struct WorkerShared {
    receiver: Mutex<Receiver<LoginSucceeded>>,
    handlers: Vec<Arc<dyn LoginEventHandler>>,
    active_workers: AtomicUsize,
    spawned_total: AtomicUsize,
}

/// Login event queue
pub struct EventBus {
    sender: RwLock<Option<Sender<LoginSucceeded>>>,
    shared: Arc<WorkerShared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    capacity: usize,
    max_workers: usize,
}

impl EventBus {
    /// Start the queue with `config.min_workers` resident workers
    ///
    /// Must be called inside a Tokio runtime.
    #[must_use]
    pub fn start(config: &EventQueueConfig, handlers: Vec<Arc<dyn LoginEventHandler>>) -> Self {
        let capacity = config.queue_capacity.max(1);
        let (sender, receiver) = mpsc::channel(capacity);
        let shared = Arc::new(WorkerShared {
            receiver: Mutex::new(receiver),
            handlers,
            active_workers: AtomicUsize::new(0),
            spawned_total: AtomicUsize::new(0),
        });

        let min_workers = config.min_workers.max(1);
        let workers = (0..min_workers)
            .map(|_| spawn_worker(shared.clone(), None))
            .collect();

        info!(
            min_workers,
            max_workers = config.max_workers,
            capacity,
            "Login event queue started"
        );

        Self {
            sender: RwLock::new(Some(sender)),
            shared,
            workers: Mutex::new(workers),
            capacity,
            max_workers: config.max_workers.max(min_workers),
        }
    }

    /// Enqueue an event without waiting
    ///
    /// Returns `false` when the event went to the dead-letter log.
    pub async fn publish(&self, event: LoginSucceeded) -> bool {
        let sender = self.sender.read().await.clone();
        let Some(sender) = sender else {
            warn!(
                target: "dead_letter",
                correlation_id = %event.correlation_id,
                account_id = event.account_id,
                "Login event dropped: queue is shut down"
            );
            return false;
        };

        match sender.try_send(event) {
            Ok(()) => {
                self.grow_if_backlogged(&sender).await;
                true
            }
            Err(TrySendError::Full(event)) => {
                warn!(
                    target: "dead_letter",
                    correlation_id = %event.correlation_id,
                    account_id = event.account_id,
                    capacity = self.capacity,
                    "Login event dropped: queue is full"
                );
                false
            }
            Err(TrySendError::Closed(event)) => {
                warn!(
                    target: "dead_letter",
                    correlation_id = %event.correlation_id,
                    account_id = event.account_id,
                    "Login event dropped: queue is closed"
                );
                false
            }
        }
    }

    /// Events waiting for a worker
    #[must_use]
    pub fn backlog(&self) -> usize {
        self.sender
            .try_read()
            .ok()
            .and_then(|guard| guard.as_ref().map(|s| self.capacity - s.capacity()))
            .unwrap_or(0)
    }

    /// Workers currently running
    #[must_use]
    pub fn active_workers(&self) -> usize {
        self.shared.active_workers.load(Ordering::SeqCst)
    }

    /// Close the queue, drain the backlog, and wait for every worker
    pub async fn shutdown(&self) {
        drop(self.sender.write().await.take());
        let handles: Vec<JoinHandle<()>> = self.workers.lock().await.drain(..).collect();
        for handle in handles {
            if let Err(e) = handle.await {
                error!("Login event worker terminated abnormally: {e}");
            }
        }
        info!("Login event queue stopped");
    }

    async fn grow_if_backlogged(&self, sender: &Sender<LoginSucceeded>) {
        let backlog = self.capacity - sender.capacity();
        if backlog == 0 || self.active_workers() >= self.max_workers {
            return;
        }
        let mut workers = self.workers.lock().await;
        workers.retain(|h| !h.is_finished());
        if self.active_workers() < self.max_workers {
            debug!(backlog, "Spawning burst login event worker");
            workers.push(spawn_worker(
                self.shared.clone(),
                Some(BURST_WORKER_KEEP_ALIVE),
            ));
        }
    }
}

fn spawn_worker(shared: Arc<WorkerShared>, keep_alive: Option<Duration>) -> JoinHandle<()> {
    let ordinal = shared.spawned_total.fetch_add(1, Ordering::SeqCst) + 1;
    shared.active_workers.fetch_add(1, Ordering::SeqCst);
    let worker = format!("{WORKER_NAME_PREFIX}{ordinal}");

    tokio::spawn(async move {
        loop {
            let next = async { shared.receiver.lock().await.recv().await };
            let event = match keep_alive {
                Some(idle) => match tokio::time::timeout(idle, next).await {
                    Ok(event) => event,
                    Err(_) => break,
                },
                None => next.await,
            };
            let Some(event) = event else { break };
            deliver(&shared.handlers, &worker, event).await;
        }
        shared.active_workers.fetch_sub(1, Ordering::SeqCst);
        debug!(worker = %worker, "Login event worker exited");
    })
}

/// Run every handler for one event inside a span scoped to that event
async fn deliver(handlers: &[Arc<dyn LoginEventHandler>], worker: &str, event: LoginSucceeded) {
    let span = info_span!(
        "login_event",
        worker = %worker,
        correlation_id = %event.correlation_id,
        account_id = event.account_id,
        client_id = %event.client_id,
    );

    async {
        for handler in handlers {
            if let Err(e) = handler.handle(&event).await {
                error!(
                    target: "dead_letter",
                    handler = handler.name(),
                    correlation_id = %event.correlation_id,
                    account_id = event.account_id,
                    "Login event handler failed: {e}"
                );
            }
        }
    }
    .instrument(span)
    .await;
}
