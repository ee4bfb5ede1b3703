//! In-process message broker
//!
//! Durable-queue semantics over tokio channels: messages published before a
//! consumer subscribes are buffered, delivery is at-least-once, each inbound
//! message is handled on its own task, and retryable failures are requeued
//! with exponential backoff until they are dead-lettered.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::traits::{EventPublisher, MessageHandler};
use crate::config::BrokerConfig;
use crate::error::{PensionError, Result};
use crate::messaging::Topic;

impl BrokerConfig {
    fn backoff_duration(&self, attempt: u32) -> Duration {
        let delay = self
            .base_backoff_ms
            .saturating_mul(2u64.saturating_pow(attempt));
        Duration::from_millis(delay.min(self.max_backoff_ms))
    }
}

#[derive(Debug)]
struct Delivery {
    payload: Arc<[u8]>,
    attempt: u32,
}

/// A delivery that exhausted its redeliveries
#[derive(Debug, Clone)]
pub struct DeadLetter {
    pub topic: Topic,
    pub payload: Arc<[u8]>,
    pub attempts: u32,
    pub error: String,
    pub failed_at: DateTime<Utc>,
}

struct Inner {
    config: BrokerConfig,
    senders: HashMap<Topic, mpsc::Sender<Delivery>>,
    receivers: Mutex<HashMap<Topic, mpsc::Receiver<Delivery>>>,
    dead_letters: RwLock<Vec<DeadLetter>>,
    in_flight: AtomicUsize,
    shutdown_tx: broadcast::Sender<()>,
}

/// Clonable handle to the in-process broker
#[derive(Clone)]
pub struct InProcessBroker {
    inner: Arc<Inner>,
}

impl InProcessBroker {
    pub fn new(config: BrokerConfig) -> Self {
        let mut senders = HashMap::new();
        let mut receivers = HashMap::new();
        for topic in Topic::ALL {
            let (tx, rx) = mpsc::channel(config.channel_capacity.max(1));
            senders.insert(topic, tx);
            receivers.insert(topic, rx);
        }
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            inner: Arc::new(Inner {
                config,
                senders,
                receivers: Mutex::new(receivers),
                dead_letters: RwLock::new(Vec::new()),
                in_flight: AtomicUsize::new(0),
                shutdown_tx,
            }),
        }
    }

    /// Attach the single consumer of `topic` and start dispatching
    pub async fn subscribe(
        &self,
        topic: Topic,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<JoinHandle<()>> {
        let mut rx = self
            .inner
            .receivers
            .lock()
            .await
            .remove(&topic)
            .ok_or_else(|| {
                PensionError::Broker(format!("topic '{}' already has a consumer", topic))
            })?;

        let mut shutdown_rx = self.inner.shutdown_tx.subscribe();
        let broker = self.clone();
        info!("Consumer '{}' subscribed to {}", handler.name(), topic);

        Ok(tokio::spawn(async move {
            loop {
                tokio::select! {
                    delivery = rx.recv() => {
                        let Some(delivery) = delivery else { break };
                        let broker = broker.clone();
                        let handler = handler.clone();
                        tokio::spawn(async move {
                            broker.process(topic, handler, delivery).await;
                        });
                    }
                    _ = shutdown_rx.recv() => {
                        debug!("Dispatcher for {} shutting down", topic);
                        break;
                    }
                }
            }
        }))
    }

    async fn process(&self, topic: Topic, handler: Arc<dyn MessageHandler>, delivery: Delivery) {
        match handler.handle(&delivery.payload).await {
            Ok(()) => {
                debug!("{} acked by '{}'", topic, handler.name());
                self.settle();
            }
            Err(e) if !e.is_retryable() => {
                warn!(
                    "{} dropped by '{}' (not retryable): {}",
                    topic,
                    handler.name(),
                    e
                );
                self.settle();
            }
            Err(e) if delivery.attempt < self.inner.config.max_redeliveries => {
                let backoff = self.inner.config.backoff_duration(delivery.attempt);
                warn!(
                    "{} failed in '{}' (attempt {}), requeueing in {:?}: {}",
                    topic,
                    handler.name(),
                    delivery.attempt + 1,
                    backoff,
                    e
                );
                tokio::time::sleep(backoff).await;
                let requeued = Delivery {
                    payload: delivery.payload,
                    attempt: delivery.attempt + 1,
                };
                if let Err(err) = self.enqueue(topic, requeued).await {
                    error!("Failed to requeue {} message: {}", topic, err);
                    self.settle();
                }
            }
            Err(e) => {
                error!(
                    "{} dead-lettered after {} attempts in '{}': {}",
                    topic,
                    delivery.attempt + 1,
                    handler.name(),
                    e
                );
                self.inner.dead_letters.write().await.push(DeadLetter {
                    topic,
                    payload: delivery.payload,
                    attempts: delivery.attempt + 1,
                    error: e.to_string(),
                    failed_at: Utc::now(),
                });
                self.settle();
            }
        }
    }

    async fn enqueue(&self, topic: Topic, delivery: Delivery) -> Result<()> {
        let tx = self
            .inner
            .senders
            .get(&topic)
            .ok_or_else(|| PensionError::Broker(format!("no queue for topic '{}'", topic)))?;
        tx.send(delivery)
            .await
            .map_err(|_| PensionError::Broker(format!("queue '{}' is closed", topic)))
    }

    fn settle(&self) {
        self.inner.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    /// Messages published and not yet acked, dropped or dead-lettered
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.load(Ordering::SeqCst)
    }

    pub async fn dead_letters(&self) -> Vec<DeadLetter> {
        self.inner.dead_letters.read().await.clone()
    }

    /// Wait until every published message has settled
    pub async fn wait_idle(&self, timeout: Duration) -> Result<()> {
        tokio::time::timeout(timeout, async {
            while self.in_flight() > 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .map_err(|_| {
            PensionError::Broker(format!(
                "{} message(s) still in flight after {:?}",
                self.in_flight(),
                timeout
            ))
        })
    }

    /// Stop all dispatchers; buffered messages are left undelivered
    pub fn shutdown(&self) {
        let _ = self.inner.shutdown_tx.send(());
    }
}

#[async_trait]
impl EventPublisher for InProcessBroker {
    async fn publish(&self, topic: Topic, payload: Vec<u8>) -> Result<()> {
        self.inner.in_flight.fetch_add(1, Ordering::SeqCst);
        let delivery = Delivery {
            payload: payload.into(),
            attempt: 0,
        };
        if let Err(e) = self.enqueue(topic, delivery).await {
            self.settle();
            return Err(e);
        }
        debug!("Published message to {}", topic);
        Ok(())
    }
}
