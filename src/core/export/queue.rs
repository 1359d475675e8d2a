//! Shared work queue
//!
//! A bounded multi-producer, multi-consumer queue. Producers hold
//! [`QueueSender`]s; dropping the last one closes the queue. Consumers clone
//! the [`WorkQueue`] handle and compete for items through a shared receiver,
//! so every item is delivered to at most one consumer.

use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// Producer side of a [`WorkQueue`]
#[derive(Debug)]
pub struct QueueSender<T> {
    sender: mpsc::Sender<T>,
}

impl<T> Clone for QueueSender<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<T> QueueSender<T> {
    /// Enqueues an item, waiting while the queue is full
    ///
    /// # Errors
    ///
    /// Returns the item back if every consumer handle has been dropped.
    pub async fn send(&self, item: T) -> Result<(), T> {
        self.sender.send(item).await.map_err(|e| e.0)
    }

    /// Free slots right now
    pub fn available(&self) -> usize {
        self.sender.capacity()
    }
}

/// Consumer side, cheap to clone
#[derive(Debug)]
pub struct WorkQueue<T> {
    receiver: Arc<Mutex<mpsc::Receiver<T>>>,
}

impl<T> Clone for WorkQueue<T> {
    fn clone(&self) -> Self {
        Self {
            receiver: Arc::clone(&self.receiver),
        }
    }
}

impl<T> WorkQueue<T> {
    /// Creates a queue holding at most `capacity` pending items
    pub fn bounded(capacity: usize) -> (QueueSender<T>, WorkQueue<T>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (
            QueueSender { sender },
            WorkQueue {
                receiver: Arc::new(Mutex::new(receiver)),
            },
        )
    }

    /// Takes the next item
    ///
    /// Returns `None` once the queue is closed and empty. Cancel safe: if the
    /// returned future is dropped before completing, no item is lost.
    pub async fn take(&self) -> Option<T> {
        let mut receiver = self.receiver.lock().await;
        receiver.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::time::Duration;

    #[tokio::test]
    async fn test_closed_queue_drains_then_reports_empty() {
        let (sender, queue) = WorkQueue::bounded(4);
        sender.send(1).await.unwrap();
        sender.send(2).await.unwrap();
        drop(sender);

        assert_eq!(queue.take().await, Some(1));
        assert_eq!(queue.take().await, Some(2));
        assert_eq!(queue.take().await, None);
    }

    #[tokio::test]
    async fn test_each_item_is_delivered_once() {
        let (sender, queue) = WorkQueue::bounded(8);

        let consumers: Vec<_> = (0..4)
            .map(|_| {
                let queue = queue.clone();
                tokio::spawn(async move {
                    let mut seen = Vec::new();
                    while let Some(item) = queue.take().await {
                        seen.push(item);
                        tokio::task::yield_now().await;
                    }
                    seen
                })
            })
            .collect();

        for i in 0..200 {
            sender.send(i).await.unwrap();
        }
        drop(sender);

        let mut all = Vec::new();
        for consumer in consumers {
            all.extend(consumer.await.unwrap());
        }
        assert_eq!(all.len(), 200);
        assert_eq!(all.iter().collect::<HashSet<_>>().len(), 200);
    }

    #[tokio::test]
    async fn test_cancelled_take_loses_nothing() {
        let (sender, queue) = WorkQueue::<u32>::bounded(2);

        let timed_out = tokio::time::timeout(Duration::from_millis(10), queue.take()).await;
        assert!(timed_out.is_err());

        sender.send(7).await.unwrap();
        assert_eq!(queue.take().await, Some(7));
    }

    #[tokio::test]
    async fn test_send_fails_without_consumers() {
        let (sender, queue) = WorkQueue::bounded(1);
        drop(queue);
        assert_eq!(sender.send("x").await, Err("x"));
    }
}
