//! Downstream contract for finished bundles

use super::queue::QueueSender;
use crate::domain::{Bundle, CityKmlError, Result};
use async_trait::async_trait;

/// Receives every bundle the workers produce
///
/// Ownership of the bundle passes to the sink.
#[async_trait]
pub trait BundleSink: Send + Sync {
    /// Hands one bundle downstream
    ///
    /// # Errors
    ///
    /// Returns an error if the bundle can no longer be accepted.
    async fn send(&self, bundle: Bundle) -> Result<()>;
}

/// Sink feeding a bounded bundle queue
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: QueueSender<Bundle>,
}

impl ChannelSink {
    pub fn new(sender: QueueSender<Bundle>) -> Self {
        Self { sender }
    }
}

#[async_trait]
impl BundleSink for ChannelSink {
    async fn send(&self, bundle: Bundle) -> Result<()> {
        self.sender.send(bundle).await.map_err(|bundle| {
            CityKmlError::Export(format!(
                "Bundle receiver closed, dropping bundle {}",
                bundle.representative_id
            ))
        })
    }
}
