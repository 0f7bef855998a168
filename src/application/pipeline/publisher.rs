//! Notification publishers - strategies for running listener deliveries

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::{join_all, BoxFuture};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::application::errors::{ConfigError, MediatorError, MediatorResult};

/// One listener's handling of one notification, not yet started
pub type Delivery<'a> = BoxFuture<'a, MediatorResult<()>>;

/// Decides how the deliveries of a single publish are run
#[async_trait]
pub trait NotificationPublisher: Send + Sync {
    async fn publish(&self, deliveries: Vec<Delivery<'_>>) -> MediatorResult<()>;
}

/// Runs deliveries one at a time, in listener order.
///
/// Each delivery completes before the next begins; the first failure stops
/// the publish and later listeners are never invoked.
#[derive(Debug, Default, Clone, Copy)]
pub struct SequentialPublisher;

#[async_trait]
impl NotificationPublisher for SequentialPublisher {
    async fn publish(&self, deliveries: Vec<Delivery<'_>>) -> MediatorResult<()> {
        for delivery in deliveries {
            delivery.await?;
        }
        Ok(())
    }
}

/// Starts every delivery before awaiting any of them, then waits for all.
///
/// A single failure is returned as it is; several are combined into
/// [`MediatorError::Aggregate`].
#[derive(Debug, Default, Clone, Copy)]
pub struct ConcurrentPublisher;

#[async_trait]
impl NotificationPublisher for ConcurrentPublisher {
    async fn publish(&self, deliveries: Vec<Delivery<'_>>) -> MediatorResult<()> {
        let count = deliveries.len();
        let mut failures: Vec<MediatorError> = join_all(deliveries)
            .await
            .into_iter()
            .filter_map(Result::err)
            .collect();

        match failures.len() {
            0 => Ok(()),
            1 => Err(failures.remove(0)),
            n => {
                debug!("{} of {} notification deliveries failed", n, count);
                Err(MediatorError::Aggregate(failures))
            }
        }
    }
}

/// Which publisher a mediator is built with
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublisherStrategy {
    #[default]
    Sequential,
    Concurrent,
}

impl PublisherStrategy {
    pub fn publisher(self) -> Arc<dyn NotificationPublisher> {
        match self {
            PublisherStrategy::Sequential => Arc::new(SequentialPublisher),
            PublisherStrategy::Concurrent => Arc::new(ConcurrentPublisher),
        }
    }
}

impl fmt::Display for PublisherStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublisherStrategy::Sequential => write!(f, "sequential"),
            PublisherStrategy::Concurrent => write!(f, "concurrent"),
        }
    }
}

impl FromStr for PublisherStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sequential" => Ok(PublisherStrategy::Sequential),
            "concurrent" => Ok(PublisherStrategy::Concurrent),
            other => Err(ConfigError::InvalidValue(format!(
                "publisher must be sequential or concurrent, got {}",
                other
            ))),
        }
    }
}
