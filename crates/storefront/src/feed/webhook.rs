//! Change feed backed by database webhooks.
//!
//! The backend POSTs each row change to the storefront; the route hands the
//! body to [`WebhookFeed::publish`], which forwards it to the current
//! subscriber over a bounded channel.

use std::sync::Arc;

use futures::stream;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, instrument};

use super::{ChangeFeed, ChangePayload, ChangeStream, FeedError};

/// Webhook-fed [`ChangeFeed`] for a single table.
///
/// Holds at most one subscriber. Subscribing again replaces the previous
/// subscription, which ends that subscriber's stream.
#[derive(Clone)]
pub struct WebhookFeed {
    inner: Arc<WebhookFeedInner>,
}

struct WebhookFeedInner {
    table: String,
    buffer: usize,
    sender: Mutex<Option<mpsc::Sender<ChangePayload>>>,
}

impl WebhookFeed {
    /// Create a feed for `table` with room for `buffer` undelivered payloads.
    #[must_use]
    pub fn new(table: impl Into<String>, buffer: usize) -> Self {
        Self {
            inner: Arc::new(WebhookFeedInner {
                table: table.into(),
                buffer: buffer.max(1),
                sender: Mutex::new(None),
            }),
        }
    }

    #[must_use]
    pub fn table(&self) -> &str {
        &self.inner.table
    }

    /// Forward `payload` to the subscriber.
    ///
    /// Payloads for other tables are ignored and reported as delivered.
    /// Waits while the subscriber's buffer is full.
    ///
    /// # Errors
    ///
    /// Returns `FeedError::NoSubscriber` if nobody has subscribed, or
    /// `FeedError::Closed` if the subscriber has gone away.
    #[instrument(skip(self, payload), fields(kind = %payload.kind, table = %payload.table))]
    pub async fn publish(&self, payload: ChangePayload) -> Result<(), FeedError> {
        if payload.table != self.inner.table {
            debug!("Ignoring change for another table");
            return Ok(());
        }

        let sender = self
            .inner
            .sender
            .lock()
            .await
            .clone()
            .ok_or(FeedError::NoSubscriber)?;

        sender.send(payload).await.map_err(|_| FeedError::Closed)
    }

    /// Drop the current subscription, ending its stream.
    pub async fn disconnect(&self) {
        if self.inner.sender.lock().await.take().is_some() {
            info!(table = %self.inner.table, "Change feed subscription dropped");
        }
    }

    /// Whether a live subscriber exists.
    pub async fn is_subscribed(&self) -> bool {
        self.inner
            .sender
            .lock()
            .await
            .as_ref()
            .is_some_and(|tx| !tx.is_closed())
    }
}

impl ChangeFeed for WebhookFeed {
    async fn subscribe(&self, table: &str) -> Result<ChangeStream, FeedError> {
        if table != self.inner.table {
            return Err(FeedError::UnknownTable(table.to_string()));
        }

        let (tx, rx) = mpsc::channel(self.inner.buffer);
        *self.inner.sender.lock().await = Some(tx);
        info!(table, "Change feed subscribed");

        Ok(Box::pin(stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|payload| (payload, rx))
        })))
    }
}

impl std::fmt::Debug for WebhookFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookFeed")
            .field("table", &self.inner.table)
            .field("buffer", &self.inner.buffer)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use dry_core::ProductId;
    use futures::StreamExt;

    use super::*;

    #[tokio::test]
    async fn test_publish_without_subscriber() {
        let feed = WebhookFeed::new("products", 4);
        let err = feed
            .publish(ChangePayload::delete("products", ProductId::new(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, FeedError::NoSubscriber));
    }

    #[tokio::test]
    async fn test_delivery_order_is_preserved() {
        let feed = WebhookFeed::new("products", 4);
        let mut stream = feed.subscribe("products").await.unwrap();

        for id in 1..=3 {
            feed.publish(ChangePayload::delete("products", ProductId::new(id)))
                .await
                .unwrap();
        }

        for id in 1..=3 {
            let payload = stream.next().await.unwrap();
            assert_eq!(
                payload.old_record,
                Some(serde_json::json!({ "id": id }))
            );
        }
    }

    #[tokio::test]
    async fn test_other_tables_are_ignored() {
        let feed = WebhookFeed::new("products", 4);
        let _stream = feed.subscribe("products").await.unwrap();
        feed.publish(ChangePayload::delete("orders", ProductId::new(1)))
            .await
            .unwrap();
        assert!(feed.subscribe("orders").await.is_err());
    }

    #[tokio::test]
    async fn test_resubscribe_ends_previous_stream() {
        let feed = WebhookFeed::new("products", 4);
        let mut first = feed.subscribe("products").await.unwrap();
        let _second = feed.subscribe("products").await.unwrap();
        assert!(first.next().await.is_none());
        assert!(feed.is_subscribed().await);

        feed.disconnect().await;
        assert!(!feed.is_subscribed().await);
    }
}
