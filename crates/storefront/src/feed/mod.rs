//! Push-based product change feed.
//!
//! The reconciler asks a [`ChangeFeed`] for a subscription and receives a
//! stream of [`ChangePayload`]s in delivery order. When the stream ends the
//! subscription is gone and the reconciler must resubscribe.

mod event;
mod webhook;

pub use event::{ChangeEvent, ChangeKind, ChangePayload, MalformedEvent};
pub use webhook::WebhookFeed;

use std::future::Future;

use futures::stream::BoxStream;
use thiserror::Error;

/// Payloads from one subscription, in delivery order.
pub type ChangeStream = BoxStream<'static, ChangePayload>;

/// Errors from a change feed.
#[derive(Debug, Error)]
pub enum FeedError {
    /// The feed was asked for a table it does not carry.
    #[error("feed does not carry table '{0}'")]
    UnknownTable(String),

    /// Nobody is listening; the payload was dropped.
    #[error("no active subscription")]
    NoSubscriber,

    /// The subscriber went away mid-delivery.
    #[error("subscription closed")]
    Closed,
}

/// A source of row-change notifications.
pub trait ChangeFeed: Send + Sync + 'static {
    /// Open a subscription to changes on `table`.
    ///
    /// # Errors
    ///
    /// Returns `FeedError` if the subscription cannot be opened.
    fn subscribe(&self, table: &str) -> impl Future<Output = Result<ChangeStream, FeedError>> + Send;
}
