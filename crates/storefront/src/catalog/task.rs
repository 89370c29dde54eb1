//! Running the reconciler on its own task.
//!
//! The task is the only owner of the cache. Callers go through a
//! [`CatalogHandle`], which forwards commands over a channel and reads the
//! home and shop markup from `watch` receivers.

use std::time::Duration;

use dry_core::{CurrencyCode, Product, ProductId};
use futures::StreamExt;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tracing::{error, info, instrument, warn};

use super::filter::ProductFilter;
use super::reconciler::{CatalogReconciler, CatalogState};
use super::render::RenderError;
use super::views::{ViewId, ViewKind};
use super::{FetchError, PRODUCTS_TABLE, ProductSource};
use crate::feed::{ChangeFeed, ChangePayload, ChangeStream};

/// Tuning for the reconciler task.
#[derive(Debug, Clone)]
pub struct CatalogOptions {
    /// Table to subscribe to.
    pub table: String,
    pub currency: CurrencyCode,
    /// Pause between a feed ending and the next subscription attempt.
    pub resubscribe_delay: Duration,
    /// Commands that may queue before callers wait.
    pub command_buffer: usize,
}

impl Default for CatalogOptions {
    fn default() -> Self {
        Self {
            table: PRODUCTS_TABLE.to_string(),
            currency: CurrencyCode::default(),
            resubscribe_delay: Duration::from_secs(1),
            command_buffer: 32,
        }
    }
}

/// Errors from talking to the reconciler task.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog task has stopped")]
    Stopped,

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

enum CatalogCommand {
    SetFilter {
        view: ViewId,
        filter: ProductFilter,
        reply: oneshot::Sender<Result<Option<String>, RenderError>>,
    },
    Lookup {
        id: ProductId,
        reply: oneshot::Sender<Option<Product>>,
    },
    Detail {
        id: ProductId,
        reply: oneshot::Sender<Result<Option<String>, RenderError>>,
    },
    List {
        filter: ProductFilter,
        reply: oneshot::Sender<Vec<Product>>,
    },
    Reload {
        reply: oneshot::Sender<Result<usize, FetchError>>,
    },
    State {
        reply: oneshot::Sender<CatalogState>,
    },
}

/// Cloneable front for a running reconciler.
#[derive(Clone)]
pub struct CatalogHandle {
    commands: mpsc::Sender<CatalogCommand>,
    home: watch::Receiver<String>,
    shop: watch::Receiver<String>,
}

impl CatalogHandle {
    /// Start a reconciler for `source` fed by `feed`.
    ///
    /// The task loads the catalog, subscribes to changes if the load worked,
    /// then serves commands until every handle is dropped.
    pub fn spawn<S, F>(source: S, feed: F, options: CatalogOptions) -> (Self, JoinHandle<()>)
    where
        S: ProductSource,
        F: ChangeFeed,
    {
        let (home_tx, home) = watch::channel(String::new());
        let (shop_tx, shop) = watch::channel(String::new());
        let (commands, rx) = mpsc::channel(options.command_buffer.max(1));

        let mut reconciler = CatalogReconciler::new(source, options.currency);
        reconciler.mount(ViewId::HOME, ViewKind::Home, ProductFilter::all(), home_tx);
        reconciler.mount(ViewId::SHOP, ViewKind::Shop, ProductFilter::all(), shop_tx);

        let task = tokio::spawn(run(reconciler, feed, options, rx));

        (
            Self {
                commands,
                home,
                shop,
            },
            task,
        )
    }

    /// Current home page sections.
    #[must_use]
    pub fn home(&self) -> String {
        self.home.borrow().clone()
    }

    /// Current shop grid, with whatever filter was applied last.
    #[must_use]
    pub fn shop_markup(&self) -> String {
        self.shop.borrow().clone()
    }

    /// Receiver that sees every re-render of `view`.
    #[must_use]
    pub fn watch(&self, view: ViewId) -> Option<watch::Receiver<String>> {
        match view {
            ViewId::HOME => Some(self.home.clone()),
            ViewId::SHOP => Some(self.shop.clone()),
            _ => None,
        }
    }

    /// Apply `filter` to the shop view and return the fresh grid.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the task has stopped or rendering failed.
    pub async fn shop(&self, filter: ProductFilter) -> Result<String, CatalogError> {
        let markup = self
            .request(|reply| CatalogCommand::SetFilter {
                view: ViewId::SHOP,
                filter,
                reply,
            })
            .await??;
        Ok(markup.unwrap_or_default())
    }

    /// Look up a cached product.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Stopped` if the task has stopped.
    pub async fn product(&self, id: ProductId) -> Result<Option<Product>, CatalogError> {
        self.request(|reply| CatalogCommand::Lookup { id, reply })
            .await
    }

    /// Render a product's detail panel.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the task has stopped or rendering failed.
    pub async fn detail(&self, id: ProductId) -> Result<Option<String>, CatalogError> {
        Ok(self
            .request(|reply| CatalogCommand::Detail { id, reply })
            .await??)
    }

    /// Cached products passing `filter`, in id order.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Stopped` if the task has stopped.
    pub async fn list(&self, filter: ProductFilter) -> Result<Vec<Product>, CatalogError> {
        self.request(|reply| CatalogCommand::List { filter, reply })
            .await
    }

    /// Re-run the full load.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the task has stopped or the fetch failed.
    pub async fn reload(&self) -> Result<usize, CatalogError> {
        Ok(self.request(|reply| CatalogCommand::Reload { reply }).await??)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::Stopped` if the task has stopped.
    pub async fn state(&self) -> Result<CatalogState, CatalogError> {
        self.request(|reply| CatalogCommand::State { reply }).await
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> CatalogCommand,
    ) -> Result<T, CatalogError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| CatalogError::Stopped)?;
        rx.await.map_err(|_| CatalogError::Stopped)
    }
}

impl std::fmt::Debug for CatalogHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogHandle")
            .field("closed", &self.commands.is_closed())
            .finish_non_exhaustive()
    }
}

#[instrument(skip_all, fields(table = %options.table))]
async fn run<S, F>(
    mut reconciler: CatalogReconciler<S>,
    feed: F,
    options: CatalogOptions,
    mut commands: mpsc::Receiver<CatalogCommand>,
) where
    S: ProductSource,
    F: ChangeFeed,
{
    // Initial load failures wait for an explicit reload.
    let loaded = reconciler.load().await.is_ok();
    let mut stream = if loaded {
        subscribe(&feed, &options.table).await
    } else {
        None
    };
    // A loaded catalog whose subscription failed keeps retrying on the timer.
    let mut resubscribe_at =
        (loaded && stream.is_none()).then(|| Instant::now() + options.resubscribe_delay);

    loop {
        tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else { break };
                let reloaded = handle(&mut reconciler, command).await == Some(true);
                if reloaded && stream.is_none() && resubscribe_at.is_none() {
                    stream = subscribe(&feed, &options.table).await;
                    if stream.is_none() {
                        resubscribe_at = Some(Instant::now() + options.resubscribe_delay);
                    }
                }
            }
            payload = next_change(&mut stream) => match payload {
                Some(payload) => {
                    reconciler.receive(payload);
                }
                None => {
                    warn!("Change feed ended, resubscribing");
                    stream = None;
                    resubscribe_at = Some(Instant::now() + options.resubscribe_delay);
                }
            },
            () = sleep_until(resubscribe_at.unwrap_or_else(Instant::now)), if resubscribe_at.is_some() => {
                match subscribe(&feed, &options.table).await {
                    Some(fresh) => {
                        stream = Some(fresh);
                        resubscribe_at = None;
                        if let Err(e) = reconciler.load().await {
                            warn!(error = %e, "Reload after resubscribe failed");
                        }
                    }
                    None => {
                        resubscribe_at = Some(Instant::now() + options.resubscribe_delay);
                    }
                }
            }
        }
    }

    info!("Catalog task stopped");
}

/// Serve one command. Returns `Some(true)` after a successful reload.
async fn handle<S: ProductSource>(
    reconciler: &mut CatalogReconciler<S>,
    command: CatalogCommand,
) -> Option<bool> {
    match command {
        CatalogCommand::SetFilter {
            view,
            filter,
            reply,
        } => {
            let _ = reply.send(reconciler.set_filter(view, filter));
            None
        }
        CatalogCommand::Lookup { id, reply } => {
            let _ = reply.send(reconciler.get(id).cloned());
            None
        }
        CatalogCommand::Detail { id, reply } => {
            let _ = reply.send(reconciler.render_detail(id));
            None
        }
        CatalogCommand::List { filter, reply } => {
            let products = if reconciler.state() == CatalogState::Failed {
                Vec::new()
            } else {
                filter
                    .apply(reconciler.products())
                    .into_iter()
                    .cloned()
                    .collect()
            };
            let _ = reply.send(products);
            None
        }
        CatalogCommand::Reload { reply } => {
            let result = reconciler.load().await;
            let ok = result.is_ok();
            let _ = reply.send(result);
            Some(ok)
        }
        CatalogCommand::State { reply } => {
            let _ = reply.send(reconciler.state());
            None
        }
    }
}

async fn subscribe<F: ChangeFeed>(feed: &F, table: &str) -> Option<ChangeStream> {
    match feed.subscribe(table).await {
        Ok(stream) => Some(stream),
        Err(e) => {
            error!(error = %e, "Change feed subscription failed");
            None
        }
    }
}

/// Next payload from the feed; never resolves while unsubscribed.
async fn next_change(stream: &mut Option<ChangeStream>) -> Option<ChangePayload> {
    match stream {
        Some(stream) => stream.next().await,
        None => std::future::pending().await,
    }
}
