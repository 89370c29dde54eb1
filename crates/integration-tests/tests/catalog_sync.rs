//! Catalog loading, change application and view updates.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use dry_core::{CurrencyCode, ProductId, StockStatus};
use dry_integration_tests::{FakeSource, eventually, fast_options, product, sample_catalog};
use dry_storefront::catalog::{
    Badge, CatalogHandle, CatalogReconciler, CatalogState, PRODUCTS_TABLE, ProductFilter, ViewId,
    ViewKind, render_grid,
};
use dry_storefront::feed::{ChangeFeed, ChangePayload, FeedError, WebhookFeed};
use futures::StreamExt;
use rust_decimal::Decimal;
use tokio::sync::watch;

async fn ready_reconciler() -> CatalogReconciler<FakeSource> {
    let mut reconciler =
        CatalogReconciler::new(FakeSource::serving(Vec::new()), CurrencyCode::AED);
    reconciler.load().await.unwrap();
    reconciler
}

#[tokio::test]
async fn insert_then_update_keeps_latest_price() {
    let mut reconciler = ready_reconciler().await;

    assert!(reconciler.receive(ChangePayload::insert(PRODUCTS_TABLE, &product(5, "Deck", 10)).unwrap()));
    assert!(reconciler.receive(ChangePayload::update(PRODUCTS_TABLE, &product(5, "Deck", 20)).unwrap()));

    assert_eq!(reconciler.len(), 1);
    assert_eq!(
        reconciler.get(ProductId::new(5)).unwrap().price,
        Decimal::from(20)
    );
}

#[tokio::test]
async fn insert_then_delete_removes_product() {
    let mut reconciler = ready_reconciler().await;

    reconciler.receive(ChangePayload::insert(PRODUCTS_TABLE, &product(5, "Deck", 10)).unwrap());
    reconciler.receive(ChangePayload::delete(PRODUCTS_TABLE, ProductId::new(5)));

    assert!(reconciler.get(ProductId::new(5)).is_none());
    assert!(reconciler.is_empty());
}

#[tokio::test]
async fn malformed_change_is_dropped_without_mutation() {
    let mut reconciler = ready_reconciler().await;
    let mut payload = ChangePayload::insert(PRODUCTS_TABLE, &product(9, "Deck", 10)).unwrap();
    payload.record = None;

    assert!(!reconciler.receive(payload));
    assert!(reconciler.is_empty());
}

#[tokio::test]
async fn changes_rerender_each_view_with_its_own_filter() {
    let mut reconciler = ready_reconciler().await;
    let (sale_tx, sale_rx) = watch::channel(String::new());
    let (all_tx, all_rx) = watch::channel(String::new());
    reconciler.mount(
        ViewId::new("sale"),
        ViewKind::Shop,
        ProductFilter::all().on_sale(true),
        sale_tx,
    );
    reconciler.mount(ViewId::new("all"), ViewKind::Shop, ProductFilter::all(), all_tx);

    let mut deal = product(7, "Bargain Deck", 300);
    deal.sale_price = Some(Decimal::from(200));
    reconciler.receive(ChangePayload::insert(PRODUCTS_TABLE, &deal).unwrap());
    reconciler.receive(ChangePayload::insert(PRODUCTS_TABLE, &product(8, "Full Price Deck", 300)).unwrap());

    let sale = sale_rx.borrow().clone();
    let all = all_rx.borrow().clone();
    assert!(sale.contains("Bargain Deck"));
    assert!(!sale.contains("Full Price Deck"));
    assert!(all.contains("Bargain Deck"));
    assert!(all.contains("Full Price Deck"));
}

#[test]
fn badge_precedence() {
    let mut sold_out = product(1, "Deck", 100);
    sold_out.stock = 0;
    sold_out.rating = Some(5.0);
    assert_eq!(Badge::for_product(&sold_out), Badge::SoldOut);

    let mut low = product(2, "Deck", 100);
    low.stock = 5;
    low.sale_price = Some(Decimal::from(80));
    assert_eq!(Badge::for_product(&low), Badge::LowStock);

    let mut soon = product(3, "Deck", 100);
    soon.stock_status = StockStatus::ComingSoon;
    soon.stock = 3;
    assert_eq!(Badge::for_product(&soon), Badge::ComingSoon);
}

#[test]
fn boards_on_sale_filter_ignores_featured_flag() {
    let mut sale_featured = product(1, "A", 100);
    sale_featured.sale_price = Some(Decimal::from(90));
    sale_featured.is_featured = true;
    let mut sale_plain = product(2, "B", 100);
    sale_plain.sale_price = Some(Decimal::from(90));
    let full_price = product(3, "C", 100);
    let mut apparel_sale = product(4, "D", 100);
    apparel_sale.category = "apparel".to_string();
    apparel_sale.sale_price = Some(Decimal::from(50));

    let products = [sale_featured, sale_plain, full_price, apparel_sale];
    let filter = ProductFilter::category("boards").on_sale(true).featured(false);
    let ids: Vec<i64> = filter
        .apply(&products)
        .iter()
        .map(|p| p.id.as_i64())
        .collect();

    assert_eq!(ids, vec![1, 2]);
}

#[test]
fn grid_render_is_deterministic() {
    let products = sample_catalog();
    let refs: Vec<_> = products.iter().collect();
    assert_eq!(
        render_grid(&refs, CurrencyCode::AED).unwrap(),
        render_grid(&refs, CurrencyCode::AED).unwrap()
    );
}

#[tokio::test]
async fn handle_applies_published_changes() {
    let feed = WebhookFeed::new(PRODUCTS_TABLE, 16);
    let (catalog, _task) =
        CatalogHandle::spawn(FakeSource::serving(sample_catalog()), feed.clone(), fast_options());
    assert_eq!(catalog.state().await.unwrap(), CatalogState::Ready);
    assert!(feed.is_subscribed().await);

    feed.publish(ChangePayload::insert(PRODUCTS_TABLE, &product(42, "Fresh Drop", 550)).unwrap())
        .await
        .unwrap();

    let handle = &catalog;
    assert!(
        eventually(|| async move {
            handle.product(ProductId::new(42)).await.unwrap().is_some()
        })
        .await
    );
    assert!(catalog.shop_markup().contains("Fresh Drop"));
}

#[tokio::test]
async fn shop_filter_returns_fresh_markup() {
    let feed = WebhookFeed::new(PRODUCTS_TABLE, 16);
    let (catalog, _task) =
        CatalogHandle::spawn(FakeSource::serving(sample_catalog()), feed, fast_options());

    let markup = catalog
        .shop(ProductFilter::category("apparel"))
        .await
        .unwrap();

    assert!(markup.contains("DRY Logo Tee"));
    assert!(!markup.contains("Neon Cruiser"));
    assert_eq!(catalog.shop_markup(), markup);
}

#[tokio::test]
async fn feed_gap_resubscribes_and_reloads() {
    let source = FakeSource::serving(sample_catalog());
    let feed = WebhookFeed::new(PRODUCTS_TABLE, 16);
    let (catalog, _task) = CatalogHandle::spawn(source.clone(), feed.clone(), fast_options());
    catalog.state().await.unwrap();
    assert_eq!(source.fetches(), 1);

    // A product added while nobody is listening only shows up via the reload.
    let mut missed = sample_catalog();
    missed.push(product(77, "Missed While Offline", 400));
    source.set(Some(missed));
    feed.disconnect().await;

    let handle = &catalog;
    assert!(
        eventually(|| async move {
            handle.product(ProductId::new(77)).await.unwrap().is_some()
        })
        .await
    );
    assert!(feed.is_subscribed().await);
    assert!(source.fetches() >= 2);
}

#[tokio::test]
async fn failed_initial_load_waits_for_manual_reload() {
    let source = FakeSource::failing();
    let feed = WebhookFeed::new(PRODUCTS_TABLE, 16);
    let (catalog, _task) = CatalogHandle::spawn(source.clone(), feed.clone(), fast_options());

    assert_eq!(catalog.state().await.unwrap(), CatalogState::Failed);
    assert!(catalog.shop_markup().contains("No products found matching filters."));
    let err = feed
        .publish(ChangePayload::delete(PRODUCTS_TABLE, ProductId::new(1)))
        .await
        .unwrap_err();
    assert!(matches!(err, FeedError::NoSubscriber));

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(source.fetches(), 1);

    source.set(Some(sample_catalog()));
    assert_eq!(catalog.reload().await.unwrap(), 5);
    assert_eq!(catalog.state().await.unwrap(), CatalogState::Ready);
    assert!(feed.is_subscribed().await);
    assert!(catalog.shop_markup().contains("Neon Cruiser"));
}

#[tokio::test]
async fn refresh_failure_keeps_ready_cache() {
    let source = FakeSource::serving(sample_catalog());
    let feed = WebhookFeed::new(PRODUCTS_TABLE, 16);
    let (catalog, _task) = CatalogHandle::spawn(source.clone(), feed, fast_options());
    catalog.state().await.unwrap();

    source.set(None);
    assert!(catalog.reload().await.is_err());

    assert_eq!(catalog.state().await.unwrap(), CatalogState::Ready);
    assert!(catalog.product(ProductId::new(1)).await.unwrap().is_some());
}

#[tokio::test]
async fn new_subscription_ends_the_previous_stream() {
    let feed = WebhookFeed::new(PRODUCTS_TABLE, 4);
    let mut first = feed.subscribe(PRODUCTS_TABLE).await.unwrap();
    let mut second = feed.subscribe(PRODUCTS_TABLE).await.unwrap();

    assert!(first.next().await.is_none());

    feed.publish(ChangePayload::delete(PRODUCTS_TABLE, ProductId::new(3)))
        .await
        .unwrap();
    let payload = second.next().await.unwrap();
    assert_eq!(payload.table, PRODUCTS_TABLE);
}
