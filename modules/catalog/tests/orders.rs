#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::net::IpAddr;

use catalog::{
    Account, AccountRef, CatalogConfig, ErrorKind, NewOrder, Order, OrderItem, OrderPatch,
    OrderStatus, RequestContext, Shop,
};
use catalog_db::DBRunner;
use common::Harness;
use uuid::Uuid;

fn items(lines: &[(&str, u32)]) -> Vec<OrderItem> {
    lines
        .iter()
        .map(|(d, q)| OrderItem::new(*d, *q, 10.0))
        .collect()
}

fn by_name(name: &str, lines: &[(&str, u32)]) -> NewOrder {
    NewOrder::new(AccountRef::Name(name.to_owned()), items(lines))
}

fn ip(raw: &str) -> IpAddr {
    raw.parse().unwrap()
}

#[tokio::test]
async fn test_sequential_numbers_per_shop() {
    let h = Harness::new();
    let shop = h.shop("corner").await;
    let other = h.shop("elsewhere").await;
    let ctx = RequestContext::new(Uuid::now_v7());
    let orders = &h.services.orders;

    let first = orders
        .create_order(&ctx, shop.id, by_name("ann", &[("1g", 1)]))
        .await
        .unwrap();
    let second = orders
        .create_order(&ctx, shop.id, by_name("bob", &[("1g", 1)]))
        .await
        .unwrap();
    let elsewhere = orders
        .create_order(&ctx, other.id, by_name("cy", &[("1g", 1)]))
        .await
        .unwrap();

    assert_eq!(first.customer_order_id, 1);
    assert_eq!(second.customer_order_id, 2);
    assert_eq!(elsewhere.customer_order_id, 1);
    assert_eq!(first.status, OrderStatus::Pending);
    assert!(first.completed_at.is_none());
}

#[tokio::test]
async fn test_weight_limit() {
    let h = Harness::new();
    let shop = h.shop("corner").await;
    let ctx = RequestContext::new(Uuid::now_v7());
    let orders = &h.services.orders;

    let ok = orders
        .create_order(&ctx, shop.id, by_name("ann", &[("1g", 4), ("joint", 1)]))
        .await
        .unwrap();
    assert!((ok.total - 50.0).abs() < 1e-9);

    orders
        .create_order(&ctx, shop.id, by_name("ann", &[("2.5g", 2)]))
        .await
        .unwrap();

    let err = orders
        .create_order(&ctx, shop.id, by_name("ann", &[("5g", 1), ("1g", 1)]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::LimitExceeded);

    let mut config = CatalogConfig::default();
    config.unit_weights.insert("0.01g".to_owned(), 0.01);
    let h = Harness::with_config(config);
    let shop = h.shop("corner").await;
    let err = h
        .services
        .orders
        .create_order(&ctx, shop.id, by_name("ann", &[("5g", 1), ("0.01g", 1)]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::LimitExceeded);
}

#[tokio::test]
async fn test_rejected_order_creates_no_account() {
    let h = Harness::new();
    let shop = h.shop("corner").await;
    let ctx = RequestContext::new(Uuid::now_v7());

    h.services
        .orders
        .create_order(&ctx, shop.id, by_name("newcomer", &[("5g", 2)]))
        .await
        .unwrap_err();

    assert!(h.all::<Account>().await.is_empty());
    assert!(h.all::<Order>().await.is_empty());
}

#[tokio::test]
async fn test_unknown_shop_and_foreign_account() {
    let h = Harness::new();
    let shop = h.shop("corner").await;
    let other = h.shop("elsewhere").await;
    let stranger = h.insert(Account::new(other.id, "stranger")).await;
    let ctx = RequestContext::new(Uuid::now_v7());

    let err = h
        .services
        .orders
        .create_order(&ctx, Uuid::now_v7(), by_name("ann", &[]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let order = NewOrder::new(AccountRef::Id(stranger.id), items(&[("1g", 1)]));
    let err = h
        .services
        .orders
        .create_order(&ctx, shop.id, order)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_existing_account_is_reused() {
    let h = Harness::new();
    let shop = h.shop("corner").await;
    let regular = h.insert(Account::new(shop.id, "regular")).await;
    let ctx = RequestContext::new(Uuid::now_v7());

    let order = h
        .services
        .orders
        .create_order(
            &ctx,
            shop.id,
            NewOrder::new(AccountRef::Id(regular.id), items(&[("1g", 1)])),
        )
        .await
        .unwrap();

    assert_eq!(order.account_id, regular.id);
    assert_eq!(h.all::<Account>().await.len(), 1);
}

#[tokio::test]
async fn test_allow_list() {
    let h = Harness::new();
    let shop = h
        .insert(Shop::new("locked").with_allowed_ips(["192.168.1.10"]))
        .await;
    let actor = Uuid::now_v7();
    let orders = &h.services.orders;

    let allowed = RequestContext::new(actor).with_origin(ip("192.168.1.10"));
    orders
        .create_order(&allowed, shop.id, by_name("ann", &[("1g", 1)]))
        .await
        .unwrap();

    let denied = RequestContext::new(actor).with_origin(ip("192.168.1.11"));
    let err = orders
        .create_order(&denied, shop.id, by_name("ann", &[("1g", 1)]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let unknown_origin = RequestContext::new(actor);
    let err = orders
        .create_order(&unknown_origin, shop.id, by_name("ann", &[("1g", 1)]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
}

#[tokio::test]
async fn test_test_identity_bypasses_allow_list_and_completes() {
    let h = Harness::new();
    let shop = h
        .insert(Shop::new("locked").with_allowed_ips(["192.168.1.10"]))
        .await;
    let actor = Uuid::now_v7();
    let ctx = RequestContext::new(actor)
        .with_origin(ip("10.9.9.9"))
        .as_test_identity();

    let order = h
        .services
        .orders
        .create_order(&ctx, shop.id, by_name("qa", &[("1g", 1)]))
        .await
        .unwrap();

    assert_eq!(order.status, OrderStatus::Complete);
    assert!(order.completed_at.is_some());
    assert_eq!(order.completed_by, Some(actor));
    assert_eq!(h.notifier.channels(), vec!["orders.completed".to_owned()]);
}

#[tokio::test]
async fn test_unrecognised_initial_status_is_pending() {
    let h = Harness::new();
    let shop = h.shop("corner").await;
    let ctx = RequestContext::new(Uuid::now_v7());

    let order = h
        .services
        .orders
        .create_order(
            &ctx,
            shop.id,
            by_name("ann", &[("1g", 1)]).with_status("shipped"),
        )
        .await
        .unwrap();

    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(h.notifier.channels(), vec!["orders.pending".to_owned()]);
}

#[tokio::test]
async fn test_completion_metadata_first_write_wins() {
    let h = Harness::new();
    let shop = h.shop("corner").await;
    let actor_a = Uuid::now_v7();
    let first_ctx = RequestContext::new(actor_a);
    let second_ctx = RequestContext::new(Uuid::now_v7());
    let orders = &h.services.orders;

    let order = orders
        .create_order(&first_ctx, shop.id, by_name("ann", &[("1g", 1)]))
        .await
        .unwrap();

    let done = orders
        .set_order_status(&first_ctx, order.id, OrderStatus::Complete)
        .await
        .unwrap();
    let again = orders
        .set_order_status(&second_ctx, order.id, OrderStatus::Complete)
        .await
        .unwrap();

    assert_eq!(done.completed_by, Some(actor_a));
    assert_eq!(again.completed_by, Some(actor_a));
    assert_eq!(again.completed_at, done.completed_at);
}

#[tokio::test]
async fn test_terminal_status_cannot_change() {
    let h = Harness::new();
    let shop = h.shop("corner").await;
    let ctx = RequestContext::new(Uuid::now_v7());
    let orders = &h.services.orders;

    let order = orders
        .create_order(&ctx, shop.id, by_name("ann", &[("1g", 1)]))
        .await
        .unwrap();
    orders
        .set_order_status(&ctx, order.id, OrderStatus::Cancelled)
        .await
        .unwrap();

    let err = orders
        .set_order_status(&ctx, order.id, OrderStatus::Complete)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let err = orders
        .set_order_status(&ctx, order.id, OrderStatus::Pending)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[tokio::test]
async fn test_transition_notifications() {
    let h = Harness::new();
    let shop = h.shop("corner").await;
    let ctx = RequestContext::new(Uuid::now_v7());
    let orders = &h.services.orders;

    let order = orders
        .create_order(&ctx, shop.id, by_name("ann", &[("1g", 1)]))
        .await
        .unwrap();
    h.notifier.clear();

    orders
        .set_order_status(&ctx, order.id, OrderStatus::Complete)
        .await
        .unwrap();
    assert_eq!(
        h.notifier.channels(),
        vec!["orders.pending".to_owned(), "orders.completed".to_owned()]
    );
    let sent = h.notifier.sent();
    let (_, payload) = &sent[1];
    assert_eq!(payload["status"], "complete");
    assert_eq!(payload["customer_order_id"], 1);

    h.notifier.clear();
    orders
        .set_order_status(&ctx, order.id, OrderStatus::Complete)
        .await
        .unwrap();
    assert!(h.notifier.channels().is_empty());
}

#[tokio::test]
async fn test_partial_update_keeps_absent_fields() {
    let h = Harness::new();
    let shop = h.shop("corner").await;
    let ctx = RequestContext::new(Uuid::now_v7());
    let orders = &h.services.orders;

    let order = orders
        .create_order(
            &ctx,
            shop.id,
            by_name("ann", &[("1g", 2)]).with_notes("ring twice"),
        )
        .await
        .unwrap();

    let patched = orders
        .update_order(
            &ctx,
            order.id,
            OrderPatch {
                total: Some(15.0),
                ..OrderPatch::default()
            },
        )
        .await
        .unwrap();
    assert!((patched.total - 15.0).abs() < 1e-9);
    assert_eq!(patched.notes.as_deref(), Some("ring twice"));
    assert_eq!(patched.items, order.items);
    assert_eq!(patched.status, OrderStatus::Pending);

    let patched = orders
        .update_order(
            &ctx,
            order.id,
            OrderPatch {
                items: Some(items(&[("joint", 3)])),
                ..OrderPatch::default()
            },
        )
        .await
        .unwrap();
    assert!((patched.total - 30.0).abs() < 1e-9);
    assert_eq!(patched.notes.as_deref(), Some("ring twice"));
}

#[tokio::test]
async fn test_update_rejects_heavy_items_and_bad_total() {
    let h = Harness::new();
    let shop = h.shop("corner").await;
    let ctx = RequestContext::new(Uuid::now_v7());
    let orders = &h.services.orders;
    let order = orders
        .create_order(&ctx, shop.id, by_name("ann", &[("1g", 1)]))
        .await
        .unwrap();

    let heavy = OrderPatch {
        items: Some(items(&[("5g", 2)])),
        ..OrderPatch::default()
    };
    let err = orders
        .update_order(&ctx, order.id, heavy)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::LimitExceeded);

    let negative = OrderPatch {
        total: Some(-1.0),
        ..OrderPatch::default()
    };
    let err = orders
        .update_order(&ctx, order.id, negative)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    let err = orders
        .set_order_status(&ctx, Uuid::now_v7(), OrderStatus::Complete)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_taken_number_is_skipped() {
    let h = Harness::new();
    let shop = h.shop("corner").await;
    let ctx = RequestContext::new(Uuid::now_v7());
    let orders = &h.services.orders;

    let first = orders
        .create_order(&ctx, shop.id, by_name("ann", &[("1g", 1)]))
        .await
        .unwrap();
    orders
        .create_order(&ctx, shop.id, by_name("bob", &[("1g", 1)]))
        .await
        .unwrap();
    let conn = h.db.conn().unwrap();
    conn.delete::<Order>(first.id).await.unwrap();

    let third = orders
        .create_order(&ctx, shop.id, by_name("cy", &[("1g", 1)]))
        .await
        .unwrap();
    assert_eq!(third.customer_order_id, 3);
}

#[tokio::test]
async fn test_deletes_beyond_retry_budget_keep_numbering() {
    let mut config = CatalogConfig::default();
    config.order_sequence_retries = 1;
    let h = Harness::with_config(config);
    let shop = h.shop("corner").await;
    let ctx = RequestContext::new(Uuid::now_v7());
    let orders = &h.services.orders;

    let mut created = Vec::new();
    for _ in 0..10 {
        let order = orders
            .create_order(&ctx, shop.id, by_name("ann", &[("1g", 1)]))
            .await
            .unwrap();
        created.push(order);
    }
    let conn = h.db.conn().unwrap();
    for order in &created[..5] {
        conn.delete::<Order>(order.id).await.unwrap();
    }

    let mut numbers = Vec::new();
    for _ in 0..3 {
        let order = orders
            .create_order(&ctx, shop.id, by_name("bob", &[("1g", 1)]))
            .await
            .unwrap();
        numbers.push(order.customer_order_id);
    }
    assert_eq!(numbers, vec![11, 12, 13]);
}
