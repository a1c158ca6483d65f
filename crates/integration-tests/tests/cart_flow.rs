//! Cart mutations against live stock.

#![allow(clippy::unwrap_used)]

use mockito::Matcher;
use partstore_client::{ApiError, Disposition};
use partstore_core::ProductId;
use partstore_integration_tests::TestContext;

#[tokio::test]
async fn test_add_within_stock_then_view() {
    let mut ctx = TestContext::new([]).await;
    ctx.sign_in();
    let _product = ctx.product("p1", 4, 25).await;
    let add = ctx
        .server
        .mock("POST", "/buyer/cart/add")
        .match_header("authorization", "Bearer test-token")
        .match_body(Matcher::Json(
            serde_json::json!({"productId": "p1", "quantity": 4}),
        ))
        .with_status(200)
        .with_body(r#"{"success":true}"#)
        .expect(1)
        .create_async()
        .await;
    let _cart = ctx.cart(&[("p1", 4, 25)]).await;

    let cart = ctx
        .storefront
        .cart()
        .add_to_cart(&ProductId::new("p1"), 4)
        .await
        .unwrap();

    add.assert_async().await;
    let line = cart.item(&ProductId::new("p1")).unwrap();
    assert_eq!(line.quantity, 4);
    assert_eq!(cart.total, cart.computed_total());
}

#[tokio::test]
async fn test_over_stock_leaves_cart_untouched() {
    let mut ctx = TestContext::new([]).await;
    ctx.sign_in();
    let _product = ctx.product("p1", 2, 25).await;
    let mutations = ctx
        .server
        .mock("POST", "/buyer/cart/add")
        .expect(0)
        .create_async()
        .await;

    let err = ctx
        .storefront
        .cart()
        .add_to_cart(&ProductId::new("p1"), 3)
        .await
        .unwrap_err();

    mutations.assert_async().await;
    assert_eq!(err.disposition(), Disposition::Inline);
    match err {
        ApiError::InsufficientStock {
            requested,
            available,
            ..
        } => {
            assert_eq!(requested, 3);
            assert_eq!(available, 2);
        }
        other => panic!("expected InsufficientStock, got {other:?}"),
    }
}

#[tokio::test]
async fn test_update_sees_fresh_stock() {
    let mut ctx = TestContext::new([]).await;
    ctx.sign_in();

    // Stock drops between the first read and the update.
    let first = ctx.product("p1", 5, 10).await;
    ctx.storefront
        .catalog()
        .get_product(&ProductId::new("p1"))
        .await
        .unwrap();
    first.remove_async().await;
    let _fresh = ctx.product("p1", 1, 10).await;
    let update = ctx
        .server
        .mock("PUT", "/buyer/cart/update")
        .expect(0)
        .create_async()
        .await;

    let err = ctx
        .storefront
        .cart()
        .update_cart_item(&ProductId::new("p1"), 3)
        .await
        .unwrap_err();

    update.assert_async().await;
    assert!(matches!(err, ApiError::InsufficientStock { available: 1, .. }));
}

#[tokio::test]
async fn test_remove_then_clear() {
    let mut ctx = TestContext::new([]).await;
    ctx.sign_in();
    let remove = ctx
        .server
        .mock("DELETE", "/buyer/cart/remove/p1")
        .with_status(200)
        .with_body(r#"{"success":true}"#)
        .create_async()
        .await;
    let clear = ctx
        .server
        .mock("DELETE", "/buyer/cart/clear")
        .with_status(200)
        .with_body(r#"{"success":true}"#)
        .expect(2)
        .create_async()
        .await;
    let _cart = ctx.cart(&[]).await;

    let cart = ctx.storefront.cart();
    assert!(cart.remove_from_cart(&ProductId::new("p1")).await.unwrap().is_empty());
    assert!(cart.clear_cart().await.unwrap().is_empty());
    assert!(cart.clear_cart().await.unwrap().is_empty());

    remove.assert_async().await;
    clear.assert_async().await;
}

#[tokio::test]
async fn test_signed_out_cart_calls_send_nothing() {
    let mut ctx = TestContext::new([]).await;
    let any = ctx
        .server
        .mock("GET", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let err = ctx.storefront.cart().view_cart().await.unwrap_err();

    any.assert_async().await;
    assert!(matches!(err, ApiError::Unauthenticated(_)));
    assert_eq!(err.disposition(), Disposition::RedirectToLogin);
}
