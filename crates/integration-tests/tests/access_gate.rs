//! Access gate decisions across a full session.

use shopfront_client::{GateDecision, Route};
use shopfront_core::ProductId;
use shopfront_integration_tests::TestContext;

#[tokio::test]
async fn test_protected_view_renders_only_while_logged_in() {
    let mut ctx = TestContext::new().await;
    let _login = ctx.mock_login_success("alice").await;
    let storefront = &ctx.storefront;
    let gate = storefront.gate();

    let redirect = gate
        .guard(storefront.session(), "/cart", |route| route)
        .expect_err("cart rendered while logged out");
    assert_eq!(redirect.location(), "/login?returnTo=%2Fcart");

    storefront.session().login(&ctx.credentials("alice")).await;
    assert_eq!(
        gate.check(storefront.session(), "/products/5"),
        GateDecision::Render(Route::ProductDetail(ProductId::new(5)))
    );

    storefront.session().logout();
    assert!(matches!(
        gate.check(storefront.session(), "/admin"),
        GateDecision::Redirect(_)
    ));
}

#[tokio::test]
async fn test_stored_tokens_alone_do_not_open_the_gate() {
    let mut ctx = TestContext::new().await;
    let _login = ctx.mock_login_success("alice").await;
    ctx.storefront
        .session()
        .login(&ctx.credentials("alice"))
        .await;

    let restarted = ctx.restart();
    assert!(matches!(
        restarted.gate().check(restarted.session(), "/cart"),
        GateDecision::Redirect(_)
    ));
}

#[tokio::test]
async fn test_login_route_is_always_reachable() {
    let ctx = TestContext::new().await;
    assert_eq!(
        ctx.storefront.gate().check(ctx.storefront.session(), "/login"),
        GateDecision::Render(Route::Login("/login".to_string()))
    );
}
