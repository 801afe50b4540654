mod common;

use anyhow::Result;
use axum::http::{Method, StatusCode};
use rowgate::query::CacheScope;

fn cached_app(scope: CacheScope) -> common::TestApp {
    let mut config = common::test_config();
    config.cache.enabled = true;
    config.cache.scope = scope;
    common::test_app_with(config)
}

#[tokio::test]
async fn repeated_reads_hit_the_cache() -> Result<()> {
    let app = cached_app(CacheScope::PostUserScoping);
    app.mock.respond(r#"[{"id":1}]"#);

    let first = app.get("/api/public/products").await?;
    let second = app.get("/api/public/products").await?;
    assert_eq!(first.body, r#"[{"id":1}]"#);
    assert_eq!(second.body, first.body);
    assert_eq!(app.mock.executed().len(), 1);
    Ok(())
}

#[tokio::test]
async fn post_user_scope_separates_users() -> Result<()> {
    let app = cached_app(CacheScope::PostUserScoping);
    app.mock.respond(r#"[{"id":1}]"#);
    app.mock.respond(r#"[{"id":2}]"#);

    let alice = common::token("alice", Some("web"));
    let bob = common::token("bob", Some("web"));
    let a = app.get_as("/api/public/orders", &alice).await?;
    let b = app.get_as("/api/public/orders", &bob).await?;
    assert_eq!(a.body, r#"[{"id":1}]"#);
    assert_eq!(b.body, r#"[{"id":2}]"#);
    assert_eq!(app.mock.executed().len(), 2);
    Ok(())
}

#[tokio::test]
async fn post_role_scope_shares_within_a_role() -> Result<()> {
    let app = cached_app(CacheScope::PostRoleScoping);
    app.mock.respond(r#"[{"id":1}]"#);

    let alice = common::token("alice", Some("web"));
    let bob = common::token("bob", Some("web"));
    app.get_as("/api/public/catalog", &alice).await?;
    let b = app.get_as("/api/public/catalog", &bob).await?;
    assert_eq!(b.body, r#"[{"id":1}]"#);
    assert_eq!(app.mock.executed().len(), 1);
    Ok(())
}

#[tokio::test]
async fn writes_are_never_cached() -> Result<()> {
    let app = cached_app(CacheScope::PreRoleScoping);
    app.mock.respond(r#"{"id":"1"}"#);
    app.mock.respond(r#"{"id":"2"}"#);

    let first = app.send_json(Method::POST, "/api/shop/products", r#"{"name":"a"}"#).await?;
    let second = app.send_json(Method::POST, "/api/shop/products", r#"{"name":"a"}"#).await?;
    assert_eq!(first.status, StatusCode::CREATED);
    assert_eq!(second.body, r#"{"id":"2"}"#);
    assert_eq!(app.mock.executed().len(), 2);
    assert!(app.state.store.cache().map(|c| c.is_empty()).unwrap_or(false));
    Ok(())
}

#[tokio::test]
async fn writes_invalidate_cached_reads() -> Result<()> {
    let app = cached_app(CacheScope::PostUserScoping);
    app.mock.respond("[]");
    app.mock.respond(r#"{"id":"1","name":"a"}"#);
    app.mock.respond(r#"[{"id":"1","name":"a"}]"#);

    let before = app.get("/api/shop/products").await?;
    assert_eq!(before.body, "[]");

    let created = app.send_json(Method::POST, "/api/shop/products", r#"{"name":"a"}"#).await?;
    assert_eq!(created.status, StatusCode::CREATED);

    let after = app.get("/api/shop/products").await?;
    assert_eq!(after.body, r#"[{"id":"1","name":"a"}]"#);
    assert_eq!(app.mock.executed().len(), 3);
    Ok(())
}

#[tokio::test]
async fn deletes_invalidate_only_their_relation() -> Result<()> {
    let app = cached_app(CacheScope::PostUserScoping);
    app.mock.respond(r#"[{"id":"1"}]"#);
    app.mock.respond(r#"[{"id":"9"}]"#);
    app.mock.respond(r#"{"id":"1"}"#);
    app.mock.respond("[]");

    app.get("/api/shop/products").await?;
    app.get("/api/shop/orders").await?;
    let deleted = app.send_json(Method::DELETE, "/api/shop/products/1", "").await?;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);

    assert_eq!(app.get("/api/shop/products").await?.body, "[]");
    assert_eq!(app.get("/api/shop/orders").await?.body, r#"[{"id":"9"}]"#);
    assert_eq!(app.mock.executed().len(), 4);
    Ok(())
}

#[tokio::test]
async fn caching_disabled_by_default() -> Result<()> {
    let app = common::test_app();
    app.get("/api/public/products").await?;
    app.get("/api/public/products").await?;
    assert_eq!(app.mock.executed().len(), 2);
    assert!(app.state.store.cache().is_none());
    Ok(())
}
