//! Runs against a real database only when ROWGATE_TEST_DATABASE_URL is set.

use std::sync::Arc;

use anyhow::Result;
use rowgate::config::{AppConfig, DatabaseConfig};
use rowgate::database::DatabaseManager;
use rowgate::query::{Cardinality, Predicate, Query, Relation, SecurityContext};
use rowgate::store::{PgExecutor, Store, StoreError};
use tokio_util::sync::CancellationToken;

async fn live_store() -> Result<Option<(Store, sqlx::PgPool)>> {
    live_store_with(|config| config.max_connections = 2).await
}

async fn live_store_with(tweak: impl FnOnce(&mut DatabaseConfig)) -> Result<Option<(Store, sqlx::PgPool)>> {
    let Ok(url) = std::env::var("ROWGATE_TEST_DATABASE_URL") else {
        eprintln!("ROWGATE_TEST_DATABASE_URL not set, skipping");
        return Ok(None);
    };
    let mut config = AppConfig::development().database;
    config.url = url;
    tweak(&mut config);
    let pool = DatabaseManager::connect(&config).await?;
    Ok(Some((Store::new(Arc::new(PgExecutor::new(pool.clone()))), pool)))
}

#[tokio::test]
async fn round_trip_against_postgres() -> Result<()> {
    let Some((store, pool)) = live_store().await? else {
        return Ok(());
    };
    let token = CancellationToken::new();

    sqlx::query("DROP TABLE IF EXISTS public.rowgate_items").execute(&pool).await?;
    sqlx::query("CREATE TABLE public.rowgate_items (id text PRIMARY KEY, qty int)").execute(&pool).await?;
    sqlx::query("INSERT INTO public.rowgate_items VALUES ('a', 1), ('b', 2)").execute(&pool).await?;

    let list = Query::list(Relation::new("public", "rowgate_items"))
        .filter(Predicate::any_of("qty", [2]));
    assert_eq!(store.execute(&list, &token).await?, r#"[{"id":"b","qty":2}]"#);

    let none = Query::single(Relation::new("public", "rowgate_items")).filter(Predicate::eq("id", "zz"));
    assert_eq!(store.execute(&none, &token).await?, "");

    let missing = Query::list(Relation::new("nope", "rowgate_items"));
    match store.execute(&missing, &token).await {
        Err(err @ StoreError::Database { .. }) => assert_eq!(err.status_code(), 404),
        other => panic!("expected undefined table error, got {:?}", other),
    }

    sqlx::query("DROP TABLE public.rowgate_items").execute(&pool).await?;
    pool.close().await;
    Ok(())
}

#[tokio::test]
async fn role_and_user_are_scoped_to_the_batch() -> Result<()> {
    // One connection, so every query below reuses the same session
    let Some((store, pool)) = live_store_with(|config| config.max_connections = 1).await? else {
        return Ok(());
    };
    let token = CancellationToken::new();
    let before: String = sqlx::query_scalar("SELECT current_user::text").fetch_one(&pool).await?;

    for statement in [
        "DO $$ BEGIN IF NOT EXISTS (SELECT FROM pg_roles WHERE rolname = 'rowgate_reader') THEN CREATE ROLE rowgate_reader NOLOGIN; END IF; END $$",
        "GRANT rowgate_reader TO CURRENT_USER",
        "DROP TABLE IF EXISTS public.rowgate_notes",
        "CREATE TABLE public.rowgate_notes (id text PRIMARY KEY, owner text NOT NULL)",
        "ALTER TABLE public.rowgate_notes ENABLE ROW LEVEL SECURITY",
        "CREATE POLICY rowgate_notes_owner ON public.rowgate_notes USING (owner = current_setting('my.user_id', true))",
        "GRANT USAGE ON SCHEMA public TO rowgate_reader",
        "GRANT SELECT ON public.rowgate_notes TO rowgate_reader",
        "INSERT INTO public.rowgate_notes VALUES ('a', 'u1'), ('b', 'u2')",
    ] {
        sqlx::query(statement).execute(&pool).await?;
    }

    let notes = |user: &str| {
        Query::list(Relation::new("public", "rowgate_notes"))
            .order(rowgate::query::OrderBy::asc("id"))
            .scoped(SecurityContext::new("rowgate_reader", user))
    };
    assert_eq!(store.execute(&notes("u1"), &token).await?, r#"[{"id":"a","owner":"u1"}]"#);
    assert_eq!(store.execute(&notes("u2"), &token).await?, r#"[{"id":"b","owner":"u2"}]"#);

    // The next borrower of the connection sees neither the user nor the role
    let leftover = Query::raw(
        "SELECT to_json(coalesce(current_setting('my.user_id', true), ''))",
        Cardinality::Single,
    );
    assert_eq!(store.execute(&leftover, &token).await?, r#""""#);

    let whoami = Query::raw("SELECT to_json(current_user::text)", Cardinality::Single);
    assert_eq!(store.execute(&whoami, &token).await?, format!("\"{}\"", before));

    sqlx::query("DROP TABLE public.rowgate_notes").execute(&pool).await?;
    pool.close().await;
    Ok(())
}

#[tokio::test]
async fn statement_timeout_ends_abandoned_queries() -> Result<()> {
    let Some((store, pool)) = live_store_with(|config| {
        config.max_connections = 1;
        config.statement_timeout_ms = 200;
    })
    .await?
    else {
        return Ok(());
    };

    let slow = Query::raw("SELECT to_json(pg_sleep(2)::text)", Cardinality::Single);
    match store.execute(&slow, &CancellationToken::new()).await {
        Err(StoreError::Database { code, .. }) => assert_eq!(code, "57014"),
        other => panic!("expected query_canceled, got {:?}", other),
    }
    pool.close().await;
    Ok(())
}
