//! Integration tests for the persistent price cache

use chrono::Utc;
use stackcost::pricing::cache::PriceCache;
use stackcost::pricing::{PriceQuery, PriceResult};
use std::time::Duration;
use tempfile::TempDir;

fn query() -> PriceQuery {
    PriceQuery::new("AmazonRDS", "Database Instance", "eu-west-1")
        .with_attribute("instanceType", "db.r5.large")
        .with_attribute("databaseEngine", "PostgreSQL")
}

fn result(query: &PriceQuery) -> PriceResult {
    PriceResult {
        query: query.clone(),
        sku: "ABCDEF123456".to_string(),
        unit_price: 0.24,
        unit: "Hrs".to_string(),
        currency: "USD".to_string(),
        fetched_at: Utc::now(),
        from_cache: false,
    }
}

#[test]
fn test_set_then_get_preserves_all_fields() {
    let dir = TempDir::new().unwrap();
    let cache = PriceCache::with_default_ttl(dir.path());
    let q = query();
    let fresh = result(&q);

    cache.set(&q, &fresh);
    let cached = cache.get(&q).expect("hit expected");

    assert!(cached.from_cache, "hits must be marked from_cache");
    assert_eq!(cached.sku, fresh.sku);
    assert_eq!(cached.unit_price, fresh.unit_price);
    assert_eq!(cached.unit, fresh.unit);
    assert_eq!(cached.currency, fresh.currency);
    assert_eq!(cached.fetched_at, fresh.fetched_at);
    assert_eq!(cached.query, q);
}

#[test]
fn test_identical_queries_built_differently_share_an_entry() {
    let dir = TempDir::new().unwrap();
    let cache = PriceCache::with_default_ttl(dir.path());

    let a = PriceQuery::new("AmazonEC2", "Compute Instance", "us-east-1")
        .with_attribute("instanceType", "t3.micro")
        .with_attribute("operatingSystem", "Linux");
    let b = PriceQuery::new("AmazonEC2", "Compute Instance", "us-east-1")
        .with_attribute("operatingSystem", "Linux")
        .with_attribute("instanceType", "t3.micro");

    cache.set(&a, &result(&a));
    assert!(cache.get(&b).is_some(), "attribute order must not matter");
}

#[test]
fn test_expired_entry_behaves_as_miss() {
    let dir = TempDir::new().unwrap();
    let cache = PriceCache::new(dir.path(), Duration::ZERO);
    let q = query();
    cache.set(&q, &result(&q));

    assert!(cache.get(&q).is_none());
    // and the stale file was cleaned up eagerly
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_distinct_queries_do_not_collide() {
    let dir = TempDir::new().unwrap();
    let cache = PriceCache::with_default_ttl(dir.path());
    let q = query();
    cache.set(&q, &result(&q));

    let other = PriceQuery::new("AmazonRDS", "Database Instance", "us-east-1")
        .with_attribute("instanceType", "db.r5.large")
        .with_attribute("databaseEngine", "PostgreSQL");
    assert!(cache.get(&other).is_none(), "different region, different entry");
}

#[test]
fn test_clear_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let cache = PriceCache::with_default_ttl(dir.path());
    let q = query();
    cache.set(&q, &result(&q));

    cache.clear().unwrap();
    cache.clear().unwrap();
    assert!(cache.get(&q).is_none());
}
