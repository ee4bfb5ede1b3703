#![allow(dead_code)]

use chrono::{Duration, NaiveDate, Utc};
use pension::adapters::{MemoryBalanceCache, MemoryStore};
use pension::config::{AppConfig, BrokerConfig};
use pension::domain::{Contribution, Money, PlanType, User};
use pension::{Application, Ports};
use uuid::Uuid;

pub const USER_KEY: &str = "02070893103";
pub const PGBL_CONTRACT: &str = "12345";
pub const VGBL_CONTRACT: &str = "67890";

pub struct TestApp {
    pub app: Application,
    pub store: MemoryStore,
    pub cache: MemoryBalanceCache,
}

pub fn config() -> AppConfig {
    let mut config = AppConfig::default_config("postgres://unused");
    config.broker = BrokerConfig {
        channel_capacity: 64,
        max_redeliveries: 2,
        base_backoff_ms: 1,
        max_backoff_ms: 10,
    };
    config
}

/// One user with a PGBL plan (R$ 5000.00 vested, R$ 3000.00 locked) and a
/// VGBL plan (R$ 2000.00 vested)
pub fn seeded_store() -> MemoryStore {
    let store = MemoryStore::new();
    let user = User {
        id: Uuid::new_v4(),
        key: USER_KEY.to_string(),
        name: "Lucas Costa".to_string(),
        email: "lucas@teste.com".to_string(),
    };
    let today = Utc::now().date_naive();
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

    let pgbl = Uuid::new_v4();
    store
        .insert_plan(user.id, pgbl, PlanType::Pgbl, PGBL_CONTRACT, start)
        .unwrap();
    store.insert_contribution(pgbl, contribution(500000, today - Duration::days(30)));
    store.insert_contribution(pgbl, contribution(300000, today + Duration::days(30)));

    let vgbl = Uuid::new_v4();
    store
        .insert_plan(user.id, vgbl, PlanType::Vgbl, VGBL_CONTRACT, start)
        .unwrap();
    store.insert_contribution(vgbl, contribution(200000, today - Duration::days(1)));

    store.insert_user(user);
    store
}

fn contribution(amount: i64, availability: NaiveDate) -> Contribution {
    Contribution::new(
        Uuid::new_v4(),
        Money::from_minor_units(amount).unwrap(),
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        availability,
    )
}

pub fn test_app() -> TestApp {
    test_app_with(config())
}

pub fn test_app_with(config: AppConfig) -> TestApp {
    let store = seeded_store();
    let cache = MemoryBalanceCache::new();
    let app = Application::new(Ports::memory(store.clone(), cache.clone(), &config), &config);
    TestApp { app, store, cache }
}
