#![allow(dead_code)]

use chrono::{NaiveDate, TimeDelta};
use sea_orm::Database;
use uuid::Uuid;

use engine::{AccountKind, Engine, NewCategoryCmd};
use migration::MigratorTrait;

pub async fn engine_with_db() -> Engine {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    Engine::builder().database(db).build().await.unwrap()
}

/// `n` days after (or before, when negative) `date`.
pub fn shift(date: NaiveDate, n: i64) -> NaiveDate {
    date + TimeDelta::days(n)
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub async fn account(engine: &Engine, description: &str) -> Uuid {
    engine
        .create_account(description, AccountKind::Normal, false)
        .await
        .unwrap()
}

pub async fn category(engine: &Engine, description: &str) -> Uuid {
    engine
        .create_category(NewCategoryCmd::new(description))
        .await
        .unwrap()
}

pub async fn balance(engine: &Engine, account_id: Uuid) -> i64 {
    engine
        .account(account_id)
        .await
        .unwrap()
        .current_balance_minor
}
