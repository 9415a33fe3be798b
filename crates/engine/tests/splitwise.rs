mod common;

use std::{future::Future, sync::Mutex};

use chrono::{DateTime, TimeZone, Utc};
use common::{balance, category, date, engine_with_db, shift};
use engine::{
    AccountKind, Engine, EngineError, SourceError, SplitwiseExpense, SplitwiseSource,
    UpdateTransactionCmd,
};
use uuid::Uuid;

/// Returns whatever it holds, ignoring the cursor, so repeated syncs see
/// the same expenses again.
#[derive(Default)]
struct FakeSource {
    expenses: Mutex<Vec<SplitwiseExpense>>,
}

impl FakeSource {
    fn set(&self, expenses: Vec<SplitwiseExpense>) {
        *self.expenses.lock().unwrap() = expenses;
    }
}

impl SplitwiseSource for FakeSource {
    fn fetch_expenses(
        &self,
        _updated_after: Option<DateTime<Utc>>,
    ) -> impl Future<Output = Result<Vec<SplitwiseExpense>, SourceError>> + Send {
        let result: Result<_, SourceError> = Ok(self.expenses.lock().unwrap().clone());
        async move { result }
    }
}

struct FailingSource;

impl SplitwiseSource for FailingSource {
    fn fetch_expenses(
        &self,
        _updated_after: Option<DateTime<Utc>>,
    ) -> impl Future<Output = Result<Vec<SplitwiseExpense>, SourceError>> + Send {
        let result: Result<Vec<SplitwiseExpense>, SourceError> = Err("splitwise is down".into());
        async move { result }
    }
}

fn at(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, hour, 0, 0).unwrap()
}

fn dinner(personal_minor: i64, updated_at: DateTime<Utc>) -> SplitwiseExpense {
    SplitwiseExpense {
        id: 101,
        description: "Dinner".to_string(),
        date: date(2026, 2, 27),
        updated_at,
        deleted: false,
        payment: false,
        total_minor: 6_000,
        paid_minor: 6_000,
        personal_minor,
    }
}

fn others(updated_at: DateTime<Utc>) -> Vec<SplitwiseExpense> {
    vec![
        SplitwiseExpense {
            id: 102,
            description: "Settle up".to_string(),
            date: date(2026, 2, 28),
            updated_at,
            deleted: false,
            payment: true,
            total_minor: 2_000,
            paid_minor: 2_000,
            personal_minor: 0,
        },
        SplitwiseExpense {
            id: 103,
            description: "Not mine".to_string(),
            date: date(2026, 2, 28),
            updated_at,
            deleted: false,
            payment: false,
            total_minor: 4_000,
            paid_minor: 0,
            personal_minor: 0,
        },
    ]
}

/// Engine with a Splitwise account, plus the dinner synced at 10:00 and,
/// when `import` is set, imported under "Food".
async fn synced_dinner(source: &FakeSource, import: bool) -> (Engine, Uuid, Option<Uuid>) {
    let engine = engine_with_db().await;
    let splitwise = engine
        .create_account("Splitwise", AccountKind::Splitwise, false)
        .await
        .unwrap();
    let food = category(&engine, "Food").await;
    source.set(vec![dinner(1_500, at(10))]);
    engine.sync_splitwise(source).await.unwrap();
    let tx_id = if import {
        Some(
            engine
                .import_splitwise_transaction(101, food)
                .await
                .unwrap(),
        )
    } else {
        None
    };
    (engine, splitwise, tx_id)
}

#[tokio::test]
async fn sync_then_import_then_follow_remote_changes() {
    let engine = engine_with_db().await;
    let splitwise = engine
        .create_account("Splitwise", AccountKind::Splitwise, false)
        .await
        .unwrap();
    let food = category(&engine, "Food").await;
    let source = FakeSource::default();

    let mut batch = others(at(9));
    batch.push(dinner(1_500, at(10)));
    source.set(batch);
    let report = engine.sync_splitwise(&source).await.unwrap();
    assert_eq!(report.added, 1);
    assert_eq!(engine.splitwise_cursor().await.unwrap(), Some(at(10)));

    let cached = engine.splitwise_transactions(false).await.unwrap();
    assert_eq!(cached.len(), 1);
    assert_eq!(cached[0].owed_minor(), 4_500);
    assert!(!cached[0].imported);

    let tx_id = engine
        .import_splitwise_transaction(101, food)
        .await
        .unwrap();
    let tx = engine.transaction(tx_id).await.unwrap();
    assert_eq!(tx.account_id, splitwise);
    assert_eq!(tx.amount_minor, 1_500);
    assert_eq!(tx.splitwise_transaction_id, Some(101));
    assert!(tx.processed);
    assert_eq!(balance(&engine, splitwise).await, -1_500);
    assert!(engine.splitwise_transactions(true).await.unwrap().is_empty());

    let err = engine
        .import_splitwise_transaction(101, food)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ExistingKey(_)));

    // A newer version updates the imported transaction.
    source.set(vec![dinner(2_000, at(11))]);
    let report = engine.sync_splitwise(&source).await.unwrap();
    assert_eq!(report.updated, 1);
    assert_eq!(report.transactions_updated, 1);
    assert_eq!(engine.transaction(tx_id).await.unwrap().amount_minor, 2_000);
    assert_eq!(balance(&engine, splitwise).await, -2_000);

    // Seeing the same version twice changes nothing.
    let report = engine.sync_splitwise(&source).await.unwrap();
    assert_eq!(report.skipped, 1);
    assert_eq!(report.updated, 0);
    assert_eq!(balance(&engine, splitwise).await, -2_000);

    // Deleted remotely: the local transaction goes away with it.
    let mut gone = dinner(2_000, at(12));
    gone.deleted = true;
    source.set(vec![gone]);
    let report = engine.sync_splitwise(&source).await.unwrap();
    assert_eq!(report.removed, 1);
    assert_eq!(report.transactions_removed, 1);
    assert!(matches!(
        engine.transaction(tx_id).await.unwrap_err(),
        EngineError::KeyNotFound(_)
    ));
    assert_eq!(balance(&engine, splitwise).await, 0);
    assert!(engine.splitwise_transactions(false).await.unwrap().is_empty());
    assert_eq!(engine.splitwise_cursor().await.unwrap(), Some(at(12)));
}

#[tokio::test]
async fn imported_rows_only_take_cosmetic_edits() {
    let engine = engine_with_db().await;
    let splitwise = engine
        .create_account("Splitwise", AccountKind::Splitwise, false)
        .await
        .unwrap();
    let food = category(&engine, "Food").await;
    let leisure = category(&engine, "Leisure").await;
    let source = FakeSource::default();
    source.set(vec![dinner(1_500, at(10))]);
    engine.sync_splitwise(&source).await.unwrap();
    let tx_id = engine
        .import_splitwise_transaction(101, food)
        .await
        .unwrap();

    let err = engine
        .update_transaction(UpdateTransactionCmd::new(tx_id).amount(10))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidTransaction(_)));

    engine
        .update_transaction(
            UpdateTransactionCmd::new(tx_id)
                .category(Some(leisure))
                .description(Some("Dinner with friends".to_string())),
        )
        .await
        .unwrap();
    let tx = engine.transaction(tx_id).await.unwrap();
    assert_eq!(tx.category_id, Some(leisure));
    assert_eq!(balance(&engine, splitwise).await, -1_500);

    // Deleting the local copy makes the expense importable again.
    engine.delete_transaction(tx_id).await.unwrap();
    let importable = engine.splitwise_transactions(true).await.unwrap();
    assert_eq!(importable.len(), 1);
    assert_eq!(importable[0].id, 101);
    assert_eq!(balance(&engine, splitwise).await, 0);
}

#[tokio::test]
async fn import_needs_a_splitwise_account() {
    let engine = engine_with_db().await;
    let food = category(&engine, "Food").await;
    let source = FakeSource::default();
    source.set(vec![dinner(1_500, at(10))]);

    // The cache fills up even before the account exists.
    engine.sync_splitwise(&source).await.unwrap();
    let err = engine
        .import_splitwise_transaction(101, food)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAccount(_)));

    let err = engine
        .import_splitwise_transaction(999, food)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}

#[tokio::test]
async fn source_errors_leave_state_untouched() {
    let engine = engine_with_db().await;
    let err = engine.sync_splitwise(&FailingSource).await.unwrap_err();
    assert!(matches!(err, EngineError::Splitwise(_)));
    assert_eq!(engine.splitwise_cursor().await.unwrap(), None);
}

#[tokio::test]
async fn expenses_that_stop_involving_the_user_are_dropped() {
    // Only cached: the share drops to zero.
    let source = FakeSource::default();
    let (engine, splitwise, _) = synced_dinner(&source, false).await;
    source.set(vec![dinner(0, at(11))]);
    let report = engine.sync_splitwise(&source).await.unwrap();
    assert_eq!(report.removed, 1);
    assert_eq!(report.transactions_removed, 0);
    assert!(engine.splitwise_transactions(false).await.unwrap().is_empty());
    assert_eq!(balance(&engine, splitwise).await, 0);

    // Imported: it turns into a payment.
    let source = FakeSource::default();
    let (engine, splitwise, tx_id) = synced_dinner(&source, true).await;
    assert_eq!(balance(&engine, splitwise).await, -1_500);
    let mut payment = dinner(1_500, at(11));
    payment.payment = true;
    source.set(vec![payment]);
    let report = engine.sync_splitwise(&source).await.unwrap();
    assert_eq!(report.removed, 1);
    assert_eq!(report.transactions_removed, 1);
    assert_eq!(report.updated, 0);
    assert!(matches!(
        engine.transaction(tx_id.unwrap()).await.unwrap_err(),
        EngineError::KeyNotFound(_)
    ));
    assert!(engine.splitwise_transactions(false).await.unwrap().is_empty());
    assert_eq!(balance(&engine, splitwise).await, 0);
}

#[tokio::test]
async fn older_versions_are_skipped() {
    let source = FakeSource::default();
    let (engine, splitwise, tx_id) = synced_dinner(&source, true).await;

    source.set(vec![dinner(9_999, at(9))]);
    let report = engine.sync_splitwise(&source).await.unwrap();
    assert_eq!(report.skipped, 1);
    assert_eq!(report.updated, 0);
    assert_eq!(report.transactions_updated, 0);

    let cached = engine.splitwise_transactions(false).await.unwrap();
    assert_eq!(cached[0].personal_minor, 1_500);
    assert_eq!(cached[0].updated_at, at(10));
    assert_eq!(engine.transaction(tx_id.unwrap()).await.unwrap().amount_minor, 1_500);
    assert_eq!(balance(&engine, splitwise).await, -1_500);
    assert_eq!(engine.splitwise_cursor().await.unwrap(), Some(at(10)));
}

#[tokio::test]
async fn remote_changes_refresh_the_cache_only_until_imported() {
    let source = FakeSource::default();
    let (engine, splitwise, _) = synced_dinner(&source, false).await;

    source.set(vec![dinner(2_500, at(11))]);
    let report = engine.sync_splitwise(&source).await.unwrap();
    assert_eq!(report.updated, 1);
    assert_eq!(report.transactions_updated, 0);

    let cached = engine.splitwise_transactions(false).await.unwrap();
    assert_eq!(cached.len(), 1);
    assert_eq!(cached[0].personal_minor, 2_500);
    assert_eq!(cached[0].updated_at, at(11));
    assert!(!cached[0].imported);
    assert!(engine
        .list_transactions(100, &Default::default())
        .await
        .unwrap()
        .is_empty());
    assert_eq!(balance(&engine, splitwise).await, 0);
}

#[tokio::test]
async fn imported_expense_moved_to_the_future_waits_for_its_date() {
    let source = FakeSource::default();
    let (engine, splitwise, tx_id) = synced_dinner(&source, true).await;
    let tx_id = tx_id.unwrap();
    let later = shift(engine.today(), 10);

    let mut moved = dinner(1_500, at(11));
    moved.date = later;
    source.set(vec![moved]);
    let report = engine.sync_splitwise(&source).await.unwrap();
    assert_eq!(report.updated, 1);
    assert_eq!(report.transactions_updated, 1);

    let tx = engine.transaction(tx_id).await.unwrap();
    assert_eq!(tx.date, later);
    assert!(!tx.processed);
    assert_eq!(balance(&engine, splitwise).await, 0);

    let report = engine.process_pending_at(later).await.unwrap();
    assert_eq!(report.processed, 1);
    assert!(engine.transaction(tx_id).await.unwrap().processed);
    assert_eq!(balance(&engine, splitwise).await, -1_500);
}
