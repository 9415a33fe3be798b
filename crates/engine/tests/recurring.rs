mod common;

use common::{account, balance, category, date, engine_with_db, shift};
use engine::{
    EngineError, IntervalUnit, NewRecurringCmd, NewTransactionCmd, Transaction,
    TransactionListFilter, UpdateCategoryCmd, UpdateRecurringCmd,
};
use uuid::Uuid;

async fn instances(engine: &engine::Engine, recurring_id: Uuid) -> Vec<Transaction> {
    let filter = TransactionListFilter {
        recurring_transaction_id: Some(recurring_id),
        ..Default::default()
    };
    let mut items = engine.list_transactions(100, &filter).await.unwrap();
    items.sort_by_key(|tx| tx.date);
    items
}

#[tokio::test]
async fn weekly_template_catches_up_to_today() {
    let engine = engine_with_db().await;
    let today = engine.today();
    let bank = account(&engine, "Bank").await;
    let gym = category(&engine, "Gym").await;

    let id = engine
        .create_recurring(NewRecurringCmd::new(
            NewTransactionCmd::expense(bank, 1_000, shift(today, -20)).category(gym),
            1,
            IntervalUnit::Weeks,
        ))
        .await
        .unwrap();

    let dates: Vec<_> = instances(&engine, id)
        .await
        .iter()
        .map(|tx| tx.date)
        .collect();
    assert_eq!(
        dates,
        vec![shift(today, -20), shift(today, -13), shift(today, -6)]
    );
    assert_eq!(balance(&engine, bank).await, -3_000);

    let template = engine.recurring(id).await.unwrap();
    assert_eq!(template.occurrences, 3);
    assert_eq!(template.last_occurrence, Some(shift(today, -6)));
    assert_eq!(template.next_occurrence, Some(shift(today, 1)));
    assert!(!template.is_finished);

    let report = engine.process_pending_at(shift(today, 14)).await.unwrap();
    assert_eq!(report.generated, 2);
    assert_eq!(report.processed, 2);
    assert_eq!(instances(&engine, id).await.len(), 5);
    assert_eq!(balance(&engine, bank).await, -5_000);
}

#[tokio::test]
async fn month_end_schedule_is_clamped_and_finishes() {
    let engine = engine_with_db().await;
    let bank = account(&engine, "Bank").await;
    let rent = category(&engine, "Rent").await;

    let id = engine
        .create_recurring(
            NewRecurringCmd::new(
                NewTransactionCmd::expense(bank, 50_000, date(2026, 1, 31)).category(rent),
                1,
                IntervalUnit::Months,
            )
            .end_date(date(2026, 4, 30)),
        )
        .await
        .unwrap();

    let dates: Vec<_> = instances(&engine, id)
        .await
        .iter()
        .map(|tx| tx.date)
        .collect();
    assert_eq!(
        dates,
        vec![
            date(2026, 1, 31),
            date(2026, 2, 28),
            date(2026, 3, 31),
            date(2026, 4, 30)
        ]
    );
    let template = engine.recurring(id).await.unwrap();
    assert!(template.is_finished);
    assert_eq!(template.next_occurrence, None);

    assert!(engine.list_recurring(false).await.unwrap().is_empty());
    assert_eq!(engine.list_recurring(true).await.unwrap().len(), 1);
}

#[tokio::test]
async fn moving_the_end_date_reopens_the_schedule() {
    let engine = engine_with_db().await;
    let today = engine.today();
    let bank = account(&engine, "Bank").await;
    let gym = category(&engine, "Gym").await;

    let id = engine
        .create_recurring(
            NewRecurringCmd::new(
                NewTransactionCmd::expense(bank, 1_000, shift(today, -20)).category(gym),
                1,
                IntervalUnit::Weeks,
            )
            .end_date(shift(today, -13)),
        )
        .await
        .unwrap();
    assert_eq!(instances(&engine, id).await.len(), 2);
    assert!(engine.recurring(id).await.unwrap().is_finished);

    engine
        .update_recurring(UpdateRecurringCmd::new(id).end_date(None))
        .await
        .unwrap();
    let template = engine.recurring(id).await.unwrap();
    assert!(!template.is_finished);
    assert_eq!(template.occurrences, 3);
    assert_eq!(template.next_occurrence, Some(shift(today, 1)));
    assert_eq!(instances(&engine, id).await.len(), 3);

    // Cutting it short again finishes it without touching past instances.
    engine
        .update_recurring(UpdateRecurringCmd::new(id).end_date(Some(today)))
        .await
        .unwrap();
    assert!(engine.recurring(id).await.unwrap().is_finished);
    assert_eq!(instances(&engine, id).await.len(), 3);
}

#[tokio::test]
async fn shortening_the_end_date_releases_later_instances() {
    let engine = engine_with_db().await;
    let today = engine.today();
    let bank = account(&engine, "Bank").await;
    let gym = category(&engine, "Gym").await;

    let id = engine
        .create_recurring(NewRecurringCmd::new(
            NewTransactionCmd::expense(bank, 1_000, shift(today, -20))
                .category(gym)
                .needs_confirmation(true),
            1,
            IntervalUnit::Weeks,
        ))
        .await
        .unwrap();
    let generated = instances(&engine, id).await;
    assert_eq!(generated.len(), 3);
    let settled = generated[1].id;
    let dropped = generated[2].id;
    engine.confirm_transaction(settled, true).await.unwrap();
    assert_eq!(balance(&engine, bank).await, -1_000);

    engine
        .update_recurring(UpdateRecurringCmd::new(id).end_date(Some(shift(today, -20))))
        .await
        .unwrap();

    let left = instances(&engine, id).await;
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].date, shift(today, -20));

    // The settled one survives as a plain transaction, the pending one is gone.
    let settled = engine.transaction(settled).await.unwrap();
    assert!(settled.processed);
    assert_eq!(settled.recurring_transaction_id, None);
    assert!(matches!(
        engine.transaction(dropped).await.unwrap_err(),
        EngineError::KeyNotFound(_)
    ));
    assert_eq!(balance(&engine, bank).await, -1_000);

    let template = engine.recurring(id).await.unwrap();
    assert_eq!(template.occurrences, 1);
    assert_eq!(template.last_occurrence, Some(shift(today, -20)));
    assert_eq!(template.next_occurrence, None);
    assert!(template.is_finished);

    // Template edits no longer reach released rows.
    engine
        .update_recurring(UpdateRecurringCmd::new(id).amount(2_000))
        .await
        .unwrap();
    assert_eq!(engine.transaction(settled.id).await.unwrap().amount_minor, 1_000);

    // Extending again regenerates the dropped occurrences.
    engine
        .update_recurring(UpdateRecurringCmd::new(id).end_date(None))
        .await
        .unwrap();
    let dates: Vec<_> = instances(&engine, id)
        .await
        .iter()
        .map(|tx| tx.date)
        .collect();
    assert_eq!(
        dates,
        vec![shift(today, -20), shift(today, -13), shift(today, -6)]
    );
    let template = engine.recurring(id).await.unwrap();
    assert_eq!(template.occurrences, 3);
    assert_eq!(template.next_occurrence, Some(shift(today, 1)));
    assert_eq!(balance(&engine, bank).await, -1_000);
}

#[tokio::test]
async fn schedule_is_frozen_once_instances_exist() {
    let engine = engine_with_db().await;
    let today = engine.today();
    let bank = account(&engine, "Bank").await;
    let gym = category(&engine, "Gym").await;

    let started = engine
        .create_recurring(NewRecurringCmd::new(
            NewTransactionCmd::expense(bank, 1_000, shift(today, -20)).category(gym),
            1,
            IntervalUnit::Weeks,
        ))
        .await
        .unwrap();
    let err = engine
        .update_recurring(UpdateRecurringCmd::new(started).schedule(
            shift(today, -20),
            2,
            IntervalUnit::Weeks,
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidRecurrence(_)));

    let planned = engine
        .create_recurring(NewRecurringCmd::new(
            NewTransactionCmd::expense(bank, 1_000, shift(today, 5)).category(gym),
            1,
            IntervalUnit::Weeks,
        ))
        .await
        .unwrap();
    engine
        .update_recurring(UpdateRecurringCmd::new(planned).schedule(
            shift(today, 7),
            1,
            IntervalUnit::Months,
        ))
        .await
        .unwrap();
    let template = engine.recurring(planned).await.unwrap();
    assert_eq!(template.interval_unit, IntervalUnit::Months);
    assert_eq!(template.next_occurrence, Some(shift(today, 7)));

    let err = engine
        .create_recurring(NewRecurringCmd::new(
            NewTransactionCmd::expense(bank, 1_000, today).category(gym),
            0,
            IntervalUnit::Days,
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidRecurrence(_)));
}

#[tokio::test]
async fn template_changes_reach_pending_instances() {
    let engine = engine_with_db().await;
    let today = engine.today();
    let bank = account(&engine, "Bank").await;
    let gym = category(&engine, "Gym").await;

    let id = engine
        .create_recurring(NewRecurringCmd::new(
            NewTransactionCmd::expense(bank, 1_000, shift(today, -20))
                .category(gym)
                .needs_confirmation(true),
            1,
            IntervalUnit::Weeks,
        ))
        .await
        .unwrap();
    let pending = instances(&engine, id).await;
    assert_eq!(pending.len(), 3);
    assert!(pending.iter().all(|tx| !tx.processed));
    assert_eq!(balance(&engine, bank).await, 0);

    engine
        .update_recurring(UpdateRecurringCmd::new(id).amount(2_000))
        .await
        .unwrap();
    assert!(
        instances(&engine, id)
            .await
            .iter()
            .all(|tx| tx.amount_minor == 2_000 && !tx.processed)
    );

    engine
        .update_recurring(UpdateRecurringCmd::new(id).needs_confirmation(false))
        .await
        .unwrap();
    assert!(instances(&engine, id).await.iter().all(|tx| tx.processed));
    assert_eq!(balance(&engine, bank).await, -6_000);

    // Settled instances keep their amount.
    engine
        .update_recurring(UpdateRecurringCmd::new(id).amount(3_000))
        .await
        .unwrap();
    assert!(
        instances(&engine, id)
            .await
            .iter()
            .all(|tx| tx.amount_minor == 2_000)
    );
}

#[tokio::test]
async fn delete_keeps_settled_instances() {
    let engine = engine_with_db().await;
    let today = engine.today();
    let bank = account(&engine, "Bank").await;
    let gym = category(&engine, "Gym").await;

    let id = engine
        .create_recurring(NewRecurringCmd::new(
            NewTransactionCmd::expense(bank, 1_000, shift(today, -20))
                .category(gym)
                .needs_confirmation(true),
            1,
            IntervalUnit::Weeks,
        ))
        .await
        .unwrap();
    let first = instances(&engine, id).await[0].id;
    engine.confirm_transaction(first, true).await.unwrap();

    engine.delete_recurring(id).await.unwrap();

    assert!(matches!(
        engine.recurring(id).await.unwrap_err(),
        EngineError::KeyNotFound(_)
    ));
    let left = engine
        .list_transactions(100, &TransactionListFilter::default())
        .await
        .unwrap();
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].id, first);
    assert_eq!(left[0].recurring_transaction_id, None);
    assert_eq!(balance(&engine, bank).await, -1_000);
}

#[tokio::test]
async fn obsolete_category_pauses_generation() {
    let engine = engine_with_db().await;
    let today = engine.today();
    let bank = account(&engine, "Bank").await;
    let gym = category(&engine, "Gym").await;

    let id = engine
        .create_recurring(NewRecurringCmd::new(
            NewTransactionCmd::expense(bank, 1_000, shift(today, 1)).category(gym),
            1,
            IntervalUnit::Days,
        ))
        .await
        .unwrap();
    engine
        .update_category(UpdateCategoryCmd::new(gym).obsolete(true))
        .await
        .unwrap();

    let report = engine.process_pending_at(shift(today, 3)).await.unwrap();
    assert_eq!(report.generated, 0);
    let template = engine.recurring(id).await.unwrap();
    assert_eq!(template.occurrences, 0);
    assert_eq!(template.next_occurrence, Some(shift(today, 1)));

    engine
        .update_category(UpdateCategoryCmd::new(gym).obsolete(false))
        .await
        .unwrap();
    let report = engine.process_pending_at(shift(today, 3)).await.unwrap();
    assert_eq!(report.generated, 3);
}
