mod common;

use std::collections::HashSet;

use common::{account, category, engine_with_db, shift};
use engine::{
    AccountKind, EngineError, NewTransactionCmd, TransactionKind, TransactionListFilter,
    UpdateAccountCmd, UpdateCategoryCmd, UpdateTransactionCmd,
};

#[tokio::test]
async fn rejects_invalid_money_fields() {
    let engine = engine_with_db().await;
    let today = engine.today();
    let bank = account(&engine, "Bank").await;
    let food = category(&engine, "Food").await;

    let err = engine
        .create_transaction(NewTransactionCmd::expense(bank, 0, today).category(food))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));

    let err = engine
        .create_transaction(NewTransactionCmd::expense(bank, 100, today))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidTransaction(_)));

    let err = engine
        .create_transaction(NewTransactionCmd::transfer(bank, bank, 100, today))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidTransaction(_)));

    let cash = account(&engine, "Cash").await;
    let err = engine
        .create_transaction(NewTransactionCmd::transfer(bank, cash, 100, today).category(food))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidTransaction(_)));

    let err = engine
        .create_transaction(
            NewTransactionCmd::expense(uuid::Uuid::new_v4(), 100, today).category(food),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}

#[tokio::test]
async fn obsolete_references_only_survive_unchanged() {
    let engine = engine_with_db().await;
    let today = engine.today();
    let bank = account(&engine, "Bank").await;
    let old = account(&engine, "Old bank").await;
    let food = category(&engine, "Food").await;

    let tx_id = engine
        .create_transaction(NewTransactionCmd::expense(old, 300, today).category(food))
        .await
        .unwrap();
    engine
        .update_account(UpdateAccountCmd::new(old).obsolete(true))
        .await
        .unwrap();
    engine
        .update_category(UpdateCategoryCmd::new(food).obsolete(true))
        .await
        .unwrap();

    let err = engine
        .create_transaction(NewTransactionCmd::expense(old, 300, today).category(food))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAccount(_)));

    // The existing row keeps its obsolete references.
    engine
        .update_transaction(UpdateTransactionCmd::new(tx_id).amount(400))
        .await
        .unwrap();

    engine
        .update_transaction(UpdateTransactionCmd::new(tx_id).account(bank))
        .await
        .unwrap();

    let fresh = category(&engine, "Groceries").await;
    let err = engine
        .update_transaction(UpdateTransactionCmd::new(tx_id).account(old))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAccount(_)));
    engine
        .update_transaction(UpdateTransactionCmd::new(tx_id).category(Some(fresh)))
        .await
        .unwrap();
}

#[tokio::test]
async fn manual_rows_cannot_use_the_splitwise_account() {
    let engine = engine_with_db().await;
    let today = engine.today();
    let bank = account(&engine, "Bank").await;
    let splitwise = engine
        .create_account("Splitwise", AccountKind::Splitwise, false)
        .await
        .unwrap();
    let food = category(&engine, "Food").await;

    let err = engine
        .create_transaction(NewTransactionCmd::expense(splitwise, 100, today).category(food))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidTransaction(_)));

    // Settling up with other people is a transfer and stays allowed.
    engine
        .create_transaction(NewTransactionCmd::transfer(bank, splitwise, 100, today))
        .await
        .unwrap();
}

#[tokio::test]
async fn list_pages_newest_first() {
    let engine = engine_with_db().await;
    let today = engine.today();
    let bank = account(&engine, "Bank").await;
    let cash = account(&engine, "Cash").await;
    let food = category(&engine, "Food").await;

    for offset in [-1, -2, -2, -3, -5] {
        engine
            .create_transaction(
                NewTransactionCmd::expense(bank, 100, shift(today, offset)).category(food),
            )
            .await
            .unwrap();
    }
    engine
        .create_transaction(NewTransactionCmd::transfer(cash, bank, 100, shift(today, -4)))
        .await
        .unwrap();

    let filter = TransactionListFilter::default();
    let mut seen = HashSet::new();
    let mut dates = Vec::new();
    let mut cursor: Option<String> = None;
    let mut pages = 0;
    loop {
        let (items, next) = engine
            .list_transactions_page(4, cursor.as_deref(), &filter)
            .await
            .unwrap();
        pages += 1;
        for tx in items {
            assert!(seen.insert(tx.id));
            dates.push(tx.date);
        }
        match next {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }
    assert_eq!(pages, 2);
    assert_eq!(seen.len(), 6);
    assert!(dates.windows(2).all(|w| w[0] >= w[1]));

    let cash_only = TransactionListFilter {
        account_id: Some(cash),
        ..Default::default()
    };
    let items = engine.list_transactions(10, &cash_only).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].kind, TransactionKind::Transfer);

    let window = TransactionListFilter {
        from: Some(shift(today, -3)),
        to: Some(shift(today, -2)),
        kinds: Some(vec![TransactionKind::Expense]),
        ..Default::default()
    };
    assert_eq!(engine.list_transactions(10, &window).await.unwrap().len(), 3);

    let err = engine
        .list_transactions_page(4, Some("not-a-cursor"), &filter)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidCursor(_)));
}
