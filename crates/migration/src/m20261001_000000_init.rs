//! Initial schema migration - creates all tables from scratch.
//!
//! - `accounts`: where money is kept, with the denormalized current balance
//! - `categories`: the category tree
//! - `recurring_transactions`: templates generating one transaction per occurrence
//! - `splitwise_transactions`: local cache of the Splitwise expenses
//! - `splitwise_sync_state`: how far the last Splitwise sync got
//! - `transactions`: expenses, incomes and transfers
//! - `budgets` / `budget_categories`: spending caps over category subtrees
//! - `daily_balances`: end-of-day balance per account, one row per active day

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Accounts {
    Table,
    Id,
    Description,
    DescriptionNorm,
    Kind,
    IsDefault,
    IsObsolete,
    CurrentBalanceMinor,
}

#[derive(Iden)]
enum Categories {
    Table,
    Id,
    Description,
    DescriptionNorm,
    ParentId,
    ExpectedMonthlyMinor,
    IsObsolete,
}

#[derive(Iden)]
enum RecurringTransactions {
    Table,
    Id,
    Description,
    Kind,
    AmountMinor,
    AccountId,
    ReceivingAccountId,
    CategoryId,
    NeedsConfirmation,
    StartDate,
    EndDate,
    Interval,
    IntervalUnit,
    Occurrences,
    LastOccurrence,
    NextOccurrence,
    IsFinished,
}

#[derive(Iden)]
enum SplitwiseTransactions {
    Table,
    Id,
    Description,
    Date,
    UpdatedAt,
    TotalMinor,
    PaidMinor,
    PersonalMinor,
    Imported,
}

#[derive(Iden)]
enum SplitwiseSyncState {
    Table,
    Id,
    LastUpdatedAt,
}

#[derive(Iden)]
enum Transactions {
    Table,
    Id,
    Kind,
    AmountMinor,
    Date,
    Description,
    AccountId,
    ReceivingAccountId,
    CategoryId,
    RecurringTransactionId,
    SplitwiseTransactionId,
    Processed,
    NeedsConfirmation,
    IsConfirmed,
}

#[derive(Iden)]
enum Budgets {
    Table,
    Id,
    Description,
    AmountMinor,
    StartDate,
    EndDate,
    SpentMinor,
}

#[derive(Iden)]
enum BudgetCategories {
    Table,
    BudgetId,
    CategoryId,
}

#[derive(Iden)]
enum DailyBalances {
    Table,
    AccountId,
    Date,
    BalanceMinor,
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Accounts
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Accounts::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Accounts::Id).blob().not_null().primary_key())
                    .col(ColumnDef::new(Accounts::Description).string().not_null())
                    .col(ColumnDef::new(Accounts::DescriptionNorm).string().not_null())
                    .col(
                        ColumnDef::new(Accounts::Kind)
                            .string()
                            .not_null()
                            .default("normal"),
                    )
                    .col(
                        ColumnDef::new(Accounts::IsDefault)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Accounts::IsObsolete)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Accounts::CurrentBalanceMinor)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-accounts-description_norm-unique")
                    .table(Accounts::Table)
                    .col(Accounts::DescriptionNorm)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Categories
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Categories::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Categories::Id)
                            .blob()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Categories::Description).string().not_null())
                    .col(
                        ColumnDef::new(Categories::DescriptionNorm)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Categories::ParentId).blob())
                    .col(
                        ColumnDef::new(Categories::ExpectedMonthlyMinor)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Categories::IsObsolete)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-categories-parent_id")
                            .from(Categories::Table, Categories::ParentId)
                            .to(Categories::Table, Categories::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-categories-parent_id-description_norm-unique")
                    .table(Categories::Table)
                    .col(Categories::ParentId)
                    .col(Categories::DescriptionNorm)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Recurring transactions
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(RecurringTransactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RecurringTransactions::Id)
                            .blob()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(RecurringTransactions::Description).string())
                    .col(ColumnDef::new(RecurringTransactions::Kind).string().not_null())
                    .col(
                        ColumnDef::new(RecurringTransactions::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RecurringTransactions::AccountId)
                            .blob()
                            .not_null(),
                    )
                    .col(ColumnDef::new(RecurringTransactions::ReceivingAccountId).blob())
                    .col(ColumnDef::new(RecurringTransactions::CategoryId).blob())
                    .col(
                        ColumnDef::new(RecurringTransactions::NeedsConfirmation)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(RecurringTransactions::StartDate)
                            .date()
                            .not_null(),
                    )
                    .col(ColumnDef::new(RecurringTransactions::EndDate).date())
                    .col(
                        ColumnDef::new(RecurringTransactions::Interval)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RecurringTransactions::IntervalUnit)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RecurringTransactions::Occurrences)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(RecurringTransactions::LastOccurrence).date())
                    .col(ColumnDef::new(RecurringTransactions::NextOccurrence).date())
                    .col(
                        ColumnDef::new(RecurringTransactions::IsFinished)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-recurring_transactions-account_id")
                            .from(RecurringTransactions::Table, RecurringTransactions::AccountId)
                            .to(Accounts::Table, Accounts::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-recurring_transactions-receiving_account_id")
                            .from(
                                RecurringTransactions::Table,
                                RecurringTransactions::ReceivingAccountId,
                            )
                            .to(Accounts::Table, Accounts::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-recurring_transactions-category_id")
                            .from(RecurringTransactions::Table, RecurringTransactions::CategoryId)
                            .to(Categories::Table, Categories::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-recurring_transactions-next_occurrence")
                    .table(RecurringTransactions::Table)
                    .col(RecurringTransactions::IsFinished)
                    .col(RecurringTransactions::NextOccurrence)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. Splitwise cache
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(SplitwiseTransactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SplitwiseTransactions::Id)
                            .big_integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(SplitwiseTransactions::Description)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SplitwiseTransactions::Date).date().not_null())
                    .col(
                        ColumnDef::new(SplitwiseTransactions::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SplitwiseTransactions::TotalMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SplitwiseTransactions::PaidMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SplitwiseTransactions::PersonalMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SplitwiseTransactions::Imported)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SplitwiseSyncState::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SplitwiseSyncState::Id)
                            .integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SplitwiseSyncState::LastUpdatedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 5. Transactions
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Transactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Transactions::Id)
                            .blob()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Transactions::Kind).string().not_null())
                    .col(
                        ColumnDef::new(Transactions::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transactions::Date).date().not_null())
                    .col(ColumnDef::new(Transactions::Description).string())
                    .col(ColumnDef::new(Transactions::AccountId).blob().not_null())
                    .col(ColumnDef::new(Transactions::ReceivingAccountId).blob())
                    .col(ColumnDef::new(Transactions::CategoryId).blob())
                    .col(ColumnDef::new(Transactions::RecurringTransactionId).blob())
                    .col(ColumnDef::new(Transactions::SplitwiseTransactionId).big_integer())
                    .col(
                        ColumnDef::new(Transactions::Processed)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Transactions::NeedsConfirmation)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Transactions::IsConfirmed).boolean())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-account_id")
                            .from(Transactions::Table, Transactions::AccountId)
                            .to(Accounts::Table, Accounts::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-receiving_account_id")
                            .from(Transactions::Table, Transactions::ReceivingAccountId)
                            .to(Accounts::Table, Accounts::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-category_id")
                            .from(Transactions::Table, Transactions::CategoryId)
                            .to(Categories::Table, Categories::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-recurring_transaction_id")
                            .from(Transactions::Table, Transactions::RecurringTransactionId)
                            .to(RecurringTransactions::Table, RecurringTransactions::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-splitwise_transaction_id")
                            .from(Transactions::Table, Transactions::SplitwiseTransactionId)
                            .to(SplitwiseTransactions::Table, SplitwiseTransactions::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-date-id")
                    .table(Transactions::Table)
                    .col(Transactions::Date)
                    .col(Transactions::Id)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-processed-date")
                    .table(Transactions::Table)
                    .col(Transactions::Processed)
                    .col(Transactions::Date)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-splitwise_transaction_id-unique")
                    .table(Transactions::Table)
                    .col(Transactions::SplitwiseTransactionId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 6. Budgets
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Budgets::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Budgets::Id).blob().not_null().primary_key())
                    .col(ColumnDef::new(Budgets::Description).string().not_null())
                    .col(ColumnDef::new(Budgets::AmountMinor).big_integer().not_null())
                    .col(ColumnDef::new(Budgets::StartDate).date().not_null())
                    .col(ColumnDef::new(Budgets::EndDate).date().not_null())
                    .col(
                        ColumnDef::new(Budgets::SpentMinor)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(BudgetCategories::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(BudgetCategories::BudgetId).blob().not_null())
                    .col(ColumnDef::new(BudgetCategories::CategoryId).blob().not_null())
                    .primary_key(
                        Index::create()
                            .col(BudgetCategories::BudgetId)
                            .col(BudgetCategories::CategoryId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-budget_categories-budget_id")
                            .from(BudgetCategories::Table, BudgetCategories::BudgetId)
                            .to(Budgets::Table, Budgets::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-budget_categories-category_id")
                            .from(BudgetCategories::Table, BudgetCategories::CategoryId)
                            .to(Categories::Table, Categories::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 7. Daily balances
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(DailyBalances::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(DailyBalances::AccountId).blob().not_null())
                    .col(ColumnDef::new(DailyBalances::Date).date().not_null())
                    .col(
                        ColumnDef::new(DailyBalances::BalanceMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(DailyBalances::AccountId)
                            .col(DailyBalances::Date),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-daily_balances-account_id")
                            .from(DailyBalances::Table, DailyBalances::AccountId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop in reverse order of creation (respecting FK dependencies)
        manager
            .drop_table(Table::drop().table(DailyBalances::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(BudgetCategories::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Budgets::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Transactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SplitwiseSyncState::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SplitwiseTransactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(RecurringTransactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Categories::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Accounts::Table).to_owned())
            .await?;
        Ok(())
    }
}
