use chrono::NaiveDate;
use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
};
use uuid::Uuid;

use crate::{
    EngineError, NewRecurringCmd, NewTransactionCmd, RecurringTransaction,
    ResultEngine, UpdateRecurringCmd, accounts, categories, recurring_transactions, transactions,
    util::normalize_optional_text,
};

use super::{
    Engine, ProcessReport,
    transactions::{MoneyFields, TransactionDraft, full_active_model},
    with_tx,
};

fn full_active_model_recurring(
    model: &recurring_transactions::Model,
) -> recurring_transactions::ActiveModel {
    recurring_transactions::ActiveModel {
        id: ActiveValue::Set(model.id),
        description: ActiveValue::Set(model.description.clone()),
        kind: ActiveValue::Set(model.kind.clone()),
        amount_minor: ActiveValue::Set(model.amount_minor),
        account_id: ActiveValue::Set(model.account_id),
        receiving_account_id: ActiveValue::Set(model.receiving_account_id),
        category_id: ActiveValue::Set(model.category_id),
        needs_confirmation: ActiveValue::Set(model.needs_confirmation),
        start_date: ActiveValue::Set(model.start_date),
        end_date: ActiveValue::Set(model.end_date),
        interval: ActiveValue::Set(model.interval),
        interval_unit: ActiveValue::Set(model.interval_unit.clone()),
        occurrences: ActiveValue::Set(model.occurrences),
        last_occurrence: ActiveValue::Set(model.last_occurrence),
        next_occurrence: ActiveValue::Set(model.next_occurrence),
        is_finished: ActiveValue::Set(model.is_finished),
    }
}

fn to_i32(value: u32, what: &str) -> ResultEngine<i32> {
    i32::try_from(value)
        .map_err(|_| EngineError::InvalidRecurrence(format!("{what} out of range: {value}")))
}

fn ensure_schedule(
    start_date: NaiveDate,
    end_date: Option<NaiveDate>,
    interval: u32,
) -> ResultEngine<()> {
    if interval == 0 {
        return Err(EngineError::InvalidRecurrence(
            "interval must be >= 1".to_string(),
        ));
    }
    if end_date.is_some_and(|end| end < start_date) {
        return Err(EngineError::InvalidRecurrence(
            "end date must not be before the start date".to_string(),
        ));
    }
    Ok(())
}

/// Recomputes `next_occurrence` and `is_finished` from the counters.
fn refresh_schedule(model: &mut recurring_transactions::Model) -> ResultEngine<()> {
    let generated = u32::try_from(model.occurrences).unwrap_or_default();
    model.next_occurrence = model.occurrence(generated)?;
    model.is_finished = model.next_occurrence.is_none();
    Ok(())
}

impl Engine {
    /// Return a recurring template snapshot from DB.
    pub async fn recurring(&self, recurring_id: Uuid) -> ResultEngine<RecurringTransaction> {
        let model = recurring_transactions::Entity::find_by_id(recurring_id)
            .one(&self.database)
            .await?
            .ok_or_else(|| {
                EngineError::KeyNotFound("recurring transaction not exists".to_string())
            })?;
        RecurringTransaction::try_from(model)
    }

    /// Templates ordered by start date. Finished ones only when asked.
    pub async fn list_recurring(
        &self,
        include_finished: bool,
    ) -> ResultEngine<Vec<RecurringTransaction>> {
        let mut query = recurring_transactions::Entity::find();
        if !include_finished {
            query = query.filter(recurring_transactions::Column::IsFinished.eq(false));
        }
        let models = query
            .order_by_asc(recurring_transactions::Column::StartDate)
            .order_by_asc(recurring_transactions::Column::Id)
            .all(&self.database)
            .await?;
        models
            .into_iter()
            .map(RecurringTransaction::try_from)
            .collect()
    }

    /// Create a recurring template. `cmd.transaction.date` is the first
    /// occurrence; occurrences up to today are generated immediately.
    pub async fn create_recurring(&self, cmd: NewRecurringCmd) -> ResultEngine<Uuid> {
        let NewRecurringCmd {
            transaction,
            end_date,
            interval,
            interval_unit,
        } = cmd;
        let NewTransactionCmd {
            kind,
            amount_minor,
            date: start_date,
            account_id,
            receiving_account_id,
            category_id,
            description,
            needs_confirmation,
        } = transaction;
        ensure_schedule(start_date, end_date, interval)?;
        let fields = MoneyFields {
            kind,
            amount_minor,
            account_id,
            receiving_account_id,
            category_id,
        };
        let today = self.today();

        with_tx!(self, |db_tx| {
            self.validate_money_fields(&db_tx, &fields, None, false)
                .await?;

            let mut model = recurring_transactions::Model {
                id: Uuid::new_v4(),
                description: normalize_optional_text(description.as_deref()),
                kind: kind.as_str().to_string(),
                amount_minor,
                account_id,
                receiving_account_id,
                category_id,
                needs_confirmation,
                start_date,
                end_date,
                interval: to_i32(interval, "interval")?,
                interval_unit: interval_unit.as_str().to_string(),
                occurrences: 0,
                last_occurrence: None,
                next_occurrence: None,
                is_finished: false,
            };
            refresh_schedule(&mut model)?;
            full_active_model_recurring(&model).insert(&db_tx).await?;

            let id = model.id;
            self.generate_occurrences(&db_tx, model, today).await?;
            Ok(id)
        })
    }

    /// Patch a recurring template.
    ///
    /// Template changes are propagated to the instances not processed yet.
    /// The schedule (start, interval, unit) is frozen once an instance
    /// exists; the end date can always move, re-opening or finishing the
    /// schedule accordingly.
    pub async fn update_recurring(&self, cmd: UpdateRecurringCmd) -> ResultEngine<()> {
        let today = self.today();
        with_tx!(self, |db_tx| {
            let current = self.require_recurring(&db_tx, cmd.recurring_id).await?;
            let (current_interval, current_unit) = current.schedule()?;

            let schedule_changed = cmd.start_date.is_some_and(|d| d != current.start_date)
                || cmd.interval.is_some_and(|i| i != current_interval)
                || cmd.interval_unit.is_some_and(|u| u != current_unit);
            if schedule_changed && current.occurrences > 0 {
                return Err(EngineError::InvalidRecurrence(
                    "schedule cannot change once instances exist".to_string(),
                ));
            }

            let mut next = current.clone();
            if let Some(description) = cmd.description.as_ref() {
                next.description = normalize_optional_text(description.as_deref());
            }
            if let Some(amount_minor) = cmd.amount_minor {
                next.amount_minor = amount_minor;
            }
            if let Some(account_id) = cmd.account_id {
                next.account_id = account_id;
            }
            if let Some(receiving_account_id) = cmd.receiving_account_id {
                next.receiving_account_id = receiving_account_id;
            }
            if let Some(category_id) = cmd.category_id {
                next.category_id = category_id;
            }
            if let Some(flag) = cmd.needs_confirmation {
                next.needs_confirmation = flag;
            }
            if let Some(start_date) = cmd.start_date {
                next.start_date = start_date;
            }
            if let Some(end_date) = cmd.end_date {
                next.end_date = end_date;
            }
            let interval = cmd.interval.unwrap_or(current_interval);
            next.interval = to_i32(interval, "interval")?;
            next.interval_unit = cmd.interval_unit.unwrap_or(current_unit).as_str().to_string();
            ensure_schedule(next.start_date, next.end_date, interval)?;

            let previous = MoneyFields::try_from(&current)?;
            self.validate_money_fields(
                &db_tx,
                &MoneyFields::try_from(&next)?,
                Some(&previous),
                false,
            )
            .await?;

            self.trim_after_end(&db_tx, &mut next).await?;
            refresh_schedule(&mut next)?;
            full_active_model_recurring(&next).update(&db_tx).await?;

            self.propagate_template(&db_tx, &next, today).await?;
            self.generate_occurrences(&db_tx, next, today).await?;
            Ok(())
        })
    }

    /// Delete a template. Processed instances stay as plain transactions;
    /// the others are deleted with the template.
    pub async fn delete_recurring(&self, recurring_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            self.require_recurring(&db_tx, recurring_id).await?;

            let instances = transactions::Entity::find()
                .filter(transactions::Column::RecurringTransactionId.eq(recurring_id))
                .all(&db_tx)
                .await?;
            self.release_instances(&db_tx, instances).await?;

            recurring_transactions::Entity::delete_by_id(recurring_id)
                .exec(&db_tx)
                .await?;
            Ok(())
        })
    }

    /// Cuts loose instances from their template: settled ones stay as plain
    /// transactions, the others are deleted.
    async fn release_instances(
        &self,
        db_tx: &DatabaseTransaction,
        instances: Vec<transactions::Model>,
    ) -> ResultEngine<()> {
        for instance in instances {
            if instance.processed {
                let detached = transactions::ActiveModel {
                    id: ActiveValue::Set(instance.id),
                    recurring_transaction_id: ActiveValue::Set(None),
                    ..Default::default()
                };
                detached.update(db_tx).await?;
            } else {
                transactions::Entity::delete_by_id(instance.id)
                    .exec(db_tx)
                    .await?;
            }
        }
        Ok(())
    }

    /// Releases the instances dated after the template's end date and rolls
    /// the counters back to the last occurrence still inside the schedule,
    /// so extending the end date later regenerates what was dropped.
    async fn trim_after_end(
        &self,
        db_tx: &DatabaseTransaction,
        template: &mut recurring_transactions::Model,
    ) -> ResultEngine<()> {
        let Some(end_date) = template.end_date else {
            return Ok(());
        };
        let outside = transactions::Entity::find()
            .filter(transactions::Column::RecurringTransactionId.eq(template.id))
            .filter(transactions::Column::Date.gt(end_date))
            .all(db_tx)
            .await?;
        if !outside.is_empty() {
            tracing::debug!(
                recurring = %template.id,
                released = outside.len(),
                "instances after the end date released"
            );
        }
        self.release_instances(db_tx, outside).await?;

        let generated = u32::try_from(template.occurrences).unwrap_or_default();
        let mut kept = 0;
        let mut last_occurrence = None;
        while kept < generated {
            match template.occurrence(kept)? {
                Some(date) => {
                    last_occurrence = Some(date);
                    kept += 1;
                }
                None => break,
            }
        }
        template.occurrences = to_i32(kept, "occurrences")?;
        template.last_occurrence = last_occurrence;
        Ok(())
    }

    /// Materializes the due occurrences of every open template.
    pub(super) async fn generate_due_recurring(
        &self,
        db_tx: &DatabaseTransaction,
        today: NaiveDate,
    ) -> ResultEngine<ProcessReport> {
        let templates = recurring_transactions::Entity::find()
            .filter(recurring_transactions::Column::IsFinished.eq(false))
            .filter(recurring_transactions::Column::NextOccurrence.lte(today))
            .order_by_asc(recurring_transactions::Column::NextOccurrence)
            .all(db_tx)
            .await?;

        let mut report = ProcessReport::default();
        for template in templates {
            let step = self.generate_occurrences(db_tx, template, today).await?;
            report.generated += step.generated;
            report.processed += step.processed;
        }
        Ok(report)
    }

    /// Creates one instance per occurrence dated on or before `today`, then
    /// stores the advanced counters.
    ///
    /// Templates pointing at an obsolete account or category are skipped.
    async fn generate_occurrences(
        &self,
        db_tx: &DatabaseTransaction,
        mut template: recurring_transactions::Model,
        today: NaiveDate,
    ) -> ResultEngine<ProcessReport> {
        let mut report = ProcessReport::default();
        if !template
            .next_occurrence
            .is_some_and(|next| next <= today)
        {
            return Ok(report);
        }
        if let Some(reason) = self.template_blocker(db_tx, &template).await? {
            tracing::warn!(recurring = %template.id, reason, "skipping recurring transaction");
            return Ok(report);
        }

        let fields = MoneyFields::try_from(&template)?;
        while let Some(date) = template.next_occurrence.filter(|next| *next <= today) {
            let draft = TransactionDraft {
                fields,
                date,
                description: template.description.clone(),
                needs_confirmation: template.needs_confirmation,
                recurring_transaction_id: Some(template.id),
                splitwise_transaction_id: None,
            };
            let (_, applied) = self.insert_transaction(db_tx, draft, today).await?;
            report.generated += 1;
            if applied {
                report.processed += 1;
            }

            template.occurrences += 1;
            template.last_occurrence = Some(date);
            refresh_schedule(&mut template)?;
        }

        let model = recurring_transactions::ActiveModel {
            id: ActiveValue::Set(template.id),
            occurrences: ActiveValue::Set(template.occurrences),
            last_occurrence: ActiveValue::Set(template.last_occurrence),
            next_occurrence: ActiveValue::Set(template.next_occurrence),
            is_finished: ActiveValue::Set(template.is_finished),
            ..Default::default()
        };
        model.update(db_tx).await?;
        tracing::debug!(
            recurring = %template.id,
            generated = report.generated,
            "recurring occurrences generated"
        );
        Ok(report)
    }

    /// Why a template cannot produce instances right now, if anything.
    async fn template_blocker(
        &self,
        db_tx: &DatabaseTransaction,
        template: &recurring_transactions::Model,
    ) -> ResultEngine<Option<&'static str>> {
        let account_ids: Vec<Uuid> = std::iter::once(template.account_id)
            .chain(template.receiving_account_id)
            .collect();
        let obsolete_account = accounts::Entity::find()
            .filter(accounts::Column::Id.is_in(account_ids))
            .filter(accounts::Column::IsObsolete.eq(true))
            .one(db_tx)
            .await?
            .is_some();
        if obsolete_account {
            return Ok(Some("account is obsolete"));
        }
        if let Some(category_id) = template.category_id {
            let obsolete_category = categories::Entity::find_by_id(category_id)
                .filter(categories::Column::IsObsolete.eq(true))
                .one(db_tx)
                .await?
                .is_some();
            if obsolete_category {
                return Ok(Some("category is obsolete"));
            }
        }
        Ok(None)
    }

    /// Copies the template onto its unprocessed instances, settling the ones
    /// that became due.
    async fn propagate_template(
        &self,
        db_tx: &DatabaseTransaction,
        template: &recurring_transactions::Model,
        today: NaiveDate,
    ) -> ResultEngine<()> {
        let pending = transactions::Entity::find()
            .filter(transactions::Column::RecurringTransactionId.eq(template.id))
            .filter(transactions::Column::Processed.eq(false))
            .all(db_tx)
            .await?;

        for mut instance in pending {
            instance.kind = template.kind.clone();
            instance.amount_minor = template.amount_minor;
            instance.description = template.description.clone();
            instance.account_id = template.account_id;
            instance.receiving_account_id = template.receiving_account_id;
            instance.category_id = template.category_id;
            if instance.needs_confirmation != template.needs_confirmation {
                instance.needs_confirmation = template.needs_confirmation;
                instance.is_confirmed = template.needs_confirmation.then_some(false);
            }
            full_active_model(&instance).update(db_tx).await?;
            self.settle_if_due(db_tx, &instance, today).await?;
        }
        Ok(())
    }
}
