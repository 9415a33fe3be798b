use sea_orm::{
    ActiveValue, Condition, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait,
    prelude::*, sea_query::Expr,
};
use uuid::Uuid;

use crate::{
    Account, AccountKind, EngineError, ResultEngine, UpdateAccountCmd, accounts, daily_balances,
    recurring_transactions, transactions,
    util::{normalize_key, normalize_required_text},
};

use super::{Engine, with_tx};

impl Engine {
    /// Return an account snapshot from DB.
    pub async fn account(&self, account_id: Uuid) -> ResultEngine<Account> {
        let model = accounts::Entity::find_by_id(account_id)
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("account not exists".to_string()))?;
        Account::try_from(model)
    }

    /// Accounts ordered by description. Obsolete ones only when asked.
    pub async fn list_accounts(&self, include_obsolete: bool) -> ResultEngine<Vec<Account>> {
        let mut query = accounts::Entity::find();
        if !include_obsolete {
            query = query.filter(accounts::Column::IsObsolete.eq(false));
        }
        let models = query
            .order_by_asc(accounts::Column::DescriptionNorm)
            .all(&self.database)
            .await?;
        models.into_iter().map(Account::try_from).collect()
    }

    /// The account new transactions default to, if one is set.
    pub async fn default_account(&self) -> ResultEngine<Option<Account>> {
        accounts::Entity::find()
            .filter(accounts::Column::IsDefault.eq(true))
            .one(&self.database)
            .await?
            .map(Account::try_from)
            .transpose()
    }

    /// Add a new account with a zero balance.
    ///
    /// Descriptions are unique (case and accent insensitive). At most one
    /// Splitwise account exists and it can never be the default one; marking
    /// a new account as default clears the flag on the previous one.
    pub async fn create_account(
        &self,
        description: &str,
        kind: AccountKind,
        is_default: bool,
    ) -> ResultEngine<Uuid> {
        let description = normalize_required_text(description, "account")?;
        let description_norm = normalize_key(&description, "account")?;
        if kind == AccountKind::Splitwise && is_default {
            return Err(EngineError::InvalidAccount(
                "the splitwise account cannot be the default one".to_string(),
            ));
        }

        with_tx!(self, |db_tx| {
            self.ensure_account_description_free(&db_tx, &description_norm, None)
                .await?;
            if kind == AccountKind::Splitwise && self.splitwise_account(&db_tx).await?.is_some() {
                return Err(EngineError::ExistingKey("splitwise account".to_string()));
            }
            if is_default {
                self.clear_default_account(&db_tx).await?;
            }

            let id = Uuid::new_v4();
            let model = accounts::ActiveModel {
                id: ActiveValue::Set(id),
                description: ActiveValue::Set(description.clone()),
                description_norm: ActiveValue::Set(description_norm.clone()),
                kind: ActiveValue::Set(kind.as_str().to_string()),
                is_default: ActiveValue::Set(is_default),
                is_obsolete: ActiveValue::Set(false),
                current_balance_minor: ActiveValue::Set(0),
            };
            model.insert(&db_tx).await?;
            tracing::info!(account = %id, kind = kind.as_str(), "account created");
            Ok(id)
        })
    }

    /// Rename an account, move the default flag or mark it obsolete.
    ///
    /// An obsolete account cannot be the default: obsoleting the default
    /// account clears the flag.
    pub async fn update_account(&self, cmd: UpdateAccountCmd) -> ResultEngine<()> {
        let UpdateAccountCmd {
            account_id,
            description,
            is_default,
            is_obsolete,
        } = cmd;
        let description = description
            .map(|d| normalize_required_text(&d, "account"))
            .transpose()?;

        with_tx!(self, |db_tx| {
            let current = self.require_account(&db_tx, account_id).await?;
            let kind = AccountKind::try_from(current.kind.as_str())?;
            let obsolete = is_obsolete.unwrap_or(current.is_obsolete);
            let default = match (is_default, is_obsolete) {
                (Some(value), _) => value,
                (None, Some(true)) => false,
                (None, _) => current.is_default,
            };
            if default && obsolete {
                return Err(EngineError::InvalidAccount(
                    "an obsolete account cannot be the default one".to_string(),
                ));
            }
            if default && kind == AccountKind::Splitwise {
                return Err(EngineError::InvalidAccount(
                    "the splitwise account cannot be the default one".to_string(),
                ));
            }

            let mut model = accounts::ActiveModel {
                id: ActiveValue::Set(account_id),
                is_default: ActiveValue::Set(default),
                is_obsolete: ActiveValue::Set(obsolete),
                ..Default::default()
            };
            if let Some(description) = description.as_ref() {
                let description_norm = normalize_key(description, "account")?;
                self.ensure_account_description_free(&db_tx, &description_norm, Some(account_id))
                    .await?;
                model.description = ActiveValue::Set(description.clone());
                model.description_norm = ActiveValue::Set(description_norm);
            }
            if default && !current.is_default {
                self.clear_default_account(&db_tx).await?;
            }
            model.update(&db_tx).await?;
            Ok(())
        })
    }

    /// Delete an account nothing refers to. Accounts with history should be
    /// marked obsolete instead.
    pub async fn delete_account(&self, account_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            self.require_account(&db_tx, account_id).await?;

            let used_by_transactions = transactions::Entity::find()
                .filter(
                    Condition::any()
                        .add(transactions::Column::AccountId.eq(account_id))
                        .add(transactions::Column::ReceivingAccountId.eq(account_id)),
                )
                .one(&db_tx)
                .await?
                .is_some();
            let used_by_recurring = recurring_transactions::Entity::find()
                .filter(
                    Condition::any()
                        .add(recurring_transactions::Column::AccountId.eq(account_id))
                        .add(recurring_transactions::Column::ReceivingAccountId.eq(account_id)),
                )
                .one(&db_tx)
                .await?
                .is_some();
            if used_by_transactions || used_by_recurring {
                return Err(EngineError::InUse(
                    "account has transactions, mark it obsolete instead".to_string(),
                ));
            }

            daily_balances::Entity::delete_many()
                .filter(daily_balances::Column::AccountId.eq(account_id))
                .exec(&db_tx)
                .await?;
            accounts::Entity::delete_by_id(account_id)
                .exec(&db_tx)
                .await?;
            Ok(())
        })
    }

    async fn ensure_account_description_free(
        &self,
        db_tx: &DatabaseTransaction,
        description_norm: &str,
        except: Option<Uuid>,
    ) -> ResultEngine<()> {
        let mut query =
            accounts::Entity::find().filter(accounts::Column::DescriptionNorm.eq(description_norm));
        if let Some(id) = except {
            query = query.filter(accounts::Column::Id.ne(id));
        }
        if query.one(db_tx).await?.is_some() {
            return Err(EngineError::ExistingKey(description_norm.to_string()));
        }
        Ok(())
    }

    async fn clear_default_account(&self, db_tx: &DatabaseTransaction) -> ResultEngine<()> {
        accounts::Entity::update_many()
            .col_expr(accounts::Column::IsDefault, Expr::value(false))
            .filter(accounts::Column::IsDefault.eq(true))
            .exec(db_tx)
            .await?;
        Ok(())
    }
}
