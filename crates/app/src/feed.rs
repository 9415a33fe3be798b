use std::{future::Future, path::PathBuf};

use chrono::{DateTime, Utc};
use engine::{SourceError, SplitwiseExpense, SplitwiseSource};

/// Splitwise expenses exported as a JSON array of [`SplitwiseExpense`].
#[derive(Debug, Clone)]
pub struct JsonFeed {
    path: PathBuf,
}

impl JsonFeed {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl SplitwiseSource for JsonFeed {
    fn fetch_expenses(
        &self,
        updated_after: Option<DateTime<Utc>>,
    ) -> impl Future<Output = Result<Vec<SplitwiseExpense>, SourceError>> + Send {
        let path = self.path.clone();
        async move {
            let raw = tokio::fs::read(&path).await?;
            let expenses: Vec<SplitwiseExpense> = serde_json::from_slice(&raw)?;
            Ok(expenses
                .into_iter()
                .filter(|expense| updated_after.is_none_or(|after| expense.updated_at > after))
                .collect())
        }
    }
}
