use chrono::Utc;
use futures::TryStreamExt;
use mongodb::options::UpdateOptions;
use mongodb::{bson::doc, Client, Collection};
use tracing::debug;

use crate::error::StoreError;
use crate::schemas::{Expense, Group, NewExpense, Settlement};

const DATABASE: &str = "SplitPay";

/// Repository over the Groups collection. Route handlers go through here,
/// so the settlement engine itself never sees the database.
#[derive(Clone)]
pub struct GroupStore {
    groups: Collection<Group>,
}

impl GroupStore {
    pub fn new(client: &Client) -> Self {
        GroupStore {
            groups: client.database(DATABASE).collection("Groups"),
        }
    }

    pub async fn load_group(&self, id: &str) -> Result<Option<Group>, StoreError> {
        Ok(self.groups.find_one(doc! { "id": id }, None).await?)
    }

    pub async fn list_groups(&self) -> Result<Vec<Group>, StoreError> {
        Ok(self.groups.find(None, None).await?.try_collect().await?)
    }

    pub async fn create_group(&self, group: Group) -> Result<(), StoreError> {
        debug!(id = %group.id, "creating group");
        self.groups.insert_one(group, None).await?;
        Ok(())
    }

    /// Appends an expense, assigning the next free id and defaulting a
    /// missing date to today. Returns the stored record, or `None` when
    /// the group doesn't exist.
    pub async fn add_expense(
        &self,
        id: &str,
        new: NewExpense,
    ) -> Result<Option<Expense>, StoreError> {
        let Some(group) = self.load_group(id).await? else {
            return Ok(None);
        };
        let next_id = group.expenses.iter().map(|e| e.id).max().map_or(1, |n| n + 1);
        let expense = Expense {
            id: next_id,
            title: new.title,
            amount: new.amount,
            payer: new.payer,
            involved: new.involved,
            settled: false,
            date: new.date.unwrap_or_else(|| Utc::now().date_naive()),
            category: new.category,
        };
        self.groups
            .update_one(
                doc! { "id": id },
                doc! { "$push": { "expenses": bson::to_bson(&expense)? } },
                None,
            )
            .await?;
        debug!(group = id, expense = expense.id, "expense added");
        Ok(Some(expense))
    }

    /// Marks the given expense ids as settled. Returns how many expenses
    /// changed, or `None` when the group doesn't exist.
    pub async fn settle_expenses(&self, id: &str, ids: &[u32]) -> Result<Option<u64>, StoreError> {
        let ids: Vec<i64> = ids.iter().map(|&n| i64::from(n)).collect();
        let options = UpdateOptions::builder()
            .array_filters(vec![doc! { "exp.id": { "$in": ids } }])
            .build();
        let result = self
            .groups
            .update_one(
                doc! { "id": id },
                doc! { "$set": { "expenses.$[exp].settled": true } },
                options,
            )
            .await?;
        if result.matched_count == 0 {
            return Ok(None);
        }
        debug!(group = id, settled = result.modified_count, "expenses settled");
        Ok(Some(result.modified_count))
    }

    /// Clears the ledger: every expense and every recorded settlement.
    pub async fn reset_expenses(&self, id: &str) -> Result<bool, StoreError> {
        let result = self
            .groups
            .update_one(
                doc! { "id": id },
                doc! { "$set": { "expenses": [], "settlements": [] } },
                None,
            )
            .await?;
        Ok(result.matched_count > 0)
    }

    pub async fn push_member(&self, id: &str, name: &str) -> Result<(), StoreError> {
        self.groups
            .update_one(doc! { "id": id }, doc! { "$push": { "members": name } }, None)
            .await?;
        debug!(group = id, member = name, "member added");
        Ok(())
    }

    pub async fn pull_member(&self, id: &str, name: &str) -> Result<(), StoreError> {
        self.groups
            .update_one(doc! { "id": id }, doc! { "$pull": { "members": name } }, None)
            .await?;
        debug!(group = id, member = name, "member removed");
        Ok(())
    }

    pub async fn push_settlement(
        &self,
        id: &str,
        settlement: &Settlement,
    ) -> Result<(), StoreError> {
        self.groups
            .update_one(
                doc! { "id": id },
                doc! { "$push": { "settlements": bson::to_bson(settlement)? } },
                None,
            )
            .await?;
        debug!(group = id, from = %settlement.from_user, to = %settlement.to_user, "settlement recorded");
        Ok(())
    }
}
