use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub type Member = String;

fn default_category() -> String {
    "Other".to_string()
}

fn default_currency() -> String {
    "USD".to_string()
}

/// One ledger: the members, everything they spent together and every
/// payment already made between them. Stored as a single document.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Group {
    pub id: String,
    pub name: String,
    pub members: Vec<Member>,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub expenses: Vec<Expense>,
    #[serde(default)]
    pub settlements: Vec<Settlement>,
}

/// Older documents may miss `involved`, `settled` or `category`; the serde
/// defaults cover them here so nothing downstream has to re-default.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Expense {
    pub id: u32,
    pub title: String,
    pub amount: f64,
    pub payer: Member,
    /// Who splits this expense. Empty means "every group member".
    #[serde(default)]
    pub involved: Vec<Member>,
    #[serde(default)]
    pub settled: bool,
    pub date: NaiveDate,
    #[serde(default = "default_category")]
    pub category: String,
}

/// A payment made outside the ledger (cash handed over, bank transfer)
/// that offsets a computed debt between the same two people. Append-only;
/// the settlement engine reads these but never writes them.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Settlement {
    pub from_user: Member,
    pub to_user: Member,
    /// Always in the group's ledger currency.
    pub amount: f64,
    pub date: NaiveDate,
    #[serde(default)]
    pub notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exchange_rate: Option<f64>,
}

/// Payload for creating a group.
#[derive(Clone, Debug, Deserialize)]
pub struct NewGroup {
    pub name: String,
    pub members: Vec<Member>,
    #[serde(default = "default_currency")]
    pub currency: String,
}

/// Payload for recording an expense. The store assigns the id, the
/// settled flag starts false and a missing date becomes today.
#[derive(Clone, Debug, Deserialize)]
pub struct NewExpense {
    pub title: String,
    pub amount: f64,
    pub payer: Member,
    #[serde(default)]
    pub involved: Vec<Member>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default = "default_category")]
    pub category: String,
}

/// Payload for recording a settlement. A `currency` other than the group's
/// ledger currency is converted on the way in, keeping the original amount
/// and rate on the record.
#[derive(Clone, Debug, Deserialize)]
pub struct NewSettlement {
    pub from_user: Member,
    pub to_user: Member,
    pub amount: f64,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: String,
}
