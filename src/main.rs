use std::collections::HashMap;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{delete, get, post, put, web, App, HttpResponse, HttpServer};
use mongodb::Client;
use serde::{Deserialize, Serialize};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod balance;
mod error;
mod rates;
mod schemas;
mod settle;
mod store;

use crate::balance::compute_balances;
use crate::error::ApiError;
use crate::rates::{RateSource, StaticRates};
use crate::schemas::{Group, NewExpense, NewGroup, NewSettlement, Settlement};
use crate::settle::outstanding_debts;
use crate::store::GroupStore;

fn require_amount(amount: f64) -> Result<(), ApiError> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(ApiError::InvalidInput(
            "amount must be a non-negative number".to_string(),
        ));
    }
    Ok(())
}

#[put("/groups/{id}")]
async fn add_group(
    store: web::Data<GroupStore>,
    id: web::Path<String>,
    json: web::Json<NewGroup>,
) -> Result<HttpResponse, ApiError> {
    let new = json.into_inner();
    if new.name.trim().is_empty() {
        return Err(ApiError::InvalidInput("the group needs a name".to_string()));
    }
    if new.members.is_empty() {
        return Err(ApiError::InvalidInput(
            "the group needs at least one member".to_string(),
        ));
    }
    let group = Group {
        id: id.into_inner(),
        name: new.name,
        members: new.members,
        currency: new.currency,
        expenses: vec![],
        settlements: vec![],
    };
    store.create_group(group).await?;
    Ok(HttpResponse::Ok().body("Group added"))
}

#[derive(Serialize)]
struct GroupListEntry {
    id: String,
    name: String,
}

#[get("/groups")]
async fn list_groups(store: web::Data<GroupStore>) -> Result<HttpResponse, ApiError> {
    let entries: Vec<GroupListEntry> = store
        .list_groups()
        .await?
        .into_iter()
        .map(|group| GroupListEntry {
            id: group.id,
            name: group.name,
        })
        .collect();
    Ok(HttpResponse::Ok().json(entries))
}

#[get("/groups/{id}")]
async fn get_group(
    store: web::Data<GroupStore>,
    id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let group = store
        .load_group(&id.into_inner())
        .await?
        .ok_or(ApiError::GroupNotFound)?;
    Ok(HttpResponse::Ok().json(group))
}

#[post("/groups/{id}/expenses")]
async fn add_expense(
    store: web::Data<GroupStore>,
    id: web::Path<String>,
    json: web::Json<NewExpense>,
) -> Result<HttpResponse, ApiError> {
    let new = json.into_inner();
    if new.title.trim().is_empty() {
        return Err(ApiError::InvalidInput(
            "the expense needs a description".to_string(),
        ));
    }
    require_amount(new.amount)?;
    store
        .add_expense(&id.into_inner(), new)
        .await?
        .ok_or(ApiError::GroupNotFound)?;
    Ok(HttpResponse::Ok().body("Expense added"))
}

#[derive(Deserialize)]
struct SettleExpensesJson {
    ids: Vec<u32>,
}

#[post("/groups/{id}/expenses/settle")]
async fn settle_expenses(
    store: web::Data<GroupStore>,
    id: web::Path<String>,
    json: web::Json<SettleExpensesJson>,
) -> Result<HttpResponse, ApiError> {
    let settled = store
        .settle_expenses(&id.into_inner(), &json.into_inner().ids)
        .await?
        .ok_or(ApiError::GroupNotFound)?;
    Ok(HttpResponse::Ok().body(format!("Settled {} expenses", settled)))
}

#[delete("/groups/{id}/expenses")]
async fn reset_expenses(
    store: web::Data<GroupStore>,
    id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    if !store.reset_expenses(&id.into_inner()).await? {
        return Err(ApiError::GroupNotFound);
    }
    Ok(HttpResponse::Ok().body("Expenses cleared"))
}

#[derive(Deserialize, Serialize)]
struct MemberJson {
    name: String,
}

#[post("/groups/{id}/members")]
async fn add_member(
    store: web::Data<GroupStore>,
    id: web::Path<String>,
    json: web::Json<MemberJson>,
) -> Result<HttpResponse, ApiError> {
    let id = id.into_inner();
    let name = json.into_inner().name;
    if name.trim().is_empty() {
        return Err(ApiError::InvalidInput("the member needs a name".to_string()));
    }
    let group = store.load_group(&id).await?.ok_or(ApiError::GroupNotFound)?;
    if group.members.contains(&name) {
        return Err(ApiError::DuplicateMember(name));
    }
    store.push_member(&id, &name).await?;
    Ok(HttpResponse::Ok().body("Member added"))
}

#[delete("/groups/{id}/members/{name}")]
async fn remove_member(
    store: web::Data<GroupStore>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, ApiError> {
    let (id, name) = path.into_inner();
    let group = store.load_group(&id).await?.ok_or(ApiError::GroupNotFound)?;
    if !group.members.contains(&name) {
        return Err(ApiError::UnknownMember(name));
    }
    if group.members.len() == 1 {
        return Err(ApiError::LastMember);
    }
    store.pull_member(&id, &name).await?;
    Ok(HttpResponse::Ok().body("Member removed"))
}

#[post("/groups/{id}/settlements")]
async fn add_settlement(
    store: web::Data<GroupStore>,
    rates: web::Data<dyn RateSource>,
    id: web::Path<String>,
    json: web::Json<NewSettlement>,
) -> Result<HttpResponse, ApiError> {
    let id = id.into_inner();
    let new = json.into_inner();
    require_amount(new.amount)?;
    if new.from_user == new.to_user {
        return Err(ApiError::InvalidInput(
            "a settlement needs two different members".to_string(),
        ));
    }
    let group = store.load_group(&id).await?.ok_or(ApiError::GroupNotFound)?;
    for user in [&new.from_user, &new.to_user] {
        if !group.members.contains(user) {
            return Err(ApiError::UnknownMember(user.clone()));
        }
    }

    let date = new.date.unwrap_or_else(|| chrono::Utc::now().date_naive());
    let settlement = match new.currency {
        Some(currency) if currency != group.currency => {
            let rate = rates
                .rate(&currency, &group.currency)
                .ok_or_else(|| ApiError::UnknownCurrency(currency.clone(), group.currency.clone()))?;
            Settlement {
                from_user: new.from_user,
                to_user: new.to_user,
                amount: new.amount * rate,
                date,
                notes: new.notes,
                original_amount: Some(new.amount),
                original_currency: Some(currency),
                exchange_rate: Some(rate),
            }
        }
        _ => Settlement {
            from_user: new.from_user,
            to_user: new.to_user,
            amount: new.amount,
            date,
            notes: new.notes,
            original_amount: None,
            original_currency: None,
            exchange_rate: None,
        },
    };
    store.push_settlement(&id, &settlement).await?;
    Ok(HttpResponse::Ok().body("Settlement recorded"))
}

#[get("/groups/{id}/balance")]
async fn get_balance(
    store: web::Data<GroupStore>,
    id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let group = store
        .load_group(&id.into_inner())
        .await?
        .ok_or(ApiError::GroupNotFound)?;
    Ok(HttpResponse::Ok().json(compute_balances(&group.expenses, &group.members)))
}

#[get("/groups/{id}/debts")]
async fn get_debts(
    store: web::Data<GroupStore>,
    id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let group = store
        .load_group(&id.into_inner())
        .await?
        .ok_or(ApiError::GroupNotFound)?;
    Ok(HttpResponse::Ok().json(outstanding_debts(&group)))
}

#[derive(Serialize)]
struct GroupSummary {
    total_unsettled: f64,
    pending_settlements: usize,
    by_category: HashMap<String, f64>,
    by_payer: HashMap<String, f64>,
}

#[get("/groups/{id}/summary")]
async fn get_summary(
    store: web::Data<GroupStore>,
    id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let group = store
        .load_group(&id.into_inner())
        .await?
        .ok_or(ApiError::GroupNotFound)?;
    let debts = outstanding_debts(&group);

    let mut total_unsettled = 0.0;
    let mut by_category: HashMap<String, f64> = HashMap::new();
    let mut by_payer: HashMap<String, f64> = HashMap::new();
    for expense in group.expenses.iter().filter(|e| !e.settled) {
        total_unsettled += expense.amount;
        *by_category.entry(expense.category.clone()).or_insert(0.0) += expense.amount;
        *by_payer.entry(expense.payer.clone()).or_insert(0.0) += expense.amount;
    }

    Ok(HttpResponse::Ok().json(GroupSummary {
        total_unsettled,
        pending_settlements: debts.len(),
        by_category,
        by_payer,
    }))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let uri = std::env::var("MONGODB_URI").expect("You need to add the MONGODB_URI to the env");
    info!("Using the following URI: {}", uri);

    let client = Client::with_uri_str(uri).await.expect("failed to connect");
    info!("Connected");

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let store = GroupStore::new(&client);
    let rates: Arc<dyn RateSource> = Arc::new(StaticRates::from_env());

    HttpServer::new(move || {
        App::new()
            .wrap(Cors::permissive())
            .app_data(web::Data::new(store.clone()))
            .app_data(web::Data::from(rates.clone()))
            .service(add_group)
            .service(list_groups)
            .service(get_group)
            .service(add_expense)
            .service(settle_expenses)
            .service(reset_expenses)
            .service(add_member)
            .service(remove_member)
            .service(add_settlement)
            .service(get_balance)
            .service(get_debts)
            .service(get_summary)
    })
    .bind(bind_addr)?
    .run()
    .await
}
