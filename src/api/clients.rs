use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder};
use serde_json::json;
use uuid::Uuid;

use crate::entities::{client, request, Client, Pet, Request};

#[derive(serde::Deserialize)]
pub struct SearchParams {
    q: Option<String>,
}

/// Newest first. `term` matches name and email case-insensitively, phone by substring.
pub async fn search_clients(db: &DatabaseConnection, term: Option<&str>) -> Result<Vec<client::Model>, DbErr> {
    let mut query = Client::find().order_by_desc(client::Column::CreatedAt);
    if let Some(term) = term.map(str::trim).filter(|t| !t.is_empty()) {
        let pattern = format!("%{}%", term.to_lowercase());
        query = query.filter(
            Condition::any()
                .add(Expr::expr(Func::lower(Expr::col(client::Column::Name))).like(pattern.clone()))
                .add(Expr::expr(Func::lower(Expr::col(client::Column::Email))).like(pattern))
                .add(client::Column::Phone.contains(term)),
        );
    }
    query.all(db).await
}

pub async fn list_clients(
    Extension(db): Extension<DatabaseConnection>,
    Query(params): Query<SearchParams>,
) -> Response {
    match search_clients(&db, params.q.as_deref()).await {
        Ok(clients) => (StatusCode::OK, Json(clients)).into_response(),
        Err(e) => super::store_error("list clients", e),
    }
}

/// Client profile with pets and the booking requests made from their phone.
pub async fn get_client(
    Extension(db): Extension<DatabaseConnection>,
    Path(client_id): Path<Uuid>,
) -> Response {
    let (client, pets) = match Client::find_by_id(client_id).find_with_related(Pet).all(&db).await {
        Ok(mut rows) if !rows.is_empty() => rows.remove(0),
        Ok(_) => return super::error_response(StatusCode::NOT_FOUND, "Client not found"),
        Err(e) => return super::store_error("load client", e),
    };

    let requests = match Request::find()
        .filter(request::Column::ClientPhone.eq(client.phone.clone()))
        .order_by_desc(request::Column::CreatedAt)
        .all(&db)
        .await
    {
        Ok(r) => r,
        Err(e) => return super::store_error("load client requests", e),
    };

    (
        StatusCode::OK,
        Json(json!({"client": client, "pets": pets, "requests": requests})),
    )
        .into_response()
}
