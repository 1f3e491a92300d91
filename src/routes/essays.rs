// src/routes/essays.rs
use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
};
use chrono::Utc;
use sqlx::{Pool, QueryBuilder, Sqlite};
use tracing;

use crate::auth::AuthUser;
use crate::models::{CreateEssayPayload, Essay, UpdateEssayPayload, blank_to_none};
use crate::state::AppState;

/// 公開のエッセイルート (/essays) を構築します
pub fn create_essay_routes() -> Router<AppState> {
    Router::new().route("/essays", get(list_essays))
}

/// 管理用のエッセイルート (/admin/essays/...) を構築します
pub fn create_essay_admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/essays", post(create_essay))
        .route("/admin/essays/:essay_id", put(update_essay).delete(delete_essay))
}

async fn fetch_essay(db_pool: &Pool<Sqlite>, id: i64) -> Result<Essay, (StatusCode, String)> {
    match sqlx::query_as::<_, Essay>("SELECT * FROM essays WHERE id = ?")
        .bind(id)
        .fetch_optional(db_pool)
        .await
    {
        Ok(Some(essay)) => Ok(essay),
        Ok(None) => Err((StatusCode::NOT_FOUND, "Essay not found".to_string())),
        Err(e) => {
            tracing::error!("Database error fetching essay {}: {}", id, e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Database error: {}", e),
            ))
        }
    }
}

/// エッセイ一覧を新しい順に取得 (GET /essays)
#[utoipa::path(
    get,
    path = "/api/essays",
    tag = "Essays",
    responses(
        (status = 200, description = "エッセイのリスト (公開日の新しい順)", body = Vec<Essay>),
        (status = 500, description = "サーバーエラー")
    )
)]
async fn list_essays(
    State(state): State<AppState>,
) -> Result<Json<Vec<Essay>>, (StatusCode, String)> {
    let result = sqlx::query_as::<_, Essay>("SELECT * FROM essays ORDER BY published_at DESC")
        .fetch_all(&state.db_pool)
        .await;

    match result {
        Ok(essays) => Ok(Json(essays)),
        Err(e) => {
            tracing::error!("Database error in list_essays: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Database error: {}", e),
            ))
        }
    }
}

/// エッセイを登録 (POST /admin/essays)
#[utoipa::path(
    post,
    path = "/api/admin/essays",
    tag = "Essays",
    request_body = CreateEssayPayload,
    responses(
        (status = 201, description = "作成されたエッセイ", body = Essay),
        (status = 400, description = "必須フィールドが空"),
        (status = 500, description = "サーバーエラー")
    ),
    security(("bearer_auth" = []))
)]
async fn create_essay(
    State(state): State<AppState>,
    Extension(_auth_user): Extension<AuthUser>,
    Json(payload): Json<CreateEssayPayload>,
) -> Result<(StatusCode, Json<Essay>), (StatusCode, String)> {
    if payload.title.trim().is_empty() || payload.body.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Title and body are required.".to_string(),
        ));
    }

    let published_at =
        blank_to_none(payload.published_at).unwrap_or_else(|| Utc::now().to_rfc3339());

    let result = sqlx::query(
        "INSERT INTO essays (title, category, cover_url, body, published_at)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(payload.title.trim())
    .bind(blank_to_none(payload.category))
    .bind(blank_to_none(payload.cover_url))
    .bind(&payload.body)
    .bind(&published_at)
    .execute(&state.db_pool)
    .await;

    match result {
        Ok(db_result) => {
            let essay = fetch_essay(&state.db_pool, db_result.last_insert_rowid()).await?;
            tracing::info!("Essay created: {} ({})", essay.title, essay.id);
            Ok((StatusCode::CREATED, Json(essay)))
        }
        Err(e) => {
            tracing::error!("Failed to create essay: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Database error: {}", e),
            ))
        }
    }
}

/// エッセイを部分更新 (PUT /admin/essays/:essay_id)
#[utoipa::path(
    put,
    path = "/api/admin/essays/{essay_id}",
    tag = "Essays",
    params(("essay_id" = i64, Path, description = "エッセイID")),
    request_body = UpdateEssayPayload,
    responses(
        (status = 200, description = "更新後のエッセイ", body = Essay),
        (status = 400, description = "必須フィールドが空"),
        (status = 404, description = "エッセイが見つからない"),
        (status = 500, description = "サーバーエラー")
    ),
    security(("bearer_auth" = []))
)]
async fn update_essay(
    State(state): State<AppState>,
    Path(essay_id): Path<i64>,
    Extension(_auth_user): Extension<AuthUser>,
    Json(payload): Json<UpdateEssayPayload>,
) -> Result<Json<Essay>, (StatusCode, String)> {
    for (field, value) in [("Title", &payload.title), ("Body", &payload.body)] {
        if let Some(value) = value {
            if value.trim().is_empty() {
                return Err((
                    StatusCode::BAD_REQUEST,
                    format!("{} must not be empty.", field),
                ));
            }
        }
    }

    let mut query_builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE essays SET ");
    let mut updates = query_builder.separated(", ");
    let mut has_updates = false;

    if let Some(title) = &payload.title {
        updates.push("title = ").push_bind_unseparated(title.trim().to_string());
        has_updates = true;
    }
    if payload.category.is_some() {
        updates.push("category = ").push_bind_unseparated(blank_to_none(payload.category.clone()));
        has_updates = true;
    }
    if payload.cover_url.is_some() {
        updates.push("cover_url = ").push_bind_unseparated(blank_to_none(payload.cover_url.clone()));
        has_updates = true;
    }
    if let Some(body) = &payload.body {
        updates.push("body = ").push_bind_unseparated(body.clone());
        has_updates = true;
    }
    if let Some(published_at) = &payload.published_at {
        updates.push("published_at = ").push_bind_unseparated(published_at.clone());
        has_updates = true;
    }

    if !has_updates {
        return Ok(Json(fetch_essay(&state.db_pool, essay_id).await?));
    }

    query_builder.push(" WHERE id = ");
    query_builder.push_bind(essay_id);

    match query_builder.build().execute(&state.db_pool).await {
        Ok(db_result) if db_result.rows_affected() == 0 => {
            Err((StatusCode::NOT_FOUND, "Essay not found".to_string()))
        }
        Ok(_) => Ok(Json(fetch_essay(&state.db_pool, essay_id).await?)),
        Err(e) => {
            tracing::error!("Failed to update essay {}: {}", essay_id, e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Database error: {}", e),
            ))
        }
    }
}

/// エッセイを削除 (DELETE /admin/essays/:essay_id)
#[utoipa::path(
    delete,
    path = "/api/admin/essays/{essay_id}",
    tag = "Essays",
    params(("essay_id" = i64, Path, description = "エッセイID")),
    responses(
        (status = 204, description = "削除成功"),
        (status = 404, description = "エッセイが見つからない"),
        (status = 500, description = "サーバーエラー")
    ),
    security(("bearer_auth" = []))
)]
async fn delete_essay(
    State(state): State<AppState>,
    Path(essay_id): Path<i64>,
    Extension(_auth_user): Extension<AuthUser>,
) -> Result<StatusCode, (StatusCode, String)> {
    match sqlx::query("DELETE FROM essays WHERE id = ?")
        .bind(essay_id)
        .execute(&state.db_pool)
        .await
    {
        Ok(db_result) if db_result.rows_affected() == 0 => {
            Err((StatusCode::NOT_FOUND, "Essay not found".to_string()))
        }
        Ok(_) => {
            tracing::info!("Essay deleted: {}", essay_id);
            Ok(StatusCode::NO_CONTENT)
        }
        Err(e) => {
            tracing::error!("Failed to delete essay {}: {}", essay_id, e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Database error: {}", e),
            ))
        }
    }
}
