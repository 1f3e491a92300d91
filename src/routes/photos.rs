// src/routes/photos.rs
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
use crate::models::{CreatePhotoPayload, Photo, UpdatePhotoPayload, blank_to_none};
use crate::state::AppState;

/// 公開の写真ルート (/photos) を構築します
pub fn create_photo_routes() -> Router<AppState> {
    Router::new().route("/photos", get(list_photos))
}

/// 管理用の写真ルート (/admin/photos/...) を構築します
pub fn create_photo_admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/photos", post(create_photo))
        .route("/admin/photos/:photo_id", put(update_photo).delete(delete_photo))
}

async fn fetch_photo(db_pool: &Pool<Sqlite>, id: i64) -> Result<Photo, (StatusCode, String)> {
    match sqlx::query_as::<_, Photo>("SELECT * FROM photos WHERE id = ?")
        .bind(id)
        .fetch_optional(db_pool)
        .await
    {
        Ok(Some(photo)) => Ok(photo),
        Ok(None) => Err((StatusCode::NOT_FOUND, "Photo not found".to_string())),
        Err(e) => {
            tracing::error!("Database error fetching photo {}: {}", id, e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Database error: {}", e),
            ))
        }
    }
}

/// ギャラリーの写真一覧を取得 (GET /photos)
/// 並び順は挿入順
#[utoipa::path(
    get,
    path = "/api/photos",
    tag = "Photos",
    responses(
        (status = 200, description = "写真のリスト (挿入順)", body = Vec<Photo>),
        (status = 500, description = "サーバーエラー")
    )
)]
async fn list_photos(
    State(state): State<AppState>,
) -> Result<Json<Vec<Photo>>, (StatusCode, String)> {
    let result = sqlx::query_as::<_, Photo>("SELECT * FROM photos ORDER BY id ASC")
        .fetch_all(&state.db_pool)
        .await;

    match result {
        Ok(photos) => Ok(Json(photos)),
        Err(e) => {
            tracing::error!("Database error in list_photos: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Database error: {}", e),
            ))
        }
    }
}

/// 写真を登録 (POST /admin/photos)
#[utoipa::path(
    post,
    path = "/api/admin/photos",
    tag = "Photos",
    request_body = CreatePhotoPayload,
    responses(
        (status = 201, description = "作成された写真", body = Photo),
        (status = 400, description = "必須フィールドが空"),
        (status = 500, description = "サーバーエラー")
    ),
    security(("bearer_auth" = []))
)]
async fn create_photo(
    State(state): State<AppState>,
    Extension(_auth_user): Extension<AuthUser>,
    Json(payload): Json<CreatePhotoPayload>,
) -> Result<(StatusCode, Json<Photo>), (StatusCode, String)> {
    if payload.url.trim().is_empty() || payload.title.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "URL and title are required.".to_string(),
        ));
    }

    let taken_at = blank_to_none(payload.taken_at).unwrap_or_else(|| Utc::now().to_rfc3339());

    let result = sqlx::query(
        "INSERT INTO photos (url, title, location, description, taken_at, camera, lens, settings)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(payload.url.trim())
    .bind(payload.title.trim())
    .bind(blank_to_none(payload.location))
    .bind(blank_to_none(payload.description))
    .bind(&taken_at)
    .bind(blank_to_none(payload.camera))
    .bind(blank_to_none(payload.lens))
    .bind(blank_to_none(payload.settings))
    .execute(&state.db_pool)
    .await;

    match result {
        Ok(db_result) => {
            let photo = fetch_photo(&state.db_pool, db_result.last_insert_rowid()).await?;
            tracing::info!("Photo created: {} ({})", photo.title, photo.id);
            Ok((StatusCode::CREATED, Json(photo)))
        }
        Err(e) => {
            tracing::error!("Failed to create photo: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Database error: {}", e),
            ))
        }
    }
}

/// 写真を部分更新 (PUT /admin/photos/:photo_id)
/// 省略されたフィールドは変更しない。省略可能なフィールドに空文字を
/// 渡すと NULL に戻る
#[utoipa::path(
    put,
    path = "/api/admin/photos/{photo_id}",
    tag = "Photos",
    params(("photo_id" = i64, Path, description = "写真ID")),
    request_body = UpdatePhotoPayload,
    responses(
        (status = 200, description = "更新後の写真", body = Photo),
        (status = 400, description = "必須フィールドが空"),
        (status = 404, description = "写真が見つからない"),
        (status = 500, description = "サーバーエラー")
    ),
    security(("bearer_auth" = []))
)]
async fn update_photo(
    State(state): State<AppState>,
    Path(photo_id): Path<i64>,
    Extension(_auth_user): Extension<AuthUser>,
    Json(payload): Json<UpdatePhotoPayload>,
) -> Result<Json<Photo>, (StatusCode, String)> {
    // 必須フィールドは空にできない
    for (field, value) in [("URL", &payload.url), ("Title", &payload.title)] {
        if let Some(value) = value {
            if value.trim().is_empty() {
                return Err((
                    StatusCode::BAD_REQUEST,
                    format!("{} must not be empty.", field),
                ));
            }
        }
    }

    let mut query_builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE photos SET ");
    let mut updates = query_builder.separated(", ");
    let mut has_updates = false;

    if let Some(url) = &payload.url {
        updates.push("url = ").push_bind_unseparated(url.trim().to_string());
        has_updates = true;
    }
    if let Some(title) = &payload.title {
        updates.push("title = ").push_bind_unseparated(title.trim().to_string());
        has_updates = true;
    }
    if payload.location.is_some() {
        updates.push("location = ").push_bind_unseparated(blank_to_none(payload.location.clone()));
        has_updates = true;
    }
    if payload.description.is_some() {
        updates.push("description = ").push_bind_unseparated(blank_to_none(payload.description.clone()));
        has_updates = true;
    }
    if let Some(taken_at) = &payload.taken_at {
        updates.push("taken_at = ").push_bind_unseparated(taken_at.clone());
        has_updates = true;
    }
    if payload.camera.is_some() {
        updates.push("camera = ").push_bind_unseparated(blank_to_none(payload.camera.clone()));
        has_updates = true;
    }
    if payload.lens.is_some() {
        updates.push("lens = ").push_bind_unseparated(blank_to_none(payload.lens.clone()));
        has_updates = true;
    }
    if payload.settings.is_some() {
        updates.push("settings = ").push_bind_unseparated(blank_to_none(payload.settings.clone()));
        has_updates = true;
    }

    // 変更なし: 現在の行をそのまま返す
    if !has_updates {
        return Ok(Json(fetch_photo(&state.db_pool, photo_id).await?));
    }

    query_builder.push(" WHERE id = ");
    query_builder.push_bind(photo_id);

    match query_builder.build().execute(&state.db_pool).await {
        Ok(db_result) if db_result.rows_affected() == 0 => {
            Err((StatusCode::NOT_FOUND, "Photo not found".to_string()))
        }
        Ok(_) => Ok(Json(fetch_photo(&state.db_pool, photo_id).await?)),
        Err(e) => {
            tracing::error!("Failed to update photo {}: {}", photo_id, e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Database error: {}", e),
            ))
        }
    }
}

/// 写真を削除 (DELETE /admin/photos/:photo_id)
#[utoipa::path(
    delete,
    path = "/api/admin/photos/{photo_id}",
    tag = "Photos",
    params(("photo_id" = i64, Path, description = "写真ID")),
    responses(
        (status = 204, description = "削除成功"),
        (status = 404, description = "写真が見つからない"),
        (status = 500, description = "サーバーエラー")
    ),
    security(("bearer_auth" = []))
)]
async fn delete_photo(
    State(state): State<AppState>,
    Path(photo_id): Path<i64>,
    Extension(_auth_user): Extension<AuthUser>,
) -> Result<StatusCode, (StatusCode, String)> {
    match sqlx::query("DELETE FROM photos WHERE id = ?")
        .bind(photo_id)
        .execute(&state.db_pool)
        .await
    {
        Ok(db_result) if db_result.rows_affected() == 0 => {
            Err((StatusCode::NOT_FOUND, "Photo not found".to_string()))
        }
        Ok(_) => {
            tracing::info!("Photo deleted: {}", photo_id);
            Ok(StatusCode::NO_CONTENT)
        }
        Err(e) => {
            tracing::error!("Failed to delete photo {}: {}", photo_id, e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Database error: {}", e),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::testutil::test_state;

    fn admin() -> Extension<AuthUser> {
        Extension(AuthUser { user_id: 1 })
    }

    fn payload(url: &str, title: &str) -> CreatePhotoPayload {
        CreatePhotoPayload {
            url: url.to_string(),
            title: title.to_string(),
            location: Some("Tokyo".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn created_photos_are_listed_in_insertion_order() {
        let state = test_state().await;

        create_photo(State(state.clone()), admin(), Json(payload("/a.jpg", "First")))
            .await
            .expect("create should succeed");
        create_photo(State(state.clone()), admin(), Json(payload("/b.jpg", "Second")))
            .await
            .expect("create should succeed");

        let Json(photos) = list_photos(State(state)).await.expect("list should succeed");
        let titles: Vec<&str> = photos.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["First", "Second"]);
    }

    #[tokio::test]
    async fn create_rejects_blank_required_fields() {
        let state = test_state().await;

        let err = create_photo(State(state.clone()), admin(), Json(payload("  ", "Title")))
            .await
            .expect_err("blank url must be rejected");
        assert_eq!(err.0, StatusCode::BAD_REQUEST);

        let Json(photos) = list_photos(State(state)).await.unwrap();
        assert!(photos.is_empty());
    }

    #[tokio::test]
    async fn update_patches_only_the_given_fields() {
        let state = test_state().await;
        let (_, Json(photo)) =
            create_photo(State(state.clone()), admin(), Json(payload("/a.jpg", "Old")))
                .await
                .unwrap();

        let patch = UpdatePhotoPayload {
            title: Some("New".to_string()),
            // 空文字で省略可能フィールドを NULL に戻す
            location: Some("".to_string()),
            ..Default::default()
        };
        let Json(updated) = update_photo(
            State(state.clone()),
            Path(photo.id),
            admin(),
            Json(patch),
        )
        .await
        .expect("update should succeed");

        assert_eq!(updated.title, "New");
        assert_eq!(updated.url, "/a.jpg"); // 変更していないフィールドは保持
        assert_eq!(updated.location, None);
    }

    #[tokio::test]
    async fn update_of_unknown_photo_is_not_found() {
        let state = test_state().await;
        let patch = UpdatePhotoPayload {
            title: Some("X".to_string()),
            ..Default::default()
        };
        let err = update_photo(State(state), Path(999), admin(), Json(patch))
            .await
            .expect_err("unknown id must 404");
        assert_eq!(err.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_removes_the_photo() {
        let state = test_state().await;
        let (_, Json(photo)) =
            create_photo(State(state.clone()), admin(), Json(payload("/a.jpg", "Doomed")))
                .await
                .unwrap();

        let status = delete_photo(State(state.clone()), Path(photo.id), admin())
            .await
            .expect("delete should succeed");
        assert_eq!(status, StatusCode::NO_CONTENT);

        let err = delete_photo(State(state), Path(photo.id), admin())
            .await
            .expect_err("second delete must 404");
        assert_eq!(err.0, StatusCode::NOT_FOUND);
    }
}
