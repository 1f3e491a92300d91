// src/routes/admin.rs
use axum::{
    Extension, Json, Router, extract::State, http::StatusCode, response::IntoResponse,
    routing::post,
};
use tokio;
use tracing;

use crate::auth::AuthUser;
use crate::models::{ImportPayload, ImportResponse};
use crate::state::AppState;

/// インポートルート (/admin/papers/import) を構築します
pub fn create_import_routes() -> Router<AppState> {
    Router::new().route("/admin/papers/import", post(trigger_import))
}

/// DOIメタデータの取り込みをバックグラウンドで実行する (POST /admin/papers/import)
#[utoipa::path(
    post,
    path = "/api/admin/papers/import",
    tag = "Admin",
    request_body(
        content = ImportPayload,
        description = "取り込む DOI のリスト",
        example = json!({
            "dois": [
                "10.1145/3297858.3304013",
                "10.48550/arXiv.2403.01234"
            ]
        })
    ),
    responses(
        (
            status = 202,
            description = "インポート開始",
            body = ImportResponse,
            example = json!({"message": "Import started in background."})
        ),
        (status = 400, description = "DOIが指定されていない"),
        (status = 500, description = "サーバーエラー")
    ),
    security(("bearer_auth" = []))
)]
async fn trigger_import(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(payload): Json<ImportPayload>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if payload.dois.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "No DOIs provided.".to_string(),
        ));
    }

    tracing::info!(
        "Import of {} DOIs triggered by user_id: {}",
        payload.dois.len(),
        auth_user.user_id
    );

    // メタデータの解決は時間がかかるため、HTTPリクエストをブロックしないよう
    // バックグラウンドタスクとして実行する。DBプールは Clone 可能
    let db_pool = state.db_pool.clone();
    let dois = payload.dois;

    tokio::spawn(async move {
        tracing::info!("Background import task started...");
        match crate::importer::run_import(&db_pool, dois).await {
            Ok(summary) => {
                tracing::info!("Background import finished: {}", summary);
            }
            Err(e) => {
                tracing::error!("Background import failed: {}", e);
            }
        }
    });

    // リクエストにはすぐに「受け付けた」というレスポンスを返す
    Ok((
        StatusCode::ACCEPTED,
        Json(ImportResponse {
            message: "Import started in background.".to_string(),
        }),
    ))
}
