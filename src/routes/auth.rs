// src/routes/auth.rs
use axum::{
    Extension, Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use tracing;

use crate::auth::{AuthUser, create_jwt, verify_password};
use crate::models::{AuthToken, LoginPayload, User};
use crate::state::AppState;

/// 認証ルート (公開) (/auth/...) を構築します
pub fn create_public_auth_routes() -> Router<AppState> {
    Router::new().route("/auth/login", post(login))
}

/// 認証ルート (保護) (/auth/...) を構築します
pub fn create_protected_auth_routes() -> Router<AppState> {
    Router::new().route("/auth/me", get(get_me))
}

/// ログイン (POST /auth/login)
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body(
        content = LoginPayload,
        description = "ユーザー名とパスワード",
        example = json!({
            "username": "admin",
            "password": "password123"
        })
    ),
    responses(
        (
            status = 200,
            description = "ログイン成功",
            body = AuthToken,
            example = json!({
                "token": "ey...（JWTトークン）...",
                "token_type": "Bearer"
            })
        ),
        (
            status = 401,
            description = "認証情報が無効",
            body = String,
            example = json!("Incorrect username or password")
        ),
        (status = 500, description = "サーバーエラー")
    )
)]
async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> Result<Json<AuthToken>, (StatusCode, String)> {
    // 1. ユーザー名でDBを検索
    let user = match sqlx::query_as::<_, User>(
        "SELECT user_id, username, password_hash FROM users WHERE username = ?",
    )
    .bind(&payload.username)
    .fetch_optional(&state.db_pool)
    .await
    {
        Ok(Some(user)) => user,
        Ok(None) => {
            tracing::warn!("Login failed (user not found): {}", payload.username);
            return Err((
                StatusCode::UNAUTHORIZED,
                "Incorrect username or password".to_string(),
            ));
        }
        Err(e) => {
            tracing::error!("Database error during login for {}: {}", payload.username, e);
            return Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Database error: {}", e),
            ));
        }
    };

    // 2. パスワードハッシュを検証 (Argon2 は重いのでブロッキングタスクで)
    let password = payload.password;
    let password_hash = user.password_hash.clone();
    let is_valid = tokio::task::spawn_blocking(move || verify_password(&password, &password_hash))
        .await
        .map_err(|e| {
            tracing::error!("spawn_blocking failed for verify_password: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        })?;

    if !is_valid {
        tracing::warn!("Login failed (invalid password): {}", user.username);
        return Err((
            StatusCode::UNAUTHORIZED,
            "Incorrect username or password".to_string(),
        ));
    }

    // 3. JWTを生成
    let token = match create_jwt(user.user_id, &state.keys) {
        Ok(token) => token,
        Err(e) => {
            tracing::error!("Failed to generate JWT for user {}: {}", user.user_id, e);
            return Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to generate token".to_string(),
            ));
        }
    };

    tracing::info!("User logged in: {}", user.username);
    Ok(Json(AuthToken {
        token,
        token_type: "Bearer".to_string(),
    }))
}

/// 認証済みユーザー自身の情報を取得 (GET /auth/me)
#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "Auth",
    responses(
        (
            status = 200,
            description = "認証済みユーザーの情報",
            body = User,
            example = json!({
                "user_id": 1,
                "username": "admin",
            })
        ),
        (status = 401, description = "認証されていない"),
        (status = 404, description = "ユーザーが見つからない"),
        (status = 500, description = "サーバーエラー")
    ),
    security(("bearer_auth" = []))
)]
async fn get_me(
    State(state): State<AppState>,
    // auth_middleware が添付したユーザー情報を Extension で受け取る
    Extension(auth_user): Extension<AuthUser>,
) -> Result<Json<User>, (StatusCode, String)> {
    let user_id = auth_user.user_id;

    let user = match sqlx::query_as::<_, User>(
        "SELECT user_id, username, password_hash FROM users WHERE user_id = ?",
    )
    .bind(user_id)
    .fetch_optional(&state.db_pool)
    .await
    {
        Ok(Some(user)) => user,
        Ok(None) => {
            // ミドルウェアを通過したのにユーザーがいない (ほぼあり得ないが安全のため)
            tracing::warn!("User not found for ID {} (from valid token)", user_id);
            return Err((
                StatusCode::NOT_FOUND,
                "User associated with token not found".to_string(),
            ));
        }
        Err(e) => {
            tracing::error!("Database error in get_me for user {}: {}", user_id, e);
            return Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Database error: {}", e),
            ));
        }
    };

    // password_hash は #[serde(skip)] なのでレスポンスに含まれない
    Ok(Json(user))
}
