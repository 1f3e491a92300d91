// src/routes/mod.rs
use crate::auth::auth_middleware;
use crate::state::AppState;
use axum::{Router, middleware};
use tower_http::services::{ServeDir, ServeFile};

mod admin;
mod auth;
mod essays;
mod papers;
mod photos;
mod swagger;

/// アプリケーション全体のルーターを構築
pub fn create_router(app_state: AppState, static_dir: String) -> Router {
    // API ルーター
    let api_router = create_api_router(app_state.clone());

    // Swagger UI ルーター
    let swagger_routes = swagger::create_swagger_routes();

    // 静的ファイル配信。該当ファイルが見つからない場合 (例: /gallery への
    // 直接アクセス) は index.html を返してSPA側でルーティングさせる
    let index_html_path = std::path::PathBuf::from(static_dir.clone()).join("index.html");
    let index_html_service = ServeFile::new(index_html_path);
    let static_files_service = ServeDir::new(static_dir).not_found_service(index_html_service);

    Router::new()
        .merge(swagger_routes)
        // API全体を "/api" パス以下にネスト
        .nest("/api", api_router)
        .fallback_service(static_files_service)
        .with_state(app_state)
}

/// 全APIルートを結合したルーターを構築
fn create_api_router(app_state: AppState) -> Router<AppState> {
    // 認証が不要なルート (公開コンテンツとログイン)
    let public_routes = Router::new()
        .merge(photos::create_photo_routes())
        .merge(essays::create_essay_routes())
        .merge(papers::create_paper_routes())
        .merge(auth::create_public_auth_routes());

    // 認証が必要なルート (管理パネル)
    let protected_routes = Router::new()
        .merge(auth::create_protected_auth_routes())
        .merge(photos::create_photo_admin_routes())
        .merge(essays::create_essay_admin_routes())
        .merge(papers::create_paper_admin_routes())
        .merge(admin::create_import_routes())
        .layer(middleware::from_fn_with_state(
            app_state.clone(),
            auth_middleware,
        ));

    Router::new().merge(public_routes).merge(protected_routes)
}

#[cfg(test)]
mod testutil {
    use crate::auth::Keys;
    use crate::state::AppState;
    use sqlx::sqlite::SqlitePoolOptions;

    /// インメモリ SQLite で AppState を構築する。
    /// コネクションごとに別のDBになるため1本に固定する
    pub async fn test_state() -> AppState {
        let db_pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to open in-memory database");
        sqlx::migrate!("./migrations")
            .run(&db_pool)
            .await
            .expect("Failed to run migrations");

        AppState {
            db_pool,
            keys: Keys::new(b"test-secret"),
        }
    }
}
