// src/routes/papers.rs
use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
};
use chrono::{Datelike, Utc};
use sqlx::{Pool, QueryBuilder, Sqlite};
use tracing;

use crate::auth::AuthUser;
use crate::models::{CreatePaperPayload, Paper, UpdatePaperPayload, blank_to_none};
use crate::state::AppState;

/// 公開の論文ルート (/papers) を構築します
pub fn create_paper_routes() -> Router<AppState> {
    Router::new().route("/papers", get(list_papers))
}

/// 管理用の論文ルート (/admin/papers/...) を構築します
pub fn create_paper_admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/papers", get(list_all_papers).post(create_paper))
        .route("/admin/papers/:paper_id", put(update_paper).delete(delete_paper))
}

async fn fetch_paper(db_pool: &Pool<Sqlite>, id: i64) -> Result<Paper, (StatusCode, String)> {
    match sqlx::query_as::<_, Paper>("SELECT * FROM papers WHERE id = ?")
        .bind(id)
        .fetch_optional(db_pool)
        .await
    {
        Ok(Some(paper)) => Ok(paper),
        Ok(None) => Err((StatusCode::NOT_FOUND, "Paper not found".to_string())),
        Err(e) => {
            tracing::error!("Database error fetching paper {}: {}", id, e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Database error: {}", e),
            ))
        }
    }
}

/// 公開済みの論文一覧を取得 (GET /papers)
#[utoipa::path(
    get,
    path = "/api/papers",
    tag = "Papers",
    responses(
        (
            status = 200,
            description = "公開済み論文のリスト (年の新しい順)",
            body = Vec<Paper>,
            example = json!([{
                "id": 1,
                "title": "A paper about something",
                "authors": "A. Author, B. Author",
                "abstract_text": "This abstract is about...",
                "journal": "Journal of Examples",
                "year": 2024,
                "tags": "systems,storage",
                "citation_count": 3,
                "featured": false,
                "published": true,
                "published_at": "2024-06-01T10:00:00+00:00",
                "created_at": "2024-05-30T09:00:00+00:00"
            }])
        ),
        (status = 500, description = "サーバーエラー")
    )
)]
async fn list_papers(
    State(state): State<AppState>,
) -> Result<Json<Vec<Paper>>, (StatusCode, String)> {
    let result = sqlx::query_as::<_, Paper>(
        "SELECT * FROM papers WHERE published = 1 ORDER BY year DESC, id DESC",
    )
    .fetch_all(&state.db_pool)
    .await;

    match result {
        Ok(papers) => Ok(Json(papers)),
        Err(e) => {
            tracing::error!("Database error in list_papers: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Database error: {}", e),
            ))
        }
    }
}

/// 未公開を含む全論文を取得 (GET /admin/papers)
#[utoipa::path(
    get,
    path = "/api/admin/papers",
    tag = "Papers",
    responses(
        (status = 200, description = "全論文のリスト (登録の新しい順)", body = Vec<Paper>),
        (status = 500, description = "サーバーエラー")
    ),
    security(("bearer_auth" = []))
)]
async fn list_all_papers(
    State(state): State<AppState>,
    Extension(_auth_user): Extension<AuthUser>,
) -> Result<Json<Vec<Paper>>, (StatusCode, String)> {
    let result =
        sqlx::query_as::<_, Paper>("SELECT * FROM papers ORDER BY created_at DESC, id DESC")
            .fetch_all(&state.db_pool)
            .await;

    match result {
        Ok(papers) => Ok(Json(papers)),
        Err(e) => {
            tracing::error!("Database error in list_all_papers: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Database error: {}", e),
            ))
        }
    }
}

/// 論文を登録 (POST /admin/papers)
#[utoipa::path(
    post,
    path = "/api/admin/papers",
    tag = "Papers",
    request_body = CreatePaperPayload,
    responses(
        (status = 201, description = "作成された論文", body = Paper),
        (status = 400, description = "必須フィールドが空"),
        (status = 409, description = "同じ DOI の論文が既に存在する"),
        (status = 500, description = "サーバーエラー")
    ),
    security(("bearer_auth" = []))
)]
async fn create_paper(
    State(state): State<AppState>,
    Extension(_auth_user): Extension<AuthUser>,
    Json(payload): Json<CreatePaperPayload>,
) -> Result<(StatusCode, Json<Paper>), (StatusCode, String)> {
    // クライアント側と同じ検証をサーバーでも行う
    if payload.title.trim().is_empty() || payload.authors.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Title and authors are required.".to_string(),
        ));
    }

    let now = Utc::now().to_rfc3339();
    let year = payload.year.unwrap_or_else(|| Utc::now().year() as i64);
    // 公開状態で作成された場合はその時点を公開時刻とする
    let published_at = payload.published.then(|| now.clone());

    let result = sqlx::query(
        "INSERT INTO papers
             (title, authors, abstract_text, journal, year, volume, issue, pages,
              doi, pdf_url, category, tags, citation_count, featured, published,
              published_at, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(payload.title.trim())
    .bind(payload.authors.trim())
    .bind(&payload.abstract_text)
    .bind(blank_to_none(payload.journal))
    .bind(year)
    .bind(blank_to_none(payload.volume))
    .bind(blank_to_none(payload.issue))
    .bind(blank_to_none(payload.pages))
    .bind(blank_to_none(payload.doi))
    .bind(blank_to_none(payload.pdf_url))
    .bind(blank_to_none(payload.category))
    .bind(&payload.tags)
    .bind(payload.citation_count)
    .bind(payload.featured)
    .bind(payload.published)
    .bind(&published_at)
    .bind(&now)
    .execute(&state.db_pool)
    .await;

    match result {
        Ok(db_result) => {
            let paper = fetch_paper(&state.db_pool, db_result.last_insert_rowid()).await?;
            tracing::info!("Paper created: {} ({})", paper.title, paper.id);
            Ok((StatusCode::CREATED, Json(paper)))
        }
        Err(e) => {
            // DOI の一意制約違反は 409 として返す
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() {
                    tracing::warn!("Failed to create paper (duplicate DOI)");
                    return Err((
                        StatusCode::CONFLICT,
                        "A paper with this DOI already exists.".to_string(),
                    ));
                }
            }
            tracing::error!("Failed to create paper: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Database error: {}", e),
            ))
        }
    }
}

/// 論文を部分更新 (PUT /admin/papers/:paper_id)
///
/// 省略されたフィールドは変更しない。published を true に切り替えると
/// published_at に現在時刻が入り、false に切り替えると NULL に戻る。
#[utoipa::path(
    put,
    path = "/api/admin/papers/{paper_id}",
    tag = "Papers",
    params(("paper_id" = i64, Path, description = "論文ID")),
    request_body(
        content = UpdatePaperPayload,
        description = "変更するフィールドのみ",
        example = json!({"published": true})
    ),
    responses(
        (status = 200, description = "更新後の論文", body = Paper),
        (status = 400, description = "必須フィールドが空"),
        (status = 404, description = "論文が見つからない"),
        (status = 500, description = "サーバーエラー")
    ),
    security(("bearer_auth" = []))
)]
async fn update_paper(
    State(state): State<AppState>,
    Path(paper_id): Path<i64>,
    Extension(_auth_user): Extension<AuthUser>,
    Json(payload): Json<UpdatePaperPayload>,
) -> Result<Json<Paper>, (StatusCode, String)> {
    for (field, value) in [("Title", &payload.title), ("Authors", &payload.authors)] {
        if let Some(value) = value {
            if value.trim().is_empty() {
                return Err((
                    StatusCode::BAD_REQUEST,
                    format!("{} must not be empty.", field),
                ));
            }
        }
    }

    // 公開フラグの遷移を判定するため、現在の行を先に読む (無ければ 404)
    let current = fetch_paper(&state.db_pool, paper_id).await?;

    if payload.is_empty() {
        return Ok(Json(current));
    }

    let mut query_builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE papers SET ");
    let mut updates = query_builder.separated(", ");

    if let Some(title) = &payload.title {
        updates.push("title = ").push_bind_unseparated(title.trim().to_string());
    }
    if let Some(authors) = &payload.authors {
        updates.push("authors = ").push_bind_unseparated(authors.trim().to_string());
    }
    if let Some(abstract_text) = &payload.abstract_text {
        updates.push("abstract_text = ").push_bind_unseparated(abstract_text.clone());
    }
    if payload.journal.is_some() {
        updates.push("journal = ").push_bind_unseparated(blank_to_none(payload.journal.clone()));
    }
    if let Some(year) = payload.year {
        updates.push("year = ").push_bind_unseparated(year);
    }
    if payload.volume.is_some() {
        updates.push("volume = ").push_bind_unseparated(blank_to_none(payload.volume.clone()));
    }
    if payload.issue.is_some() {
        updates.push("issue = ").push_bind_unseparated(blank_to_none(payload.issue.clone()));
    }
    if payload.pages.is_some() {
        updates.push("pages = ").push_bind_unseparated(blank_to_none(payload.pages.clone()));
    }
    if payload.doi.is_some() {
        updates.push("doi = ").push_bind_unseparated(blank_to_none(payload.doi.clone()));
    }
    if payload.pdf_url.is_some() {
        updates.push("pdf_url = ").push_bind_unseparated(blank_to_none(payload.pdf_url.clone()));
    }
    if payload.category.is_some() {
        updates.push("category = ").push_bind_unseparated(blank_to_none(payload.category.clone()));
    }
    if let Some(tags) = &payload.tags {
        updates.push("tags = ").push_bind_unseparated(tags.clone());
    }
    if let Some(citation_count) = payload.citation_count {
        updates.push("citation_count = ").push_bind_unseparated(citation_count);
    }
    if let Some(featured) = payload.featured {
        updates.push("featured = ").push_bind_unseparated(featured);
    }
    if let Some(published) = payload.published {
        updates.push("published = ").push_bind_unseparated(published);
        // 非公開→公開の遷移で時刻を付与し、公開→非公開で消す。
        // 既に公開済みのまま true を送っても時刻は動かさない。
        if published && !current.published {
            updates
                .push("published_at = ")
                .push_bind_unseparated(Some(Utc::now().to_rfc3339()));
        } else if !published {
            updates.push("published_at = ").push_bind_unseparated(None::<String>);
        }
    }

    query_builder.push(" WHERE id = ");
    query_builder.push_bind(paper_id);

    match query_builder.build().execute(&state.db_pool).await {
        Ok(_) => {
            let paper = fetch_paper(&state.db_pool, paper_id).await?;
            Ok(Json(paper))
        }
        Err(e) => {
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() {
                    return Err((
                        StatusCode::CONFLICT,
                        "A paper with this DOI already exists.".to_string(),
                    ));
                }
            }
            tracing::error!("Failed to update paper {}: {}", paper_id, e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Database error: {}", e),
            ))
        }
    }
}

/// 論文を削除 (DELETE /admin/papers/:paper_id)
#[utoipa::path(
    delete,
    path = "/api/admin/papers/{paper_id}",
    tag = "Papers",
    params(("paper_id" = i64, Path, description = "論文ID")),
    responses(
        (status = 204, description = "削除成功"),
        (status = 404, description = "論文が見つからない"),
        (status = 500, description = "サーバーエラー")
    ),
    security(("bearer_auth" = []))
)]
async fn delete_paper(
    State(state): State<AppState>,
    Path(paper_id): Path<i64>,
    Extension(_auth_user): Extension<AuthUser>,
) -> Result<StatusCode, (StatusCode, String)> {
    match sqlx::query("DELETE FROM papers WHERE id = ?")
        .bind(paper_id)
        .execute(&state.db_pool)
        .await
    {
        Ok(db_result) if db_result.rows_affected() == 0 => {
            Err((StatusCode::NOT_FOUND, "Paper not found".to_string()))
        }
        Ok(_) => {
            tracing::info!("Paper deleted: {}", paper_id);
            Ok(StatusCode::NO_CONTENT)
        }
        Err(e) => {
            tracing::error!("Failed to delete paper {}: {}", paper_id, e);
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

    fn draft(title: &str) -> CreatePaperPayload {
        CreatePaperPayload {
            title: title.to_string(),
            authors: "A. Author".to_string(),
            year: Some(2024),
            ..Default::default()
        }
    }

    async fn create(state: &AppState, payload: CreatePaperPayload) -> Paper {
        let (status, Json(paper)) = create_paper(State(state.clone()), admin(), Json(payload))
            .await
            .expect("create should succeed");
        assert_eq!(status, StatusCode::CREATED);
        paper
    }

    #[tokio::test]
    async fn public_list_hides_unpublished_papers() {
        let state = test_state().await;
        create(&state, draft("Unpublished draft")).await;
        create(
            &state,
            CreatePaperPayload {
                published: true,
                ..draft("Published paper")
            },
        )
        .await;

        let Json(public) = list_papers(State(state.clone())).await.unwrap();
        let titles: Vec<&str> = public.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["Published paper"]);

        let Json(all) = list_all_papers(State(state), admin()).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn create_rejects_blank_title_and_authors() {
        let state = test_state().await;

        let bad = CreatePaperPayload {
            title: "  ".to_string(),
            authors: "A. Author".to_string(),
            ..Default::default()
        };
        let err = create_paper(State(state.clone()), admin(), Json(bad))
            .await
            .expect_err("blank title must be rejected");
        assert_eq!(err.0, StatusCode::BAD_REQUEST);

        let Json(all) = list_all_papers(State(state), admin()).await.unwrap();
        assert!(all.is_empty());
    }

    #[tokio::test]
    async fn publish_toggle_stamps_and_clears_published_at() {
        let state = test_state().await;
        let paper = create(&state, draft("Toggle me")).await;
        assert!(paper.published_at.is_none());

        let publish = UpdatePaperPayload {
            published: Some(true),
            ..Default::default()
        };
        let Json(published) =
            update_paper(State(state.clone()), Path(paper.id), admin(), Json(publish))
                .await
                .unwrap();
        assert!(published.published);
        let stamp = published.published_at.clone().expect("stamp should be set");

        // 公開済みのまま true を送り直しても時刻は変わらない
        let republish = UpdatePaperPayload {
            published: Some(true),
            ..Default::default()
        };
        let Json(same) =
            update_paper(State(state.clone()), Path(paper.id), admin(), Json(republish))
                .await
                .unwrap();
        assert_eq!(same.published_at.as_deref(), Some(stamp.as_str()));

        let unpublish = UpdatePaperPayload {
            published: Some(false),
            ..Default::default()
        };
        let Json(unpublished) =
            update_paper(State(state), Path(paper.id), admin(), Json(unpublish))
                .await
                .unwrap();
        assert!(!unpublished.published);
        assert!(unpublished.published_at.is_none());
    }

    #[tokio::test]
    async fn partial_update_leaves_other_fields_alone() {
        let state = test_state().await;
        let paper = create(&state, draft("Original")).await;

        let patch = UpdatePaperPayload {
            title: Some("Renamed".to_string()),
            citation_count: Some(12),
            ..Default::default()
        };
        let Json(updated) = update_paper(State(state), Path(paper.id), admin(), Json(patch))
            .await
            .unwrap();

        assert_eq!(updated.title, "Renamed");
        assert_eq!(updated.citation_count, 12);
        assert_eq!(updated.authors, "A. Author");
        assert_eq!(updated.year, 2024);
    }

    #[tokio::test]
    async fn empty_patch_returns_the_current_row() {
        let state = test_state().await;
        let paper = create(&state, draft("Untouched")).await;

        let Json(unchanged) = update_paper(
            State(state),
            Path(paper.id),
            admin(),
            Json(UpdatePaperPayload::default()),
        )
        .await
        .unwrap();
        assert_eq!(unchanged.title, "Untouched");
    }

    #[tokio::test]
    async fn duplicate_doi_is_a_conflict() {
        let state = test_state().await;
        create(
            &state,
            CreatePaperPayload {
                doi: Some("10.1000/duplicate".to_string()),
                ..draft("First")
            },
        )
        .await;

        let err = create_paper(
            State(state),
            admin(),
            Json(CreatePaperPayload {
                doi: Some("10.1000/duplicate".to_string()),
                ..draft("Second")
            }),
        )
        .await
        .expect_err("duplicate DOI must conflict");
        assert_eq!(err.0, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn update_and_delete_of_unknown_paper_are_not_found() {
        let state = test_state().await;

        let err = update_paper(
            State(state.clone()),
            Path(404),
            admin(),
            Json(UpdatePaperPayload {
                title: Some("X".to_string()),
                ..Default::default()
            }),
        )
        .await
        .expect_err("unknown id must 404");
        assert_eq!(err.0, StatusCode::NOT_FOUND);

        let err = delete_paper(State(state), Path(404), admin())
            .await
            .expect_err("unknown id must 404");
        assert_eq!(err.0, StatusCode::NOT_FOUND);
    }
}
