// src/importer/mod.rs
//
// DOI から論文メタデータを取り込むバックグラウンドタスク。
// 取り込んだレコードは未公開のドラフトとして papers テーブルに入り、
// 管理パネルの次回の一覧取得で現れる。

mod crossref;
mod error;

use crossref::{Work, WorksReply, seed_from_work, validate_doi};
use error::ImportError;

use chrono::Utc;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing;
use url::Url;

const CROSSREF_WORKS: &str = "https://api.crossref.org/works/";

/// 取得したメタデータを保持する構造体 (DB挿入用)
#[derive(Debug, Clone)]
pub(super) struct PaperSeed {
    title: String,
    authors: String,
    abstract_text: String,
    journal: Option<String>,
    year: i64,
    volume: Option<String>,
    issue: Option<String>,
    pages: Option<String>,
    doi: String,
    pdf_url: Option<String>,
    citation_count: i64,
}

// --- メタデータ取得ロジック ---

/// Crossref works API から1件のレコードを取得する
async fn fetch_work(client: &reqwest::Client, doi: &str) -> Result<Work, ImportError> {
    let endpoint = Url::parse(CROSSREF_WORKS)?.join(doi)?;
    tracing::info!("Fetching Crossref metadata for {}", doi);

    let response = client.get(endpoint).send().await?;
    if !response.status().is_success() {
        let status = response.status();
        tracing::error!("Failed to fetch DOI {}: {}", doi, status);
        return Err(ImportError::Http(format!(
            "HTTP error for {}: {}",
            doi, status
        )));
    }

    let reply = response.json::<WorksReply>().await?;
    Ok(reply.message)
}

// --- データベースロジック ---

/// シードのスライスを未公開ドラフトとして挿入する (DOI 重複は無視)
async fn insert_seeds(
    tx: &mut Transaction<'_, Sqlite>,
    seeds: &[PaperSeed],
) -> Result<usize, sqlx::Error> {
    let mut inserted_count = 0;

    for seed in seeds {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO papers
                 (title, authors, abstract_text, journal, year, volume, issue, pages,
                  doi, pdf_url, citation_count, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&seed.title)
        .bind(&seed.authors)
        .bind(&seed.abstract_text)
        .bind(&seed.journal)
        .bind(seed.year)
        .bind(&seed.volume)
        .bind(&seed.issue)
        .bind(&seed.pages)
        .bind(&seed.doi)
        .bind(&seed.pdf_url)
        .bind(seed.citation_count)
        .bind(Utc::now().to_rfc3339())
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() > 0 {
            inserted_count += 1;
        }
    }
    Ok(inserted_count)
}

// --- 実行の起点となる関数 ---

/// インポートのコアロジック (内部関数)。
/// 個々の DOI の失敗 (構文・取得・抽出) はログに残して続行し、
/// DB エラーのみ全体を失敗させる。
async fn run_import_logic(
    db_pool: &SqlitePool,
    dois: Vec<String>,
) -> Result<(usize, usize), ImportError> {
    let client = reqwest::Client::new();
    let mut seeds = Vec::new();

    for raw in &dois {
        let doi = raw.trim();

        if let Err(e) = validate_doi(doi) {
            tracing::error!("Skipping DOI: {}", e);
            continue;
        }

        match fetch_work(&client, doi).await {
            Ok(work) => match seed_from_work(doi, work) {
                Ok(seed) => seeds.push(seed),
                Err(extract_err) => {
                    tracing::error!("Error extracting metadata for {}: {}", doi, extract_err);
                }
            },
            Err(fetch_err) => {
                tracing::error!("Error fetching DOI {}: {}", doi, fetch_err);
            }
        }
    }

    let mut tx = db_pool.begin().await?;
    let inserted = match insert_seeds(&mut tx, &seeds).await {
        Ok(count) => count,
        Err(db_err) => {
            tracing::error!("Database insertion error: {}. Rolling back.", db_err);
            let _ = tx.rollback().await;
            return Err(db_err.into());
        }
    };
    tx.commit().await?;

    Ok((dois.len(), inserted))
}

/// DOI のリストを解決して DB に挿入する (公開API)
pub async fn run_import(db_pool: &SqlitePool, dois: Vec<String>) -> Result<String, String> {
    match run_import_logic(db_pool, dois).await {
        Ok((requested, inserted)) => {
            let summary = format!(
                "Import complete. DOIs requested: {}. New papers inserted: {}",
                requested, inserted
            );
            tracing::info!("{}", summary);
            Ok(summary)
        }
        Err(e) => {
            // APIハンドラが `String` のエラーを期待しているため、ここで変換する
            tracing::error!("Import failed: {}", e);
            Err(e.to_string())
        }
    }
}
