// models.rs
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::readtime;

// 1. Photo 構造体 (DBからの読み取り用)
// 撮影メタデータ (camera/lens/settings) はすべて省略可能
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Photo {
    pub id: i64,
    pub url: String,
    pub title: String,
    pub location: Option<String>,
    pub description: Option<String>,
    pub taken_at: String, // RFC 3339 (表示用の年の導出元)
    pub camera: Option<String>,
    pub lens: Option<String>,
    pub settings: Option<String>,
}

// 2. Essay 構造体 (DBからの読み取り用)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Essay {
    pub id: i64,
    pub title: String,
    pub category: Option<String>,
    pub cover_url: Option<String>,
    pub body: String, // Markdown 本文
    pub published_at: String,
}

impl Essay {
    /// 本文から導出する読了時間ラベル (保存はしない)
    pub fn read_time(&self) -> String {
        readtime::read_time_label(&self.body)
    }
}

// 3. Paper 構造体 (DBからの読み取り用)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Paper {
    pub id: i64,
    pub title: String,
    pub authors: String,
    pub abstract_text: String,
    pub journal: Option<String>,
    pub year: i64,
    pub volume: Option<String>,
    pub issue: Option<String>,
    pub pages: Option<String>,
    pub doi: Option<String>,
    pub pdf_url: Option<String>,
    pub category: Option<String>,
    pub tags: String, // カンマ区切りテキスト
    pub citation_count: i64,
    pub featured: bool,
    pub published: bool,
    pub published_at: Option<String>, // published を立てた時刻 (下ろすと NULL)
    pub created_at: String,
}

// --- 写真の作成/更新ペイロード ---

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct CreatePhotoPayload {
    pub url: String,
    pub title: String,
    pub location: Option<String>,
    pub description: Option<String>,
    pub taken_at: Option<String>, // 省略時はサーバー側で現在時刻
    pub camera: Option<String>,
    pub lens: Option<String>,
    pub settings: Option<String>,
}

// 部分更新: None のフィールドは変更しない
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct UpdatePhotoPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub taken_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub camera: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lens: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<String>,
}

// --- エッセイの作成/更新ペイロード ---

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct CreateEssayPayload {
    pub title: String,
    pub category: Option<String>,
    pub cover_url: Option<String>,
    pub body: String,
    pub published_at: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct UpdateEssayPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
}

// --- 論文の作成/更新ペイロード ---

// title と authors は必須 (サーバー側でも空文字を拒否する)
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct CreatePaperPayload {
    pub title: String,
    pub authors: String,
    pub abstract_text: String,
    pub journal: Option<String>,
    pub year: Option<i64>, // 省略時はサーバー側で現在の年
    pub volume: Option<String>,
    pub issue: Option<String>,
    pub pages: Option<String>,
    pub doi: Option<String>,
    pub pdf_url: Option<String>,
    pub category: Option<String>,
    pub tags: String,
    pub citation_count: i64,
    pub featured: bool,
    pub published: bool,
}

// 部分更新: None のフィールドは変更しない。
// published を Some(true) にすると published_at に現在時刻が入り、
// Some(false) にすると published_at は NULL に戻る。
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct UpdatePaperPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authors: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abstract_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub journal: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub citation_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub featured: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<bool>,
}

impl UpdatePaperPayload {
    /// 更新対象のフィールドが1つも無いペイロードか
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.authors.is_none()
            && self.abstract_text.is_none()
            && self.journal.is_none()
            && self.year.is_none()
            && self.volume.is_none()
            && self.issue.is_none()
            && self.pages.is_none()
            && self.doi.is_none()
            && self.pdf_url.is_none()
            && self.category.is_none()
            && self.tags.is_none()
            && self.citation_count.is_none()
            && self.featured.is_none()
            && self.published.is_none()
    }
}

// --- 認証 ---

// DBから読み取る User 構造体
#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
pub struct User {
    pub user_id: i64,
    pub username: String,
    #[serde(skip)] // パスワードハッシュはAPIで返さない
    #[schema(hidden = true)]
    pub password_hash: String,
}

// ログイン (POST /auth/login) のペイロード
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct LoginPayload {
    pub username: String,
    pub password: String, // 生パスワード
}

// ログイン成功時に返すトークン
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuthToken {
    pub token: String,
    pub token_type: String, // "Bearer"
}

// --- DOIインポート ---

// インポート (POST /admin/papers/import) のペイロード
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct ImportPayload {
    pub dois: Vec<String>,
}

// インポート (POST /admin/papers/import) のレスポンス
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ImportResponse {
    pub message: String,
}

/// 省略可能なテキストフィールドの空白のみ/空文字を NULL に正規化する
pub fn blank_to_none(value: Option<String>) -> Option<String> {
    value.and_then(|s| {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_to_none_normalizes_whitespace() {
        assert_eq!(blank_to_none(None), None);
        assert_eq!(blank_to_none(Some("".to_string())), None);
        assert_eq!(blank_to_none(Some("   ".to_string())), None);
        assert_eq!(
            blank_to_none(Some("  Nikon Z7  ".to_string())),
            Some("Nikon Z7".to_string())
        );
    }

    #[test]
    fn empty_update_payload_is_detected() {
        assert!(UpdatePaperPayload::default().is_empty());
        let patch = UpdatePaperPayload {
            published: Some(true),
            ..Default::default()
        };
        assert!(!patch.is_empty());
    }
}
