// client.rs
//
// サーバーAPIの型付きクライアント。公開一覧の取得に加えて、
// 管理パネル用に PaperStore を実装する。
use serde::de::DeserializeOwned;
use url::Url;

use crate::models::{
    AuthToken, CreatePaperPayload, Essay, LoginPayload, Paper, Photo, UpdatePaperPayload,
};
use crate::panel::{PaperStore, StoreError};

pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl ApiClient {
    /// base_url は末尾スラッシュ付きのオリジン (例: "http://localhost:3000/")
    pub fn new(base_url: Url) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// ログインして以降のリクエストに Bearer トークンを付ける
    pub async fn login(&mut self, username: &str, password: &str) -> Result<(), StoreError> {
        let url = self.endpoint("api/auth/login")?;
        let payload = LoginPayload {
            username: username.to_string(),
            password: password.to_string(),
        };
        let response = self
            .http
            .post(url)
            .json(&payload)
            .send()
            .await
            .map_err(reach_error)?;
        let token: AuthToken = expect_json(response).await?;
        self.token = Some(token.token);
        Ok(())
    }

    // --- 公開API ---

    pub async fn list_photos(&self) -> Result<Vec<Photo>, StoreError> {
        self.get_json("api/photos").await
    }

    pub async fn list_essays(&self) -> Result<Vec<Essay>, StoreError> {
        self.get_json("api/essays").await
    }

    /// 公開済みの論文のみ
    pub async fn list_papers(&self) -> Result<Vec<Paper>, StoreError> {
        self.get_json("api/papers").await
    }

    // --- 内部ヘルパー ---

    fn endpoint(&self, path: &str) -> Result<Url, StoreError> {
        self.base_url
            .join(path)
            .map_err(|e| StoreError::new(format!("Invalid endpoint {}: {}", path, e)))
    }

    fn bearer(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, StoreError> {
        let url = self.endpoint(path)?;
        let response = self
            .bearer(self.http.get(url))
            .send()
            .await
            .map_err(reach_error)?;
        expect_json(response).await
    }
}

fn reach_error(e: reqwest::Error) -> StoreError {
    StoreError::new(format!("Failed to reach the server: {}", e))
}

/// 失敗レスポンスの本文はサーバーが返した人間可読のメッセージなので、
/// そのまま StoreError に載せて通知に表示させる
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    if message.is_empty() {
        Err(StoreError::new(format!("HTTP error: {}", status)))
    } else {
        Err(StoreError::new(message))
    }
}

async fn expect_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, StoreError> {
    let response = check_status(response).await?;
    response
        .json::<T>()
        .await
        .map_err(|e| StoreError::new(format!("Invalid response body: {}", e)))
}

impl PaperStore for ApiClient {
    async fn list_all(&self) -> Result<Vec<Paper>, StoreError> {
        self.get_json("api/admin/papers").await
    }

    async fn create(&self, fields: CreatePaperPayload) -> Result<Paper, StoreError> {
        let url = self.endpoint("api/admin/papers")?;
        let response = self
            .bearer(self.http.post(url))
            .json(&fields)
            .send()
            .await
            .map_err(reach_error)?;
        expect_json(response).await
    }

    async fn update(&self, id: i64, patch: UpdatePaperPayload) -> Result<Paper, StoreError> {
        let url = self.endpoint(&format!("api/admin/papers/{}", id))?;
        let response = self
            .bearer(self.http.put(url))
            .json(&patch)
            .send()
            .await
            .map_err(reach_error)?;
        expect_json(response).await
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        let url = self.endpoint(&format!("api/admin/papers/{}", id))?;
        let response = self
            .bearer(self.http.delete(url))
            .send()
            .await
            .map_err(reach_error)?;
        check_status(response).await?;
        Ok(())
    }
}
