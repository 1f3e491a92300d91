// auth.rs
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Sqlite};
use tracing;

// JWTに含めるクレーム (Payload)
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64, // Subject (user_id)
    pub exp: i64, // Expiration time
    pub iat: i64, // Issued at
}

// ミドルウェアがハンドラに渡すユーザー情報
// (Extension<AuthUser> として受け取る)
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i64,
}

// --- JWTキーの管理 ---
#[derive(Clone)]
pub struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

// main.rs で初期化時に呼び出す
impl Keys {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }
}

/// 認証ミドルウェア
/// トークンを検証し、該当ユーザーがDBに存在することも確認する
pub async fn auth_middleware(
    State(state): State<crate::state::AppState>,
    TypedHeader(auth_header): TypedHeader<Authorization<Bearer>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, String)> {
    let token = auth_header.token();

    // exp の検証は Validation::default() に含まれる
    let claims = match decode::<Claims>(token, &state.keys.decoding, &Validation::default()) {
        Ok(token_data) => token_data.claims,
        Err(e) => {
            tracing::warn!("Auth failed (invalid token): {}", e);
            return Err((StatusCode::UNAUTHORIZED, "Invalid token".to_string()));
        }
    };

    let user_exists = sqlx::query("SELECT 1 FROM users WHERE user_id = ?")
        .bind(claims.sub)
        .fetch_optional(&state.db_pool)
        .await
        .map_err(|e| {
            tracing::error!("Database error during auth: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        })?
        .is_some();

    if !user_exists {
        tracing::warn!("Auth failed (user not found): {}", claims.sub);
        return Err((StatusCode::UNAUTHORIZED, "User does not exist".to_string()));
    }

    // リクエストにユーザー情報を添付 (Extension)
    request.extensions_mut().insert(AuthUser {
        user_id: claims.sub,
    });

    Ok(next.run(request).await)
}

// --- ヘルパー関数 ---

/// パスワードハッシュ化 (Argon2)
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(OsRng);
    let argon2 = Argon2::default();

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)?
        .to_string();

    Ok(password_hash)
}

/// パスワード検証
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(hash) => hash,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// JWT生成
pub fn create_jwt(user_id: i64, keys: &Keys) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let iat = now.timestamp();
    let exp = (now + Duration::days(7)).timestamp(); // 有効期限: 7日後

    let claims = Claims {
        sub: user_id,
        iat,
        exp,
    };

    encode(&Header::default(), &claims, &keys.encoding)
}

/// users テーブルが空なら環境変数から管理者アカウントを1件作成する。
/// ポートフォリオの編集者は1人なので、公開の登録エンドポイントは持たない。
pub async fn ensure_admin_account(
    db_pool: &Pool<Sqlite>,
) -> Result<(), Box<dyn std::error::Error>> {
    let existing = sqlx::query("SELECT user_id FROM users LIMIT 1")
        .fetch_optional(db_pool)
        .await?;
    if existing.is_some() {
        return Ok(());
    }

    let username = std::env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".to_string());
    let password = match std::env::var("ADMIN_PASSWORD") {
        Ok(p) if !p.is_empty() => p,
        _ => {
            tracing::warn!(
                "No admin account exists and ADMIN_PASSWORD is not set; admin login is unavailable"
            );
            return Ok(());
        }
    };

    // Argon2 は重いのでブロッキングタスクで実行
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password)).await??;

    sqlx::query("INSERT INTO users (username, password_hash) VALUES (?, ?)")
        .bind(&username)
        .bind(&password_hash)
        .execute(db_pool)
        .await?;

    tracing::info!("Seeded admin account: {}", username);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_roundtrip() {
        let hash = hash_password("correct horse battery staple").expect("hashing failed");
        assert!(verify_password("correct horse battery staple", &hash));
        assert!(!verify_password("wrong password", &hash));
    }

    #[test]
    fn verify_rejects_malformed_hash() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }

    #[test]
    fn jwt_roundtrip_carries_user_id() {
        let keys = Keys::new(b"test-secret");
        let token = create_jwt(42, &keys).expect("token generation failed");
        let decoded = decode::<Claims>(&token, &keys.decoding, &Validation::default())
            .expect("token should validate");
        assert_eq!(decoded.claims.sub, 42);
        assert!(decoded.claims.exp > decoded.claims.iat);
    }
}
