// src/routes/swagger.rs
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

// models.rs から ToSchema を実装した型をすべてインポートする
use crate::models::{
    AuthToken, CreateEssayPayload, CreatePaperPayload, CreatePhotoPayload, Essay, ImportPayload,
    ImportResponse, LoginPayload, Paper, Photo, UpdateEssayPayload, UpdatePaperPayload,
    UpdatePhotoPayload, User,
};

// --- APIドキュメントの定義 ---

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::auth::login,
        crate::routes::auth::get_me,
        crate::routes::photos::list_photos,
        crate::routes::photos::create_photo,
        crate::routes::photos::update_photo,
        crate::routes::photos::delete_photo,
        crate::routes::essays::list_essays,
        crate::routes::essays::create_essay,
        crate::routes::essays::update_essay,
        crate::routes::essays::delete_essay,
        crate::routes::papers::list_papers,
        crate::routes::papers::list_all_papers,
        crate::routes::papers::create_paper,
        crate::routes::papers::update_paper,
        crate::routes::papers::delete_paper,
        crate::routes::admin::trigger_import,
    ),
    components(
        schemas(
            Photo, Essay, Paper, User,
            CreatePhotoPayload, UpdatePhotoPayload,
            CreateEssayPayload, UpdateEssayPayload,
            CreatePaperPayload, UpdatePaperPayload,
            LoginPayload, AuthToken, ImportPayload, ImportResponse
        )
    ),
    tags(
        (name = "Portfolio API", description = "ギャラリー・エッセイ・論文管理API")
    ),
    modifiers(&SecurityAddon) // Bearer 認証の定義
)]
struct ApiDoc;

// --- 認証 (Bearer) の定義 ---

struct SecurityAddon;
impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth", // この名前は #[utoipa::path(...)] で参照します
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

// --- ルーターの構築 ---

/// Swagger UI をホストするルーターを返します。
/// ( /api-docs にUI、 /api-docs/openapi.json に仕様JSON)
pub fn create_swagger_routes() -> SwaggerUi {
    SwaggerUi::new("/api-docs").url("/api-docs/openapi.json", ApiDoc::openapi())
}
