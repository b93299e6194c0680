//! OpenAPI documentation and Swagger UI integration.

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::AppContext;

/// OpenAPI documentation for Imageforged.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Imageforged API",
        version = "0.1.0",
        description = "Bulk image conversion with session-scoped downloads",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT"),
    ),
    servers(
        (url = "/", description = "Default server")
    ),
    paths(
        super::health_check,
        super::routes_convert::convert,
        super::routes_download::download_one,
        super::routes_download::download_zip,
    ),
    components(
        schemas(
            super::HealthResponse,
            super::routes_convert::ConvertForm,
            crate::conversion::BatchSummary,
            crate::conversion::ItemResult,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "conversion", description = "Bulk image conversion"),
        (name = "downloads", description = "Retrieval of converted images"),
    )
)]
pub struct ApiDoc;

/// Swagger UI at `/api-docs`, spec at `/api-docs/openapi.json`.
pub fn openapi_routes() -> Router<AppContext> {
    Router::new()
        .merge(SwaggerUi::new("/api-docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
