use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(description = "Resource Portal API Documentation", license(name = "MIT or Apache2", identifier="MIT Apache2.0"), title = "Resource Portal", version = env!("CARGO_PKG_VERSION")),
    paths(
        crate::resource::list_resources,
        crate::resource::get_resource,
        crate::resource::upload_resource,
        crate::resource::delete_resource
    )
)]
pub struct ApiDoc;

pub(crate) fn api_route<T: Clone + Sync + Send + 'static>() -> Router<T> {
    let doc = ApiDoc::openapi();
    Router::new().merge(SwaggerUi::new("/api/swagger-ui").url("/api/openapi.json", doc))
}
