use actix_web::web;
use utoipa::OpenApi;
use utoipa::{
    Modify,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers;
use crate::models::*;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.as_mut().unwrap();
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        )
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::verify_code,
        handlers::product::create_product,
        handlers::product::list_products,
        handlers::product::list_my_products,
        handlers::admin::list_users,
        handlers::admin::list_products,
        handlers::admin::delete_user,
        handlers::admin::delete_product,
    ),
    components(
        schemas(
            User,
            UserRole,
            UserResponse,
            RegisterRequest,
            LoginRequest,
            VerifyCodeRequest,
            SendCodeResponse,
            AuthResponse,
            ProductRow,
            ProductResponse,
            CreateProductRequest,
            SellerInfo,
            ApiError,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Authentication API"),
        (name = "product", description = "Product listing API"),
        (name = "admin", description = "Admin moderation API"),
    ),
    info(
        title = "StudentHelp Backend API",
        version = "1.0.0",
        description = "StudentHelp campus marketplace REST API documentation",
    ),
    servers(
        (url = "/api", description = "Local server")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}
