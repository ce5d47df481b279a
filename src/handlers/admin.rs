use actix_web::{HttpMessage, HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

use crate::error::AppResult;
use crate::services::{ProductService, UserService};

fn get_user_id_from_request(req: &HttpRequest) -> Option<i64> {
    req.extensions().get::<i64>().copied()
}

async fn check_admin(user_service: &UserService, req: &HttpRequest) -> AppResult<()> {
    let user_id = get_user_id_from_request(req).unwrap_or(0);
    user_service.require_admin(user_id).await?;
    Ok(())
}

#[utoipa::path(
    get,
    path = "/admin/users",
    tag = "admin",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "All accounts"),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn list_users(
    user_service: web::Data<UserService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    if let Err(e) = check_admin(&user_service, &req).await {
        return Ok(e.error_response());
    }

    match user_service.list_users().await {
        Ok(users) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": users
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/admin/products",
    tag = "admin",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "All listings"),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn list_products(
    user_service: web::Data<UserService>,
    product_service: web::Data<ProductService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    if let Err(e) = check_admin(&user_service, &req).await {
        return Ok(e.error_response());
    }

    match product_service.list_products().await {
        Ok(products) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": products
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/admin/users/{id}",
    tag = "admin",
    params(
        ("id" = i64, Path, description = "Account id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Account removed"),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "Account not found")
    )
)]
pub async fn delete_user(
    user_service: web::Data<UserService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    if let Err(e) = check_admin(&user_service, &req).await {
        return Ok(e.error_response());
    }

    match user_service.delete_user(path.into_inner()).await {
        Ok(()) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "message": "User removed"
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/admin/products/{id}",
    tag = "admin",
    params(
        ("id" = i64, Path, description = "Listing id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Listing removed"),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "Listing not found")
    )
)]
pub async fn delete_product(
    user_service: web::Data<UserService>,
    product_service: web::Data<ProductService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    if let Err(e) = check_admin(&user_service, &req).await {
        return Ok(e.error_response());
    }

    match product_service.delete_product(path.into_inner()).await {
        Ok(()) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "message": "Product removed"
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn admin_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin")
            .route("/users", web::get().to(list_users))
            .route("/products", web::get().to(list_products))
            .route("/users/{id}", web::delete().to(delete_user))
            .route("/products/{id}", web::delete().to(delete_product)),
    );
}
