use chrono::Utc;
use sqlx::SqlitePool;

use crate::error::{AppError, AppResult};
use crate::models::*;

const PRODUCT_WITH_SELLER: &str = r#"
    SELECT
        p.id, p.title, p.description, p.price, p.image, p.seller_id,
        u.name AS seller_name, u.email AS seller_email,
        p.created_at
    FROM products p
    JOIN users u ON u.id = p.seller_id
"#;

#[derive(Clone)]
pub struct ProductService {
    pool: SqlitePool,
}

impl ProductService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create_product(
        &self,
        seller_id: i64,
        request: CreateProductRequest,
    ) -> AppResult<ProductResponse> {
        if request.title.trim().is_empty() {
            return Err(AppError::ValidationError("Title is required".to_string()));
        }
        if request.price < 0 {
            return Err(AppError::ValidationError(
                "Price must not be negative".to_string(),
            ));
        }

        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO products (title, description, price, image, seller_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(request.title.trim())
        .bind(&request.description)
        .bind(request.price)
        .bind(&request.image)
        .bind(seller_id)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.get_product(result.last_insert_rowid()).await
    }

    pub async fn get_product(&self, product_id: i64) -> AppResult<ProductResponse> {
        let row = sqlx::query_as::<_, ProductRow>(&format!("{PRODUCT_WITH_SELLER} WHERE p.id = ?"))
            .bind(product_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(ProductResponse::from)
            .ok_or_else(|| AppError::NotFound("Product not found".to_string()))
    }

    /// All listings, newest first, with seller name/email joined in.
    pub async fn list_products(&self) -> AppResult<Vec<ProductResponse>> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "{PRODUCT_WITH_SELLER} ORDER BY p.created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ProductResponse::from).collect())
    }

    /// One seller's listings ("sell history"), newest first.
    pub async fn list_products_by_seller(&self, seller_id: i64) -> AppResult<Vec<ProductResponse>> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "{PRODUCT_WITH_SELLER} WHERE p.seller_id = ? ORDER BY p.created_at DESC"
        ))
        .bind(seller_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ProductResponse::from).collect())
    }

    pub async fn delete_product(&self, product_id: i64) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM products WHERE id = ?")
            .bind(product_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Product not found".to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::auth_service::AccountDirectory;
    use crate::services::user_service::UserService;
    use crate::services::user_service::tests::test_pool;

    async fn seeded_services() -> (ProductService, UserService, User) {
        let pool = test_pool().await;
        let users = UserService::new(pool.clone());
        let seller = users
            .insert("Jordan Lee", "jordan@campus.edu", "hash")
            .await
            .unwrap();
        (ProductService::new(pool), users, seller)
    }

    fn textbook() -> CreateProductRequest {
        CreateProductRequest {
            title: "Calculus textbook".to_string(),
            description: Some("3rd edition, good condition".to_string()),
            price: 2500,
            image: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_list_products() {
        let (products, _, seller) = seeded_services().await;

        let created = products.create_product(seller.id, textbook()).await.unwrap();
        assert_eq!(created.seller.email, "jordan@campus.edu");
        assert_eq!(created.price, 2500);

        let all = products.list_products().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].seller.name, "Jordan Lee");
    }

    #[tokio::test]
    async fn test_create_product_rejects_blank_title() {
        let (products, _, seller) = seeded_services().await;

        let err = products
            .create_product(
                seller.id,
                CreateProductRequest {
                    title: "   ".to_string(),
                    description: None,
                    price: 100,
                    image: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_list_products_by_seller() {
        let (products, users, seller) = seeded_services().await;
        let other = users
            .insert("Sam Park", "sam@campus.edu", "hash")
            .await
            .unwrap();

        products.create_product(seller.id, textbook()).await.unwrap();
        products.create_product(other.id, textbook()).await.unwrap();

        let mine = products.list_products_by_seller(seller.id).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].seller.id, seller.id);
    }

    #[tokio::test]
    async fn test_delete_product() {
        let (products, _, seller) = seeded_services().await;
        let created = products.create_product(seller.id, textbook()).await.unwrap();

        products.delete_product(created.id).await.unwrap();
        let err = products.delete_product(created.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_deleting_seller_cascades_to_products() {
        let (products, users, seller) = seeded_services().await;
        products.create_product(seller.id, textbook()).await.unwrap();

        users.delete_user(seller.id).await.unwrap();

        let all = products.list_products().await.unwrap();
        assert!(all.is_empty());
    }
}
