//! Catalog routes.

use std::path::Path;

use axum::{
    Json,
    extract::{Multipart, State, multipart::Field},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use greenbasket_core::ProductId;
use greenbasket_core::catalog::{BEST_SELLER_COUNT, best_sellers};

use crate::db::RepositoryError;
use crate::db::products::ProductRepository;
use crate::error::{ApiJson, AppError, Result};
use crate::middleware::RequireSeller;
use crate::models::product::{NewProduct, ProductInput};
use crate::state::AppState;

/// Public URL prefix under which uploaded images are served.
pub const UPLOADS_PATH: &str = "/uploads";

/// Multipart field holding the product JSON.
const PRODUCT_DATA_FIELD: &str = "productData";
/// Multipart field(s) holding image files.
const IMAGES_FIELD: &str = "images";

#[derive(Debug, Deserialize)]
pub struct ProductIdRequest {
    pub id: ProductId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockRequest {
    pub id: ProductId,
    pub in_stock: bool,
}

/// `GET /api/product/list`
#[instrument(skip(state))]
pub async fn list(State(state): State<AppState>) -> Result<Json<Value>> {
    let products = ProductRepository::new(state.pool()).list_all().await?;
    Ok(Json(json!({ "success": true, "products": products })))
}

/// `GET /api/product/best-sellers`
#[instrument(skip(state))]
pub async fn best_seller_list(State(state): State<AppState>) -> Result<Json<Value>> {
    let products = ProductRepository::new(state.pool()).list_all().await?;
    let top = best_sellers(&products, BEST_SELLER_COUNT);
    Ok(Json(json!({ "success": true, "products": top })))
}

/// `POST /api/product/id`
#[instrument(skip(state))]
pub async fn by_id(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ProductIdRequest>,
) -> Result<Json<Value>> {
    let product = ProductRepository::new(state.pool())
        .get_by_id(body.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;

    Ok(Json(json!({ "success": true, "product": product })))
}

/// An image received in the upload, held in memory until the product validates.
struct PendingImage {
    extension: String,
    bytes: axum::body::Bytes,
}

/// `POST /api/product/add`
///
/// Multipart body: `productData` (JSON product fields) and any number of
/// `images` files.
#[instrument(skip(state, multipart))]
pub async fn add(
    State(state): State<AppState>,
    _seller: RequireSeller,
    mut multipart: Multipart,
) -> Result<Json<Value>> {
    let mut input: Option<ProductInput> = None;
    let mut images: Vec<PendingImage> = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some(PRODUCT_DATA_FIELD) => {
                let text = field.text().await.map_err(bad_multipart)?;
                let parsed = serde_json::from_str(&text)
                    .map_err(|e| AppError::BadRequest(format!("Invalid productData: {e}")))?;
                input = Some(parsed);
            }
            Some(IMAGES_FIELD) => images.push(read_image(field).await?),
            _ => {}
        }
    }

    let input = input.ok_or_else(|| AppError::BadRequest("productData is required".to_string()))?;
    let mut product = NewProduct::from_input(input, Vec::new()).map_err(AppError::BadRequest)?;

    let upload_dir = &state.config().upload_dir;
    let stored = store_images(upload_dir, images).await?;
    product.image = stored.iter().map(|name| format!("{UPLOADS_PATH}/{name}")).collect();

    let product = match ProductRepository::new(state.pool()).create(&product).await {
        Ok(product) => product,
        Err(e) => {
            remove_images(upload_dir, &stored).await;
            return Err(e.into());
        }
    };
    info!(product_id = %product.id, "Product added");

    Ok(Json(json!({
        "success": true,
        "message": "Product Added",
        "product": product,
    })))
}

/// `POST /api/product/stock`
#[instrument(skip(state))]
pub async fn change_stock(
    State(state): State<AppState>,
    _seller: RequireSeller,
    ApiJson(body): ApiJson<StockRequest>,
) -> Result<Json<Value>> {
    let product = ProductRepository::new(state.pool())
        .set_in_stock(body.id, body.in_stock)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => AppError::NotFound("Product not found".to_string()),
            other => other.into(),
        })?;

    Ok(Json(json!({
        "success": true,
        "message": "Stock Updated",
        "product": product,
    })))
}

fn bad_multipart(err: axum::extract::multipart::MultipartError) -> AppError {
    AppError::BadRequest(err.body_text())
}

async fn read_image(field: Field<'_>) -> Result<PendingImage> {
    let is_image = field
        .content_type()
        .is_some_and(|ct| ct.starts_with("image/"));
    if !is_image {
        return Err(AppError::BadRequest("images must be image files".to_string()));
    }

    let extension = image_extension(field.file_name(), field.content_type());
    let bytes = field.bytes().await.map_err(bad_multipart)?;
    if bytes.is_empty() {
        return Err(AppError::BadRequest("empty image upload".to_string()));
    }

    Ok(PendingImage { extension, bytes })
}

/// Extensions an uploaded image may be stored under.
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "gif"];

/// Pick an allowed file extension from the client file name, else the MIME
/// subtype. Anything else is stored as `.img`.
fn image_extension(file_name: Option<&str>, content_type: Option<&str>) -> String {
    let from_name = file_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str());
    let from_mime = content_type.and_then(|ct| ct.strip_prefix("image/"));

    from_name
        .into_iter()
        .chain(from_mime)
        .map(str::to_ascii_lowercase)
        .find(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or_else(|| "img".to_string())
}

/// Write images under `dir` with random names and return the file names.
///
/// On a write failure the files already written are removed.
async fn store_images(dir: &Path, images: Vec<PendingImage>) -> Result<Vec<String>> {
    if images.is_empty() {
        return Ok(Vec::new());
    }

    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| AppError::Internal(format!("create upload dir: {e}")))?;

    let mut names = Vec::with_capacity(images.len());
    for image in images {
        let file_name = format!("{}.{}", Uuid::new_v4(), image.extension);
        if let Err(e) = tokio::fs::write(dir.join(&file_name), &image.bytes).await {
            remove_images(dir, &names).await;
            return Err(AppError::Internal(format!("write upload: {e}")));
        }
        names.push(file_name);
    }

    Ok(names)
}

/// Best-effort removal of stored images.
async fn remove_images(dir: &Path, names: &[String]) {
    for name in names {
        if let Err(e) = tokio::fs::remove_file(dir.join(name)).await {
            warn!(file = %name, error = %e, "Failed to remove orphaned upload");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_image_extension_prefers_file_name() {
        assert_eq!(
            image_extension(Some("Apple.JPG"), Some("image/jpeg")),
            "jpg"
        );
    }

    #[test]
    fn test_image_extension_falls_back_to_mime() {
        assert_eq!(image_extension(Some("apple"), Some("image/png")), "png");
        assert_eq!(image_extension(None, Some("image/webp")), "webp");
    }

    #[test]
    fn test_image_extension_rejects_unsafe_names() {
        assert_eq!(
            image_extension(Some("../../etc/passwd.sh;rm"), Some("image/svg+xml")),
            "img"
        );
    }

    #[test]
    fn test_image_extension_rejects_scriptable_formats() {
        assert_eq!(image_extension(Some("x.svg"), Some("image/svg+xml")), "img");
        assert_eq!(image_extension(Some("x.html"), Some("image/png")), "png");
        assert_eq!(image_extension(Some("x.bmp"), Some("image/bmp")), "img");
    }

    #[tokio::test]
    async fn test_store_and_remove_images() {
        let dir = std::env::temp_dir().join(format!("greenbasket-store-{}", Uuid::new_v4()));
        let images = vec![PendingImage {
            extension: "png".to_string(),
            bytes: axum::body::Bytes::from_static(b"\x89PNG"),
        }];

        let names = store_images(&dir, images).await.unwrap();
        assert_eq!(names.len(), 1);
        assert!(names[0].ends_with(".png"));
        assert!(dir.join(&names[0]).exists());

        remove_images(&dir, &names).await;
        assert!(!dir.join(&names[0]).exists());
        let _ = std::fs::remove_dir(&dir);
    }
}
