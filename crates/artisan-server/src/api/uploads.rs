//! Admin image uploads for catalog entities. Files are content-addressed
//! under the upload directory and served from `/uploads`.

use artisan_core::Role;
use artisan_db::{CategoryRow, IngredientRow, ProductRow};
use axum::{
    extract::{multipart::Field, Multipart, Path, State},
    Extension, Json,
};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::middleware::{AuthUser, RequestId};

use super::{map_db_error, require_role, validation_error, ApiError, ApiResponse, AppState};

const IMAGE_FIELD: &str = "image";

/// File extension for an accepted image content type.
fn extension_for(content_type: &str) -> Option<&'static str> {
    let essence = content_type.split(';').next().unwrap_or_default().trim();
    match essence.to_ascii_lowercase().as_str() {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

/// File extension for the image format the bytes actually contain.
fn sniff_extension(data: &[u8]) -> Option<&'static str> {
    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("jpg")
    } else if data.starts_with(b"\x89PNG\r\n\x1a\n") {
        Some("png")
    } else if data.len() >= 12 && &data[..4] == b"RIFF" && &data[8..12] == b"WEBP" {
        Some("webp")
    } else {
        None
    }
}

fn stored_name(data: &[u8], extension: &str) -> String {
    format!("{:x}.{extension}", Sha256::digest(data))
}

async fn read_limited(
    req_id: &RequestId,
    field: &mut Field<'_>,
    max_bytes: usize,
) -> Result<Vec<u8>, ApiError> {
    let mut data = Vec::new();
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| validation_error(req_id, format!("invalid multipart data: {e}")))?
    {
        if data.len() + chunk.len() > max_bytes {
            return Err(ApiError::new(
                req_id.0.clone(),
                "payload_too_large",
                format!("image exceeds the {max_bytes} byte limit"),
            ));
        }
        data.extend_from_slice(&chunk);
    }
    Ok(data)
}

/// Pull the `image` field out of the form, validate it, and write it to disk.
/// Returns the public URL path of the stored file.
async fn store_image(
    state: &AppState,
    req_id: &RequestId,
    multipart: &mut Multipart,
) -> Result<String, ApiError> {
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| validation_error(req_id, format!("invalid multipart data: {e}")))?
    {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let content_type = field.content_type().unwrap_or_default().to_string();
        let Some(extension) = extension_for(&content_type) else {
            return Err(validation_error(
                req_id,
                "image must be image/jpeg, image/png or image/webp",
            ));
        };

        let data = read_limited(req_id, &mut field, state.uploads.max_bytes).await?;
        if data.is_empty() {
            return Err(validation_error(req_id, "image is empty"));
        }
        if sniff_extension(&data) != Some(extension) {
            return Err(validation_error(
                req_id,
                format!("image content does not match {content_type}"),
            ));
        }

        let name = stored_name(&data, extension);
        let path = state.uploads.dir.join(&name);
        tokio::fs::write(&path, &data).await.map_err(|e| {
            tracing::error!(error = %e, path = %path.display(), "failed to write upload");
            ApiError::new(req_id.0.clone(), "internal_error", "failed to store image")
        })?;

        tracing::info!(file = %name, bytes = data.len(), "image stored");
        return Ok(format!("/uploads/{name}"));
    }

    Err(validation_error(req_id, "multipart field 'image' is required"))
}

/// POST /api/v1/products/{id}/image (admin)
pub(super) async fn upload_product_image(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<ProductRow>>, ApiError> {
    require_role(&req_id, &user, Role::Admin)?;
    artisan_db::get_product(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let url = store_image(&state, &req_id, &mut multipart).await?;
    let row = artisan_db::set_product_image(&state.pool, id, &url)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    Ok(ApiResponse::new(&req_id, row))
}

/// POST /api/v1/categories/{id}/image (admin)
pub(super) async fn upload_category_image(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<CategoryRow>>, ApiError> {
    require_role(&req_id, &user, Role::Admin)?;
    artisan_db::get_category(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let url = store_image(&state, &req_id, &mut multipart).await?;
    let row = artisan_db::set_category_image(&state.pool, id, &url)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    Ok(ApiResponse::new(&req_id, row))
}

/// POST /api/v1/ingredients/{id}/image (admin)
pub(super) async fn upload_ingredient_image(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<IngredientRow>>, ApiError> {
    require_role(&req_id, &user, Role::Admin)?;
    artisan_db::get_ingredient(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let url = store_image(&state, &req_id, &mut multipart).await?;
    let row = artisan_db::set_ingredient_image(&state.pool, id, &url)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    Ok(ApiResponse::new(&req_id, row))
}
