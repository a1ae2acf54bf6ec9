//! AI-assisted custom product suggestions. Nothing is persisted; the client
//! creates the product through the regular endpoint if they like it.

use artisan_core::{compose, IngredientKind, Role};
use artisan_db::{IngredientFilter, IngredientRow};
use axum::{extract::State, Extension, Json};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::inference::{IngredientOption, Suggestion};
use crate::middleware::{AuthUser, RequestId};

use super::{map_db_error, required_text, require_role, ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct RecommendationRequest {
    pub category_id: Uuid,
    pub preferences: String,
}

#[derive(Debug, Serialize)]
pub(super) struct RecommendationResponse {
    pub category_id: Uuid,
    pub ingredient_ids: Vec<Uuid>,
    pub ingredients: Vec<IngredientRow>,
    pub price: Decimal,
    pub explanation: String,
}

fn upstream_error(req_id: &RequestId, message: impl Into<String>) -> ApiError {
    ApiError::new(req_id.0.clone(), "upstream_error", message)
}

/// Map each suggested name onto an available ingredient of the same kind,
/// ignoring case and surrounding whitespace.
fn resolve_suggestion(
    suggestion: &Suggestion,
    available: &[IngredientRow],
) -> Result<Vec<IngredientRow>, String> {
    suggestion
        .picks()
        .into_iter()
        .map(|(kind, name)| {
            available
                .iter()
                .find(|row| {
                    row.name.trim().eq_ignore_ascii_case(name.trim())
                        && row.kind.parse::<IngredientKind>().ok() == Some(kind)
                })
                .cloned()
                .ok_or_else(|| format!("suggested {kind} '{name}' is not in the catalog"))
        })
        .collect()
}

/// POST /api/v1/custom-products/recommendation
pub(super) async fn recommend_custom_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<RecommendationRequest>,
) -> Result<Json<ApiResponse<RecommendationResponse>>, ApiError> {
    require_role(&req_id, &user, Role::Client)?;
    let preferences = required_text(&req_id, "preferences", &body.preferences, 1000)?;

    let Some(inference) = state.inference.clone() else {
        return Err(ApiError::new(
            req_id.0,
            "service_unavailable",
            "recommendations are not configured",
        ));
    };

    let category = artisan_db::get_category(&state.pool, body.category_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    let available = artisan_db::list_ingredients(
        &state.pool,
        IngredientFilter {
            category_id: Some(category.id),
            kind: None,
            active_only: true,
        },
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let options: Vec<IngredientOption<'_>> = available
        .iter()
        .filter_map(|row| {
            Some(IngredientOption {
                kind: row.kind.parse().ok()?,
                name: &row.name,
                description: row.description.as_deref(),
            })
        })
        .collect();

    let suggestion = inference
        .suggest(&category.name, &options, &preferences)
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, category_id = %category.id, "inference request failed");
            upstream_error(&req_id, e.to_string())
        })?;

    let chosen = resolve_suggestion(&suggestion, &available).map_err(|msg| {
        tracing::warn!(reason = %msg, "inference suggestion did not match the catalog");
        upstream_error(&req_id, msg)
    })?;

    let requested: Vec<Uuid> = chosen.iter().map(|row| row.id).collect();
    let refs = chosen
        .iter()
        .map(IngredientRow::to_ref)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| upstream_error(&req_id, e.to_string()))?;
    let composition = compose(&requested, category.id, &refs)
        .map_err(|e| upstream_error(&req_id, format!("suggestion is not a valid composition: {e}")))?;

    Ok(ApiResponse::new(
        &req_id,
        RecommendationResponse {
            category_id: category.id,
            ingredient_ids: composition.ingredient_ids,
            ingredients: chosen,
            price: composition.price,
            explanation: suggestion.explanation,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn row(name: &str, kind: &str) -> IngredientRow {
        IngredientRow {
            id: Uuid::new_v4(),
            category_id: Uuid::nil(),
            name: name.to_string(),
            kind: kind.to_string(),
            price: Decimal::new(300, 2),
            description: None,
            image_url: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn suggestion(essences: &[&str]) -> Suggestion {
        Suggestion {
            mold: "round mold".to_string(),
            color: "Ocean Blue".to_string(),
            aroma: " Citrus ".to_string(),
            essences: essences.iter().map(|e| (*e).to_string()).collect(),
            explanation: String::new(),
        }
    }

    fn catalog() -> Vec<IngredientRow> {
        vec![
            row("Round Mold", "mold"),
            row("Ocean Blue", "color"),
            row("Citrus", "aroma"),
            row("Lavender Oil", "essence"),
            row("Mint Oil", "essence"),
        ]
    }

    #[test]
    fn resolves_names_case_insensitively_in_pick_order() {
        let available = catalog();
        let chosen =
            resolve_suggestion(&suggestion(&["mint oil", "LAVENDER OIL"]), &available).expect("resolved");

        let names: Vec<&str> = chosen.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(
            names,
            ["Round Mold", "Ocean Blue", "Citrus", "Mint Oil", "Lavender Oil"]
        );
    }

    #[test]
    fn unknown_name_is_reported() {
        let err = resolve_suggestion(&suggestion(&["Mint Oil", "Dragon Oil"]), &catalog())
            .expect_err("unknown essence");
        assert!(err.contains("Dragon Oil"), "got: {err}");
    }

    #[test]
    fn name_of_wrong_kind_does_not_resolve() {
        // "Citrus" exists, but only as an aroma.
        let err = resolve_suggestion(&suggestion(&["Mint Oil", "Citrus"]), &catalog())
            .expect_err("kind mismatch");
        assert!(err.contains("essence"), "got: {err}");
    }
}
