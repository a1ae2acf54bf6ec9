//! Custom product composition rules.
//!
//! A custom product is assembled from ingredients of a single category and
//! must contain exactly one mold, one color, one aroma, and two essences.
//! Its price is the sum of its ingredient prices.

use std::collections::HashSet;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngredientKind {
    Mold,
    Color,
    #[serde(alias = "scent")]
    Aroma,
    Essence,
}

impl IngredientKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            IngredientKind::Mold => "mold",
            IngredientKind::Color => "color",
            IngredientKind::Aroma => "aroma",
            IngredientKind::Essence => "essence",
        }
    }
}

impl std::fmt::Display for IngredientKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IngredientKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mold" => Ok(IngredientKind::Mold),
            "color" => Ok(IngredientKind::Color),
            "aroma" | "scent" => Ok(IngredientKind::Aroma),
            "essence" => Ok(IngredientKind::Essence),
            _ => Err(CoreError::InvalidIngredientKind(s.to_string())),
        }
    }
}

/// Exact number of ingredients of each kind a custom product must contain.
pub const REQUIRED_KIND_COUNTS: [(IngredientKind, usize); 4] = [
    (IngredientKind::Mold, 1),
    (IngredientKind::Color, 1),
    (IngredientKind::Aroma, 1),
    (IngredientKind::Essence, 2),
];

/// The slice of an ingredient row the composer needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngredientRef {
    pub id: Uuid,
    pub category_id: Uuid,
    pub kind: IngredientKind,
    pub price: Decimal,
}

/// A validated ingredient set, ready to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Composition {
    /// Ingredient ids sorted ascending.
    pub ingredient_ids: Vec<Uuid>,
    pub price: Decimal,
    /// Sorted ids joined with `,`; identifies the ingredient set.
    pub composition_key: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CompositionError {
    #[error("a custom product needs at least one ingredient")]
    Empty,

    #[error("duplicate ingredient {0}")]
    Duplicate(Uuid),

    #[error("ingredient {0} not found")]
    NotFound(Uuid),

    #[error("ingredient {ingredient_id} does not belong to category {category_id}")]
    WrongCategory {
        ingredient_id: Uuid,
        category_id: Uuid,
    },

    #[error("expected exactly {expected} {kind} ingredient(s), got {actual}")]
    KindCount {
        kind: IngredientKind,
        expected: usize,
        actual: usize,
    },
}

/// Validate a requested ingredient set against the ingredients loaded from
/// storage and compute its price.
///
/// `found` may contain more rows than were requested; only requested ids are
/// considered.
///
/// # Errors
///
/// Returns the first [`CompositionError`] encountered, checked in order:
/// empty request, duplicate ids, unknown ids, category mismatch, kind counts.
pub fn compose(
    requested: &[Uuid],
    category_id: Uuid,
    found: &[IngredientRef],
) -> Result<Composition, CompositionError> {
    if requested.is_empty() {
        return Err(CompositionError::Empty);
    }

    let mut seen = HashSet::with_capacity(requested.len());
    for id in requested {
        if !seen.insert(*id) {
            return Err(CompositionError::Duplicate(*id));
        }
    }

    let mut selected = Vec::with_capacity(requested.len());
    for id in requested {
        let ingredient = found
            .iter()
            .find(|i| i.id == *id)
            .ok_or(CompositionError::NotFound(*id))?;
        selected.push(ingredient);
    }

    if let Some(stray) = selected.iter().find(|i| i.category_id != category_id) {
        return Err(CompositionError::WrongCategory {
            ingredient_id: stray.id,
            category_id,
        });
    }

    for (kind, expected) in REQUIRED_KIND_COUNTS {
        let actual = selected.iter().filter(|i| i.kind == kind).count();
        if actual != expected {
            return Err(CompositionError::KindCount {
                kind,
                expected,
                actual,
            });
        }
    }

    let price = selected.iter().map(|i| i.price).sum();
    let mut ingredient_ids: Vec<Uuid> = selected.iter().map(|i| i.id).collect();
    ingredient_ids.sort_unstable();
    let composition_key = composition_key(&ingredient_ids);

    Ok(Composition {
        ingredient_ids,
        price,
        composition_key,
    })
}

/// Canonical key for an ingredient set, independent of input order.
#[must_use]
pub fn composition_key(ids: &[Uuid]) -> String {
    let mut sorted = ids.to_vec();
    sorted.sort_unstable();
    sorted
        .iter()
        .map(Uuid::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
#[path = "composition_test.rs"]
mod tests;
