use std::collections::HashSet;
use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{ConfigError, IngredientKind};

/// Generate a URL-safe slug from a display name.
///
/// Non-ASCII characters are dropped, spaces become dashes, and runs of
/// dashes collapse.
#[must_use]
pub fn slug_from_name(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' {
                c
            } else if c == ' ' {
                '-'
            } else {
                '\0'
            }
        })
        .filter(|&c| c != '\0')
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngredientSeed {
    pub name: String,
    pub kind: IngredientKind,
    pub price: Decimal,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductSeed {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub stock: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorySeed {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub ingredients: Vec<IngredientSeed>,
    #[serde(default)]
    pub products: Vec<ProductSeed>,
}

impl CategorySeed {
    #[must_use]
    pub fn slug(&self) -> String {
        slug_from_name(&self.name)
    }
}

#[derive(Debug, Deserialize)]
pub struct CatalogFile {
    pub categories: Vec<CategorySeed>,
}

/// Load and validate the catalog seed file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_catalog(path: &Path) -> Result<CatalogFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::CatalogFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let catalog: CatalogFile =
        serde_yaml::from_str(&content).map_err(ConfigError::CatalogFileParse)?;

    validate_catalog(&catalog)?;

    Ok(catalog)
}

fn validate_catalog(catalog: &CatalogFile) -> Result<(), ConfigError> {
    let mut seen_slugs = HashSet::new();

    for category in &catalog.categories {
        if category.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "category name must be non-empty".to_string(),
            ));
        }

        let slug = category.slug();
        if slug.is_empty() || !seen_slugs.insert(slug.clone()) {
            return Err(ConfigError::Validation(format!(
                "duplicate or empty category slug: '{}' (from category '{}')",
                slug, category.name
            )));
        }

        let mut ingredient_names = HashSet::new();
        for ingredient in &category.ingredients {
            if ingredient.name.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "ingredient in category '{}' has an empty name",
                    category.name
                )));
            }
            if ingredient.price < Decimal::ZERO {
                return Err(ConfigError::Validation(format!(
                    "ingredient '{}' has negative price {}",
                    ingredient.name, ingredient.price
                )));
            }
            if !ingredient_names.insert(ingredient.name.to_lowercase()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate ingredient '{}' in category '{}'",
                    ingredient.name, category.name
                )));
            }
        }

        let mut product_names = HashSet::new();
        for product in &category.products {
            if product.name.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "product in category '{}' has an empty name",
                    category.name
                )));
            }
            if product.price < Decimal::ZERO || product.stock < 0 {
                return Err(ConfigError::Validation(format!(
                    "product '{}' has negative price or stock",
                    product.name
                )));
            }
            if !product_names.insert(product.name.to_lowercase()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate product '{}' in category '{}'",
                    product.name, category.name
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(name: &str) -> CategorySeed {
        CategorySeed {
            name: name.to_string(),
            description: None,
            ingredients: vec![],
            products: vec![],
        }
    }

    fn ingredient(name: &str, kind: IngredientKind, cents: i64) -> IngredientSeed {
        IngredientSeed {
            name: name.to_string(),
            kind,
            price: Decimal::new(cents, 2),
            description: None,
        }
    }

    #[test]
    fn slug_simple_name() {
        assert_eq!(slug_from_name("Bath Soaps"), "bath-soaps");
    }

    #[test]
    fn slug_strips_punctuation_and_accents() {
        assert_eq!(slug_from_name("Velas d'Autor"), "velas-dautor");
        // ñ is dropped without inserting a dash
        assert_eq!(slug_from_name("Jabón  Artesanal"), "jabn-artesanal");
    }

    #[test]
    fn validate_rejects_empty_category_name() {
        let catalog = CatalogFile {
            categories: vec![category("  ")],
        };
        let err = validate_catalog(&catalog).unwrap_err();
        assert!(err.to_string().contains("non-empty"));
    }

    #[test]
    fn validate_rejects_duplicate_slug() {
        let catalog = CatalogFile {
            categories: vec![category("Soaps"), category("soaps ")],
        };
        let err = validate_catalog(&catalog).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn validate_rejects_negative_ingredient_price() {
        let mut soaps = category("Soaps");
        soaps
            .ingredients
            .push(ingredient("Round mold", IngredientKind::Mold, -100));
        let catalog = CatalogFile {
            categories: vec![soaps],
        };
        let err = validate_catalog(&catalog).unwrap_err();
        assert!(err.to_string().contains("negative price"));
    }

    #[test]
    fn validate_rejects_duplicate_ingredient_name() {
        let mut soaps = category("Soaps");
        soaps
            .ingredients
            .push(ingredient("Lavender", IngredientKind::Aroma, 300));
        soaps
            .ingredients
            .push(ingredient("lavender", IngredientKind::Essence, 200));
        let catalog = CatalogFile {
            categories: vec![soaps],
        };
        let err = validate_catalog(&catalog).unwrap_err();
        assert!(err.to_string().contains("duplicate ingredient"));
    }

    #[test]
    fn parse_accepts_scent_alias() {
        let yaml = r"
categories:
  - name: Candles
    ingredients:
      - name: Vanilla
        kind: scent
        price: '3.50'
";
        let catalog: CatalogFile = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            catalog.categories[0].ingredients[0].kind,
            IngredientKind::Aroma
        );
        assert!(catalog.categories[0].products.is_empty());
    }

    #[test]
    fn load_catalog_from_real_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("config")
            .join("catalog.yaml");
        assert!(path.exists(), "catalog.yaml missing at {path:?}");
        let catalog = load_catalog(&path).expect("catalog.yaml should load");
        assert!(!catalog.categories.is_empty());

        // Every seeded category must be able to satisfy a custom composition.
        for category in &catalog.categories {
            for (kind, needed) in crate::REQUIRED_KIND_COUNTS {
                let available = category
                    .ingredients
                    .iter()
                    .filter(|i| i.kind == kind)
                    .count();
                assert!(
                    available >= needed,
                    "category '{}' has {available} {kind} ingredient(s), needs {needed}",
                    category.name
                );
            }
        }
    }
}
