use std::collections::HashSet;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{ConfigError, CoreError};

/// Directory prefix under which product image paths are generated.
pub const PRODUCT_IMAGE_ROOT: &str = "product_images";

/// Generate a URL-safe slug: lowercase ASCII alphanumerics, `_` and `-`,
/// with whitespace runs collapsed into single dashes.
#[must_use]
pub fn slugify(value: &str) -> String {
    value
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else if c.is_whitespace() {
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

/// Default SKU for a product that was created without one: the name's slug,
/// or `product-<id>` when the name has no ASCII letters or digits to slug.
#[must_use]
pub fn sku_from_name(name: &str, product_id: i64) -> String {
    let slug = slugify(name);
    if slug.is_empty() {
        format!("product-{product_id}")
    } else {
        slug
    }
}

/// Storage path for an uploaded product image:
/// `product_images/<product-slug>/<YYYY-MM-DD>/<file-slug>.<ext>`.
///
/// The extension is kept as given (lowercased); the stem is slugified.
#[must_use]
pub fn product_image_upload_path(product_name: &str, filename: &str, date: NaiveDate) -> String {
    let path = Path::new(filename);
    let stem = path
        .file_stem()
        .map(|s| slugify(&s.to_string_lossy()))
        .unwrap_or_default();
    let extension = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
        .unwrap_or_default();

    let mut product_dir = slugify(product_name);
    if product_dir.is_empty() {
        product_dir.push_str("product");
    }

    format!(
        "{PRODUCT_IMAGE_ROOT}/{product_dir}/{}/{stem}{extension}",
        date.format("%Y-%m-%d"),
    )
}

/// Review ratings are whole stars from 1 to 5.
///
/// # Errors
///
/// Returns [`CoreError::InvalidRating`] for values outside `1..=5`.
pub fn validate_rating(rating: i16) -> Result<i16, CoreError> {
    if (1..=5).contains(&rating) {
        Ok(rating)
    } else {
        Err(CoreError::InvalidRating(rating))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorySeed {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Seed file consumed by `prodzm-cli seed`.
#[derive(Debug, Deserialize)]
pub struct CatalogFile {
    pub categories: Vec<CategorySeed>,
}

/// Load and validate the catalog seed file from YAML.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_catalog(path: &Path) -> Result<CatalogFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::CatalogFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let catalog: CatalogFile = serde_yaml::from_str(&content)?;
    validate_catalog(&catalog)?;

    Ok(catalog)
}

fn validate_catalog(catalog: &CatalogFile) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for category in &catalog.categories {
        let name = category.name.trim();
        if name.is_empty() {
            return Err(ConfigError::CatalogValidation(
                "category name must not be empty".to_string(),
            ));
        }
        if name.chars().count() > 255 {
            return Err(ConfigError::CatalogValidation(format!(
                "category name '{name}' exceeds 255 characters"
            )));
        }
        if !seen.insert(name.to_lowercase()) {
            return Err(ConfigError::CatalogValidation(format!(
                "duplicate category name '{name}'"
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "catalog_test.rs"]
mod tests;
