use std::io::Write;

use super::*;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

#[test]
fn slug_simple_name() {
    assert_eq!(slugify("Wireless Mouse"), "wireless-mouse");
}

#[test]
fn slug_special_characters() {
    assert_eq!(slugify("Kid's T-Shirt (XL)"), "kids-t-shirt-xl");
}

#[test]
fn slug_collapses_whitespace_runs() {
    assert_eq!(slugify("  Big   Box \t Set "), "big-box-set");
}

#[test]
fn slug_strips_non_ascii() {
    assert_eq!(slugify("Café Crème"), "caf-crme");
}

#[test]
fn sku_defaults_to_name_slug() {
    assert_eq!(sku_from_name("USB-C Hub 7in1", 4), "usb-c-hub-7in1");
}

#[test]
fn sku_falls_back_to_product_id_when_name_has_no_ascii() {
    assert_eq!(sku_from_name("日本茶", 12), "product-12");
    assert_eq!(sku_from_name("緑茶", 13), "product-13");
    assert_eq!(sku_from_name("  !! ", 14), "product-14");
}

#[test]
fn upload_path_for_non_ascii_product_keeps_a_directory() {
    let path = product_image_upload_path("日本茶", "tin.png", date(2025, 4, 8));
    assert_eq!(path, "product_images/product/2025-04-08/tin.png");
}

#[test]
fn upload_path_uses_product_slug_and_date() {
    let path = product_image_upload_path("Wireless Mouse", "Front View.JPG", date(2025, 4, 8));
    assert_eq!(path, "product_images/wireless-mouse/2025-04-08/front-view.jpg");
}

#[test]
fn upload_path_without_extension() {
    let path = product_image_upload_path("Lamp", "photo", date(2024, 12, 31));
    assert_eq!(path, "product_images/lamp/2024-12-31/photo");
}

#[test]
fn upload_path_ignores_directories_in_filename() {
    let path = product_image_upload_path("Lamp", "uploads/tmp/side shot.png", date(2024, 1, 2));
    assert_eq!(path, "product_images/lamp/2024-01-02/side-shot.png");
}

#[test]
fn rating_bounds() {
    assert_eq!(validate_rating(1), Ok(1));
    assert_eq!(validate_rating(5), Ok(5));
    assert_eq!(validate_rating(0), Err(CoreError::InvalidRating(0)));
    assert_eq!(validate_rating(6), Err(CoreError::InvalidRating(6)));
}

#[test]
fn validate_rejects_empty_category_name() {
    let catalog = CatalogFile {
        categories: vec![CategorySeed {
            name: "   ".to_string(),
            description: String::new(),
        }],
    };
    let err = validate_catalog(&catalog).unwrap_err();
    assert!(err.to_string().contains("must not be empty"));
}

#[test]
fn validate_rejects_case_insensitive_duplicates() {
    let catalog = CatalogFile {
        categories: vec![
            CategorySeed {
                name: "Electronics".to_string(),
                description: String::new(),
            },
            CategorySeed {
                name: "electronics".to_string(),
                description: "dup".to_string(),
            },
        ],
    };
    let err = validate_catalog(&catalog).unwrap_err();
    assert!(err.to_string().contains("duplicate category name"));
}

#[test]
fn load_catalog_parses_yaml() {
    let dir = std::env::temp_dir().join(format!("prodzm-catalog-{}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    let path = dir.join("catalog.yaml");
    let mut file = std::fs::File::create(&path).expect("create file");
    writeln!(
        file,
        "categories:\n  - name: Electronics\n    description: Gadgets\n  - name: Clothing\n"
    )
    .expect("write yaml");

    let catalog = load_catalog(&path).expect("catalog should load");
    assert_eq!(catalog.categories.len(), 2);
    assert_eq!(catalog.categories[0].description, "Gadgets");
    assert_eq!(catalog.categories[1].description, "");

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn load_catalog_reports_missing_file() {
    let err = load_catalog(Path::new("/nonexistent/prodzm/catalog.yaml")).unwrap_err();
    assert!(matches!(err, ConfigError::CatalogFileIo { .. }));
}

#[test]
fn shipped_catalog_file_is_valid() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("config")
        .join("catalog.yaml");
    let catalog = load_catalog(&path).expect("config/catalog.yaml should be valid");
    assert!(!catalog.categories.is_empty());
}
