use std::env;
use std::path::{Path, PathBuf};

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use walkthrough::{
    resolve_app_paths, AppError, Catalog, FileTextureSource, LoopConfig, ProfileSelection, SceneHost,
    SessionConfig,
};

use super::cart_log::CartLog;

const CATALOG_ENV_VAR: &str = "MALL_CATALOG";
const SHOP_ENV_VAR: &str = "MALL_SHOP";
const DEVICE_PROFILE_ENV_VAR: &str = "MALL_DEVICE_PROFILE";
const CART_ENV_VAR: &str = "MALL_CART";

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) session: SessionConfig,
    pub(crate) host: SceneHost,
}

pub(crate) fn build_app() -> Result<AppWiring, AppError> {
    init_tracing();
    info!("=== Virtual Mall Startup ===");

    let paths = resolve_app_paths()?;
    let catalog = load_catalog(read_env(CATALOG_ENV_VAR).map(PathBuf::from), &paths.catalog_path)?;
    let shop = catalog.shop(read_env(SHOP_ENV_VAR).as_deref())?;
    let profile_selection = parse_profile_selection(read_env(DEVICE_PROFILE_ENV_VAR).as_deref());
    let cart_enabled = parse_cart_flag(read_env(CART_ENV_VAR).as_deref());

    info!(
        root = %paths.root.display(),
        shop = %shop.name,
        item_count = shop.items.len(),
        profile_selection = ?profile_selection,
        cart_enabled,
        "mall_configured"
    );

    let config = LoopConfig {
        window_title: format!("Virtual Mall - {}", shop.name),
        profile_selection,
        ..LoopConfig::default()
    };
    let session = SessionConfig {
        cart_enabled,
        ..SessionConfig::default()
    };
    let host = SceneHost {
        items: shop.items_arc(),
        textures: Box::new(FileTextureSource::new(paths.assets_dir)),
        events: Box::new(CartLog::default()),
    };

    Ok(AppWiring {
        config,
        session,
        host,
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

fn read_env(var: &'static str) -> Option<String> {
    env::var(var)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// An explicit catalog path must load; the bundled one falls back to the demo shop.
fn load_catalog(explicit: Option<PathBuf>, bundled: &Path) -> Result<Catalog, AppError> {
    if let Some(path) = explicit {
        return Ok(Catalog::load(&path)?);
    }
    if bundled.is_file() {
        return Ok(Catalog::load(bundled)?);
    }
    warn!(path = %bundled.display(), "catalog_missing_using_demo_shop");
    Ok(Catalog::demo())
}

fn parse_profile_selection(raw: Option<&str>) -> ProfileSelection {
    let Some(raw) = raw else {
        return ProfileSelection::default();
    };
    raw.parse().unwrap_or_else(|err| {
        warn!(
            var = DEVICE_PROFILE_ENV_VAR,
            value = raw,
            error = %err,
            "invalid_env_value_using_default"
        );
        ProfileSelection::default()
    })
}

fn parse_cart_flag(raw: Option<&str>) -> bool {
    match raw.map(str::to_ascii_lowercase).as_deref() {
        None => false,
        Some("1" | "true" | "on" | "yes") => true,
        Some("0" | "false" | "off" | "no") => false,
        Some(other) => {
            warn!(var = CART_ENV_VAR, value = other, "invalid_env_value_using_default");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use walkthrough::DeviceProfile;

    use super::*;

    #[test]
    fn profile_values_parse_with_fallback() {
        assert_eq!(parse_profile_selection(None), ProfileSelection::default());
        assert_eq!(
            parse_profile_selection(Some("mobile")),
            ProfileSelection::Fixed(DeviceProfile::Mobile)
        );
        assert_eq!(parse_profile_selection(Some("auto")), ProfileSelection::Auto);
        assert_eq!(
            parse_profile_selection(Some("tablet")),
            ProfileSelection::default()
        );
    }

    #[test]
    fn cart_flag_accepts_common_spellings() {
        assert!(!parse_cart_flag(None));
        assert!(parse_cart_flag(Some("1")));
        assert!(parse_cart_flag(Some("TRUE")));
        assert!(!parse_cart_flag(Some("0")));
        assert!(!parse_cart_flag(Some("maybe")));
    }

    #[test]
    fn missing_bundled_catalog_falls_back_to_demo() {
        let temp = tempfile::tempdir().expect("tempdir");
        let catalog =
            load_catalog(None, &temp.path().join("catalog.json")).expect("demo fallback");
        assert_eq!(catalog, Catalog::demo());
    }

    #[test]
    fn missing_explicit_catalog_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let bundled = temp.path().join("bundled.json");
        fs::write(&bundled, r#"[{ "name": "Hat", "image": "/hat.png" }]"#).expect("write");

        let result = load_catalog(Some(temp.path().join("absent.json")), &bundled);
        assert!(matches!(result, Err(AppError::Catalog(_))));
    }

    #[test]
    fn bundled_catalog_is_preferred_over_demo() {
        let temp = tempfile::tempdir().expect("tempdir");
        let bundled = temp.path().join("catalog.json");
        fs::write(&bundled, r#"[{ "name": "Hat", "image": "/hat.png" }]"#).expect("write");

        let catalog = load_catalog(None, &bundled).expect("bundled catalog");
        let shop = catalog.shop(None).expect("shop");
        assert_eq!(shop.items.len(), 1);
        assert_eq!(shop.items[0].name, "Hat");
    }
}
