use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::info;

const BARE_LIST_SHOP_NAME: &str = "Catalog";

/// A product shown on the back wall.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub name: String,
    /// Image URI or asset path. Unloadable references only affect the item's panel.
    #[serde(alias = "imageRef")]
    pub image: String,
}

impl CatalogItem {
    pub fn new(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shop {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(rename = "demoItems", alias = "items")]
    pub items: Vec<CatalogItem>,
}

impl Shop {
    pub fn items_arc(&self) -> Arc<[CatalogItem]> {
        Arc::from(self.items.as_slice())
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("catalog json is malformed: {0}")]
    Syntax(#[source] serde_json::Error),
    #[error("catalog json at {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("catalog must be a json list of shops or items")]
    NotAList,
    #[error("catalog contains no shops")]
    NoShops,
    #[error("shop `{requested}` not found (available: {})", available.join(", "))]
    ShopNotFound {
        requested: String,
        available: Vec<String>,
    },
    #[error("catalog item at {path} is invalid: {reason}")]
    InvalidItem { path: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    shops: Vec<Shop>,
}

impl Catalog {
    pub fn new(shops: Vec<Shop>) -> Result<Self, CatalogError> {
        validate_items(&shops, |shop, item| format!("[{shop}].demoItems[{item}]"))?;
        Ok(Self { shops })
    }

    /// The storefront's built-in demo shop.
    pub fn demo() -> Self {
        let items = [
            ("Shirt", "/clothes/shirt.jpg"),
            ("Sweater", "/clothes/sweater.jpg"),
            ("Dress", "/clothes/dress.jpg"),
            ("Handbag", "/clothes/handbag.jpg"),
            ("Shoes", "/clothes/shoes.jpg"),
        ]
        .into_iter()
        .map(|(name, image)| CatalogItem::new(name, image))
        .collect();
        Self {
            shops: vec![Shop {
                name: "Women's Upper Wear".to_string(),
                color: Some(0xffdfba),
                items,
            }],
        }
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let raw = fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog = Self::from_json_str(&raw)?;
        info!(
            path = %path.display(),
            shop_count = catalog.shops.len(),
            "catalog_loaded"
        );
        Ok(catalog)
    }

    /// Accepts `[{ name, demoItems: [...] }, ...]` or a bare `[{ name, image }, ...]`.
    pub fn from_json_str(raw: &str) -> Result<Self, CatalogError> {
        let value: Value = serde_json::from_str(raw).map_err(CatalogError::Syntax)?;
        let Value::Array(entries) = &value else {
            return Err(CatalogError::NotAList);
        };
        let is_shop_list = entries.first().is_some_and(|first| {
            first
                .as_object()
                .is_some_and(|object| object.contains_key("demoItems") || object.contains_key("items"))
        });

        if is_shop_list {
            return Self::new(deserialize_with_path::<Vec<Shop>>(value)?);
        }
        let shops = vec![Shop {
            name: BARE_LIST_SHOP_NAME.to_string(),
            color: None,
            items: deserialize_with_path::<Vec<CatalogItem>>(value)?,
        }];
        validate_items(&shops, |_, item| format!("[{item}]"))?;
        Ok(Self { shops })
    }

    pub fn shops(&self) -> &[Shop] {
        &self.shops
    }

    /// Named shop (case-insensitive), or the first shop when `name` is `None`.
    pub fn shop(&self, name: Option<&str>) -> Result<&Shop, CatalogError> {
        let Some(requested) = name else {
            return self.shops.first().ok_or(CatalogError::NoShops);
        };
        let requested = requested.trim();
        self.shops
            .iter()
            .find(|shop| shop.name.eq_ignore_ascii_case(requested))
            .ok_or_else(|| CatalogError::ShopNotFound {
                requested: requested.to_string(),
                available: self.shops.iter().map(|shop| shop.name.clone()).collect(),
            })
    }
}

/// Structural checks only; image references are resolved per panel at load time.
fn validate_items(
    shops: &[Shop],
    item_path: impl Fn(usize, usize) -> String,
) -> Result<(), CatalogError> {
    for (shop_index, shop) in shops.iter().enumerate() {
        for (item_index, item) in shop.items.iter().enumerate() {
            if item.name.trim().is_empty() {
                return Err(CatalogError::InvalidItem {
                    path: item_path(shop_index, item_index),
                    reason: "name is empty".to_string(),
                });
            }
        }
    }
    Ok(())
}

fn deserialize_with_path<T>(value: Value) -> Result<T, CatalogError>
where
    T: for<'de> Deserialize<'de>,
{
    serde_path_to_error::deserialize(value).map_err(|error| CatalogError::Parse {
        path: error.path().to_string(),
        source: error.into_inner(),
    })
}
