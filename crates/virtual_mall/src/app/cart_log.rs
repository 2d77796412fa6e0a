use tracing::info;
use walkthrough::{CatalogItem, SceneEvent, SceneEventSink};

/// Host-side record of cart additions; stands in for the storefront's cart API.
#[derive(Debug, Default)]
pub(crate) struct CartLog {
    items: Vec<CatalogItem>,
}

impl SceneEventSink for CartLog {
    fn on_scene_event(&mut self, event: &SceneEvent) {
        match event {
            SceneEvent::ItemAddedToCart(item) => {
                self.items.push(item.clone());
                info!(
                    item = %item.name,
                    image = %item.image,
                    cart_len = self.items.len(),
                    "cart_updated"
                );
            }
            SceneEvent::ItemSelected(item) => {
                info!(item = %item.name, "item_selected");
            }
            SceneEvent::ExitRequested => {
                info!(cart_len = self.items.len(), "leaving_mall");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_add_is_recorded_in_order() {
        let mut log = CartLog::default();
        let shirt = CatalogItem::new("Shirt", "/clothes/shirt.jpg");
        let shoes = CatalogItem::new("Shoes", "/clothes/shoes.jpg");
        log.on_scene_event(&SceneEvent::ItemAddedToCart(shirt.clone()));
        log.on_scene_event(&SceneEvent::ItemSelected(shoes.clone()));
        log.on_scene_event(&SceneEvent::ItemAddedToCart(shirt.clone()));
        log.on_scene_event(&SceneEvent::ExitRequested);
        assert_eq!(log.items, vec![shirt.clone(), shirt]);
    }
}
