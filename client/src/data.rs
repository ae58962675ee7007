//! Catalogue collaborators: where tenants and products come from, and where selections go.

use bevy::prelude::*;
use std::collections::HashMap;
use venue_shared::{
    Money, NavigationIntent, NavigationSink, Product, ProductQuery, Tenant, VenueDataSource,
};

/// Tenant and product source used by placement.
#[derive(Resource, Deref)]
pub struct VenueData(pub Box<dyn VenueDataSource + Send + Sync>);

/// Host receiver for navigation intents.
#[derive(Resource, Deref)]
pub struct VenueNavigation(pub Box<dyn NavigationSink + Send + Sync>);

/// A selected product or checkout, on its way to the host.
#[derive(Message, Clone, Debug)]
pub struct Navigate(pub NavigationIntent);

pub(super) fn plugin(app: &mut App) {
    app.insert_resource(VenueData(Box::new(DemoCatalogue::builtin())));
    app.insert_resource(VenueNavigation(Box::new(LogNavigationSink)));
    app.add_message::<Navigate>();
    app.add_systems(Update, forward_navigation);
}

fn forward_navigation(mut intents: MessageReader<Navigate>, sink: Res<VenueNavigation>) {
    for Navigate(intent) in intents.read() {
        sink.navigate(intent);
    }
}

/// Logs intents instead of opening pages.
pub struct LogNavigationSink;

impl NavigationSink for LogNavigationSink {
    fn navigate(&self, intent: &NavigationIntent) {
        match serde_json::to_string(intent) {
            Ok(json) => info!("Navigate {json}"),
            Err(e) => warn!("Unserializable intent {intent:?}: {e}"),
        }
    }
}

/// In-memory catalogue shipped with the client.
pub struct DemoCatalogue {
    tenants: Vec<Tenant>,
    products: HashMap<String, Vec<Product>>,
}

const DEMO_SHOPS: [(&str, &str, &[&str]); 5] = [
    ("shop-aurora", "Aurora Lamps", &["Desk Lamp", "Floor Lamp", "Bulb Pack", "Lantern"]),
    ("shop-basil", "Basil & Co", &["Olive Oil", "Pesto", "Tomato Jar"]),
    ("shop-cobalt", "Cobalt Audio", &["Headphones", "Speaker", "Turntable", "Cable", "Amp", "Mic"]),
    ("shop-dune", "Dune Outdoor", &["Tent", "Backpack"]),
    ("shop-ember", "Ember Coffee", &["Espresso", "Filter Roast", "Grinder", "Mug", "Kettle"]),
];

/// Shops shipping pictures under `catalogue/<shop id>/` in the asset folder.
const PICTURED_SHOPS: [&str; 2] = ["shop-aurora", "shop-ember"];

impl DemoCatalogue {
    pub fn builtin() -> Self {
        let mut tenants = Vec::with_capacity(DEMO_SHOPS.len());
        let mut products = HashMap::with_capacity(DEMO_SHOPS.len());
        for (shop, (id, name, titles)) in DEMO_SHOPS.into_iter().enumerate() {
            let pictured = PICTURED_SHOPS.contains(&id);
            tenants.push(Tenant {
                id: id.to_string(),
                name: name.to_string(),
                logo_image_url: pictured.then(|| format!("catalogue/{id}/logo.png")),
            });
            let list = titles
                .iter()
                .enumerate()
                .map(|(i, title)| Product {
                    id: format!("{id}-{i}"),
                    title: Some(title.to_string()),
                    price: Some(Money {
                        amount: 9.5 + (shop * 7 + i * 3) as f64,
                        currency_code: "EUR".to_string(),
                    }),
                    image_url: pictured.then(|| format!("catalogue/{id}/{i}.png")),
                })
                .collect();
            products.insert(id.to_string(), list);
        }
        Self { tenants, products }
    }
}

impl VenueDataSource for DemoCatalogue {
    fn recommended_tenants(&self) -> Vec<Tenant> {
        self.tenants.clone()
    }

    fn products_for_tenant(&self, tenant_id: &str, query: &ProductQuery) -> Option<Vec<Product>> {
        let products = self.products.get(tenant_id)?;
        let matches = |p: &&Product| match (&query.search, &p.title) {
            (Some(search), Some(title)) => title.to_lowercase().contains(&search.to_lowercase()),
            (Some(_), None) => false,
            (None, _) => true,
        };
        Some(
            products
                .iter()
                .filter(matches)
                .take(query.limit)
                .cloned()
                .collect(),
        )
    }
}
