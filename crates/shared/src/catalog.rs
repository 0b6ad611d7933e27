//! Static flower-shop catalog. Prices are in minor units of USD.

use serde::Serialize;

use crate::domain::ProductId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Product {
    pub id: &'static str,
    pub title: &'static str,
    pub price: i64,
    pub image_url: Option<&'static str>,
}

impl Product {
    pub fn product_id(&self) -> ProductId {
        ProductId::new(self.id)
    }
}

pub const PRODUCTS: &[Product] = &[
    Product {
        id: "bouquet_roses",
        title: "Bouquet of Red Roses",
        price: 3500,
        image_url: None,
    },
    Product {
        id: "pot_ceramic",
        title: "Ceramic Pot",
        price: 1500,
        image_url: None,
    },
    Product {
        id: "bouquet_sunflowers",
        title: "Sunflower Bundle",
        price: 2500,
        image_url: None,
    },
    Product {
        id: "bouquet_tulips",
        title: "Spring Tulips",
        price: 3000,
        image_url: None,
    },
    Product {
        id: "orchid_white",
        title: "White Orchid",
        price: 4500,
        image_url: None,
    },
    Product {
        id: "gardenias",
        title: "Gardenias",
        price: 2000,
        image_url: None,
    },
];

/// Codes the demo merchant is seeded with. Validity is decided server-side.
pub const DEMO_DISCOUNT_CODES: &[&str] = &["10OFF", "WELCOME20", "FIXED500"];

pub fn find_product(id: &str) -> Option<&'static Product> {
    PRODUCTS.iter().find(|p| p.id == id)
}
