//! Demo shopping cart shown for the `ShowCart` intent and on the cart page.
//! There is no cart backend; the contents are fixed.

use marketbot_common::ProductMatch;

fn item(id: &str, name: &str, price: f64, stock: i64, image: &str) -> ProductMatch {
    ProductMatch {
        product_id: id.to_string(),
        name: name.to_string(),
        price,
        price_currency: "USD".to_string(),
        inventory_level: stock,
        image: image.to_string(),
        score: 1.0,
        extra: serde_json::Map::new(),
    }
}

pub fn demo_cart() -> Vec<ProductMatch> {
    vec![
        item(
            "HT-1000",
            "Trail Runner Pro",
            89.9,
            12,
            "https://images.example.com/products/ht-1000.jpg",
        ),
        item(
            "HT-1010",
            "City Walker Leather",
            129.0,
            5,
            "https://images.example.com/products/ht-1010.jpg",
        ),
        item(
            "HT-1022",
            "Court Classic Low",
            64.5,
            30,
            "https://images.example.com/products/ht-1022.jpg",
        ),
    ]
}
