//! Product records returned by the similarity service, and the product-page
//! payload that travels base64-encoded inside reply button URLs.

use {
    base64::{
        Engine as _,
        engine::general_purpose::{STANDARD, URL_SAFE},
    },
    serde::{Deserialize, Deserializer, Serialize},
};

use crate::error::Result;

/// A single product match from the item-similarity service.
///
/// Field names follow the service's wire format. Unknown fields are kept in
/// `extra` so a product survives the trip through a button URL unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductMatch {
    #[serde(rename = "productid", deserialize_with = "string_or_number")]
    pub product_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub price: f64,
    #[serde(rename = "priceCurrency", default)]
    pub price_currency: String,
    #[serde(rename = "inventoryLevel", default, deserialize_with = "lenient_i64")]
    pub inventory_level: i64,
    #[serde(default)]
    pub image: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub score: f64,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ProductMatch {
    /// Card title, e.g. `HT-1000(0.93)`.
    pub fn card_title(&self) -> String {
        format!("{}({})", self.product_id, self.score)
    }

    /// Price with its currency suffix, e.g. `59.9EUR`.
    pub fn price_label(&self) -> String {
        format!("{}{}", self.price, self.price_currency)
    }
}

/// Scalar as the similarity service may send it.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawScalar {
    Num(serde_json::Number),
    Str(String),
    Other(serde_json::Value),
}

impl RawScalar {
    fn as_f64(&self) -> Option<f64> {
        let value = match self {
            Self::Num(n) => n.as_f64(),
            Self::Str(s) => s.trim().parse().ok(),
            Self::Other(_) => None,
        };
        value.filter(|v: &f64| v.is_finite())
    }
}

fn string_or_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<String, D::Error> {
    match RawScalar::deserialize(deserializer)? {
        RawScalar::Str(s) => Ok(s),
        RawScalar::Num(n) => Ok(n.to_string()),
        RawScalar::Other(v) => Err(serde::de::Error::custom(format!(
            "productid must be a string or number, got {v}"
        ))),
    }
}

/// Number, numeric string or `null`; anything unreadable becomes `0`.
fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<f64, D::Error> {
    Ok(Option::<RawScalar>::deserialize(deserializer)?
        .and_then(|raw| raw.as_f64())
        .unwrap_or_default())
}

/// Like [`lenient_f64`], truncating fractional stock levels.
fn lenient_i64<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<i64, D::Error> {
    let Some(raw) = Option::<RawScalar>::deserialize(deserializer)? else {
        return Ok(0);
    };
    Ok(match &raw {
        RawScalar::Num(n) => n.as_i64(),
        RawScalar::Str(s) => s.trim().parse().ok(),
        RawScalar::Other(_) => None,
    }
    .or_else(|| raw.as_f64().map(|v| v.trunc() as i64))
    .unwrap_or_default())
}

/// Payload of the product detail page: the product the user picked plus the
/// other candidates the similarity service returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductView {
    pub selected_product: ProductMatch,
    #[serde(default)]
    pub similar_products: Vec<ProductMatch>,
}

impl ProductView {
    pub fn single(product: ProductMatch) -> Self {
        Self {
            selected_product: product,
            similar_products: Vec::new(),
        }
    }

    /// Encode as base64(JSON), the form carried in the `data` query parameter.
    pub fn encode(&self) -> Result<String> {
        let json = serde_json::to_vec(self)?;
        Ok(STANDARD.encode(json))
    }

    /// Decode a `data` query parameter.
    ///
    /// Accepts standard and URL-safe alphabets. A `+` that a form decoder
    /// turned into a space is restored first.
    pub fn decode(data: &str) -> Result<Self> {
        let data = data.trim().replace(' ', "+");
        let bytes = match STANDARD.decode(&data) {
            Ok(bytes) => bytes,
            Err(_) => URL_SAFE.decode(&data)?,
        };
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Similar products other than the selected one, in original order.
    pub fn others(&self) -> impl Iterator<Item = &ProductMatch> {
        self.similar_products
            .iter()
            .filter(|p| p.product_id != self.selected_product.product_id)
    }
}
