//! Server-rendered webview pages opened from reply buttons and the persistent
//! menu.

use {
    askama::Template,
    axum::{
        Json,
        extract::{Query, State},
        http::StatusCode,
        response::{Html, IntoResponse, Response},
    },
    marketbot_assistant::cart::demo_cart,
    marketbot_common::{ProductMatch, ProductView},
    serde::Deserialize,
    tracing::warn,
};

use crate::state::AppState;

pub const MISSING_DATA: &str = "No data passed in the URL parameters";

// ── Askama template structs ──────────────────────────────────────────────────

#[derive(Template)]
#[template(path = "products.html")]
struct ProductsTemplate<'a> {
    selected: &'a ProductMatch,
    similar: Vec<&'a ProductMatch>,
}

#[derive(Template)]
#[template(path = "store.html")]
struct StoreTemplate<'a> {
    latitude: f64,
    longitude: f64,
    address: &'a str,
}

#[derive(Template)]
#[template(path = "cart.html")]
struct CartTemplate<'a> {
    products: &'a [ProductMatch],
}

#[derive(Template)]
#[template(path = "delivery.html")]
struct DeliveryTemplate;

#[derive(Template)]
#[template(path = "payment.html")]
struct PaymentTemplate;

// ── Handlers ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ProductsQuery {
    data: Option<String>,
}

pub async fn products_handler(Query(query): Query<ProductsQuery>) -> Response {
    let Some(data) = query.data.filter(|d| !d.is_empty()) else {
        return json_error(StatusCode::INTERNAL_SERVER_ERROR, MISSING_DATA);
    };
    let view = match ProductView::decode(&data) {
        Ok(view) => view,
        Err(e) => {
            warn!(error = %e, "undecodable product page data");
            return json_error(StatusCode::BAD_REQUEST, &format!("invalid data: {e}"));
        },
    };
    render(ProductsTemplate {
        selected: &view.selected_product,
        similar: view.others().collect(),
    })
}

pub async fn store_handler(State(state): State<AppState>) -> Response {
    let store = &state.config.store;
    render(StoreTemplate {
        latitude: store.latitude,
        longitude: store.longitude,
        address: &store.address,
    })
}

pub async fn cart_handler() -> Response {
    render(CartTemplate {
        products: &demo_cart(),
    })
}

pub async fn delivery_handler() -> Response {
    render(DeliveryTemplate)
}

pub async fn payment_handler() -> Response {
    render(PaymentTemplate)
}

fn render(template: impl Template) -> Response {
    match template.render() {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            warn!(error = %e, "failed to render page");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        },
    }
}

fn json_error(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}
