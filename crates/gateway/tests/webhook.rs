//! Integration tests for the webhook routes and webview pages against a real
//! listener.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use {
    async_trait::async_trait,
    marketbot_common::{ProductMatch, ProductView},
    marketbot_config::BotConfig,
    marketbot_gateway::{AppState, build_app, pages::MISSING_DATA, webhook::EVENT_RECEIVED},
    marketbot_messenger::{ReplyPayload, Responder},
    secrecy::Secret,
    serde_json::json,
    tokio::{
        net::TcpListener,
        sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel},
    },
};

const VERIFY_TOKEN: &str = "s3cret-verify";

struct ChannelResponder {
    tx: UnboundedSender<(String, ReplyPayload)>,
}

#[async_trait]
impl Responder for ChannelResponder {
    async fn send(&self, recipient: &str, payload: &ReplyPayload) -> marketbot_messenger::Result<()> {
        let _ = self.tx.send((recipient.to_string(), payload.clone()));
        Ok(())
    }
}

fn test_config() -> BotConfig {
    let mut config = BotConfig::default();
    config.messenger.verify_token = Secret::new(VERIFY_TOKEN.to_string());
    config.messenger.page_access_token = Secret::new("EAAG-test".to_string());
    config
}

/// Start a server on an ephemeral port; replies land on the returned channel.
async fn start_server(
    config: BotConfig,
) -> (SocketAddr, AppState, UnboundedReceiver<(String, ReplyPayload)>) {
    let (tx, rx) = unbounded_channel();
    let state =
        AppState::with_responder(config, reqwest::Client::new(), Arc::new(ChannelResponder { tx }));
    let app = build_app(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, state, rx)
}

fn product(id: &str) -> ProductMatch {
    serde_json::from_value(json!({
        "productid": id,
        "name": format!("Boot {id}"),
        "price": 42.5,
        "priceCurrency": "EUR",
        "inventoryLevel": 3,
        "image": format!("https://img.example.com/{id}.jpg"),
        "score": 0.8,
    }))
    .unwrap()
}

#[tokio::test]
async fn verify_handshake_echoes_challenge() {
    let (addr, _, _rx) = start_server(test_config()).await;
    let resp = reqwest::get(format!(
        "http://{addr}/webhook?hub.mode=subscribe&hub.verify_token={VERIFY_TOKEN}&hub.challenge=CHALLENGE_ACCEPTED"
    ))
    .await
    .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "CHALLENGE_ACCEPTED");
}

#[tokio::test]
async fn verify_handshake_refuses_wrong_or_missing_params() {
    let (addr, _, _rx) = start_server(test_config()).await;
    for query in [
        "hub.mode=subscribe&hub.verify_token=nope&hub.challenge=1",
        "hub.mode=unsubscribe&hub.verify_token=s3cret-verify&hub.challenge=1",
        "hub.mode=subscribe&hub.challenge=1",
        "",
    ] {
        let resp = reqwest::get(format!("http://{addr}/webhook?{query}"))
            .await
            .unwrap();
        assert_eq!(resp.status(), 403, "query: {query}");
    }
}

#[tokio::test]
async fn page_event_is_acknowledged_and_dispatched() {
    let (addr, state, mut rx) = start_server(test_config()).await;
    let resp = reqwest::Client::new()
        .post(format!("http://{addr}/webhook"))
        .json(&json!({
            "object": "page",
            "entry": [{
                "id": "PAGE",
                "time": 1,
                "messaging": [
                    { "sender": { "id": "USER_1" }, "message": { "text": "hi" } },
                    { "sender": { "id": "USER_1" }, "message": { "text": "bye" } }
                ]
            }]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), EVENT_RECEIVED);

    let (recipient, reply) = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(recipient, "USER_1");
    assert_eq!(reply.as_text(), Some(state.config.replies.welcome.as_str()));

    // Only the first event of an entry is handled.
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(rx.try_recv().is_err());

    assert_eq!(state.links.get(), Some(format!("https://{addr}").as_str()));
}

#[tokio::test]
async fn non_page_object_is_not_found() {
    let (addr, _, mut rx) = start_server(test_config()).await;
    let resp = reqwest::Client::new()
        .post(format!("http://{addr}/webhook"))
        .json(&json!({
            "object": "instagram",
            "entry": [{ "messaging": [{ "sender": { "id": "U" }, "message": { "text": "hi" } }] }]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn products_page_lists_others_but_not_the_selected_one() {
    let (addr, _, _rx) = start_server(test_config()).await;
    let view = ProductView {
        selected_product: product("HT-1"),
        similar_products: vec![product("HT-1"), product("HT-2"), product("HT-3")],
    };
    let data = urlencoding::encode(&view.encode().unwrap()).into_owned();

    let resp = reqwest::get(format!("http://{addr}/web/Products?data={data}"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let html = resp.text().await.unwrap();
    assert_eq!(html.matches(r#"data-product-id="HT-1""#).count(), 1);
    assert!(html.contains(r#"data-product-id="HT-2""#));
    assert!(html.contains(r#"data-product-id="HT-3""#));
    assert!(html.contains("42.5EUR"));
}

#[tokio::test]
async fn products_page_rejects_missing_or_bad_data() {
    let (addr, _, _rx) = start_server(test_config()).await;

    let resp = reqwest::get(format!("http://{addr}/web/Products"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 500);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"], MISSING_DATA);

    let resp = reqwest::get(format!("http://{addr}/web/Products?data=%25%25not-base64"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn menu_pages_render() {
    let mut config = test_config();
    config.store.address = "Rua Augusta 100".into();
    let (addr, _, _rx) = start_server(config).await;

    let store = reqwest::get(format!("http://{addr}/web/Store"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(store.contains("Rua Augusta 100"));
    assert!(store.contains("-37.8136,144.9631"));

    let cart = reqwest::get(format!("http://{addr}/web/ShoppingCart"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(cart.contains("HT-1000"));

    for page in ["DeliverySetting", "PaymentSetting"] {
        let resp = reqwest::get(format!("http://{addr}/web/{page}"))
            .await
            .unwrap();
        assert_eq!(resp.status(), 200, "page: {page}");
    }
}

#[tokio::test]
async fn static_assets_are_served_next_to_pages() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("style.css"), "body { margin: 0 }").unwrap();
    let mut config = test_config();
    config.web.static_dir = Some(dir.path().to_path_buf());
    let (addr, _, _rx) = start_server(config).await;

    let css = reqwest::get(format!("http://{addr}/web/style.css"))
        .await
        .unwrap();
    assert_eq!(css.status(), 200);
    assert_eq!(css.text().await.unwrap(), "body { margin: 0 }");

    let store = reqwest::get(format!("http://{addr}/web/Store"))
        .await
        .unwrap();
    assert_eq!(store.status(), 200);
}

#[tokio::test]
async fn health_reports_version() {
    let (addr, _, _rx) = start_server(test_config()).await;
    let body: serde_json::Value = reqwest::get(format!("http://{addr}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}
