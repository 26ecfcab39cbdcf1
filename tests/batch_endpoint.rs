mod common;

use axum::http::StatusCode;
use axum_test::TestServer;
use common::{Call, RecordingPlatform, app_state, product};
use serde_json::{Value, json};
use shopmark::{create_app_with, shopify::Collection};
use std::sync::Arc;

fn server(platform: Arc<RecordingPlatform>) -> TestServer {
    TestServer::new(create_app_with(app_state(platform))).unwrap()
}

#[tokio::test]
async fn test_product_with_two_images_is_replaced() {
    let platform = Arc::new(RecordingPlatform::new(vec![product(
        1,
        &["https://cdn.example.com/front.jpg", "https://cdn.example.com/back.jpg"],
    )]));
    let server = server(platform.clone());

    let response = server.get("/api/watermark").await;
    response.assert_status_ok();
    let body: Value = response.json();

    assert_eq!(body["status"], "completed");
    assert_eq!(body["processedCount"], 1);
    assert_eq!(body["hasNextPage"], false);
    assert!(body.get("next").is_none());

    let calls = platform.calls();
    let creates: Vec<usize> = calls
        .iter()
        .enumerate()
        .filter(|(_, c)| matches!(c, Call::Create { .. }))
        .map(|(i, _)| i)
        .collect();
    assert_eq!(creates.len(), 2);

    let deletes: Vec<(usize, &Call)> = calls
        .iter()
        .enumerate()
        .filter(|(_, c)| matches!(c, Call::Delete { .. }))
        .collect();
    assert_eq!(deletes.len(), 1);
    assert!(deletes[0].0 > creates[1]);
    assert_eq!(
        deletes[0].1,
        &Call::Delete {
            product_id: "gid://shopify/Product/1".to_string(),
            media_ids: vec![
                "gid://shopify/MediaImage/100".to_string(),
                "gid://shopify/MediaImage/101".to_string(),
            ],
        }
    );
    assert!(calls.contains(&Call::Create {
        product_id: "gid://shopify/Product/1".to_string(),
        alt: "Poster 1 - Watermarked".to_string(),
    }));
    assert!(calls.contains(&Call::Upload(
        "watermarked_gid:__shopify_Product_1_0.jpg".to_string()
    )));
}

#[tokio::test]
async fn test_already_watermarked_product_is_counted_untouched() {
    let platform = Arc::new(RecordingPlatform::new(vec![
        product(1, &["https://cdn.example.com/watermarked_gid:__shopify_Product_1_0.jpg"]),
        product(2, &["https://cdn.example.com/raw.jpg"]),
    ]));
    let server = server(platform.clone());

    let response = server.get("/api/watermark").await;
    let body: Value = response.json();

    assert_eq!(body["status"], "in_progress");
    assert_eq!(body["processedCount"], 1);
    assert_eq!(body["products"][0]["skipped"], 1);
    assert_eq!(body["products"][0]["uploaded"], 0);
    assert_eq!(platform.count(|c| matches!(c, Call::Fetch(_))), 0);
    assert_eq!(platform.count(|c| matches!(c, Call::Upload(_))), 0);
    assert_eq!(platform.count(|c| matches!(c, Call::Delete { .. })), 0);
}

#[tokio::test]
async fn test_failed_fetch_reports_error_without_mutation() {
    let mut catalog = RecordingPlatform::new(vec![product(1, &["https://cdn.example.com/gone.jpg"])]);
    catalog.images.clear();
    let platform = Arc::new(catalog);
    let server = server(platform.clone());

    let response = server
        .get("/api/watermark")
        .add_query_param("processedCount", 4)
        .await;
    response.assert_status_ok();
    let body: Value = response.json();

    assert_eq!(body["status"], "error");
    assert_eq!(body["processedCount"], 4);
    assert_eq!(body["failures"][0]["productId"], "gid://shopify/Product/1");
    assert_eq!(body["failures"][0]["images"][0]["index"], 0);
    assert!(
        body["failures"][0]["images"][0]["reason"]
            .as_str()
            .unwrap()
            .contains("404")
    );
    assert_eq!(platform.count(|c| matches!(c, Call::Stage(_))), 0);
    assert_eq!(platform.count(|c| matches!(c, Call::Delete { .. })), 0);
}

#[tokio::test]
async fn test_following_next_walks_the_catalog_once() {
    let platform = Arc::new(RecordingPlatform::new(vec![
        product(1, &["https://cdn.example.com/1.jpg"]),
        product(2, &["https://cdn.example.com/2.jpg"]),
        product(3, &["https://cdn.example.com/3.jpg"]),
    ]));
    let server = server(platform.clone());

    let mut response: Value = server
        .get("/api/watermark")
        .add_query_param("text", "SAMPLE")
        .add_query_param("fontSize", 20)
        .await
        .json();
    let mut counts = vec![response["processedCount"].as_u64().unwrap()];

    while let Some(next) = response["next"].as_str() {
        let (path, query) = next.split_once('?').unwrap();
        assert!(query.contains("text=SAMPLE"));
        assert!(query.contains("fontSize=20"));
        response = server.get(path).add_raw_query_param(query).await.json();
        counts.push(response["processedCount"].as_u64().unwrap());
    }

    assert_eq!(counts, vec![1, 2, 3]);
    assert_eq!(response["status"], "completed");
    assert_eq!(platform.count(|c| matches!(c, Call::Delete { .. })), 3);
    assert_eq!(
        platform.count(|c| matches!(c, Call::Fetch(url) if url.ends_with("/1.jpg"))),
        1
    );
}

#[tokio::test]
async fn test_collection_scoped_batch() {
    let mut catalog = RecordingPlatform::new(vec![
        product(1, &["https://cdn.example.com/1.jpg"]),
        product(2, &["https://cdn.example.com/2.jpg"]),
    ]);
    catalog.collections.push((
        Collection {
            id: "gid://shopify/Collection/7".to_string(),
            title: "Prints".to_string(),
        },
        vec!["gid://shopify/Product/2".to_string()],
    ));
    let platform = Arc::new(catalog);
    let server = server(platform.clone());

    let body: Value = server
        .get("/api/watermark")
        .add_query_param("collectionIds", "gid://shopify/Collection/7")
        .await
        .json();

    assert_eq!(body["status"], "completed");
    assert_eq!(body["products"][0]["productId"], "gid://shopify/Product/2");

    let missing: Value = server
        .get("/api/watermark")
        .add_query_param("collectionIds", "gid://shopify/Collection/404")
        .add_query_param("processedCount", 2)
        .await
        .json();
    assert_eq!(missing["status"], "error");
    assert_eq!(missing["processedCount"], 2);
    assert!(missing.get("next").is_none());
}

#[tokio::test]
async fn test_invalid_parameters_are_rejected() {
    let platform = Arc::new(RecordingPlatform::new(vec![product(1, &["https://cdn.example.com/1.jpg"])]));
    let server = server(platform.clone());

    for (key, value) in [("opacity", "2"), ("color", "teal"), ("fontSize", "big"), ("text", "")] {
        let response = server.get("/api/watermark").add_query_param(key, value).await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST, "{key}={value}");
        let body: Value = response.json();
        assert_eq!(body["status"], "error");
    }
    assert!(platform.calls().is_empty());
}

#[tokio::test]
async fn test_rejected_parameters_echo_progress() {
    let platform = Arc::new(RecordingPlatform::new(vec![product(1, &["https://cdn.example.com/1.jpg"])]));
    let server = server(platform.clone());

    let response = server
        .get("/api/watermark")
        .add_query_param("processedCount", 6)
        .add_query_param("opacity", 2)
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["status"], "error");
    assert_eq!(body["processedCount"], 6);
    assert!(body.get("next").is_none());
    assert!(platform.calls().is_empty());
}

#[tokio::test]
async fn test_collections_listing() {
    let mut catalog = RecordingPlatform::default();
    catalog.collections.push((
        Collection {
            id: "gid://shopify/Collection/1".to_string(),
            title: "Frontpage".to_string(),
        },
        Vec::new(),
    ));
    let server = server(Arc::new(catalog));

    let response = server.get("/api/collections").await;
    response.assert_status_ok();
    response.assert_json(&json!({
        "collections": [{ "id": "gid://shopify/Collection/1", "title": "Frontpage" }]
    }));
}

#[tokio::test]
async fn test_single_product_endpoint() {
    let platform = Arc::new(RecordingPlatform::new(vec![product(
        9,
        &["https://cdn.example.com/9.jpg"],
    )]));
    let server = server(platform.clone());

    let response = server
        .post("/api/products/watermark")
        .json(&json!({ "productId": "gid://shopify/Product/9", "text": "PROOF", "opacity": 0.4 }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["report"]["uploaded"], 1);
    assert_eq!(body["report"]["deleted"], 1);

    let missing = server
        .post("/api/products/watermark")
        .json(&json!({ "productId": "gid://shopify/Product/404" }))
        .await;
    missing.assert_status_not_found();
    assert_eq!(missing.json::<Value>()["success"], false);
}
