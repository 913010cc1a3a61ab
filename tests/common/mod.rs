#![allow(dead_code)]

use axum::{
    Router,
    body::{Body, Bytes},
    http::{HeaderMap, Request, StatusCode},
};
use http_body_util::BodyExt;
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};
use pdf_ocr_backend::config::AppConfig;
use pdf_ocr_backend::services::extractor::LopdfExtractor;
use pdf_ocr_backend::services::ocr::OcrEngine;
use pdf_ocr_backend::services::ocr_service::OcrService;
use pdf_ocr_backend::services::storage::LocalStorageService;
use pdf_ocr_backend::{AppState, create_app};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

pub const BOUNDARY: &str = "---------------------------123456789012345678901234567";
pub const INDEX_HTML: &str = "<!doctype html><div id=\"root\"></div>";

pub struct TestApp {
    pub app: Router,
    pub root: TempDir,
}

impl TestApp {
    pub fn uploads(&self) -> PathBuf {
        self.root.path().join("uploads")
    }

    pub fn processed(&self) -> PathBuf {
        self.root.path().join("processed")
    }
}

/// App wired to temp storage and a fake frontend bundle
pub fn setup_app(engine: Arc<dyn OcrEngine>) -> TestApp {
    setup_app_with(engine, |_| {})
}

/// Like [`setup_app`], with a hook to adjust the config before the router is built
pub fn setup_app_with(
    engine: Arc<dyn OcrEngine>,
    configure: impl FnOnce(&mut AppConfig),
) -> TestApp {
    let _ = tracing_subscriber::fmt::try_init();
    let root = tempfile::tempdir().unwrap();

    let mut config = AppConfig::development();
    config.upload_dir = root.path().join("uploads");
    config.processed_dir = root.path().join("processed");
    config.static_dir = root.path().join("dist");
    configure(&mut config);

    std::fs::create_dir_all(config.static_dir.join("assets")).unwrap();
    std::fs::write(config.static_dir.join("index.html"), INDEX_HTML).unwrap();
    std::fs::write(
        config.static_dir.join("assets").join("app.js"),
        "console.log('app');",
    )
    .unwrap();

    let storage = Arc::new(LocalStorageService::new(
        &config.upload_dir,
        &config.processed_dir,
    ));
    let ocr_service = Arc::new(OcrService::new(
        storage.clone(),
        engine,
        Arc::new(LopdfExtractor),
    ));

    let state = AppState {
        storage,
        ocr_service,
        config,
    };

    TestApp {
        app: create_app(state),
        root,
    }
}

/// One page per entry, each showing its string in Courier
pub fn sample_pdf(pages: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for line in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![72.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal(*line)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "MediaBox" => Object::Array(vec![0.into(), 0.into(), 595.into(), 842.into()]),
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

/// `multipart/form-data` body with a single part. `filename: None` sends a
/// plain form field instead of a file.
pub fn multipart_body(field: &str, filename: Option<&str>, content: &[u8]) -> Vec<u8> {
    let disposition = match filename {
        Some(name) => format!("form-data; name=\"{}\"; filename=\"{}\"", field, name),
        None => format!("form-data; name=\"{}\"", field),
    };

    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: {disposition}\r\nContent-Type: application/pdf\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn upload_request(body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/upload")
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, HeaderMap, Bytes) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, headers, body)
}

pub async fn send_json(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, _, body) = send(app, request).await;
    let json = serde_json::from_slice(&body).unwrap_or_else(|e| {
        panic!(
            "status {} with non-JSON body {:?}: {}",
            status,
            String::from_utf8_lossy(&body),
            e
        )
    });
    (status, json)
}

pub async fn upload(app: &Router, filename: &str, content: &[u8]) -> (StatusCode, Value) {
    send_json(
        app,
        upload_request(multipart_body("file", Some(filename), content)),
    )
    .await
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn dir_is_empty_or_missing(dir: &Path) -> bool {
    match std::fs::read_dir(dir) {
        Ok(mut entries) => entries.next().is_none(),
        Err(_) => true,
    }
}
