//! HTTP/WebSocket surface for the document processing service.
//!
//! Three endpoints:
//! - `POST /file_parse` — batch parse, inline JSON or zip download
//! - `POST /layout_ocr` — batch layout boxes with character-level data
//! - `GET /layout_ocr/stream` — WebSocket, one event per completed page

mod handlers;
mod routes;

pub use routes::create_router;

use std::net::SocketAddr;
use std::sync::Arc;

use crate::config::Settings;
use crate::engine::remote::RemoteEngine;
use crate::engine::AnalysisEngine;

/// Shared state for the web server.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub engine: Arc<dyn AnalysisEngine>,
}

impl AppState {
    /// Build the production state: remote inference engine per settings.
    pub fn new(settings: Settings) -> Self {
        let engine = Arc::new(RemoteEngine::new(settings.engine_url.clone()));
        Self {
            settings: Arc::new(settings),
            engine,
        }
    }
}

/// Start the web server.
pub async fn serve(settings: Settings, host: &str, port: u16) -> anyhow::Result<()> {
    std::fs::create_dir_all(&settings.output_dir)?;
    let state = AppState::new(settings);
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    tracing::info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use std::io::Read;
    use tempfile::tempdir;
    use tower::ServiceExt;

    use crate::engine::testing::{simple_page, StubEngine};
    use crate::engine::RawBlock;

    const BOUNDARY: &str = "test-boundary-7MA4YWxkTrZu0gW";

    fn multipart_body(parts: &[(&str, Option<&str>, &[u8])]) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, filename, content) in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            match filename {
                Some(filename) => body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                ),
                None => body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                ),
            }
            body.extend_from_slice(content);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn multipart_request(uri: &str, body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn test_app(engine: StubEngine) -> (axum::Router, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let settings = Settings {
            output_dir: dir.path().to_path_buf(),
            ..Settings::default()
        };
        let state = AppState {
            settings: Arc::new(settings),
            engine: Arc::new(engine),
        };
        (create_router(state), dir)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_file_parse_inline_json() {
        let (app, _dir) = test_app(StubEngine::pages(vec![simple_page("hello world")]));

        let body = multipart_body(&[
            ("files", Some("report.pdf"), b"%PDF-1.4"),
            ("lang_list", None, b"en"),
            ("return_md", None, b"true"),
        ]);
        let response = app
            .oneshot(multipart_request("/file_parse", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["backend"], "pipeline");
        assert_eq!(json["version"], crate::VERSION);
        assert!(json["results"]["report"]["md_content"]
            .as_str()
            .unwrap()
            .contains("hello world"));
    }

    #[tokio::test]
    async fn test_file_parse_unsupported_type_is_400() {
        let (app, _dir) = test_app(StubEngine::pages(vec![simple_page("x")]));

        let body = multipart_body(&[("files", Some("notes.docx"), b"PK")]);
        let response = app
            .oneshot(multipart_request("/file_parse", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert!(json["error"].as_str().unwrap().contains("docx"));
    }

    #[tokio::test]
    async fn test_file_parse_no_files_is_400() {
        let (app, _dir) = test_app(StubEngine::pages(vec![simple_page("x")]));

        let body = multipart_body(&[("return_md", None, b"true")]);
        let response = app
            .oneshot(multipart_request("/file_parse", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_file_parse_engine_failure_is_500() {
        let (app, _dir) = test_app(StubEngine::failing("engine down"));

        let body = multipart_body(&[("files", Some("doc.pdf"), b"%PDF")]);
        let response = app
            .oneshot(multipart_request("/file_parse", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert!(json["error"].as_str().unwrap().contains("engine down"));
    }

    #[tokio::test]
    async fn test_file_parse_zip_download() {
        let (app, _dir) = test_app(StubEngine::pages(vec![simple_page("zipped text")]));

        let body = multipart_body(&[
            ("files", Some("Report v1.pdf"), b"%PDF"),
            ("return_md", None, b"true"),
            ("response_format_zip", None, b"true"),
        ]);
        let response = app
            .oneshot(multipart_request("/file_parse", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/zip"
        );

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let reader = std::io::Cursor::new(bytes.to_vec());
        let mut archive = zip::ZipArchive::new(reader).unwrap();
        assert_eq!(archive.len(), 1);
        let mut entry = archive.by_name("Report_v1/Report_v1.md").unwrap();
        let mut content = String::new();
        entry.read_to_string(&mut content).unwrap();
        assert!(content.contains("zipped text"));
    }

    #[tokio::test]
    async fn test_file_parse_cleans_workspace() {
        let (app, dir) = test_app(StubEngine::pages(vec![simple_page("x")]));

        let body = multipart_body(&[
            ("files", Some("doc.pdf"), b"%PDF"),
            ("return_md", None, b"true"),
        ]);
        let response = app
            .oneshot(multipart_request("/file_parse", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_lang_list_recycled_across_documents() {
        // The stub cycles scripted results per document, so three uploads
        // with one language entry must still produce three results.
        let (app, _dir) = test_app(StubEngine::pages(vec![simple_page("x")]));

        let body = multipart_body(&[
            ("files", Some("a.pdf"), b"%PDF"),
            ("files", Some("b.pdf"), b"%PDF"),
            ("files", Some("c.pdf"), b"%PDF"),
            ("lang_list", None, b"ko"),
            ("return_md", None, b"true"),
        ]);
        let response = app
            .oneshot(multipart_request("/file_parse", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        let results = json["results"].as_object().unwrap();
        assert_eq!(results.len(), 3);
        for name in ["a", "b", "c"] {
            assert!(results[name]["md_content"].is_string());
        }
    }

    #[tokio::test]
    async fn test_layout_ocr_returns_pages_with_boxes() {
        let mut page = simple_page("body text");
        page.discarded_blocks.push(RawBlock {
            block_type: "header".to_string(),
            bbox: [0.0, 0.0, 10.0, 10.0],
            lines: page.blocks[0].lines.clone(),
        });
        let (app, _dir) = test_app(StubEngine::pages(vec![page]));

        let body = multipart_body(&[
            ("files", Some("doc.pdf"), b"%PDF"),
            ("include_discarded", None, b"true"),
        ]);
        let response = app
            .oneshot(multipart_request("/layout_ocr", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        let page = &json["results"]["doc"]["pages"][0];
        assert_eq!(page["page_index"], 0);
        assert_eq!(page["layout_boxes"][0]["box_id"], 0);
        assert_eq!(page["discarded_boxes"][0]["box_id"], 1);
        assert_eq!(page["discarded_boxes"][0]["is_discarded"], true);
    }

    #[tokio::test]
    async fn test_layout_ocr_page_window() {
        let (app, _dir) = test_app(StubEngine::pages(vec![
            simple_page("p0"),
            simple_page("p1"),
            simple_page("p2"),
        ]));

        let body = multipart_body(&[
            ("files", Some("doc.pdf"), b"%PDF"),
            ("start_page_id", None, b"1"),
            ("end_page_id", None, b"1"),
        ]);
        let response = app
            .oneshot(multipart_request("/layout_ocr", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        let pages = json["results"]["doc"]["pages"].as_array().unwrap();
        assert_eq!(pages.len(), 1);
        // Reindexed from 0 within the window.
        assert_eq!(pages[0]["page_index"], 0);
    }

    #[tokio::test]
    async fn test_stream_endpoint_requires_upgrade() {
        let (app, _dir) = test_app(StubEngine::pages(vec![simple_page("x")]));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/layout_ocr/stream")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        // Plain GET without the websocket handshake headers is rejected.
        assert_ne!(response.status(), StatusCode::OK);
    }
}
