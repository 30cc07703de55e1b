//! Page-by-page result streaming.
//!
//! The publisher drives the streaming state machine for one job over one
//! connection: `started → analyzing → processing(0..n) → completed`, with
//! `page_error` substituting for a failed page and `error` terminating the
//! stream on any fatal condition. Events are emitted through an [`EventSink`]
//! so the state machine stays independent of the transport; the WebSocket
//! binding lives in the server layer.
//!
//! Analysis is eager (one engine call for all pages); streaming is delivery
//! pacing over an already-complete result set.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::engine::{run_analysis, AnalysisEngine};
use crate::error::JobError;
use crate::format::format_page;
use crate::models::{Document, PageData, ParseMethod};
use crate::workspace::JobWorkspace;

/// One server-to-client event, tagged by `status` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StreamEvent {
    Started {
        message: String,
    },
    Analyzing {
        total_pages: usize,
        message: String,
    },
    Processing {
        page_index: usize,
        total_pages: usize,
        progress: f64,
        data: PageData,
    },
    PageError {
        page_index: usize,
        message: String,
    },
    Completed {
        total_pages: usize,
        message: String,
    },
    Error {
        message: String,
    },
}

/// The receiving side of the stream went away (client disconnect).
///
/// Distinct from a processing failure: the publisher stops emitting and
/// cleans up without reporting an error.
#[derive(Debug)]
pub struct SinkClosed;

/// Transport abstraction for event delivery.
///
/// `send` suspends until the event is accepted, so a slow client naturally
/// paces emission.
#[async_trait]
pub trait EventSink: Send {
    async fn send(&mut self, event: StreamEvent) -> Result<(), SinkClosed>;
}

/// Parameters of one streaming job, as received from the client.
#[derive(Debug, Clone)]
pub struct StreamRequest {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub lang: String,
    pub parse_method: ParseMethod,
    pub include_discarded: bool,
    pub start_page: usize,
    pub end_page: Option<usize>,
}

/// Progress rounded to three decimal places, as the clients expect.
fn round_progress(done: usize, total: usize) -> f64 {
    let raw = done as f64 / total as f64;
    (raw * 1000.0).round() / 1000.0
}

/// Drives the streaming state machine for single-document jobs.
pub struct StreamPublisher<'a> {
    engine: &'a dyn AnalysisEngine,
    settings: &'a Settings,
}

impl<'a> StreamPublisher<'a> {
    pub fn new(engine: &'a dyn AnalysisEngine, settings: &'a Settings) -> Self {
        Self { engine, settings }
    }

    /// Run one streaming job to completion.
    ///
    /// All outcomes are delivered through the sink; a closed sink stops
    /// emission silently. The job workspace is cleaned up on every path.
    pub async fn run(&self, request: StreamRequest, sink: &mut dyn EventSink) {
        let (document, workspace) = match self.prepare(&request) {
            Ok(prepared) => prepared,
            Err(e) => {
                tracing::warn!(error = %e, "streaming job rejected");
                let _ = sink
                    .send(StreamEvent::Error {
                        message: e.to_string(),
                    })
                    .await;
                return;
            }
        };

        let outcome = self.publish(&request, document, &workspace, sink).await;
        workspace.dispose(self.settings.keep_workspaces);

        match outcome {
            Ok(()) => {}
            Err(PublishAbort::SinkClosed) => {
                tracing::info!(job_id = %workspace.id(), "client disconnected, stream stopped");
            }
            Err(PublishAbort::Fatal(e)) => {
                tracing::error!(job_id = %workspace.id(), error = %e, "streaming job failed");
                let _ = sink
                    .send(StreamEvent::Error {
                        message: e.to_string(),
                    })
                    .await;
            }
        }
    }

    fn prepare(&self, request: &StreamRequest) -> Result<(Document, JobWorkspace), JobError> {
        if request.bytes.is_empty() {
            return Err(JobError::BadRequest("no document content".to_string()));
        }
        // Classification failure surfaces before any event or analysis work.
        let document = Document::from_upload(
            &request.filename,
            request.bytes.clone(),
            request.lang.clone(),
        )?;
        let workspace = JobWorkspace::create(&self.settings.output_dir)?;
        Ok((document, workspace))
    }

    async fn publish(
        &self,
        request: &StreamRequest,
        document: Document,
        workspace: &JobWorkspace,
        sink: &mut dyn EventSink,
    ) -> Result<(), PublishAbort> {
        sink.send(StreamEvent::Started {
            message: "Starting layout analysis...".to_string(),
        })
        .await?;

        let documents = vec![document];

        tracing::info!(
            job_id = %workspace.id(),
            filename = %request.filename,
            "running layout analysis"
        );

        let mut results = run_analysis(
            self.engine,
            &documents,
            request.parse_method,
            self.settings.analysis_flags(),
            request.start_page,
            request.end_page,
        )
        .await
        .map_err(PublishAbort::Fatal)?;
        let analysis = results.remove(0);

        let total_pages = analysis.pages.len();
        sink.send(StreamEvent::Analyzing {
            total_pages,
            message: format!("Processing {total_pages} pages..."),
        })
        .await?;

        for (page_index, raw_page) in analysis.pages.iter().enumerate() {
            match format_page(raw_page, page_index, request.include_discarded) {
                Ok(data) => {
                    sink.send(StreamEvent::Processing {
                        page_index,
                        total_pages,
                        progress: round_progress(page_index + 1, total_pages),
                        data,
                    })
                    .await?;
                    tracing::debug!(
                        job_id = %workspace.id(),
                        page = page_index + 1,
                        total = total_pages,
                        "streamed page"
                    );
                }
                Err(e) => {
                    // A single page failure never aborts the stream.
                    tracing::error!(
                        job_id = %workspace.id(),
                        page_index,
                        error = %e,
                        "failed to format page"
                    );
                    sink.send(StreamEvent::PageError {
                        page_index,
                        message: e.to_string(),
                    })
                    .await?;
                }
            }
        }

        sink.send(StreamEvent::Completed {
            total_pages,
            message: "All pages processed successfully".to_string(),
        })
        .await?;

        Ok(())
    }
}

enum PublishAbort {
    SinkClosed,
    Fatal(JobError),
}

impl From<SinkClosed> for PublishAbort {
    fn from(_: SinkClosed) -> Self {
        Self::SinkClosed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::{simple_page, StubEngine};
    use crate::engine::RawPage;
    use tempfile::tempdir;

    /// Collects events; optionally refuses delivery after a limit to
    /// simulate a client disconnect.
    struct VecSink {
        events: Vec<StreamEvent>,
        close_after: Option<usize>,
    }

    impl VecSink {
        fn new() -> Self {
            Self {
                events: Vec::new(),
                close_after: None,
            }
        }

        fn closing_after(n: usize) -> Self {
            Self {
                events: Vec::new(),
                close_after: Some(n),
            }
        }

        fn statuses(&self) -> Vec<&'static str> {
            self.events
                .iter()
                .map(|e| match e {
                    StreamEvent::Started { .. } => "started",
                    StreamEvent::Analyzing { .. } => "analyzing",
                    StreamEvent::Processing { .. } => "processing",
                    StreamEvent::PageError { .. } => "page_error",
                    StreamEvent::Completed { .. } => "completed",
                    StreamEvent::Error { .. } => "error",
                })
                .collect()
        }
    }

    #[async_trait]
    impl EventSink for VecSink {
        async fn send(&mut self, event: StreamEvent) -> Result<(), SinkClosed> {
            if let Some(limit) = self.close_after {
                if self.events.len() >= limit {
                    return Err(SinkClosed);
                }
            }
            self.events.push(event);
            Ok(())
        }
    }

    fn request() -> StreamRequest {
        StreamRequest {
            filename: "doc.pdf".to_string(),
            bytes: vec![0x25, 0x50, 0x44, 0x46],
            lang: "en".to_string(),
            parse_method: ParseMethod::Auto,
            include_discarded: false,
            start_page: 0,
            end_page: None,
        }
    }

    fn settings(dir: &std::path::Path) -> Settings {
        Settings {
            output_dir: dir.to_path_buf(),
            ..Settings::default()
        }
    }

    fn broken_page() -> RawPage {
        RawPage {
            width: 0,
            height: 0,
            blocks: Vec::new(),
            discarded_blocks: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_happy_path_event_sequence() {
        let dir = tempdir().unwrap();
        let engine = StubEngine::pages(vec![
            simple_page("a"),
            simple_page("b"),
            simple_page("c"),
        ]);
        let settings = settings(dir.path());
        let mut sink = VecSink::new();

        StreamPublisher::new(&engine, &settings)
            .run(request(), &mut sink)
            .await;

        assert_eq!(
            sink.statuses(),
            vec!["started", "analyzing", "processing", "processing", "processing", "completed"]
        );

        // Page events are in strictly increasing page_index order with
        // rounded progress.
        let progresses: Vec<(usize, f64)> = sink
            .events
            .iter()
            .filter_map(|e| match e {
                StreamEvent::Processing {
                    page_index,
                    progress,
                    ..
                } => Some((*page_index, *progress)),
                _ => None,
            })
            .collect();
        assert_eq!(progresses, vec![(0, 0.333), (1, 0.667), (2, 1.0)]);

        match &sink.events[1] {
            StreamEvent::Analyzing { total_pages, .. } => assert_eq!(*total_pages, 3),
            other => panic!("expected analyzing, got {other:?}"),
        }
        match sink.events.last().unwrap() {
            StreamEvent::Completed { total_pages, .. } => assert_eq!(*total_pages, 3),
            other => panic!("expected completed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_page_failure_becomes_page_error_and_stream_continues() {
        let dir = tempdir().unwrap();
        let engine = StubEngine::pages(vec![
            simple_page("a"),
            broken_page(),
            simple_page("c"),
        ]);
        let settings = settings(dir.path());
        let mut sink = VecSink::new();

        StreamPublisher::new(&engine, &settings)
            .run(request(), &mut sink)
            .await;

        assert_eq!(
            sink.statuses(),
            vec!["started", "analyzing", "processing", "page_error", "processing", "completed"]
        );
        match &sink.events[3] {
            StreamEvent::PageError { page_index, .. } => assert_eq!(*page_index, 1),
            other => panic!("expected page_error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_engine_failure_yields_error_after_started() {
        let dir = tempdir().unwrap();
        let engine = StubEngine::failing("model not loaded");
        let settings = settings(dir.path());
        let mut sink = VecSink::new();

        StreamPublisher::new(&engine, &settings)
            .run(request(), &mut sink)
            .await;

        assert_eq!(sink.statuses(), vec!["started", "error"]);
    }

    #[tokio::test]
    async fn test_unsupported_file_rejected_before_any_event() {
        let dir = tempdir().unwrap();
        let engine = StubEngine::pages(vec![simple_page("a")]);
        let settings = settings(dir.path());
        let mut sink = VecSink::new();

        let mut req = request();
        req.filename = "doc.docx".to_string();
        StreamPublisher::new(&engine, &settings)
            .run(req, &mut sink)
            .await;

        assert_eq!(sink.statuses(), vec!["error"]);
    }

    #[tokio::test]
    async fn test_disconnect_stops_emission_and_cleans_up() {
        let dir = tempdir().unwrap();
        let engine = StubEngine::pages(vec![simple_page("a"), simple_page("b")]);
        let settings = settings(dir.path());
        // Accept started + analyzing + first page, then hang up.
        let mut sink = VecSink::closing_after(3);

        StreamPublisher::new(&engine, &settings)
            .run(request(), &mut sink)
            .await;

        assert_eq!(sink.statuses(), vec!["started", "analyzing", "processing"]);
        // Workspace removed despite the disconnect.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_workspace_removed_after_success() {
        let dir = tempdir().unwrap();
        let engine = StubEngine::pages(vec![simple_page("a")]);
        let settings = settings(dir.path());
        let mut sink = VecSink::new();

        StreamPublisher::new(&engine, &settings)
            .run(request(), &mut sink)
            .await;

        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_event_wire_format() {
        let event = StreamEvent::PageError {
            page_index: 2,
            message: "bad page".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["status"], "page_error");
        assert_eq!(json["page_index"], 2);
    }

    #[test]
    fn test_progress_rounding() {
        assert_eq!(round_progress(1, 3), 0.333);
        assert_eq!(round_progress(2, 3), 0.667);
        assert_eq!(round_progress(3, 3), 1.0);
        assert_eq!(round_progress(1, 7), 0.143);
    }
}
