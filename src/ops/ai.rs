// ============================================================================
// AI COMPLETION — hands the canvas to a remote inpainting service
// ============================================================================
//
// Requests run on worker threads through an `InpaintBackend`; replies come
// back over a channel and are turned into `CompletionEvent`s by `poll()`,
// so the caller's thread owns all state and never blocks on the network.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

use serde::Deserialize;
use url::Url;
use uuid::Uuid;

use crate::canvas::PixelBuffer;
use crate::settings::AppSettings;

pub const DEFAULT_SERVER_URL: &str = "http://localhost:5000/";

/// Service endpoint a request is sent to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Process,
    Compare,
    Models,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Process => "process",
            Endpoint::Compare => "compare",
            Endpoint::Models => "models",
        }
    }

    /// HTTP method the service expects.
    pub fn method(&self) -> &'static str {
        match self {
            Endpoint::Models => "GET",
            Endpoint::Process | Endpoint::Compare => "POST",
        }
    }
}

/// Parse a server base URL. It must be able to carry an endpoint path.
pub fn parse_server_url(server: &str) -> Result<Url, String> {
    let url = Url::parse(server).map_err(|e| format!("invalid server URL '{}': {}", server, e))?;
    if url.cannot_be_a_base() {
        return Err(format!("server URL '{}' cannot carry an endpoint path", server));
    }
    Ok(url)
}

/// `<server>/<endpoint>?model_id=<key>&postprocess_value=<n>`.
///
/// The endpoint is appended to the server's path and the pairs to its query.
/// An empty key and a zero postprocess value are left out.
pub fn build_request_url(server: &Url, endpoint: Endpoint, model_key: &str, postprocess: u32) -> Url {
    let mut url = server.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty().push(endpoint.path());
    }
    if !model_key.is_empty() || postprocess > 0 {
        let mut query = url.query_pairs_mut();
        if !model_key.is_empty() {
            query.append_pair("model_id", model_key);
        }
        if postprocess > 0 {
            query.append_pair("postprocess_value", &postprocess.to_string());
        }
    }
    url
}

/// Body of `GET /models`.
#[derive(Deserialize)]
struct ModelsReply {
    available_models: Vec<String>,
}

/// Read the model keys out of a `/models` reply.
pub fn parse_models_reply(body: &[u8]) -> Result<Vec<String>, String> {
    serde_json::from_slice::<ModelsReply>(body)
        .map(|reply| reply.available_models)
        .map_err(|e| e.to_string())
}

/// One request to the service.
#[derive(Clone, Debug)]
pub struct CompletionRequest {
    pub id: Uuid,
    pub endpoint: Endpoint,
    pub model_key: String,
    pub postprocess: u32,
    pub url: Url,
    /// PNG bytes of the canvas; empty for `Endpoint::Models`
    pub png: Arc<Vec<u8>>,
}

/// Transport that executes a request and returns the body of the reply
/// (a PNG for process/compare, JSON for the model list).
/// Called on a worker thread.
pub trait InpaintBackend: Send + Sync {
    fn submit(&self, request: &CompletionRequest) -> Result<Vec<u8>, String>;
}

impl<F> InpaintBackend for F
where
    F: Fn(&CompletionRequest) -> Result<Vec<u8>, String> + Send + Sync,
{
    fn submit(&self, request: &CompletionRequest) -> Result<Vec<u8>, String> {
        self(request)
    }
}

/// Result of one image request.
#[derive(Clone, Debug)]
pub struct CompletionOutcome {
    pub id: Uuid,
    pub model_key: String,
    pub success: bool,
    pub image: Option<PixelBuffer>,
    pub message: Option<String>,
}

#[derive(Clone, Debug)]
pub enum CompletionEvent {
    Status(String),
    ModelsInitialized(Vec<String>),
    ImageDataChanged,
    ProcessingStarted { model_key: String },
    ProcessingFinished(CompletionOutcome),
    ComparisonStarted(Vec<String>),
    ComparisonFinished(CompletionOutcome),
    AllComparisonsFinished,
}

struct WorkerReply {
    id: Uuid,
    body: Result<Vec<u8>, String>,
}

/// Client-side state of the completion panel: the submitted image, the
/// in-flight requests and the results received so far.
pub struct CompletionModel {
    server_url: Url,
    backend: Arc<dyn InpaintBackend>,
    sender: Sender<WorkerReply>,
    receiver: Receiver<WorkerReply>,
    events: VecDeque<CompletionEvent>,

    model_keys: Vec<String>,
    /// Empty = first model the server reports
    default_model: String,
    default_postprocess: u32,
    image_data: Option<Arc<Vec<u8>>>,
    preview: Option<PixelBuffer>,
    result: Option<PixelBuffer>,
    comparisons: HashMap<String, PixelBuffer>,

    /// In-flight `/models` fetch
    models_request: Option<Uuid>,
    /// In-flight single `process` request
    current: Option<(Uuid, String)>,
    /// In-flight `compare` requests
    active_comparisons: Vec<(Uuid, String)>,
    total_comparisons: usize,
}

impl CompletionModel {
    pub fn new(server_url: &str, backend: impl InpaintBackend + 'static) -> Result<Self, String> {
        let (sender, receiver) = mpsc::channel();
        Ok(Self {
            server_url: parse_server_url(server_url)?,
            backend: Arc::new(backend),
            sender,
            receiver,
            events: VecDeque::new(),
            model_keys: Vec::new(),
            default_model: String::new(),
            default_postprocess: 0,
            image_data: None,
            preview: None,
            result: None,
            comparisons: HashMap::new(),
            models_request: None,
            current: None,
            active_comparisons: Vec::new(),
            total_comparisons: 0,
        })
    }

    /// Server, preselected model and postprocess value from the settings.
    pub fn from_settings(
        settings: &AppSettings,
        backend: impl InpaintBackend + 'static,
    ) -> Result<Self, String> {
        let mut model = Self::new(&settings.server_url, backend)?;
        model.default_model = settings.default_model.clone();
        model.default_postprocess = settings.postprocess_value;
        Ok(model)
    }

    pub fn server_url(&self) -> &Url {
        &self.server_url
    }

    pub fn set_server_url(&mut self, url: &str) -> Result<(), String> {
        self.server_url = parse_server_url(url)?;
        Ok(())
    }

    /// Replace the model list (keys double as display names).
    pub fn set_models(&mut self, keys: Vec<String>) {
        self.comparisons.clear();
        self.model_keys = keys;
        self.status("Models initialized.");
    }

    pub fn model_keys(&self) -> &[String] {
        &self.model_keys
    }

    /// URL the model list is fetched from.
    pub fn models_url(&self) -> Url {
        build_request_url(&self.server_url, Endpoint::Models, "", 0)
    }

    /// Ask the service for its model list. The reply arrives through `poll()`
    /// as `ModelsInitialized`, or as a `Status` describing the failure.
    pub fn refresh_models(&mut self) -> Uuid {
        let id = self.spawn_request(Endpoint::Models, "", 0, Arc::new(Vec::new()));
        self.models_request = Some(id);
        id
    }

    pub fn is_fetching_models(&self) -> bool {
        self.models_request.is_some()
    }

    /// Model used by `process_default`: the configured one, else the first
    /// model the server reported.
    pub fn selected_model(&self) -> Option<&str> {
        if !self.default_model.is_empty() {
            return Some(self.default_model.as_str());
        }
        self.model_keys.first().map(String::as_str)
    }

    pub fn default_postprocess(&self) -> u32 {
        self.default_postprocess
    }

    /// Set the PNG submitted by the next requests. Clears previous results.
    pub fn set_image_data(&mut self, png: Vec<u8>) {
        self.preview = if png.is_empty() {
            None
        } else {
            crate::io::decode_png(&png).ok()
        };
        self.image_data = if png.is_empty() { None } else { Some(Arc::new(png)) };
        self.result = None;
        self.comparisons.clear();
        self.events.push_back(CompletionEvent::ImageDataChanged);
        self.status("Ready to process");
    }

    /// Encode `canvas` and use it as the image data.
    pub fn set_canvas(&mut self, canvas: &PixelBuffer) {
        match crate::io::encode_png(canvas) {
            Ok(png) => self.set_image_data(png),
            Err(e) => {
                crate::log_err!("Failed to encode canvas for completion: {}", e);
                self.status(&format!("Failed to encode canvas: {}", e));
            }
        }
    }

    pub fn image_data(&self) -> Option<&[u8]> {
        self.image_data.as_deref().map(Vec::as_slice)
    }

    pub fn preview(&self) -> Option<&PixelBuffer> {
        self.preview.as_ref()
    }

    /// Last successful `process` result.
    pub fn result(&self) -> Option<&PixelBuffer> {
        self.result.as_ref()
    }

    pub fn comparison(&self, model_key: &str) -> Option<&PixelBuffer> {
        self.comparisons.get(model_key)
    }

    pub fn is_busy(&self) -> bool {
        self.current.is_some()
    }

    pub fn is_comparing(&self) -> bool {
        !self.active_comparisons.is_empty()
    }

    /// `process` with the selected model and the configured postprocess value.
    pub fn process_default(&mut self) -> Option<Uuid> {
        let Some(key) = self.selected_model().map(str::to_string) else {
            self.status("No model selected.");
            return None;
        };
        self.process(&key, self.default_postprocess)
    }

    /// Submit the image to one model. Refused while another `process` is in flight.
    pub fn process(&mut self, model_key: &str, postprocess: u32) -> Option<Uuid> {
        let Some(png) = self.image_data.clone() else {
            self.status("No image data to process.");
            self.events.push_back(CompletionEvent::ProcessingFinished(CompletionOutcome {
                id: Uuid::nil(),
                model_key: model_key.to_string(),
                success: false,
                image: None,
                message: Some("No image data to process.".to_string()),
            }));
            return None;
        };
        if self.is_busy() {
            self.status("Another process is already running.");
            return None;
        }

        self.events.push_back(CompletionEvent::ProcessingStarted {
            model_key: model_key.to_string(),
        });
        self.status(&format!(
            "Processing with model: {}, Postprocess: {}",
            model_key, postprocess
        ));

        let id = self.spawn_request(Endpoint::Process, model_key, postprocess, png);
        self.current = Some((id, model_key.to_string()));
        Some(id)
    }

    /// Submit the image to several models at once. Any comparison still in
    /// flight is abandoned and its reply ignored.
    pub fn compare(&mut self, models: &[(String, u32)]) -> Vec<Uuid> {
        let Some(png) = self.image_data.clone() else {
            self.status("No image data for comparison.");
            self.events.push_back(CompletionEvent::AllComparisonsFinished);
            return Vec::new();
        };

        self.active_comparisons.clear();
        self.comparisons.clear();

        if models.is_empty() {
            self.status("No models selected for comparison.");
            self.events.push_back(CompletionEvent::AllComparisonsFinished);
            return Vec::new();
        }

        let keys: Vec<String> = models.iter().map(|(k, _)| k.clone()).collect();
        self.events.push_back(CompletionEvent::ComparisonStarted(keys));
        self.total_comparisons = models.len();

        let mut ids = Vec::with_capacity(models.len());
        for (key, postprocess) in models {
            self.status(&format!(
                "Starting comparison for model: {}, Postprocess: {}",
                key, postprocess
            ));
            let id = self.spawn_request(Endpoint::Compare, key, *postprocess, Arc::clone(&png));
            self.active_comparisons.push((id, key.clone()));
            ids.push(id);
        }
        ids
    }

    /// Drain finished replies and return every event raised since the last call.
    pub fn poll(&mut self) -> Vec<CompletionEvent> {
        while let Ok(reply) = self.receiver.try_recv() {
            self.handle_reply(reply);
        }
        self.events.drain(..).collect()
    }

    /// Block until no request is in flight or `timeout` elapses, then `poll()`.
    pub fn wait(&mut self, timeout: Duration) -> Vec<CompletionEvent> {
        let deadline = Instant::now() + timeout;
        while self.is_busy() || self.is_comparing() || self.is_fetching_models() {
            let left = deadline.saturating_duration_since(Instant::now());
            match self.receiver.recv_timeout(left) {
                Ok(reply) => self.handle_reply(reply),
                Err(RecvTimeoutError::Timeout) => break,
                // Unreachable while `self.sender` is alive
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        self.poll()
    }

    fn status(&mut self, message: &str) {
        self.events.push_back(CompletionEvent::Status(message.to_string()));
    }

    fn spawn_request(
        &self,
        endpoint: Endpoint,
        model_key: &str,
        postprocess: u32,
        png: Arc<Vec<u8>>,
    ) -> Uuid {
        let request = CompletionRequest {
            id: Uuid::new_v4(),
            endpoint,
            model_key: model_key.to_string(),
            postprocess,
            url: build_request_url(&self.server_url, endpoint, model_key, postprocess),
            png,
        };
        let id = request.id;
        crate::log_info!("Completion request {} -> {}", id, request.url);

        let backend = Arc::clone(&self.backend);
        let sender = self.sender.clone();
        std::thread::spawn(move || {
            let body = backend.submit(&request);
            // Receiver gone means the model was dropped; nothing to report to.
            let _ = sender.send(WorkerReply { id: request.id, body });
        });
        id
    }

    fn handle_reply(&mut self, reply: WorkerReply) {
        if self.models_request == Some(reply.id) {
            self.models_request = None;
            match reply.body {
                Ok(body) => match parse_models_reply(&body) {
                    Ok(keys) => {
                        crate::log_info!("Model server reports {} model(s)", keys.len());
                        self.set_models(keys.clone());
                        self.events.push_back(CompletionEvent::ModelsInitialized(keys));
                    }
                    Err(e) => {
                        crate::log_warn!("Invalid /models reply: {}", e);
                        self.status("Invalid response from model server.");
                    }
                },
                Err(e) => self.status(&format!("Failed to fetch models: {}", e)),
            }
            return;
        }

        if let Some((id, key)) = self.current.clone()
            && id == reply.id
        {
            self.current = None;
            let outcome = decode_reply(id, &key, reply.body);
            match &outcome.image {
                Some(image) => {
                    self.result = Some(image.clone());
                    self.status(&format!("Image processed successfully with {}.", key));
                }
                None => {
                    self.result = None;
                    if let Some(msg) = outcome.message.clone() {
                        self.status(&msg);
                    }
                }
            }
            crate::log_info!("Completion {} finished (success: {})", id, outcome.success);
            self.events.push_back(CompletionEvent::ProcessingFinished(outcome));
            return;
        }

        let Some(pos) = self.active_comparisons.iter().position(|(id, _)| *id == reply.id) else {
            crate::log_warn!("Ignoring reply for stale completion request {}", reply.id);
            return;
        };
        let (id, key) = self.active_comparisons.remove(pos);
        let outcome = decode_reply(id, &key, reply.body);
        match &outcome.image {
            Some(image) => {
                self.comparisons.insert(key.clone(), image.clone());
                self.status(&format!("Comparison for {} successful.", key));
            }
            None => {
                if let Some(msg) = outcome.message.clone() {
                    self.status(&msg);
                }
            }
        }
        self.events.push_back(CompletionEvent::ComparisonFinished(outcome));

        if self.active_comparisons.is_empty() && self.total_comparisons > 0 {
            self.total_comparisons = 0;
            self.events.push_back(CompletionEvent::AllComparisonsFinished);
        }
    }
}

fn decode_reply(id: Uuid, model_key: &str, body: Result<Vec<u8>, String>) -> CompletionOutcome {
    let (image, message) = match body {
        Ok(bytes) => match crate::io::decode_png(&bytes) {
            Ok(image) => (Some(image), None),
            Err(_) => (
                None,
                Some(format!("Failed to parse image from server response for {}.", model_key)),
            ),
        },
        Err(e) => (None, Some(format!("Processing error for {}: {}", model_key, e))),
    };
    CompletionOutcome {
        id,
        model_key: model_key.to_string(),
        success: image.is_some(),
        image,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{BLACK, WHITE};
    use std::sync::Mutex;

    const WAIT: Duration = Duration::from_secs(10);

    /// Backend that answers with a solid black image of the submitted size.
    fn blackening(request: &CompletionRequest) -> Result<Vec<u8>, String> {
        let input = crate::io::decode_png(&request.png).map_err(|e| e.to_string())?;
        let out = PixelBuffer::filled(input.width(), input.height(), BLACK);
        crate::io::encode_png(&out).map_err(|e| e.to_string())
    }

    fn model_with(backend: impl InpaintBackend + 'static) -> CompletionModel {
        let mut model = CompletionModel::new(DEFAULT_SERVER_URL, backend).unwrap();
        model.set_canvas(&PixelBuffer::new(4, 4));
        model.poll();
        model
    }

    fn url(server: &str, endpoint: Endpoint, key: &str, postprocess: u32) -> String {
        build_request_url(&parse_server_url(server).unwrap(), endpoint, key, postprocess).to_string()
    }

    #[test]
    fn url_building() {
        assert_eq!(
            url("http://localhost:5000/", Endpoint::Process, "lama", 0),
            "http://localhost:5000/process?model_id=lama"
        );
        assert_eq!(
            url("http://h:1", Endpoint::Compare, "a b&c", 3),
            "http://h:1/compare?model_id=a+b%26c&postprocess_value=3"
        );
        assert_eq!(url("http://h/", Endpoint::Models, "", 0), "http://h/models");
    }

    #[test]
    fn url_keeps_base_path_and_query() {
        assert_eq!(
            url("http://h:5000/?token=abc", Endpoint::Process, "m", 0),
            "http://h:5000/process?token=abc&model_id=m"
        );
        assert_eq!(
            url("http://h/api/v1", Endpoint::Compare, "m", 2),
            "http://h/api/v1/compare?model_id=m&postprocess_value=2"
        );
        assert_eq!(url("http://h/api/", Endpoint::Models, "", 0), "http://h/api/models");
    }

    #[test]
    fn bad_server_urls_are_rejected() {
        assert!(parse_server_url("localhost:5000").is_err());
        assert!(parse_server_url("mailto:someone@example.com").is_err());
        assert!(CompletionModel::new("not a url", blackening).is_err());
        let mut model = CompletionModel::new(DEFAULT_SERVER_URL, blackening).unwrap();
        assert!(model.set_server_url("::").is_err());
        assert_eq!(model.server_url().as_str(), DEFAULT_SERVER_URL);
    }

    #[test]
    fn process_without_image_fails() {
        let mut model = CompletionModel::new(DEFAULT_SERVER_URL, blackening).unwrap();
        assert!(model.process("m", 0).is_none());
        let events = model.poll();
        assert!(events.iter().any(|e| matches!(
            e,
            CompletionEvent::ProcessingFinished(o) if !o.success
        )));
    }

    #[test]
    fn process_delivers_result() {
        let mut model = model_with(blackening);
        let id = model.process("m", 0).unwrap();
        assert!(model.is_busy());
        let events = model.wait(WAIT);
        assert!(!model.is_busy());
        let finished = events.iter().find_map(|e| match e {
            CompletionEvent::ProcessingFinished(o) => Some(o.clone()),
            _ => None,
        });
        let outcome = finished.unwrap();
        assert_eq!(outcome.id, id);
        assert!(outcome.success);
        assert_eq!(model.result().unwrap().count_color(BLACK), 16);
    }

    #[test]
    fn second_process_is_refused_while_busy() {
        let gate = Arc::new(Mutex::new(()));
        let held = gate.lock().unwrap();
        let worker_gate = Arc::clone(&gate);
        let mut model = model_with(move |r: &CompletionRequest| {
            let _g = worker_gate.lock().map_err(|e| e.to_string())?;
            blackening(r)
        });

        assert!(model.process("a", 0).is_some());
        assert!(model.process("b", 0).is_none());
        let events = model.poll();
        assert!(events.iter().any(|e| matches!(
            e,
            CompletionEvent::Status(s) if s == "Another process is already running."
        )));

        drop(held);
        model.wait(WAIT);
        assert!(model.result().is_some());
    }

    #[test]
    fn backend_error_is_reported_not_applied() {
        let mut model = model_with(|_: &CompletionRequest| -> Result<Vec<u8>, String> {
            Err("connection refused".to_string())
        });
        model.process("m", 0);
        let events = model.wait(WAIT);
        let outcome = events
            .iter()
            .find_map(|e| match e {
                CompletionEvent::ProcessingFinished(o) => Some(o.clone()),
                _ => None,
            })
            .unwrap();
        assert!(!outcome.success);
        assert!(outcome.message.unwrap().contains("connection refused"));
        assert!(model.result().is_none());
    }

    #[test]
    fn compare_fans_out_and_signals_completion() {
        let mut model = model_with(|r: &CompletionRequest| {
            if r.model_key == "broken" {
                Ok(b"garbage".to_vec())
            } else {
                blackening(r)
            }
        });
        let ids = model.compare(&[
            ("a".to_string(), 0),
            ("b".to_string(), 2),
            ("broken".to_string(), 0),
        ]);
        assert_eq!(ids.len(), 3);

        let events = model.wait(WAIT);
        let finished = events
            .iter()
            .filter(|e| matches!(e, CompletionEvent::ComparisonFinished(_)))
            .count();
        assert_eq!(finished, 3);
        assert!(matches!(events.last(), Some(CompletionEvent::AllComparisonsFinished)));
        assert!(model.comparison("a").is_some());
        assert!(model.comparison("b").is_some());
        assert!(model.comparison("broken").is_none());
    }

    #[test]
    fn compare_with_no_models_finishes_immediately() {
        let mut model = model_with(blackening);
        assert!(model.compare(&[]).is_empty());
        let events = model.poll();
        assert!(matches!(events.last(), Some(CompletionEvent::AllComparisonsFinished)));
    }

    #[test]
    fn requests_carry_the_configured_url() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        let mut model = CompletionModel::new("http://gpu-box:7000", move |r: &CompletionRequest| {
            if let Ok(mut urls) = log.lock() {
                urls.push(r.url.to_string());
            }
            blackening(r)
        })
        .unwrap();
        model.set_canvas(&PixelBuffer::filled(2, 2, WHITE));
        model.process("sd", 1);
        model.wait(WAIT);
        assert_eq!(
            seen.lock().unwrap().as_slice(),
            ["http://gpu-box:7000/process?model_id=sd&postprocess_value=1".to_string()]
        );
    }

    #[test]
    fn new_image_data_clears_results() {
        let mut model = model_with(blackening);
        model.process("m", 0);
        model.wait(WAIT);
        assert!(model.result().is_some());
        model.set_canvas(&PixelBuffer::new(2, 2));
        assert!(model.result().is_none());
        assert_eq!(model.preview().map(|p| p.width()), Some(2));
    }

    #[test]
    fn settings_choose_server_model_and_postprocess() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        let settings = AppSettings {
            server_url: "http://render-node:9000/inpaint/".to_string(),
            default_model: "mat".to_string(),
            postprocess_value: 4,
            ..AppSettings::default()
        };
        let mut model = CompletionModel::from_settings(&settings, move |r: &CompletionRequest| {
            if let Ok(mut urls) = log.lock() {
                urls.push(r.url.to_string());
            }
            blackening(r)
        })
        .unwrap();
        assert_eq!(model.selected_model(), Some("mat"));
        assert_eq!(model.default_postprocess(), 4);

        model.set_canvas(&PixelBuffer::new(2, 2));
        assert!(model.process_default().is_some());
        model.wait(WAIT);
        assert!(model.result().is_some());
        assert_eq!(
            seen.lock().unwrap().as_slice(),
            ["http://render-node:9000/inpaint/process?model_id=mat&postprocess_value=4".to_string()]
        );
    }

    #[test]
    fn process_default_falls_back_to_first_model() {
        let mut model = model_with(blackening);
        assert!(model.process_default().is_none());
        assert!(model.poll().iter().any(|e| matches!(
            e,
            CompletionEvent::Status(s) if s == "No model selected."
        )));

        model.set_models(vec!["lama".to_string(), "mat".to_string()]);
        assert_eq!(model.selected_model(), Some("lama"));
        assert!(model.process_default().is_some());
        let events = model.wait(WAIT);
        assert!(events.iter().any(|e| matches!(
            e,
            CompletionEvent::ProcessingFinished(o) if o.model_key == "lama" && o.success
        )));
    }

    #[test]
    fn refresh_models_reads_the_model_list() {
        let mut model = CompletionModel::new(
            "http://h:5000/",
            |r: &CompletionRequest| -> Result<Vec<u8>, String> {
                let expected = r.endpoint.method() == "GET" && r.url.as_str() == "http://h:5000/models";
                if !expected || !r.png.is_empty() {
                    return Err(format!("unexpected request {}", r.url));
                }
                Ok(br#"{"available_models": ["lama", "mat", "sd15"]}"#.to_vec())
            },
        )
        .unwrap();
        model.refresh_models();
        assert!(model.is_fetching_models());
        let events = model.wait(WAIT);
        assert!(!model.is_fetching_models());
        assert_eq!(model.model_keys(), ["lama", "mat", "sd15"]);
        assert!(events.iter().any(|e| matches!(
            e,
            CompletionEvent::ModelsInitialized(keys) if keys.len() == 3
        )));
        assert_eq!(model.models_url().as_str(), "http://h:5000/models");
    }

    #[test]
    fn malformed_model_list_keeps_old_models() {
        let mut model = CompletionModel::new(
            DEFAULT_SERVER_URL,
            |_: &CompletionRequest| -> Result<Vec<u8>, String> { Ok(br#"{"models": "lama"}"#.to_vec()) },
        )
        .unwrap();
        model.set_models(vec!["old".to_string()]);
        model.poll();
        model.refresh_models();
        let events = model.wait(WAIT);
        assert_eq!(model.model_keys(), ["old"]);
        assert!(events.iter().any(|e| matches!(
            e,
            CompletionEvent::Status(s) if s == "Invalid response from model server."
        )));
        assert!(!events.iter().any(|e| matches!(e, CompletionEvent::ModelsInitialized(_))));
    }

    #[test]
    fn unreachable_model_server_is_reported() {
        let mut model = CompletionModel::new(
            DEFAULT_SERVER_URL,
            |_: &CompletionRequest| -> Result<Vec<u8>, String> { Err("connection refused".to_string()) },
        )
        .unwrap();
        model.refresh_models();
        let events = model.wait(WAIT);
        assert!(events.iter().any(|e| matches!(
            e,
            CompletionEvent::Status(s) if s == "Failed to fetch models: connection refused"
        )));
        assert!(model.model_keys().is_empty());
    }
}
