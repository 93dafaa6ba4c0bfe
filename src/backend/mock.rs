/*!
 * Scripted in-memory backend.
 *
 * Used by the test suite to drive workflows without a server. Status endpoints
 * replay a queue of scripted responses; the last one repeats once the queue
 * is down to a single entry. Every call is recorded so tests can assert on
 * the exact sequence of requests.
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use super::Backend;
use super::models::{
    ContentRequest, ContentSummary, ImageRecord, Keyword, KeywordDetail, SavedTitle, Subtopic,
    TitleGenerationAck,
};
use crate::errors::BackendError;
use crate::polling::{JobStatus, StatusRecord};

type StatusScript = VecDeque<Result<StatusRecord, BackendError>>;

struct MockState {
    keywords: Vec<Keyword>,
    keyword_details: HashMap<String, KeywordDetail>,
    contents: Vec<ContentSummary>,
    research_script: StatusScript,
    content_script: StatusScript,
    title_script: StatusScript,
    title_ack: Result<TitleGenerationAck, BackendError>,
    saved_titles: Vec<SavedTitle>,
    images: Vec<ImageRecord>,
    image_response: Value,
    image_delay: Option<Duration>,
    /// Remaining list calls that should fail
    failing_loads: usize,
    load_error: BackendError,
    /// Fails every `GET /contents` when set
    contents_error: Option<BackendError>,
    calls: Vec<String>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            keywords: Vec::new(),
            keyword_details: HashMap::new(),
            contents: Vec::new(),
            research_script: VecDeque::new(),
            content_script: VecDeque::new(),
            title_script: VecDeque::new(),
            title_ack: Ok(TitleGenerationAck {
                status: Some("processing".to_string()),
                ..TitleGenerationAck::default()
            }),
            saved_titles: Vec::new(),
            images: Vec::new(),
            image_response: json!({ "status": "success" }),
            image_delay: None,
            failing_loads: 0,
            load_error: BackendError::ApiError {
                status_code: 503,
                message: "Service Unavailable".to_string(),
            },
            contents_error: None,
            calls: Vec::new(),
        }
    }
}

/// Pop the next scripted status; the final entry is sticky
fn next_status(script: &mut StatusScript) -> Result<StatusRecord, BackendError> {
    if script.len() > 1 {
        if let Some(next) = script.pop_front() {
            return next;
        }
    }
    script
        .front()
        .cloned()
        .unwrap_or_else(|| Ok(StatusRecord::with_status(JobStatus::Processing)))
}

/// In-memory backend with scripted responses
#[derive(Default)]
pub struct MockBackend {
    state: Mutex<MockState>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_keywords(self, keywords: Vec<Keyword>) -> Self {
        self.state.lock().keywords = keywords;
        self
    }

    pub fn with_keyword_detail(self, keyword_id: &str, subtopics: &[&str]) -> Self {
        {
            let mut state = self.state.lock();
            let keyword = state
                .keywords
                .iter()
                .find(|k| k.id == keyword_id)
                .map(|k| k.keyword.clone())
                .unwrap_or_default();
            state.keyword_details.insert(
                keyword_id.to_string(),
                KeywordDetail {
                    id: keyword_id.to_string(),
                    keyword,
                    subtopics: subtopics.iter().map(|s| Subtopic::Title(s.to_string())).collect(),
                },
            );
        }
        self
    }

    pub fn with_contents(self, contents: Vec<ContentSummary>) -> Self {
        self.state.lock().contents = contents;
        self
    }

    /// Script `GET /research/{k}/status` responses
    pub fn with_research_statuses(self, statuses: Vec<Result<StatusRecord, BackendError>>) -> Self {
        self.state.lock().research_script = statuses.into();
        self
    }

    /// Script `GET /content/{k}/status` responses
    pub fn with_content_statuses(self, statuses: Vec<Result<StatusRecord, BackendError>>) -> Self {
        self.state.lock().content_script = statuses.into();
        self
    }

    /// Script `GET /titles/status/{id}` responses
    pub fn with_title_statuses(self, statuses: Vec<Result<StatusRecord, BackendError>>) -> Self {
        self.state.lock().title_script = statuses.into();
        self
    }

    pub fn with_title_ack(self, ack: Result<TitleGenerationAck, BackendError>) -> Self {
        self.state.lock().title_ack = ack;
        self
    }

    pub fn with_saved_titles(self, titles: Vec<SavedTitle>) -> Self {
        self.state.lock().saved_titles = titles;
        self
    }

    pub fn with_images(self, images: Vec<ImageRecord>) -> Self {
        self.state.lock().images = images;
        self
    }

    /// Body returned by both image generation endpoints
    pub fn with_image_response(self, response: Value) -> Self {
        self.state.lock().image_response = response;
        self
    }

    /// Delay image generation responses
    pub fn with_image_delay(self, delay: Duration) -> Self {
        self.state.lock().image_delay = Some(delay);
        self
    }

    /// Make the next `count` list calls fail with `error`
    pub fn with_failing_loads(self, count: usize, error: BackendError) -> Self {
        {
            let mut state = self.state.lock();
            state.failing_loads = count;
            state.load_error = error;
        }
        self
    }

    /// Make every content list call fail with `error`
    pub fn with_failing_contents(self, error: BackendError) -> Self {
        self.state.lock().contents_error = Some(error);
        self
    }

    /// Every call made so far, as `"METHOD path"`
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    /// Number of calls whose description starts with `prefix`
    pub fn call_count(&self, prefix: &str) -> usize {
        self.state.lock().calls.iter().filter(|c| c.starts_with(prefix)).count()
    }

    fn record(&self, call: String) {
        self.state.lock().calls.push(call);
    }

    fn check_load(&self) -> Result<(), BackendError> {
        let mut state = self.state.lock();
        if state.failing_loads > 0 {
            state.failing_loads -= 1;
            return Err(state.load_error.clone());
        }
        Ok(())
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn list_keywords(&self) -> Result<Vec<Keyword>, BackendError> {
        self.record("GET /keywords".to_string());
        self.check_load()?;
        Ok(self.state.lock().keywords.clone())
    }

    async fn get_keyword(&self, keyword_id: &str) -> Result<KeywordDetail, BackendError> {
        self.record(format!("GET /keywords/{}", keyword_id));
        self.state
            .lock()
            .keyword_details
            .get(keyword_id)
            .cloned()
            .ok_or_else(|| BackendError::ApiError {
                status_code: 404,
                message: json!({ "error": "keyword not found" }).to_string(),
            })
    }

    async fn list_contents(&self, keyword_id: Option<&str>) -> Result<Vec<ContentSummary>, BackendError> {
        match keyword_id {
            Some(id) => self.record(format!("GET /contents?keyword={}", id)),
            None => self.record("GET /contents".to_string()),
        }
        self.check_load()?;
        if let Some(error) = self.state.lock().contents_error.clone() {
            return Err(error);
        }

        let contents = self.state.lock().contents.clone();
        Ok(match keyword_id {
            Some(id) => contents
                .into_iter()
                .filter(|c| match &c.keyword {
                    Some(Value::String(k)) => k == id,
                    Some(Value::Number(n)) => n.to_string() == id,
                    Some(Value::Object(map)) => map.get("id").is_some_and(|v| match v {
                        Value::String(k) => k == id,
                        other => other.to_string() == id,
                    }),
                    _ => false,
                })
                .collect(),
            None => contents,
        })
    }

    async fn start_research(&self, keyword_id: &str) -> Result<Value, BackendError> {
        self.record(format!("POST /research/{}", keyword_id));
        Ok(json!({ "status": "processing" }))
    }

    async fn research_status(&self, keyword_id: &str) -> Result<StatusRecord, BackendError> {
        self.record(format!("GET /research/{}/status", keyword_id));
        next_status(&mut self.state.lock().research_script)
    }

    async fn create_content(&self, request: &ContentRequest) -> Result<Value, BackendError> {
        self.record(format!("POST /content {}", request.keyword_id));
        Ok(json!({ "status": "processing" }))
    }

    async fn content_status(&self, keyword_id: &str) -> Result<StatusRecord, BackendError> {
        self.record(format!("GET /content/{}/status", keyword_id));
        next_status(&mut self.state.lock().content_script)
    }

    async fn generate_titles(&self, content_id: &str) -> Result<TitleGenerationAck, BackendError> {
        self.record(format!("POST /titles/generate {}", content_id));
        self.state.lock().title_ack.clone()
    }

    async fn title_status(&self, content_id: &str) -> Result<StatusRecord, BackendError> {
        self.record(format!("GET /titles/status/{}", content_id));
        next_status(&mut self.state.lock().title_script)
    }

    async fn list_titles(&self) -> Result<Vec<SavedTitle>, BackendError> {
        self.record("GET /titles".to_string());
        self.check_load()?;
        Ok(self.state.lock().saved_titles.clone())
    }

    async fn save_title(&self, content_id: &str, title: &str) -> Result<SavedTitle, BackendError> {
        self.record(format!("POST /titles {}", content_id));
        let mut state = self.state.lock();
        let saved = SavedTitle {
            id: Some((state.saved_titles.len() + 1).to_string()),
            content_id: Some(content_id.to_string()),
            title: title.to_string(),
        };
        state.saved_titles.push(saved.clone());
        Ok(saved)
    }

    async fn list_images(&self, content_id: &str) -> Result<Vec<ImageRecord>, BackendError> {
        self.record(format!("GET /images?content={}", content_id));
        self.check_load()?;
        Ok(self.state.lock().images.clone())
    }

    async fn generate_images(&self, content_id: &str, subtopic_index: Option<usize>) -> Result<Value, BackendError> {
        self.record(format!("POST /images/generate {} {:?}", content_id, subtopic_index));
        let delay = self.state.lock().image_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.state.lock().image_response.clone())
    }

    async fn generate_infographic(&self, content_id: &str, subtopic_index: Option<usize>) -> Result<Value, BackendError> {
        self.record(format!("POST /images/infographic {} {:?}", content_id, subtopic_index));
        let delay = self.state.lock().image_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.state.lock().image_response.clone())
    }
}
