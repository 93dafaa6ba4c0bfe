/*!
 * Boundary to the blog generation backend.
 *
 * - `client`: the HTTP implementation built on reqwest
 * - `models`: wire types and response normalization
 * - `mock`: scripted in-memory backend for tests and offline runs
 */

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::BackendError;
use crate::polling::StatusRecord;

pub mod client;
pub mod mock;
pub mod models;

pub use client::BackendClient;
pub use mock::MockBackend;
pub use models::{
    BusinessInfo, ContentRequest, ContentSummary, ImageRecord, Keyword, KeywordDetail, ResearchStats,
    SavedTitle, Subtopic, TitleGenerationAck, TitleSet, TitleSuggestion,
};

/// Operations the console needs from the backend.
///
/// List operations return already-normalized lists; envelope handling lives
/// in the implementation.
#[async_trait]
pub trait Backend: Send + Sync {
    /// `GET /keywords`
    async fn list_keywords(&self) -> Result<Vec<Keyword>, BackendError>;

    /// `GET /keywords/{id}`
    async fn get_keyword(&self, keyword_id: &str) -> Result<KeywordDetail, BackendError>;

    /// `GET /contents`, optionally filtered by keyword id
    async fn list_contents(&self, keyword_id: Option<&str>) -> Result<Vec<ContentSummary>, BackendError>;

    /// `POST /research/{keyword}`
    async fn start_research(&self, keyword_id: &str) -> Result<Value, BackendError>;

    /// `GET /research/{keyword}/status`
    async fn research_status(&self, keyword_id: &str) -> Result<StatusRecord, BackendError>;

    /// `POST /content`
    async fn create_content(&self, request: &ContentRequest) -> Result<Value, BackendError>;

    /// `GET /content/{keyword}/status`
    async fn content_status(&self, keyword_id: &str) -> Result<StatusRecord, BackendError>;

    /// `POST /titles/generate`
    async fn generate_titles(&self, content_id: &str) -> Result<TitleGenerationAck, BackendError>;

    /// `GET /titles/status/{content_id}`
    async fn title_status(&self, content_id: &str) -> Result<StatusRecord, BackendError>;

    /// `GET /titles`
    async fn list_titles(&self) -> Result<Vec<SavedTitle>, BackendError>;

    /// `POST /titles`
    async fn save_title(&self, content_id: &str, title: &str) -> Result<SavedTitle, BackendError>;

    /// `GET /images?content={id}`
    async fn list_images(&self, content_id: &str) -> Result<Vec<ImageRecord>, BackendError>;

    /// `POST /images/generate`; all subtopics when `subtopic_index` is `None`
    async fn generate_images(&self, content_id: &str, subtopic_index: Option<usize>) -> Result<Value, BackendError>;

    /// `POST /images/infographic`
    async fn generate_infographic(&self, content_id: &str, subtopic_index: Option<usize>) -> Result<Value, BackendError>;
}
