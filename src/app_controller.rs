use anyhow::Result;
use log::{debug, info, warn};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;
use std::io::{BufRead, Write};
use std::sync::Arc;
use std::time::Duration;

use crate::app_config::Config;
use crate::backend::models::{dedupe_images, parse_title_set};
use crate::backend::{
    Backend, BackendClient, BusinessInfo, ContentRequest, ContentSummary, ImageRecord, Keyword, ResearchStats,
    SavedTitle, TitleGenerationAck, TitleSet,
};
use crate::cache::ContentCache;
use crate::errors::ConsoleError;
use crate::formatting::MobileFormatter;
use crate::polling::{
    JobPoller, NetworkMonitor, PollHandle, PollObserver, StatusRecord, load_with_retry,
    with_slow_notice,
};

// @module: Workflow controller for the blog publishing console

/// `### Heading` lines in generated articles
static SUBTOPIC_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"###[ \t]+([^\n]+)").unwrap()
});

/// Keywords and contents shown on the dashboard
#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    /// Analyzed keywords only
    pub keywords: Vec<Keyword>,
    pub contents: Vec<ContentSummary>,
    /// True when the backend could not be reached and `contents` came from
    /// the local cache
    pub from_cache: bool,
}

/// User input for content generation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentGeneration {
    pub keyword_id: String,
    pub business_name: String,
    pub expertise: String,
    /// Space-separated extra morphemes
    pub custom_morphemes: String,
}

/// Result of a finished content generation
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedContent {
    /// Set when research had to be collected first
    pub research: Option<ResearchStats>,
    /// Completion payload reported by the backend
    pub result: Value,
}

/// Titles generated for the latest content of a keyword
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedTitles {
    pub content_id: String,
    pub titles: TitleSet,
}

/// Which image endpoint to call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Illustration,
    Infographic,
}

impl ImageKind {
    fn label(self) -> &'static str {
        match self {
            ImageKind::Illustration => "images",
            ImageKind::Infographic => "infographic",
        }
    }
}

/// Main application controller for the publishing workflow
pub struct Controller {
    // @field: App configuration
    config: Config,
    backend: Arc<dyn Backend>,
    poller: JobPoller,
    network: NetworkMonitor,
    cache: ContentCache,
    formatter: MobileFormatter,
    /// Keywords whose research finished during this session
    researched: Mutex<HashSet<String>>,
}

impl Controller {
    // @method: Create a new controller talking to the configured backend
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate()?;

        let network = NetworkMonitor::new();
        let client = BackendClient::new(
            &config.backend.endpoint,
            config.backend.timeout(),
            config.backend.trailing_slash,
            network.clone(),
        )?;
        let cache = ContentCache::new(config.cache_path(), config.cache.enabled);

        Ok(Self::with_backend(config, Arc::new(client), network).with_cache(cache))
    }

    /// Create a controller over any backend implementation.
    ///
    /// The content cache is kept in memory unless replaced with `with_cache`.
    pub fn with_backend(config: Config, backend: Arc<dyn Backend>, network: NetworkMonitor) -> Self {
        let formatter = MobileFormatter::new(config.formatting.target_length);
        let cache = if config.cache.enabled {
            ContentCache::in_memory()
        } else {
            ContentCache::disabled()
        };

        Self {
            config,
            backend,
            poller: JobPoller::new(),
            network,
            cache,
            formatter,
            researched: Mutex::new(HashSet::new()),
        }
    }

    pub fn with_cache(mut self, cache: ContentCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn poller(&self) -> &JobPoller {
        &self.poller
    }

    pub fn network(&self) -> &NetworkMonitor {
        &self.network
    }

    pub fn cache(&self) -> &ContentCache {
        &self.cache
    }

    pub fn formatter(&self) -> &MobileFormatter {
        &self.formatter
    }

    /// Load analyzed keywords and all contents, retrying transient failures.
    ///
    /// Falls back to the cached content list when contents cannot be loaded.
    pub async fn load_dashboard(&self) -> Result<Dashboard, ConsoleError> {
        let policy = self.config.retry.policy();
        let backend = self.backend.as_ref();

        let keywords = load_with_retry(move || backend.list_keywords(), &policy, &self.network).await?;
        let total = keywords.len();
        let keywords: Vec<Keyword> = keywords.into_iter().filter(Keyword::is_analyzed).collect();
        debug!("Loaded {} keywords ({} analyzed)", total, keywords.len());

        match load_with_retry(move || backend.list_contents(None), &policy, &self.network).await {
            Ok(contents) => {
                if let Err(e) = self.cache.store(&contents) {
                    warn!("Failed to update content cache: {:#}", e);
                }
                Ok(Dashboard {
                    keywords,
                    contents,
                    from_cache: false,
                })
            }
            Err(error) => match self.cache.load() {
                Some(cached) => {
                    warn!(
                        "Showing {} cached contents from {}: {}",
                        cached.contents.len(),
                        cached.saved_at.to_rfc3339(),
                        error
                    );
                    Ok(Dashboard {
                        keywords,
                        contents: cached.contents,
                        from_cache: true,
                    })
                }
                None => Err(error),
            },
        }
    }

    /// Contents, optionally limited to one keyword
    pub async fn contents(&self, keyword_id: Option<&str>) -> Result<Vec<ContentSummary>, ConsoleError> {
        let policy = self.config.retry.policy();
        let backend = self.backend.as_ref();
        load_with_retry(move || backend.list_contents(keyword_id), &policy, &self.network).await
    }

    /// Subtopic titles the backend analyzed for a keyword
    pub async fn keyword_subtopics(&self, keyword_id: &str) -> Result<Vec<String>, ConsoleError> {
        let detail = self.backend.get_keyword(keyword_id).await?;
        Ok(detail.subtopics.iter().map(|s| s.title().to_string()).collect())
    }

    /// Collect research sources for a keyword and wait for the counts
    pub async fn collect_research(
        &self,
        keyword_id: &str,
        observer: Arc<dyn PollObserver>,
    ) -> Result<ResearchStats, ConsoleError> {
        require(keyword_id, "Select a keyword first.")?;

        info!("Collecting research for keyword {}", keyword_id);
        self.backend.start_research(keyword_id).await?;

        let backend = Arc::clone(&self.backend);
        let id = keyword_id.to_string();
        let handle = self.poller.start(
            format!("research:{}", keyword_id),
            move |_key| {
                let backend = Arc::clone(&backend);
                let id = id.clone();
                async move { backend.research_status(&id).await }
            },
            self.config.polling.research.options(),
            observer,
        );

        let data = await_poll(handle).await?;
        let stats = if data.is_null() {
            ResearchStats::default()
        } else {
            serde_json::from_value(data).map_err(|e| ConsoleError::MalformedResponse(e.to_string()))?
        };

        info!("Research collected for keyword {}: {} sources", keyword_id, stats.total());
        self.researched.lock().insert(keyword_id.to_string());
        Ok(stats)
    }

    /// Whether research for `keyword_id` already finished in this session
    pub fn is_researched(&self, keyword_id: &str) -> bool {
        self.researched.lock().contains(keyword_id)
    }

    /// Generate an article for a keyword.
    ///
    /// Research is collected first unless it already finished in this
    /// session. On completion the dashboard data is refreshed.
    pub async fn generate_content(
        &self,
        input: &ContentGeneration,
        observer: Arc<dyn PollObserver>,
    ) -> Result<GeneratedContent, ConsoleError> {
        require(&input.keyword_id, "Select a keyword first.")?;
        require(&input.business_name, "Enter a business name.")?;
        require(&input.expertise, "Enter your expertise.")?;

        let keyword_id = input.keyword_id.trim();
        let research = if self.is_researched(keyword_id) {
            None
        } else {
            Some(self.collect_research(keyword_id, Arc::clone(&observer)).await?)
        };

        let request = ContentRequest::new(
            keyword_id,
            BusinessInfo {
                name: input.business_name.trim().to_string(),
                expertise: input.expertise.trim().to_string(),
            },
            ContentRequest::split_morphemes(&input.custom_morphemes),
        );
        self.backend.create_content(&request).await?;

        let backend = Arc::clone(&self.backend);
        let id = keyword_id.to_string();
        let handle = self.poller.start(
            format!("content:{}", keyword_id),
            move |_key| {
                let backend = Arc::clone(&backend);
                let id = id.clone();
                async move { backend.content_status(&id).await }
            },
            self.config.polling.content.options(),
            observer,
        );

        let result = await_poll(handle).await?;
        info!("Content generated for keyword {}", keyword_id);

        // Research is consumed by one generation
        self.researched.lock().remove(keyword_id);

        if let Err(e) = self.load_dashboard().await {
            warn!("Content generated but the dashboard could not be refreshed: {}", e);
        }

        Ok(GeneratedContent { research, result })
    }

    /// Generate titles for the most recent content of a keyword
    pub async fn generate_titles(
        &self,
        keyword_id: &str,
        observer: Arc<dyn PollObserver>,
    ) -> Result<GeneratedTitles, ConsoleError> {
        require(keyword_id, "Select a keyword first.")?;

        let contents = self.contents(Some(keyword_id)).await?;
        let content = latest_content(&contents).ok_or_else(|| {
            ConsoleError::Validation(
                "No content exists for this keyword yet. Generate content first.".to_string(),
            )
        })?;
        let content_id = content.id.clone();
        info!("Generating titles for content {}", content_id);

        let ack = match self.backend.generate_titles(&content_id).await {
            Ok(ack) => ack,
            Err(e) if e.is_timeout() => {
                warn!("Title request timed out; generation may continue in the background");
                TitleGenerationAck {
                    status: Some("processing".to_string()),
                    ..TitleGenerationAck::default()
                }
            }
            Err(e) => return Err(e.into()),
        };

        let data = if ack.needs_polling() {
            let backend = Arc::clone(&self.backend);
            let id = content_id.clone();
            let handle = self.poller.start(
                format!("titles:{}", content_id),
                move |_key| {
                    let backend = Arc::clone(&backend);
                    let id = id.clone();
                    async move { backend.title_status(&id).await }
                },
                self.config.polling.titles.options(),
                observer,
            );
            await_poll(handle).await?
        } else if let Some(data) = ack.data {
            data
        } else if let Some(error) = ack.error {
            return Err(ConsoleError::RemoteFailure(error));
        } else {
            return Err(ConsoleError::MalformedResponse(
                "title generation response carried no titles".to_string(),
            ));
        };

        let titles = parse_title_set(data).map_err(|e| ConsoleError::MalformedResponse(e.to_string()))?;
        Ok(GeneratedTitles { content_id, titles })
    }

    /// One-off title status check
    pub async fn check_title_status(&self, content_id: &str) -> Result<StatusRecord, ConsoleError> {
        require(content_id, "Select a content first.")?;
        Ok(self.backend.title_status(content_id).await?)
    }

    pub async fn saved_titles(&self) -> Result<Vec<SavedTitle>, ConsoleError> {
        let policy = self.config.retry.policy();
        let backend = self.backend.as_ref();
        load_with_retry(move || backend.list_titles(), &policy, &self.network).await
    }

    pub async fn save_title(&self, content_id: &str, title: &str) -> Result<SavedTitle, ConsoleError> {
        require(content_id, "Select a content first.")?;
        require(title, "Title must not be empty.")?;
        Ok(self.backend.save_title(content_id, title.trim()).await?)
    }

    /// Look up one content by id
    pub async fn content(&self, content_id: &str) -> Result<ContentSummary, ConsoleError> {
        self.contents(None)
            .await?
            .into_iter()
            .find(|c| c.id == content_id)
            .ok_or_else(|| ConsoleError::Validation(format!("No content with id {}", content_id)))
    }

    /// Article body, reflowed for mobile when `mobile` is set
    pub async fn content_text(&self, content_id: &str, mobile: bool) -> Result<String, ConsoleError> {
        let content = self.content(content_id).await?;
        let body = content.content.unwrap_or_default();
        if !mobile {
            return Ok(body);
        }
        if looks_like_html(&body) {
            Ok(self.formatter.format_html_for_mobile(&body))
        } else {
            Ok(self.formatter.format_for_mobile(&body))
        }
    }

    /// Subtopic headings of a generated article
    pub async fn content_subtopics(&self, content_id: &str) -> Result<Vec<String>, ConsoleError> {
        let content = self.content(content_id).await?;
        Ok(extract_subtopics(content.content.as_deref().unwrap_or_default()))
    }

    /// Images of a content, without duplicates
    pub async fn images(&self, content_id: &str) -> Result<Vec<ImageRecord>, ConsoleError> {
        require(content_id, "Select a content first.")?;
        let policy = self.config.retry.policy();
        let backend = self.backend.as_ref();
        let images = load_with_retry(move || backend.list_images(content_id), &policy, &self.network).await?;
        Ok(dedupe_images(images))
    }

    /// Generate illustrations for one subtopic (or all of them) and return
    /// the refreshed image list. `on_slow` fires once if the backend has not
    /// answered after the configured notice delay.
    pub async fn generate_images<N: FnOnce()>(
        &self,
        content_id: &str,
        subtopic_index: Option<usize>,
        on_slow: N,
    ) -> Result<Vec<ImageRecord>, ConsoleError> {
        self.request_images(ImageKind::Illustration, content_id, subtopic_index, on_slow)
            .await
    }

    /// Generate an infographic and return the refreshed image list
    pub async fn generate_infographic<N: FnOnce()>(
        &self,
        content_id: &str,
        subtopic_index: Option<usize>,
        on_slow: N,
    ) -> Result<Vec<ImageRecord>, ConsoleError> {
        self.request_images(ImageKind::Infographic, content_id, subtopic_index, on_slow)
            .await
    }

    async fn request_images<N: FnOnce()>(
        &self,
        kind: ImageKind,
        content_id: &str,
        subtopic_index: Option<usize>,
        on_slow: N,
    ) -> Result<Vec<ImageRecord>, ConsoleError> {
        require(content_id, "Select a content first.")?;
        info!("Requesting {} for content {} (subtopic {:?})", kind.label(), content_id, subtopic_index);

        let request = match kind {
            ImageKind::Illustration => self.backend.generate_images(content_id, subtopic_index),
            ImageKind::Infographic => self.backend.generate_infographic(content_id, subtopic_index),
        };
        let notice_after = Duration::from_secs(self.config.images.slow_notice_secs);

        let response = match with_slow_notice(request, notice_after, on_slow).await {
            Ok(body) => body,
            Err(e) if e.is_timeout() => {
                return Err(ConsoleError::Timeout {
                    key: format!("{}:{}", kind.label(), content_id),
                    attempts: 1,
                });
            }
            Err(e) => return Err(e.into()),
        };

        if response.is_null() {
            return Err(ConsoleError::MalformedResponse(format!(
                "empty response from {} generation",
                kind.label()
            )));
        }

        self.images(content_id).await
    }

    /// Cancel every running poll
    pub fn shutdown(&self) {
        let active = self.poller.active_count();
        if active > 0 {
            info!("Cancelling {} running polls", active);
        }
        self.poller.cancel_all();
    }
}

/// Wait for a poll and convert its outcome
async fn await_poll(handle: PollHandle) -> Result<Value, ConsoleError> {
    let key = handle.key().to_string();
    match handle.wait().await {
        Some(outcome) => outcome.into_result(&key),
        None => Err(ConsoleError::Cancelled(key)),
    }
}

fn require(value: &str, message: &str) -> Result<(), ConsoleError> {
    if value.trim().is_empty() {
        return Err(ConsoleError::Validation(message.to_string()));
    }
    Ok(())
}

fn looks_like_html(text: &str) -> bool {
    let lower = text.to_lowercase();
    ["<p", "<br", "<div", "<h1", "<h2", "<h3", "<ul", "<li"]
        .iter()
        .any(|tag| lower.contains(tag))
}

/// Subtopic headings (`### ...`) of an article, in order
pub fn extract_subtopics(content: &str) -> Vec<String> {
    SUBTOPIC_REGEX
        .captures_iter(content)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|title| !title.is_empty())
        .collect()
}

/// Ask whether to generate content for the keyword's subtopics.
///
/// A failed subtopic lookup stops generation with that error. An empty list
/// still asks.
pub fn confirm_subtopics<R: BufRead, W: Write>(
    subtopics: Result<Vec<String>, ConsoleError>,
    mut input: R,
    mut output: W,
) -> Result<bool> {
    let subtopics = subtopics?;

    if subtopics.is_empty() {
        writeln!(output, "This keyword has no subtopics.")?;
    } else {
        writeln!(output, "Content will be generated for these subtopics:")?;
        for (index, subtopic) in subtopics.iter().enumerate() {
            writeln!(output, "  {}. {}", index + 1, subtopic)?;
        }
    }
    write!(output, "Continue? [y/N] ")?;
    output.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

/// Most recently created content. Entries without a parseable date rank
/// last; ties keep the earlier entry.
pub fn latest_content(contents: &[ContentSummary]) -> Option<&ContentSummary> {
    contents.iter().fold(None, |best: Option<&ContentSummary>, candidate| match best {
        Some(current) if candidate.created_at() <= current.created_at() => Some(current),
        _ => Some(candidate),
    })
}
