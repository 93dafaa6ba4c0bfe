/*!
 * # blogflow - console for an AI-assisted blog publishing workflow
 *
 * A Rust library and CLI that drives a remote blog generation backend:
 * pick an analyzed keyword, collect research, generate an article, titles
 * and images, and read the result reflowed for narrow screens.
 *
 * ## Features
 *
 * - Mobile text reflow for Markdown and HTML article bodies
 * - Cancelable background polling of long-running backend jobs
 * - Bounded retry with exponential backoff and offline detection
 * - Local cache of the last loaded content list
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `formatting`: Line reflow for mobile display
 * - `polling`: Job poller, retry and network monitor
 * - `backend`: Backend trait, HTTP client, wire models and a mock
 * - `cache`: Content list cache
 * - `app_controller`: Workflow orchestration
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod backend;
pub mod cache;
pub mod errors;
pub mod formatting;
pub mod polling;

// Re-export main types for easier usage
pub use app_config::Config;
pub use app_controller::Controller;
pub use backend::{Backend, BackendClient, MockBackend};
pub use cache::ContentCache;
pub use errors::{AppError, BackendError, ConsoleError};
pub use formatting::{MobileFormatter, format_for_mobile, format_html_for_mobile};
pub use polling::{JobPoller, NetworkMonitor, PollHandle, PollObserver, PollOptions, RetryPolicy};
