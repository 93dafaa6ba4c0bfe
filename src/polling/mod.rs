/*!
 * Background job polling, retry and connectivity tracking.
 *
 * - `job`: status wire record, poll snapshots and outcomes
 * - `poller`: keyed registry of cancelable polling tasks
 * - `retry`: bounded exponential-backoff retry for one-shot loads
 * - `network`: shared online/offline flag
 */

pub mod job;
pub mod network;
pub mod poller;
pub mod retry;

pub use job::{JobStatus, PollJob, PollOutcome, StatusRecord};
pub use network::NetworkMonitor;
pub use poller::{JobPoller, NoopObserver, PollHandle, PollObserver, PollOptions};
pub use retry::{RetryPolicy, load_with_retry, with_slow_notice};
