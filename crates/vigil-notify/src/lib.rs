//! Delivery of run results: PR comments, labels, webhooks, step
//! summaries, and artifact publication.
//!
//! Deliveries are best-effort: a failure is reported to the caller
//! once and never retried, and the gate result stays authoritative
//! regardless of notification outcome.

pub mod artifacts;
pub mod github;
pub mod summary;
pub mod webhook;

pub use artifacts::{publish_branch, stage_artifacts, ArtifactFile, ArtifactManifest};
pub use github::{parse_pr_reference, resolve_pr_reference, GitHubClient, COMMENT_MARKER};
pub use summary::{append_summary, resolve_summary_path};
pub use webhook::WebhookClient;
