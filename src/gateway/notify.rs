//! Notification construction and delivery.
//!
//! Inbound payloads are parsed leniently (missing fields become defaults or
//! placeholders, never parse failures) and rendered into a rich-message
//! shape the sink understands. Delivery is behind the [`NotificationSink`]
//! trait so handlers and tests never talk to the network directly.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, warn};

use crate::errors::GatewayError;

// Severity palette shared by all builders.
pub const COLOR_SUCCESS: u32 = 0x00ff00;
pub const COLOR_FAILURE: u32 = 0xff0000;
pub const COLOR_WARNING: u32 = 0xffa500;
pub const COLOR_INFO: u32 = 0x0099ff;
pub const COLOR_MERGED: u32 = 0x6f42c1;
pub const COLOR_NEUTRAL: u32 = 0x6a737d;

/// Free-text fields are capped at this many bytes before rendering.
pub const MAX_TEXT_LEN: usize = 500;

/// A single delivery carries at most this many notifications.
pub const MAX_NOTIFICATIONS_PER_CALL: usize = 10;

/// Commits listed in a push notification are capped at this many.
const MAX_COMMITS_LISTED: usize = 5;

/// Truncate `text` to at most [`MAX_TEXT_LEN`] bytes on a char boundary.
pub fn truncate_text(text: &str) -> &str {
    if text.len() <= MAX_TEXT_LEN {
        return text;
    }
    let mut end = MAX_TEXT_LEN;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

// ── Outbound shape ──

/// One formatted notification, serialized as a rich-message embed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub color: u32,
    #[serde(default)]
    pub fields: Vec<NotificationField>,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

impl NotificationField {
    pub fn inline(name: &str, value: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            value: value.into(),
            inline: true,
        }
    }
}

impl Notification {
    fn new(title: String, description: &str, color: u32) -> Self {
        Self {
            title,
            description: truncate_text(description).to_string(),
            url: None,
            color,
            fields: Vec::new(),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

// ── Inbound payloads ──

/// Generic service event posted to `/event`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceEvent {
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub repo: Option<String>,
    #[serde(default)]
    pub sha: Option<String>,
}

impl ServiceEvent {
    pub fn service(&self) -> &str {
        self.service.as_deref().unwrap_or("unknown")
    }

    pub fn status(&self) -> &str {
        self.status.as_deref().unwrap_or("info")
    }
}

/// Alert-manager payload posted to `/alert`: either a batch envelope or a
/// bare alert object, which is treated as a batch of one.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AlertPayload {
    Batch { alerts: Vec<Alert> },
    Single(Alert),
}

impl AlertPayload {
    pub fn into_alerts(self) -> Vec<Alert> {
        match self {
            AlertPayload::Batch { alerts } => alerts,
            AlertPayload::Single(alert) => vec![alert],
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Alert {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub labels: AlertLabels,
    #[serde(default)]
    pub annotations: AlertAnnotations,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlertLabels {
    #[serde(default)]
    pub alertname: Option<String>,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub instance: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlertAnnotations {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
}

/// GitHub webhook body posted to `/git`. Only the fields the builders
/// consume are modeled; everything else passes through unread.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GitPayload {
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default, rename = "ref")]
    pub git_ref: Option<String>,
    #[serde(default)]
    pub pull_request: Option<PullRequest>,
    #[serde(default)]
    pub repository: Option<Repository>,
    #[serde(default)]
    pub commits: Option<Vec<Commit>>,
    #[serde(default)]
    pub pusher: Option<Pusher>,
    #[serde(default)]
    pub compare: Option<String>,
    #[serde(default)]
    pub check_suite: Option<CheckSuite>,
}

impl GitPayload {
    fn repo_name(&self) -> &str {
        self.repository
            .as_ref()
            .map(|r| r.full_name.as_str())
            .unwrap_or("unknown")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequest {
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub merged: bool,
    pub user: Author,
    pub base: GitRef,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Author {
    pub login: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitRef {
    #[serde(rename = "ref")]
    pub git_ref: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    pub full_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Commit {
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Pusher {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckSuite {
    #[serde(default)]
    pub conclusion: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    pub head_branch: String,
    #[serde(default)]
    pub html_url: Option<String>,
}

// ── Builders ──

/// Render a generic service event.
pub fn service_event_notification(event: &ServiceEvent) -> Notification {
    let service = event.service();
    let status = event.status();
    let color = match status {
        "success" => COLOR_SUCCESS,
        "failure" => COLOR_FAILURE,
        "warning" => COLOR_WARNING,
        _ => COLOR_INFO,
    };

    let mut notification = Notification::new(
        format!("Service Event: {service}"),
        event.description.as_deref().unwrap_or("Service event received"),
        color,
    );
    notification.fields = vec![
        NotificationField::inline("Service", service),
        NotificationField::inline("Status", status),
        NotificationField::inline("Source", event.source.as_deref().unwrap_or("API")),
    ];
    if let Some(repo) = &event.repo {
        notification
            .fields
            .push(NotificationField::inline("Repository", repo.clone()));
    }
    if let Some(sha) = &event.sha {
        let short: String = sha.chars().take(8).collect();
        notification
            .fields
            .push(NotificationField::inline("Commit", short));
    }
    notification
}

/// Render one alert from a batch.
pub fn alert_notification(alert: &Alert) -> Notification {
    let status = alert.status.as_deref().unwrap_or("unknown");
    let color = if status == "firing" {
        COLOR_FAILURE
    } else {
        COLOR_SUCCESS
    };
    let description = alert
        .annotations
        .description
        .as_deref()
        .or(alert.annotations.summary.as_deref())
        .unwrap_or("Alert triggered");

    let mut notification = Notification::new(
        format!(
            "Alert: {}",
            alert.labels.alertname.as_deref().unwrap_or("Unknown")
        ),
        description,
        color,
    );
    notification.fields = vec![
        NotificationField::inline("Status", status),
        NotificationField::inline(
            "Severity",
            alert.labels.severity.as_deref().unwrap_or("unknown"),
        ),
        NotificationField::inline(
            "Instance",
            alert.labels.instance.as_deref().unwrap_or("N/A"),
        ),
    ];
    notification
}

/// Render a GitHub event. Unrecognized event types get a neutral summary
/// rather than an error.
pub fn git_notification(event: &str, payload: &GitPayload) -> Notification {
    match event {
        "pull_request" => pull_request_notification(payload),
        "push" => push_notification(payload),
        "check_suite" => check_suite_notification(payload),
        other => Notification::new(
            format!("GitHub Event: {other}"),
            &format!("Received {other} event"),
            COLOR_NEUTRAL,
        ),
    }
}

fn pull_request_notification(payload: &GitPayload) -> Notification {
    let action = payload.action.as_deref().unwrap_or("updated");
    let Some(pr) = &payload.pull_request else {
        return Notification::new(
            format!("PR {action}"),
            "Pull request payload missing details",
            COLOR_NEUTRAL,
        );
    };

    let color = match (action, pr.merged) {
        ("opened", _) => COLOR_SUCCESS,
        ("closed", true) => COLOR_MERGED,
        ("closed", false) => COLOR_NEUTRAL,
        _ => COLOR_INFO,
    };

    let mut notification = Notification::new(
        format!("PR {action}: {}", pr.title),
        pr.body.as_deref().unwrap_or("No description"),
        color,
    );
    notification.url = pr.html_url.clone();
    notification.fields = vec![
        NotificationField::inline("Repository", payload.repo_name()),
        NotificationField::inline("Author", pr.user.login.clone()),
        NotificationField::inline("Base", pr.base.git_ref.clone()),
    ];
    notification
}

fn push_notification(payload: &GitPayload) -> Notification {
    let branch = payload
        .git_ref
        .as_deref()
        .map(super::routes::branch_from_ref)
        .unwrap_or("unknown");
    let commits = payload.commits.as_deref().unwrap_or(&[]);
    let listed = &commits[..commits.len().min(MAX_COMMITS_LISTED)];
    let description = listed
        .iter()
        .map(|c| format!("- {}", c.message.lines().next().unwrap_or("")))
        .collect::<Vec<_>>()
        .join("\n");

    let mut notification =
        Notification::new(format!("Push to {branch}"), &description, COLOR_INFO);
    notification.url = payload.compare.clone();
    notification.fields = vec![
        NotificationField::inline("Repository", payload.repo_name()),
        NotificationField::inline(
            "Pusher",
            payload
                .pusher
                .as_ref()
                .map(|p| p.name.as_str())
                .unwrap_or("unknown"),
        ),
        NotificationField::inline("Commits", listed.len().to_string()),
    ];
    notification
}

fn check_suite_notification(payload: &GitPayload) -> Notification {
    let Some(suite) = &payload.check_suite else {
        return Notification::new(
            "CI check suite".to_string(),
            "Check suite payload missing details",
            COLOR_NEUTRAL,
        );
    };
    let conclusion = suite.conclusion.as_deref().unwrap_or("running");
    let color = match conclusion {
        "success" => COLOR_SUCCESS,
        "failure" => COLOR_FAILURE,
        _ => COLOR_WARNING,
    };

    let mut notification = Notification::new(
        format!("CI {conclusion}: {}", suite.head_branch),
        &format!("Check suite {conclusion}"),
        color,
    );
    notification.url = suite.html_url.clone();
    notification.fields = vec![
        NotificationField::inline("Repository", payload.repo_name()),
        NotificationField::inline("Branch", suite.head_branch.clone()),
        NotificationField::inline("Status", suite.status.as_deref().unwrap_or("unknown")),
    ];
    notification
}

// ── Delivery ──

/// Abstract delivery target for formatted notifications.
///
/// Implementations must cap a single call at [`MAX_NOTIFICATIONS_PER_CALL`]
/// entries; callers may pass more and rely on the cap.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(
        &self,
        channel_id: &str,
        notifications: &[Notification],
    ) -> Result<(), GatewayError>;
}

/// Environment variable carrying the bot token for [`DiscordSink`].
pub const DISCORD_TOKEN_ENV: &str = "DISCORD_TOKEN";

/// Posts notifications to a Discord channel via the bot messages API.
pub struct DiscordSink {
    client: reqwest::Client,
    token: Option<String>,
}

impl DiscordSink {
    pub fn from_env() -> Self {
        let token = std::env::var(DISCORD_TOKEN_ENV)
            .ok()
            .filter(|t| !t.is_empty());
        if token.is_none() {
            warn!("{DISCORD_TOKEN_ENV} not set, notifications will be skipped");
        }
        Self {
            client: reqwest::Client::new(),
            token,
        }
    }
}

#[async_trait]
impl NotificationSink for DiscordSink {
    async fn deliver(
        &self,
        channel_id: &str,
        notifications: &[Notification],
    ) -> Result<(), GatewayError> {
        let Some(token) = &self.token else {
            warn!("no bot token configured, skipping delivery to {channel_id}");
            return Ok(());
        };

        let capped = &notifications[..notifications.len().min(MAX_NOTIFICATIONS_PER_CALL)];
        let url = format!("https://discord.com/api/v10/channels/{channel_id}/messages");
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bot {token}"))
            .json(&json!({ "embeds": capped }))
            .send()
            .await
            .map_err(|e| GatewayError::Sink(e.to_string()))?;

        if let Err(e) = response.error_for_status() {
            error!("delivery to channel {channel_id} failed: {e}");
            return Err(GatewayError::Sink(e.to_string()));
        }
        info!("delivered {} notification(s) to channel {channel_id}", capped.len());
        Ok(())
    }
}
