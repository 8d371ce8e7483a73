//! Discord bot delivery. Posts messages and file uploads to a channel via
//! the REST API.
//!
//! Retry budget per call, counted independently:
//! - one retry after a fixed delay for network errors and 5xx,
//! - one retry after the server-mandated `retry_after` for 429.
//!
//! Nothing here returns `Err`; every failure ends up in the
//! [`DeliveryAttempt`] and in the delivery log.

use std::time::{Duration, Instant};

use devmemory_core::config::DiscordConfig;
use devmemory_core::{DeliveryAttempt, DevMemoryError, Result};
use serde_json::{Value, json};

/// Tracing target routed to the dedicated delivery log.
pub const DELIVERY_TARGET: &str = "devmemory::delivery";

/// Wait used when a 429 carries no usable `retry_after`.
const FALLBACK_RETRY_AFTER: Duration = Duration::from_secs(5);

/// What to post.
#[derive(Debug, Clone)]
pub enum DiscordPayload {
    /// Plain message body.
    Text { content: String },
    /// Message body plus one uploaded file.
    File {
        content: String,
        filename: String,
        bytes: Vec<u8>,
    },
}

impl DiscordPayload {
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text {
            content: content.into(),
        }
    }

    fn content(&self) -> &str {
        match self {
            Self::Text { content } | Self::File { content, .. } => content,
        }
    }
}

/// Discord channel client with bounded retries.
pub struct DiscordClient {
    client: reqwest::Client,
    api_base: String,
    bot_token: String,
    channel_id: String,
    retry_delay: Duration,
}

impl DiscordClient {
    pub fn new(config: &DiscordConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("devmemory/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            bot_token: config.bot_token.trim().to_string(),
            channel_id: config.channel_id.trim().to_string(),
            retry_delay: Duration::from_secs(config.retry_delay_secs),
        }
    }

    /// Override the fixed transient-retry delay.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn has_credentials(&self) -> bool {
        !self.bot_token.is_empty() && !self.channel_id.is_empty()
    }

    fn messages_url(&self) -> String {
        format!("{}/channels/{}/messages", self.api_base, self.channel_id)
    }

    /// Send one message, retrying within the budget described above.
    ///
    /// With `mention_user_id` set, the content is prefixed with the mention
    /// and `allowed_mentions` whitelists that user so the ping is delivered.
    pub async fn send(&self, payload: &DiscordPayload, mention_user_id: Option<&str>) -> DeliveryAttempt {
        if !self.has_credentials() {
            tracing::warn!(
                target: DELIVERY_TARGET,
                "⚠️ Discord credentials missing (DISCORD_BOT_TOKEN/DISCORD_CHANNEL_ID)"
            );
            return DeliveryAttempt::failed(DevMemoryError::Config(
                "missing Discord bot token or channel id".into(),
            ));
        }

        let body = message_body(payload.content(), mention_user_id);
        let url = self.messages_url();
        let mut attempt = DeliveryAttempt::default();
        let mut transient_retry_used = false;
        let mut rate_limit_retry_used = false;

        loop {
            attempt.requests += 1;
            let started = Instant::now();
            let result = self.post(&url, &body, payload).await;
            let latency_ms = started.elapsed().as_millis() as u64;
            attempt.latency_ms = Some(latency_ms);

            let response = match result {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!(
                        target: DELIVERY_TARGET,
                        "⚠️ Discord send error (latency_ms={latency_ms} retry={}): {e}",
                        attempt.retry_count
                    );
                    attempt.status_code = None;
                    let transient = e.is_transient();
                    attempt.error = Some(if transient {
                        DevMemoryError::TransientDelivery(e.to_string())
                    } else {
                        e
                    });
                    if transient && !transient_retry_used {
                        transient_retry_used = true;
                        attempt.retry_count += 1;
                        tokio::time::sleep(self.retry_delay).await;
                        continue;
                    }
                    break;
                }
            };

            let status = response.status().as_u16();
            attempt.status_code = Some(status);
            let headers_retry_after = header_retry_after(response.headers());
            let text = response.text().await.unwrap_or_default();

            if (200..300).contains(&status) {
                attempt.error = None;
                tracing::info!(
                    target: DELIVERY_TARGET,
                    "✅ Discord send success (status={status} latency_ms={latency_ms} retry={})",
                    attempt.retry_count
                );
                break;
            }

            if status == 429 {
                let wait = body_retry_after(&text)
                    .or(headers_retry_after)
                    .unwrap_or(FALLBACK_RETRY_AFTER);
                attempt.rate_limited = true;
                attempt.retry_after = Some(wait);
                attempt.error = Some(DevMemoryError::RateLimited { retry_after: wait });
                tracing::warn!(
                    target: DELIVERY_TARGET,
                    "⏳ Discord rate limited (429) retry_after={:.2}s request={}",
                    wait.as_secs_f64(),
                    attempt.requests
                );
                if !rate_limit_retry_used {
                    rate_limit_retry_used = true;
                    attempt.retry_count += 1;
                    tokio::time::sleep(wait).await;
                    continue;
                }
                break;
            }

            let preview: String = text.chars().take(500).collect();
            tracing::error!(
                target: DELIVERY_TARGET,
                "❌ Discord send failed (status={status} latency_ms={latency_ms} retry={} body={preview})",
                attempt.retry_count
            );
            if status >= 500 {
                attempt.error = Some(DevMemoryError::TransientDelivery(format!(
                    "HTTP {status}: {preview}"
                )));
                if !transient_retry_used {
                    transient_retry_used = true;
                    attempt.retry_count += 1;
                    tokio::time::sleep(self.retry_delay).await;
                    continue;
                }
            } else {
                attempt.error = Some(DevMemoryError::DeliveryRejected {
                    status,
                    body: preview,
                });
            }
            break;
        }

        log_attempt(&attempt);
        attempt
    }

    async fn post(&self, url: &str, body: &Value, payload: &DiscordPayload) -> Result<reqwest::Response> {
        let request = self
            .client
            .post(url)
            .header("Authorization", format!("Bot {}", self.bot_token));

        let request = match payload {
            DiscordPayload::Text { .. } => request.json(body),
            DiscordPayload::File {
                filename, bytes, ..
            } => {
                let file = reqwest::multipart::Part::bytes(bytes.clone())
                    .file_name(filename.clone())
                    .mime_str("text/markdown")
                    .map_err(|e| DevMemoryError::Http(format!("invalid attachment: {e}")))?;
                let form = reqwest::multipart::Form::new()
                    .text("payload_json", body.to_string())
                    .part("files[0]", file);
                request.multipart(form)
            }
        };

        request
            .send()
            .await
            .map_err(|e| DevMemoryError::Http(format!("Discord request failed: {e}")))
    }
}

/// JSON body shared by plain and multipart sends.
pub fn message_body(content: &str, mention_user_id: Option<&str>) -> Value {
    match mention_user_id.filter(|id| !id.is_empty()) {
        Some(user) => json!({
            "content": format!("<@{user}>\n{content}"),
            "allowed_mentions": { "parse": [], "users": [user] },
        }),
        None => json!({ "content": content }),
    }
}

/// Discord reports `retry_after` in (fractional) seconds in the JSON body.
fn body_retry_after(text: &str) -> Option<Duration> {
    let value: Value = serde_json::from_str(text).ok()?;
    let secs = value.get("retry_after")?.as_f64()?;
    (secs > 0.0 && secs.is_finite()).then(|| Duration::from_secs_f64(secs))
}

fn header_retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    let secs: f64 = headers.get("retry-after")?.to_str().ok()?.trim().parse().ok()?;
    (secs > 0.0 && secs.is_finite()).then(|| Duration::from_secs_f64(secs))
}

fn log_attempt(attempt: &DeliveryAttempt) {
    let wait_ms = attempt.retry_after.map(|d| d.as_millis() as u64);
    match &attempt.error {
        None => tracing::info!(
            target: DELIVERY_TARGET,
            status = ?attempt.status_code,
            latency_ms = ?attempt.latency_ms,
            retry_count = attempt.retry_count,
            rate_limit_wait_ms = ?wait_ms,
            "📨 Delivery attempt recorded: delivered"
        ),
        Some(e) => tracing::warn!(
            target: DELIVERY_TARGET,
            status = ?attempt.status_code,
            latency_ms = ?attempt.latency_ms,
            retry_count = attempt.retry_count,
            rate_limit_wait_ms = ?wait_ms,
            "📭 Delivery attempt recorded: failed ({e})"
        ),
    }
}
