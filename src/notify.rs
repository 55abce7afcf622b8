//! Completion notifications.

use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use reqwest::{Client, Url};

use crate::print_warning;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Sends a short text message somewhere a person will see it.
pub trait Notifier {
    fn notify(&self, message: &str) -> impl Future<Output = Result<()>> + Send;
}

/// Posts the message to a webhook URL as the `text` query parameter.
///
/// Works with push services like PushDeer where the key is part of the URL:
/// `https://api2.pushdeer.com/message/push?pushkey=KEY`
#[derive(Debug)]
pub struct WebhookNotifier {
    client: Client,
    url: Url,
}

impl WebhookNotifier {
    /// Create a notifier for the given webhook URL.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the HTTP client cannot be built.
    pub fn new(url: &str) -> Result<Self> {
        let url = Url::parse(url).with_context(|| format!("Invalid webhook URL: {url}"))?;
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client, url })
    }

    fn message_url(&self, message: &str) -> Url {
        let mut url = self.url.clone();
        url.query_pairs_mut().append_pair("text", message);
        url
    }
}

impl Notifier for WebhookNotifier {
    async fn notify(&self, message: &str) -> Result<()> {
        let response = self
            .client
            .post(self.message_url(message))
            .send()
            .await
            .context("Failed to send notification")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Notification failed: HTTP {status} - {body}");
        }
        Ok(())
    }
}

/// Send a message, printing a warning instead of failing.
///
/// Returns true if the message was delivered.
pub async fn send_or_warn<N: Notifier>(notifier: &N, message: &str) -> bool {
    match notifier.notify(message).await {
        Ok(()) => true,
        Err(error) => {
            print_warning!("Notification not sent: {error:#}");
            false
        }
    }
}
