// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of Lightwatch.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

use std::sync::Arc;

use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::api::http_client;
use crate::config::{EmailSettings, MonitorConfig, NotifierSettings, TelegramSettings};
use crate::error::{MonitorError, MonitorResult};

/// Outbound alert channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver `message`. `silent` asks the channel not to ring.
    async fn send_text(&self, message: &str, silent: bool) -> MonitorResult<()>;
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    disable_notification: bool,
}

/// Posts to a channel through the Telegram Bot API.
#[derive(Debug, Clone)]
pub struct TelegramNotifier {
    http: Client,
    settings: TelegramSettings,
}

impl TelegramNotifier {
    #[must_use]
    pub fn new(http: Client, settings: TelegramSettings) -> Self {
        Self { http, settings }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.settings.api_base.trim_end_matches('/'),
            self.settings.bot_token
        )
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send_text(&self, message: &str, silent: bool) -> MonitorResult<()> {
        let payload = SendMessage {
            chat_id: &self.settings.channel_id,
            text: message,
            disable_notification: silent,
        };

        // reqwest errors embed the URL, which carries the bot token
        let response = self
            .http
            .post(self.endpoint())
            .json(&payload)
            .send()
            .await
            .map_err(|e| MonitorError::Notify(format!("Request failed: {}", e.without_url())))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MonitorError::Notify(format!("Telegram returned {status}: {body}")));
        }

        info!(channel = %self.settings.channel_id, silent, "Telegram message sent");
        Ok(())
    }
}

/// Mails every alert to a fixed recipient list.
#[derive(Debug)]
pub struct EmailNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    recipients: Vec<String>,
}

impl EmailNotifier {
    pub fn new(config: &EmailSettings) -> MonitorResult<Self> {
        let from: Mailbox = config.from_address.parse().map_err(|e| {
            MonitorError::Config(format!("Invalid from_address {}: {e}", config.from_address))
        })?;

        let creds = Credentials::new(config.smtp_username.clone(), config.smtp_password.clone());

        let transport = if config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
                .map_err(|e| {
                    MonitorError::Config(format!(
                        "Failed to create SMTP relay {}: {e}",
                        config.smtp_host
                    ))
                })?
                .port(config.smtp_port)
                .credentials(creds)
                .build()
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
                .port(config.smtp_port)
                .credentials(creds)
                .build()
        };

        Ok(Self {
            transport,
            from,
            recipients: config.recipients.clone(),
        })
    }

    #[must_use]
    pub fn recipients(&self) -> &[String] {
        &self.recipients
    }

    fn letter(&self, to: Mailbox, message: &str) -> MonitorResult<Message> {
        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject_line(message))
            .body(message.to_owned())
            .map_err(|e| MonitorError::Notify(format!("Failed to build email message: {e}")))
    }

    async fn deliver(&self, recipient: &str, message: &str) -> Result<(), String> {
        let to: Mailbox = recipient
            .parse()
            .map_err(|e| format!("invalid address: {e}"))?;
        let letter = self.letter(to, message).map_err(|e| e.to_string())?;
        self.transport
            .send(letter)
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

/// First line of the alert, used as the mail subject.
fn subject_line(message: &str) -> &str {
    message.lines().next().unwrap_or_default().trim()
}

#[async_trait]
impl Notifier for EmailNotifier {
    /// Fails only when no recipient got the alert.
    async fn send_text(&self, message: &str, silent: bool) -> MonitorResult<()> {
        if silent {
            // e-mail has no silent delivery
            debug!("Quiet hours, sending e-mail anyway");
        }

        let mut failures = Vec::new();
        for recipient in &self.recipients {
            match self.deliver(recipient, message).await {
                Ok(()) => info!(recipient = %recipient, "Alert e-mailed"),
                Err(reason) => {
                    warn!(recipient = %recipient, error = %reason, "Alert e-mail not delivered");
                    failures.push(format!("{recipient}: {reason}"));
                }
            }
        }

        if failures.len() == self.recipients.len() {
            return Err(MonitorError::Notify(format!(
                "email was not delivered to any recipient ({})",
                failures.join("; ")
            )));
        }
        Ok(())
    }
}

/// Build the notifier selected by the configuration.
pub fn notifier_from_config(config: &MonitorConfig) -> MonitorResult<Arc<dyn Notifier>> {
    match &config.notifier {
        NotifierSettings::Telegram(settings) => {
            let http = http_client(config.schedule.request_timeout())?;
            Ok(Arc::new(TelegramNotifier::new(http, settings.clone())))
        }
        NotifierSettings::Email(settings) => Ok(Arc::new(EmailNotifier::new(settings)?)),
    }
}
