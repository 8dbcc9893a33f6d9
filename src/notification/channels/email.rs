//! SMTP 邮件渠道

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{error, info};

use crate::config::{keys, ConfigSource, Settings};
use crate::notification::channel::EmailTransport;
use crate::notification::error::{NotifyError, Result};

const CHANNEL_NAME: &str = "email";
const DEFAULT_PORT: u16 = 587;
/// 隐式 TLS 端口，其他端口走 STARTTLS（服务端支持时）
const SMTPS_PORT: u16 = 465;

/// SMTP 配置
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub sender: String,
    /// 收件人，多个用逗号分隔
    pub recipient: String,
}

impl EmailConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            host: settings.get_string(keys::EMAIL_HOST),
            port: settings.get_u16(keys::EMAIL_PORT).unwrap_or(DEFAULT_PORT),
            username: settings.get_string(keys::EMAIL_USERNAME),
            password: settings.get_string(keys::EMAIL_PASSWORD),
            sender: settings.get_string(keys::EMAIL_SENDER),
            recipient: settings.get_string(keys::EMAIL_RECIPIENT),
        }
    }

    fn recipients(&self) -> Result<Vec<Mailbox>> {
        let recipients = self
            .recipient
            .split(',')
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(|r| {
                r.parse::<Mailbox>()
                    .map_err(|e| NotifyError::Config(format!("invalid email.recipient {:?}: {}", r, e)))
            })
            .collect::<Result<Vec<_>>>()?;
        if recipients.is_empty() {
            return Err(NotifyError::Config("email.recipient is required".to_string()));
        }
        Ok(recipients)
    }
}

/// SMTP 邮件渠道
pub struct EmailChannel {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: Mailbox,
    recipients: Vec<Mailbox>,
}

impl EmailChannel {
    pub fn new(config: &EmailConfig) -> Result<Self> {
        if config.host.is_empty() {
            return Err(NotifyError::Config("email.host is required".to_string()));
        }
        let sender = config
            .sender
            .parse::<Mailbox>()
            .map_err(|e| NotifyError::Config(format!("invalid email.sender {:?}: {}", config.sender, e)))?;
        let recipients = config.recipients()?;

        let tls_parameters = TlsParameters::new(config.host.clone())
            .map_err(|e| NotifyError::Config(format!("invalid TLS parameters: {}", e)))?;
        let tls = if config.port == SMTPS_PORT {
            Tls::Wrapper(tls_parameters)
        } else {
            Tls::Opportunistic(tls_parameters)
        };

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
            .port(config.port)
            .tls(tls);
        if !config.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ));
        }

        Ok(Self {
            transport: builder.build(),
            sender,
            recipients,
        })
    }

    /// 构建邮件（HTML 正文）
    pub fn build_message(&self, subject: &str, body: &str) -> Result<Message> {
        let mut builder = Message::builder().from(self.sender.clone()).subject(subject);
        for recipient in &self.recipients {
            builder = builder.to(recipient.clone());
        }
        builder
            .header(ContentType::TEXT_HTML)
            .body(body.to_string())
            .map_err(|e| NotifyError::transport(CHANNEL_NAME, e))
    }
}

#[async_trait]
impl EmailTransport for EmailChannel {
    fn name(&self) -> &str {
        CHANNEL_NAME
    }

    async fn send(&self, subject: &str, body: &str) -> Result<()> {
        let message = self.build_message(subject, body)?;
        match self.transport.send(message).await {
            Ok(_) => {
                info!(channel = CHANNEL_NAME, subject, recipients = self.recipients.len(), "Email sent successfully");
                Ok(())
            }
            Err(e) => {
                error!(channel = CHANNEL_NAME, subject, error = %e, "Failed to send email");
                Err(NotifyError::transport(CHANNEL_NAME, e))
            }
        }
    }
}
