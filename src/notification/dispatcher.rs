//! 通知分发器 - 解析 webhook、分类事件并路由到聊天和邮件渠道

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::channel::{ChatMessage, ChatTransport, EmailMessage, EmailTransport, SendResult};
use super::envelope::{parse_envelope, Envelope};
use super::error::Result;
use super::event::{classify, Event};
use super::formatter::MessageFormatter;
use super::template::EmailRenderer;
use crate::config::ConfigSource;

/// 一次分发的结果，两个渠道各自独立
#[derive(Debug)]
pub struct DispatchReport {
    pub event: Event,
    pub chat: Result<SendResult>,
    pub email: Result<SendResult>,
}

impl DispatchReport {
    /// 两个渠道都没有报错
    pub fn is_ok(&self) -> bool {
        self.chat.is_ok() && self.email.is_ok()
    }
}

/// 事件的两种渲染结果
#[derive(Debug)]
pub struct Rendered {
    pub chat: Option<ChatMessage>,
    pub email: Result<Option<EmailMessage>>,
}

/// 通知分发器
pub struct NotificationDispatcher {
    chat: Option<Arc<dyn ChatTransport>>,
    email: Option<Arc<dyn EmailTransport>>,
    formatter: MessageFormatter,
    renderer: EmailRenderer,
    /// 是否为 dry-run 模式
    dry_run: bool,
}

impl NotificationDispatcher {
    /// 创建新的分发器（未注册任何渠道）
    pub fn new(formatter: MessageFormatter, renderer: EmailRenderer) -> Self {
        Self {
            chat: None,
            email: None,
            formatter,
            renderer,
            dry_run: false,
        }
    }

    /// 从配置读取脱敏策略和邮件模板
    pub fn from_config(config: &dyn ConfigSource) -> Self {
        Self::new(
            MessageFormatter::from_config(config),
            EmailRenderer::from_config(config),
        )
    }

    /// 设置 dry-run 模式
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// 注册聊天渠道
    pub fn with_chat(mut self, transport: Arc<dyn ChatTransport>) -> Self {
        info!(channel = transport.name(), "Registering chat channel");
        self.chat = Some(transport);
        self
    }

    /// 注册邮件渠道
    pub fn with_email(mut self, transport: Arc<dyn EmailTransport>) -> Self {
        info!(channel = transport.name(), "Registering email channel");
        self.email = Some(transport);
        self
    }

    /// 获取已注册的渠道名称
    pub fn channel_names(&self) -> Vec<&str> {
        let chat = self.chat.as_ref().map(|c| c.name());
        let email = self.email.as_ref().map(|e| e.name());
        chat.into_iter().chain(email).collect()
    }

    /// 渲染事件但不发送
    pub fn render(&self, event: &Event) -> Rendered {
        Rendered {
            chat: self.formatter.format_event(event),
            email: self.renderer.render(event),
        }
    }

    /// 处理一次 webhook 调用
    ///
    /// envelope 或 details 解析失败时直接返回错误，不会尝试任何发送。
    pub async fn dispatch(&self, body: &[u8]) -> Result<DispatchReport> {
        let envelope = parse_envelope(body)?;
        self.dispatch_envelope(&envelope, envelope.details_raw()).await
    }

    /// 使用已解析的 envelope 和单独的 details 处理
    pub async fn dispatch_envelope(
        &self,
        envelope: &Envelope,
        details_raw: &[u8],
    ) -> Result<DispatchReport> {
        let event = classify(envelope.status(), envelope, details_raw)?;
        debug!(status = envelope.status(), campaign_id = envelope.campaign_id, "Classified webhook event");
        Ok(self.dispatch_event(event).await)
    }

    /// 并发发送到两个渠道，一个渠道失败不影响另一个
    pub async fn dispatch_event(&self, event: Event) -> DispatchReport {
        let (chat, email) = tokio::join!(self.send_chat(&event), self.send_email(&event));

        if let Err(e) = &chat {
            warn!(channel = "chat", error = %e, "Channel send failed");
        }
        if let Err(e) = &email {
            warn!(channel = "email", error = %e, "Channel send failed");
        }

        DispatchReport { event, chat, email }
    }

    async fn send_chat(&self, event: &Event) -> Result<SendResult> {
        let Some(message) = self.formatter.format_event(event) else {
            return Ok(SendResult::Skipped("no chat notification for event".to_string()));
        };
        let Some(transport) = &self.chat else {
            return Ok(SendResult::Skipped("chat channel disabled".to_string()));
        };
        if self.dry_run {
            eprintln!("[DRY-RUN] Would send to channel: {}", transport.name());
            return Ok(SendResult::Skipped("dry-run".to_string()));
        }
        transport.send(&message).await?;
        Ok(SendResult::Sent)
    }

    async fn send_email(&self, event: &Event) -> Result<SendResult> {
        let Some(transport) = &self.email else {
            return Ok(SendResult::Skipped("email channel disabled".to_string()));
        };
        let Some(message) = self.renderer.render(event)? else {
            return Ok(SendResult::Skipped("no email notification for event".to_string()));
        };
        if self.dry_run {
            eprintln!("[DRY-RUN] Would send to channel: {}", transport.name());
            return Ok(SendResult::Skipped("dry-run".to_string()));
        }
        transport.send(&message.subject, &message.body).await?;
        Ok(SendResult::Sent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::error::NotifyError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// 测试用的 mock 聊天渠道
    #[derive(Default)]
    struct MockChat {
        sent: Mutex<Vec<ChatMessage>>,
        fail: bool,
    }

    #[async_trait]
    impl ChatTransport for MockChat {
        fn name(&self) -> &str {
            "mock-chat"
        }

        async fn send(&self, message: &ChatMessage) -> Result<()> {
            if self.fail {
                return Err(NotifyError::transport("mock-chat", "boom"));
            }
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    /// 测试用的 mock 邮件渠道
    #[derive(Default)]
    struct MockEmail {
        sent: Mutex<Vec<(String, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl EmailTransport for MockEmail {
        fn name(&self) -> &str {
            "mock-email"
        }

        async fn send(&self, subject: &str, body: &str) -> Result<()> {
            if self.fail {
                return Err(NotifyError::transport("mock-email", "smtp down"));
            }
            self.sent.lock().unwrap().push((subject.to_string(), body.to_string()));
            Ok(())
        }
    }

    fn body(status: &str) -> Vec<u8> {
        serde_json::json!({
            "success": true,
            "campaign_id": 5,
            "message": status,
            "details": r#"{"payload":{"access_token_v":["xyz"],"unme":["bob"],"password":["hunter2"]},"browser":{"address":"1.2.3.4","user-agent":"UA1"}}"#,
            "email": "bob@example.com"
        })
        .to_string()
        .into_bytes()
    }

    fn dispatcher(chat: Arc<MockChat>, email: Arc<MockEmail>) -> NotificationDispatcher {
        NotificationDispatcher::new(
            MessageFormatter::new(),
            EmailRenderer::new("Clicked: {{.ID}}", "{{.Username}} submitted"),
        )
        .with_chat(chat)
        .with_email(email)
    }

    #[tokio::test]
    async fn test_click_sends_both_channels() {
        let chat = Arc::new(MockChat::default());
        let email = Arc::new(MockEmail::default());
        let report = dispatcher(chat.clone(), email.clone())
            .dispatch(&body("Clicked Link"))
            .await
            .unwrap();

        assert!(report.is_ok());
        assert_eq!(report.chat.unwrap(), SendResult::Sent);
        assert_eq!(report.email.unwrap(), SendResult::Sent);
        assert_eq!(chat.sent.lock().unwrap()[0].title, ":fish: Clicked Link");
        assert_eq!(
            email.sent.lock().unwrap()[0],
            ("PhishBot - Email Clicked".to_string(), "Clicked: xyz".to_string())
        );
    }

    #[tokio::test]
    async fn test_session_has_no_email() {
        let chat = Arc::new(MockChat::default());
        let email = Arc::new(MockEmail::default());
        let report = dispatcher(chat.clone(), email.clone())
            .dispatch(&body("Captured Session"))
            .await
            .unwrap();

        assert_eq!(report.chat.unwrap(), SendResult::Sent);
        assert!(matches!(report.email.unwrap(), SendResult::Skipped(_)));
        assert!(email.sent.lock().unwrap().is_empty());
        let sent = chat.sent.lock().unwrap();
        assert!(sent[0].field("Email").is_none());
    }

    #[tokio::test]
    async fn test_ignored_and_unknown_send_nothing() {
        for status in ["Email Sent", "Email/SMS Sent", "Something Else"] {
            let chat = Arc::new(MockChat::default());
            let email = Arc::new(MockEmail::default());
            let report = dispatcher(chat.clone(), email.clone())
                .dispatch(&body(status))
                .await
                .unwrap();

            assert!(matches!(report.chat.unwrap(), SendResult::Skipped(_)));
            assert!(matches!(report.email.unwrap(), SendResult::Skipped(_)));
            assert!(chat.sent.lock().unwrap().is_empty());
            assert!(email.sent.lock().unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn test_decode_error_sends_nothing() {
        let chat = Arc::new(MockChat::default());
        let email = Arc::new(MockEmail::default());
        let err = dispatcher(chat.clone(), email.clone())
            .dispatch(b"{")
            .await
            .unwrap_err();

        assert!(err.is_decode());
        assert!(chat.sent.lock().unwrap().is_empty());
        assert!(email.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_chat_failure_does_not_block_email() {
        let chat = Arc::new(MockChat { fail: true, ..Default::default() });
        let email = Arc::new(MockEmail::default());
        let report = dispatcher(chat, email.clone())
            .dispatch(&body("Submitted Data"))
            .await
            .unwrap();

        assert!(report.chat.unwrap_err().is_transport());
        assert_eq!(report.email.unwrap(), SendResult::Sent);
        assert_eq!(email.sent.lock().unwrap()[0].1, "bob submitted");
    }

    #[tokio::test]
    async fn test_email_failure_does_not_block_chat() {
        let chat = Arc::new(MockChat::default());
        let email = Arc::new(MockEmail { fail: true, ..Default::default() });
        let report = dispatcher(chat.clone(), email)
            .dispatch(&body("Email Opened"))
            .await
            .unwrap();

        assert_eq!(report.chat.unwrap(), SendResult::Sent);
        assert!(report.email.unwrap_err().is_transport());
        assert_eq!(chat.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_template_error_only_affects_email() {
        let chat = Arc::new(MockChat::default());
        let email = Arc::new(MockEmail::default());
        let dispatcher = NotificationDispatcher::new(
            MessageFormatter::new(),
            EmailRenderer::new("{{#if ID}}", ""),
        )
        .with_chat(chat.clone())
        .with_email(email.clone());

        let report = dispatcher.dispatch(&body("Clicked Link")).await.unwrap();
        assert_eq!(report.chat.unwrap(), SendResult::Sent);
        assert!(report.email.unwrap_err().is_template());
        assert!(email.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unregistered_channels_are_skipped() {
        let dispatcher = NotificationDispatcher::new(MessageFormatter::new(), EmailRenderer::default());
        assert!(dispatcher.channel_names().is_empty());

        let report = dispatcher.dispatch(&body("Clicked Link")).await.unwrap();
        assert_eq!(report.chat.unwrap(), SendResult::Skipped("chat channel disabled".to_string()));
        assert_eq!(report.email.unwrap(), SendResult::Skipped("email channel disabled".to_string()));
    }

    #[tokio::test]
    async fn test_dry_run() {
        let chat = Arc::new(MockChat::default());
        let email = Arc::new(MockEmail::default());
        let report = dispatcher(chat.clone(), email.clone())
            .with_dry_run(true)
            .dispatch(&body("Clicked Link"))
            .await
            .unwrap();

        assert_eq!(report.chat.unwrap(), SendResult::Skipped("dry-run".to_string()));
        assert_eq!(report.email.unwrap(), SendResult::Skipped("dry-run".to_string()));
        assert!(chat.sent.lock().unwrap().is_empty()); // 不应该实际发送
    }

    #[tokio::test]
    async fn test_dispatch_envelope_with_separate_details() {
        let chat = Arc::new(MockChat::default());
        let email = Arc::new(MockEmail::default());
        let envelope = Envelope {
            campaign_id: 1,
            message: "Clicked Link".to_string(),
            ..Default::default()
        };
        let report = dispatcher(chat.clone(), email)
            .dispatch_envelope(&envelope, br#"{"payload":"access_token_v=sep"}"#)
            .await
            .unwrap();

        assert_eq!(report.event.target().unwrap().id, "sep");
        assert_eq!(chat.sent.lock().unwrap()[0].field("ID"), Some("sep"));
    }

    #[test]
    fn test_render_without_sending() {
        let dispatcher = NotificationDispatcher::new(
            MessageFormatter::new().with_disable_credentials(true),
            EmailRenderer::new("", "{{.Password}}"),
        );
        let envelope = Envelope { email: "bob@example.com".to_string(), ..Default::default() };
        let event = classify("Submitted Data", &envelope, b"{\"payload\":\"password=hunter2\"}").unwrap();

        let rendered = dispatcher.render(&event);
        let chat = rendered.chat.unwrap();
        assert_eq!(chat.field_titles(), vec!["ID", "Address", "User Agent"]);
        assert_eq!(rendered.email.unwrap().unwrap().body, "hunter2");
    }
}
