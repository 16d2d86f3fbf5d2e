//! 通知分発器 - チャンネル種別でレンダラーを選び、トランスポートに渡す
//!
//! マッチ行が空のときは何もしない（エラーではない）。送信の成否判定は
//! チャンネルごとに異なる: Slack は 200 のみ、Discord は 200/204、
//! メールはトランスポートの例外。

use tracing::info;

use super::discord::build_discord_payload;
use super::email::build_email_body;
use super::mention::{discord_mention_text, slack_mention_text};
use super::slack::build_slack_payload;
use super::transport::{ChatTransport, EmailTransport};
use super::SheetDisplay;
use crate::config::{ChannelType, RuleCommon};
use crate::error::DispatchError;
use crate::matcher::RowData;

/// 通知分発器
pub struct NotificationDispatcher<'a> {
    chat: &'a dyn ChatTransport,
    email: &'a dyn EmailTransport,
    dry_run: bool,
}

impl<'a> NotificationDispatcher<'a> {
    pub fn new(chat: &'a dyn ChatTransport, email: &'a dyn EmailTransport) -> Self {
        Self {
            chat,
            email,
            dry_run: false,
        }
    }

    /// dry-run モードを設定する（描画とログのみ、送信しない）
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// マッチ行を設定されたチャンネルへ送信する
    pub fn dispatch(
        &self,
        common: &RuleCommon,
        rows: &[RowData],
        title: &str,
        sheet: &SheetDisplay,
    ) -> Result<(), DispatchError> {
        if rows.is_empty() {
            info!("No rows to notify");
            return Ok(());
        }

        match common.channel {
            ChannelType::Slack => self.send_slack(common, rows, title, sheet),
            ChannelType::Discord => self.send_discord(common, rows, title, sheet),
            ChannelType::Email => self.send_email(common, rows, title),
        }?;

        info!(channel = common.channel.as_str(), count = rows.len(), "Notification sent");
        Ok(())
    }

    fn send_slack(
        &self,
        common: &RuleCommon,
        rows: &[RowData],
        title: &str,
        sheet: &SheetDisplay,
    ) -> Result<(), DispatchError> {
        let mention = slack_mention_text(common);
        let payload = build_slack_payload(title, rows, &mention, sheet);
        let payload =
            serde_json::to_value(&payload).map_err(|error| DispatchError::Encode(error.to_string()))?;

        if self.dry_run {
            eprintln!("[DRY-RUN] Would post to Slack webhook");
            eprintln!("[DRY-RUN] Payload: {}", pretty(&payload));
            return Ok(());
        }

        let response = self.chat.post(&common.webhook_url, &payload)?;
        if response.status != 200 {
            return Err(DispatchError::HttpStatus {
                channel: "Slack",
                status: response.status,
                body: response.body,
            });
        }
        Ok(())
    }

    fn send_discord(
        &self,
        common: &RuleCommon,
        rows: &[RowData],
        title: &str,
        sheet: &SheetDisplay,
    ) -> Result<(), DispatchError> {
        let mention = discord_mention_text(common);
        let payload = build_discord_payload(
            title,
            rows,
            &mention,
            !common.discord_mention_user_ids.is_empty(),
            !common.discord_mention_role_ids.is_empty(),
            sheet,
        );
        let payload =
            serde_json::to_value(&payload).map_err(|error| DispatchError::Encode(error.to_string()))?;

        if self.dry_run {
            eprintln!("[DRY-RUN] Would post to Discord webhook");
            eprintln!("[DRY-RUN] Payload: {}", pretty(&payload));
            return Ok(());
        }

        let response = self.chat.post(&common.webhook_url, &payload)?;
        if response.status != 200 && response.status != 204 {
            return Err(DispatchError::HttpStatus {
                channel: "Discord",
                status: response.status,
                body: response.body,
            });
        }
        Ok(())
    }

    fn send_email(
        &self,
        common: &RuleCommon,
        rows: &[RowData],
        title: &str,
    ) -> Result<(), DispatchError> {
        let body = build_email_body(title, rows, common.timezone);

        if self.dry_run {
            eprintln!("[DRY-RUN] Would send email to {}", common.email_recipient);
            eprintln!("[DRY-RUN] Subject: {}", common.email_subject);
            eprintln!("[DRY-RUN] Body:\n{}", body);
            return Ok(());
        }

        self.email
            .send(&common.email_recipient, &common.email_subject, &body)
    }
}

fn pretty(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::transport::ChatResponse;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// 送信内容を記録するモックトランスポート
    struct MockChat {
        status: u16,
        body: String,
        posts: RefCell<Vec<(String, serde_json::Value)>>,
    }

    impl MockChat {
        fn with_status(status: u16) -> Self {
            Self {
                status,
                body: String::new(),
                posts: RefCell::new(Vec::new()),
            }
        }

        fn post_count(&self) -> usize {
            self.posts.borrow().len()
        }
    }

    impl ChatTransport for MockChat {
        fn post(
            &self,
            url: &str,
            payload: &serde_json::Value,
        ) -> Result<ChatResponse, DispatchError> {
            self.posts.borrow_mut().push((url.to_string(), payload.clone()));
            Ok(ChatResponse {
                status: self.status,
                body: self.body.clone(),
            })
        }
    }

    struct MockEmail {
        sends: RefCell<Vec<(String, String, String)>>,
    }

    impl MockEmail {
        fn new() -> Self {
            Self {
                sends: RefCell::new(Vec::new()),
            }
        }

        fn send_count(&self) -> usize {
            self.sends.borrow().len()
        }
    }

    impl EmailTransport for MockEmail {
        fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), DispatchError> {
            self.sends.borrow_mut().push((
                recipient.to_string(),
                subject.to_string(),
                body.to_string(),
            ));
            Ok(())
        }
    }

    fn common(channel: ChannelType) -> RuleCommon {
        RuleCommon {
            sheet_name: "Sheet1".to_string(),
            sheet_url: String::new(),
            notification_title: "t".to_string(),
            slack_mention_user_ids: vec![],
            slack_mention_group_ids: vec![],
            discord_mention_user_ids: vec![],
            discord_mention_role_ids: vec![],
            notification_columns: vec!["D".to_string()],
            channel,
            webhook_url: "https://hooks.example.com/x".to_string(),
            email_recipient: "ops@example.com".to_string(),
            email_subject: "期限通知".to_string(),
            timezone: chrono_tz::Asia::Tokyo,
            start_row: 2,
        }
    }

    fn sheet() -> SheetDisplay {
        SheetDisplay {
            title: "Sheet1".to_string(),
            url: "https://example.com/s".to_string(),
            labels: HashMap::new(),
        }
    }

    fn one_row() -> Vec<RowData> {
        vec![RowData {
            row_number: 2,
            date: "2024/03/02".to_string(),
            columns: vec![("D".to_string(), "Alice".to_string())],
            row_url: String::new(),
        }]
    }

    #[test]
    fn test_dispatch_empty_rows_skips_transport() {
        let chat = MockChat::with_status(200);
        let email = MockEmail::new();
        let dispatcher = NotificationDispatcher::new(&chat, &email);

        dispatcher
            .dispatch(&common(ChannelType::Slack), &[], "t", &sheet())
            .unwrap();
        assert_eq!(chat.post_count(), 0);
        assert_eq!(email.send_count(), 0);
    }

    #[test]
    fn test_dispatch_slack_posts_to_webhook() {
        let chat = MockChat::with_status(200);
        let email = MockEmail::new();
        let dispatcher = NotificationDispatcher::new(&chat, &email);

        dispatcher
            .dispatch(&common(ChannelType::Slack), &one_row(), "t", &sheet())
            .unwrap();
        assert_eq!(chat.post_count(), 1);

        let posts = chat.posts.borrow();
        assert_eq!(posts[0].0, "https://hooks.example.com/x");
        assert!(posts[0].1.get("blocks").is_some());
    }

    #[test]
    fn test_dispatch_slack_rejects_non_200() {
        let chat = MockChat {
            status: 500,
            body: "internal error".to_string(),
            posts: RefCell::new(Vec::new()),
        };
        let email = MockEmail::new();
        let dispatcher = NotificationDispatcher::new(&chat, &email);

        let result = dispatcher.dispatch(&common(ChannelType::Slack), &one_row(), "t", &sheet());
        assert!(matches!(
            result,
            Err(DispatchError::HttpStatus {
                channel: "Slack",
                status: 500,
                ..
            })
        ));
    }

    #[test]
    fn test_dispatch_discord_accepts_204() {
        let chat = MockChat::with_status(204);
        let email = MockEmail::new();
        let dispatcher = NotificationDispatcher::new(&chat, &email);

        dispatcher
            .dispatch(&common(ChannelType::Discord), &one_row(), "t", &sheet())
            .unwrap();
        assert_eq!(chat.post_count(), 1);
    }

    #[test]
    fn test_dispatch_discord_rejects_404() {
        let chat = MockChat::with_status(404);
        let email = MockEmail::new();
        let dispatcher = NotificationDispatcher::new(&chat, &email);

        let result = dispatcher.dispatch(&common(ChannelType::Discord), &one_row(), "t", &sheet());
        assert!(matches!(
            result,
            Err(DispatchError::HttpStatus {
                channel: "Discord",
                ..
            })
        ));
    }

    #[test]
    fn test_dispatch_email_uses_recipient_and_subject() {
        let chat = MockChat::with_status(200);
        let email = MockEmail::new();
        let dispatcher = NotificationDispatcher::new(&chat, &email);

        dispatcher
            .dispatch(&common(ChannelType::Email), &one_row(), "【期限】", &sheet())
            .unwrap();
        assert_eq!(chat.post_count(), 0);
        assert_eq!(email.send_count(), 1);

        let sends = email.sends.borrow();
        assert_eq!(sends[0].0, "ops@example.com");
        assert_eq!(sends[0].1, "期限通知");
        assert!(sends[0].2.contains("[D列] Alice"));
    }

    #[test]
    fn test_dry_run_never_touches_transport() {
        let chat = MockChat::with_status(200);
        let email = MockEmail::new();
        let dispatcher = NotificationDispatcher::new(&chat, &email).with_dry_run(true);

        dispatcher
            .dispatch(&common(ChannelType::Slack), &one_row(), "t", &sheet())
            .unwrap();
        dispatcher
            .dispatch(&common(ChannelType::Email), &one_row(), "t", &sheet())
            .unwrap();
        assert_eq!(chat.post_count(), 0);
        assert_eq!(email.send_count(), 0);
    }
}
