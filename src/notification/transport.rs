//! 送信トランスポート
//!
//! 外部への実送信だけを担う薄い層。コアからは trait 越しに注入され、
//! テストではモックに差し替える。

use std::io::Write as _;
use std::process::{Command, Stdio};
use std::time::Duration;

use crate::error::DispatchError;

/// Webhook 応答（ステータスコードと本文）
#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub status: u16,
    pub body: String,
}

/// チャット Webhook トランスポート
pub trait ChatTransport {
    fn post(&self, url: &str, payload: &serde_json::Value) -> Result<ChatResponse, DispatchError>;
}

/// メールトランスポート
pub trait EmailTransport {
    fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), DispatchError>;
}

/// reqwest (blocking) による Webhook 送信
pub struct HttpChatTransport {
    client: reqwest::blocking::Client,
}

impl HttpChatTransport {
    /// クライアントを生成する（タイムアウト 30 秒）
    pub fn new() -> Result<Self, DispatchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|error| DispatchError::Http(error.to_string()))?;
        Ok(Self { client })
    }
}

impl ChatTransport for HttpChatTransport {
    fn post(&self, url: &str, payload: &serde_json::Value) -> Result<ChatResponse, DispatchError> {
        let response = self
            .client
            .post(url)
            .json(payload)
            .send()
            .map_err(|error| DispatchError::Http(error.to_string()))?;

        let status = response.status().as_u16();
        let body = response.text().unwrap_or_default();
        Ok(ChatResponse { status, body })
    }
}

/// sendmail コマンドによるメール送信
///
/// ヘッダー込みのメッセージを標準入力で渡す（`sendmail -t`）。
pub struct SendmailTransport {
    sendmail_cmd: String,
}

impl SendmailTransport {
    pub fn new() -> Self {
        Self {
            sendmail_cmd: "sendmail".to_string(),
        }
    }

    /// コマンドパスを指定する
    pub fn with_command(mut self, cmd: impl Into<String>) -> Self {
        self.sendmail_cmd = cmd.into();
        self
    }

    fn build_message(recipient: &str, subject: &str, body: &str) -> String {
        format!(
            "To: {}\nSubject: {}\nMIME-Version: 1.0\nContent-Type: text/plain; charset=UTF-8\n\n{}\n",
            recipient, subject, body
        )
    }
}

impl Default for SendmailTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl EmailTransport for SendmailTransport {
    fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), DispatchError> {
        let message = Self::build_message(recipient, subject, body);

        let mut child = Command::new(&self.sendmail_cmd)
            .arg("-t")
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|error| DispatchError::Email(error.to_string()))?;

        if let Some(stdin) = child.stdin.as_mut() {
            stdin
                .write_all(message.as_bytes())
                .map_err(|error| DispatchError::Email(error.to_string()))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|error| DispatchError::Email(error.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DispatchError::Email(stderr.trim().to_string()));
        }

        Ok(())
    }
}
