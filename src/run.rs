//! ルール実行のオーケストレーション
//!
//! 設定読み込み → 列データ取得 → マッチング → 通知送信を 1 本の
//! 同期パイプラインとして実行する。実行間で共有する状態はない。

use anyhow::Result;
use tracing::{info, warn};

use crate::config::{self, NotificationRule, PropertyStore};
use crate::dateutil;
use crate::matcher::{self, DateMatchParams, StatusMatchParams};
use crate::notification::{
    ChatTransport, EmailTransport, NotificationDispatcher, SheetDisplay,
};
use crate::sheet::{build_column_labels, CellValue, SheetSource};

/// 1 回の実行に注入する外部コラボレーター
pub struct RunContext<'a> {
    pub source: &'a dyn SheetSource,
    pub chat: &'a dyn ChatTransport,
    pub email: &'a dyn EmailTransport,
    pub dry_run: bool,
}

/// 期限チェックを実行して通知する。戻り値はマッチ行数
pub fn check_dates_and_notify(store: &dyn PropertyStore, ctx: &RunContext) -> Result<usize> {
    let rule = config::load_date_rule(store)?;
    info!(
        sheet = %rule.common.sheet_name,
        column = %rule.date_column,
        days = rule.days_before,
        "Starting deadline check"
    );
    run_rule(&NotificationRule::DateThreshold(rule), ctx)
}

/// ステータスチェックを実行して通知する。戻り値はマッチ行数
pub fn check_status_and_notify(store: &dyn PropertyStore, ctx: &RunContext) -> Result<usize> {
    let rule = config::load_status_rule(store)?;
    info!(
        sheet = %rule.common.sheet_name,
        columns = %rule.match_columns.join(","),
        values = %rule.match_values.join(","),
        "Starting status check"
    );
    run_rule(&NotificationRule::StatusAll(rule), ctx)
}

/// 読み込み済みルールを実行する
pub fn run_rule(rule: &NotificationRule, ctx: &RunContext) -> Result<usize> {
    let common = rule.common();

    let handle = ctx.source.resolve(&common.sheet_name)?;
    let last_row = ctx.source.last_row(&common.sheet_name)?;

    if last_row < common.start_row {
        info!(sheet = %common.sheet_name, "No data rows found in sheet");
        return Ok(0);
    }

    let notification_data = fetch_columns(
        ctx.source,
        &common.sheet_name,
        &common.notification_columns,
        common.start_row,
        last_row,
    )?;

    let rows = match rule {
        NotificationRule::DateThreshold(date_rule) => {
            let date_values = ctx.source.column_values(
                &common.sheet_name,
                &date_rule.date_column,
                common.start_row,
                last_row,
            )?;
            matcher::match_date_rows(
                &date_values,
                &notification_data,
                &DateMatchParams {
                    today: dateutil::today_in_tz(common.timezone),
                    days_before: date_rule.days_before,
                    start_row: common.start_row,
                    date_column: date_rule.date_column.clone(),
                    sheet_url: handle.url.clone(),
                },
            )
        }
        NotificationRule::StatusAll(status_rule) => {
            let condition_data = fetch_columns(
                ctx.source,
                &common.sheet_name,
                &status_rule.match_columns,
                common.start_row,
                last_row,
            )?;
            matcher::match_status_rows(
                &condition_data,
                &status_rule.match_values,
                &notification_data,
                &StatusMatchParams {
                    start_row: common.start_row,
                    anchor_column: rule.anchor_column().to_string(),
                    sheet_url: handle.url.clone(),
                },
            )
        }
    };

    if rows.is_empty() {
        info!("No matching rows found for notification");
        return Ok(0);
    }
    info!(count = rows.len(), "Found rows matching criteria");

    let sheet = SheetDisplay {
        labels: build_column_labels(ctx.source, &common.sheet_name, common.start_row),
        title: handle.title,
        url: handle.url,
    };

    NotificationDispatcher::new(ctx.chat, ctx.email)
        .with_dry_run(ctx.dry_run)
        .dispatch(common, &rows, &common.notification_title, &sheet)?;

    Ok(rows.len())
}

/// 指定された列群を同じ範囲でまとめて読む
fn fetch_columns(
    source: &dyn SheetSource,
    sheet_name: &str,
    columns: &[String],
    start_row: u32,
    end_row: u32,
) -> Result<Vec<(String, Vec<CellValue>)>, crate::error::SourceError> {
    columns
        .iter()
        .map(|column| {
            source
                .column_values(sheet_name, column, start_row, end_row)
                .map(|values| (column.clone(), values))
        })
        .collect()
}

/// 実行エラーを運用者へメール通知する（ベストエフォート）
///
/// 通知先は `ERROR_EMAIL_RECIPIENT`、未設定なら `EMAIL_RECIPIENT`。
/// この側路自体の失敗はログに落とすだけで伝播させない。
pub fn notify_error(store: &dyn PropertyStore, email: &dyn EmailTransport, error: &anyhow::Error) {
    let recipient = store
        .get("ERROR_EMAIL_RECIPIENT")
        .filter(|value| !value.is_empty())
        .or_else(|| store.get("EMAIL_RECIPIENT").filter(|value| !value.is_empty()));

    let Some(recipient) = recipient else {
        warn!("エラー通知先が未設定のためスキップ");
        return;
    };

    let subject = "[shn] 通知スクリプトエラー";
    let body = format!(
        "スクリプト実行中にエラーが発生しました。\n\nエラー内容:\n{:#}",
        error
    );

    if let Err(send_error) = email.send(&recipient, subject, &body) {
        warn!(error = %send_error, "Failed to send error notification");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DispatchError;
    use crate::notification::ChatResponse;
    use std::cell::RefCell;
    use std::collections::HashMap;

    struct NullChat;
    impl ChatTransport for NullChat {
        fn post(&self, _url: &str, _payload: &serde_json::Value) -> Result<ChatResponse, DispatchError> {
            Ok(ChatResponse { status: 200, body: String::new() })
        }
    }

    struct RecordingEmail {
        sends: RefCell<Vec<(String, String, String)>>,
        fail: bool,
    }

    impl RecordingEmail {
        fn new(fail: bool) -> Self {
            Self { sends: RefCell::new(Vec::new()), fail }
        }
    }

    impl EmailTransport for RecordingEmail {
        fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), DispatchError> {
            if self.fail {
                return Err(DispatchError::Email("mta unavailable".to_string()));
            }
            self.sends.borrow_mut().push((
                recipient.to_string(),
                subject.to_string(),
                body.to_string(),
            ));
            Ok(())
        }
    }

    #[test]
    fn test_notify_error_uses_fallback_recipient() {
        let mut store = HashMap::new();
        store.insert("EMAIL_RECIPIENT".to_string(), "ops@example.com".to_string());
        let email = RecordingEmail::new(false);

        notify_error(&store, &email, &anyhow::anyhow!("boom"));

        let sends = email.sends.borrow();
        assert_eq!(sends.len(), 1);
        assert_eq!(sends[0].0, "ops@example.com");
        assert!(sends[0].1.contains("[shn]"));
        assert!(sends[0].2.contains("boom"));
    }

    #[test]
    fn test_notify_error_prefers_dedicated_recipient() {
        let mut store = HashMap::new();
        store.insert("EMAIL_RECIPIENT".to_string(), "ops@example.com".to_string());
        store.insert("ERROR_EMAIL_RECIPIENT".to_string(), "admin@example.com".to_string());
        let email = RecordingEmail::new(false);

        notify_error(&store, &email, &anyhow::anyhow!("boom"));
        assert_eq!(email.sends.borrow()[0].0, "admin@example.com");
    }

    #[test]
    fn test_notify_error_without_recipient_is_silent() {
        let store: HashMap<String, String> = HashMap::new();
        let email = RecordingEmail::new(false);
        notify_error(&store, &email, &anyhow::anyhow!("boom"));
        assert!(email.sends.borrow().is_empty());
    }

    #[test]
    fn test_notify_error_swallows_send_failure() {
        let mut store = HashMap::new();
        store.insert("EMAIL_RECIPIENT".to_string(), "ops@example.com".to_string());
        let email = RecordingEmail::new(true);
        // パニックも伝播もしないこと
        notify_error(&store, &email, &anyhow::anyhow!("boom"));
    }

    #[test]
    fn test_run_rule_empty_sheet_returns_zero() {
        let mut store = HashMap::new();
        store.insert("WEBHOOK_URL".to_string(), "https://hooks.example.com/x".to_string());
        let rule = NotificationRule::DateThreshold(config::load_date_rule(&store).unwrap());

        let mut source = crate::sheet::MemorySheetSource::new("");
        source.add_sheet("Sheet1");
        let chat = NullChat;
        let email = RecordingEmail::new(false);
        let ctx = RunContext { source: &source, chat: &chat, email: &email, dry_run: false };

        // last_row(0) < start_row(2) → 空マッチ
        assert_eq!(run_rule(&rule, &ctx).unwrap(), 0);
    }
}
