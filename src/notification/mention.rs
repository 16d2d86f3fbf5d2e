//! メンション文字列の組み立て
//!
//! 設定された ID をチャンネル固有のメンション記法に変換する。
//! - Slack: ユーザー `<@U...>`、ユーザーグループ `<!subteam^S...>`
//! - Discord: ユーザー `<@123...>`、ロール `<@&987...>`
//!
//! 空の結果は「メンション行を出さない」の意味。呼び出し側が空文字列を
//! そのまま本文に入れてはならない。

use crate::config::RuleCommon;

/// Slack 用メンション文字列を組み立てる（複数対応）
pub fn slack_mention_text(common: &RuleCommon) -> String {
    let mut parts = Vec::new();
    for id in &common.slack_mention_user_ids {
        parts.push(format!("<@{}>", id));
    }
    for id in &common.slack_mention_group_ids {
        parts.push(format!("<!subteam^{}>", id));
    }
    parts.join(" ").trim().to_string()
}

/// Discord 用メンション文字列を組み立てる（複数対応）
pub fn discord_mention_text(common: &RuleCommon) -> String {
    let mut parts = Vec::new();
    for id in &common.discord_mention_user_ids {
        parts.push(format!("<@{}>", id));
    }
    for id in &common.discord_mention_role_ids {
        parts.push(format!("<@&{}>", id));
    }
    parts.join(" ").trim().to_string()
}
