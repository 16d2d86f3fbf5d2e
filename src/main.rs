//! Sheet Notify CLI
//!
//! スプレッドシートの日付列・ステータス列をチェックし、該当行を
//! Slack / Discord / メールに通知する
//!
//! セットアップ手順:
//! 1. `shn set-props SHEET_NAME=台帳 DATE_COLUMN=L ...` でプロパティを設定
//!    （環境変数でも同名キーを上書きできる）
//! 2. `shn check-dates --dry-run` で内容を確認
//! 3. cron 等で `shn check-dates` を定期実行（例: 毎日午前9時）
//!
//! 主なプロパティ:
//! - SHEET_NAME: 監視するシート名
//! - WORKBOOK_PATH: 監視する xlsx ファイル（--xlsx でも指定可）
//! - DATE_COLUMN / DAYS_BEFORE_NOTIFICATION: 期限チェックの対象列と日数
//! - STATUS_MATCH_COLUMNS / STATUS_MATCH_VALUES: ステータスチェックの条件
//! - NOTIFICATION_COLUMNS: 通知に含める列（カンマ区切り）
//! - NOTIFICATION_TYPE: SLACK, DISCORD, EMAIL
//! - WEBHOOK_URL or EMAIL_RECIPIENT: 通知先

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use sheet_notify::config::{
    self, EnvStore, FileStore, LayeredStore, NotificationRule, PropertyStore,
};
use sheet_notify::notification::{HttpChatTransport, SendmailTransport};
use sheet_notify::run::{self, RunContext};
use sheet_notify::sheet::XlsxSource;

#[derive(Parser)]
#[command(name = "shn")]
#[command(about = "Sheet Notify - スプレッドシートの期限・ステータスを監視して通知")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 期限チェックを実行して通知
    CheckDates(CheckArgs),
    /// ステータスチェックを実行して通知
    CheckStatus(CheckArgs),
    /// 現在のルール設定を表示
    ShowConfig {
        /// ステータスルールを表示（デフォルトは期限ルール）
        #[arg(long)]
        status: bool,
        /// プロパティファイルのパス
        #[arg(long)]
        props: Option<PathBuf>,
    },
    /// プロパティファイルに設定を書き込む
    SetProps {
        /// KEY=VALUE 形式（複数可）
        entries: Vec<String>,
        /// プロパティファイルのパス
        #[arg(long)]
        props: Option<PathBuf>,
    },
}

#[derive(Args)]
struct CheckArgs {
    /// 監視対象の xlsx ファイル（未指定時は WORKBOOK_PATH プロパティ）
    #[arg(long)]
    xlsx: Option<PathBuf>,
    /// 送信せずに内容のみ表示
    #[arg(long)]
    dry_run: bool,
    /// プロパティファイルのパス
    #[arg(long)]
    props: Option<PathBuf>,
}

#[derive(Clone, Copy)]
enum CheckKind {
    Dates,
    Status,
}

fn main() -> Result<()> {
    // RUST_LOG で制御、デフォルト info
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("sheet_notify=info,shn=info"));

    fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::CheckDates(args) => run_check(CheckKind::Dates, args),
        Commands::CheckStatus(args) => run_check(CheckKind::Status, args),
        Commands::ShowConfig { status, props } => show_config(status, props),
        Commands::SetProps { entries, props } => set_props(entries, props),
    }
}

fn run_check(kind: CheckKind, args: CheckArgs) -> Result<()> {
    let store = build_store(args.props)?;
    let source = build_source(&store, args.xlsx)?;
    let chat = HttpChatTransport::new()?;
    let email = SendmailTransport::new();

    let ctx = RunContext {
        source: &source,
        chat: &chat,
        email: &email,
        dry_run: args.dry_run,
    };

    let result = match kind {
        CheckKind::Dates => run::check_dates_and_notify(&store, &ctx),
        CheckKind::Status => run::check_status_and_notify(&store, &ctx),
    };

    match result {
        Ok(0) => {
            info!("No rows matched, nothing sent");
            Ok(())
        }
        Ok(count) => {
            info!(matched = count, "Check completed");
            Ok(())
        }
        Err(err) => {
            error!(error = %err, "Check failed");
            // 運用者への通知はベストエフォート（dry-run では送らない）
            if !args.dry_run {
                run::notify_error(&store, &email, &err);
            }
            Err(err)
        }
    }
}

fn show_config(status: bool, props: Option<PathBuf>) -> Result<()> {
    let store = build_store(props)?;

    let rule = if status {
        NotificationRule::StatusAll(config::load_status_rule(&store)?)
    } else {
        NotificationRule::DateThreshold(config::load_date_rule(&store)?)
    };

    println!("{}", serde_json::to_string_pretty(&rule)?);
    Ok(())
}

fn set_props(entries: Vec<String>, props: Option<PathBuf>) -> Result<()> {
    if entries.is_empty() {
        return Err(anyhow!("no KEY=VALUE entries given"));
    }

    let path = props
        .or_else(FileStore::default_path)
        .ok_or_else(|| anyhow!("cannot determine property file path"))?;

    let mut map: HashMap<String, String> = if path.exists() {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?
    } else {
        HashMap::new()
    };

    for entry in &entries {
        let Some((key, value)) = entry.split_once('=') else {
            return Err(anyhow!("invalid entry \"{}\" (expected KEY=VALUE)", entry));
        };
        map.insert(key.trim().to_string(), value.to_string());
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(&path, serde_json::to_string_pretty(&map)?)
        .with_context(|| format!("failed to write {}", path.display()))?;

    info!(path = %path.display(), entries = entries.len(), "Properties saved");
    Ok(())
}

/// 環境変数を優先し、プロパティファイルに落ちる重ね合わせストアを作る
fn build_store(props: Option<PathBuf>) -> Result<LayeredStore> {
    let path = props
        .or_else(FileStore::default_path)
        .ok_or_else(|| anyhow!("cannot determine property file path"))?;
    let file_store = FileStore::load(&path)?;

    Ok(LayeredStore::new()
        .push(Box::new(EnvStore))
        .push(Box::new(file_store)))
}

fn build_source(store: &dyn PropertyStore, xlsx: Option<PathBuf>) -> Result<XlsxSource> {
    let path = xlsx
        .or_else(|| store.get("WORKBOOK_PATH").map(PathBuf::from))
        .ok_or_else(|| anyhow!("workbook path not set (use --xlsx or WORKBOOK_PATH)"))?;
    let sheet_url = store.get("SHEET_URL").unwrap_or_default();

    Ok(XlsxSource::open(&path, sheet_url)?)
}
