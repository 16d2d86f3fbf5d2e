//! Sheet Notify - スプレッドシートの期限・ステータスを監視して通知

pub mod config;
pub mod dateutil;
pub mod error;
pub mod matcher;
pub mod notification;
pub mod run;
pub mod sheet;

pub use config::{
    load_date_rule, load_status_rule, ChannelType, DateRule, EnvStore, FileStore, LayeredStore,
    NotificationRule, PropertyStore, RuleCommon, StatusRule,
};
pub use error::{ConfigError, DispatchError, SourceError};
pub use matcher::{match_date_rows, match_status_rows, DateMatchParams, RowData, StatusMatchParams};
pub use notification::{
    ChatResponse, ChatTransport, EmailTransport, HttpChatTransport, NotificationDispatcher,
    SendmailTransport, SheetDisplay,
};
pub use run::{check_dates_and_notify, check_status_and_notify, notify_error, run_rule, RunContext};
pub use sheet::{CellValue, MemorySheetSource, SheetHandle, SheetSource, XlsxSource};
