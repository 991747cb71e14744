//! epd-link エラー型

use alloc::string::String;

/// 接続・転送経路のエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    /// Ready な接続がない状態での操作
    Unavailable,
    /// トランスポート層の書き込み失敗（原因メッセージ付き）
    WriteRejected(String),
    /// サービス/キャラクタリスティック解決の失敗
    Discovery(String),
    /// 別の接続試行が進行中（Idle / Disconnected 以外からの scan）
    ConnectInProgress,
    /// 画像転送が進行中（同時転送は禁止）
    TransferInFlight,
}

impl core::fmt::Display for LinkError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            LinkError::Unavailable => {
                write!(f, "No ready connection: connect to a device first")
            }
            LinkError::WriteRejected(cause) => write!(f, "Write rejected: {}", cause),
            LinkError::Discovery(cause) => write!(f, "Service discovery failed: {}", cause),
            LinkError::ConnectInProgress => {
                write!(f, "A connection attempt is already in progress")
            }
            LinkError::TransferInFlight => {
                write!(f, "An image transfer is already in flight")
            }
        }
    }
}
