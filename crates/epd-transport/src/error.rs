//! epd-transport エラー型

/// 転送セッション構成のエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    /// MTU からプロトコルオーバーヘッドを引いた余地がない
    ChunkSizeTooSmall { mtu: u16 },
    /// チャンクサイズ 0 が指定された
    ZeroChunkSize,
    /// このカラーモードは BLE 転送をサポートしない（SixColor はエクスポート専用）
    NotTransferable,
}

impl core::fmt::Display for TransferError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            TransferError::ChunkSizeTooSmall { mtu } => {
                write!(f, "MTU {} leaves no room for chunk payload", mtu)
            }
            TransferError::ZeroChunkSize => write!(f, "Chunk size must be non-zero"),
            TransferError::NotTransferable => {
                write!(f, "Color mode is export-only and cannot be transferred")
            }
        }
    }
}
