//! epd-proto エラー型

use epd_codec::CodecError;

/// コマンド解釈のエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtoError {
    /// 空のコマンド入力（opcode がない）
    EmptyCommand,
    /// 16進文字列として不正
    Codec(CodecError),
}

impl From<CodecError> for ProtoError {
    fn from(e: CodecError) -> Self {
        ProtoError::Codec(e)
    }
}

impl core::fmt::Display for ProtoError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ProtoError::EmptyCommand => write!(f, "Empty command: opcode byte required"),
            ProtoError::Codec(e) => write!(f, "Invalid command hex: {}", e),
        }
    }
}
