//! # epd-transport
//!
//! エンコード済みビットプレーンの MTU 分割転送。
//!
//! ## チャンクの Wire Format
//!
//! ```text
//! [WRITE_IMG opcode: 0x30 (1 byte)]
//! [chunk_header: u8 (1 byte)]
//!   - 下位ニブル: プレーンタグ（0x0F = 黒白プレーン、0x00 = 色プレーン）
//!   - 上位ニブル: 継続フラグ（0x00 = 転送の先頭チャンク、0xF0 = 継続チャンク）
//! [bitplane bytes: chunk_size 以下]
//! ```
//!
//! ヘッダバイトのレイアウトはファームウェア定義の固定規約。
//!
//! ## フロー制御
//!
//! スループット確保のため Write Without Response を基本とし、
//! `ack_interval` チャンクごとに 1 回 Write With Response を挟んで
//! デバイスの取りこぼし・切断を検出する:
//!
//! ```text
//! ack_interval = 4 の場合:
//!   chunk 0..3  → 応答なし
//!   chunk 4     → 応答あり（デバイス確認を待つ）
//!   chunk 5..8  → 応答なし
//!   chunk 9     → 応答あり ...
//! ```
//!
//! 1 つの TransferSession のチャンク書き込みは厳密に逐次で、
//! チャンク N の write が解決するまでチャンク N+1 を開始してはならない。
//! 再開（resume）はない: 最初の書き込み失敗でセッションは中断される。

#![no_std]
extern crate alloc;

pub mod error;
pub mod session;

pub use error::TransferError;
pub use session::{Chunk, TransferProgress, TransferSession};

/// WRITE_IMG フレームのオーバーヘッド（opcode 1 + チャンクヘッダ 1）
pub const WRITE_IMG_OVERHEAD: usize = 2;

/// 黒白プレーンのタグ（チャンクヘッダ下位ニブル）
pub const PLANE_TAG_BW: u8 = 0x0F;

/// 色プレーン（赤 / 結合カラー）のタグ
pub const PLANE_TAG_COLOR: u8 = 0x00;

/// 継続チャンクのフラグ（チャンクヘッダ上位ニブル）
pub const CONTINUATION_FLAG: u8 = 0xF0;

/// 実効 MTU のデフォルト値（バイト）
/// nRF5 系の ATT_MTU 247 - ATT ヘッダ 3。`mtu=` 通知で実行時に更新される。
pub const DEFAULT_MTU: u16 = 244;

/// 応答なし書き込みを連続させる数のデフォルト
pub const DEFAULT_ACK_INTERVAL: u32 = 4;
