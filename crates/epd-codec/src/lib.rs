//! # epd-codec
//!
//! バイト列⇄16進文字列の変換と、リトルエンディアン整数エンコード。
//!
//! EPD コントローラのすべてのコマンド経路で使用される基礎ユーティリティ。
//! UI の 16進入力欄（ピン設定・デバッグコマンド）、通知ログの整形、
//! チャンクオフセットのエンコードが主な利用箇所。
//!
//! ## 変換の性質
//!
//! - `bytes_to_hex(hex_to_bytes(s)) == lowercase(s)`
//!   （偶数長の well-formed な 16進文字列すべてについて成立）
//! - `int_from_le_hex(int_to_le_hex(n, w)) == n`
//!   （`n < 2^(8*w)` のすべてについて成立）

#![no_std]
extern crate alloc;

pub mod error;
pub mod hex;

pub use error::CodecError;
pub use hex::{bytes_to_hex, hex_to_bytes, int_from_le_hex, int_to_le_hex};
