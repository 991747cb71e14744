//! # epd-image
//!
//! キャンバスのピクセルデータを EPD ネイティブのビットプレーン表現へ変換する。
//!
//! ## 変換パイプライン
//!
//! ```text
//! RGBA ピクセルバッファ
//!   → (1) コントラスト調整（チャンネルごと、[0,255] にクランプ）
//!   → (2) ディザリング（パレットへの量子化: 閾値 / Bayer / 誤差拡散）
//!   → (3) ビットプレーンパッキング（1 バイト = 8 ピクセル、MSB が先頭）
//! ```
//!
//! ## カラーモードと出力形式
//!
//! ```text
//! BlackWhite: 1 プレーン (1bpp)。長さ = ceil(w*h/8)
//! ThreeColor: 黒白プレーン ++ 赤プレーン。長さ = 2 * ceil(w*h/8)
//!             （転送時は bw / red の 2 つの論理転送に分かれる）
//! FourColor:  パレットインデックスの bit1 プレーン ++ bit0 プレーン。
//!             長さ = 2 * ceil(w*h/8)。単一の color 転送で送る
//! SixColor:   1 ピクセル = 1 バイト（パネルネイティブコード）。
//!             エクスポート/プレビュー専用で BLE 転送対象外
//! ```
//!
//! 出力長は (width, height, カラーモード) だけで決まる。
//! 同一入力パラメータに対して決定的で、部分更新はない（常に全再エンコード）。

#![no_std]
extern crate alloc;

pub mod color;
pub mod dither;
pub mod encoder;
pub mod error;
pub mod export;
pub mod plane;

pub use color::{ColorMode, PaletteEntry};
pub use dither::DitherAlgorithm;
pub use encoder::{EncodeOptions, EncodedImage, PlaneKind, TransferPlane};
pub use error::ImageError;
