//! # epd-wasm
//!
//! wasm-bindgen エクスポート: ブラウザ UI から呼び出す公開 API。
//!
//! BLE そのもの（requestDevice / GATT 接続 / Write / Notify）は JS 側が
//! `BleLink` / `BleEndpoint` インターフェースとして実装し、プロトコル・
//! エンコード・接続状態機械はすべて Rust 側が持つ。
//!
//! ## 使用方法（TypeScript）
//!
//! ```typescript
//! import init, { EpdClient, initPanicHook, encodeImage } from './pkg/epd_wasm';
//!
//! await init();
//! initPanicHook();
//!
//! // JS 側で Web Bluetooth を BleLink として実装する
//! const link = {
//!   requestDevice: async () => { ... },        // navigator.bluetooth.requestDevice
//!   connectGatt:   async () => { ... },        // device.gatt.connect()
//!   disconnect:    () => device.gatt.disconnect(),
//!   getCharacteristic: async (service, chr) => ({   // BleEndpoint を返す
//!     write: (bytes, withResponse) => withResponse
//!       ? characteristic.writeValueWithResponse(bytes)
//!       : characteristic.writeValueWithoutResponse(bytes),
//!     subscribe: async (callback) => {
//!       await characteristic.startNotifications();
//!       characteristic.addEventListener('characteristicvaluechanged',
//!         (ev) => callback(new Uint8Array(ev.target.value.buffer)));
//!     },
//!   }),
//!   readCharacteristic: async (service, chr) => { ... },  // Uint8Array を返す
//!   onDisconnected: (callback) =>
//!     device.addEventListener('gattserverdisconnected', callback),
//! };
//!
//! const client = new EpdClient(link);
//! client.setLogSink((action, text) => appendLog(action, text));
//! client.setProgressSink((json) => updateStatus(JSON.parse(json)));
//!
//! await client.connect();
//! const rgba = ctx.getImageData(0, 0, canvas.width, canvas.height).data;
//! await client.sendImage(rgba, canvas.width, canvas.height,
//!                        'threeColor', 'floydSteinberg', 1.0, 0.0);
//! ```

use js_sys::Uint8Array;
use wasm_bindgen::prelude::*;

use epd_image::{ColorMode, DitherAlgorithm, EncodeOptions, EncodedImage};

pub mod client;

pub use client::EpdClient;

/// パニック時にブラウザコンソールにスタックトレースを出力する
///
/// 開発時に必ず呼び出すこと。本番ビルドでは feature flag で無効化可能。
#[wasm_bindgen(js_name = "initPanicHook")]
pub fn init_panic_hook() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

fn parse_encode_options(
    mode: &str,
    algorithm: &str,
    strength: f32,
    contrast: f32,
) -> Result<EncodeOptions, JsError> {
    let mode = ColorMode::parse(mode)
        .ok_or_else(|| JsError::new(&format!("Unknown color mode: {}", mode)))?;
    Ok(EncodeOptions {
        mode,
        algorithm: DitherAlgorithm::parse(algorithm),
        strength,
        contrast,
    })
}

/// キャンバスの RGBA ピクセルをデバイスのビットプレーン表現へエンコードする
///
/// 接続なしで使える純粋関数（プレビューとダウンロードが主用途）。
/// 引数は `EpdClient::sendImage` と同じ。
#[wasm_bindgen(js_name = "encodeImage")]
pub fn encode_image(
    rgba: &[u8],
    width: u32,
    height: u32,
    mode: &str,
    algorithm: &str,
    strength: f32,
    contrast: f32,
) -> Result<Uint8Array, JsError> {
    let opts = parse_encode_options(mode, algorithm, strength, contrast)?;
    let image = EncodedImage::encode(rgba, width, height, &opts)
        .map_err(|e| JsError::new(&e.to_string()))?;

    let arr = Uint8Array::new_with_length(image.data.len() as u32);
    arr.copy_from(&image.data);
    Ok(arr)
}

/// エンコード済みデータをプレビュー用 RGBA に戻す
///
/// `encodeImage` の出力（または同形式のバイト列）をキャンバスに描き戻す。
///
/// # エラー
/// - データ長が (width, height, mode) から導かれる長さと一致しない
#[wasm_bindgen(js_name = "decodePreview")]
pub fn decode_preview(
    data: &[u8],
    width: u32,
    height: u32,
    mode: &str,
) -> Result<Uint8Array, JsError> {
    let mode = ColorMode::parse(mode)
        .ok_or_else(|| JsError::new(&format!("Unknown color mode: {}", mode)))?;

    let expected = mode.encoded_len(width, height);
    if data.len() != expected {
        return Err(JsError::new(&format!(
            "Encoded data length mismatch: expected {} bytes, got {}",
            expected,
            data.len()
        )));
    }

    let image = EncodedImage {
        mode,
        width,
        height,
        data: data.to_vec(),
    };
    let rgba = image.decode_rgba();

    let arr = Uint8Array::new_with_length(rgba.len() as u32);
    arr.copy_from(&rgba);
    Ok(arr)
}

/// RGBA ピクセルをエンコードして C 配列ソースとして書き出す
///
/// ダウンロードボタンの出力（`imagedata.h`）。
#[wasm_bindgen(js_name = "exportImageSource")]
pub fn export_image_source(
    rgba: &[u8],
    width: u32,
    height: u32,
    mode: &str,
    algorithm: &str,
    strength: f32,
    contrast: f32,
) -> Result<String, JsError> {
    let opts = parse_encode_options(mode, algorithm, strength, contrast)?;
    let image = EncodedImage::encode(rgba, width, height, &opts)
        .map_err(|e| JsError::new(&e.to_string()))?;
    Ok(epd_image::export::to_c_array(&image))
}

/// 16進文字列を Uint8Array に変換するユーティリティ（UI の入力検証用）
#[wasm_bindgen(js_name = "hexToBytes")]
pub fn hex_to_bytes(hex: &str) -> Result<Uint8Array, JsError> {
    let bytes = epd_codec::hex_to_bytes(hex).map_err(|e| JsError::new(&e.to_string()))?;
    let arr = Uint8Array::new_with_length(bytes.len() as u32);
    arr.copy_from(&bytes);
    Ok(arr)
}

/// バイト列を小文字 16進文字列に変換するユーティリティ
#[wasm_bindgen(js_name = "bytesToHex")]
pub fn bytes_to_hex(data: &[u8]) -> String {
    epd_codec::bytes_to_hex(data)
}

/// 整数をリトルエンディアンの 16進文字列にエンコードするユーティリティ
///
/// デバッグコマンド欄でオフセット等を手組みするときに使う。
#[wasm_bindgen(js_name = "intToLeHex")]
pub fn int_to_le_hex(value: u64, byte_width: usize) -> Result<String, JsError> {
    epd_codec::int_to_le_hex(value, byte_width).map_err(|e| JsError::new(&e.to_string()))
}
