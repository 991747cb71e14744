//! C 配列ソースへのエクスポート
//!
//! エンコード済み画像データをファームウェアに埋め込める C ソース断片として
//! 書き出す（ダウンロード機能の出力形式）。
//!
//! ```text
//! const uint8_t imageData[] PROGMEM = {
//! 0x00, 0x01, ... (1 行 16 バイト)
//! };
//! const uint16_t imageWidth = 200;
//! const uint16_t imageHeight = 200;
//! const uint8_t colorMode = 2;
//! ```

use alloc::string::String;
use core::fmt::Write;

use crate::encoder::EncodedImage;

/// エンコード済み画像を C 配列ソースへ整形する
pub fn to_c_array(img: &EncodedImage) -> String {
    // "0xNN, " 6 文字/バイト + ヘッダ/フッタぶんの余裕
    let mut out = String::with_capacity(img.data.len() * 6 + 128);

    out.push_str("const uint8_t imageData[] PROGMEM = {\n");

    for (i, b) in img.data.iter().enumerate() {
        if i > 0 {
            if i % 16 == 0 {
                out.push_str(",\n");
            } else {
                out.push_str(", ");
            }
        }
        let _ = write!(out, "0x{:02x}", b);
    }

    let _ = write!(
        out,
        "\n}};\nconst uint16_t imageWidth = {};\nconst uint16_t imageHeight = {};\nconst uint8_t colorMode = {};\n",
        img.width,
        img.height,
        img.mode.export_tag()
    );

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::ColorMode;
    use alloc::vec::Vec;

    fn sample(len: usize, mode: ColorMode) -> EncodedImage {
        EncodedImage {
            mode,
            width: 16,
            height: 8,
            data: (0..len).map(|i| i as u8).collect::<Vec<u8>>(),
        }
    }

    #[test]
    fn test_header_and_constants() {
        let img = sample(16, ColorMode::BlackWhite);
        let src = to_c_array(&img);
        assert!(src.starts_with("const uint8_t imageData[] PROGMEM = {\n"));
        assert!(src.contains("const uint16_t imageWidth = 16;"));
        assert!(src.contains("const uint16_t imageHeight = 8;"));
        assert!(src.contains("const uint8_t colorMode = 2;"));
    }

    #[test]
    fn test_sixteen_bytes_per_line() {
        let img = sample(20, ColorMode::BlackWhite);
        let src = to_c_array(&img);
        let body: &str = src
            .split("{\n")
            .nth(1)
            .unwrap()
            .split("\n}")
            .next()
            .unwrap();
        let lines: Vec<&str> = body.split(",\n").collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].matches("0x").count(), 16);
        assert_eq!(lines[1].matches("0x").count(), 4);
        // 行末にぶら下がりカンマはない
        assert!(!body.ends_with(','));
    }

    #[test]
    fn test_byte_formatting() {
        let img = EncodedImage {
            mode: ColorMode::ThreeColor,
            width: 4,
            height: 2,
            data: alloc::vec![0x00, 0xAB],
        };
        let src = to_c_array(&img);
        assert!(src.contains("0x00, 0xab"));
        assert!(src.contains("const uint8_t colorMode = 3;"));
    }
}
