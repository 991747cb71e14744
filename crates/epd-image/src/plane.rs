//! ビットプレーンパッキング
//!
//! 量子化済みのパレットインデックス列をデバイスが期待するビットプレーンへ
//! 詰める。1 バイト = 8 ピクセル、MSB が先頭ピクセル、行優先でピクセル列
//! 全体を連続パッキングし、末尾の端数バイトは 0 で埋める。
//!
//! ## プレーン極性（ファームウェア定義の固定規約）
//!
//! ```text
//! 黒白プレーン: bit 1 = 黒以外（白または色）、bit 0 = 黒
//! 赤プレーン:   bit 1 = 赤、bit 0 = 赤以外
//! FourColor:    パレットインデックス（2bit）の bit1 プレーン → bit0 プレーン
//! ```

use alloc::vec::Vec;

use crate::color::ColorMode;

/// 述語に従ってインデックス列を 1bpp プレーンへ詰める
fn pack_plane<F: Fn(u8) -> bool>(indices: &[u8], bit_set: F) -> Vec<u8> {
    let mut out = Vec::with_capacity(indices.len().div_ceil(8));
    let mut acc = 0u8;
    let mut filled = 0u8;

    for &idx in indices {
        acc = (acc << 1) | (bit_set(idx) as u8);
        filled += 1;
        if filled == 8 {
            out.push(acc);
            acc = 0;
            filled = 0;
        }
    }

    // 端数は上位詰めで 0 パディング
    if filled > 0 {
        out.push(acc << (8 - filled));
    }

    out
}

/// パレットインデックス列をモードのエンコード形式へ詰める
///
/// # 戻り値
/// `ColorMode::encoded_len` と常に一致する長さのバイト列
pub fn pack(mode: ColorMode, indices: &[u8]) -> Vec<u8> {
    match mode {
        ColorMode::BlackWhite => pack_plane(indices, |i| i != 0),
        ColorMode::ThreeColor => {
            // 黒白プレーンに続けて赤プレーン（転送時は別々に送られる）
            let mut out = pack_plane(indices, |i| i != 0);
            out.extend_from_slice(&pack_plane(indices, |i| i == 2));
            out
        }
        ColorMode::FourColor => {
            // インデックスのビットごとのプレーン、MSB プレーンが先
            let mut out = pack_plane(indices, |i| i & 0b10 != 0);
            out.extend_from_slice(&pack_plane(indices, |i| i & 0b01 != 0));
            out
        }
        ColorMode::SixColor => {
            // 1 ピクセル = 1 バイトのネイティブコード
            let palette = mode.palette();
            indices.iter().map(|&i| palette[i as usize].code).collect()
        }
    }
}

/// エンコード済みバイト列をパレットインデックス列へ戻す（プレビュー用）
///
/// `pack` の逆変換。パディングビットは無視される。
pub fn unpack(mode: ColorMode, data: &[u8], width: u32, height: u32) -> Vec<u8> {
    let pixels = width as usize * height as usize;
    let plane_len = pixels.div_ceil(8);

    let bit_at = |plane: &[u8], i: usize| -> u8 {
        (plane[i / 8] >> (7 - (i % 8))) & 1
    };

    match mode {
        ColorMode::BlackWhite => (0..pixels).map(|i| bit_at(data, i)).collect(),
        ColorMode::ThreeColor => {
            let (bw, red) = data.split_at(plane_len);
            (0..pixels)
                .map(|i| {
                    if bit_at(red, i) == 1 {
                        2
                    } else {
                        bit_at(bw, i)
                    }
                })
                .collect()
        }
        ColorMode::FourColor => {
            let (hi, lo) = data.split_at(plane_len);
            (0..pixels)
                .map(|i| (bit_at(hi, i) << 1) | bit_at(lo, i))
                .collect()
        }
        ColorMode::SixColor => {
            let palette = mode.palette();
            data.iter()
                .take(pixels)
                .map(|&code| {
                    palette
                        .iter()
                        .position(|p| p.code == code)
                        .unwrap_or(0) as u8
                })
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_msb_first() {
        // 先頭ピクセルが MSB: [1,0,0,0,0,0,0,1] → 0b1000_0001
        let indices = [1u8, 0, 0, 0, 0, 0, 0, 1];
        assert_eq!(pack(ColorMode::BlackWhite, &indices), alloc::vec![0x81]);
    }

    #[test]
    fn test_pack_partial_byte_zero_padded() {
        // 10 ピクセル → 2 バイト、末尾 6 ビットは 0
        let indices = [1u8; 10];
        let out = pack(ColorMode::BlackWhite, &indices);
        assert_eq!(out, alloc::vec![0xFF, 0b1100_0000]);
    }

    #[test]
    fn test_three_color_planes() {
        // 黒、白、赤、黒 → bw プレーン 0110、赤プレーン 0010
        let indices = [0u8, 1, 2, 0];
        let out = pack(ColorMode::ThreeColor, &indices);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0], 0b0110_0000); // 赤は黒以外なので bw ビットも 1
        assert_eq!(out[1], 0b0010_0000);
    }

    #[test]
    fn test_four_color_bit_planes() {
        // 黒(00), 白(01), 黄(10), 赤(11)
        let indices = [0u8, 1, 2, 3];
        let out = pack(ColorMode::FourColor, &indices);
        assert_eq!(out[0], 0b0011_0000); // bit1 プレーン
        assert_eq!(out[1], 0b0101_0000); // bit0 プレーン
    }

    #[test]
    fn test_six_color_native_codes() {
        let indices = [0u8, 1, 2, 3, 4, 5];
        let out = pack(ColorMode::SixColor, &indices);
        assert_eq!(out, alloc::vec![0x00, 0x01, 0x02, 0x03, 0x05, 0x06]);
    }

    #[test]
    fn test_unpack_inverse_of_pack() {
        let indices = [0u8, 1, 2, 0, 1, 1, 2, 0, 1, 0];
        for mode in [ColorMode::ThreeColor, ColorMode::SixColor] {
            let packed = pack(mode, &indices);
            assert_eq!(unpack(mode, &packed, 5, 2), indices, "mode={:?}", mode);
        }

        let four = [0u8, 1, 2, 3, 3, 2, 1, 0, 2];
        let packed = pack(ColorMode::FourColor, &four);
        assert_eq!(unpack(ColorMode::FourColor, &packed, 3, 3), four);
    }
}
