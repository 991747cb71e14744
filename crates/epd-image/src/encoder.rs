//! エンコードパイプラインの統合
//!
//! コントラスト調整 → ディザリング → ビットプレーンパッキングを一続きに
//! 実行し、転送レイヤーへ渡す `EncodedImage` を生成する。

use alloc::vec::Vec;

use crate::color::ColorMode;
use crate::dither::{adjust_contrast, dither_to_indices, DitherAlgorithm};
use crate::error::ImageError;
use crate::plane;

/// エンコードパラメータ
///
/// `EncodedImage` は (ピクセルバッファ, このパラメータ一式) から決定的に
/// 導出される。パラメータ変更時は常に全体を再エンコードする。
#[derive(Debug, Clone, Copy)]
pub struct EncodeOptions {
    pub mode: ColorMode,
    pub algorithm: DitherAlgorithm,
    /// ディザ強度 [0,1]（範囲外はクランプ）
    pub strength: f32,
    /// コントラスト調整 [-100,100]（範囲外はクランプ、0 で無効）
    pub contrast: f32,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        EncodeOptions {
            mode: ColorMode::BlackWhite,
            algorithm: DitherAlgorithm::FloydSteinberg,
            strength: 1.0,
            contrast: 0.0,
        }
    }
}

/// 転送時のプレーン種別
///
/// WRITE_IMG チャンクヘッダのプレーンタグはこの種別から決まる
/// （wire 上のタグ値は epd-transport が持つ）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaneKind {
    /// 黒白プレーン
    Bw,
    /// 赤プレーン（ThreeColor の第 2 転送）
    Red,
    /// 結合カラーストリーム（FourColor）
    Color,
}

impl PlaneKind {
    /// ログ/進捗表示用の識別子
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaneKind::Bw => "bw",
            PlaneKind::Red => "red",
            PlaneKind::Color => "color",
        }
    }
}

/// 1 回の論理転送となるプレーン（`EncodedImage::data` 内のスライス）
#[derive(Debug, Clone, Copy)]
pub struct TransferPlane<'a> {
    pub kind: PlaneKind,
    pub data: &'a [u8],
}

/// エンコード済み画像
///
/// 生成後は不変。`data` の構造はカラーモード依存
/// （クレートドキュメント参照）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub mode: ColorMode,
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl EncodedImage {
    /// RGBA ピクセルバッファをエンコードする
    ///
    /// # 引数
    /// - `rgba`: 長さ width * height * 4 のピクセルバッファ（行優先）
    ///
    /// # エラー
    /// - `ImageError::ZeroDimension`: 幅または高さが 0
    /// - `ImageError::BufferSizeMismatch`: バッファ長の不整合
    ///
    /// 有効な矩形入力に対しては決して失敗しない。
    pub fn encode(
        rgba: &[u8],
        width: u32,
        height: u32,
        opts: &EncodeOptions,
    ) -> Result<Self, ImageError> {
        if width == 0 || height == 0 {
            return Err(ImageError::ZeroDimension { width, height });
        }
        let expected = width as usize * height as usize * 4;
        if rgba.len() != expected {
            return Err(ImageError::BufferSizeMismatch {
                expected,
                actual: rgba.len(),
            });
        }

        let mut work = rgba.to_vec();
        adjust_contrast(&mut work, opts.contrast);
        let indices =
            dither_to_indices(&work, width, height, opts.mode, opts.algorithm, opts.strength);
        let data = plane::pack(opts.mode, &indices);

        debug_assert_eq!(data.len(), opts.mode.encoded_len(width, height));

        Ok(EncodedImage {
            mode: opts.mode,
            width,
            height,
            data,
        })
    }

    /// BLE 転送単位のプレーン分割
    ///
    /// # 戻り値
    /// - BlackWhite: `[bw]` の 1 転送
    /// - ThreeColor: `[bw, red]` の 2 転送（それぞれ独立に完結する）
    /// - FourColor: `[color]` の 1 転送（2 プレーン結合ストリーム）
    /// - SixColor: `None`（BLE 転送対象外、エクスポート専用）
    pub fn transfer_planes(&self) -> Option<Vec<TransferPlane<'_>>> {
        match self.mode {
            ColorMode::BlackWhite => Some(alloc::vec![TransferPlane {
                kind: PlaneKind::Bw,
                data: &self.data,
            }]),
            ColorMode::ThreeColor => {
                let half = self.data.len() / 2;
                Some(alloc::vec![
                    TransferPlane {
                        kind: PlaneKind::Bw,
                        data: &self.data[..half],
                    },
                    TransferPlane {
                        kind: PlaneKind::Red,
                        data: &self.data[half..],
                    },
                ])
            }
            ColorMode::FourColor => Some(alloc::vec![TransferPlane {
                kind: PlaneKind::Color,
                data: &self.data,
            }]),
            ColorMode::SixColor => None,
        }
    }

    /// プレビュー用に RGBA へ戻す
    ///
    /// ディザ結果の確認用。長さ width * height * 4 の不透明バッファを返す。
    pub fn decode_rgba(&self) -> Vec<u8> {
        let indices = plane::unpack(self.mode, &self.data, self.width, self.height);
        let palette = self.mode.palette();
        let mut rgba = Vec::with_capacity(indices.len() * 4);

        for idx in indices {
            let (r, g, b) = palette[idx as usize].rgb;
            rgba.extend_from_slice(&[r, g, b, 255]);
        }

        rgba
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn white_canvas(w: u32, h: u32) -> Vec<u8> {
        alloc::vec![255u8; (w * h * 4) as usize]
    }

    #[test]
    fn test_bw_200x200_is_5000_bytes() {
        // 仕様の検証可能性 3: 200*200/8 = 5000
        let img = EncodedImage::encode(
            &white_canvas(200, 200),
            200,
            200,
            &EncodeOptions::default(),
        )
        .unwrap();
        assert_eq!(img.data.len(), 5000);
    }

    #[test]
    fn test_three_color_double_of_bw() {
        // 仕様の検証可能性 4: ThreeColor は同寸法 BlackWhite のちょうど 2 倍
        let opts_bw = EncodeOptions::default();
        let opts_bwr = EncodeOptions {
            mode: ColorMode::ThreeColor,
            ..EncodeOptions::default()
        };
        let canvas = white_canvas(200, 200);
        let bw = EncodedImage::encode(&canvas, 200, 200, &opts_bw).unwrap();
        let bwr = EncodedImage::encode(&canvas, 200, 200, &opts_bwr).unwrap();
        assert_eq!(bwr.data.len(), bw.data.len() * 2);
    }

    #[test]
    fn test_zero_dimension_rejected() {
        let err = EncodedImage::encode(&[], 0, 10, &EncodeOptions::default()).unwrap_err();
        assert!(matches!(err, ImageError::ZeroDimension { .. }));
    }

    #[test]
    fn test_buffer_mismatch_rejected() {
        let err =
            EncodedImage::encode(&[0u8; 10], 2, 2, &EncodeOptions::default()).unwrap_err();
        assert_eq!(
            err,
            ImageError::BufferSizeMismatch {
                expected: 16,
                actual: 10
            }
        );
    }

    #[test]
    fn test_white_canvas_encodes_all_ones() {
        let img =
            EncodedImage::encode(&white_canvas(8, 1), 8, 1, &EncodeOptions::default()).unwrap();
        assert_eq!(img.data, alloc::vec![0xFF]);
    }

    #[test]
    fn test_three_color_plane_split() {
        let opts = EncodeOptions {
            mode: ColorMode::ThreeColor,
            algorithm: DitherAlgorithm::Threshold,
            strength: 0.0,
            contrast: 0.0,
        };
        let img = EncodedImage::encode(&white_canvas(16, 2), 16, 2, &opts).unwrap();
        let planes = img.transfer_planes().unwrap();

        assert_eq!(planes.len(), 2);
        assert_eq!(planes[0].kind, PlaneKind::Bw);
        assert_eq!(planes[1].kind, PlaneKind::Red);
        assert_eq!(planes[0].data.len(), planes[1].data.len());
        // 白一色: bw プレーンは全 1、赤プレーンは全 0
        assert!(planes[0].data.iter().all(|&b| b == 0xFF));
        assert!(planes[1].data.iter().all(|&b| b == 0x00));
    }

    #[test]
    fn test_six_color_not_transferable() {
        let opts = EncodeOptions {
            mode: ColorMode::SixColor,
            ..EncodeOptions::default()
        };
        let img = EncodedImage::encode(&white_canvas(4, 4), 4, 4, &opts).unwrap();
        assert_eq!(img.data.len(), 16); // 1 バイト/ピクセル
        assert!(img.transfer_planes().is_none());
    }

    #[test]
    fn test_decode_preview_roundtrip_solid() {
        // 純色キャンバスはプレビューで同じ色に戻る
        let mut rgba = Vec::new();
        for _ in 0..64 {
            rgba.extend_from_slice(&[255, 0, 0, 255]); // red
        }
        let opts = EncodeOptions {
            mode: ColorMode::ThreeColor,
            algorithm: DitherAlgorithm::Threshold,
            strength: 0.0,
            contrast: 0.0,
        };
        let img = EncodedImage::encode(&rgba, 8, 8, &opts).unwrap();
        assert_eq!(img.decode_rgba(), rgba);
    }
}
