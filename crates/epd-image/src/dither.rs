//! コントラスト調整とディザリング
//!
//! 連続階調の RGBA ピクセルをカラーモードのパレットへ量子化する。
//! アルゴリズムは閾値（量子化のみ）、Bayer 8x8 の組織的ディザ、
//! および 2 種の誤差拡散（Floyd-Steinberg / Atkinson）。
//!
//! `strength` は [0,1] で、組織的ディザでは閾値振幅、誤差拡散では
//! 伝播する誤差の割合をスケールする。0 で閾値量子化と等価になる。

use alloc::vec;
use alloc::vec::Vec;

use crate::color::{nearest, ColorMode};

/// ディザリングアルゴリズム
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DitherAlgorithm {
    /// 最近傍量子化のみ（ディザなし）
    Threshold,
    /// Bayer 8x8 組織的ディザ
    Bayer,
    /// Floyd-Steinberg 誤差拡散
    FloydSteinberg,
    /// Atkinson 誤差拡散（誤差の 6/8 のみ伝播、ハイライトが飛びやすい）
    Atkinson,
}

impl DitherAlgorithm {
    /// UI 識別子からのパース（不明な識別子は閾値にフォールバック）
    pub fn parse(s: &str) -> DitherAlgorithm {
        match s {
            "bayer" => DitherAlgorithm::Bayer,
            "floydSteinberg" => DitherAlgorithm::FloydSteinberg,
            "atkinson" => DitherAlgorithm::Atkinson,
            _ => DitherAlgorithm::Threshold,
        }
    }

    /// UI 識別子
    pub fn as_str(&self) -> &'static str {
        match self {
            DitherAlgorithm::Threshold => "none",
            DitherAlgorithm::Bayer => "bayer",
            DitherAlgorithm::FloydSteinberg => "floydSteinberg",
            DitherAlgorithm::Atkinson => "atkinson",
        }
    }
}

/// Bayer 8x8 閾値マップ（値域 0..63）
static BAYER_8X8: [[u8; 8]; 8] = [
    [0, 32, 8, 40, 2, 34, 10, 42],
    [48, 16, 56, 24, 50, 18, 58, 26],
    [12, 44, 4, 36, 14, 46, 6, 38],
    [60, 28, 52, 20, 62, 30, 54, 22],
    [3, 35, 11, 43, 1, 33, 9, 41],
    [51, 19, 59, 27, 49, 17, 57, 25],
    [15, 47, 7, 39, 13, 45, 5, 37],
    [63, 31, 55, 23, 61, 29, 53, 21],
];

/// RGBA バッファのコントラストをチャンネルごとに調整する（in place）
///
/// # 引数
/// - `contrast`: [-100, 100]（範囲外はクランプ）。0 で恒等変換
///
/// 標準的な 259 係数の線形コントラスト式。結果は [0,255] にクランプされる。
pub fn adjust_contrast(rgba: &mut [u8], contrast: f32) {
    let c = contrast.clamp(-100.0, 100.0);
    if c == 0.0 {
        return;
    }

    let factor = (259.0 * (c + 255.0)) / (255.0 * (259.0 - c));

    for px in rgba.chunks_exact_mut(4) {
        for ch in px.iter_mut().take(3) {
            let v = factor * (*ch as f32 - 128.0) + 128.0;
            *ch = v.clamp(0.0, 255.0) as u8;
        }
    }
}

/// RGBA ピクセルをパレットインデックス列へ量子化する
///
/// # 引数
/// - `rgba`: width * height * 4 バイトのピクセルバッファ（検証済み前提）
/// - `strength`: [0,1]（範囲外はクランプ）
///
/// # 戻り値
/// 1 ピクセルにつき 1 つのパレットインデックス（行優先、長さ w*h）
pub fn dither_to_indices(
    rgba: &[u8],
    width: u32,
    height: u32,
    mode: ColorMode,
    algorithm: DitherAlgorithm,
    strength: f32,
) -> Vec<u8> {
    let strength = strength.clamp(0.0, 1.0);
    match algorithm {
        DitherAlgorithm::Threshold => quantize(rgba, width, height, mode),
        DitherAlgorithm::Bayer => ordered(rgba, width, height, mode, strength),
        DitherAlgorithm::FloydSteinberg => {
            error_diffusion(rgba, width, height, mode, strength, &FS_KERNEL, 16.0)
        }
        DitherAlgorithm::Atkinson => {
            error_diffusion(rgba, width, height, mode, strength, &ATKINSON_KERNEL, 8.0)
        }
    }
}

fn quantize(rgba: &[u8], width: u32, height: u32, mode: ColorMode) -> Vec<u8> {
    let palette = mode.palette();
    let pixels = width as usize * height as usize;
    let mut indices = Vec::with_capacity(pixels);

    for px in rgba.chunks_exact(4).take(pixels) {
        indices.push(nearest(palette, px[0] as i32, px[1] as i32, px[2] as i32) as u8);
    }

    indices
}

fn ordered(rgba: &[u8], width: u32, height: u32, mode: ColorMode, strength: f32) -> Vec<u8> {
    let palette = mode.palette();
    let w = width as usize;
    let h = height as usize;
    let mut indices = Vec::with_capacity(w * h);

    for y in 0..h {
        for x in 0..w {
            let i = (y * w + x) * 4;
            // 閾値マップを [-0.5, +0.5) に正規化して振幅 255*strength で加算
            let m = BAYER_8X8[y & 7][x & 7] as f32;
            let offset = ((m + 0.5) / 64.0 - 0.5) * 255.0 * strength;

            let r = (rgba[i] as f32 + offset) as i32;
            let g = (rgba[i + 1] as f32 + offset) as i32;
            let b = (rgba[i + 2] as f32 + offset) as i32;
            indices.push(nearest(palette, r, g, b) as u8);
        }
    }

    indices
}

/// 誤差拡散カーネル: (dx, dy, weight)。weight は divisor 分の 1
type Kernel = [(i32, i32, f32)];

/// Floyd-Steinberg: 右 7/16、左下 3/16、下 5/16、右下 1/16
static FS_KERNEL: [(i32, i32, f32); 4] = [(1, 0, 7.0), (-1, 1, 3.0), (0, 1, 5.0), (1, 1, 1.0)];

/// Atkinson: 6 近傍へ各 1/8（計 6/8 のみ伝播）
static ATKINSON_KERNEL: [(i32, i32, f32); 6] = [
    (1, 0, 1.0),
    (2, 0, 1.0),
    (-1, 1, 1.0),
    (0, 1, 1.0),
    (1, 1, 1.0),
    (0, 2, 1.0),
];

fn error_diffusion(
    rgba: &[u8],
    width: u32,
    height: u32,
    mode: ColorMode,
    strength: f32,
    kernel: &Kernel,
    divisor: f32,
) -> Vec<u8> {
    let palette = mode.palette();
    let w = width as usize;
    let h = height as usize;

    // 作業バッファ: チャンネルごとの f32（誤差の持ち越しで 0..255 を超え得る）
    let mut buf: Vec<f32> = vec![0.0; w * h * 3];
    for (i, px) in rgba.chunks_exact(4).take(w * h).enumerate() {
        buf[i * 3] = px[0] as f32;
        buf[i * 3 + 1] = px[1] as f32;
        buf[i * 3 + 2] = px[2] as f32;
    }

    let mut indices = Vec::with_capacity(w * h);

    for y in 0..h {
        for x in 0..w {
            let p = (y * w + x) * 3;
            let r = buf[p].clamp(0.0, 255.0) as i32;
            let g = buf[p + 1].clamp(0.0, 255.0) as i32;
            let b = buf[p + 2].clamp(0.0, 255.0) as i32;

            let idx = nearest(palette, r, g, b);
            indices.push(idx as u8);

            let chosen = palette[idx].rgb;
            let err = [
                (buf[p] - chosen.0 as f32) * strength,
                (buf[p + 1] - chosen.1 as f32) * strength,
                (buf[p + 2] - chosen.2 as f32) * strength,
            ];

            for &(dx, dy, weight) in kernel {
                let nx = x as i32 + dx;
                let ny = y as i32 + dy;
                if nx < 0 || nx >= w as i32 || ny >= h as i32 {
                    continue;
                }
                let np = (ny as usize * w + nx as usize) * 3;
                let scale = weight / divisor;
                buf[np] += err[0] * scale;
                buf[np + 1] += err[1] * scale;
                buf[np + 2] += err[2] * scale;
            }
        }
    }

    indices
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_rgba(w: usize, h: usize, rgb: (u8, u8, u8)) -> Vec<u8> {
        let mut v = Vec::with_capacity(w * h * 4);
        for _ in 0..w * h {
            v.extend_from_slice(&[rgb.0, rgb.1, rgb.2, 255]);
        }
        v
    }

    #[test]
    fn test_contrast_identity_at_zero() {
        let mut rgba = solid_rgba(2, 2, (10, 120, 250));
        let orig = rgba.clone();
        adjust_contrast(&mut rgba, 0.0);
        assert_eq!(rgba, orig);
    }

    #[test]
    fn test_contrast_spreads_from_midpoint() {
        let mut rgba = solid_rgba(1, 2, (100, 200, 128));
        adjust_contrast(&mut rgba, 50.0);
        // 中間値 128 は不動、128 未満は下へ、超は上へ
        assert!(rgba[0] < 100);
        assert!(rgba[1] > 200);
        assert_eq!(rgba[2], 128);
        // アルファは不変
        assert_eq!(rgba[3], 255);
    }

    #[test]
    fn test_contrast_clamps_extremes() {
        let mut rgba = solid_rgba(1, 1, (5, 250, 0));
        adjust_contrast(&mut rgba, 100.0);
        assert_eq!(rgba[0], 0);
        assert_eq!(rgba[1], 255);
    }

    #[test]
    fn test_threshold_solid_colors() {
        let rgba = solid_rgba(4, 4, (250, 5, 5));
        let idx = dither_to_indices(
            &rgba,
            4,
            4,
            ColorMode::ThreeColor,
            DitherAlgorithm::Threshold,
            0.5,
        );
        assert_eq!(idx.len(), 16);
        assert!(idx.iter().all(|&i| i == 2), "ほぼ純赤はすべて赤インデックスへ");
    }

    #[test]
    fn test_bayer_midgray_mixes_black_and_white() {
        let rgba = solid_rgba(8, 8, (128, 128, 128));
        let idx = dither_to_indices(
            &rgba,
            8,
            8,
            ColorMode::BlackWhite,
            DitherAlgorithm::Bayer,
            1.0,
        );
        let whites = idx.iter().filter(|&&i| i == 1).count();
        // 50% グレーは黒白が混在するはず（閾値のみなら全 1 色になる）
        assert!(whites > 8 && whites < 56, "white={}/64", whites);
    }

    #[test]
    fn test_error_diffusion_preserves_average_tone() {
        // 25% グレーの平均階調が黒白比でおおむね保存される
        let rgba = solid_rgba(16, 16, (64, 64, 64));
        let idx = dither_to_indices(
            &rgba,
            16,
            16,
            ColorMode::BlackWhite,
            DitherAlgorithm::FloydSteinberg,
            1.0,
        );
        let whites = idx.iter().filter(|&&i| i == 1).count();
        let ratio = whites as f32 / 256.0;
        assert!((0.10..=0.40).contains(&ratio), "white ratio = {}", ratio);
    }

    #[test]
    fn test_zero_strength_equals_threshold() {
        let rgba = solid_rgba(8, 8, (100, 100, 100));
        let a = dither_to_indices(
            &rgba,
            8,
            8,
            ColorMode::BlackWhite,
            DitherAlgorithm::FloydSteinberg,
            0.0,
        );
        let b = dither_to_indices(
            &rgba,
            8,
            8,
            ColorMode::BlackWhite,
            DitherAlgorithm::Threshold,
            0.0,
        );
        assert_eq!(a, b);
    }

    #[test]
    fn test_parse_fallback() {
        assert_eq!(DitherAlgorithm::parse("bayer"), DitherAlgorithm::Bayer);
        assert_eq!(DitherAlgorithm::parse("unknown"), DitherAlgorithm::Threshold);
    }
}
