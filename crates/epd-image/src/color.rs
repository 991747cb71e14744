//! カラーモードとパレット定義

/// パレットの 1 エントリ
///
/// `code` はパネルファームウェアが期待するネイティブ値。
/// 1/2bpp モードではパレットインデックスと一致するが、
/// SixColor はパネル定義の飛び値（0x05, 0x06）を持つ。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaletteEntry {
    /// 表示色（sRGB）
    pub rgb: (u8, u8, u8),
    /// パネルネイティブコード
    pub code: u8,
}

const fn entry(r: u8, g: u8, b: u8, code: u8) -> PaletteEntry {
    PaletteEntry { rgb: (r, g, b), code }
}

/// 黒白パレット
static PALETTE_BW: [PaletteEntry; 2] = [
    entry(0, 0, 0, 0),       // black
    entry(255, 255, 255, 1), // white
];

/// 黒白赤パレット
static PALETTE_BWR: [PaletteEntry; 3] = [
    entry(0, 0, 0, 0),
    entry(255, 255, 255, 1),
    entry(255, 0, 0, 2), // red
];

/// 4 色パレット（インデックス = 2bpp 値: 黒 0, 白 1, 黄 2, 赤 3）
static PALETTE_FOUR: [PaletteEntry; 4] = [
    entry(0, 0, 0, 0),
    entry(255, 255, 255, 1),
    entry(255, 255, 0, 2), // yellow
    entry(255, 0, 0, 3),
];

/// 6 色パレット（Spectra 6 系パネルのネイティブコード）
static PALETTE_SIX: [PaletteEntry; 6] = [
    entry(0, 0, 0, 0x00),
    entry(255, 255, 255, 0x01),
    entry(255, 255, 0, 0x02),
    entry(255, 0, 0, 0x03),
    entry(0, 0, 255, 0x05), // blue
    entry(0, 255, 0, 0x06), // green
];

/// EPD パネルのカラーモード
///
/// 文字列表現は Web UI 側のモード識別子と一致させてある。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    /// 黒白 1bpp
    BlackWhite,
    /// 黒白赤（2 プレーン、個別転送）
    ThreeColor,
    /// 黒白黄赤（2 プレーン、結合転送）
    FourColor,
    /// 6 色（エクスポート専用、1 バイト/ピクセル）
    SixColor,
}

impl ColorMode {
    /// UI 識別子からのパース
    pub fn parse(s: &str) -> Option<ColorMode> {
        match s {
            "blackWhiteColor" => Some(ColorMode::BlackWhite),
            "threeColor" => Some(ColorMode::ThreeColor),
            "fourColor" => Some(ColorMode::FourColor),
            "sixColor" => Some(ColorMode::SixColor),
            _ => None,
        }
    }

    /// UI 識別子
    pub fn as_str(&self) -> &'static str {
        match self {
            ColorMode::BlackWhite => "blackWhiteColor",
            ColorMode::ThreeColor => "threeColor",
            ColorMode::FourColor => "fourColor",
            ColorMode::SixColor => "sixColor",
        }
    }

    /// モードのパレット
    pub fn palette(&self) -> &'static [PaletteEntry] {
        match self {
            ColorMode::BlackWhite => &PALETTE_BW,
            ColorMode::ThreeColor => &PALETTE_BWR,
            ColorMode::FourColor => &PALETTE_FOUR,
            ColorMode::SixColor => &PALETTE_SIX,
        }
    }

    /// エンコード出力のプレーン数（SixColor はプレーン構造を持たない）
    pub fn plane_count(&self) -> usize {
        match self {
            ColorMode::BlackWhite => 1,
            ColorMode::ThreeColor | ColorMode::FourColor => 2,
            ColorMode::SixColor => 0,
        }
    }

    /// エンコード出力の全長（バイト）
    ///
    /// プレーンは行をまたいで連続パッキングされるため、
    /// 端数は出力末尾の 1 バイトにのみ生じる。
    pub fn encoded_len(&self, width: u32, height: u32) -> usize {
        let pixels = width as usize * height as usize;
        let plane_len = pixels.div_ceil(8);
        match self {
            ColorMode::BlackWhite => plane_len,
            ColorMode::ThreeColor | ColorMode::FourColor => plane_len * 2,
            ColorMode::SixColor => pixels,
        }
    }

    /// エクスポートヘッダの colorMode 定数
    /// （6色=0, 4色=1, 黒白=2, 黒白赤=3。ダウンロード形式の互換値）
    pub fn export_tag(&self) -> u8 {
        match self {
            ColorMode::SixColor => 0,
            ColorMode::FourColor => 1,
            ColorMode::BlackWhite => 2,
            ColorMode::ThreeColor => 3,
        }
    }
}

/// パレット中の最近傍色のインデックスを返す（ユークリッド距離の二乗で比較）
pub fn nearest(palette: &[PaletteEntry], r: i32, g: i32, b: i32) -> usize {
    let mut best = 0usize;
    let mut best_dist = i64::MAX;

    for (i, p) in palette.iter().enumerate() {
        let dr = r - p.rgb.0 as i32;
        let dg = g - p.rgb.1 as i32;
        let db = b - p.rgb.2 as i32;
        let dist = (dr as i64) * (dr as i64) + (dg as i64) * (dg as i64) + (db as i64) * (db as i64);
        if dist < best_dist {
            best_dist = dist;
            best = i;
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_roundtrip() {
        for mode in [
            ColorMode::BlackWhite,
            ColorMode::ThreeColor,
            ColorMode::FourColor,
            ColorMode::SixColor,
        ] {
            assert_eq!(ColorMode::parse(mode.as_str()), Some(mode));
        }
        assert_eq!(ColorMode::parse("sevenColor"), None);
    }

    #[test]
    fn test_encoded_len() {
        // 200x200 1bpp → 5000 バイト
        assert_eq!(ColorMode::BlackWhite.encoded_len(200, 200), 5000);
        // ThreeColor は同寸法の黒白のちょうど 2 倍
        assert_eq!(ColorMode::ThreeColor.encoded_len(200, 200), 10000);
        assert_eq!(ColorMode::FourColor.encoded_len(200, 200), 10000);
        // SixColor は 1 バイト/ピクセル
        assert_eq!(ColorMode::SixColor.encoded_len(200, 200), 40000);
        // 8 で割り切れないピクセル数は末尾 1 バイトに端数
        assert_eq!(ColorMode::BlackWhite.encoded_len(250, 122), 3813); // 30500/8 = 3812.5
    }

    #[test]
    fn test_nearest_exact_colors() {
        let pal = ColorMode::ThreeColor.palette();
        assert_eq!(nearest(pal, 0, 0, 0), 0);
        assert_eq!(nearest(pal, 255, 255, 255), 1);
        assert_eq!(nearest(pal, 255, 0, 0), 2);
        // 暗いグレーは黒へ
        assert_eq!(nearest(pal, 60, 60, 60), 0);
    }

    #[test]
    fn test_six_color_native_codes() {
        let pal = ColorMode::SixColor.palette();
        // 青と緑はパネル定義の飛び値
        assert_eq!(pal[4].code, 0x05);
        assert_eq!(pal[5].code, 0x06);
    }
}
