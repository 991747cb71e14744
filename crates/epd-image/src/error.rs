//! epd-image エラー型

/// 画像エンコードの前提条件エラー
///
/// 有効な矩形入力に対してエンコーダは決して失敗しない。
/// ここに列挙されるのは呼び出し側の入力不整合のみ。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageError {
    /// 幅または高さが 0
    ZeroDimension { width: u32, height: u32 },
    /// ピクセルバッファ長が width * height * 4 と一致しない
    BufferSizeMismatch { expected: usize, actual: usize },
}

impl core::fmt::Display for ImageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ImageError::ZeroDimension { width, height } => {
                write!(f, "Canvas dimensions must be non-zero: {}x{}", width, height)
            }
            ImageError::BufferSizeMismatch { expected, actual } => {
                write!(
                    f,
                    "Pixel buffer size mismatch: expected {} bytes (w*h*4), got {}",
                    expected, actual
                )
            }
        }
    }
}
