//! # epd-link
//!
//! GATT 接続のライフサイクル管理と、デバイス通知の分類。
//!
//! ## 接続状態機械
//!
//! ```text
//! Idle --scan--> Scanning --deviceFound--> Connecting --gattConnected-->
//!   DiscoveringServices --servicesReady--> Ready
//!
//! Ready --切断イベント--> (自動再接続判定)
//!   失敗カウンタ < 5 → Reconnecting（300ms 後に再試行）
//!   失敗カウンタ = 5 → Disconnected（終端。手動の connect が必要、カウンタは 0 へ）
//!
//! 手動 disconnect → 常に Disconnected（自動再接続しない）
//! ```
//!
//! 再接続は再帰ではなく、カウンタ + タイマーで駆動する明示的なループ。
//! 上限はテスト可能な定数 `MAX_RECONNECT_TRIES`。
//!
//! ## 通知の分類
//!
//! 購読開始後の最初の通知は設定エコー（ピンマップ + ドライバ ID）、
//! 以降は UTF-8 テキスト（`mtu=<n>` / `t=<unix秒>` / その他ログ行）。
//! 不正なペイロードは分類不能としてログに落とすだけで、決して失敗しない。

#![no_std]
extern crate alloc;

pub mod error;
pub mod router;
pub mod state;

pub use error::LinkError;
pub use router::{DeviceConfig, DeviceMessage, NotificationRouter};
pub use state::{ConnectionManager, ConnectionState, ReconnectDecision};

/// EPD 表示サービスの UUID
pub const EPD_SERVICE_UUID: &str = "62750001-d828-918d-fb46-b6c11c675aec";

/// EPD コントロールキャラクタリスティック（Write + Notify）
pub const EPD_CHARACTERISTIC_UUID: &str = "62750002-d828-918d-fb46-b6c11c675aec";

/// ファームウェアバージョンキャラクタリスティック（Read、存在しない場合あり）
pub const VERSION_CHARACTERISTIC_UUID: &str = "62750003-d828-918d-fb46-b6c11c675aec";

/// 補助シリアル（NUS）サービスの UUID
pub const RXTX_SERVICE_UUID: &str = "6e400001-b5a3-f393-e0a9-e50e24dcca9e";

/// 補助シリアルの Notify キャラクタリスティック
pub const RXTX_CHARACTERISTIC_UUID: &str = "6e400003-b5a3-f393-e0a9-e50e24dcca9e";

/// 自動再接続の上限（連続失敗回数）
pub const MAX_RECONNECT_TRIES: u32 = 5;

/// 再接続までの待ち時間（ミリ秒）
pub const RECONNECT_DELAY_MS: u64 = 300;

/// バージョンキャラクタリスティックがないファームウェアの既定バージョン
pub const FALLBACK_APP_VERSION: u8 = 0x15;
