//! 通知ルーター
//!
//! EPD キャラクタリスティックからの Notify を分類する。
//!
//! ## ペイロード形式
//!
//! ```text
//! 購読後の最初の通知（設定エコー）:
//!   [pins: 7 bytes][driver_id: 1 byte][reserved: 2 bytes][extra_pin: 1 byte (長さ > 10 のときのみ)]
//!
//! 2 通目以降（UTF-8 テキスト）:
//!   "mtu=<10進整数>"   → MTU 更新
//!   "t=<Unix秒>"       → デバイス時刻エコー
//!   その他             → ログ行としてそのまま表示
//! ```
//!
//! 分類は (通知インデックス, バイト列) からの純粋関数で、
//! 不明・不正なペイロードでも決して失敗しない（Unknown として返す）。

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use serde::Serialize;

/// 設定エコーの内容（ピンマップ + ドライバ ID）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceConfig {
    /// EPD 駆動ピンの割り当て（7 バイト）
    pub pins: Vec<u8>,
    /// パネルドライバ ID
    pub driver_id: u8,
    /// 拡張ピン（ペイロード長が 10 を超える場合のみ存在）
    pub extra_pin: Option<u8>,
}

impl DeviceConfig {
    /// UI のピン設定欄に入る 16進文字列（拡張ピンがあれば末尾に連結）
    pub fn pins_hex(&self) -> String {
        let mut hex = epd_codec::bytes_to_hex(&self.pins);
        if let Some(extra) = self.extra_pin {
            hex.push_str(&epd_codec::bytes_to_hex(&[extra]));
        }
        hex
    }

    /// UI のドライバ欄に入る 16進文字列
    pub fn driver_hex(&self) -> String {
        epd_codec::bytes_to_hex(&[self.driver_id])
    }
}

/// 分類済みのデバイスメッセージ
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum DeviceMessage {
    /// 設定エコー（最初の通知）
    ConfigEcho(DeviceConfig),
    /// 実効 MTU の更新通知
    MtuUpdate(u16),
    /// デバイス時刻のエコー（Unix 秒）
    TimeEcho(u64),
    /// 既知プレフィクスに一致しないテキスト
    Text(String),
    /// 分類不能（非 UTF-8、または短すぎる設定エコー）
    Unknown(Vec<u8>),
}

/// 通知インデックスを数える分類器
///
/// 購読ごとに 1 インスタンス。再購読時は `reset()` すること
/// （最初の通知だけが設定エコーとして扱われるため）。
#[derive(Debug)]
pub struct NotificationRouter {
    msg_index: u32,
}

impl NotificationRouter {
    pub fn new() -> Self {
        NotificationRouter { msg_index: 0 }
    }

    /// 再購読時のリセット（次の通知が再び設定エコーになる）
    pub fn reset(&mut self) {
        self.msg_index = 0;
    }

    /// 受信済み通知の数
    pub fn msg_index(&self) -> u32 {
        self.msg_index
    }

    /// 通知を 1 件分類する
    pub fn route(&mut self, data: &[u8]) -> DeviceMessage {
        let index = self.msg_index;
        self.msg_index += 1;

        if index == 0 {
            return Self::parse_config_echo(data);
        }

        match core::str::from_utf8(data) {
            Ok(text) => Self::parse_text(text),
            Err(_) => DeviceMessage::Unknown(data.to_vec()),
        }
    }

    fn parse_config_echo(data: &[u8]) -> DeviceMessage {
        if data.len() < 8 {
            return DeviceMessage::Unknown(data.to_vec());
        }

        DeviceMessage::ConfigEcho(DeviceConfig {
            pins: data[..7].to_vec(),
            driver_id: data[7],
            // バイト 8..10 は予約領域、長さ 11 以上で拡張ピンが続く
            extra_pin: if data.len() > 10 { Some(data[10]) } else { None },
        })
    }

    /// テキスト通知のみを分類する（設定エコーのインデックス管理なし）
    ///
    /// 補助シリアルサービスなど、設定エコーを持たないストリーム用。
    pub fn route_text(data: &[u8]) -> DeviceMessage {
        match core::str::from_utf8(data) {
            Ok(text) => Self::parse_text(text),
            Err(_) => DeviceMessage::Unknown(data.to_vec()),
        }
    }

    fn parse_text(text: &str) -> DeviceMessage {
        if let Some(rest) = text.strip_prefix("mtu=") {
            if let Ok(mtu) = rest.trim().parse::<u16>() {
                return DeviceMessage::MtuUpdate(mtu);
            }
        }
        if let Some(rest) = text.strip_prefix("t=") {
            if let Ok(secs) = rest.trim().parse::<u64>() {
                return DeviceMessage::TimeEcho(secs);
            }
        }
        DeviceMessage::Text(text.to_string())
    }
}

impl Default for NotificationRouter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_notification_is_config_echo() {
        let mut router = NotificationRouter::new();
        let payload = [1u8, 2, 3, 4, 5, 6, 7, 0x03, 0, 0];

        match router.route(&payload) {
            DeviceMessage::ConfigEcho(cfg) => {
                assert_eq!(cfg.pins, alloc::vec![1, 2, 3, 4, 5, 6, 7]);
                assert_eq!(cfg.driver_id, 0x03);
                assert_eq!(cfg.extra_pin, None);
                assert_eq!(cfg.pins_hex(), "01020304050607");
                assert_eq!(cfg.driver_hex(), "03");
            }
            other => panic!("設定エコーと分類されるべき: {:?}", other),
        }
    }

    /// 仕様の検証可能性 9: 11 バイトで extra_pin を読む、10 バイトでは読まない
    #[test]
    fn test_extra_pin_boundary() {
        let mut router = NotificationRouter::new();
        let long = [1u8, 2, 3, 4, 5, 6, 7, 8, 0, 0, 0x2A];
        match router.route(&long) {
            DeviceMessage::ConfigEcho(cfg) => {
                assert_eq!(cfg.extra_pin, Some(0x2A));
                assert_eq!(cfg.pins_hex(), "010203040506072a");
            }
            other => panic!("{:?}", other),
        }

        router.reset();
        let short = [1u8, 2, 3, 4, 5, 6, 7, 8, 0, 0];
        match router.route(&short) {
            DeviceMessage::ConfigEcho(cfg) => assert_eq!(cfg.extra_pin, None),
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn test_short_config_echo_is_unknown() {
        let mut router = NotificationRouter::new();
        let msg = router.route(&[1, 2, 3]);
        assert_eq!(msg, DeviceMessage::Unknown(alloc::vec![1, 2, 3]));
    }

    #[test]
    fn test_mtu_update() {
        let mut router = NotificationRouter::new();
        let _ = router.route(&[0u8; 10]); // 設定エコーを消費

        assert_eq!(router.route(b"mtu=247"), DeviceMessage::MtuUpdate(247));
    }

    #[test]
    fn test_time_echo() {
        let mut router = NotificationRouter::new();
        let _ = router.route(&[0u8; 10]);

        assert_eq!(
            router.route(b"t=1700000000"),
            DeviceMessage::TimeEcho(1_700_000_000)
        );
    }

    #[test]
    fn test_unmatched_text_surfaced_verbatim() {
        let mut router = NotificationRouter::new();
        let _ = router.route(&[0u8; 10]);

        assert_eq!(
            router.route(b"refresh done"),
            DeviceMessage::Text("refresh done".to_string())
        );
        // プレフィクスだけ一致して数値が壊れている場合もテキスト扱い
        assert_eq!(
            router.route(b"mtu=abc"),
            DeviceMessage::Text("mtu=abc".to_string())
        );
    }

    #[test]
    fn test_invalid_utf8_never_panics() {
        let mut router = NotificationRouter::new();
        let _ = router.route(&[0u8; 10]);

        let bad = [0xFFu8, 0xFE, 0x80];
        assert_eq!(router.route(&bad), DeviceMessage::Unknown(bad.to_vec()));
    }

    #[test]
    fn test_route_text_has_no_config_echo() {
        // 補助ストリームの最初のメッセージもテキストとして分類される
        assert_eq!(
            NotificationRouter::route_text(b"mtu=103"),
            DeviceMessage::MtuUpdate(103)
        );
        assert_eq!(
            NotificationRouter::route_text(b"boot ok"),
            DeviceMessage::Text("boot ok".to_string())
        );
    }

    #[test]
    fn test_reset_restores_config_echo_handling() {
        let mut router = NotificationRouter::new();
        let _ = router.route(&[0u8; 10]);
        let _ = router.route(b"mtu=100");
        assert_eq!(router.msg_index(), 2);

        router.reset();
        // リセット後の最初の通知は再び設定エコー
        assert!(matches!(
            router.route(&[9u8, 9, 9, 9, 9, 9, 9, 1, 0, 0]),
            DeviceMessage::ConfigEcho(_)
        ));
    }
}
