//! # epd-proto
//!
//! EPD コントロールプロトコルのコマンド定義とフレーミング。
//!
//! ## Wire Format
//!
//! すべてのメッセージは単一の GATT Write に収まる:
//!
//! ```text
//! [opcode: u8 (1 byte)][payload: 0..N bytes]
//! ```
//!
//! 全長はネゴシエート済みの実効 MTU（ATT_MTU - 3）以下でなければならない。
//!
//! ## ペイロード形状（opcode 固有）
//!
//! ```text
//! SET_TIME (0x20):
//!   [timestamp: u32 BE (4 bytes)][tz_offset_hours: i8 (1 byte)][mode: u8 (1 byte)]
//! WRITE_IMG (0x30):
//!   [chunk_header: u8 (1 byte)][bitplane bytes...]   → epd-transport が組み立てる
//! SET_PINS (0x00) / INIT (0x01) / SET_CONFIG (0x90):
//!   デバイス固有の設定バイト列（UI の 16進入力から）
//! ```

#![no_std]
extern crate alloc;

use alloc::vec::Vec;

pub mod error;

pub use error::ProtoError;

/// EPD ファームウェアのコマンド opcode
///
/// 値はファームウェア定義の固定タグ。WRITE_IMG はファームウェア v1.6 以降。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EpdCmd {
    /// EPD 駆動ピンの割り当て
    SetPins = 0x00,
    /// パネルドライバの初期化
    Init = 0x01,
    /// 画面全消去
    Clear = 0x02,
    /// パネルコントローラへの生コマンド転送
    SendCmd = 0x03,
    /// パネルコントローラへの生データ転送
    SendData = 0x04,
    /// 転送済みフレームバッファの表示反映
    Refresh = 0x05,
    /// パネルのディープスリープ
    Sleep = 0x06,
    /// 時刻同期（カレンダー/時計モード）
    SetTime = 0x20,
    /// 画像チャンク書き込み
    WriteImg = 0x30,
    /// デバイス設定の書き込み
    SetConfig = 0x90,
    /// システムリセット
    SysReset = 0x91,
    /// システムスリープ
    SysSleep = 0x92,
    /// 設定領域の消去
    CfgErase = 0x99,
}

impl From<EpdCmd> for u8 {
    fn from(cmd: EpdCmd) -> u8 {
        cmd as u8
    }
}

/// 1 プロトコルメッセージ = 1 Write 操作
///
/// opcode とペイロードの組。構築後は不変。
/// `to_bytes()` がそのまま GATT Write に渡すバイト列になる。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// opcode（既知の `EpdCmd` 値とは限らない。デバッグ送信用に生値を許す）
    pub opcode: u8,
    /// opcode 固有のペイロード（空可）
    pub payload: Vec<u8>,
}

impl Command {
    /// opcode とペイロードからコマンドを組み立てる
    pub fn new(cmd: EpdCmd, payload: Vec<u8>) -> Self {
        Command {
            opcode: cmd.into(),
            payload,
        }
    }

    /// ペイロードなしのコマンド
    pub fn bare(cmd: EpdCmd) -> Self {
        Command::new(cmd, Vec::new())
    }

    /// 生 opcode からのコマンド（デバッグコマンド入力欄用）
    pub fn raw(opcode: u8, payload: Vec<u8>) -> Self {
        Command { opcode, payload }
    }

    /// 16進文字列をコマンドとして解釈する（先頭バイト = opcode、残り = ペイロード）
    ///
    /// # エラー
    /// - `ProtoError::EmptyCommand`: 空入力
    /// - `ProtoError::Codec`: 16進文字列として不正
    pub fn parse_hex(hex: &str) -> Result<Self, ProtoError> {
        let bytes = epd_codec::hex_to_bytes(hex)?;
        match bytes.split_first() {
            None => Err(ProtoError::EmptyCommand),
            Some((&opcode, payload)) => Ok(Command {
                opcode,
                payload: payload.to_vec(),
            }),
        }
    }

    /// Wire Format へ変換する: `[opcode][payload...]`
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(1 + self.payload.len());
        bytes.push(self.opcode);
        bytes.extend_from_slice(&self.payload);
        bytes
    }

    /// フレーム全長（opcode 1 バイト込み）
    pub fn frame_len(&self) -> usize {
        1 + self.payload.len()
    }

    /// フレームが実効 MTU に収まるか
    pub fn fits(&self, mtu: usize) -> bool {
        self.frame_len() <= mtu
    }

    // ===== opcode 固有のビルダー =====

    /// SET_PINS: ピン割り当てバイト列を書き込む
    pub fn set_pins(pins: Vec<u8>) -> Self {
        Command::new(EpdCmd::SetPins, pins)
    }

    /// INIT: ドライバ ID を指定して初期化（None なら設定済みドライバで初期化）
    pub fn init(driver: Option<u8>) -> Self {
        match driver {
            Some(id) => Command::new(EpdCmd::Init, alloc::vec![id]),
            None => Command::bare(EpdCmd::Init),
        }
    }

    /// CLEAR: 画面消去
    pub fn clear() -> Self {
        Command::bare(EpdCmd::Clear)
    }

    /// REFRESH: 表示反映
    pub fn refresh() -> Self {
        Command::bare(EpdCmd::Refresh)
    }

    /// SLEEP: パネルスリープ
    pub fn sleep() -> Self {
        Command::bare(EpdCmd::Sleep)
    }

    /// SET_TIME: 時刻同期
    ///
    /// # 引数
    /// - `unix_secs`: Unix 時刻（秒）
    /// - `tz_offset_hours`: タイムゾーンオフセット（時間単位、符号付き）
    /// - `mode`: 表示モード（ファームウェア定義。1 = カレンダー、2 = 時計）
    pub fn set_time(unix_secs: u32, tz_offset_hours: i8, mode: u8) -> Self {
        let mut payload = Vec::with_capacity(6);
        payload.extend_from_slice(&unix_secs.to_be_bytes());
        payload.push(tz_offset_hours as u8);
        payload.push(mode);
        Command::new(EpdCmd::SetTime, payload)
    }

    /// WRITE_IMG: 画像チャンク（チャンクヘッダはペイロード先頭バイト）
    pub fn write_img(chunk_header: u8, data: &[u8]) -> Self {
        let mut payload = Vec::with_capacity(1 + data.len());
        payload.push(chunk_header);
        payload.extend_from_slice(data);
        Command::new(EpdCmd::WriteImg, payload)
    }

    /// SET_CONFIG: 設定バイト列の書き込み
    pub fn set_config(config: Vec<u8>) -> Self {
        Command::new(EpdCmd::SetConfig, config)
    }

    /// SYS_RESET: システムリセット
    pub fn sys_reset() -> Self {
        Command::bare(EpdCmd::SysReset)
    }

    /// SYS_SLEEP: システムスリープ
    pub fn sys_sleep() -> Self {
        Command::bare(EpdCmd::SysSleep)
    }

    /// CFG_ERASE: 設定領域の消去
    pub fn cfg_erase() -> Self {
        Command::bare(EpdCmd::CfgErase)
    }
}
