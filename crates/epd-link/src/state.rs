//! 接続状態機械
//!
//! 実際の GATT 操作（接続・探索・購読）は wasm 側のドライバが行い、
//! ここはイベントを受けて状態遷移と再接続判定だけを担当する純粋な状態機械。
//! Link とその派生ハンドルはドライバが排他的に所有する。

use serde::Serialize;

use crate::error::LinkError;
use crate::{MAX_RECONNECT_TRIES, RECONNECT_DELAY_MS};

/// 接続状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConnectionState {
    /// 初期状態（デバイス未選択）
    Idle,
    /// デバイス選択ダイアログ表示中
    Scanning,
    /// GATT 接続中
    Connecting,
    /// サービス/キャラクタリスティック解決中
    DiscoveringServices,
    /// 操作可能
    Ready,
    /// 自動再接続の待機・試行中
    Reconnecting,
    /// 切断済み（終端。手動の connect でのみ離脱）
    Disconnected,
}

impl ConnectionState {
    /// UI 表示用の識別子
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Idle => "idle",
            ConnectionState::Scanning => "scanning",
            ConnectionState::Connecting => "connecting",
            ConnectionState::DiscoveringServices => "discovering",
            ConnectionState::Ready => "ready",
            ConnectionState::Reconnecting => "reconnecting",
            ConnectionState::Disconnected => "disconnected",
        }
    }
}

/// 切断・エラー後の再接続判定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectDecision {
    /// `delay_ms` 待って再試行する（`attempt` 回目）
    Retry { attempt: u32, delay_ms: u64 },
    /// 上限到達。手動再接続まで何もしない
    GiveUp,
}

/// 接続ライフサイクルの状態機械
///
/// 接続試行・探索・切断のイベントをドライバから受け取り、
/// 状態と連続失敗カウンタを更新する。再接続の上限判定もここで行う。
#[derive(Debug)]
pub struct ConnectionManager {
    state: ConnectionState,
    /// 連続した再接続失敗の数（Ready 到達または手動 connect で 0 に戻る）
    reconnect_tries: u32,
}

impl ConnectionManager {
    pub fn new() -> Self {
        ConnectionManager {
            state: ConnectionState::Idle,
            reconnect_tries: 0,
        }
    }

    /// 現在の状態
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// 操作可能か
    pub fn is_ready(&self) -> bool {
        self.state == ConnectionState::Ready
    }

    /// 連続失敗カウンタ（テスト・表示用）
    pub fn reconnect_tries(&self) -> u32 {
        self.reconnect_tries
    }

    /// 手動接続の開始（デバイス選択ダイアログへ）
    ///
    /// # エラー
    /// - `LinkError::ConnectInProgress`: Idle / Disconnected 以外からの呼び出し。
    ///   同時接続試行の禁止はここで強制される
    pub fn begin_scan(&mut self) -> Result<(), LinkError> {
        match self.state {
            ConnectionState::Idle | ConnectionState::Disconnected => {
                self.reconnect_tries = 0;
                self.state = ConnectionState::Scanning;
                Ok(())
            }
            _ => Err(LinkError::ConnectInProgress),
        }
    }

    /// デバイス選択がキャンセル・失敗した（Scanning から Idle へ戻る）
    ///
    /// ユーザーのダイアログキャンセルは切断でもエラーでもないため、
    /// 再接続経路を通らず初期状態に戻す。
    pub fn scan_cancelled(&mut self) {
        if self.state == ConnectionState::Scanning {
            self.state = ConnectionState::Idle;
        }
    }

    /// デバイスが選択された（Scanning または再接続試行から）
    pub fn device_found(&mut self) {
        self.state = ConnectionState::Connecting;
    }

    /// GATT 接続が確立した
    pub fn gatt_connected(&mut self) {
        self.state = ConnectionState::DiscoveringServices;
    }

    /// 探索・購読が完了し操作可能になった
    pub fn services_ready(&mut self) {
        self.state = ConnectionState::Ready;
        self.reconnect_tries = 0;
    }

    /// 切断イベント・接続/探索エラーの統合処理
    ///
    /// Connecting / DiscoveringServices / Ready / Reconnecting のどこで
    /// 起きたかに関わらず同一視し、再接続ポリシーを適用する。
    /// ドライバは `Retry` を受けたら `delay_ms` 待機後に GATT 再接続を試みる。
    ///
    /// # 戻り値
    /// - `Retry`: カウンタを進めて Reconnecting へ
    /// - `GiveUp`: 上限到達。Disconnected へ遷移し、カウンタは 0 に戻る
    pub fn link_lost(&mut self) -> ReconnectDecision {
        match self.state {
            // 既に終端にいる（手動切断済みなど）なら何もしない
            ConnectionState::Idle | ConnectionState::Disconnected => ReconnectDecision::GiveUp,
            _ => {
                self.reconnect_tries += 1;
                if self.reconnect_tries >= MAX_RECONNECT_TRIES {
                    self.reconnect_tries = 0;
                    self.state = ConnectionState::Disconnected;
                    ReconnectDecision::GiveUp
                } else {
                    self.state = ConnectionState::Reconnecting;
                    ReconnectDecision::Retry {
                        attempt: self.reconnect_tries,
                        delay_ms: RECONNECT_DELAY_MS,
                    }
                }
            }
        }
    }

    /// 手動切断
    ///
    /// カウンタに関わらず必ず Disconnected へ。自動再接続は走らない。
    pub fn disconnected(&mut self) {
        self.state = ConnectionState::Disconnected;
        self.reconnect_tries = 0;
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}
