//! 転送セッション
//!
//! 1 つのプレーン転送ぶんの一時状態。Link ごとに同時に 1 セッションのみ
//! （上位レイヤーが強制する）。完了または中断で破棄され、再利用しない。

use alloc::vec::Vec;

use epd_image::PlaneKind;
use epd_proto::Command;
use serde::Serialize;

use crate::error::TransferError;
use crate::{CONTINUATION_FLAG, PLANE_TAG_BW, PLANE_TAG_COLOR, WRITE_IMG_OVERHEAD};

/// 送信すべき 1 チャンク
///
/// `bytes` は WRITE_IMG opcode + チャンクヘッダ込みの完成フレーム。
/// そのまま GATT Write に渡す。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// 完成フレーム `[0x30][header][data...]`
    pub bytes: Vec<u8>,
    /// Write With Response で送るか（フロー制御ポイント）
    pub with_response: bool,
    /// セッション内のチャンク番号（0 始まり）
    pub index: u32,
    /// ペイロード内の開始オフセット
    pub offset: usize,
}

/// チャンク送信ごとの進捗イベント
///
/// UI 側はこれを受けてステータス表示を更新する（コアは表示に関与しない）。
#[derive(Debug, Clone, Serialize)]
pub struct TransferProgress {
    /// プレーン識別子（"bw" / "red" / "color"）
    pub plane: &'static str,
    /// 送信済みチャンク数
    pub chunk_index: u32,
    /// 総チャンク数
    pub chunk_count: u32,
    /// 送信済みバイト数
    pub sent_bytes: usize,
    /// 総バイト数
    pub total_bytes: usize,
    /// セッション開始からの経過（ミリ秒）
    pub elapsed_ms: u64,
}

/// 1 プレーン転送の状態機械
///
/// ペイロード自体は保持しない（借用の都合で `next_chunk` に毎回渡す）。
/// 呼び出し側はチャンク N の write 完了を待ってから次を要求すること。
#[derive(Debug)]
pub struct TransferSession {
    kind: PlaneKind,
    total_len: usize,
    chunk_size: usize,
    ack_interval: u32,
    offset: usize,
    chunk_index: u32,
    /// 次の応答あり書き込みまでの残り回数
    no_reply_left: u32,
    started_at_ms: u64,
    aborted: bool,
}

impl TransferSession {
    /// 新しい転送セッションを開始する
    ///
    /// # 引数
    /// - `kind`: プレーン種別（チャンクヘッダのタグを決める）
    /// - `total_len`: 転送するプレーンの総バイト数
    /// - `chunk_size`: 1 チャンクのペイロードバイト数（`chunk_size_for_mtu` で導出）
    /// - `ack_interval`: 応答なし書き込みを連続させる数（0 = 毎回応答あり）
    /// - `now_ms`: セッション開始時刻（経過時間計算用）
    ///
    /// # エラー
    /// - `TransferError::ZeroChunkSize`
    pub fn new(
        kind: PlaneKind,
        total_len: usize,
        chunk_size: usize,
        ack_interval: u32,
        now_ms: u64,
    ) -> Result<Self, TransferError> {
        if chunk_size == 0 {
            return Err(TransferError::ZeroChunkSize);
        }

        Ok(TransferSession {
            kind,
            total_len,
            chunk_size,
            ack_interval,
            offset: 0,
            chunk_index: 0,
            no_reply_left: ack_interval,
            started_at_ms: now_ms,
            aborted: false,
        })
    }

    /// 実効 MTU からチャンクペイロードサイズを導出する
    ///
    /// # エラー
    /// - `TransferError::ChunkSizeTooSmall`: オーバーヘッドを引くと余地がない
    pub fn chunk_size_for_mtu(mtu: u16) -> Result<usize, TransferError> {
        let size = (mtu as usize).saturating_sub(WRITE_IMG_OVERHEAD);
        if size == 0 {
            return Err(TransferError::ChunkSizeTooSmall { mtu });
        }
        Ok(size)
    }

    /// プレーン種別のチャンクヘッダタグ
    fn plane_tag(&self) -> u8 {
        match self.kind {
            PlaneKind::Bw => PLANE_TAG_BW,
            PlaneKind::Red | PlaneKind::Color => PLANE_TAG_COLOR,
        }
    }

    /// 次に送るチャンクを取り出す
    ///
    /// # 引数
    /// - `payload`: セッション開始時の `total_len` と同じ長さのプレーンデータ
    ///
    /// # 戻り値
    /// - `Some(Chunk)`: 送信すべきチャンク
    /// - `None`: 転送完了、または中断済み
    pub fn next_chunk(&mut self, payload: &[u8]) -> Option<Chunk> {
        if self.aborted || self.offset >= self.total_len {
            return None;
        }

        let offset = self.offset;
        let end = (offset + self.chunk_size).min(self.total_len);

        let continuation = if offset == 0 { 0x00 } else { CONTINUATION_FLAG };
        let header = self.plane_tag() | continuation;
        let bytes = Command::write_img(header, &payload[offset..end]).to_bytes();

        let with_response = if self.no_reply_left > 0 {
            self.no_reply_left -= 1;
            false
        } else {
            self.no_reply_left = self.ack_interval;
            true
        };

        let index = self.chunk_index;
        self.chunk_index += 1;
        self.offset = end;

        Some(Chunk {
            bytes,
            with_response,
            index,
            offset,
        })
    }

    /// 総チャンク数
    pub fn chunk_count(&self) -> u32 {
        self.total_len.div_ceil(self.chunk_size) as u32
    }

    /// 現在の進捗スナップショット
    pub fn progress(&self, now_ms: u64) -> TransferProgress {
        TransferProgress {
            plane: self.kind.as_str(),
            chunk_index: self.chunk_index,
            chunk_count: self.chunk_count(),
            sent_bytes: self.offset,
            total_bytes: self.total_len,
            elapsed_ms: now_ms.saturating_sub(self.started_at_ms),
        }
    }

    /// セッションを中断する（切断・書き込み失敗時）
    ///
    /// 以降の `next_chunk` は常に `None` を返す。再開はできない。
    pub fn abort(&mut self) {
        self.aborted = true;
    }

    /// すべてのチャンクを送り終えたか（中断は完了と見なさない）
    pub fn is_complete(&self) -> bool {
        !self.aborted && self.offset >= self.total_len
    }

    /// プレーン種別
    pub fn kind(&self) -> PlaneKind {
        self.kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    fn drain(session: &mut TransferSession, payload: &[u8]) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        while let Some(c) = session.next_chunk(payload) {
            chunks.push(c);
        }
        chunks
    }

    /// 仕様の検証可能性 5: 10000 バイト / chunk 200 → ちょうど 50 チャンク、
    /// ヘッダを剥がした結合がペイロードを順序通り再現する
    #[test]
    fn test_chunk_count_and_reassembly() {
        let payload: Vec<u8> = (0..10_000u32).map(|i| i as u8).collect();
        let mut session =
            TransferSession::new(PlaneKind::Bw, payload.len(), 200, 4, 0).unwrap();

        assert_eq!(session.chunk_count(), 50);
        let chunks = drain(&mut session, &payload);
        assert_eq!(chunks.len(), 50);
        assert!(session.is_complete());

        let mut reassembled = Vec::new();
        for c in &chunks {
            // [opcode][header] の 2 バイトを剥がす
            reassembled.extend_from_slice(&c.bytes[WRITE_IMG_OVERHEAD..]);
        }
        assert_eq!(reassembled, payload);
    }

    /// 仕様の検証可能性 6: ack_interval=4 で 5 本ごと（index 4, 9, 14, ...）が応答あり
    #[test]
    fn test_ack_interleaving() {
        let payload = [0u8; 2000];
        let mut session = TransferSession::new(PlaneKind::Bw, 2000, 100, 4, 0).unwrap();

        for chunk in drain(&mut session, &payload) {
            let expect_ack = chunk.index % 5 == 4;
            assert_eq!(
                chunk.with_response, expect_ack,
                "chunk {} の応答フラグが不正",
                chunk.index
            );
        }
    }

    #[test]
    fn test_ack_interval_zero_means_every_write_acked() {
        let payload = [0u8; 500];
        let mut session = TransferSession::new(PlaneKind::Bw, 500, 100, 0, 0).unwrap();
        assert!(drain(&mut session, &payload).iter().all(|c| c.with_response));
    }

    #[test]
    fn test_header_first_vs_continuation() {
        let payload = [0u8; 250];
        let mut session = TransferSession::new(PlaneKind::Bw, 250, 100, 4, 0).unwrap();
        let chunks = drain(&mut session, &payload);

        assert_eq!(chunks.len(), 3);
        // 先頭チャンク: 継続フラグなし
        assert_eq!(chunks[0].bytes[1], PLANE_TAG_BW);
        // 継続チャンク: 上位ニブルが立つ
        assert_eq!(chunks[1].bytes[1], PLANE_TAG_BW | CONTINUATION_FLAG);
        assert_eq!(chunks[2].bytes[1], PLANE_TAG_BW | CONTINUATION_FLAG);
        // 末尾チャンクは端数サイズ
        assert_eq!(chunks[2].bytes.len(), WRITE_IMG_OVERHEAD + 50);
    }

    #[test]
    fn test_color_plane_tag() {
        let payload = [0u8; 10];
        for kind in [PlaneKind::Red, PlaneKind::Color] {
            let mut session = TransferSession::new(kind, 10, 100, 4, 0).unwrap();
            let chunks = drain(&mut session, &payload);
            assert_eq!(chunks[0].bytes[1], PLANE_TAG_COLOR, "kind={:?}", kind);
        }
    }

    #[test]
    fn test_every_chunk_is_write_img_frame() {
        let payload = [0xAAu8; 300];
        let mut session = TransferSession::new(PlaneKind::Bw, 300, 100, 2, 0).unwrap();
        for c in drain(&mut session, &payload) {
            assert_eq!(c.bytes[0], 0x30); // WRITE_IMG opcode
        }
    }

    #[test]
    fn test_abort_stops_iteration() {
        let payload = [0u8; 1000];
        let mut session = TransferSession::new(PlaneKind::Bw, 1000, 100, 4, 0).unwrap();

        assert!(session.next_chunk(&payload).is_some());
        session.abort();
        assert!(session.next_chunk(&payload).is_none());
        assert!(!session.is_complete());
    }

    #[test]
    fn test_chunk_size_for_mtu() {
        assert_eq!(TransferSession::chunk_size_for_mtu(244).unwrap(), 242);
        assert_eq!(TransferSession::chunk_size_for_mtu(3).unwrap(), 1);
        assert_eq!(
            TransferSession::chunk_size_for_mtu(2),
            Err(TransferError::ChunkSizeTooSmall { mtu: 2 })
        );
        assert_eq!(
            TransferSession::chunk_size_for_mtu(0),
            Err(TransferError::ChunkSizeTooSmall { mtu: 0 })
        );
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        assert_eq!(
            TransferSession::new(PlaneKind::Bw, 100, 0, 4, 0).unwrap_err(),
            TransferError::ZeroChunkSize
        );
    }

    #[test]
    fn test_progress_reports() {
        let payload = [0u8; 250];
        let mut session = TransferSession::new(PlaneKind::Bw, 250, 100, 4, 1000).unwrap();

        session.next_chunk(&payload).unwrap();
        let p = session.progress(1500);
        assert_eq!(p.plane, "bw");
        assert_eq!(p.chunk_index, 1);
        assert_eq!(p.chunk_count, 3);
        assert_eq!(p.sent_bytes, 100);
        assert_eq!(p.total_bytes, 250);
        assert_eq!(p.elapsed_ms, 500);
    }
}
