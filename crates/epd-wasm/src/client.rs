//! EpdClient wasm-bindgen エクスポート
//!
//! ブラウザ UI から呼び出す EPD コントローラの主エントリポイント。
//! 接続状態機械・コマンドフレーミング・チャンク転送を統合する。
//!
//! ## 内部アーキテクチャ
//!
//! ```text
//! EpdClient
//!   ├── ConnectionManager  (epd-link) - 接続状態機械 + 有界再接続
//!   ├── NotificationRouter (epd-link) - Notify の分類
//!   ├── EncodedImage       (epd-image) - ビットプレーンエンコード
//!   ├── TransferSession    (epd-transport) - チャンク分割 + フロー制御
//!   └── Command            (epd-proto) - コマンドフレーミング
//! ```
//!
//! GATT 操作は JS 実装の `BleLink` / `BleEndpoint` に委譲する。
//! Link とその派生エンドポイントはこのクライアントが排他的に所有し、
//! 他のコンポーネントには渡さない。
//!
//! ## スレッド安全性
//!
//! WASM はシングルスレッドのため `Rc<RefCell<_>>` で足りる。
//! 各 await 地点でのみ制御が JS 側へ戻り、プロトコル操作が並行して
//! 走ることはない。1 つの転送のチャンク書き込みは厳密に逐次。

use std::cell::RefCell;
use std::rc::Rc;

use js_sys::{Function, Promise, Uint8Array};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::{future_to_promise, spawn_local, JsFuture};

use epd_image::EncodedImage;
use epd_link::{
    ConnectionManager, ConnectionState, DeviceConfig, DeviceMessage, LinkError,
    NotificationRouter, ReconnectDecision, EPD_CHARACTERISTIC_UUID, EPD_SERVICE_UUID,
    FALLBACK_APP_VERSION, MAX_RECONNECT_TRIES, RXTX_CHARACTERISTIC_UUID, RXTX_SERVICE_UUID,
    VERSION_CHARACTERISTIC_UUID,
};
use epd_proto::{Command, EpdCmd};
use epd_transport::{TransferSession, DEFAULT_ACK_INTERVAL, DEFAULT_MTU};

use crate::parse_encode_options;

#[wasm_bindgen]
extern "C" {
    /// JS 側が実装する BLE リンク capability
    ///
    /// 非同期メソッドは Promise を返し、エラーは reject で伝える。
    pub type BleLink;

    /// デバイス選択ダイアログを開き、選択されたデバイス名で resolve する
    #[wasm_bindgen(method, js_name = requestDevice)]
    fn request_device(this: &BleLink) -> Promise;

    /// 選択済みデバイスへの GATT 接続
    #[wasm_bindgen(method, js_name = connectGatt)]
    fn connect_gatt(this: &BleLink) -> Promise;

    /// GATT 切断（冪等）
    #[wasm_bindgen(method)]
    fn disconnect(this: &BleLink);

    /// サービス/キャラクタリスティックを解決し `BleEndpoint` で resolve する
    #[wasm_bindgen(method, js_name = getCharacteristic)]
    fn get_characteristic(this: &BleLink, service: &str, characteristic: &str) -> Promise;

    /// キャラクタリスティックを 1 回読み、`Uint8Array` で resolve する
    #[wasm_bindgen(method, js_name = readCharacteristic)]
    fn read_characteristic(this: &BleLink, service: &str, characteristic: &str) -> Promise;

    /// 切断イベントの購読（gattserverdisconnected）
    #[wasm_bindgen(method, js_name = onDisconnected)]
    fn on_disconnected(this: &BleLink, callback: &Function);

    /// 解決済みキャラクタリスティックへの書き込み口
    pub type BleEndpoint;

    /// GATT Write。`with_response` で Write With/Without Response を切り替える
    #[wasm_bindgen(method)]
    fn write(this: &BleEndpoint, data: &[u8], with_response: bool) -> Promise;

    /// Notify を購読し、各通知で `callback(Uint8Array)` を呼ぶ
    #[wasm_bindgen(method)]
    fn subscribe(this: &BleEndpoint, callback: &Function) -> Promise;
}

// このバージョンの wasm-bindgen は import した handle 型に Clone を
// 自動生成しないため、JsValue ハンドルを複製する Clone を手で与える。
impl Clone for BleLink {
    fn clone(&self) -> Self {
        let handle: &JsValue = self.as_ref();
        Self::from(handle.clone())
    }
}

impl Clone for BleEndpoint {
    fn clone(&self) -> Self {
        let handle: &JsValue = self.as_ref();
        Self::from(handle.clone())
    }
}

/// クライアントの共有状態
///
/// すべての Promise / コールバックから `Rc<RefCell<Inner>>` 経由で触る。
/// RefCell の借用を await をまたいで保持しないこと。
struct Inner {
    manager: ConnectionManager,
    router: NotificationRouter,
    /// EPD コントロールキャラクタリスティック（Ready の間のみ Some）
    epd: Option<BleEndpoint>,
    /// 補助シリアルキャラクタリスティック（存在すれば）
    rxtx: Option<BleEndpoint>,
    /// 最後に受信した設定エコー
    config: Option<DeviceConfig>,
    /// 実効 MTU（`mtu=` 通知で更新される）
    mtu: u16,
    /// 応答なし書き込みを連続させる数
    ack_interval: u32,
    app_version: u8,
    device_name: String,
    /// 同時転送の禁止フラグ
    transfer_active: bool,
    log_sink: Option<Function>,
    message_sink: Option<Function>,
    progress_sink: Option<Function>,
    // 購読コールバックは drop すると JS 側から無効になるため保持する
    notify_cb: Option<Closure<dyn FnMut(Uint8Array)>>,
    rxtx_cb: Option<Closure<dyn FnMut(Uint8Array)>>,
    disconnect_cb: Option<Closure<dyn FnMut()>>,
}

impl Inner {
    fn new() -> Self {
        Inner {
            manager: ConnectionManager::new(),
            router: NotificationRouter::new(),
            epd: None,
            rxtx: None,
            config: None,
            mtu: DEFAULT_MTU,
            ack_interval: DEFAULT_ACK_INTERVAL,
            app_version: FALLBACK_APP_VERSION,
            device_name: String::new(),
            transfer_active: false,
            log_sink: None,
            message_sink: None,
            progress_sink: None,
            notify_cb: None,
            rxtx_cb: None,
            disconnect_cb: None,
        }
    }
}

type Shared = Rc<RefCell<Inner>>;

fn now_ms() -> u64 {
    js_sys::Date::now() as u64
}

fn js_err(e: impl core::fmt::Display) -> JsValue {
    JsError::new(&e.to_string()).into()
}

fn js_error_text(e: &JsValue) -> String {
    e.as_string()
        .or_else(|| {
            e.dyn_ref::<js_sys::Error>()
                .map(|err| String::from(err.message()))
        })
        .unwrap_or_else(|| format!("{:?}", e))
}

/// ログイベントの発行（sink 未設定時はコンソールへ）
///
/// `action` は方向マーカー（"⇑" 送信 / "⇓" 受信 / "" その他）。
/// タイムスタンプ付与などの表示整形は UI 側アダプタの仕事。
fn log(inner: &Shared, action: &str, text: &str) {
    let sink = inner.borrow().log_sink.clone();
    match sink {
        Some(f) => {
            let _ = f.call2(
                &JsValue::NULL,
                &JsValue::from_str(action),
                &JsValue::from_str(text),
            );
        }
        None => web_sys::console::log_1(&JsValue::from_str(&format!("{}{}", action, text))),
    }
}

fn emit_progress(inner: &Shared, progress: &epd_transport::TransferProgress) {
    let sink = inner.borrow().progress_sink.clone();
    if let Some(f) = sink {
        if let Ok(json) = serde_json::to_string(progress) {
            let _ = f.call1(&JsValue::NULL, &JsValue::from_str(&json));
        }
    }
}

/// 分類済みデバイスメッセージの反映と通知
fn apply_device_message(inner: &Shared, msg: DeviceMessage) {
    match &msg {
        DeviceMessage::ConfigEcho(cfg) => {
            log(
                inner,
                "⇓",
                &format!("config: pins={} driver={}", cfg.pins_hex(), cfg.driver_hex()),
            );
            inner.borrow_mut().config = Some(cfg.clone());
        }
        DeviceMessage::MtuUpdate(mtu) => {
            inner.borrow_mut().mtu = *mtu;
            log(inner, "⇓", &format!("MTU updated to {}", mtu));
        }
        DeviceMessage::TimeEcho(secs) => {
            log(inner, "⇓", &format!("device time: {} (unix)", secs));
        }
        DeviceMessage::Text(text) => log(inner, "⇓", text),
        DeviceMessage::Unknown(raw) => log(inner, "⇓", &epd_codec::bytes_to_hex(raw)),
    }

    let sink = inner.borrow().message_sink.clone();
    if let Some(f) = sink {
        if let Ok(json) = serde_json::to_string(&msg) {
            let _ = f.call1(&JsValue::NULL, &JsValue::from_str(&json));
        }
    }
}

/// 派生ハンドル（キャラクタリスティック参照）の破棄
///
/// 切断・エラー時に必ず通る。状態機械そのものは触らない。
fn reset_endpoints(inner: &Shared) {
    let mut s = inner.borrow_mut();
    s.epd = None;
    s.rxtx = None;
    s.notify_cb = None;
    s.rxtx_cb = None;
}

/// `setTimeout` ベースの待機（再接続バックオフ用）
async fn sleep_ms(ms: i32) {
    let promise = Promise::new(&mut |resolve, _reject| {
        match web_sys::window() {
            Some(window) => {
                if window
                    .set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, ms)
                    .is_err()
                {
                    let _ = resolve.call0(&JsValue::NULL);
                }
            }
            // Window がない環境（worker 等）では待たずに続行する
            None => {
                let _ = resolve.call0(&JsValue::NULL);
            }
        }
    });
    let _ = JsFuture::from(promise).await;
}

fn make_notify_closure(inner: &Shared) -> Closure<dyn FnMut(Uint8Array)> {
    let inner = inner.clone();
    Closure::new(move |data: Uint8Array| {
        let bytes = data.to_vec();
        let msg = inner.borrow_mut().router.route(&bytes);
        apply_device_message(&inner, msg);
    })
}

fn make_rxtx_closure(inner: &Shared) -> Closure<dyn FnMut(Uint8Array)> {
    let inner = inner.clone();
    Closure::new(move |data: Uint8Array| {
        let bytes = data.to_vec();
        // 補助シリアルはテキストのみ（設定エコーのインデックス管理を持たない）
        let msg = NotificationRouter::route_text(&bytes);
        apply_device_message(&inner, msg);
    })
}

/// 切断イベントのハンドラ
///
/// Ready 中の切断のみここで再接続を起動する。Connecting / Discovering 中の
/// エラーは `establish` 側の失敗経路が同じ `link_lost` 判定を通るため、
/// 二重にカウントしない。
fn on_disconnect_event(inner: &Shared, link: &BleLink) {
    let was_ready = inner.borrow().manager.state() == ConnectionState::Ready;
    reset_endpoints(inner);
    if !was_ready {
        return;
    }

    log(inner, "", "Device disconnected");
    let decision = inner.borrow_mut().manager.link_lost();
    match decision {
        ReconnectDecision::Retry { attempt, delay_ms } => {
            log(
                inner,
                "",
                &format!("Reconnect attempt {}/{}", attempt, MAX_RECONNECT_TRIES),
            );
            let inner = inner.clone();
            let link = link.clone();
            spawn_local(async move {
                sleep_ms(delay_ms as i32).await;
                let _ = establish(inner, link).await;
            });
        }
        ReconnectDecision::GiveUp => {
            log(inner, "", "Connection abandoned: manual reconnect required");
        }
    }
}

fn ensure_disconnect_hook(inner: &Shared, link: &BleLink) {
    if inner.borrow().disconnect_cb.is_some() {
        return;
    }
    let cb = {
        let inner = inner.clone();
        let link = link.clone();
        Closure::<dyn FnMut()>::new(move || on_disconnect_event(&inner, &link))
    };
    link.on_disconnected(cb.as_ref().unchecked_ref());
    inner.borrow_mut().disconnect_cb = Some(cb);
}

/// GATT 接続 + サービス探索 + 購読の 1 回ぶん
///
/// 探索順序: EPD サービス/キャラクタリスティック → Notify 購読 →
/// バージョン読み出し（任意）→ 補助シリアル購読（任意）→ Ready → INIT。
/// 任意ステップの失敗はログのみで Ready 到達を妨げない。
async fn connect_once(inner: &Shared, link: &BleLink) -> Result<(), JsValue> {
    JsFuture::from(link.connect_gatt()).await?;
    inner.borrow_mut().manager.gatt_connected();
    log(inner, "", "> GATT server connected");

    let epd_js = match JsFuture::from(
        link.get_characteristic(EPD_SERVICE_UUID, EPD_CHARACTERISTIC_UUID),
    )
    .await
    {
        Ok(v) => v,
        Err(e) => {
            log(inner, "", &LinkError::Discovery(js_error_text(&e)).to_string());
            return Err(e);
        }
    };
    let epd: BleEndpoint = epd_js.unchecked_into();
    log(inner, "", "> EPD service found");

    let notify_cb = make_notify_closure(inner);
    if let Err(e) = JsFuture::from(epd.subscribe(notify_cb.as_ref().unchecked_ref())).await {
        log(inner, "", &LinkError::Discovery(js_error_text(&e)).to_string());
        return Err(e);
    }
    {
        let mut s = inner.borrow_mut();
        s.router.reset();
        s.notify_cb = Some(notify_cb);
        s.epd = Some(epd);
    }
    log(inner, "", "> notifications enabled");

    // ファームウェアバージョン（キャラクタリスティックがない旧版もある）
    match JsFuture::from(link.read_characteristic(EPD_SERVICE_UUID, VERSION_CHARACTERISTIC_UUID))
        .await
    {
        Ok(v) => {
            let data: Uint8Array = v.unchecked_into();
            if data.length() > 0 {
                let version = data.get_index(0);
                inner.borrow_mut().app_version = version;
                log(inner, "", &format!("firmware version: 0x{:02x}", version));
            }
        }
        Err(_) => {
            inner.borrow_mut().app_version = FALLBACK_APP_VERSION;
            log(
                inner,
                "",
                &format!(
                    "version characteristic unavailable, assuming 0x{:02x}",
                    FALLBACK_APP_VERSION
                ),
            );
        }
    }

    // 補助シリアルサービス（失敗しても致命的でない）
    match JsFuture::from(link.get_characteristic(RXTX_SERVICE_UUID, RXTX_CHARACTERISTIC_UUID))
        .await
    {
        Ok(v) => {
            let rxtx: BleEndpoint = v.unchecked_into();
            let cb = make_rxtx_closure(inner);
            match JsFuture::from(rxtx.subscribe(cb.as_ref().unchecked_ref())).await {
                Ok(_) => {
                    let mut s = inner.borrow_mut();
                    s.rxtx = Some(rxtx);
                    s.rxtx_cb = Some(cb);
                    log(inner, "", "> serial service ready");
                }
                Err(e) => log(
                    inner,
                    "",
                    &format!("serial subscribe failed (non-fatal): {}", js_error_text(&e)),
                ),
            }
        }
        Err(e) => log(
            inner,
            "",
            &format!("serial service unavailable (non-fatal): {}", js_error_text(&e)),
        ),
    }

    inner.borrow_mut().manager.services_ready();

    // INIT で設定エコーを促す（最初の Notify が設定として分類される）
    let init = Command::init(None).to_bytes();
    let endpoint = inner
        .borrow()
        .epd
        .clone()
        .ok_or_else(|| js_err(LinkError::Unavailable))?;
    log(inner, "⇑", &epd_codec::bytes_to_hex(&init));
    JsFuture::from(endpoint.write(&init, true)).await?;

    Ok(())
}

/// 有界再接続ループ
///
/// 成功するか、`ConnectionManager` が打ち切るまで GATT 接続を繰り返す。
/// 再帰ではなく明示的なループ（上限はカウンタでテスト可能）。
async fn establish(inner: Shared, link: BleLink) -> Result<JsValue, JsValue> {
    loop {
        match connect_once(&inner, &link).await {
            Ok(()) => {
                log(&inner, "", "Connected and ready");
                return Ok(JsValue::UNDEFINED);
            }
            Err(e) => {
                reset_endpoints(&inner);
                let decision = inner.borrow_mut().manager.link_lost();
                match decision {
                    ReconnectDecision::Retry { attempt, delay_ms } => {
                        log(
                            &inner,
                            "",
                            &format!("Reconnect attempt {}/{}", attempt, MAX_RECONNECT_TRIES),
                        );
                        sleep_ms(delay_ms as i32).await;
                    }
                    ReconnectDecision::GiveUp => {
                        log(&inner, "", "Connection abandoned: manual reconnect required");
                        return Err(e);
                    }
                }
            }
        }
    }
}

/// Ready 状態の EPD エンドポイントと MTU を取り出す（前提条件チェック）
fn ready_endpoint(inner: &Shared) -> Result<(BleEndpoint, u16), JsValue> {
    let s = inner.borrow();
    if !s.manager.is_ready() {
        return Err(js_err(LinkError::Unavailable));
    }
    match &s.epd {
        Some(ep) => Ok((ep.clone(), s.mtu)),
        None => Err(js_err(LinkError::Unavailable)),
    }
}

/// 書き込み失敗の統合処理: 派生状態を破棄し、有界再接続ポリシーへ
///
/// 既に切断イベント側が処理を始めている（Ready でない）場合は何もしない。
async fn handle_link_failure(inner: &Shared, link: &BleLink) {
    let was_ready = inner.borrow().manager.is_ready();
    reset_endpoints(inner);
    if !was_ready {
        return;
    }

    let decision = inner.borrow_mut().manager.link_lost();
    match decision {
        ReconnectDecision::Retry { attempt, delay_ms } => {
            log(
                inner,
                "",
                &format!("Reconnect attempt {}/{}", attempt, MAX_RECONNECT_TRIES),
            );
            sleep_ms(delay_ms as i32).await;
            let _ = establish(inner.clone(), link.clone()).await;
        }
        ReconnectDecision::GiveUp => {
            log(inner, "", "Connection abandoned: manual reconnect required");
        }
    }
}

/// コマンドを 1 つ書き込む（公開コマンド API の共通経路）
///
/// 前提条件（Ready / MTU 超過）は即時エラー、トランスポート失敗は
/// ログ + 再接続経路を通ってからエラーを返す。
async fn exec_command(
    inner: &Shared,
    link: &BleLink,
    cmd: Command,
    with_response: bool,
) -> Result<(), JsValue> {
    let (endpoint, mtu) = ready_endpoint(inner)?;
    if !cmd.fits(mtu as usize) {
        return Err(js_err(format!(
            "frame of {} bytes exceeds MTU {}",
            cmd.frame_len(),
            mtu
        )));
    }

    let bytes = cmd.to_bytes();
    log(inner, "⇑", &epd_codec::bytes_to_hex(&bytes));

    if let Err(e) = JsFuture::from(endpoint.write(&bytes, with_response)).await {
        log(
            inner,
            "",
            &LinkError::WriteRejected(js_error_text(&e)).to_string(),
        );
        handle_link_failure(inner, link).await;
        return Err(e);
    }
    Ok(())
}

/// 画像転送の本体（`transfer_active` の管理は呼び出し側）
async fn send_image_inner(
    inner: &Shared,
    link: &BleLink,
    image: EncodedImage,
) -> Result<(), JsValue> {
    let planes = image
        .transfer_planes()
        .ok_or_else(|| js_err(epd_transport::TransferError::NotTransferable))?;
    let started = now_ms();

    for plane in planes {
        let (chunk_size, ack_interval) = {
            let s = inner.borrow();
            (
                TransferSession::chunk_size_for_mtu(s.mtu).map_err(js_err)?,
                s.ack_interval,
            )
        };
        let mut session = TransferSession::new(
            plane.kind,
            plane.data.len(),
            chunk_size,
            ack_interval,
            now_ms(),
        )
        .map_err(js_err)?;

        log(
            inner,
            "",
            &format!(
                "sending {} plane: {} bytes in {} chunks",
                plane.kind.as_str(),
                plane.data.len(),
                session.chunk_count()
            ),
        );

        loop {
            // 切断イベントが処理された時点でループを打ち切る
            // （死んだハンドルに書き続けない）
            if !inner.borrow().manager.is_ready() {
                session.abort();
                return Err(js_err(LinkError::Unavailable));
            }

            let chunk = match session.next_chunk(plane.data) {
                Some(c) => c,
                None => break,
            };

            let endpoint = match inner.borrow().epd.clone() {
                Some(ep) => ep,
                None => {
                    session.abort();
                    return Err(js_err(LinkError::Unavailable));
                }
            };

            // チャンク N の write が解決するまで N+1 は始まらない
            if let Err(e) = JsFuture::from(endpoint.write(&chunk.bytes, chunk.with_response)).await
            {
                session.abort();
                log(
                    inner,
                    "",
                    &LinkError::WriteRejected(js_error_text(&e)).to_string(),
                );
                handle_link_failure(inner, link).await;
                return Err(e);
            }

            emit_progress(inner, &session.progress(now_ms()));
        }
    }

    // 全プレーン送信後に表示反映
    exec_command(inner, link, Command::refresh(), true).await?;

    let elapsed = now_ms().saturating_sub(started);
    log(
        inner,
        "",
        &format!("image sent in {:.1}s", elapsed as f64 / 1000.0),
    );
    Ok(())
}

/// EPD BLE クライアント
///
/// 1 インスタンスが 1 つの Link を扱う。切断後の再接続も同じ
/// インスタンスで行うが、GATT ハンドルは接続サイクルごとに作り直される。
#[wasm_bindgen]
pub struct EpdClient {
    link: BleLink,
    inner: Shared,
}

#[wasm_bindgen]
impl EpdClient {
    /// クライアントを初期化する
    ///
    /// # 引数
    /// - `link`: JS 実装の BLE リンク（クレートドキュメントの例を参照）
    #[wasm_bindgen(constructor)]
    pub fn new(link: BleLink) -> EpdClient {
        EpdClient {
            link,
            inner: Rc::new(RefCell::new(Inner::new())),
        }
    }

    /// デバイスを選択して接続する
    ///
    /// デバイス選択 → GATT 接続 → サービス探索 → Notify 購読 → INIT の
    /// 全手順を実行し、Ready になったら resolve する。
    /// 接続・探索の失敗は有界の自動再接続（300ms 間隔、上限 5 回）を挟む。
    ///
    /// # エラー
    /// - 既に接続試行が進行中
    /// - デバイス選択のキャンセル
    /// - 再接続上限への到達
    pub fn connect(&self) -> Promise {
        let inner = self.inner.clone();
        let link = self.link.clone();
        future_to_promise(async move {
            inner.borrow_mut().manager.begin_scan().map_err(js_err)?;
            log(&inner, "", "Requesting device...");

            let name = match JsFuture::from(link.request_device()).await {
                Ok(v) => v.as_string().unwrap_or_else(|| "unknown device".to_string()),
                Err(e) => {
                    inner.borrow_mut().manager.scan_cancelled();
                    log(&inner, "", &format!("requestDevice: {}", js_error_text(&e)));
                    return Err(e);
                }
            };

            {
                let mut s = inner.borrow_mut();
                s.device_name = name.clone();
                s.manager.device_found();
            }
            log(&inner, "", &format!("Connecting to {}", name));
            ensure_disconnect_hook(&inner, &link);

            establish(inner, link).await
        })
    }

    /// 手動切断
    ///
    /// カウンタに関わらず Disconnected へ遷移し、自動再接続は走らない。
    /// 進行中の転送はループの次の周回で停止する。
    pub fn disconnect(&self) {
        {
            let mut s = self.inner.borrow_mut();
            s.manager.disconnected();
        }
        reset_endpoints(&self.inner);
        self.link.disconnect();
        log(&self.inner, "", "Disconnected");
    }

    /// 画像を送信する
    ///
    /// エンコード → プレーンごとのチャンク転送 → REFRESH まで行う。
    /// ThreeColor は bw / red の 2 転送、FourColor は単一の color 転送。
    ///
    /// # 引数
    /// - `rgba`: キャンバスの ImageData（width * height * 4 バイト）
    /// - `mode`: "blackWhiteColor" | "threeColor" | "fourColor"
    /// - `algorithm`: "none" | "bayer" | "floydSteinberg" | "atkinson"
    /// - `strength`: ディザ強度 [0,1]
    /// - `contrast`: コントラスト調整 [-100,100]
    ///
    /// # エラー
    /// - Ready でない、または別の転送が進行中
    /// - 入力バッファ・寸法の不整合
    /// - 転送中の書き込み失敗（中断し、再開はしない）
    #[wasm_bindgen(js_name = "sendImage")]
    pub fn send_image(
        &self,
        rgba: Vec<u8>,
        width: u32,
        height: u32,
        mode: String,
        algorithm: String,
        strength: f32,
        contrast: f32,
    ) -> Promise {
        let inner = self.inner.clone();
        let link = self.link.clone();
        future_to_promise(async move {
            {
                let mut s = inner.borrow_mut();
                if !s.manager.is_ready() {
                    return Err(js_err(LinkError::Unavailable));
                }
                if s.transfer_active {
                    return Err(js_err(LinkError::TransferInFlight));
                }
                s.transfer_active = true;
            }

            let result = async {
                let opts = parse_encode_options(&mode, &algorithm, strength, contrast)
                    .map_err(JsValue::from)?;
                let image = EncodedImage::encode(&rgba, width, height, &opts)
                    .map_err(js_err)?;
                send_image_inner(&inner, &link, image).await
            }
            .await;

            inner.borrow_mut().transfer_active = false;
            result.map(|_| JsValue::UNDEFINED)
        })
    }

    /// 時刻同期（SET_TIME）
    ///
    /// 現在時刻とローカルタイムゾーンを送る。`mode` は表示モード
    /// （1 = カレンダー、2 = 時計。時計モードは毎分リフレッシュする）。
    #[wasm_bindgen(js_name = "syncTime")]
    pub fn sync_time(&self, mode: u8) -> Promise {
        let tz_hours = (-(js_sys::Date::new_0().get_timezone_offset() / 60.0)) as i8;
        let unix_secs = (js_sys::Date::now() / 1000.0) as u32;
        self.exec(Command::set_time(unix_secs, tz_hours, mode))
    }

    /// 画面消去（CLEAR）
    #[wasm_bindgen(js_name = "clearScreen")]
    pub fn clear_screen(&self) -> Promise {
        self.exec(Command::clear())
    }

    /// 表示反映（REFRESH）
    pub fn refresh(&self) -> Promise {
        self.exec(Command::refresh())
    }

    /// パネルスリープ（SLEEP）
    #[wasm_bindgen(js_name = "epdSleep")]
    pub fn epd_sleep(&self) -> Promise {
        self.exec(Command::sleep())
    }

    /// ピン割り当てとドライバの書き込み（SET_PINS → INIT）
    #[wasm_bindgen(js_name = "setDriver")]
    pub fn set_driver(&self, pins_hex: String, driver_hex: String) -> Promise {
        let inner = self.inner.clone();
        let link = self.link.clone();
        future_to_promise(async move {
            let pins = epd_codec::hex_to_bytes(&pins_hex).map_err(js_err)?;
            let driver = epd_codec::hex_to_bytes(&driver_hex).map_err(js_err)?;
            exec_command(&inner, &link, Command::set_pins(pins), true).await?;
            exec_command(&inner, &link, Command::new(EpdCmd::Init, driver), true).await?;
            Ok(JsValue::UNDEFINED)
        })
    }

    /// 任意コマンドの送信（デバッグ入力欄。先頭バイトが opcode）
    #[wasm_bindgen(js_name = "sendCommand")]
    pub fn send_command(&self, hex: String) -> Promise {
        match Command::parse_hex(&hex) {
            Ok(cmd) => self.exec(cmd),
            Err(e) => Promise::reject(&js_err(e)),
        }
    }

    /// デバイス設定の書き込み（SET_CONFIG）
    #[wasm_bindgen(js_name = "sendConfig")]
    pub fn send_config(&self, hex: String) -> Promise {
        match epd_codec::hex_to_bytes(&hex) {
            Ok(bytes) => self.exec(Command::set_config(bytes)),
            Err(e) => Promise::reject(&js_err(e)),
        }
    }

    /// システムリセット（SYS_RESET）
    #[wasm_bindgen(js_name = "sysReset")]
    pub fn sys_reset(&self) -> Promise {
        self.exec(Command::sys_reset())
    }

    /// システムスリープ（SYS_SLEEP）
    #[wasm_bindgen(js_name = "sysSleep")]
    pub fn sys_sleep(&self) -> Promise {
        self.exec(Command::sys_sleep())
    }

    /// 設定領域の消去（CFG_ERASE）
    #[wasm_bindgen(js_name = "cfgErase")]
    pub fn cfg_erase(&self) -> Promise {
        self.exec(Command::cfg_erase())
    }

    // ===== 状態の読み出し =====

    /// 現在の接続状態（"idle" / "scanning" / ... / "disconnected"）
    pub fn state(&self) -> String {
        self.inner.borrow().manager.state().as_str().to_string()
    }

    /// 操作可能か
    #[wasm_bindgen(js_name = "isReady")]
    pub fn is_ready(&self) -> bool {
        self.inner.borrow().manager.is_ready()
    }

    /// 実効 MTU（バイト）
    pub fn mtu(&self) -> u16 {
        self.inner.borrow().mtu
    }

    /// 実効 MTU の手動設定（通常は `mtu=` 通知が上書きする）
    #[wasm_bindgen(js_name = "setMtu")]
    pub fn set_mtu(&self, mtu: u16) {
        self.inner.borrow_mut().mtu = mtu;
    }

    /// 応答なし書き込みを連続させる数
    #[wasm_bindgen(js_name = "ackInterval")]
    pub fn ack_interval(&self) -> u32 {
        self.inner.borrow().ack_interval
    }

    #[wasm_bindgen(js_name = "setAckInterval")]
    pub fn set_ack_interval(&self, interval: u32) {
        self.inner.borrow_mut().ack_interval = interval;
    }

    /// ファームウェアバージョン
    #[wasm_bindgen(js_name = "appVersion")]
    pub fn app_version(&self) -> u8 {
        self.inner.borrow().app_version
    }

    /// 接続中のデバイス名
    #[wasm_bindgen(js_name = "deviceName")]
    pub fn device_name(&self) -> String {
        self.inner.borrow().device_name.clone()
    }

    /// 補助シリアルサービスに接続できているか
    #[wasm_bindgen(js_name = "hasSerial")]
    pub fn has_serial(&self) -> bool {
        self.inner.borrow().rxtx.is_some()
    }

    /// 設定エコーのピン 16進文字列（未受信なら None）
    #[wasm_bindgen(js_name = "configPinsHex")]
    pub fn config_pins_hex(&self) -> Option<String> {
        self.inner.borrow().config.as_ref().map(|c| c.pins_hex())
    }

    /// 設定エコーのドライバ 16進文字列（未受信なら None）
    #[wasm_bindgen(js_name = "configDriverHex")]
    pub fn config_driver_hex(&self) -> Option<String> {
        self.inner.borrow().config.as_ref().map(|c| c.driver_hex())
    }

    // ===== イベント sink の登録 =====

    /// ログ sink: `(action, text)` で呼ばれる（action は "⇑" / "⇓" / ""）
    #[wasm_bindgen(js_name = "setLogSink")]
    pub fn set_log_sink(&self, sink: Function) {
        self.inner.borrow_mut().log_sink = Some(sink);
    }

    /// 分類済みデバイスメッセージ sink: JSON 文字列で呼ばれる
    #[wasm_bindgen(js_name = "setMessageSink")]
    pub fn set_message_sink(&self, sink: Function) {
        self.inner.borrow_mut().message_sink = Some(sink);
    }

    /// 転送進捗 sink: チャンクごとに JSON 文字列で呼ばれる
    #[wasm_bindgen(js_name = "setProgressSink")]
    pub fn set_progress_sink(&self, sink: Function) {
        self.inner.borrow_mut().progress_sink = Some(sink);
    }
}

impl EpdClient {
    /// コマンド 1 つを応答あり書き込みで実行する Promise を作る
    fn exec(&self, cmd: Command) -> Promise {
        let inner = self.inner.clone();
        let link = self.link.clone();
        future_to_promise(async move {
            exec_command(&inner, &link, cmd, true).await?;
            Ok(JsValue::UNDEFINED)
        })
    }
}
