//! UDP intake for the external gesture recognizer.
//!
//! The recognizer sends one JSON object per datagram to a loopback port:
//!
//! ```json
//! {"hand_gesture": "close", "x": 0.42, "y": 0.61, "finger_gesture": "none"}
//! ```
//!
//! Nothing is ever sent back. Anything that does not decode is logged and
//! dropped; the shared register only changes on a valid message.

use crate::error::BridgeError;
use crate::gesture::{GestureSample, HandGesture, SharedGestureState};
use crate::worker::{join_with_timeout, spawn_contained};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Port the recognizer sends to.
pub const DEFAULT_INGEST_PORT: u16 = 12345;

pub fn default_ingest_addr() -> SocketAddr {
    SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, DEFAULT_INGEST_PORT))
}

/// Wire form of one recognizer observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireMessage {
    pub hand_gesture: String,
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finger_gesture: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecodedGesture {
    pub sample: GestureSample,
    pub history: Option<String>,
}

/// Decode one datagram. Fails on non-UTF-8 bytes, non-object payloads and
/// missing or mistyped required fields.
pub fn decode_datagram(bytes: &[u8]) -> Result<DecodedGesture, BridgeError> {
    let value: serde_json::Value = serde_json::from_slice(bytes)?;
    // serde would also accept a positional array for a struct.
    if !value.is_object() {
        return Err(BridgeError::MalformedInput(
            "payload is not a JSON object".to_string(),
        ));
    }
    let message: WireMessage = serde_json::from_value(value)?;
    Ok(DecodedGesture {
        sample: GestureSample::new(
            HandGesture::parse(&message.hand_gesture),
            message.x,
            message.y,
        ),
        history: message.finger_gesture,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestConfig {
    pub bind_addr: SocketAddr,
    /// Socket read timeout; bounds how long the worker takes to see a stop.
    pub poll_interval: Duration,
    pub join_timeout: Duration,
    pub max_datagram_bytes: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_ingest_addr(),
            poll_interval: Duration::from_millis(50),
            join_timeout: Duration::from_secs(2),
            max_datagram_bytes: 4096,
        }
    }
}

#[derive(Debug, Default)]
struct IngestCounters {
    received: AtomicU64,
    accepted: AtomicU64,
    dropped: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IngestStats {
    pub received: u64,
    pub accepted: u64,
    pub dropped: u64,
}

#[derive(Debug)]
struct WorkerHandle {
    stop_tx: Sender<()>,
    join: JoinHandle<()>,
    local_addr: SocketAddr,
}

/// Receives recognizer datagrams on a dedicated thread and publishes them
/// into the shared register.
pub struct GestureIngestionService {
    config: IngestConfig,
    state: Arc<SharedGestureState>,
    counters: Arc<IngestCounters>,
    worker: Option<WorkerHandle>,
}

impl GestureIngestionService {
    pub fn new(config: IngestConfig, state: Arc<SharedGestureState>) -> Self {
        Self {
            config,
            state,
            counters: Arc::new(IngestCounters::default()),
            worker: None,
        }
    }

    /// Bind the endpoint and start receiving. Returns the bound address. On
    /// `BindFailure` the service stays inert and the register keeps its
    /// current value.
    pub fn start(&mut self) -> Result<SocketAddr, BridgeError> {
        if let Some(worker) = &self.worker {
            return Ok(worker.local_addr);
        }

        let addr = self.config.bind_addr;
        let poll_interval = self.config.poll_interval.max(Duration::from_millis(1));
        let socket = UdpSocket::bind(addr)
            .and_then(|socket| {
                socket.set_read_timeout(Some(poll_interval))?;
                Ok(socket)
            })
            .map_err(|source| BridgeError::BindFailure { addr, source })?;
        let local_addr = socket
            .local_addr()
            .map_err(|source| BridgeError::BindFailure { addr, source })?;

        let (stop_tx, stop_rx) = mpsc::channel();
        let state = Arc::clone(&self.state);
        let counters = Arc::clone(&self.counters);
        let max_datagram = self.config.max_datagram_bytes.max(1);
        let join = spawn_contained("gesture-ingest", move || {
            receive_loop(socket, state, counters, stop_rx, max_datagram, poll_interval)
        })
        .map_err(|source| BridgeError::BindFailure { addr, source })?;

        tracing::info!(%local_addr, "gesture ingestion listening");
        self.worker = Some(WorkerHandle {
            stop_tx,
            join,
            local_addr,
        });
        Ok(local_addr)
    }

    /// Signal the worker and wait a bounded time for it to leave its receive.
    pub fn stop(&mut self) -> Result<(), BridgeError> {
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };
        let _ = worker.stop_tx.send(());
        let result = join_with_timeout(worker.join, "gesture-ingest", self.config.join_timeout);
        tracing::info!(local_addr = %worker.local_addr, "gesture ingestion stopped");
        result
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.worker.as_ref().map(|w| w.local_addr)
    }

    pub fn stats(&self) -> IngestStats {
        IngestStats {
            received: self.counters.received.load(Ordering::Relaxed),
            accepted: self.counters.accepted.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
        }
    }
}

impl Drop for GestureIngestionService {
    fn drop(&mut self) {
        if let Err(err) = self.stop() {
            tracing::error!(%err, "gesture ingestion teardown incomplete");
        }
    }
}

fn receive_loop(
    socket: UdpSocket,
    state: Arc<SharedGestureState>,
    counters: Arc<IngestCounters>,
    stop_rx: Receiver<()>,
    max_datagram: usize,
    poll_interval: Duration,
) {
    let mut buf = vec![0u8; max_datagram];
    loop {
        match stop_rx.try_recv() {
            Ok(()) | Err(TryRecvError::Disconnected) => break,
            Err(TryRecvError::Empty) => {}
        }

        match socket.recv_from(&mut buf) {
            Ok((len, from)) => {
                counters.received.fetch_add(1, Ordering::Relaxed);
                if handle_datagram(&buf[..len], &state) {
                    counters.accepted.fetch_add(1, Ordering::Relaxed);
                } else {
                    counters.dropped.fetch_add(1, Ordering::Relaxed);
                    tracing::trace!(%from, len, "datagram dropped");
                }
            }
            Err(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {}
            Err(err) if is_oversized(&err) => {
                counters.received.fetch_add(1, Ordering::Relaxed);
                counters.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(max_datagram, "discarding oversized gesture datagram");
            }
            Err(err) => {
                // Windows reports ICMP port-unreachable from earlier sends as
                // a receive error; the socket is still usable.
                tracing::warn!(?err, "gesture socket receive failed");
                std::thread::sleep(poll_interval);
            }
        }
    }
}

/// Windows reports a datagram larger than the buffer as an error
/// (`WSAEMSGSIZE`) instead of truncating it.
fn is_oversized(err: &std::io::Error) -> bool {
    const WSAEMSGSIZE: i32 = 10040;
    cfg!(windows) && err.raw_os_error() == Some(WSAEMSGSIZE)
}

/// Decode and publish. Returns whether the register was updated.
fn handle_datagram(bytes: &[u8], state: &SharedGestureState) -> bool {
    match decode_datagram(bytes) {
        Ok(decoded) => {
            if decoded.sample.gesture == HandGesture::Exit {
                tracing::info!("recognizer signalled exit");
            }
            tracing::trace!(
                gesture = %decoded.sample.gesture,
                x = decoded.sample.x,
                y = decoded.sample.y,
                "gesture received"
            );
            state.publish(decoded.sample, decoded.history);
            true
        }
        Err(err) => {
            tracing::warn!(%err, len = bytes.len(), "discarding gesture datagram");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_full_message() {
        let decoded = decode_datagram(
            br#"{"hand_gesture":"close","x":0.25,"y":0.75,"finger_gesture":"clockwise"}"#,
        )
        .unwrap();
        assert_eq!(decoded.sample, GestureSample::new(HandGesture::Close, 0.25, 0.75));
        assert_eq!(decoded.history.as_deref(), Some("clockwise"));
    }

    #[test]
    fn history_is_optional_and_integers_are_numbers() {
        let decoded = decode_datagram(br#"{"hand_gesture":"idle","x":1,"y":0}"#).unwrap();
        assert_eq!(decoded.sample, GestureSample::new(HandGesture::Idle, 1.0, 0.0));
        assert_eq!(decoded.history, None);
    }

    #[test]
    fn unknown_tag_is_kept_as_unknown() {
        let decoded = decode_datagram(br#"{"hand_gesture":"wave","x":0.1,"y":0.2}"#).unwrap();
        assert_eq!(decoded.sample.gesture, HandGesture::Unknown);
    }

    #[test]
    fn rejects_malformed_payloads() {
        let cases: [&[u8]; 7] = [
            br#"{"hand_gesture":"close","y":0.5}"#,
            br#"["close",0.5,0.5]"#,
            br#"{"x":0.5,"y":0.5}"#,
            br#"{"hand_gesture":"close","x":"left","y":0.5}"#,
            br#"[1,2,3]"#,
            b"\xff\xfe\x00garbage",
            b"",
        ];
        for bytes in cases {
            assert!(
                matches!(decode_datagram(bytes), Err(BridgeError::MalformedInput(_))),
                "accepted {:?}",
                String::from_utf8_lossy(bytes)
            );
        }
    }

    #[test]
    fn malformed_datagram_leaves_register_untouched() {
        let state = SharedGestureState::new();
        state.publish(GestureSample::new(HandGesture::Open, 0.3, 0.4), Some("stop".into()));
        assert!(!handle_datagram(br#"{"hand_gesture":"close","y":0.9}"#, &state));
        assert_eq!(state.read(), GestureSample::new(HandGesture::Open, 0.3, 0.4));
        assert_eq!(state.history().as_deref(), Some("stop"));
        assert_eq!(state.publish_count(), 1);
    }

    #[test]
    fn only_msgsize_counts_as_oversized() {
        let msgsize = std::io::Error::from_raw_os_error(10040);
        assert_eq!(is_oversized(&msgsize), cfg!(windows));
        assert!(!is_oversized(&std::io::Error::from(ErrorKind::ConnectionReset)));
    }

    #[test]
    fn wire_message_round_trips_field_names() {
        let json = serde_json::to_string(&WireMessage {
            hand_gesture: "close".into(),
            x: 0.5,
            y: 0.5,
            finger_gesture: None,
        })
        .unwrap();
        assert!(json.contains("\"hand_gesture\":\"close\""));
        assert!(!json.contains("finger_gesture"));
    }
}
