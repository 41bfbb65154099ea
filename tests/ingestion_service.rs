use gesture_pointer::error::BridgeError;
use gesture_pointer::ingest::{GestureIngestionService, IngestConfig};
use gesture_pointer::{GestureSample, HandGesture, SharedGestureState};
use std::net::{SocketAddr, UdpSocket};
use std::sync::Arc;
use std::thread::sleep;
use std::time::{Duration, Instant};

fn loopback_config() -> IngestConfig {
    IngestConfig {
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        poll_interval: Duration::from_millis(10),
        ..IngestConfig::default()
    }
}

fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        sleep(Duration::from_millis(5));
    }
    cond()
}

fn send(addr: SocketAddr, payload: &[u8]) {
    let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
    socket.send_to(payload, addr).unwrap();
}

#[test]
fn publishes_valid_datagrams() {
    let state = Arc::new(SharedGestureState::new());
    let mut service = GestureIngestionService::new(loopback_config(), Arc::clone(&state));
    let addr = service.start().unwrap();
    assert!(service.is_running());
    assert_eq!(service.local_addr(), Some(addr));

    send(
        addr,
        br#"{"hand_gesture":"close","x":0.25,"y":0.75,"finger_gesture":"counter_clockwise"}"#,
    );
    assert!(wait_until(Duration::from_secs(2), || state.publish_count() == 1));
    assert_eq!(state.read(), GestureSample::new(HandGesture::Close, 0.25, 0.75));
    assert_eq!(state.history().as_deref(), Some("counter_clockwise"));

    send(addr, br#"{"hand_gesture":"open","x":0.5,"y":0.5}"#);
    assert!(wait_until(Duration::from_secs(2), || state.publish_count() == 2));
    assert_eq!(state.read().gesture, HandGesture::Open);
    assert_eq!(state.history().as_deref(), Some("counter_clockwise"));

    service.stop().unwrap();
    assert!(!service.is_running());
}

#[test]
fn malformed_datagrams_are_dropped_and_counted() {
    let state = Arc::new(SharedGestureState::new());
    let mut service = GestureIngestionService::new(loopback_config(), Arc::clone(&state));
    let addr = service.start().unwrap();

    send(addr, br#"{"hand_gesture":"pointer","x":0.1,"y":0.2}"#);
    assert!(wait_until(Duration::from_secs(2), || state.publish_count() == 1));

    send(addr, br#"{"hand_gesture":"close","y":0.9}"#);
    send(addr, b"not json at all");
    send(addr, br#"{"hand_gesture":"close","x":"left","y":0.5}"#);
    assert!(wait_until(Duration::from_secs(2), || service.stats().dropped == 3));

    let stats = service.stats();
    assert_eq!(stats.received, 4);
    assert_eq!(stats.accepted, 1);
    assert_eq!(state.publish_count(), 1);
    assert_eq!(state.read(), GestureSample::new(HandGesture::Pointer, 0.1, 0.2));

    service.stop().unwrap();
}

#[test]
fn exit_message_is_published_like_any_other() {
    let state = Arc::new(SharedGestureState::new());
    let mut service = GestureIngestionService::new(loopback_config(), Arc::clone(&state));
    let addr = service.start().unwrap();

    send(addr, br#"{"hand_gesture":"exit","x":0.5,"y":0.5}"#);
    assert!(wait_until(Duration::from_secs(2), || state.publish_count() == 1));
    assert_eq!(state.read().gesture, HandGesture::Exit);
    assert!(service.is_running());

    service.stop().unwrap();
}

#[test]
fn occupied_port_is_a_bind_failure() {
    let holder = UdpSocket::bind("127.0.0.1:0").unwrap();
    let taken = holder.local_addr().unwrap();

    let state = Arc::new(SharedGestureState::new());
    let config = IngestConfig {
        bind_addr: taken,
        ..loopback_config()
    };
    let mut service = GestureIngestionService::new(config, Arc::clone(&state));
    match service.start() {
        Err(BridgeError::BindFailure { addr, .. }) => assert_eq!(addr, taken),
        other => panic!("expected bind failure, got {other:?}"),
    }
    assert!(!service.is_running());
    assert_eq!(state.read(), GestureSample::default());
    // Stopping an inert service is fine.
    service.stop().unwrap();
}

#[test]
fn stop_is_bounded_without_traffic() {
    let state = Arc::new(SharedGestureState::new());
    let mut service = GestureIngestionService::new(loopback_config(), state);
    service.start().unwrap();

    let started = Instant::now();
    service.stop().unwrap();
    assert!(started.elapsed() < Duration::from_secs(1));
    service.stop().unwrap();
}

#[test]
fn restarts_after_stop() {
    let state = Arc::new(SharedGestureState::new());
    let mut service = GestureIngestionService::new(loopback_config(), Arc::clone(&state));
    service.start().unwrap();
    service.stop().unwrap();

    let addr = service.start().unwrap();
    send(addr, br#"{"hand_gesture":"ok","x":0.3,"y":0.3}"#);
    assert!(wait_until(Duration::from_secs(2), || state.publish_count() == 1));
    assert_eq!(state.read().gesture, HandGesture::Ok);
    service.stop().unwrap();
}

#[test]
fn oversized_datagram_is_dropped_and_counted() {
    let state = Arc::new(SharedGestureState::new());
    let config = IngestConfig {
        max_datagram_bytes: 64,
        ..loopback_config()
    };
    let mut service = GestureIngestionService::new(config, Arc::clone(&state));
    let addr = service.start().unwrap();

    let oversized = format!(
        r#"{{"hand_gesture":"close","x":0.5,"y":0.5,"finger_gesture":"{}"}}"#,
        "a".repeat(200)
    );
    send(addr, oversized.as_bytes());
    assert!(wait_until(Duration::from_secs(2), || service.stats().dropped == 1));
    assert_eq!(service.stats().received, 1);
    assert_eq!(state.publish_count(), 0);

    send(addr, br#"{"hand_gesture":"open","x":0.2,"y":0.2}"#);
    assert!(wait_until(Duration::from_secs(2), || state.publish_count() == 1));
    assert_eq!(service.stats().accepted, 1);
    service.stop().unwrap();
}
