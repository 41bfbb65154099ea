//! Send a single recognizer datagram, for driving the bridge by hand.
//!
//! `send_gesture <hand_gesture> <x> <y> [finger_gesture] [--addr host:port]`

use std::env;
use std::net::{SocketAddr, UdpSocket};

use anyhow::{anyhow, bail, Context, Result};
use gesture_pointer::ingest::{default_ingest_addr, WireMessage};

const USAGE: &str = "usage: send_gesture <hand_gesture> <x> <y> [finger_gesture] [--addr host:port]";

fn parse_args() -> Result<(WireMessage, SocketAddr)> {
    let mut addr = default_ingest_addr();
    let mut positional = Vec::new();

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--addr" => {
                let value = args.next().ok_or_else(|| anyhow!(USAGE))?;
                addr = value
                    .parse()
                    .with_context(|| format!("invalid address '{value}'"))?;
            }
            "-h" | "--help" => bail!(USAGE),
            _ => positional.push(arg),
        }
    }

    if !(3..=4).contains(&positional.len()) {
        bail!(USAGE);
    }
    let x: f64 = positional[1]
        .parse()
        .with_context(|| format!("x '{}' is not a number", positional[1]))?;
    let y: f64 = positional[2]
        .parse()
        .with_context(|| format!("y '{}' is not a number", positional[2]))?;

    let message = WireMessage {
        hand_gesture: positional[0].clone(),
        x,
        y,
        finger_gesture: positional.get(3).cloned(),
    };
    Ok((message, addr))
}

fn main() -> Result<()> {
    let (message, addr) = parse_args()?;
    let payload = serde_json::to_vec(&message)?;

    let socket = UdpSocket::bind("127.0.0.1:0").context("bind local socket")?;
    let sent = socket
        .send_to(&payload, addr)
        .with_context(|| format!("send to {addr}"))?;
    println!("sent {sent} bytes to {addr}: {}", String::from_utf8_lossy(&payload));
    Ok(())
}
