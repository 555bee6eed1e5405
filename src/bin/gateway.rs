//! `goosectl-gateway <policy_path> <ifA> <ifB>` — the bump-in-the-wire
//! verifier/rewriter. Single-threaded cooperative loop: drain interface A,
//! drain interface B, sleep, repeat. Ground truth for the loop shape is
//! spec.md §5; ground truth for the datalink plumbing is the teacher's
//! `ws_goose_rx.rs`/`ws_goose_tx.rs` use of `pnet::datalink::channel`,
//! adapted from tokio tasks to a single poll-then-sleep thread.

use std::env;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{bail, Context, Result};
use pnet::datalink::{self, Channel, DataLinkReceiver, DataLinkSender, NetworkInterface};

use goose_guard::engine::{self, FrameKind};
use goose_guard::error::GuardError;
use goose_guard::policy;
use goose_guard::tagging;
use goose_guard::types::{FreshnessWindow, PolicyMode, PolicyRecord};

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

fn find_interface(name: &str) -> Result<NetworkInterface, GuardError> {
    datalink::interfaces()
        .into_iter()
        .find(|iface| iface.name == name)
        .ok_or_else(|| GuardError::NoSuchInterface(name.to_string()))
}

fn open_channel(
    iface: &NetworkInterface,
) -> Result<(Box<dyn DataLinkSender>, Box<dyn DataLinkReceiver>), GuardError> {
    let config = datalink::Config {
        read_timeout: Some(Duration::from_millis(1)),
        ..datalink::Config::default()
    };
    match datalink::channel(iface, config) {
        Ok(Channel::Ethernet(tx, rx)) => Ok((tx, rx)),
        Ok(_) => Err(GuardError::UnsupportedChannel(iface.name.clone())),
        Err(source) => Err(GuardError::ChannelOpen {
            iface: iface.name.clone(),
            source,
        }),
    }
}

fn apdu_offset(frame: &[u8]) -> usize {
    if frame.len() >= 14 && frame[12..14] == [0x81, 0x00] {
        26
    } else {
        22
    }
}

fn inject(tx: &mut dyn DataLinkSender, frame: &[u8]) {
    if let Some(Err(e)) = tx.send_to(frame, None) {
        log::warn!("failed to inject frame: {e}");
    }
}

/// Drains every frame currently queued on `rx`, applying the forwarding
/// policy and injecting the result on `tx_out`, until the read times out.
fn pump(
    rx: &mut dyn DataLinkReceiver,
    tx_out: &mut dyn DataLinkSender,
    policy_rec: &PolicyRecord,
    okm: &[u8; 32],
    window: &mut FreshnessWindow,
) {
    loop {
        let frame = match rx.next() {
            Ok(frame) => frame,
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                return;
            }
            Err(e) => {
                log::warn!("read error: {e}");
                return;
            }
        };

        match engine::classify(frame) {
            FrameKind::Ptp => inject(tx_out, frame),
            FrameKind::Other => {}
            FrameKind::Goose => {
                let result = engine::verify(policy_rec, okm, frame, window, now_ms());
                match &result {
                    Ok(meta) => log::debug!("goose frame accepted st={} sq={}", meta.st_num, meta.sq_num),
                    Err(e) => log::warn!("goose frame rejected: {e}"),
                }

                if !engine::should_forward(policy_rec.mode, &result) {
                    continue;
                }

                if policy_rec.strip_tag && policy_rec.mode == PolicyMode::Enforce {
                    let strip_loc = result.as_ref().ok().and_then(|meta| {
                        engine::resolve_strip_location(frame, apdu_offset(frame), meta, result.is_ok())
                    });
                    if let Some((pos, len)) = strip_loc {
                        let mut owned = frame.to_vec();
                        if engine::strip_tag(&mut owned, pos, len) {
                            inject(tx_out, &owned);
                            continue;
                        }
                    }
                }
                inject(tx_out, frame);
            }
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();
    if args.len() != 4 {
        bail!("usage: goosectl-gateway <policy_path> <ifA> <ifB>");
    }
    let policy_path = &args[1];
    let if_a_name = &args[2];
    let if_b_name = &args[3];

    let (policy_rec, device_key) =
        policy::load_policy(policy_path).with_context(|| format!("loading policy {policy_path}"))?;
    let info = tagging::build_info(
        &policy_rec.device.kdf_info_fmt,
        &policy_rec.stream.go_id,
        &policy_rec.stream.gocb_ref,
        policy_rec.stream.app_id,
    );
    let okm = tagging::derive_okm(&device_key, &info);

    let if_a = find_interface(if_a_name).context("resolving interface A")?;
    let if_b = find_interface(if_b_name).context("resolving interface B")?;
    let (mut tx_a, mut rx_a) = open_channel(&if_a).context("opening interface A")?;
    let (mut tx_b, mut rx_b) = open_channel(&if_b).context("opening interface B")?;

    let shutdown = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&shutdown))
        .context("registering SIGINT handler")?;
    signal_hook::flag::register(signal_hook::consts::SIGTERM, Arc::clone(&shutdown))
        .context("registering SIGTERM handler")?;

    let mut window = FreshnessWindow::default();

    log::info!(
        "gateway started policy={policy_path} ifA={if_a_name} ifB={if_b_name} mode={:?} stripTag={}",
        policy_rec.mode, policy_rec.strip_tag
    );

    while !shutdown.load(Ordering::Relaxed) {
        pump(&mut *rx_a, &mut *tx_b, &policy_rec, &okm, &mut window);
        pump(&mut *rx_b, &mut *tx_a, &policy_rec, &okm, &mut window);
        std::thread::sleep(Duration::from_millis(5));
    }

    log::info!("gateway shutting down");
    Ok(())
}
