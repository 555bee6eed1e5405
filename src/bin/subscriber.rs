//! `goosectl-subscriber <config_path> <iface>` — watches one GOOSE stream
//! and evaluates its trip logic. Ground truth for the reader-thread/main-
//! thread split and the SIGUSR1 reset rendezvous is `sub_core.c`'s
//! `subscriber_run`/`subscriber_listener` split between the library's
//! callback thread and the process's signal-driven main loop.

use std::env;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{bail, Context, Result};
use pnet::datalink::{self, Channel, NetworkInterface};

use goose_guard::decode_basics::decode_ethernet_header;
use goose_guard::decode_goose::{decode_goose_pdu, is_goose_frame};
use goose_guard::error::GuardError;
use goose_guard::policy;
use goose_guard::status::{self, StatusRecord};
use goose_guard::trip::{self, DatasetValue, FrameObservation};
use goose_guard::types::{EthernetHeader, IECData, IECGoosePdu, SubscriptionRecord, TripLogic, TripRuntime};

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

/// Maps a decoded dataset to the trip evaluator's value shape, keeping each
/// entry's wire position so `TripRule.index` still lines up.
fn to_dataset_values(all_data: &[IECData]) -> Vec<DatasetValue> {
    all_data
        .iter()
        .map(|entry| match entry {
            IECData::Boolean(b) => DatasetValue::Bool(*b),
            IECData::Int8(v) => DatasetValue::Int(*v as i64),
            IECData::Int16(v) => DatasetValue::Int(*v as i64),
            IECData::Int32(v) => DatasetValue::Int(*v as i64),
            IECData::Int64(v) => DatasetValue::Int(*v),
            IECData::Int8u(v) => DatasetValue::Int(*v as i64),
            IECData::Int16u(v) => DatasetValue::Int(*v as i64),
            IECData::Int32u(v) => DatasetValue::Int(*v as i64),
            _ => DatasetValue::Other,
        })
        .collect()
}

#[allow(clippy::too_many_arguments)]
fn reader_loop(
    sub: SubscriptionRecord,
    trip_logic: TripLogic,
    dst_mac: [u8; 6],
    mut rx: Box<dyn pnet::datalink::DataLinkReceiver>,
    shutdown: Arc<AtomicBool>,
    reset_requested: Arc<AtomicBool>,
) {
    let pid = process::id();
    let status_file = status::status_path("goose_sub", pid);
    let mut rt = TripRuntime::default();

    while !shutdown.load(Ordering::Relaxed) {
        let frame = match rx.next() {
            Ok(frame) => frame,
            Err(e)
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                ) =>
            {
                trip::maybe_relearn_baseline(&mut rt, trip_logic.baseline_relearn_ms, now_ms());
                continue;
            }
            Err(e) => {
                log::warn!("read error: {e}");
                continue;
            }
        };

        if !is_goose_frame(frame) {
            continue;
        }

        let mut header = EthernetHeader::default();
        let pos = decode_ethernet_header(&mut header, frame);
        if header.dst_addr != dst_mac {
            continue;
        }

        let frame_app_id = u16::from_be_bytes(header.appid);
        let mut pdu = IECGoosePdu::default();
        decode_goose_pdu(&mut pdu, frame, pos);

        if frame_app_id != sub.app_id || pdu.go_cb_ref != sub.gocb_ref {
            continue;
        }

        if reset_requested.swap(false, Ordering::Relaxed) {
            trip::manual_reset(&mut rt);
        }

        let values = to_dataset_values(&pdu.all_data);
        let obs = FrameObservation {
            st_num: pdu.st_num,
            sq_num: pdu.sq_num,
            valid: true,
            now_ms: now_ms(),
            values: &values,
        };
        let outcome = trip::on_frame(&mut rt, &trip_logic, &obs);

        if let Some(reason) = &outcome.newly_tripped_reason {
            log::warn!("trip latched: {reason}");
        }

        status::write_status(
            &status_file,
            &StatusRecord {
                pid,
                st_num: pdu.st_num,
                sq_num: pdu.sq_num,
                ttl_ms: Some(pdu.time_allowed_to_live as u64),
                valid: Some(true),
                last_recv_ms: Some(now_ms()),
                last_publish_ms: None,
                last_update: now_ms(),
                trip: Some(outcome.trip),
                trip_reason: outcome.trip_reason.clone(),
            },
        );
    }

    status::remove_status(&status_file);
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();
    if args.len() != 3 {
        bail!("usage: goosectl-subscriber <config_path> <iface>");
    }
    let config_path = &args[1];
    let iface_name = &args[2];

    let sub = policy::load_subscription(config_path)
        .with_context(|| format!("loading subscription {config_path}"))?;
    let trip_logic = policy::load_trip_logic(&sub.trip_logic_path)
        .with_context(|| format!("loading trip logic {}", sub.trip_logic_path))?;
    let dst_mac = policy::parse_mac(&sub.dst_mac).context("parsing dstMac")?;

    let iface = find_interface(iface_name).context("resolving interface")?;
    let channel_config = datalink::Config {
        read_timeout: Some(Duration::from_millis(50)),
        ..datalink::Config::default()
    };
    let rx = match datalink::channel(&iface, channel_config) {
        Ok(Channel::Ethernet(_tx, rx)) => rx,
        Ok(_) => bail!("unsupported datalink channel type on {iface_name}"),
        Err(source) => {
            return Err(GuardError::ChannelOpen {
                iface: iface_name.clone(),
                source,
            }
            .into())
        }
    };

    let shutdown = Arc::new(AtomicBool::new(false));
    let reset_requested = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&shutdown))
        .context("registering SIGINT handler")?;
    signal_hook::flag::register(signal_hook::consts::SIGTERM, Arc::clone(&shutdown))
        .context("registering SIGTERM handler")?;
    signal_hook::flag::register(signal_hook::consts::SIGUSR1, Arc::clone(&reset_requested))
        .context("registering SIGUSR1 handler")?;

    log::info!(
        "subscriber started config={config_path} iface={iface_name} appId={} gocbRef={}",
        sub.app_id, sub.gocb_ref
    );

    let reader_shutdown = Arc::clone(&shutdown);
    let reader_reset = Arc::clone(&reset_requested);
    let handle =
        std::thread::spawn(move || reader_loop(sub, trip_logic, dst_mac, rx, reader_shutdown, reader_reset));

    while !shutdown.load(Ordering::Relaxed) {
        std::thread::sleep(Duration::from_millis(50));
    }

    let _ = handle.join();
    log::info!("subscriber shutting down");
    Ok(())
}
