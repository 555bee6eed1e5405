//! `goosectl-publisher <config_path> <iface>` — emits signed GOOSE frames
//! for one publication, retransmitting with the usual IEC 61850-8-1
//! fast/slow backoff. Retransmission shape is grounded in
//! `publication_manager.c`/`publisher_core.c`; tag computation in
//! `auth_security.c`.

use std::env;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{bail, Context, Result};
use pnet::datalink::{self, Channel, DataLinkSender, NetworkInterface};

use goose_guard::canonical::{build_canonical_blob, dataset_bytes_from_publication};
use goose_guard::encode_goose::{encode_goose, goose_size};
use goose_guard::error::GuardError;
use goose_guard::policy;
use goose_guard::status::{self, StatusRecord};
use goose_guard::tagging;
use goose_guard::types::{GooseConfig, GooseRuntime, IECData};

fn now_unix() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

fn now_ms() -> u64 {
    (now_unix() * 1000.0) as u64
}

fn find_interface(name: &str) -> Result<NetworkInterface, GuardError> {
    datalink::interfaces()
        .into_iter()
        .find(|iface| iface.name == name)
        .ok_or_else(|| GuardError::NoSuchInterface(name.to_string()))
}

fn open_sender(iface: &NetworkInterface) -> Result<Box<dyn DataLinkSender>, GuardError> {
    match datalink::channel(iface, datalink::Config::default()) {
        Ok(Channel::Ethernet(tx, _rx)) => Ok(tx),
        Ok(_) => Err(GuardError::UnsupportedChannel(iface.name.clone())),
        Err(source) => Err(GuardError::ChannelOpen {
            iface: iface.name.clone(),
            source,
        }),
    }
}

/// Re-signs `config.all_data`'s tag entry (replacing it if already present,
/// appending otherwise) for the current `stNum`/`sqNum`.
fn sign(config: &mut GooseConfig, runtime: &GooseRuntime, okm: &[u8; 32], truncate_bytes: u8, dataset: &[goose_guard::types::DatasetFieldSpec]) {
    let ds_bytes = dataset_bytes_from_publication(dataset);
    let blob = build_canonical_blob(
        &config.go_id,
        &config.go_cb_ref,
        u16::from_be_bytes(config.appid),
        runtime.st_num,
        runtime.sq_num,
        &ds_bytes,
    );
    let mac = tagging::compute_mac(okm, &blob);
    let tag: Vec<u8> = if truncate_bytes as usize >= mac.len() {
        mac.to_vec()
    } else {
        mac[..truncate_bytes as usize].to_vec()
    };

    if matches!(config.all_data.last(), Some(IECData::OctetString(_))) {
        config.all_data.pop();
    }
    config.all_data.push(IECData::OctetString(tag));
}

/// Sleeps for `total_ms`, checking `shutdown` every 10ms so a signal can
/// interrupt a long backoff interval promptly.
fn responsive_sleep(total_ms: u64, shutdown: &AtomicBool) {
    let step = Duration::from_millis(10);
    let mut remaining = total_ms;
    while remaining > 0 && !shutdown.load(Ordering::Relaxed) {
        let chunk = remaining.min(10);
        std::thread::sleep(step.min(Duration::from_millis(chunk)));
        remaining = remaining.saturating_sub(chunk);
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();
    if args.len() != 3 {
        bail!("usage: goosectl-publisher <config_path> <iface>");
    }
    let config_path = &args[1];
    let iface_name = &args[2];

    let (rec, device_key) = policy::load_publication(config_path)
        .with_context(|| format!("loading publication {config_path}"))?;

    let dst_mac = match &rec.dst_mac {
        Some(s) => policy::parse_mac(s).context("parsing dstMac")?,
        None => bail!("publication {config_path} has no dstMac configured"),
    };

    let iface = find_interface(iface_name).context("resolving interface")?;
    let src_mac = iface
        .mac
        .ok_or_else(|| anyhow::anyhow!("interface {iface_name} has no MAC address"))?
        .octets();
    let mut tx = open_sender(&iface).context("opening interface")?;

    let info = tagging::build_info(&rec.device.kdf_info_fmt, &rec.go_id, &rec.gocb_ref, rec.app_id);
    let okm = tagging::derive_okm(&device_key, &info);

    let min_repetition_ms = rec.min_repetition_ms.max(1);
    let heartbeat_ms = rec.heartbeat_ms.unwrap_or(min_repetition_ms).max(min_repetition_ms);

    let mut config = GooseConfig::from_publication(&rec, dst_mac, (2 * min_repetition_ms) as u32);
    let mut runtime = GooseRuntime::new(src_mac);
    runtime.simulation = rec.test;

    let shutdown = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&shutdown))
        .context("registering SIGINT handler")?;
    signal_hook::flag::register(signal_hook::consts::SIGTERM, Arc::clone(&shutdown))
        .context("registering SIGTERM handler")?;

    let pid = process::id();
    let status_file = status::status_path("goose_pub", pid);

    log::info!(
        "publisher started config={config_path} iface={iface_name} goID={} minRep={}ms heartbeat={}ms",
        rec.go_id, min_repetition_ms, heartbeat_ms
    );

    let mut interval_ms = min_repetition_ms;
    let mut first = true;

    while !shutdown.load(Ordering::Relaxed) {
        if first {
            runtime.touch(now_unix());
            first = false;
        } else {
            runtime.retransmit(now_unix());
        }
        config.time_allowed_to_live_ms = (2 * interval_ms) as u32;

        sign(&mut config, &runtime, &okm, rec.device.truncate_bytes, &rec.dataset);

        let (frame_len, ..) = goose_size(&config, &runtime);
        let mut buffer = vec![0u8; frame_len as usize];
        match encode_goose(&config, &runtime, &mut buffer) {
            Ok(written) => {
                buffer.truncate(written);
                if let Some(Err(e)) = tx.send_to(&buffer, None) {
                    log::warn!("failed to send frame: {e}");
                }
            }
            Err(e) => log::warn!("failed to encode frame: {e}"),
        }

        status::write_status(
            &status_file,
            &StatusRecord {
                pid,
                st_num: runtime.st_num,
                sq_num: runtime.sq_num,
                ttl_ms: Some(config.time_allowed_to_live_ms as u64),
                valid: None,
                last_recv_ms: None,
                last_publish_ms: Some(now_ms()),
                last_update: now_ms(),
                trip: None,
                trip_reason: None,
            },
        );

        responsive_sleep(interval_ms, &shutdown);
        interval_ms = (interval_ms * 2).min(heartbeat_ms);
    }

    status::remove_status(&status_file);
    log::info!("publisher shutting down");
    Ok(())
}
