//! Loads the JSON documents that drive all three binaries: a gateway's
//! `PolicyRecord`, a publisher's `PublicationRecord`, a subscriber's
//! `SubscriptionRecord`, and a subscriber's `TripLogic`. Ground truth is
//! `bitw_policy_loader.c`'s `load_policy`, `config_loader.c`'s
//! `load_publication_config`, and `sub_config_loader.c`'s
//! `load_subscription_config` — this module keeps their flat JSON shape and
//! required-field checks, but leans on `serde` for the actual parsing.

use std::fs;
use std::path::Path;

use crate::error::GuardError;
use crate::types::{PolicyRecord, PublicationRecord, SubscriptionRecord, TripLogic};

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, GuardError> {
    let text = fs::read_to_string(path).map_err(|source| GuardError::PolicyRead {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| GuardError::PolicyParse {
        path: path.display().to_string(),
        source,
    })
}

/// Loads a gateway policy and decodes its device key, matching
/// `bitw_policy_loader.c`'s `hex2bin` length/format check exactly.
pub fn load_policy(path: impl AsRef<Path>) -> Result<(PolicyRecord, [u8; 32]), GuardError> {
    let path = path.as_ref();
    let record: PolicyRecord = read_json(path)?;
    let key = decode_device_key(&record.device.device_id, &record.device.k_device_hex)?;
    Ok((record, key))
}

/// Loads a publisher's dataset/framing configuration and decodes its
/// device key.
pub fn load_publication(path: impl AsRef<Path>) -> Result<(PublicationRecord, [u8; 32]), GuardError> {
    let path = path.as_ref();
    let record: PublicationRecord = read_json(path)?;
    let key = decode_device_key(&record.device.device_id, &record.device.k_device_hex)?;
    Ok((record, key))
}

/// Loads a subscriber's stream selector. The subscriber never holds key
/// material of its own — it only consumes frames the gateway has already
/// verified — so there is no key to decode here.
pub fn load_subscription(path: impl AsRef<Path>) -> Result<SubscriptionRecord, GuardError> {
    read_json(path.as_ref())
}

/// Loads a subscriber's trip-rule document. Every field defaults per
/// `sub_core.c: trip_logic_load`'s fallback values when the document omits
/// them, so an empty `{}` file still parses into a usable (inert) `TripLogic`.
pub fn load_trip_logic(path: impl AsRef<Path>) -> Result<TripLogic, GuardError> {
    read_json(path.as_ref())
}

fn decode_device_key(device_id: &str, hex_str: &str) -> Result<[u8; 32], GuardError> {
    let bytes = hex::decode(hex_str).map_err(|source| GuardError::BadDeviceKey {
        device_id: device_id.to_string(),
        source,
    })?;
    if bytes.len() != 32 {
        return Err(GuardError::DeviceKeyLength {
            device_id: device_id.to_string(),
            len: bytes.len(),
        });
    }
    let mut key = [0u8; 32];
    key.copy_from_slice(&bytes);
    Ok(key)
}

/// Parses a colon-separated hex MAC string (`"aa:bb:cc:dd:ee:ff"`), matching
/// `config_loader.c`'s / `sub_config_loader.c`'s `parse_hex_mac`.
pub fn parse_mac(s: &str) -> Result<[u8; 6], GuardError> {
    let mut mac = [0u8; 6];
    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() != 6 {
        return Err(GuardError::BadMacAddress(s.to_string()));
    }
    for (i, part) in parts.iter().enumerate() {
        mac[i] = u8::from_str_radix(part, 16).map_err(|_| GuardError::BadMacAddress(s.to_string()))?;
    }
    Ok(mac)
}
