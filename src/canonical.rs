//! Canonical byte form used for both signing (publisher) and verification
//! (gateway, subscriber). See `auth_canon.c`'s `auth_build_canonical_blob`
//! and `auth_dataset_bytes_from_cfg` for the reference byte layout.

use crate::types::{DatasetFieldSpec, FieldType};

const TAG_STRING: u8 = 0xF0;
const TAG_U16: u8 = 0xF1;
const TAG_U32: u8 = 0xF2;
const TAG_BLOB: u8 = 0xF3;

fn put_str(buf: &mut Vec<u8>, s: &str) {
    let bytes = s.as_bytes();
    let len = bytes.len().min(u8::MAX as usize);
    buf.push(TAG_STRING);
    buf.push(len as u8);
    buf.extend_from_slice(&bytes[..len]);
}

fn put_u16(buf: &mut Vec<u8>, v: u16) {
    buf.push(TAG_U16);
    buf.push(2);
    buf.extend_from_slice(&v.to_be_bytes());
}

fn put_u32(buf: &mut Vec<u8>, v: u32) {
    buf.push(TAG_U32);
    buf.push(4);
    buf.extend_from_slice(&v.to_be_bytes());
}

fn put_blob(buf: &mut Vec<u8>, data: &[u8]) {
    let len = data.len().min(u8::MAX as usize);
    buf.push(TAG_BLOB);
    buf.push(len as u8);
    buf.extend_from_slice(&data[..len]);
}

/// Builds the fixed-order canonical blob: "GOOSE", goID, gocbRef, appId,
/// stNum, sqNum, dataset bytes.
pub fn build_canonical_blob(
    go_id: &str,
    gocb_ref: &str,
    app_id: u16,
    st_num: u32,
    sq_num: u32,
    dataset_bytes: &[u8],
) -> Vec<u8> {
    let mut buf = Vec::with_capacity(32 + dataset_bytes.len());
    put_str(&mut buf, "GOOSE");
    put_str(&mut buf, go_id);
    put_str(&mut buf, gocb_ref);
    put_u16(&mut buf, app_id);
    put_u32(&mut buf, st_num);
    put_u32(&mut buf, sq_num);
    put_blob(&mut buf, dataset_bytes);
    buf
}

/// Builds canonical dataset bytes from a publisher's configured dataset.
/// Only `boolean` and `integer` fields contribute; every other field type
/// is skipped, matching the verifier's MVP-level field support.
pub fn dataset_bytes_from_publication(dataset: &[DatasetFieldSpec]) -> Vec<u8> {
    let mut buf = Vec::new();
    for field in dataset {
        match field.field_type {
            FieldType::Boolean => {
                let v = field.value.as_bool().unwrap_or(false);
                buf.push(0x01);
                buf.push(0x01);
                buf.push(if v { 1 } else { 0 });
            }
            FieldType::Integer => {
                let v = field.value.as_i64().unwrap_or(0) as i32;
                buf.push(0x02);
                buf.push(0x04);
                buf.extend_from_slice(&v.to_be_bytes());
            }
            FieldType::Binarytime => {}
        }
    }
    buf
}

/// Reconstructs canonical dataset bytes from raw decoded `allData` entries,
/// as the verifier must when it only has the wire bytes. Entry 0 is treated
/// as a boolean, entry 1 as a 4-byte integer; any further entries are
/// ignored, matching the publisher-side limit.
pub fn dataset_bytes_from_raw_entries(entries: &[&[u8]]) -> Vec<u8> {
    let mut buf = Vec::new();
    for (idx, value) in entries.iter().enumerate() {
        match idx {
            0 => {
                let v = value.iter().any(|&b| b != 0);
                buf.push(0x01);
                buf.push(0x01);
                buf.push(if v { 1 } else { 0 });
            }
            1 => {
                let v = minimal_twos_complement_to_i32(value);
                buf.push(0x02);
                buf.push(0x04);
                buf.extend_from_slice(&v.to_be_bytes());
            }
            _ => break,
        }
    }
    buf
}

/// Sign-extends a minimal big-endian two's-complement value to `i32`.
fn minimal_twos_complement_to_i32(value: &[u8]) -> i32 {
    if value.is_empty() {
        return 0;
    }
    let negative = value[0] & 0x80 != 0;
    let mut bytes = [if negative { 0xFF } else { 0x00 }; 4];
    let take = value.len().min(4);
    let start = value.len() - take;
    bytes[4 - take..].copy_from_slice(&value[start..]);
    i32::from_be_bytes(bytes)
}
