//! Byte-exact GOOSE frame engine: Ethernet/VLAN offset parsing, the BER
//! length codec, the APDU walk that locates `stNum`/`sqNum`/`allData`/tag,
//! HMAC+freshness verification, in-place tag stripping, and the
//! monitor/enforce forwarding decision. Ground truth is `goose_parse.c`
//! (`ber_len_read`/`ber_len_write_same`/`tlv_next_ber`/`goose_extract_meta`/
//! `strip_last_octet_tag`) and `bitw_engine.c` (`parse_eth`,
//! `locate_seq_and_allData`, `find_tail_tlv_as_tag`, `verify_hmac_and_freshness`,
//! `process_and_forward`).

use crate::canonical::{build_canonical_blob, dataset_bytes_from_raw_entries};
use crate::error::VerifyError;
use crate::freshness;
use crate::tagging;
use crate::types::{FreshnessWindow, PolicyMode, PolicyRecord};

const ETHERTYPE_VLAN: u16 = 0x8100;
const ETHERTYPE_GOOSE: u16 = 0x88b8;
const ETHERTYPE_PTP: u16 = 0x88f7;

fn be16(frame: &[u8], pos: usize) -> u16 {
    u16::from_be_bytes([frame[pos], frame[pos + 1]])
}

fn set_be16(frame: &mut [u8], pos: usize, v: u16) {
    frame[pos..pos + 2].copy_from_slice(&v.to_be_bytes());
}

/// Reads a BER length at `pos`, returning `(value, width_in_bytes)`.
pub fn ber_len_read(frame: &[u8], end: usize, pos: usize) -> Option<(usize, usize)> {
    if pos >= end {
        return None;
    }
    let l0 = frame[pos];
    if l0 & 0x80 == 0 {
        return Some((l0 as usize, 1));
    }
    let n = (l0 & 0x7f) as usize;
    if n == 0 || n > 3 {
        return None;
    }
    if pos + 1 + n > end {
        return None;
    }
    let mut v = 0usize;
    for i in 0..n {
        v = (v << 8) | frame[pos + 1 + i] as usize;
    }
    Some((v, 1 + n))
}

/// Writes `new_len` back into a length slot of `nlen` bytes, preserving the
/// original BER encoding width.
pub fn ber_len_write_same(frame: &mut [u8], pos: usize, new_len: usize, nlen: usize) {
    if nlen == 1 {
        frame[pos] = new_len as u8;
        return;
    }
    let n = nlen - 1;
    frame[pos] = 0x80 | n as u8;
    let mut v = new_len;
    for i in (0..n).rev() {
        frame[pos + 1 + i] = (v & 0xff) as u8;
        v >>= 8;
    }
}

/// Advances past the TLV starting at `pos`, returning the next position.
fn tlv_next(frame: &[u8], end: usize, pos: usize) -> Option<usize> {
    if pos + 2 > end {
        return None;
    }
    let (len, nlen) = ber_len_read(frame, end, pos + 1)?;
    let next = pos + 1 + nlen + len;
    if next <= end {
        Some(next)
    } else {
        None
    }
}

/// Offsets derived from the Ethernet/VLAN header: where the APDU starts
/// and where the 16-bit APPID length field lives.
#[derive(Debug, Clone, Copy)]
struct EthOffsets {
    apdu_off: usize,
    app_len_off: usize,
}

fn inner_ether_type(frame: &[u8]) -> Option<u16> {
    if frame.len() < 14 {
        return None;
    }
    let et = be16(frame, 12);
    if et == ETHERTYPE_VLAN {
        if frame.len() < 18 {
            return None;
        }
        Some(be16(frame, 16))
    } else {
        Some(et)
    }
}

fn eth_offsets(frame: &[u8]) -> Option<EthOffsets> {
    if frame.len() < 22 {
        return None;
    }
    let et = be16(frame, 12);
    if et == ETHERTYPE_VLAN {
        if frame.len() < 26 {
            return None;
        }
        Some(EthOffsets {
            apdu_off: 26,
            app_len_off: 20,
        })
    } else {
        Some(EthOffsets {
            apdu_off: 22,
            app_len_off: 16,
        })
    }
}

/// Classification of a captured frame before any GOOSE-specific parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Ptp,
    Goose,
    Other,
}

pub fn classify(frame: &[u8]) -> FrameKind {
    match inner_ether_type(frame) {
        Some(ETHERTYPE_PTP) => FrameKind::Ptp,
        Some(ETHERTYPE_GOOSE) => FrameKind::Goose,
        _ => FrameKind::Other,
    }
}

/// Metadata extracted from a GOOSE frame's APDU.
#[derive(Debug, Clone, Copy)]
pub struct FrameMeta {
    pub app_id: u16,
    pub st_num: u32,
    pub sq_num: u32,
    pub tag_pos: Option<usize>,
    pub tag_len: usize,
}

/// Value region of the outer SEQUENCE and, if present, of `allData`.
#[derive(Debug, Clone, Copy, Default)]
struct Regions {
    seq_v: usize,
    seq_e: usize,
    all_v: usize,
    all_e: usize,
}

fn locate_seq_and_all_data(frame: &[u8], apdu_off: usize) -> Option<Regions> {
    let flen = frame.len();
    if apdu_off + 2 > flen || frame[apdu_off] != 0x61 {
        return None;
    }
    let (seq_l, seq_nl) = ber_len_read(frame, flen, apdu_off + 1)?;
    let seq_v = apdu_off + 1 + seq_nl;
    let seq_e = seq_v + seq_l;
    if seq_e > flen {
        return None;
    }

    let mut regions = Regions {
        seq_v,
        seq_e,
        all_v: 0,
        all_e: 0,
    };

    let mut p = seq_v;
    while p + 2 <= seq_e {
        let (l2, nl2) = match ber_len_read(frame, seq_e, p + 1) {
            Some(v) => v,
            None => break,
        };
        if frame[p] == 0xAB {
            regions.all_v = p + 1 + nl2;
            regions.all_e = regions.all_v + l2;
            break;
        }
        let next = p + 1 + nl2 + l2;
        if next <= p || next > seq_e {
            break;
        }
        p = next;
    }
    Some(regions)
}

/// Extracts `appId`, `stNum`, `sqNum`, and the final-TLV tag candidate
/// inside `allData` from a captured GOOSE frame.
pub fn extract_meta(frame: &[u8]) -> Result<FrameMeta, VerifyError> {
    let flen = frame.len();
    if flen < 42 {
        return Err(VerifyError::MetaExtraction);
    }
    if inner_ether_type(frame) != Some(ETHERTYPE_GOOSE) {
        return Err(VerifyError::NotGoose);
    }
    let offs = eth_offsets(frame).ok_or(VerifyError::MetaExtraction)?;
    let app_id = be16(frame, offs.app_len_off - 2);

    if offs.apdu_off + 2 > flen || frame[offs.apdu_off] != 0x61 {
        return Err(VerifyError::MetaExtraction);
    }
    let (seq_l, seq_nl) =
        ber_len_read(frame, flen, offs.apdu_off + 1).ok_or(VerifyError::MetaExtraction)?;
    let seq_v = offs.apdu_off + 1 + seq_nl;
    let seq_e = seq_v + seq_l;
    if seq_e > flen {
        return Err(VerifyError::MetaExtraction);
    }

    let mut st_num = None;
    let mut sq_num = None;
    let mut i = seq_v;
    while i + 2 <= seq_e {
        let tag = frame[i];
        let (l, nl) = match ber_len_read(frame, seq_e, i + 1) {
            Some(v) => v,
            None => break,
        };
        if l <= 4 {
            if st_num.is_none() && matches!(tag, 0x85 | 0x87 | 0x02) {
                let mut v: u32 = 0;
                for k in 0..l {
                    v = (v << 8) | frame[i + 1 + nl + k] as u32;
                }
                st_num = Some(v);
            } else if st_num.is_some() && sq_num.is_none() && matches!(tag, 0x86 | 0x88 | 0x02) {
                let mut v: u32 = 0;
                for k in 0..l {
                    v = (v << 8) | frame[i + 1 + nl + k] as u32;
                }
                sq_num = Some(v);
            }
        }
        let next = i + 1 + nl + l;
        if next <= i {
            break;
        }
        i = next;
        if st_num.is_some() && sq_num.is_some() {
            break;
        }
    }
    let (st_num, sq_num) = match (st_num, sq_num) {
        (Some(a), Some(b)) => (a, b),
        _ => return Err(VerifyError::MissingTag),
    };

    let mut all_v = 0usize;
    let mut all_e = 0usize;
    let mut i = seq_v;
    while i + 2 <= seq_e {
        if frame[i] == 0xAB {
            let (l, nl) = match ber_len_read(frame, seq_e, i + 1) {
                Some(v) => v,
                None => break,
            };
            all_v = i + 1 + nl;
            all_e = all_v + l;
            break;
        }
        match tlv_next(frame, seq_e, i) {
            Some(next) => i = next,
            None => break,
        }
    }

    let mut tag_pos = None;
    let mut tag_len = 0usize;
    if all_v != 0 && all_e <= seq_e && all_e > all_v {
        let mut last_pos: Option<usize> = None;
        let mut last_len = 0usize;
        let mut p = all_v;
        while p + 2 <= all_e {
            let (l, nl) = match ber_len_read(frame, all_e, p + 1) {
                Some(v) => v,
                None => break,
            };
            let total = 1 + nl + l;
            let next = p + total;
            if next > all_e {
                break;
            }
            if (8..=64).contains(&l) {
                last_pos = Some(p);
                last_len = total;
            }
            p = next;
        }
        if let Some(pos) = last_pos {
            tag_pos = Some(pos);
            tag_len = last_len;
        }
    }

    Ok(FrameMeta {
        app_id,
        st_num,
        sq_num,
        tag_pos,
        tag_len,
    })
}

/// Fallback scan used only for stripping: the last TLV in the frame whose
/// value length is in `[8, 64]` and which ends exactly at `flen`.
fn find_tail_tlv(frame: &[u8], apdu_off: usize) -> Option<(usize, usize)> {
    let flen = frame.len();
    if flen < 2 {
        return None;
    }
    let mut p = flen as isize - 2;
    while p >= apdu_off as isize {
        let pos = p as usize;
        if pos + 2 <= flen {
            if let Some((l, nl)) = ber_len_read(frame, flen, pos + 1) {
                let total = 1 + nl + l;
                if pos + total == flen && (8..=64).contains(&l) {
                    return Some((pos, total));
                }
            }
        }
        p -= 1;
    }
    None
}

/// Reconstructs the canonical dataset bytes directly from the wire frame,
/// walking `allData` up to (not including) the tag TLV.
fn dataset_canon_from_frame(frame: &[u8], apdu_off: usize, tag_pos: usize) -> Vec<u8> {
    let regions = match locate_seq_and_all_data(frame, apdu_off) {
        Some(r) if r.all_v != 0 => r,
        _ => return Vec::new(),
    };
    let mut entries: Vec<&[u8]> = Vec::new();
    let mut p = regions.all_v;
    while p < tag_pos && p + 2 <= regions.all_e {
        let (l, nl) = match ber_len_read(frame, regions.all_e, p + 1) {
            Some(v) => v,
            None => break,
        };
        let val_start = p + 1 + nl;
        entries.push(&frame[val_start..val_start + l]);
        let next = p + 1 + nl + l;
        if next >= tag_pos || entries.len() >= 2 {
            break;
        }
        p = next;
    }
    dataset_bytes_from_raw_entries(&entries)
}

/// Verifies a captured frame against one policy record, advancing its
/// freshness window on acceptance. Returns the extracted metadata so the
/// caller can decide whether/how to strip.
pub fn verify(
    policy: &PolicyRecord,
    okm: &[u8; 32],
    frame: &[u8],
    window: &mut FreshnessWindow,
    now_ms: u64,
) -> Result<FrameMeta, VerifyError> {
    let meta = extract_meta(frame)?;
    if meta.app_id != policy.stream.app_id {
        return Err(VerifyError::AppIdMismatch);
    }

    let tag_pos = match meta.tag_pos {
        Some(p) => p,
        None => {
            if policy.stream.allow_unsigned {
                return freshness::check(
                    window,
                    meta.st_num,
                    meta.sq_num,
                    policy.max_sq_gap,
                    policy.max_age_ms,
                    now_ms,
                )
                .map(|_| meta);
            }
            return Err(VerifyError::MissingTag);
        }
    };

    let (tag_vlen, tag_nl) =
        ber_len_read(frame, frame.len(), tag_pos + 1).ok_or(VerifyError::MalformedLength)?;
    if tag_vlen != 16 && tag_vlen != 32 {
        return Err(VerifyError::MalformedLength);
    }
    let tag_v_start = tag_pos + 1 + tag_nl;
    let tag = &frame[tag_v_start..tag_v_start + tag_vlen];

    let offs = eth_offsets(frame).ok_or(VerifyError::MetaExtraction)?;
    let ds = dataset_canon_from_frame(frame, offs.apdu_off, tag_pos);
    let pub_candidate = build_canonical_blob(
        &policy.stream.go_id,
        &policy.stream.gocb_ref,
        policy.stream.app_id,
        meta.st_num,
        meta.sq_num,
        &ds,
    );

    let regions = locate_seq_and_all_data(frame, offs.apdu_off).unwrap_or_default();
    let all_candidate: &[u8] = if regions.all_v != 0 && tag_pos > regions.all_v && tag_pos <= regions.all_e {
        &frame[regions.all_v..tag_pos]
    } else {
        &[]
    };
    let seq_candidate: &[u8] = if tag_pos > regions.seq_v && tag_pos <= regions.seq_e {
        &frame[regions.seq_v..tag_pos]
    } else {
        &[]
    };

    let candidates: [&[u8]; 3] = [&pub_candidate, all_candidate, seq_candidate];
    let matched = candidates.iter().any(|candidate| {
        if candidate.is_empty() {
            return false;
        }
        let mac = tagging::compute_mac(okm, candidate);
        tagging::tag_matches(&mac, tag)
    });
    if !matched {
        return Err(VerifyError::TagMismatch);
    }

    freshness::check(
        window,
        meta.st_num,
        meta.sq_num,
        policy.max_sq_gap,
        policy.max_age_ms,
        now_ms,
    )
    .map(|_| meta)
}

/// Strips the final tag TLV from `frame` in place, repairing `allData`'s
/// length (if the tag was inside it), the outer SEQUENCE's length, and the
/// APPID length field, all without changing any BER length field's width.
pub fn strip_tag(frame: &mut Vec<u8>, tag_pos: usize, tag_len: usize) -> bool {
    let flen = frame.len();
    if flen < 42 || tag_pos == 0 || tag_len < 2 || tag_pos + tag_len > flen {
        return false;
    }
    let offs = match eth_offsets(frame) {
        Some(o) => o,
        None => return false,
    };
    if tag_pos < offs.apdu_off {
        return false;
    }

    let seq_tag = offs.apdu_off;
    let (seq_l, seq_nl) = match ber_len_read(frame, flen, seq_tag + 1) {
        Some(v) => v,
        None => return false,
    };
    let seq_v = seq_tag + 1 + seq_nl;

    let mut all_lpos = 0usize;
    let mut all_nl = 0usize;
    let mut all_lval = 0usize;
    let mut have_all = false;
    {
        let mut i = seq_v;
        while i + 2 <= flen {
            if frame[i] == 0xAB {
                let (l, nl) = match ber_len_read(frame, flen, i + 1) {
                    Some(v) => v,
                    None => return false,
                };
                let v = i + 1 + nl;
                let e = v + l;
                if e > flen {
                    return false;
                }
                if tag_pos >= v && tag_pos + tag_len <= e {
                    all_lpos = i + 1;
                    all_nl = nl;
                    all_lval = l;
                    have_all = true;
                }
                i += 1 + nl + l;
                continue;
            }
            match tlv_next(frame, flen, i) {
                Some(next) => i = next,
                None => break,
            }
        }
    }

    // 1) Remove the tag TLV with one shift.
    let tail_src = tag_pos + tag_len;
    frame.copy_within(tail_src..flen, tag_pos);
    let new_flen = flen - tag_len;
    frame.truncate(new_flen);

    // 2) Shrink allData's length, if the tag lived inside it.
    if have_all {
        let new_all_l = all_lval - tag_len;
        ber_len_write_same(frame, all_lpos, new_all_l, all_nl);
    }

    // 3) Shrink the outer SEQUENCE's length unconditionally.
    let new_seq_l = seq_l - tag_len;
    ber_len_write_same(frame, seq_tag + 1, new_seq_l, seq_nl);

    // 4) Shrink the APPID length field.
    let app_len = be16(frame, offs.app_len_off);
    set_be16(frame, offs.app_len_off, app_len.wrapping_sub(tag_len as u16));

    true
}

/// Decides whether a frame should be injected on the opposite interface,
/// following a verification attempt that already ran for telemetry.
pub fn should_forward(mode: PolicyMode, verify_result: &Result<FrameMeta, VerifyError>) -> bool {
    match mode {
        PolicyMode::Monitor => true,
        PolicyMode::Enforce => verify_result.is_ok(),
    }
}

/// Resolves the tag location to strip, falling back to the tail-TLV
/// heuristic only when verification succeeded and no in-`allData`
/// candidate was found (spec's guard against corrupting unsigned traffic).
pub fn resolve_strip_location(
    frame: &[u8],
    apdu_off: usize,
    meta: &FrameMeta,
    verified: bool,
) -> Option<(usize, usize)> {
    if let Some(pos) = meta.tag_pos {
        return Some((pos, meta.tag_len));
    }
    if verified {
        return find_tail_tlv(frame, apdu_off);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_frame_with_tag(tag: &[u8]) -> Vec<u8> {
        // allData holds [bool TLV, int TLV, tag TLV]; stNum/sqNum precede it.
        let bool_tlv = [0x83u8, 0x01, 0x01];
        let int_tlv = [0x84u8, 0x04, 0, 0, 0, 42];
        let mut tag_tlv = vec![0x89u8, tag.len() as u8];
        tag_tlv.extend_from_slice(tag);

        let mut all_data = Vec::new();
        all_data.extend_from_slice(&bool_tlv);
        all_data.extend_from_slice(&int_tlv);
        all_data.extend_from_slice(&tag_tlv);

        let mut seq_value = Vec::new();
        seq_value.extend_from_slice(&[0x85, 0x01, 0x01]); // stNum = 1
        seq_value.extend_from_slice(&[0x86, 0x01, 0x00]); // sqNum = 0
        seq_value.push(0xAB);
        seq_value.push(all_data.len() as u8);
        seq_value.extend_from_slice(&all_data);

        let mut apdu = Vec::new();
        apdu.push(0x61);
        apdu.push(seq_value.len() as u8);
        apdu.extend_from_slice(&seq_value);

        let mut frame = vec![0u8; 22];
        frame[12] = 0x88;
        frame[13] = 0xb8;
        set_be16(&mut frame, 14, 1000); // appId
        set_be16(&mut frame, 16, apdu.len() as u16); // length field
        frame.extend_from_slice(&apdu);
        frame
    }

    #[test]
    fn extract_meta_finds_stnum_sqnum_and_tag() {
        let tag = [0x11u8; 16];
        let frame = sample_frame_with_tag(&tag);
        let meta = extract_meta(&frame).unwrap();
        assert_eq!(meta.app_id, 1000);
        assert_eq!(meta.st_num, 1);
        assert_eq!(meta.sq_num, 0);
        assert!(meta.tag_pos.is_some());
        assert_eq!(meta.tag_len, 2 + tag.len());
    }

    #[test]
    fn strip_tag_shrinks_all_enclosing_lengths() {
        let tag = [0x22u8; 16];
        let mut frame = sample_frame_with_tag(&tag);
        let meta = extract_meta(&frame).unwrap();
        let (pos, len) = (meta.tag_pos.unwrap(), meta.tag_len);
        let before_len = frame.len();

        assert!(strip_tag(&mut frame, pos, len));
        assert_eq!(frame.len(), before_len - len);

        let meta_after = extract_meta(&frame).unwrap();
        assert!(meta_after.tag_pos.is_none());

        let app_len = be16(&frame, 16) as usize;
        assert_eq!(app_len, frame.len() - 18);
    }

    #[test]
    fn classify_detects_ptp_and_goose() {
        let tag = [0u8; 16];
        let goose = sample_frame_with_tag(&tag);
        assert_eq!(classify(&goose), FrameKind::Goose);

        let mut ptp = vec![0u8; 22];
        ptp[12] = 0x88;
        ptp[13] = 0xf7;
        assert_eq!(classify(&ptp), FrameKind::Ptp);

        let mut other = vec![0u8; 22];
        other[12] = 0x08;
        other[13] = 0x00;
        assert_eq!(classify(&other), FrameKind::Other);
    }

    #[test]
    fn forward_policy_monitor_always_forwards() {
        let result: Result<FrameMeta, VerifyError> = Err(VerifyError::TagMismatch);
        assert!(should_forward(PolicyMode::Monitor, &result));
        assert!(!should_forward(PolicyMode::Enforce, &result));
    }

    #[test]
    fn extract_meta_rejects_non_goose_ethertype() {
        let mut frame = vec![0u8; 22];
        frame[12] = 0x08;
        frame[13] = 0x00;
        assert_eq!(extract_meta(&frame).unwrap_err(), VerifyError::NotGoose);
    }
}
