//! HKDF-SHA-256 key derivation and HMAC-SHA-256 tag computation. Ground
//! truth is `auth_hmac.c`'s `hkdf_sha256_extract`/`hkdf_sha256_expand`/
//! `hmac_sha256`; this module gets the identical construction for free from
//! the `hkdf` crate's RFC 5869 implementation plus `hmac`/`sha2`.

use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Builds the KDF info string from a policy's `kdfInfoFmt` template,
/// substituting the three recognized placeholders literally.
pub fn build_info(fmt: &str, go_id: &str, gocb_ref: &str, app_id: u16) -> String {
    fmt.replace("{goID}", go_id)
        .replace("{gocbRef}", gocb_ref)
        .replace("{appId}", &app_id.to_string())
}

/// Derives the 32-byte output key material for one stream from the device
/// key and info string.
pub fn derive_okm(k_device: &[u8], info: &str) -> [u8; 32] {
    let hk = Hkdf::<Sha256>::new(None, k_device);
    let mut okm = [0u8; 32];
    hk.expand(info.as_bytes(), &mut okm)
        .expect("32 is a valid HKDF-SHA-256 output length");
    okm
}

/// Computes the full 32-byte HMAC-SHA-256 tag over `data` using `okm`.
pub fn compute_mac(okm: &[u8; 32], data: &[u8]) -> [u8; 32] {
    let mut mac = HmacSha256::new_from_slice(okm).expect("HMAC accepts any key length");
    mac.update(data);
    let result = mac.finalize().into_bytes();
    let mut out = [0u8; 32];
    out.copy_from_slice(&result);
    out
}

/// Compares a received tag against the full MAC, tolerating both possible
/// truncation conventions when the tag is 16 bytes: first-16 or last-16 of
/// the 32-byte MAC.
pub fn tag_matches(mac: &[u8; 32], tag: &[u8]) -> bool {
    match tag.len() {
        32 => constant_time_eq(mac, tag),
        16 => constant_time_eq(&mac[..16], tag) || constant_time_eq(&mac[16..], tag),
        _ => false,
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn info_substitution_replaces_all_placeholders() {
        let info = build_info("GOOSE|{goID}|{gocbRef}|{appId}", "gi1", "IED1/LLN0$GO$gcb1", 1000);
        assert_eq!(info, "GOOSE|gi1|IED1/LLN0$GO$gcb1|1000");
    }

    #[test]
    fn same_key_and_info_derive_same_okm() {
        let k_device = [0x11u8; 32];
        let info = "GOOSE|gi1|IED1/LLN0$GO$gcb1|1000";
        let a = derive_okm(&k_device, info);
        let b = derive_okm(&k_device, info);
        assert_eq!(a, b);
    }

    #[test]
    fn different_info_derives_different_okm() {
        let k_device = [0x11u8; 32];
        let a = derive_okm(&k_device, "GOOSE|gi1|gcb1|1000");
        let b = derive_okm(&k_device, "GOOSE|gi2|gcb1|1000");
        assert_ne!(a, b);
    }

    #[test]
    fn tag_matches_first_and_last_half_of_truncated_mac() {
        let mac: [u8; 32] = core::array::from_fn(|i| i as u8);
        assert!(tag_matches(&mac, &mac[..16]));
        assert!(tag_matches(&mac, &mac[16..]));
        assert!(tag_matches(&mac, &mac));
    }

    #[test]
    fn tag_mismatch_rejected() {
        let mac = [0u8; 32];
        let wrong = [1u8; 16];
        assert!(!tag_matches(&mac, &wrong));
    }
}
