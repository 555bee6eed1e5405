//! `goose_guard` — a bump-in-the-wire authentication layer for IEC 61850
//! GOOSE, plus a signing publisher and a trip-logic subscriber built on the
//! same BER codec and HMAC tagging scheme.

pub mod canonical;
pub mod decode_basics;
pub mod decode_goose;
pub mod encode_basics;
pub mod encode_goose;
pub mod engine;
pub mod error;
pub mod freshness;
pub mod policy;
pub mod status;
pub mod tagging;
pub mod trip;
pub mod types;
