use thiserror::Error;

/// Fatal, startup-time errors: bad policy files, bad interfaces, bad keys.
/// Binaries bubble these up through `anyhow::Result` and exit non-zero.
#[derive(Debug, Error)]
pub enum GuardError {
    #[error("failed to read policy file {path}: {source}")]
    PolicyRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed policy JSON in {path}: {source}")]
    PolicyParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("device key for {device_id} is not valid hex: {source}")]
    BadDeviceKey {
        device_id: String,
        #[source]
        source: hex::FromHexError,
    },

    #[error("device key for {device_id} must be 32 bytes, got {len}")]
    DeviceKeyLength { device_id: String, len: usize },

    #[error("no such network interface: {0}")]
    NoSuchInterface(String),

    #[error("failed to open datalink channel on {iface}: {source}")]
    ChannelOpen {
        iface: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported datalink channel type on {0}")]
    UnsupportedChannel(String),

    #[error("invalid MAC address: {0}")]
    BadMacAddress(String),
}

/// Per-frame verification outcomes. These are not fatal: the gateway and
/// subscriber log them and move on to the next frame. Distinguishing the
/// exact reason is what makes the advisory status file useful to an
/// operator deciding whether a policy needs adjusting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyError {
    /// Frame too short or malformed to extract Ethernet/VLAN/APDU offsets.
    MetaExtraction,
    /// EtherType present but not one this engine understands (not GOOSE,
    /// not PTP, not 802.1Q carrying either).
    NotGoose,
    /// `appId` does not match the policy's stream.
    AppIdMismatch,
    /// Required tag (stNum/sqNum/allData) missing from the APDU.
    MissingTag,
    /// A BER length field claims more bytes than remain in the frame.
    MalformedLength,
    /// None of the three candidate HMAC inputs produced a matching tag.
    TagMismatch,
    /// `stNum` went backwards relative to the stream's last-seen value.
    FreshnessStNumRegression,
    /// `stNum` unchanged but `sqNum` went backwards or did not advance.
    FreshnessSqNumRegression,
    /// `sqNum` advanced by more than the policy's `maxSqGap`.
    FreshnessSqGapExceeded,
    /// Frame arrived more than `maxAge_ms` after the stream's last frame.
    FreshnessStale,
}

impl std::fmt::Display for VerifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            VerifyError::MetaExtraction => "meta extraction failed",
            VerifyError::NotGoose => "not a GOOSE frame",
            VerifyError::AppIdMismatch => "appId mismatch",
            VerifyError::MissingTag => "missing required tag",
            VerifyError::MalformedLength => "malformed BER length",
            VerifyError::TagMismatch => "HMAC tag mismatch",
            VerifyError::FreshnessStNumRegression => "stNum regression",
            VerifyError::FreshnessSqNumRegression => "sqNum regression",
            VerifyError::FreshnessSqGapExceeded => "sqNum gap exceeded",
            VerifyError::FreshnessStale => "frame too old",
        };
        f.write_str(s)
    }
}
