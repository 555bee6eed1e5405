use core::str;

use serde::{Deserialize, Serialize};

/// Time quality flags according to IEC 61850-7-2 Table 30
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TimeQuality {
    pub leap_second_known: bool,
    pub clock_failure: bool,
    pub clock_not_synchronized: bool,
    pub time_accuracy: u8, // 5 bits (0-31)
}

impl TimeQuality {
    pub fn from_byte(byte: u8) -> Self {
        TimeQuality {
            leap_second_known: (byte & 0x80) != 0,      // Bit 0 (MSB)
            clock_failure: (byte & 0x40) != 0,          // Bit 1
            clock_not_synchronized: (byte & 0x20) != 0, // Bit 2
            time_accuracy: byte & 0x1F,                 // Bits 3-7
        }
    }

    pub fn to_byte(&self) -> u8 {
        let mut byte = 0u8;
        if self.leap_second_known {
            byte |= 0x80;
        }
        if self.clock_failure {
            byte |= 0x40;
        }
        if self.clock_not_synchronized {
            byte |= 0x20;
        }
        byte |= self.time_accuracy & 0x1F;
        byte
    }

    /// Gets time accuracy in bits of accuracy (0-25 valid)
    pub fn accuracy_bits(&self) -> Option<u8> {
        match self.time_accuracy {
            0..=25 => Some(self.time_accuracy),
            26..=30 => None, // Invalid range
            31 => None,      // Unspecified
            _ => None,
        }
    }
}

/// Quality flags for IEC 61850 sampled values - 13 bits total
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Quality {
    // Validity (2 bits) - bits 0-1
    pub validity: Validity,

    // Detail quality flags (8 bits) - bits 2-9
    pub overflow: bool,
    pub out_of_range: bool,
    pub bad_reference: bool,
    pub oscillatory: bool,
    pub failure: bool,
    pub old_data: bool,
    pub inconsistent: bool,
    pub inaccurate: bool,

    // Source (1 bit) - bit 10
    pub source_substituted: bool,

    // Test mode (1 bit) - bit 11
    pub test: bool,

    // Operator blocked (1 bit) - bit 12
    pub operator_blocked: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Validity {
    #[default]
    Good = 0,
    Invalid = 1,
    Reserved = 2,
    Questionable = 3,
}

impl Quality {
    /// Decodes quality from a 16-bit value (13 bits used)
    /// The bitstring is transmitted MSB first in the encoding
    pub fn from_u16(value: u16) -> Self {
        Quality {
            // Validity is bits 0-1 (most significant bits)
            validity: match (value >> 14) & 0x03 {
                0 => Validity::Good,
                1 => Validity::Invalid,
                2 => Validity::Reserved,
                3 => Validity::Questionable,
                _ => Validity::Good,
            },

            // Detail quality flags (bits 2-9)
            overflow: (value & (1 << 13)) != 0,
            out_of_range: (value & (1 << 12)) != 0,
            bad_reference: (value & (1 << 11)) != 0,
            oscillatory: (value & (1 << 10)) != 0,
            failure: (value & (1 << 9)) != 0,
            old_data: (value & (1 << 8)) != 0,
            inconsistent: (value & (1 << 7)) != 0,
            inaccurate: (value & (1 << 6)) != 0,

            // Source (bit 10)
            source_substituted: (value & (1 << 5)) != 0,

            // Test (bit 11)
            test: (value & (1 << 4)) != 0,

            // Operator blocked (bit 12)
            operator_blocked: (value & (1 << 3)) != 0,
        }
    }

    /// Encodes quality to a 16-bit value
    pub fn to_u16(&self) -> u16 {
        let mut value = 0u16;

        // Validity (bits 0-1)
        value |= (self.validity as u16) << 14;

        // Detail quality flags
        if self.overflow {
            value |= 1 << 13;
        }
        if self.out_of_range {
            value |= 1 << 12;
        }
        if self.bad_reference {
            value |= 1 << 11;
        }
        if self.oscillatory {
            value |= 1 << 10;
        }
        if self.failure {
            value |= 1 << 9;
        }
        if self.old_data {
            value |= 1 << 8;
        }
        if self.inconsistent {
            value |= 1 << 7;
        }
        if self.inaccurate {
            value |= 1 << 6;
        }

        // Source
        if self.source_substituted {
            value |= 1 << 5;
        }

        // Test
        if self.test {
            value |= 1 << 4;
        }

        // Operator blocked
        if self.operator_blocked {
            value |= 1 << 3;
        }

        value
    }

    /// Returns true if quality is good (validity=good and no detail quality flags set)
    pub fn is_good(&self) -> bool {
        matches!(self.validity, Validity::Good)
            && !self.overflow
            && !self.out_of_range
            && !self.bad_reference
            && !self.oscillatory
            && !self.failure
            && !self.old_data
            && !self.inconsistent
            && !self.inaccurate
            && !self.source_substituted
            && !self.test
            && !self.operator_blocked
    }
}

/// IEC 61850 UtcTime - 8 bytes with specific structure
/// Bytes 0-3: Seconds since epoch (Jan 1, 1970)
/// Bytes 4-6: Fraction of second (24 bits)
/// Byte 7: Time quality flags
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timestamp {
    /// Seconds since Unix epoch (January 1, 1970)
    pub seconds: u32,

    /// Fraction of second (0-16777215, representing 24-bit precision)
    pub fraction: u32,

    /// Time quality flags
    pub quality: TimeQuality,
}

impl Timestamp {
    /// Creates a new Timestamp from raw 8 bytes
    pub fn from_bytes(bytes: [u8; 8]) -> Self {
        let seconds = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let fraction = u32::from_be_bytes([0, bytes[4], bytes[5], bytes[6]]);
        let quality = TimeQuality::from_byte(bytes[7]);

        Timestamp {
            seconds,
            fraction,
            quality,
        }
    }

    /// Converts the timestamp to raw 8 bytes
    pub fn to_bytes(&self) -> [u8; 8] {
        let mut bytes = [0u8; 8];
        bytes[0..4].copy_from_slice(&self.seconds.to_be_bytes());
        let fraction_bytes = self.fraction.to_be_bytes();
        bytes[4] = fraction_bytes[1];
        bytes[5] = fraction_bytes[2];
        bytes[6] = fraction_bytes[3];
        bytes[7] = self.quality.to_byte();
        bytes
    }

    /// Gets fraction as nanoseconds
    pub fn fraction_as_nanos(&self) -> u32 {
        // Convert 24-bit fraction to nanoseconds
        // fraction / 2^24 * 10^9
        ((self.fraction as u64 * 1_000_000_000) >> 24) as u32
    }

    /// Converts the timestamp to a UTC datetime string in ISO 8601 format
    /// Example: "2024-10-28T14:30:45.123456Z"
    pub fn to_utc_string(&self) -> String {
        let nanos = self.fraction_as_nanos();

        // Calculate date components from Unix epoch
        const SECONDS_PER_DAY: u32 = 86400;
        const DAYS_PER_YEAR: u32 = 365;
        const DAYS_PER_4_YEARS: u32 = DAYS_PER_YEAR * 4 + 1;

        let mut days = self.seconds / SECONDS_PER_DAY;
        let remaining_seconds = self.seconds % SECONDS_PER_DAY;

        // Start from 1970
        let mut year = 1970;

        // Handle 400-year cycles
        while days >= 146097 {
            days -= 146097;
            year += 400;
        }

        // Handle 100-year cycles
        while days >= 36524 {
            if days == 36524 && Self::is_leap_year(year) {
                break;
            }
            days -= 36524;
            year += 100;
        }

        // Handle 4-year cycles
        while days >= DAYS_PER_4_YEARS {
            days -= DAYS_PER_4_YEARS;
            year += 4;
        }

        // Handle individual years
        while days >= DAYS_PER_YEAR {
            if days == DAYS_PER_YEAR && Self::is_leap_year(year) {
                break;
            }
            days -= DAYS_PER_YEAR;
            year += 1;
        }

        // Calculate month and day
        let is_leap = Self::is_leap_year(year);
        let days_in_months = if is_leap {
            [31, 29, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31]
        } else {
            [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31]
        };

        let mut month = 1;
        for &days_in_month in &days_in_months {
            if days < days_in_month {
                break;
            }
            days -= days_in_month;
            month += 1;
        }
        let day = days + 1;

        // Calculate time components
        let hours = remaining_seconds / 3600;
        let minutes = (remaining_seconds % 3600) / 60;
        let secs = remaining_seconds % 60;
        let micros = nanos / 1000;

        format!(
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}.{:06}Z",
            year, month, day, hours, minutes, secs, micros
        )
    }

    /// Helper function to check if a year is a leap year
    #[allow(unknown_lints)]
    #[allow(clippy::manual_is_multiple_of)]
    fn is_leap_year(year: u32) -> bool {
        (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
    }

    /// Converts timestamp to Unix timestamp (seconds since epoch) as f64
    pub fn to_unix_timestamp(&self) -> f64 {
        let seconds = self.seconds as f64;
        let nanos = self.fraction_as_nanos() as f64;
        seconds + (nanos / 1_000_000_000.0)
    }

    /// Creates a Timestamp from a Unix timestamp (seconds since epoch)
    pub fn from_unix_timestamp(unix_timestamp: f64, quality: TimeQuality) -> Self {
        let seconds = unix_timestamp.floor() as u32;
        let fraction = ((unix_timestamp.fract() * 16_777_216.0) as u32).min(16_777_215);

        Timestamp {
            seconds,
            fraction,
            quality,
        }
    }
}

/// One value inside a GOOSE dataset, tagged by ASN.1 BER context tag. Shape
/// and tag assignment follow `encode_basics.rs`'s `encode_iec_data_element` /
/// `decode_basics.rs`'s `decode_iec_data_element` exactly: a sized variant
/// per wire tag rather than one generic `Int`/`Float`, since the BER walker
/// needs to know which width to re-encode minimally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum IECData {
    Boolean(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Int8u(u8),
    Int16u(u16),
    Int32u(u32),
    Float32(f32),
    /// Not produced by this gateway's own encoder -- IEC 61850-7-2 FLOAT64 is
    /// out of scope -- but decoders elsewhere on the wire may emit it, so it
    /// round-trips through JSON even though `encode_iec_data_element` rejects it.
    Float64(f64),
    VisibleString(String),
    MmsString(String),
    BitString { padding: u8, val: Vec<u8> },
    Array(Vec<IECData>),
    Structure(Vec<IECData>),
    OctetString(Vec<u8>),
    UtcTime([u8; 8]),
}

#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EthernetHeader {
    /** Source MAC-Address */
    pub dst_addr: [u8; 6],
    /** Destination MAC-Address */
    pub src_addr: [u8; 6],
    /** Tag Protocol Identifier (0x8100) */
    pub tpid: Option<[u8; 2]>,
    /** Tag Control Information - VLAN-ID and VLAN-Priority */
    pub tci: Option<[u8; 2]>,
    /** Ethertype for the GOOSE (88-B8 or 88-B9) */
    pub ether_type: [u8; 2],
    /** APPID */
    pub appid: [u8; 2],
    /** Length of the GOOSE PDU */
    pub length: [u8; 2],
}

#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct IECGoosePdu {
    /** Reference to GOOSE control block in the data model of the sending IED */
    pub go_cb_ref: String,
    /** Time allowed to live until the next GOOSE packet */
    pub time_allowed_to_live: u32,
    /** Reference to the data set the GOOSE is shipping */
    pub dat_set: String,
    /** GOOSE ID as defined in GSEControl.appID */
    pub go_id: String,
    /** Time stamp of the GOOSE creation */
    pub t: Timestamp,
    /** Status number - counter for repeating GOOSE packets */
    pub st_num: u32,
    /** Sequence number - counter for changes in GOOSE data  */
    pub sq_num: u32,
    /** Whether the GOOSE is a simulated */
    pub simulation: bool,
    /** Configuration revision of the GOOSE control block */
    pub conf_rev: u32,
    /** Whether the GOOSE needs commissioning */
    pub nds_com: bool,
    /** Number of data set entries in the GOOSE */
    pub num_dat_set_entries: u32,
    /** All data send with the GOOSE */
    pub all_data: Vec<IECData>,
}

#[derive(Debug)]
pub enum EncodeError {
    General {
        message: String,
        buffer_index: usize,
    },
    BufferTooSmall {
        required: usize,
        available: usize,
    },
}

impl EncodeError {
    pub fn new(msg: &str, buffer_index: usize) -> Self {
        let mut chart = ['\0'; 128];
        for (i, c) in msg.chars().take(128).enumerate() {
            chart[i] = c;
        }
        EncodeError::General {
            message: chart.iter().collect(),
            buffer_index,
        }
    }
}

#[derive(Debug)]
pub struct DecodeError {
    pub message: String,
    pub buffer_index: usize,
}

impl DecodeError {
    pub fn new(msg: &str, buffer_index: usize) -> Self {
        let mut chars = ['\0'; 128];
        for (i, c) in msg.chars().take(128).enumerate() {
            chars[i] = c;
        }

        DecodeError {
            message: chars.iter().collect(),
            buffer_index,
        }
    }
}

/// One authenticated stream inside a gateway policy: which GOOSE control
/// block this rule applies to and whether it may pass through unsigned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    pub name: String,
    #[serde(rename = "appId")]
    pub app_id: u16,
    #[serde(rename = "goID")]
    pub go_id: String,
    #[serde(rename = "gocbRef")]
    pub gocb_ref: String,
    #[serde(default, rename = "allowUnsigned")]
    pub allow_unsigned: bool,
}

/// Device identity and key material for a single gateway policy entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    #[serde(rename = "deviceId")]
    pub device_id: String,
    /// Hex-encoded 32-byte device key, decoded by `policy::load_policy`.
    #[serde(rename = "k_device_hex")]
    pub k_device_hex: String,
    #[serde(rename = "kdfInfoFmt")]
    pub kdf_info_fmt: String,
    /// HMAC tag length in bytes a publisher truncates to before putting the
    /// tag on the wire; 16 or 32. Gateway/subscriber verification tolerates
    /// either regardless of this value.
    #[serde(default = "default_truncate_bytes", rename = "truncate_bytes")]
    pub truncate_bytes: u8,
}

fn default_truncate_bytes() -> u8 {
    16
}

fn default_min_repetition_ms() -> u64 {
    4
}

/// A loaded bump-in-the-wire policy record: one device/stream pair plus the
/// gateway behavior that applies to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyRecord {
    #[serde(default)]
    pub mode: PolicyMode,
    #[serde(default, rename = "stripTag")]
    pub strip_tag: bool,
    #[serde(rename = "ttl_ms")]
    pub ttl_ms: u64,
    #[serde(rename = "maxSqGap")]
    pub max_sq_gap: u32,
    #[serde(rename = "maxAge_ms")]
    pub max_age_ms: u64,
    pub device: DeviceConfig,
    pub stream: StreamConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PolicyMode {
    #[default]
    Monitor,
    Enforce,
}

/// One field of a publisher's outgoing dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetFieldSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub value: serde_json::Value,
    #[serde(default)]
    pub quality: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Boolean,
    Integer,
    Binarytime,
}

/// Everything a publisher needs to build and sign outgoing GOOSE frames.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicationRecord {
    #[serde(rename = "appId")]
    pub app_id: u16,
    #[serde(rename = "gocbRef")]
    pub gocb_ref: String,
    #[serde(rename = "datSet")]
    pub dat_set: String,
    #[serde(rename = "goID")]
    pub go_id: String,
    /// `"aa:bb:cc:dd:ee:ff"`, parsed by `policy::parse_mac`.
    #[serde(default, rename = "dstMac")]
    pub dst_mac: Option<String>,
    #[serde(default, rename = "vlanId")]
    pub vlan_id: Option<u16>,
    #[serde(default, rename = "vlanPriority")]
    pub vlan_priority: Option<u8>,
    #[serde(default, rename = "timeAllowedToLive_ms")]
    pub time_allowed_to_live_ms: Option<u32>,
    #[serde(default, rename = "confRev")]
    pub conf_rev: Option<u32>,
    #[serde(default, rename = "ndsCom")]
    pub nds_com: bool,
    #[serde(default)]
    pub test: bool,
    #[serde(default, rename = "heartbeat_ms")]
    pub heartbeat_ms: Option<u64>,
    /// Fastest retransmission interval used right after a state change; the
    /// engine backs off by doubling towards `heartbeat_ms` (the
    /// steady-state max). Not present in the original's fixed-interval
    /// loop; supplements it with IEC 61850-8-1's usual fast/slow scheme.
    #[serde(default = "default_min_repetition_ms", rename = "min_repetition_ms")]
    pub min_repetition_ms: u64,
    pub device: DeviceConfig,
    #[serde(default)]
    pub dataset: Vec<DatasetFieldSpec>,
}

/// Subscriber wiring: which stream to listen for and where its trip logic
/// is loaded from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "appId")]
    pub app_id: u16,
    #[serde(rename = "gocbRef")]
    pub gocb_ref: String,
    /// `"aa:bb:cc:dd:ee:ff"`, parsed by `policy::parse_mac`.
    #[serde(rename = "dstMac")]
    pub dst_mac: String,
    #[serde(default, rename = "data_values_count")]
    pub data_values_count: Option<i32>,
    #[serde(rename = "trip_logic")]
    pub trip_logic_path: String,
}

/// The type a `TripRule`'s dataset field is expected to carry. Distinct
/// from `FieldType`: a publisher's dataset may carry `binarytime` fields
/// too, but no trip rule may match against one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleFieldType {
    Bool,
    Int,
}

/// One rule inside a `TripLogic` document: a dataset index, the type it is
/// expected to carry, and the value that counts as a hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripRule {
    pub index: usize,
    #[serde(rename = "type")]
    pub rule_type: RuleFieldType,
    pub equals: serde_json::Value,
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuleLogic {
    #[default]
    Any,
    All,
}

fn default_true() -> bool {
    true
}
fn default_min_sq_in_state() -> u32 {
    3
}
fn default_normal_dwell_ms() -> u64 {
    2000
}
fn default_no_burst_ms() -> u64 {
    500
}
fn default_burst_window_ms() -> u64 {
    60
}
fn default_burst_min_frames() -> u32 {
    3
}
fn default_burst_interval_max_ms() -> u64 {
    10
}
fn default_baseline_relearn_ms() -> u64 {
    3000
}

/// Conditions that move a `Tripped` stream back towards `Idle`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetPolicy {
    #[serde(default, rename = "normalRules")]
    pub normal_rules: Vec<TripRule>,
    #[serde(default = "default_true", rename = "normalRequired")]
    pub normal_required: bool,
    #[serde(default = "default_min_sq_in_state", rename = "minSqInState")]
    pub min_sq_in_state: u32,
    #[serde(default = "default_normal_dwell_ms", rename = "normalDwell_ms")]
    pub normal_dwell_ms: u64,
    #[serde(default = "default_no_burst_ms", rename = "noBurst_ms")]
    pub no_burst_ms: u64,
}

impl Default for ResetPolicy {
    fn default() -> Self {
        ResetPolicy {
            normal_rules: Vec::new(),
            normal_required: default_true(),
            min_sq_in_state: default_min_sq_in_state(),
            normal_dwell_ms: default_normal_dwell_ms(),
            no_burst_ms: default_no_burst_ms(),
        }
    }
}

/// The subscriber's full trip-logic document, one per subscription.
/// Defaults mirror `sub_core.c: trip_logic_load`'s fallback values, applied
/// whenever a JSON field is absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripLogic {
    #[serde(default)]
    pub logic: RuleLogic,
    #[serde(default = "default_true")]
    pub latch: bool,
    #[serde(default = "default_true", rename = "manualResetRequired")]
    pub manual_reset_required: bool,
    #[serde(default = "default_true", rename = "requireStNumChange")]
    pub require_stnum_change: bool,
    #[serde(default = "default_true", rename = "requireBurst")]
    pub require_burst: bool,
    #[serde(default = "default_burst_window_ms", rename = "burstWindow_ms")]
    pub burst_window_ms: u64,
    #[serde(default = "default_burst_min_frames", rename = "burstMinFrames")]
    pub burst_min_frames: u32,
    #[serde(
        default = "default_burst_interval_max_ms",
        rename = "burstIntervalMax_ms"
    )]
    pub burst_interval_max_ms: u64,
    #[serde(
        default = "default_baseline_relearn_ms",
        rename = "baselineRelearn_ms"
    )]
    pub baseline_relearn_ms: u64,
    #[serde(default)]
    pub rules: Vec<TripRule>,
    #[serde(default)]
    pub reset: ResetPolicy,
}

/// Per-stream freshness sliding window, held by the gateway for every
/// policy entry it guards.
#[derive(Debug, Clone, Copy, Default)]
pub struct FreshnessWindow {
    pub last_st: u32,
    pub last_sq: u32,
    pub last_seen_ms: u64,
    pub initialized: bool,
}

/// The subscriber trip FSM's states (spec.md §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TripState {
    Idle,
    ArmCand,
    Tripped,
    ResetPend,
}

/// Mutable runtime state the subscriber carries per subscription across
/// the life of the process.
#[derive(Debug, Clone)]
pub struct TripRuntime {
    pub state: TripState,
    pub last_st_num: Option<u32>,
    pub last_arrival_ms: Option<u64>,
    pub st_change_ms: Option<u64>,
    pub burst_count: u32,
    pub in_burst_window: bool,
    pub latched: bool,
    pub normal_start_ms: Option<u64>,
    pub last_burst_like_ms: Option<u64>,
    pub sq_seen_in_state: u32,
    pub state_sq_base: Option<u32>,
}

impl Default for TripRuntime {
    fn default() -> Self {
        TripRuntime {
            state: TripState::Idle,
            last_st_num: None,
            last_arrival_ms: None,
            st_change_ms: None,
            burst_count: 0,
            in_burst_window: false,
            latched: false,
            normal_start_ms: None,
            last_burst_like_ms: None,
            sq_seen_in_state: 0,
            state_sq_base: None,
        }
    }
}

/// Publisher-side counters that advance with every frame emitted for one
/// publication (the teacher's retrieved pack names this `GooseRuntime` in
/// `encode_goose.rs` without ever defining it; this is that type).
#[derive(Debug, Clone)]
pub struct GooseRuntime {
    pub st_num: u32,
    pub sq_num: u32,
    pub timestamp: Timestamp,
    pub src_addr: [u8; 6],
    pub simulation: bool,
}

impl GooseRuntime {
    pub fn new(src_addr: [u8; 6]) -> Self {
        GooseRuntime {
            st_num: 1,
            sq_num: 0,
            timestamp: Timestamp::from_unix_timestamp(0.0, TimeQuality::default()),
            src_addr,
            simulation: false,
        }
    }

    /// Advances to a new data state: `stNum` increments, `sqNum` resets to
    /// the post-change value used for every retransmission of this state.
    pub fn bump_state(&mut self, now_unix: f64) {
        self.st_num = self.st_num.wrapping_add(1);
        self.sq_num = 1;
        self.timestamp = Timestamp::from_unix_timestamp(now_unix, TimeQuality::default());
    }

    /// Emits another repetition of the current state without changing it.
    pub fn retransmit(&mut self, now_unix: f64) {
        self.sq_num = self.sq_num.wrapping_add(1);
        self.timestamp = Timestamp::from_unix_timestamp(now_unix, TimeQuality::default());
    }

    /// Refreshes the timestamp for the very first frame of a process,
    /// leaving `stNum`/`sqNum` at `new`'s init values (1, 0).
    pub fn touch(&mut self, now_unix: f64) {
        self.timestamp = Timestamp::from_unix_timestamp(now_unix, TimeQuality::default());
    }
}

/// Everything `encode_goose::encode_goose` needs to build one frame: fixed
/// framing fields plus the dataset, with the signing tag (if any) already
/// appended as the final `all_data` entry by the caller. The teacher's
/// retrieved `encode_goose.rs` names this `GooseConfig` without ever
/// defining it; this is that type, built from a `PublicationRecord`.
#[derive(Debug, Clone)]
pub struct GooseConfig {
    pub dst_addr: [u8; 6],
    pub appid: [u8; 2],
    pub tpid: Option<[u8; 2]>,
    pub tci: Option<[u8; 2]>,
    pub go_cb_ref: String,
    pub dat_set: String,
    pub go_id: String,
    pub conf_rev: u32,
    pub nds_com: bool,
    pub simulation: bool,
    pub time_allowed_to_live_ms: u32,
    pub all_data: Vec<IECData>,
}

impl GooseConfig {
    /// Builds the static framing config from a loaded publication record.
    /// `all_data` does not yet include a signing tag; the caller appends one
    /// (or not, if HMAC is disabled) after computing it.
    pub fn from_publication(
        rec: &PublicationRecord,
        dst_addr: [u8; 6],
        time_allowed_to_live_ms: u32,
    ) -> Self {
        let all_data = rec
            .dataset
            .iter()
            .map(|field| match field.field_type {
                FieldType::Boolean => IECData::Boolean(field.value.as_bool().unwrap_or(false)),
                FieldType::Integer => {
                    IECData::Int32(field.value.as_i64().unwrap_or(0) as i32)
                }
                FieldType::Binarytime => IECData::UtcTime(
                    Timestamp::from_unix_timestamp(0.0, TimeQuality::default()).to_bytes(),
                ),
            })
            .collect();

        let (tpid, tci) = match rec.vlan_id {
            Some(vlan_id) => {
                let pcp = rec.vlan_priority.unwrap_or(0) & 0x07;
                let tci_val = ((pcp as u16) << 13) | (vlan_id & 0x0FFF);
                (Some([0x81, 0x00]), Some(tci_val.to_be_bytes()))
            }
            None => (None, None),
        };

        GooseConfig {
            dst_addr,
            appid: rec.app_id.to_be_bytes(),
            tpid,
            tci,
            go_cb_ref: rec.gocb_ref.clone(),
            dat_set: rec.dat_set.clone(),
            go_id: rec.go_id.clone(),
            conf_rev: rec.conf_rev.unwrap_or(1),
            nds_com: rec.nds_com,
            simulation: rec.test,
            time_allowed_to_live_ms,
            all_data,
        }
    }
}


#[cfg(test)]
mod time_quality_tests {
    use super::*;

    #[test]
    fn test_time_quality_from_byte() {
        let byte = 0b10110101; // leap=1, failure=0, not_sync=1, accuracy=10101
        let quality = TimeQuality::from_byte(byte);

        assert_eq!(quality.leap_second_known, true);
        assert_eq!(quality.clock_failure, false);
        assert_eq!(quality.clock_not_synchronized, true);
        assert_eq!(quality.time_accuracy, 0b10101);
    }

    #[test]
    fn test_time_quality_to_byte() {
        let quality = TimeQuality {
            leap_second_known: true,
            clock_failure: false,
            clock_not_synchronized: true,
            time_accuracy: 0b10101,
        };

        let byte = quality.to_byte();
        assert_eq!(byte, 0b10110101);
    }

    #[test]
    fn test_time_quality_roundtrip() {
        for byte in 0u8..=255 {
            let quality = TimeQuality::from_byte(byte);
            let result = quality.to_byte();
            assert_eq!(byte, result);
        }
    }

    #[test]
    fn test_time_quality_accuracy_bits_valid() {
        let quality = TimeQuality {
            leap_second_known: false,
            clock_failure: false,
            clock_not_synchronized: false,
            time_accuracy: 10,
        };

        assert_eq!(quality.accuracy_bits(), Some(10));
    }

    #[test]
    fn test_time_quality_accuracy_bits_invalid() {
        let quality = TimeQuality {
            leap_second_known: false,
            clock_failure: false,
            clock_not_synchronized: false,
            time_accuracy: 26, // Invalid
        };

        assert_eq!(quality.accuracy_bits(), None);
    }

    #[test]
    fn test_time_quality_accuracy_bits_unspecified() {
        let quality = TimeQuality {
            leap_second_known: false,
            clock_failure: false,
            clock_not_synchronized: false,
            time_accuracy: 31, // Unspecified
        };

        assert_eq!(quality.accuracy_bits(), None);
    }
}


#[cfg(test)]
mod goose_pdu_tests {
    use super::*;

    #[test]
    fn goose_pdu_json_round_trips() {
        let pdu = IECGoosePdu {
            go_cb_ref: "IED1/LLN0$GO$gcb1".to_string(),
            time_allowed_to_live: 2000,
            dat_set: "IED1/LLN0$DATASET1".to_string(),
            go_id: "GOOSE1".to_string(),
            t: Timestamp {
                seconds: 1698502245,
                fraction: 2097152,
                quality: TimeQuality::default(),
            },
            st_num: 1,
            sq_num: 42,
            simulation: false,
            conf_rev: 128,
            nds_com: false,
            num_dat_set_entries: 2,
            all_data: vec![IECData::Boolean(true), IECData::Int32u(42)],
        };

        let json = serde_json::to_string_pretty(&pdu).unwrap();
        let deserialized: IECGoosePdu = serde_json::from_str(&json).unwrap();
        assert_eq!(pdu, deserialized);
    }
}
