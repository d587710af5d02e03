//! Application constants for the CSB processor
//!
//! This module contains default values, wire-format constants and metadata
//! vocabulary used throughout the processor.

// =============================================================================
// Geo-referencing Defaults
// =============================================================================

/// Largest time separation (seconds) between a depth and the fix used for it
pub const DEFAULT_MAX_GAP_SECONDS: f64 = 10.0;

/// Largest fraction of depths that may be dropped for lack of a nearby fix
pub const DEFAULT_MAX_DROP_FRACTION: f64 = 0.5;

// =============================================================================
// Decoding Defaults
// =============================================================================

/// Number of fault notes retained per file for the operator report
pub const DEFAULT_FAULT_LIMIT: usize = 10;

/// YDVR loggers stamp records with a 16-bit millisecond counter
pub const YDVR_ELAPSED_WRAP: u64 = 65_535;

/// Default wrap for generic ASCII logs, which usually carry a 32-bit counter
pub const DEFAULT_ASCII_ELAPSED_WRAP: u64 = 4_294_967_295;

/// Seconds in a day, for day-count plus seconds-of-day timestamps
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Offset from Kelvin to degrees Celsius
pub const KELVIN_OFFSET: f64 = 273.15;

/// Feet to metres, for depth sentences that omit the metric field
pub const METRES_PER_FOOT: f64 = 0.3048;

// =============================================================================
// NMEA2000 Parameter Group Numbers
// =============================================================================

pub mod pgn {
    /// ISO request, three data bytes in YDVR records
    pub const ISO_REQUEST: u32 = 59_904;
    pub const SYSTEM_TIME: u32 = 126_992;
    pub const WATER_DEPTH: u32 = 128_267;
    pub const POSITION_RAPID_UPDATE: u32 = 129_025;
    pub const GNSS_POSITION_DATA: u32 = 129_029;
    pub const ENVIRONMENTAL_PARAMETERS_LEGACY: u32 = 130_310;
    pub const ENVIRONMENTAL_PARAMETERS: u32 = 130_311;
    pub const TEMPERATURE: u32 = 130_312;
    pub const TEMPERATURE_EXTENDED: u32 = 130_316;

    /// YDVR service record identifier (not a CAN id)
    pub const YDVR_SERVICE_RECORD: u32 = 0xFFFF_FFFF;

    /// PGNs transmitted as fast-packet sequences; YDVR stores them reassembled
    /// with a sequence byte and a length byte ahead of the payload.
    pub const FAST_PACKET: &[u32] = &[
        65_240, 126_208, 126_464, 126_720, 126_983, 126_984, 126_985, 126_986, 126_987, 126_988,
        126_996, 126_998, 127_233, 127_237, 127_489, 127_496, 127_497, 127_498, 127_503,
        127_504, 127_506, 127_507, 127_509, 127_510, 127_511, 127_512, 127_513, 127_514,
        128_275, 128_520, 129_029, 129_038, 129_039, 129_040, 129_041, 129_044, 129_045,
        129_284, 129_285, 129_301, 129_302, 129_538, 129_540, 129_541, 129_542, 129_545,
        129_547, 129_549, 129_551, 129_556, 129_792, 129_793, 129_794, 129_795, 129_796,
        129_797, 129_798, 129_799, 129_800, 129_801, 129_802, 129_803, 129_804, 129_805,
        129_806, 129_807, 129_808, 129_809, 129_810, 130_052, 130_053, 130_054, 130_060,
        130_061, 130_064, 130_065, 130_066, 130_067, 130_068, 130_069, 130_070, 130_071,
        130_072, 130_073, 130_074, 130_320, 130_321, 130_322, 130_323, 130_324, 130_567,
        130_577, 130_578, 130_816,
    ];
}

// =============================================================================
// WIBL Binary Format
// =============================================================================

pub mod wibl {
    /// Serialiser version written by current loggers
    pub const CURRENT_VERSION: (u16, u16) = (1, 3);

    /// Packet header: u32 identifier followed by u32 payload length
    pub const HEADER_LEN: usize = 8;

    pub const SERIALISER_VERSION: u32 = 0;
    pub const SYSTEM_TIME: u32 = 1;
    pub const ATTITUDE: u32 = 2;
    pub const DEPTH: u32 = 3;
    pub const COG: u32 = 4;
    pub const GNSS: u32 = 5;
    pub const ENVIRONMENT: u32 = 6;
    pub const TEMPERATURE: u32 = 7;
    pub const HUMIDITY: u32 = 8;
    pub const PRESSURE: u32 = 9;
    pub const SERIAL_STRING: u32 = 10;
    pub const MOTION: u32 = 11;
    pub const METADATA: u32 = 12;
    pub const ALGORITHM_REQUEST: u32 = 13;
    pub const JSON_METADATA: u32 = 14;
    pub const NMEA0183_FILTER: u32 = 15;
    pub const SENSOR_SCALES: u32 = 16;
    pub const RAW_IMU: u32 = 17;
    pub const SETUP: u32 = 18;

    /// Human-readable packet name for statistics
    pub fn packet_name(id: u32) -> &'static str {
        match id {
            SERIALISER_VERSION => "SerialiserVersion",
            SYSTEM_TIME => "SystemTime",
            ATTITUDE => "Attitude",
            DEPTH => "Depth",
            COG => "COG",
            GNSS => "GNSS",
            ENVIRONMENT => "Environment",
            TEMPERATURE => "Temperature",
            HUMIDITY => "Humidity",
            PRESSURE => "Pressure",
            SERIAL_STRING => "SerialString",
            MOTION => "Motion",
            METADATA => "Metadata",
            ALGORITHM_REQUEST => "AlgorithmRequest",
            JSON_METADATA => "JSONMetadata",
            NMEA0183_FILTER => "NMEA0183Filter",
            SENSOR_SCALES => "SensorScales",
            RAW_IMU => "RawIMU",
            SETUP => "Setup",
            _ => "Unrecognized",
        }
    }
}

// =============================================================================
// Metadata Vocabulary
// =============================================================================

/// Placeholder for mandatory metadata fields that have not been supplied
pub const METADATA_NOT_SET: &str = "NOTSET";

/// Convention string written into the trusted-node block
pub const CSB_CONVENTION: &str = "GeoJSON CSB 3.1";

/// Licence applied to submitted data
pub const CSB_DATA_LICENSE: &str = "CC0 1.0";

/// Coordinate reference system of all positions
pub const CSB_CRS: &str = "EPSG:4326";

/// Processing action recorded for elapsed-to-real time interpolation
pub const TIMESTAMP_PROCESSING_TYPE: &str = "TimeStampInterpolation";

/// Method reported for the timestamp processing action
pub const TIMESTAMP_METHOD: &str = "Linear Interpolation";

/// Default provider recorded for WIBL files without one
pub const WIBL_DEFAULT_PROVIDER: (&str, &str) = ("OpenVBI", "hello@openvbi.org");

/// Trusted-node fields that must be supplied before submission
pub const MANDATORY_TRUSTED_NODE_FIELDS: &[&str] = &[
    "providerOrganizationName",
    "providerEmail",
    "uniqueVesselID",
    "providerLogger",
    "providerLoggerVersion",
    "verticalReferenceOfDepth",
];

// =============================================================================
// Output Formatting
// =============================================================================

/// ISO-8601 timestamp format used in every output encoding
pub const OUTPUT_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

// =============================================================================
// Performance Defaults
// =============================================================================

/// Upper bound on worker count accepted from the command line
pub const MAX_PARALLEL_WORKERS: usize = 128;

// =============================================================================
// Configuration
// =============================================================================

/// Directory name under the user config directory
pub const CONFIG_DIR_NAME: &str = "csb-processor";

/// Default configuration file name
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Prefix for environment variable overrides
pub const ENV_PREFIX: &str = "CSB_PROCESSOR_";
