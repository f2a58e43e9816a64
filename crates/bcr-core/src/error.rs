//! Status codes and error types for barcode reader operations.
//!
//! Every operation on a reader ends in a numeric status: `0` for success and
//! one of the codes below for failure. Codes fall into two families:
//!
//! - **Device codes** (`INVALID_PARAMETER`, `INVALID_SETTING_VALUE`, ...) share
//!   their numeric value with the native scanner service, so a code passed
//!   through from the device and one produced locally compare equal.
//! - **Library codes** (`NO_CONNECTION`, `EMPTY_COMMIT_BUFFER`, ...) are built
//!   with [`format_error`] from the library facility code.
//!
//! ## Error Hierarchy
//!
//! [`BcrError`] is the single error type used inside the workspace. Each variant
//! is one kind of the taxonomy and its `Display` output is the exact message a
//! caller sees in a result entry. [`TransportError`] carries failures reported
//! by the transport (JSON-RPC errors, unparsable responses, an unreachable
//! service) and is wrapped by [`BcrError::Transport`] with its code and message
//! untouched.

use thiserror::Error;

/// Facility code of the JavaScript-side barcode reader library (0x0921).
pub const FACILITY_CODE: u32 = 2337;

/// Base for library-defined error codes.
pub const ERROR_CODE_BASE: u32 = 16500;

/// Builds a library error code from a 16-bit code.
///
/// Returns 0 when `code` is 0 or does not fit in the low 16 bits.
pub const fn format_error(code: u32) -> i32 {
    if code != 0 && (code & 0xFFFF_0000) == 0 {
        (0x8000_0000 | (FACILITY_CODE << 16) | code) as i32
    } else {
        0
    }
}

pub const SUCCESS: i32 = 0;

pub const JSON_PARSE_ERROR: i32 = -32700;
pub const FEATURE_NOT_SUPPORTED: i32 = -1994391502;
/// Generic code, usually an unexpected device-side rejection.
pub const FUNCTION_FAILED: i32 = -1994389925;
pub const INVALID_PARAMETER: i32 = -1994391465;
pub const INSUFFICIENT_BUFFER_SIZE: i32 = -1994391430;
pub const OUT_OF_MEMORY: i32 = -1994391544;
pub const INVALID_SETTING_VALUE: i32 = -1994326003;
pub const SCANNER_NOT_FOUND: i32 = -1994375551;
pub const SETTING_VALUE_EXCEED_MAX_LEN: i32 = -1994309986;
pub const SETTING_VALUE_OUT_OF_RANGE: i32 = -1994309985;
pub const UNSUPPORTED_FAMILY_NAME: i32 = -1994309984;
pub const UNSUPPORTED_KEY_OR_OPTION: i32 = -1994309983;
pub const CHAR_CONVERSION_ERROR: i32 = -1994309982;

pub const NO_CONNECTION: i32 = format_error(1229);
pub const NO_AVAILABLE_BRIDGE: i32 = format_error(ERROR_CODE_BASE + 1);
pub const AJAX_NOT_SUPPORTED: i32 = format_error(ERROR_CODE_BASE + 2);
pub const WEB_SERVICE_NOT_RESPONDING: i32 = format_error(ERROR_CODE_BASE + 3);
pub const MISSING_SETTINGS_DEF: i32 = format_error(ERROR_CODE_BASE + 4);
pub const INVALID_SETTINGS_DEF: i32 = format_error(ERROR_CODE_BASE + 5);
pub const EMPTY_COMMIT_BUFFER: i32 = format_error(ERROR_CODE_BASE + 6);
/// A commit was rejected because another commit on the same reader is running.
pub const COMMIT_IN_PROGRESS: i32 = format_error(ERROR_CODE_BASE + 7);

/// Message attached to every successful result.
pub const MSG_OPERATION_COMPLETED: &str = "Operation completed successfully.";

/// Failure reported by a [`Transport`](crate::transport::Transport).
///
/// The code and message are surfaced to the caller verbatim.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct TransportError {
    pub code: i32,
    pub message: String,
}

impl TransportError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// The response could not be parsed or lacked a required member.
    pub fn parse_error() -> Self {
        Self::new(JSON_PARSE_ERROR, "JSON-RPC parsing error in response.")
    }

    /// Like [`parse_error`](Self::parse_error), naming the missing member.
    pub fn missing_member(member: &str) -> Self {
        Self::new(
            JSON_PARSE_ERROR,
            format!("JSON-RPC parsing error in response, missing {} parameter.", member),
        )
    }

    /// The service did not answer (or answered with a non-success status).
    pub fn not_responding() -> Self {
        Self::new(WEB_SERVICE_NOT_RESPONDING, "Web service not responding.")
    }

    /// The device gave an empty answer where one was required.
    pub fn empty_response() -> Self {
        Self::new(FUNCTION_FAILED, "Null or empty response.")
    }
}

/// Primary error type for setting resolution and reader operations.
///
/// `Display` is the user-visible message; [`BcrError::status`] is the code.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BcrError {
    /// A caller argument was wrong, or a device read-back omitted a property.
    #[error("{0}")]
    InvalidParameter(String),

    /// No catalog descriptor mentions the requested family.
    #[error("Unsupported family name: {0}")]
    UnsupportedFamilyName(String),

    /// The family is known but the key/option pair is not.
    #[error("Unsupported key or option name")]
    UnsupportedKeyOrOption,

    /// The catalog entry itself is malformed. This is a catalog-authoring bug.
    #[error("{0}")]
    InvalidSettingsDef(String),

    /// A value failed encode-time validation or decode-time conversion.
    #[error("{0}")]
    InvalidSettingValue(String),

    #[error("No scanner connection")]
    NoConnection,

    #[error("The commit buffer is empty, nothing to commit.")]
    EmptyCommitBuffer,

    #[error("Another commit is already in progress on this reader.")]
    CommitInProgress,

    /// The catalog the operation needs was never supplied to the reader.
    #[error("Missing settings definition {0}.")]
    MissingSettingsDef(String),

    #[error("{0}")]
    FunctionFailed(String),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl BcrError {
    /// Numeric status reported for this error.
    pub fn status(&self) -> i32 {
        match self {
            BcrError::InvalidParameter(_) => INVALID_PARAMETER,
            BcrError::UnsupportedFamilyName(_) => UNSUPPORTED_FAMILY_NAME,
            BcrError::UnsupportedKeyOrOption => UNSUPPORTED_KEY_OR_OPTION,
            BcrError::InvalidSettingsDef(_) => INVALID_SETTINGS_DEF,
            BcrError::InvalidSettingValue(_) => INVALID_SETTING_VALUE,
            BcrError::NoConnection => NO_CONNECTION,
            BcrError::EmptyCommitBuffer => EMPTY_COMMIT_BUFFER,
            BcrError::CommitInProgress => COMMIT_IN_PROGRESS,
            BcrError::MissingSettingsDef(_) => MISSING_SETTINGS_DEF,
            BcrError::FunctionFailed(_) => FUNCTION_FAILED,
            BcrError::Transport(e) => e.code,
        }
    }

    /// Read-back did not include `command`.
    pub fn missing_property(command: &str) -> Self {
        BcrError::InvalidParameter(format!("Invalid scanner property: {}", command))
    }

    /// Read-back after a write returned a different value than was written.
    pub fn rejected_value() -> Self {
        BcrError::InvalidSettingValue("Scanner rejects the setting value.".to_string())
    }

    /// A device value could not be converted back to the external vocabulary.
    pub fn unexpected_device_value() -> Self {
        BcrError::InvalidSettingValue("Unexpected scanner setting value".to_string())
    }
}

/// Convenience alias for results using [`BcrError`].
pub type BcrResult<T> = std::result::Result<T, BcrError>;
