//! Error types for codec construction, encoding and decoding.

use thiserror::Error;

use crate::codec::wire::WireType;

/// Coarse classification of data errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// The input ended before the encoding did.
    Truncated,
    /// Malformed varint, length prefix, tag or payload.
    InvalidEncoding,
    /// Decoding finished before the end of the input.
    TrailingBytes,
    /// The output buffer cannot hold the encoding.
    BufferTooSmall,
}

impl ErrorCode {
    /// Returns a short stable name for the code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Truncated => "truncated",
            ErrorCode::InvalidEncoding => "invalid-encoding",
            ErrorCode::TrailingBytes => "trailing-bytes",
            ErrorCode::BufferTooSmall => "buffer-too-small",
        }
    }
}

/// Error while decoding untrusted bytes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unexpected end of input while reading {context}")]
    UnexpectedEof { context: &'static str },

    #[error("varint exceeds maximum length (10 bytes)")]
    VarintTooLong,

    #[error("varint overflow (value exceeds u64)")]
    VarintOverflow,

    #[error("length prefix {len} exceeds the {remaining} remaining bytes")]
    LengthExceedsRemaining { len: u64, remaining: usize },

    #[error("invalid wire type {code}")]
    InvalidWireType { code: u8 },

    #[error("invalid field number {number}")]
    InvalidFieldNumber { number: u64 },

    #[error("field {field} expects {expected} but the input has {found}")]
    WireTypeMismatch {
        field: u32,
        expected: WireType,
        found: WireType,
    },

    #[error("invalid UTF-8 in {context}")]
    InvalidUtf8 { context: &'static str },

    #[error("byte array of length {expected} cannot hold {found} bytes")]
    ByteArrayLength { expected: usize, found: usize },

    #[error("messages nested deeper than {limit} levels")]
    RecursionLimitExceeded { limit: usize },
}

impl DecodeError {
    /// Returns the classification of this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            DecodeError::UnexpectedEof { .. } => ErrorCode::Truncated,
            _ => ErrorCode::InvalidEncoding,
        }
    }
}

/// Error while encoding into a caller-provided buffer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("buffer too small: {needed} bytes needed, {available} available")]
    BufferTooSmall { needed: usize, available: usize },
}

impl EncodeError {
    /// Returns the classification of this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            EncodeError::BufferTooSmall { .. } => ErrorCode::BufferTooSmall,
        }
    }
}

/// A type cannot be given a codec.
///
/// These are programming errors in a type's declaration, never data errors.
/// The entry points panic with them; [`crate::prepare`] returns them so they
/// can be caught at startup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("unsupported type {type_name}: {reason}")]
    Unsupported {
        type_name: &'static str,
        reason: &'static str,
    },

    #[error("{type_name}.{field}: field number {number} is outside 1..=536870911")]
    InvalidFieldNumber {
        type_name: &'static str,
        field: &'static str,
        number: u32,
    },

    #[error("{type_name}: field number {number} is used by both {first} and {second}")]
    DuplicateFieldNumber {
        type_name: &'static str,
        number: u32,
        first: &'static str,
        second: &'static str,
    },
}

/// Error returned by the public entry points.
///
/// Wraps the underlying failure with the operation and the target type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("{op}({type_name}): {source}")]
    Encode {
        op: &'static str,
        type_name: &'static str,
        source: EncodeError,
    },

    #[error("{op}({type_name}): {source}")]
    Decode {
        op: &'static str,
        type_name: &'static str,
        source: DecodeError,
    },

    #[error("{op}({type_name}): read={read} < buffer={len}")]
    TrailingBytes {
        op: &'static str,
        type_name: &'static str,
        read: usize,
        len: usize,
    },
}

impl Error {
    /// Returns the classification of this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::Encode { source, .. } => source.code(),
            Error::Decode { source, .. } => source.code(),
            Error::TrailingBytes { .. } => ErrorCode::TrailingBytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_codes() {
        assert_eq!(
            DecodeError::UnexpectedEof { context: "varint" }.code(),
            ErrorCode::Truncated
        );
        assert_eq!(DecodeError::VarintTooLong.code(), ErrorCode::InvalidEncoding);
        assert_eq!(
            DecodeError::LengthExceedsRemaining { len: 9, remaining: 2 }.code(),
            ErrorCode::InvalidEncoding
        );
        assert_eq!(
            DecodeError::RecursionLimitExceeded { limit: 100 }.code(),
            ErrorCode::InvalidEncoding
        );
    }

    #[test]
    fn test_error_message_names_operation_and_type() {
        let err = Error::Decode {
            op: "unmarshal",
            type_name: "app::Point",
            source: DecodeError::UnexpectedEof { context: "varint" },
        };
        assert_eq!(
            err.to_string(),
            "unmarshal(app::Point): unexpected end of input while reading varint"
        );
        assert_eq!(err.code(), ErrorCode::Truncated);
    }

    #[test]
    fn test_trailing_bytes_message() {
        let err = Error::TrailingBytes {
            op: "unmarshal",
            type_name: "i32",
            read: 2,
            len: 3,
        };
        assert_eq!(err.to_string(), "unmarshal(i32): read=2 < buffer=3");
        assert_eq!(err.code(), ErrorCode::TrailingBytes);
    }
}
