//! Unified error codes for the ticket tracker
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 3xxx: Board errors
//! - 4xxx: Status errors
//! - 5xxx: Ticket errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Validation failed
    ValidationFailed = 2,
    /// Value out of range
    ValueOutOfRange = 8,
    /// The same id appears more than once in one request
    DuplicateId = 9,
    /// Rows changed underneath the request
    ConcurrentModification = 10,

    // ==================== 1xxx: Auth ====================
    /// User is not authenticated
    NotAuthenticated = 1001,
    /// Token has expired
    TokenExpired = 1003,
    /// Token is invalid
    TokenInvalid = 1004,

    // ==================== 3xxx: Board ====================
    /// Board not found (or not owned by the caller)
    BoardNotFound = 3001,

    // ==================== 4xxx: Status ====================
    /// Status not found (or not on the caller's board)
    StatusNotFound = 4001,

    // ==================== 5xxx: Ticket ====================
    /// Ticket not found (or not in the caller's status)
    TicketNotFound = 5001,
    /// A move to another status needs a target position
    TargetPositionRequired = 5002,

    // ==================== 9xxx: System ====================
    InternalError = 9001,
    TimeoutError = 9004,
}

impl ErrorCode {
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::ValueOutOfRange => "Value is out of range",
            ErrorCode::DuplicateId => "Duplicate id in request",
            ErrorCode::ConcurrentModification => "Resource was modified concurrently",

            // Auth
            ErrorCode::NotAuthenticated => "User is not authenticated",
            ErrorCode::TokenExpired => "Authentication token has expired",
            ErrorCode::TokenInvalid => "Authentication token is invalid",

            // Board
            ErrorCode::BoardNotFound => "Board not found",

            // Status
            ErrorCode::StatusNotFound => "Status not found",

            // Ticket
            ErrorCode::TicketNotFound => "Ticket not found",
            ErrorCode::TargetPositionRequired => {
                "sort_order is required when moving to another status"
            }

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::TimeoutError => "Operation timed out",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            2 => Ok(ErrorCode::ValidationFailed),
            8 => Ok(ErrorCode::ValueOutOfRange),
            9 => Ok(ErrorCode::DuplicateId),
            10 => Ok(ErrorCode::ConcurrentModification),

            // Auth
            1001 => Ok(ErrorCode::NotAuthenticated),
            1003 => Ok(ErrorCode::TokenExpired),
            1004 => Ok(ErrorCode::TokenInvalid),

            // Board / Status / Ticket
            3001 => Ok(ErrorCode::BoardNotFound),
            4001 => Ok(ErrorCode::StatusNotFound),
            5001 => Ok(ErrorCode::TicketNotFound),
            5002 => Ok(ErrorCode::TargetPositionRequired),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9004 => Ok(ErrorCode::TimeoutError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: &[ErrorCode] = &[
        ErrorCode::ValidationFailed,
        ErrorCode::ValueOutOfRange,
        ErrorCode::DuplicateId,
        ErrorCode::ConcurrentModification,
        ErrorCode::NotAuthenticated,
        ErrorCode::TokenExpired,
        ErrorCode::TokenInvalid,
        ErrorCode::BoardNotFound,
        ErrorCode::StatusNotFound,
        ErrorCode::TicketNotFound,
        ErrorCode::TargetPositionRequired,
        ErrorCode::InternalError,
        ErrorCode::TimeoutError,
    ];

    #[test]
    fn test_every_code_converts_back() {
        for code in ALL {
            assert_eq!(ErrorCode::try_from(code.code()), Ok(*code));
        }
    }

    #[test]
    fn test_unknown_value_rejected() {
        assert_eq!(ErrorCode::try_from(0), Err(InvalidErrorCode(0)));
        assert_eq!(ErrorCode::try_from(3), Err(InvalidErrorCode(3)));
        assert_eq!(ErrorCode::try_from(9999), Err(InvalidErrorCode(9999)));
    }

    #[test]
    fn test_serde_as_number() {
        let json = serde_json::to_string(&ErrorCode::TicketNotFound).unwrap();
        assert_eq!(json, "5001");
        let code: ErrorCode = serde_json::from_str("4001").unwrap();
        assert_eq!(code, ErrorCode::StatusNotFound);
        assert!(serde_json::from_str::<ErrorCode>("1234").is_err());
    }

    #[test]
    fn test_display_is_numeric() {
        assert_eq!(ErrorCode::BoardNotFound.to_string(), "3001");
        assert_eq!(ErrorCode::DuplicateId.to_string(), "9");
    }
}
