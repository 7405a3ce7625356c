// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Little-endian CDR encoding for data-port payloads.

pub mod cursor;

pub use cursor::{CdrReader, CdrWriter};

use std::fmt;

/// Decoding failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CdrError {
    ReadFailed { offset: usize, reason: String },
    InvalidData { reason: String },
}

impl fmt::Display for CdrError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CdrError::ReadFailed { offset, reason } => {
                write!(f, "read failed at offset {}: {}", offset, reason)
            }
            CdrError::InvalidData { reason } => write!(f, "invalid data: {}", reason),
        }
    }
}

impl std::error::Error for CdrError {}

pub type CdrResult<T> = core::result::Result<T, CdrError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cdr_error_display_variants() {
        let err = CdrError::ReadFailed {
            offset: 4,
            reason: "unexpected end of buffer".into(),
        };
        assert_eq!(err.to_string(), "read failed at offset 4: unexpected end of buffer");

        let err = CdrError::InvalidData {
            reason: "string is not utf-8".into(),
        };
        assert_eq!(err.to_string(), "invalid data: string is not utf-8");
    }
}
