//! Validating raw submissions into conversion requests.

use audioforged_common::{Encoding, Error, JobId, Result};
use serde::{Deserialize, Serialize};

/// Untrusted submission fields, as received from a client.
///
/// Encodings are catalog ordinals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawConversionRequest {
    pub source_url: String,
    pub source_encoding: i32,
    pub target_encoding: i32,
}

/// A validated, immutable conversion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRequest {
    id: JobId,
    source_url: String,
    source_encoding: Encoding,
    target_encoding: Encoding,
}

impl ConversionRequest {
    /// Validate `raw` and attach `id`.
    ///
    /// Checks run in order and the first failure wins: a non-empty source,
    /// a known source encoding, a known target encoding, then distinct
    /// encodings.
    pub fn validate(id: JobId, raw: &RawConversionRequest) -> Result<Self> {
        if raw.source_url.trim().is_empty() {
            return Err(Error::invalid_request("source location is required"));
        }

        let source_encoding = Encoding::from_ordinal(raw.source_encoding)?;
        let target_encoding = Encoding::from_ordinal(raw.target_encoding)?;

        if source_encoding == target_encoding {
            return Err(Error::NoOpConversion(source_encoding));
        }

        Ok(Self {
            id,
            source_url: raw.source_url.clone(),
            source_encoding,
            target_encoding,
        })
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    pub fn source_encoding(&self) -> Encoding {
        self.source_encoding
    }

    pub fn target_encoding(&self) -> Encoding {
        self.target_encoding
    }
}
