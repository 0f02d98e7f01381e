//! Per-chunk package metadata and its wire codec.

use crate::checksum::DeclaredChecksum;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which authentication scheme a deployment activates.
///
/// Exactly one scheme is active per deployment: either the shared secret
/// travels in the dedicated `Secret` request header, or it is embedded as a
/// token segment of the package descriptor. The two grammars are not
/// interoperable; there is no version marker on the wire.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthPlacement {
    /// Secret carried in the dedicated `Secret` request header.
    Header,
    /// Secret embedded as the second segment of the package descriptor.
    #[default]
    Embedded,
}

/// Opaque token identifying one overall transfer.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PackageId(String);

impl PackageId {
    /// Parse a package identifier.
    ///
    /// An identifier is a single alphanumeric character, or starts and ends
    /// with an alphanumeric character with word characters and dashes in
    /// between. Case is preserved.
    pub fn parse(s: &str) -> Result<Self> {
        if !is_identifier(s) {
            return Err(Error::MetadataMalformed(format!("invalid package id: {s}")));
        }
        Ok(Self(s.to_string()))
    }

    /// Get the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Check a string against the identifier grammar shared by package ids and
/// embedded tokens.
pub(crate) fn is_identifier(s: &str) -> bool {
    let bytes = s.as_bytes();
    let Some((&first, rest)) = bytes.split_first() else {
        return false;
    };
    let Some((&last, middle)) = rest.split_last() else {
        return first.is_ascii_alphanumeric();
    };
    first.is_ascii_alphanumeric()
        && last.is_ascii_alphanumeric()
        && middle
            .iter()
            .all(|&b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

/// Metadata extracted from one chunk request.
///
/// The checksum is declared by the sender up front and covers the fully
/// reassembled artifact, not the individual chunk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackageMeta {
    /// Identity of the overall transfer.
    pub package: PackageId,
    /// Embedded secret token (embedded-token deployments only).
    pub token: Option<String>,
    /// 1-based position of this chunk.
    pub sequence: u32,
    /// Declared total chunk count for the package.
    pub total: u32,
    /// Declared checksum of the fully reassembled artifact.
    pub checksum: DeclaredChecksum,
}

impl PackageMeta {
    /// Parse a `Package` header value under the given authentication scheme.
    ///
    /// The grammar is `<packageId>/<sequence>/<total>/<checksum>` for
    /// header-secret deployments and
    /// `<packageId>/<token>/<sequence>/<total>/<checksum>` for embedded-token
    /// deployments. A missing value is [`Error::MetadataAbsent`]; anything
    /// that does not match the active grammar exactly, including a sequence
    /// outside `1..=total`, is [`Error::MetadataMalformed`]. There is never a
    /// partial parse.
    pub fn parse(value: Option<&str>, placement: AuthPlacement) -> Result<Self> {
        let value = value.ok_or(Error::MetadataAbsent)?;
        let segments: Vec<&str> = value.split('/').collect();
        let expected = match placement {
            AuthPlacement::Header => 4,
            AuthPlacement::Embedded => 5,
        };
        if segments.len() != expected {
            return Err(Error::MetadataMalformed(format!(
                "expected {expected} segments, got {}",
                segments.len()
            )));
        }

        let package = PackageId::parse(segments[0])?;
        let (token, rest) = match placement {
            AuthPlacement::Header => (None, &segments[1..]),
            AuthPlacement::Embedded => {
                if !is_identifier(segments[1]) {
                    return Err(Error::MetadataMalformed(
                        "invalid token segment".to_string(),
                    ));
                }
                (Some(segments[1].to_string()), &segments[2..])
            }
        };

        let sequence = parse_decimal(rest[0])?;
        let total = parse_decimal(rest[1])?;
        if sequence == 0 || sequence > total {
            return Err(Error::MetadataMalformed(format!(
                "sequence {sequence} out of range 1..={total}"
            )));
        }
        let checksum = DeclaredChecksum::parse(rest[2])?;

        Ok(Self {
            package,
            token,
            sequence,
            total,
            checksum,
        })
    }

    /// Re-encode as a `Package` header value.
    pub fn header_value(&self) -> String {
        match &self.token {
            Some(token) => format!(
                "{}/{}/{}/{}/{}",
                self.package, token, self.sequence, self.total, self.checksum
            ),
            None => format!(
                "{}/{}/{}/{}",
                self.package, self.sequence, self.total, self.checksum
            ),
        }
    }
}

fn parse_decimal(s: &str) -> Result<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::MetadataMalformed(format!(
            "invalid decimal segment: {s}"
        )));
    }
    s.parse::<u32>()
        .map_err(|_| Error::MetadataMalformed(format!("decimal segment out of range: {s}")))
}
