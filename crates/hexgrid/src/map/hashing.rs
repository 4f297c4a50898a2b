use sha2::{Digest, Sha256};

use super::format::{MapFormatError, MapHeader};

/// SHA-256 digests of each map section plus one over all three, as lower
/// hex. Clients compare these against server-advertised values before
/// deciding whether a cached map is current.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapHashes {
    pub tiles: String,
    pub walls: String,
    pub scenery: String,
    pub combined: String,
}

impl MapHashes {
    /// Hashes the raw sections of an encoded blob without decoding records.
    pub fn compute(bytes: &[u8]) -> Result<Self, MapFormatError> {
        let header = MapHeader::parse(bytes)?;
        if bytes.len() < header.total_len() {
            return Err(MapFormatError::Truncated {
                offset: bytes.len(),
                needed: header.total_len() - bytes.len(),
                available: 0,
            });
        }
        // Empty sections still get a map-specific digest.
        let seed = (u32::from(header.width) * u32::from(header.height)).to_be_bytes();
        let [tiles, walls, scenery] = header.section_ranges().map(|range| {
            let section = &bytes[range];
            if section.is_empty() {
                sha256_bytes(&seed)
            } else {
                sha256_bytes(section)
            }
        });

        let mut hasher = Sha256::new();
        for digest in [&tiles, &walls, &scenery] {
            hasher.update(digest);
        }
        Ok(Self {
            tiles: to_hex_lower(&tiles),
            walls: to_hex_lower(&walls),
            scenery: to_hex_lower(&scenery),
            combined: to_hex_lower(&hasher.finalize()),
        })
    }
}

fn sha256_bytes(bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher.finalize().into()
}

pub(crate) fn to_hex_lower(bytes: &[u8]) -> String {
    let mut output = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        use std::fmt::Write as _;
        let _ = write!(&mut output, "{byte:02x}");
    }
    output
}
