//! Script identifiers used to scope history queries.
//!
//! Indexers key history by output script. The reconciler treats a
//! [`ScriptRef`] as an opaque key; providers use it to build their query.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::provider::ProviderError;

/// Size of a HASH160 payload (p2pkh / p2sh).
pub const HASH160_SIZE: usize = 20;
/// Size of a compressed public key (p2pk).
pub const COMPRESSED_PUBKEY_SIZE: usize = 33;
/// Size of an uncompressed public key (p2pk).
pub const UNCOMPRESSED_PUBKEY_SIZE: usize = 65;

const OP_DUP: u8 = 0x76;
const OP_HASH160: u8 = 0xa9;
const OP_EQUAL: u8 = 0x87;
const OP_EQUALVERIFY: u8 = 0x88;
const OP_CHECKSIG: u8 = 0xac;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptType {
    P2pkh,
    P2sh,
    P2pk,
    Other,
}

impl ScriptType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScriptType::P2pkh => "p2pkh",
            ScriptType::P2sh => "p2sh",
            ScriptType::P2pk => "p2pk",
            ScriptType::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Result<Self, ProviderError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "p2pkh" => Ok(ScriptType::P2pkh),
            "p2sh" => Ok(ScriptType::P2sh),
            "p2pk" => Ok(ScriptType::P2pk),
            "other" => Ok(ScriptType::Other),
            other => Err(ProviderError::Config(format!(
                "invalid script type '{other}'. expected one of: p2pkh | p2sh | p2pk | other"
            ))),
        }
    }
}

/// Output-script identifier: a script type plus its payload bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScriptRef {
    script_type: ScriptType,
    payload: Vec<u8>,
}

impl ScriptRef {
    pub fn new(script_type: ScriptType, payload: Vec<u8>) -> Result<Self, ProviderError> {
        let ok = match script_type {
            ScriptType::P2pkh | ScriptType::P2sh => payload.len() == HASH160_SIZE,
            ScriptType::P2pk => {
                payload.len() == COMPRESSED_PUBKEY_SIZE || payload.len() == UNCOMPRESSED_PUBKEY_SIZE
            }
            ScriptType::Other => !payload.is_empty(),
        };
        if !ok {
            return Err(ProviderError::Config(format!(
                "invalid {} payload length {}",
                script_type.as_str(),
                payload.len()
            )));
        }
        Ok(Self {
            script_type,
            payload,
        })
    }

    pub fn p2pkh(hash160: [u8; HASH160_SIZE]) -> Self {
        Self {
            script_type: ScriptType::P2pkh,
            payload: hash160.to_vec(),
        }
    }

    pub fn p2sh(hash160: [u8; HASH160_SIZE]) -> Self {
        Self {
            script_type: ScriptType::P2sh,
            payload: hash160.to_vec(),
        }
    }

    pub fn from_hex(script_type: ScriptType, payload_hex: &str) -> Result<Self, ProviderError> {
        let payload = hex::decode(payload_hex.trim())
            .map_err(|e| ProviderError::Config(format!("invalid payload hex: {e}")))?;
        Self::new(script_type, payload)
    }

    pub fn script_type(&self) -> ScriptType {
        self.script_type
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn payload_hex(&self) -> String {
        hex::encode(&self.payload)
    }

    /// Output script bytecode this identifier stands for.
    ///
    /// - p2pkh: `OP_DUP OP_HASH160 <hash> OP_EQUALVERIFY OP_CHECKSIG`
    /// - p2sh: `OP_HASH160 <hash> OP_EQUAL`
    /// - p2pk: `<pubkey> OP_CHECKSIG`
    /// - other: the payload is the script
    pub fn script_bytes(&self) -> Vec<u8> {
        let n = self.payload.len();
        match self.script_type {
            ScriptType::P2pkh => {
                let mut s = Vec::with_capacity(n + 5);
                s.extend_from_slice(&[OP_DUP, OP_HASH160, n as u8]);
                s.extend_from_slice(&self.payload);
                s.extend_from_slice(&[OP_EQUALVERIFY, OP_CHECKSIG]);
                s
            }
            ScriptType::P2sh => {
                let mut s = Vec::with_capacity(n + 3);
                s.extend_from_slice(&[OP_HASH160, n as u8]);
                s.extend_from_slice(&self.payload);
                s.push(OP_EQUAL);
                s
            }
            ScriptType::P2pk => {
                let mut s = Vec::with_capacity(n + 2);
                s.push(n as u8);
                s.extend_from_slice(&self.payload);
                s.push(OP_CHECKSIG);
                s
            }
            ScriptType::Other => self.payload.clone(),
        }
    }

    pub fn script_hex(&self) -> String {
        hex::encode(self.script_bytes())
    }
}

impl fmt::Display for ScriptRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.script_type.as_str(), self.payload_hex())
    }
}

/// Parses `type:payloadhex`, e.g. `p2pkh:00112233445566778899aabbccddeeff00112233`.
impl FromStr for ScriptRef {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (ty, payload) = s.split_once(':').ok_or_else(|| {
            ProviderError::Config(format!("script '{s}' must be formatted as type:payloadhex"))
        })?;
        ScriptRef::from_hex(ScriptType::parse(ty)?, payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HASH: &str = "00112233445566778899aabbccddeeff00112233";

    #[test]
    fn p2pkh_script_hex() {
        let s: ScriptRef = format!("p2pkh:{HASH}").parse().unwrap();
        assert_eq!(
            s.script_hex(),
            "76a91400112233445566778899aabbccddeeff0011223388ac"
        );
    }

    #[test]
    fn p2sh_script_hex() {
        let s = ScriptRef::from_hex(ScriptType::P2sh, HASH).unwrap();
        assert_eq!(s.script_hex(), "a91400112233445566778899aabbccddeeff0011223387");
    }

    #[test]
    fn p2pk_script_hex() {
        let pk = format!("02{}", "11".repeat(32));
        let s = ScriptRef::from_hex(ScriptType::P2pk, &pk).unwrap();
        assert_eq!(s.script_hex(), format!("21{pk}ac"));
    }

    #[test]
    fn display_round_trips_through_from_str() {
        let s: ScriptRef = format!("P2PKH:{HASH}").parse().unwrap();
        assert_eq!(s.to_string(), format!("p2pkh:{HASH}"));
    }

    #[test]
    fn rejects_wrong_hash_length() {
        assert!(ScriptRef::from_hex(ScriptType::P2pkh, "0011").is_err());
    }

    #[test]
    fn rejects_bad_hex_and_missing_separator() {
        assert!("p2pkh:zz".parse::<ScriptRef>().is_err());
        assert!(HASH.parse::<ScriptRef>().is_err());
        assert!(format!("p2wsh:{HASH}").parse::<ScriptRef>().is_err());
    }
}
