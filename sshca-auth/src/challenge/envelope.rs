use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use super::ChallengeError;
use crate::identity::Signature;

/// The JSON envelope exchanged in challenge requests and responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeData {
    #[serde(rename = "Data", with = "b64")]
    data: Vec<u8>,
    #[serde(rename = "Signature", default, skip_serializing_if = "Option::is_none")]
    signature: Option<WireSignature>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct WireSignature {
    #[serde(rename = "Format")]
    format: String,
    #[serde(rename = "Blob", with = "b64")]
    blob: Vec<u8>,
}

impl ChallengeData {
    pub(crate) fn unsigned(data: Vec<u8>) -> Self {
        Self {
            data,
            signature: None,
        }
    }

    pub(crate) fn signed(data: Vec<u8>, signature: &Signature) -> Self {
        Self {
            data,
            signature: Some(WireSignature {
                format: signature.format(),
                blob: signature.as_bytes().to_vec(),
            }),
        }
    }

    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// The attached signature, if any.
    ///
    /// # Errors
    ///
    /// Fails when the signature is present but its format is unsupported or
    /// its blob malformed.
    pub fn signature(&self) -> Result<Option<Signature>, ChallengeError> {
        match &self.signature {
            None => Ok(None),
            Some(sig) => Ok(Some(Signature::from_parts(&sig.format, &sig.blob)?)),
        }
    }

    #[must_use]
    pub fn encode(&self) -> String {
        // Serializing plain strings and byte vectors cannot fail.
        let json = serde_json::to_vec(self).unwrap_or_default();
        STANDARD.encode(json)
    }

    /// Decode pasted text; surrounding whitespace is ignored.
    ///
    /// # Errors
    ///
    /// Returns `InvalidBase64` or `Malformed`.
    pub fn decode(text: &str) -> Result<Self, ChallengeError> {
        let json = STANDARD
            .decode(text.trim())
            .map_err(|_| ChallengeError::InvalidBase64)?;
        serde_json::from_slice(&json).map_err(|e| ChallengeError::Malformed(e.to_string()))
    }
}

mod b64 {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(s).map_err(serde::de::Error::custom)
    }
}
