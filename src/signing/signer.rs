use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};
use serde::{Deserialize, Serialize};

use crate::domain::TransactionRequest;
use crate::error::{Result, TrawlError};

/// Signed transaction bytes as accepted by `sui_executeTransactionBlock`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedTransaction {
    /// Base64 BCS `TransactionData`
    pub tx_bytes: String,
    /// Base64 serialized signatures
    pub signatures: Vec<String>,
}

impl SignedTransaction {
    /// Reject payloads that are empty or not base64 before they hit the node
    pub fn validate(&self) -> Result<()> {
        if self.tx_bytes.trim().is_empty() {
            return Err(TrawlError::Signer("signer returned empty txBytes".into()));
        }
        BASE64_STANDARD
            .decode(self.tx_bytes.trim())
            .map_err(|e| TrawlError::Signer(format!("txBytes is not base64: {}", e)))?;
        if self.signatures.is_empty() {
            return Err(TrawlError::Signer("signer returned no signature".into()));
        }
        for sig in &self.signatures {
            BASE64_STANDARD
                .decode(sig.trim())
                .map_err(|e| TrawlError::Signer(format!("signature is not base64: {}", e)))?;
        }
        Ok(())
    }
}

/// Opaque signing capability for one address.
///
/// Key derivation, BCS encoding and the signature scheme all live behind
/// this trait.
#[async_trait]
pub trait TransactionSigner: Send + Sync {
    /// Sui address controlled by this signer
    fn address(&self) -> &str;

    /// Serialize and sign a staged transaction
    async fn sign(&self, request: &TransactionRequest) -> Result<SignedTransaction>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_bad_payloads() {
        let ok = SignedTransaction {
            tx_bytes: BASE64_STANDARD.encode(b"tx"),
            signatures: vec![BASE64_STANDARD.encode(b"sig")],
        };
        assert!(ok.validate().is_ok());

        let empty = SignedTransaction {
            tx_bytes: "  ".into(),
            signatures: ok.signatures.clone(),
        };
        assert!(empty.validate().is_err());

        let not_b64 = SignedTransaction {
            tx_bytes: "***".into(),
            signatures: ok.signatures.clone(),
        };
        assert!(not_b64.validate().is_err());

        let unsigned = SignedTransaction {
            tx_bytes: ok.tx_bytes.clone(),
            signatures: vec![],
        };
        assert!(unsigned.validate().is_err());
    }
}
