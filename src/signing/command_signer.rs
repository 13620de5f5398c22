//! Signer backed by an external helper program.
//!
//! Protocol:
//! - `<command> address` prints the Sui address for the mnemonic.
//! - `<command> sign` reads a [`TransactionRequest`] as JSON on stdin and
//!   prints `{"txBytes": "<base64>", "signature": "<base64>"}`.
//!
//! The mnemonic reaches the helper only through `TRAWL_MNEMONIC` in its
//! environment.

use async_trait::async_trait;
use serde::Deserialize;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

use super::mnemonic::Mnemonic;
use super::signer::{SignedTransaction, TransactionSigner};
use crate::domain::TransactionRequest;
use crate::error::{Result, TrawlError};

pub const MNEMONIC_ENV: &str = "TRAWL_MNEMONIC";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignOutput {
    tx_bytes: String,
    #[serde(default)]
    signature: Option<String>,
    #[serde(default)]
    signatures: Vec<String>,
}

#[derive(Debug)]
pub struct CommandSigner {
    program: String,
    args: Vec<String>,
    mnemonic: Mnemonic,
    address: String,
}

impl CommandSigner {
    /// Resolve the address for `mnemonic` and return a ready signer.
    ///
    /// `command` is split on whitespace: program followed by fixed arguments.
    pub async fn connect(command: &str, mnemonic: Mnemonic) -> Result<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| TrawlError::Signer("signer command is empty".to_string()))?;
        let args: Vec<String> = parts.collect();

        let mut signer = Self {
            program,
            args,
            mnemonic,
            address: String::new(),
        };

        let output = signer.run("address", None).await?;
        let address = output.trim().to_string();
        validate_address(&address)?;
        info!("Signer ready for {}", address);
        signer.address = address;
        Ok(signer)
    }

    async fn run(&self, action: &str, stdin: Option<Vec<u8>>) -> Result<String> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(action)
            .env(MNEMONIC_ENV, self.mnemonic.phrase())
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| TrawlError::Signer(format!("cannot start {}: {}", self.program, e)))?;

        if let Some(payload) = stdin {
            if let Some(mut pipe) = child.stdin.take() {
                pipe.write_all(&payload).await?;
                pipe.shutdown().await?;
            }
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            return Err(TrawlError::Signer(format!(
                "{} {} exited with {}: {}",
                self.program,
                action,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        String::from_utf8(output.stdout)
            .map_err(|e| TrawlError::Signer(format!("signer output is not UTF-8: {}", e)))
    }
}

#[async_trait]
impl TransactionSigner for CommandSigner {
    fn address(&self) -> &str {
        &self.address
    }

    async fn sign(&self, request: &TransactionRequest) -> Result<SignedTransaction> {
        debug!("Signing {} for {}", request.summary(), self.address);
        let payload = serde_json::to_vec(request)?;
        let raw = self.run("sign", Some(payload)).await?;
        let parsed: SignOutput = serde_json::from_str(raw.trim())
            .map_err(|e| TrawlError::Signer(format!("unexpected signer output: {}", e)))?;

        let mut signatures = parsed.signatures;
        if let Some(sig) = parsed.signature {
            signatures.insert(0, sig);
        }

        let signed = SignedTransaction {
            tx_bytes: parsed.tx_bytes,
            signatures,
        };
        signed.validate()?;
        Ok(signed)
    }
}

/// `0x` followed by 1..=64 hex digits
pub fn validate_address(address: &str) -> Result<()> {
    let digits = address
        .strip_prefix("0x")
        .ok_or_else(|| TrawlError::Validation(format!("address {} must start with 0x", address)))?;
    if digits.is_empty() || digits.len() > 64 {
        return Err(TrawlError::Validation(format!(
            "address {} must have 1-64 hex digits",
            address
        )));
    }
    let padded = if digits.len() % 2 == 1 {
        format!("0{}", digits)
    } else {
        digits.to_string()
    };
    hex::decode(padded)
        .map_err(|e| TrawlError::Validation(format!("address {} is not hex: {}", address, e)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_address() {
        assert!(validate_address("0x6").is_ok());
        assert!(validate_address(&format!("0x{}", "ab".repeat(32))).is_ok());
        assert!(validate_address("6").is_err());
        assert!(validate_address("0x").is_err());
        assert!(validate_address("0xzz").is_err());
        assert!(validate_address(&format!("0x{}", "a".repeat(65))).is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_connect_and_sign_with_shell_helper() {
        // Stand-in helper: echoes a fixed address and a fixed signed payload
        let script = r#"case "$1" in
  address) echo 0xabc ;;
  sign) cat > /dev/null; echo '{"txBytes":"dHg=","signature":"c2ln"}' ;;
esac"#;
        let path = std::env::temp_dir().join(format!("trawl-signer-{}.sh", uuid::Uuid::new_v4()));
        std::fs::write(&path, script).unwrap();

        let command = format!("sh {}", path.display());
        let signer = CommandSigner::connect(&command, Mnemonic::new("one two").unwrap())
            .await
            .unwrap();
        assert_eq!(signer.address(), "0xabc");

        let request = crate::domain::TransactionBuilder::new().build("0xabc", 1);
        let signed = signer.sign(&request).await.unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(signed.tx_bytes, "dHg=");
        assert_eq!(signed.signatures, vec!["c2ln".to_string()]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_helper_is_signer_error() {
        let err = CommandSigner::connect("false", Mnemonic::new("one").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, TrawlError::Signer(_)));
    }
}
