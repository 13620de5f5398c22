use std::path::Path;
use zeroize::Zeroizing;

use crate::error::{Result, TrawlError};

/// Seed phrase held only in zeroizing memory.
///
/// Never persisted and never logged; `Debug` prints the word count only.
#[derive(Clone)]
pub struct Mnemonic(Zeroizing<String>);

impl Mnemonic {
    pub fn new(phrase: &str) -> Result<Self> {
        let normalized = phrase.split_whitespace().collect::<Vec<_>>().join(" ");
        if normalized.is_empty() {
            return Err(TrawlError::Signer("mnemonic is empty".to_string()));
        }
        Ok(Self(Zeroizing::new(normalized)))
    }

    pub fn phrase(&self) -> &str {
        &self.0
    }

    pub fn word_count(&self) -> usize {
        self.0.split(' ').count()
    }

    /// Read one mnemonic from an environment variable
    pub fn from_env(var: &str) -> Result<Self> {
        let raw = Zeroizing::new(
            std::env::var(var)
                .map_err(|_| TrawlError::Signer(format!("{} is not set", var)))?,
        );
        Self::new(&raw)
    }

    /// Ask on the terminal without echo
    pub fn prompt() -> Result<Self> {
        let raw = Zeroizing::new(rpassword::prompt_password(
            "Input your mnemonic / seed phrase: ",
        )?);
        Self::new(&raw)
    }

    /// Load a JSON array of mnemonics for batch runs
    pub fn load_list<P: AsRef<Path>>(path: P) -> Result<Vec<Self>> {
        let path = path.as_ref();
        let raw = Zeroizing::new(std::fs::read_to_string(path).map_err(|e| {
            TrawlError::Signer(format!("cannot read {}: {}", path.display(), e))
        })?);
        let phrases: Vec<Zeroizing<String>> = serde_json::from_str::<Vec<String>>(&raw)
            .map_err(|e| {
                TrawlError::Signer(format!("{} must be a JSON array of strings: {}", path.display(), e))
            })?
            .into_iter()
            .map(Zeroizing::new)
            .collect();

        if phrases.is_empty() {
            return Err(TrawlError::Signer(format!("{} has no mnemonics", path.display())));
        }
        phrases.iter().map(|p| Self::new(p)).collect()
    }
}

impl std::fmt::Debug for Mnemonic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mnemonic")
            .field("words", &self.word_count())
            .finish()
    }
}
