//! Signed model manifests.
//!
//! A model directory carries `manifest.json` (SHA-256 of every bound file)
//! and `model.sig`, a raw 64-byte Ed25519 signature over the manifest bytes.
//! A model file is only loaded if the signature verifies and its digest
//! matches the manifest entry.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use base64::Engine;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::ModelLoadError;

pub const MANIFEST_FILE: &str = "manifest.json";
pub const SIGNATURE_FILE: &str = "model.sig";
pub const MANIFEST_VERSION: u32 = 1;

/// Signed content: which files make up a model release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelManifest {
    pub version: u32,
    /// Unix timestamp (seconds) when the manifest was created
    #[serde(default)]
    pub created_at: Option<i64>,
    /// Relative file name -> lowercase hex SHA-256
    pub files: BTreeMap<String, String>,
}

/// How much to trust a model directory.
#[derive(Debug, Clone)]
pub enum ModelTrust {
    /// Require a manifest signed by this key.
    Signed(VerifyingKey),
    /// Skip signature checks. Debug builds only.
    #[cfg(debug_assertions)]
    Unsigned,
}

impl ModelTrust {
    /// Decode a base64 Ed25519 verifying key.
    ///
    /// # Errors
    /// Returns error if the text is not base64 of a valid 32-byte key.
    pub fn from_public_key_b64(b64: &str) -> Result<Self, ModelLoadError> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(b64.trim())
            .map_err(|_| ModelLoadError::Signature("Invalid public key base64".into()))?;
        let pubkey: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
            ModelLoadError::Signature("Invalid public key length (expected 32 bytes)".into())
        })?;
        let key = VerifyingKey::from_bytes(&pubkey)
            .map_err(|_| ModelLoadError::Signature("Invalid verifying key".into()))?;
        Ok(Self::Signed(key))
    }
}

/// Lowercase hex SHA-256 digest.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// Verify the manifest signature and every file digest it lists.
///
/// Returns `None` when the trust policy skips verification.
///
/// # Errors
/// Returns `ModelLoadError::Signature` if anything fails to verify.
pub fn verify_model_dir(
    dir: &Path,
    trust: &ModelTrust,
) -> Result<Option<ModelManifest>, ModelLoadError> {
    let key = match trust {
        ModelTrust::Signed(key) => key,
        #[cfg(debug_assertions)]
        ModelTrust::Unsigned => {
            tracing::warn!("Loading UNSIGNED model from {:?}; debug builds only", dir);
            return Ok(None);
        }
    };

    let sig_path = dir.join(SIGNATURE_FILE);
    let manifest_path = dir.join(MANIFEST_FILE);
    if !sig_path.exists() || !manifest_path.exists() {
        tracing::error!("Model signature not found at {:?}", sig_path);
        return Err(ModelLoadError::Signature(format!(
            "{SIGNATURE_FILE} and {MANIFEST_FILE} are required in {}",
            dir.display()
        )));
    }

    let sig_bytes = fs::read(&sig_path)?;
    let sig_array: [u8; 64] = sig_bytes.as_slice().try_into().map_err(|_| {
        ModelLoadError::Signature("Invalid signature length (expected 64 bytes)".into())
    })?;
    let signature = Signature::from_bytes(&sig_array);

    let manifest_bytes = fs::read(&manifest_path)?;
    key.verify(&manifest_bytes, &signature)
        .map_err(|_| ModelLoadError::Signature("Invalid model signature".into()))?;

    let manifest: ModelManifest = serde_json::from_slice(&manifest_bytes)
        .map_err(|e| ModelLoadError::Format(format!("Invalid {MANIFEST_FILE}: {e}")))?;
    if manifest.version != MANIFEST_VERSION {
        return Err(ModelLoadError::Signature(format!(
            "Unsupported manifest version: {}",
            manifest.version
        )));
    }
    if manifest.files.is_empty() {
        return Err(ModelLoadError::Signature(format!(
            "{MANIFEST_FILE} contains no files"
        )));
    }

    for (rel, expected_hex) in &manifest.files {
        let path = dir.join(rel);
        let bytes = fs::read(&path).map_err(|e| {
            ModelLoadError::Signature(format!(
                "Manifest references missing/unreadable file {path:?}: {e}"
            ))
        })?;
        if !constant_time_eq_str(&sha256_hex(&bytes), expected_hex) {
            return Err(ModelLoadError::Signature(format!(
                "File hash mismatch for {rel}"
            )));
        }
    }

    tracing::info!("Model signature and hashes verified ({} files)", manifest.files.len());
    Ok(Some(manifest))
}

// Constant-time compare for ASCII strings (used for SHA-256 hex digests).
fn constant_time_eq_str(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff: u8 = 0;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes().iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};
    use rand::RngCore;
    use tempfile::tempdir;

    fn signing_key() -> SigningKey {
        let mut seed = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut seed);
        SigningKey::from_bytes(&seed)
    }

    fn write_signed(dir: &Path, key: &SigningKey, files: &[(&str, &[u8])]) {
        let mut map = BTreeMap::new();
        for (rel, contents) in files {
            std::fs::write(dir.join(rel), contents).expect("write file");
            map.insert((*rel).to_string(), sha256_hex(contents));
        }
        let manifest = ModelManifest {
            version: MANIFEST_VERSION,
            created_at: Some(1_700_000_000),
            files: map,
        };
        let bytes = serde_json::to_vec(&manifest).expect("serialize manifest");
        std::fs::write(dir.join(MANIFEST_FILE), &bytes).expect("write manifest");
        let signature: Signature = key.sign(&bytes);
        std::fs::write(dir.join(SIGNATURE_FILE), signature.to_bytes()).expect("write sig");
    }

    #[test]
    fn test_valid_signature_verifies() {
        let temp = tempdir().expect("tempdir");
        let key = signing_key();
        write_signed(temp.path(), &key, &[("forest.json", b"{}")]);

        let trust = ModelTrust::Signed(key.verifying_key());
        let manifest = verify_model_dir(temp.path(), &trust)
            .expect("Should verify")
            .expect("Signed trust returns the manifest");
        assert!(manifest.files.contains_key("forest.json"));
    }

    #[test]
    fn test_wrong_key_is_rejected() {
        let temp = tempdir().expect("tempdir");
        write_signed(temp.path(), &signing_key(), &[("forest.json", b"{}")]);

        let trust = ModelTrust::Signed(signing_key().verifying_key());
        let err = verify_model_dir(temp.path(), &trust).unwrap_err();
        assert!(matches!(err, ModelLoadError::Signature(_)));
    }

    #[test]
    fn test_tampered_file_is_rejected() {
        let temp = tempdir().expect("tempdir");
        let key = signing_key();
        write_signed(temp.path(), &key, &[("forest.json", b"{}")]);
        std::fs::write(temp.path().join("forest.json"), b"{\"x\":1}").expect("tamper");

        let err = verify_model_dir(temp.path(), &ModelTrust::Signed(key.verifying_key()))
            .unwrap_err();
        assert!(err.to_string().contains("hash mismatch"));
    }

    #[test]
    fn test_missing_signature_is_rejected() {
        let temp = tempdir().expect("tempdir");
        let key = signing_key();
        let err = verify_model_dir(temp.path(), &ModelTrust::Signed(key.verifying_key()))
            .unwrap_err();
        assert!(matches!(err, ModelLoadError::Signature(_)));
    }

    #[test]
    fn test_public_key_b64() {
        let key = signing_key();
        let b64 = base64::engine::general_purpose::STANDARD.encode(key.verifying_key().to_bytes());
        assert!(matches!(
            ModelTrust::from_public_key_b64(&b64),
            Ok(ModelTrust::Signed(_))
        ));
        assert!(ModelTrust::from_public_key_b64("not base64!").is_err());
        assert!(ModelTrust::from_public_key_b64("AAAA").is_err());
    }
}
