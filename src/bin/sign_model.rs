//! Model signing utility for NIMBLE survival forests.
//!
//! Creates a signed manifest (`manifest.json`) and Ed25519 signature
//! (`model.sig`) binding `forest.json`, so the prognosis host can verify the
//! model it loads.
//!
//! # Usage
//!
//! ```bash
//! sign_model --generate-key
//! NIMBLE_MODEL_SIGNING_KEY_B64_FILE=seed.b64 sign_model <model_dir>
//! ```
//!
//! `--generate-key` prints a fresh base64 seed and its verifying key. The
//! verifying key goes into `NIMBLE_MODEL_SIGNING_PUBKEY_B64(_FILE)` on the
//! host; the seed stays with whoever releases models.

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose;
use base64::Engine;
use ed25519_dalek::{Signature, Signer, SigningKey};
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use nimble::adapters::forest::manifest::{
    sha256_hex, ModelManifest, MANIFEST_FILE, MANIFEST_VERSION, SIGNATURE_FILE,
};
use nimble::adapters::forest::FOREST_FILE;

const KEY_FILE_ENV: &str = "NIMBLE_MODEL_SIGNING_KEY_B64_FILE";
const KEY_ENV_DEV: &str = "NIMBLE_MODEL_SIGNING_KEY_B64";

#[derive(Zeroize, ZeroizeOnDrop)]
struct Seed([u8; 32]);

enum Command {
    GenerateKey,
    Sign(PathBuf),
}

fn usage() -> String {
    "Usage: sign_model <model_dir> | sign_model --generate-key".to_string()
}

fn parse_args() -> Result<Command, String> {
    let args: Vec<String> = env::args().skip(1).collect();
    match args.as_slice() {
        [flag] if flag == "--generate-key" => Ok(Command::GenerateKey),
        [flag] if flag == "-h" || flag == "--help" => Err(usage()),
        [dir] => Ok(Command::Sign(PathBuf::from(dir))),
        _ => Err(usage()),
    }
}

fn read_signing_seed_b64() -> Result<Zeroizing<String>, String> {
    if let Ok(path) = env::var(KEY_FILE_ENV) {
        let content = fs::read_to_string(path.trim())
            .map_err(|e| format!("Failed reading signing key file: {e}"))?;
        return non_empty(content);
    }

    // Dev-only fallback for convenience.
    if cfg!(debug_assertions) {
        if let Ok(v) = env::var(KEY_ENV_DEV) {
            return non_empty(v);
        }
    }

    Err(format!(
        "Missing signing key. Provide {KEY_FILE_ENV} (or {KEY_ENV_DEV} in debug builds)."
    ))
}

fn non_empty(raw: String) -> Result<Zeroizing<String>, String> {
    let raw = Zeroizing::new(raw);
    let secret = raw.trim_end_matches(['\n', '\r']).to_string();
    if secret.is_empty() {
        return Err("Empty signing key".to_string());
    }
    Ok(Zeroizing::new(secret))
}

fn read_signing_seed() -> Result<Seed, String> {
    let b64 = read_signing_seed_b64()?;
    let raw = Zeroizing::new(
        general_purpose::STANDARD
            .decode(b64.trim())
            .map_err(|e| format!("Invalid base64 in signing key: {e}"))?,
    );
    let seed: [u8; 32] = raw.as_slice().try_into().map_err(|_| {
        format!(
            "Signing key seed must be 32 bytes after base64 decode (got {})",
            raw.len()
        )
    })?;
    Ok(Seed(seed))
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn generate_key() {
    let mut seed = Seed([0u8; 32]);
    OsRng.fill_bytes(&mut seed.0);
    let signing_key = SigningKey::from_bytes(&seed.0);

    println!("SIGNING_SEED_B64={}", general_purpose::STANDARD.encode(seed.0));
    println!(
        "VERIFYING_KEY_B64={}",
        general_purpose::STANDARD.encode(signing_key.verifying_key().to_bytes())
    );
}

fn sign(model_dir: &Path) -> Result<(), String> {
    let forest_path = model_dir.join(FOREST_FILE);
    let forest_bytes =
        fs::read(&forest_path).map_err(|e| format!("Failed to read {forest_path:?}: {e}"))?;

    let seed = read_signing_seed()?;
    let signing_key = SigningKey::from_bytes(&seed.0);

    let mut files = BTreeMap::new();
    files.insert(FOREST_FILE.to_string(), sha256_hex(&forest_bytes));

    let manifest = ModelManifest {
        version: MANIFEST_VERSION,
        created_at: Some(unix_now()),
        files,
    };
    let manifest_bytes = serde_json::to_vec_pretty(&manifest)
        .map_err(|e| format!("Failed to serialize {MANIFEST_FILE}: {e}"))?;

    let manifest_path = model_dir.join(MANIFEST_FILE);
    fs::write(&manifest_path, &manifest_bytes)
        .map_err(|e| format!("Failed to write {manifest_path:?}: {e}"))?;

    let sig: Signature = signing_key.sign(&manifest_bytes);
    let sig_path = model_dir.join(SIGNATURE_FILE);
    fs::write(&sig_path, sig.to_bytes()).map_err(|e| format!("Failed to write {sig_path:?}: {e}"))?;

    println!("Signed manifest: {manifest_path:?}");
    println!("Wrote signature: {sig_path:?}");
    println!(
        "VERIFYING_KEY_B64={}",
        general_purpose::STANDARD.encode(signing_key.verifying_key().to_bytes())
    );
    Ok(())
}

fn main() -> Result<(), String> {
    match parse_args()? {
        Command::GenerateKey => {
            generate_key();
            Ok(())
        }
        Command::Sign(dir) => sign(&dir),
    }
}
