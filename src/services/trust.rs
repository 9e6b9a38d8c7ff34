use crate::services::storage::keys_dir;
use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use std::path::{Path, PathBuf};

fn trusted_pubkeys_path() -> anyhow::Result<PathBuf> {
    Ok(keys_dir()?.join("trusted.txt"))
}

fn signing_key_path() -> anyhow::Result<PathBuf> {
    Ok(keys_dir()?.join("signing.key"))
}

pub fn list_pubkeys() -> anyhow::Result<Vec<String>> {
    let path = trusted_pubkeys_path()?;
    if !path.exists() {
        return Ok(vec![]);
    }
    Ok(std::fs::read_to_string(path)?
        .lines()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .collect())
}

pub fn trust_add(pubkey_hex: &str) -> anyhow::Result<bool> {
    let key = pubkey_hex.trim().to_ascii_lowercase();
    decode_verifying_key(&key)?;
    let path = trusted_pubkeys_path()?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut existing = if path.exists() {
        std::fs::read_to_string(&path)?
    } else {
        String::new()
    };
    if existing.lines().any(|l| l.trim() == key) {
        return Ok(false);
    }
    if !existing.is_empty() && !existing.ends_with('\n') {
        existing.push('\n');
    }
    existing.push_str(&key);
    existing.push('\n');
    std::fs::write(path, existing)?;
    Ok(true)
}

pub fn decode_verifying_key(hex_key: &str) -> anyhow::Result<VerifyingKey> {
    let bytes = hex::decode(hex_key.trim())?;
    let arr: [u8; 32] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| anyhow::anyhow!("public key must be 32 bytes, got {}", bytes.len()))?;
    Ok(VerifyingKey::from_bytes(&arr)?)
}

pub fn decode_signature(hex_sig: &str) -> anyhow::Result<Signature> {
    let bytes = hex::decode(hex_sig.trim())?;
    let arr: [u8; 64] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| anyhow::anyhow!("signature must be 64 bytes, got {}", bytes.len()))?;
    Ok(Signature::from_bytes(&arr))
}

/// Creates the signing key unless one exists; `force` rotates it. The new
/// public key is always added to the trusted list.
pub fn keys_init(force: bool) -> anyhow::Result<String> {
    let path = signing_key_path()?;
    if path.exists() && !force {
        let key = load_signing_key_from(&path)?;
        let public = hex::encode(key.verifying_key().to_bytes());
        trust_add(&public)?;
        return Ok(public);
    }
    let key = SigningKey::generate(&mut rand::rngs::OsRng);
    write_signing_key(&path, &key)?;
    let public = hex::encode(key.verifying_key().to_bytes());
    trust_add(&public)?;
    tracing::info!(public_key = %public, rotated = force, "signing key written");
    Ok(public)
}

fn write_signing_key(path: &Path, key: &SigningKey) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, format!("{}\n", hex::encode(key.to_bytes())))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    }
    Ok(())
}

fn load_signing_key_from(path: &Path) -> anyhow::Result<SigningKey> {
    let raw = std::fs::read_to_string(path)?;
    let bytes = hex::decode(raw.trim())?;
    let seed: [u8; 32] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| anyhow::anyhow!("signing key must be a 32-byte hex seed"))?;
    Ok(SigningKey::from_bytes(&seed))
}

pub fn load_signing_key() -> anyhow::Result<SigningKey> {
    let path = signing_key_path()?;
    if !path.exists() {
        anyhow::bail!("no signing key: run `feedgate keys init` first");
    }
    load_signing_key_from(&path)
}

pub fn public_key_hex() -> anyhow::Result<Option<String>> {
    let path = signing_key_path()?;
    if !path.exists() {
        return Ok(None);
    }
    let key = load_signing_key_from(&path)?;
    Ok(Some(hex::encode(key.verifying_key().to_bytes())))
}

pub fn sign_hex(key: &SigningKey, message: &[u8]) -> String {
    hex::encode(key.sign(message).to_bytes())
}

pub fn verify_hex(public_hex: &str, message: &[u8], signature_hex: &str) -> bool {
    let (key, sig) = match (decode_verifying_key(public_hex), decode_signature(signature_hex)) {
        (Ok(k), Ok(s)) => (k, s),
        _ => return false,
    };
    key.verify_strict(message, &sig).is_ok()
}

pub fn is_trusted(public_hex: &str) -> anyhow::Result<bool> {
    let wanted = public_hex.trim().to_ascii_lowercase();
    Ok(list_pubkeys()?.iter().any(|k| k.to_ascii_lowercase() == wanted))
}
