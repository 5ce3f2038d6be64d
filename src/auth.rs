use anyhow::anyhow;
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;

const PBKDF2_ITERATIONS: u32 = 200_000;
const SCHEME: &str = "pbkdf2-sha256";

/// Hash a password for storage. Format: `scheme$iterations$salt$hash` with
/// base64 salt and hash, so the iteration count can change without breaking
/// existing rows.
pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let mut salt = [0u8; 16];
    getrandom::getrandom(&mut salt).map_err(|e| anyhow!("salt generation failed: {}", e))?;
    let key = derive_key(password, &salt, PBKDF2_ITERATIONS);
    Ok(format!(
        "{}${}${}${}",
        SCHEME,
        PBKDF2_ITERATIONS,
        B64.encode(salt),
        B64.encode(key)
    ))
}

/// Check a password against a stored hash. Unparseable stored values never
/// verify.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let mut parts = stored.split('$');
    let (Some(scheme), Some(iters), Some(salt), Some(hash)) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    if scheme != SCHEME || parts.next().is_some() {
        return false;
    }
    let Ok(iterations) = iters.parse::<u32>() else {
        return false;
    };
    let (Ok(salt), Ok(expected)) = (B64.decode(salt), B64.decode(hash)) else {
        return false;
    };
    let key = derive_key(password, &salt, iterations.max(1));
    key.as_slice() == expected.as_slice()
}

fn derive_key(password: &str, salt: &[u8], iterations: u32) -> [u8; 32] {
    let mut key = [0u8; 32];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut key);
    key
}
