use crate::error::{AuthError, AuthResult};

// 62^30 is about 178 bits. Assuming a million live keys leaves ~158 bits, i.e. a 79-bit
// security level against online guessing. Re-derive this before changing either constant.
pub const SESSION_KEY_LENGTH: usize = 30;

// No '=' or other characters that cookie parsers treat specially.
pub const SESSION_KEY_CORPUS: &[u8; 62] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

// Largest multiple of 62 that fits in a byte; bytes at or above it are redrawn.
const REJECT_FROM: u8 = 248;

/// Random session key of SESSION_KEY_LENGTH characters drawn uniformly from
/// SESSION_KEY_CORPUS using the OS CSPRNG.
pub fn generate_session_key() -> AuthResult<String> {
    let mut out = String::with_capacity(SESSION_KEY_LENGTH);
    let mut buf = [0u8; SESSION_KEY_LENGTH];
    while out.len() < SESSION_KEY_LENGTH {
        getrandom::getrandom(&mut buf)
            .map_err(|e| AuthError::connect(format!("random source unavailable: {}", e)))?;
        for b in buf.iter().copied().filter(|b| *b < REJECT_FROM) {
            if out.len() == SESSION_KEY_LENGTH { break; }
            out.push(SESSION_KEY_CORPUS[(b % 62) as usize] as char);
        }
    }
    Ok(out)
}
