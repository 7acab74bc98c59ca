//! Handoff token codes: `MS-RX-` followed by six characters a pharmacist
//! can read aloud or type from a printout.

use rand::Rng;

pub const CODE_PREFIX: &str = "MS-RX-";
pub const CODE_BODY_LEN: usize = 6;

/// No 0/O, 1/I/L.
pub const CODE_ALPHABET: &[u8] = b"23456789ABCDEFGHJKMNPQRSTUVWXYZ";

/// Draw a fresh code. Uniqueness is enforced by the store, not here.
pub fn generate_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    let body: String = (0..CODE_BODY_LEN)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect();
    format!("{CODE_PREFIX}{body}")
}

/// Canonical form of a user-supplied code: trimmed, uppercased.
pub fn normalize_code(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}

/// Whether `code` (already normalized) has the issued-token shape.
pub fn is_issued_code(code: &str) -> bool {
    match code.strip_prefix(CODE_PREFIX) {
        Some(body) => {
            body.len() == CODE_BODY_LEN && body.bytes().all(|b| CODE_ALPHABET.contains(&b))
        }
        None => false,
    }
}
