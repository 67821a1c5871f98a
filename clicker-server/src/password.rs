use {
    scrypt::{Params, scrypt},
    subtle::ConstantTimeEq,
};

const SCHEME: &str = "scrypt";
const SALT_LEN: usize = 16;
const KEY_LEN: usize = 32;
const BLOCK_SIZE: u32 = 8;
const PARALLELISM: u32 = 1;

/// Hashes `password` with a fresh random salt and scrypt cost `2^log_n`.
/// Output: `scrypt$<log_n>$<r>$<p>$<salt hex>$<key hex>`. `None` if the cost is out of range.
pub fn hash_password(password: &str, log_n: u8) -> Option<String> {
    let salt = rand::random::<[u8; SALT_LEN]>();
    let params = Params::new(log_n, BLOCK_SIZE, PARALLELISM, KEY_LEN).ok()?;
    let key = derive(password.as_bytes(), &salt, &params, KEY_LEN)?;
    Some(format!(
        "{SCHEME}${log_n}${BLOCK_SIZE}${PARALLELISM}${}${}",
        hex::encode(salt),
        hex::encode(key),
    ))
}

/// Malformed stored hashes never match.
pub fn verify_password(stored: &str, password: &str) -> bool {
    let parts: Vec<&str> = stored.split('$').collect();
    let [scheme, log_n, r, p, salt, expected] = parts[..] else {
        return false;
    };
    if scheme != SCHEME {
        return false;
    }
    let (Ok(log_n), Ok(r), Ok(p)) = (log_n.parse::<u8>(), r.parse::<u32>(), p.parse::<u32>()) else {
        return false;
    };
    let (Ok(salt), Ok(expected)) = (hex::decode(salt), hex::decode(expected)) else {
        return false;
    };
    let Ok(params) = Params::new(log_n, r, p, expected.len()) else {
        return false;
    };

    match derive(password.as_bytes(), &salt, &params, expected.len()) {
        Some(key) => key.ct_eq(&expected).into(),
        None => false,
    }
}

fn derive(password: &[u8], salt: &[u8], params: &Params, len: usize) -> Option<Vec<u8>> {
    let mut key = vec![0u8; len];
    scrypt(password, salt, params, &mut key).ok()?;
    Some(key)
}
