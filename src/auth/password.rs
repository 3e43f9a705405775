// Salted password hashing and verification

use pbkdf2::pbkdf2_hmac;
use rand::distributions::{Alphanumeric, DistString};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use std::fmt;
use subtle::ConstantTimeEq;

pub const DEFAULT_ITERATIONS: u32 = 600_000;
const SALT_LEN: usize = 16;
const DIGEST_LEN: usize = 32;
const LEGACY_ITERATIONS: u32 = 260_000;

// Werkzeug's scrypt defaults: N=2^15, r=8, p=1, 64-byte key
const SCRYPT_N: u64 = 32_768;
const SCRYPT_R: u32 = 8;
const SCRYPT_P: u32 = 1;
const SCRYPT_LEN: usize = 64;

/// Stored password hash in Werkzeug's `<method>$<salt>$<hex digest>` layout
///
/// New hashes use `pbkdf2:sha256:<iterations>`; `scrypt:<N>:<r>:<p>` hashes
/// from existing accounts are accepted for verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Hash `password` with a fresh random salt
    pub fn generate(password: &Password, iterations: u32) -> Self {
        let salt = Alphanumeric.sample_string(&mut rand::thread_rng(), SALT_LEN);
        let digest = derive(password.expose_secret(), &salt, iterations);
        Self(format!("pbkdf2:sha256:{}${}${}", iterations, salt, hex::encode(digest)))
    }

    /// Wrap a hash string read from storage
    pub fn from_stored(stored: &str) -> Self {
        Self(stored.to_string())
    }

    /// Constant-time check of `password` against this hash.
    ///
    /// Both `pbkdf2:sha256` and `scrypt` (Werkzeug 3's default) hashes
    /// verify. Unknown methods or malformed hashes never verify.
    pub fn verify(&self, password: &Password) -> bool {
        let Some((method, rest)) = self.0.split_once('$') else {
            return false;
        };
        let Some((salt, expected_hex)) = rest.split_once('$') else {
            return false;
        };
        let Some(method) = Method::parse(method) else {
            return false;
        };
        let Ok(expected) = hex::decode(expected_hex) else {
            return false;
        };

        match method.derive(password.expose_secret(), salt) {
            Some(actual) if actual.len() == expected.len() => actual[..].ct_eq(&expected[..]).into(),
            _ => false,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PasswordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Plaintext password held only for the duration of a request
pub struct Password(SecretString);

impl Password {
    pub fn new(password: &str) -> Self {
        Self(SecretString::new(password.to_string()))
    }

    pub fn expose_secret(&self) -> &str {
        self.0.expose_secret()
    }

    pub fn len(&self) -> usize {
        self.0.expose_secret().chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.0.expose_secret().is_empty()
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Password")
            .field("value", &"<REDACTED>")
            .finish()
    }
}

/// Key derivation named by the first `$`-separated field of a stored hash
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Method {
    Pbkdf2Sha256 { iterations: u32 },
    Scrypt { log_n: u8, r: u32, p: u32 },
}

impl Method {
    /// `pbkdf2:sha256[:iterations]` or `scrypt[:N:r:p]`, with Werkzeug's
    /// defaults when the parameters are left out
    fn parse(method: &str) -> Option<Self> {
        let mut parts = method.split(':');
        match parts.next()? {
            "pbkdf2" => {
                if parts.next()? != "sha256" {
                    return None;
                }
                let iterations = match parts.next() {
                    None => LEGACY_ITERATIONS,
                    Some(n) => n.parse::<u32>().ok().filter(|n| *n > 0)?,
                };
                parts.next().is_none().then_some(Method::Pbkdf2Sha256 { iterations })
            }
            "scrypt" => {
                let params: Vec<&str> = parts.collect();
                let (n, r, p) = match params.as_slice() {
                    [] => (SCRYPT_N, SCRYPT_R, SCRYPT_P),
                    [n, r, p] => (n.parse::<u64>().ok()?, r.parse::<u32>().ok()?, p.parse::<u32>().ok()?),
                    _ => return None,
                };
                if n < 2 || !n.is_power_of_two() {
                    return None;
                }
                Some(Method::Scrypt {
                    log_n: n.trailing_zeros() as u8,
                    r,
                    p,
                })
            }
            _ => None,
        }
    }

    fn derive(&self, password: &str, salt: &str) -> Option<Vec<u8>> {
        match *self {
            Method::Pbkdf2Sha256 { iterations } => Some(derive(password, salt, iterations).to_vec()),
            Method::Scrypt { log_n, r, p } => {
                let params = scrypt::Params::new(log_n, r, p, SCRYPT_LEN).ok()?;
                let mut out = vec![0u8; SCRYPT_LEN];
                scrypt::scrypt(password.as_bytes(), salt.as_bytes(), &params, &mut out).ok()?;
                Some(out)
            }
        }
    }
}

fn derive(password: &str, salt: &str, iterations: u32) -> [u8; DIGEST_LEN] {
    let mut out = [0u8; DIGEST_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt.as_bytes(), iterations, &mut out);
    out
}
