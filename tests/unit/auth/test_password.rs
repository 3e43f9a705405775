// Werkzeug-compatible password hashes

use mongo_admin::auth::password::{Password, PasswordHash};

#[test]
fn test_verifies_existing_werkzeug_hash() {
    let stored = PasswordHash::from_stored(
        "pbkdf2:sha256:1000$abcdefgh12345678$ff230943be408e59715ba0b36f988109dfd4ca63f15795889319022646a88364",
    );
    assert!(stored.verify(&Password::new("correct horse")));
    assert!(!stored.verify(&Password::new("correct horse ")));
}

#[test]
fn test_method_without_iterations_uses_legacy_default() {
    let stored = PasswordHash::from_stored(
        "pbkdf2:sha256$saltsalt$2ebb2aeb1a171b8ccbe05786ae92dc1ed934b72f7097a984faa9d120ad22deb5",
    );
    assert!(stored.verify(&Password::new("correct horse")));
}

#[test]
fn test_verifies_werkzeug_default_scrypt_hash() {
    let stored = PasswordHash::from_stored(
        "scrypt:32768:8:1$Wz3kQ8rLmP2vX9aB$0108fe84e21da6acb9835c4fdd8789b375bae3746b1bb355404b2d2e6ab287640fca177db89baabe343372c39382a0d1ca7b4fdf1141917b94acf11ad8c2e27b",
    );
    assert!(stored.verify(&Password::new("correct horse")));
    assert!(!stored.verify(&Password::new("correct horse ")));
}

#[test]
fn test_unsupported_hashes_never_verify() {
    for stored in [
        "",
        "plaintext",
        "scrypt:32768:8:1$Wz3kQ8rLmP2vX9aB$abcd",
        "argon2:19456$salt$abcd",
        "pbkdf2:sha256:0$salt$ff230943be408e59715ba0b36f988109dfd4ca63f15795889319022646a88364",
        "pbkdf2:sha256:1000$abcdefgh12345678$not-hex",
        "pbkdf2:sha256:1000$abcdefgh12345678$ff23",
    ] {
        assert!(
            !PasswordHash::from_stored(stored).verify(&Password::new("correct horse")),
            "{}",
            stored
        );
    }
}

#[test]
fn test_generated_hash_layout() {
    let hash = PasswordHash::generate(&Password::new("hunter22"), 1_000);
    let parts: Vec<&str> = hash.as_str().split('$').collect();
    assert_eq!(parts.len(), 3);
    assert_eq!(parts[0], "pbkdf2:sha256:1000");
    assert_eq!(parts[1].len(), 16);
    assert_eq!(parts[2].len(), 64);
}

#[test]
fn test_password_debug_is_redacted() {
    let rendered = format!("{:?}", Password::new("hunter22"));
    assert!(!rendered.contains("hunter22"));
    assert_eq!(Password::new("héllo").len(), 5);
}
