use bcrypt::{hash, verify};

/// Coût bcrypt des mots de passe administrateur
pub const HASH_COST: u32 = 10;

/// Hache un mot de passe en utilisant bcrypt
pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
    hash(password, HASH_COST)
}

/// Vérifie si un mot de passe correspond à un hachage
pub fn verify_password(password: &str, hashed_password: &str) -> bool {
    match verify(password, hashed_password) {
        Ok(is_valid) => is_valid,
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_never_equals_the_password_and_verifies() {
        let hashed = hash_password("admin123").unwrap();
        assert_ne!(hashed, "admin123");
        assert!(verify_password("admin123", &hashed));
        assert!(!verify_password("admin124", &hashed));
    }

    #[test]
    fn cleartext_stored_value_never_verifies() {
        assert!(!verify_password("admin123", "admin123"));
    }
}
