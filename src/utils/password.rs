use crate::error::{AppError, AppResult};
use bcrypt::{DEFAULT_COST, hash, verify};

/// Validate password strength: at least 8 characters and one special character
pub fn validate_password(password: &str) -> AppResult<()> {
    if password.len() < 8 || password.len() > 128 {
        return Err(AppError::ValidationError(
            "Password must be between 8 and 128 characters".to_string(),
        ));
    }

    let has_special = password
        .chars()
        .any(|c| "!@#$%^&*(),.?\":{}|<>".contains(c));

    if !has_special {
        return Err(AppError::ValidationError(
            "Password must contain at least one special character".to_string(),
        ));
    }

    Ok(())
}

/// Hash a password with bcrypt
pub fn hash_password(password: &str) -> AppResult<String> {
    hash(password, DEFAULT_COST)
        .map_err(|e| AppError::InternalError(format!("Password hashing failed: {e}")))
}

/// Check a plaintext password against a stored hash
pub fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    verify(password, hash)
        .map_err(|e| AppError::InternalError(format!("Password verification failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_password() {
        assert!(validate_password("secret!pw").is_ok());
        assert!(validate_password("p@ss").is_err()); // too short
        assert!(validate_password("longenoughpw").is_err()); // no special char
    }

    #[test]
    fn test_hash_and_verify_password() {
        let password = "campus#2024";
        let hashed = hash_password(password).unwrap();

        assert!(verify_password(password, &hashed).unwrap());
        assert!(!verify_password("wrong-password", &hashed).unwrap());
    }
}
