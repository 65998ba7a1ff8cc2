use serde::Deserialize;

/// How stored credentials are written and checked.
///
/// `Plaintext` compares the stored value with exact string equality, which is
/// what existing user records expect. `Bcrypt` stores a bcrypt hash instead.
/// Records written under one scheme do not verify under the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PasswordScheme {
    #[default]
    Plaintext,
    Bcrypt,
}

impl PasswordScheme {
    /// Produce the value to store for a new password.
    pub fn store(&self, password: &str) -> Result<String, bcrypt::BcryptError> {
        match self {
            PasswordScheme::Plaintext => Ok(password.to_string()),
            PasswordScheme::Bcrypt => bcrypt::hash(password, bcrypt::DEFAULT_COST),
        }
    }

    pub fn verify(&self, password: &str, stored: &str) -> bool {
        match self {
            PasswordScheme::Plaintext => password == stored,
            PasswordScheme::Bcrypt => bcrypt::verify(password, stored).unwrap_or(false),
        }
    }
}
