//! Password rule checklist shown next to the password fields.

use serde::Serialize;
use utoipa::ToSchema;

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// One flag per rule, `true` when the rule is met.
#[derive(ToSchema, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordChecklist {
    pub min_length: bool,
    pub has_uppercase: bool,
    pub has_lowercase: bool,
    pub has_digit: bool,
    pub has_special: bool,
    pub matches_confirmation: bool,
}

impl PasswordChecklist {
    #[must_use]
    pub fn evaluate(password: &str, confirmation: &str) -> Self {
        Self {
            min_length: password.chars().count() >= MIN_PASSWORD_LENGTH,
            has_uppercase: password.chars().any(char::is_uppercase),
            has_lowercase: password.chars().any(char::is_lowercase),
            has_digit: password.chars().any(|c| c.is_ascii_digit()),
            has_special: password
                .chars()
                .any(|c| !c.is_alphanumeric() && !c.is_whitespace()),
            matches_confirmation: !confirmation.is_empty() && password == confirmation,
        }
    }

    #[must_use]
    pub fn is_satisfied(&self) -> bool {
        self.min_length
            && self.has_uppercase
            && self.has_lowercase
            && self.has_digit
            && self.has_special
            && self.matches_confirmation
    }
}
