//! Request validation
//!
//! Validators collect every violated rule instead of stopping at the first one,
//! so clients receive the full list of problems in a single response.

/// Minimum password length accepted at registration
pub const PASSWORD_MIN_LENGTH: usize = 4;

/// Maximum password length accepted at registration
pub const PASSWORD_MAX_LENGTH: usize = 20;

/// Types that can check their own fields
pub trait Validate {
    /// Returns every validation message, or `Ok(())` when the value is acceptable
    fn validate(&self) -> Result<(), Vec<String>>;
}

/// Accumulates validation messages
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<String>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Field must be present and not blank
    pub fn required(&mut self, field: &str, value: &str) -> bool {
        if value.trim().is_empty() {
            self.errors.push(format!("The {} field is required.", field));
            return false;
        }
        true
    }

    /// Field must be present and a plausible email address
    pub fn email(&mut self, field: &str, value: &str) {
        if self.required(field, value) && !is_valid_email(value) {
            self.errors
                .push(format!("The {} field is not a valid e-mail address.", field));
        }
    }

    /// Field must be present and its length within `[min, max]` characters
    pub fn length_between(&mut self, field: &str, value: &str, min: usize, max: usize) {
        if !self.required(field, value) {
            return;
        }
        let len = value.chars().count();
        if len < min || len > max {
            self.errors.push(format!(
                "{} must be between {} and {} characters",
                field, min, max
            ));
        }
    }

    pub fn finish(self) -> Result<(), Vec<String>> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}

/// Check email structure: one `@`, non-empty local part and domain, no whitespace
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }

    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return false;
    }

    // Domain labels may not be empty ("a@.com", "a@b..c", "a@b.")
    !domain.split('.').any(str::is_empty)
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================================================
    // Email Tests
    // ========================================================================

    #[test]
    fn test_valid_emails() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("user.name@example.com"));
        assert!(is_valid_email("user+tag@example.co.uk"));
        assert!(is_valid_email("admin@localhost"));
    }

    #[test]
    fn test_invalid_emails() {
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("invalid"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("user@"));
        assert!(!is_valid_email("user@@example.com"));
        assert!(!is_valid_email("user@.com"));
        assert!(!is_valid_email("user@example."));
        assert!(!is_valid_email("us er@example.com"));
    }

    // ========================================================================
    // Validator Tests
    // ========================================================================

    #[test]
    fn test_validator_passes() {
        let mut v = Validator::new();
        v.email("Email", "u@example.com");
        v.length_between("Password", "pw1234", PASSWORD_MIN_LENGTH, PASSWORD_MAX_LENGTH);
        v.required("FirstName", "Ada");

        assert!(v.finish().is_ok());
    }

    #[test]
    fn test_validator_collects_all_messages() {
        let mut v = Validator::new();
        v.email("Email", "not-an-email");
        v.length_between("Password", "abc", PASSWORD_MIN_LENGTH, PASSWORD_MAX_LENGTH);
        v.required("FirstName", "   ");
        v.required("LastName", "");

        let errors = v.finish().unwrap_err();
        assert_eq!(
            errors,
            vec![
                "The Email field is not a valid e-mail address.",
                "Password must be between 4 and 20 characters",
                "The FirstName field is required.",
                "The LastName field is required.",
            ]
        );
    }

    #[test]
    fn test_missing_email_reports_required_only() {
        let mut v = Validator::new();
        v.email("Email", "");

        assert_eq!(v.finish().unwrap_err(), vec!["The Email field is required."]);
    }

    #[test]
    fn test_password_length_bounds() {
        let check = |pw: &str| {
            let mut v = Validator::new();
            v.length_between("Password", pw, PASSWORD_MIN_LENGTH, PASSWORD_MAX_LENGTH);
            v.finish().is_ok()
        };

        assert!(check("abcd"));
        assert!(check(&"a".repeat(20)));
        assert!(!check("abc"));
        assert!(!check(&"a".repeat(21)));
        // Counted in characters, not bytes
        assert!(check("пароль"));
    }
}
