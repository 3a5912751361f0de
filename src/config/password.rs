//! # SQL Admin Password
//!
//! The administrative credential is accepted once, from the first of:
//! positional argument, `SQL_ADMIN_PASSWORD`, interactive no-echo prompt.
//! It is wiped from memory on drop and never rendered by `Debug`/`Display`.

use crate::config::environment::ConfigSource;
use crate::constants::SQL_ADMIN_PASSWORD_ENV;
use crate::error::ConfigError;
use std::fmt;
use zeroize::Zeroizing;

const FIELD: &str = "SQL_ADMIN_PASSWORD";

/// Where the password was taken from (safe to log)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordSource {
    Argument,
    Environment,
    Prompt,
}

impl fmt::Display for PasswordSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Argument => write!(f, "command line argument"),
            Self::Environment => write!(f, "{SQL_ADMIN_PASSWORD_ENV}"),
            Self::Prompt => write!(f, "interactive prompt"),
        }
    }
}

#[derive(Clone)]
pub struct AdminPassword(Zeroizing<String>);

impl fmt::Debug for AdminPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AdminPassword(***)")
    }
}

impl fmt::Display for AdminPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

impl AdminPassword {
    /// Validate Azure SQL complexity rules
    ///
    /// At least 8 and at most 128 characters, three of the four classes
    /// {upper, lower, digit, symbol}, and must not contain the login name.
    ///
    /// # Errors
    /// Returns a `ConfigError` describing the rule that failed (never the value)
    pub fn new(value: impl Into<String>, login: &str) -> Result<Self, ConfigError> {
        let value = Zeroizing::new(value.into());
        let length = value.chars().count();

        if !(8..=128).contains(&length) {
            return Err(ConfigError::single(
                FIELD,
                "must be between 8 and 128 characters",
            ));
        }

        let classes = [
            value.chars().any(char::is_uppercase),
            value.chars().any(char::is_lowercase),
            value.chars().any(|c| c.is_ascii_digit()),
            value.chars().any(|c| !c.is_alphanumeric()),
        ]
        .into_iter()
        .filter(|present| *present)
        .count();
        if classes < 3 {
            return Err(ConfigError::single(
                FIELD,
                "must contain three of: uppercase, lowercase, digit, symbol",
            ));
        }

        if !login.is_empty() && value.to_lowercase().contains(&login.to_lowercase()) {
            return Err(ConfigError::single(
                FIELD,
                "must not contain the admin login name",
            ));
        }

        Ok(Self(value))
    }

    /// Resolve by precedence: argument, environment, prompt
    ///
    /// The prompt is only invoked when neither of the others is set.
    ///
    /// # Errors
    /// Returns a `ConfigError` if the password is missing, unreadable or too weak
    pub fn resolve<F>(
        argument: Option<String>,
        source: &ConfigSource,
        login: &str,
        prompt: F,
    ) -> Result<(Self, PasswordSource), ConfigError>
    where
        F: FnOnce() -> std::io::Result<String>,
    {
        let (raw, from) = if let Some(arg) = argument.filter(|a| !a.is_empty()) {
            (Zeroizing::new(arg), PasswordSource::Argument)
        } else if let Some(env) = source.get(SQL_ADMIN_PASSWORD_ENV) {
            (Zeroizing::new(env.to_string()), PasswordSource::Environment)
        } else {
            let entered = prompt().map_err(|e| {
                ConfigError::single(
                    FIELD,
                    format!(
                        "not provided and the prompt failed ({e}); pass it as an argument or set {SQL_ADMIN_PASSWORD_ENV}"
                    ),
                )
            })?;
            (Zeroizing::new(entered), PasswordSource::Prompt)
        };

        Ok((Self::new(raw.as_str(), login)?, from))
    }

    /// The secret itself; only for request payloads and the credential store
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

/// Interactive no-echo prompt on the controlling terminal
///
/// # Errors
/// Returns the underlying I/O error when no terminal is available
pub fn prompt_terminal() -> std::io::Result<String> {
    rpassword::prompt_password("SQL admin password: ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn never_prompt() -> std::io::Result<String> {
        panic!("prompt must not be used")
    }

    #[test]
    fn test_complexity_rules() {
        assert!(AdminPassword::new("Str0ngPass", "sqladmin").is_ok());
        assert!(AdminPassword::new("lower-and-1", "sqladmin").is_ok());
        assert!(AdminPassword::new("Sh0rt!", "sqladmin").is_err());
        assert!(AdminPassword::new("alllowercase", "sqladmin").is_err());
        assert!(AdminPassword::new("Sqladmin-123", "sqladmin").is_err());
    }

    #[test]
    fn test_argument_wins_over_environment() {
        let source = ConfigSource::from_pairs([(SQL_ADMIN_PASSWORD_ENV, "EnvPass-123")]);
        let (password, from) =
            AdminPassword::resolve(Some("ArgPass-123".into()), &source, "sqladmin", never_prompt)
                .unwrap();
        assert_eq!(password.expose(), "ArgPass-123");
        assert_eq!(from, PasswordSource::Argument);
    }

    #[test]
    fn test_environment_wins_over_prompt() {
        let source = ConfigSource::from_pairs([(SQL_ADMIN_PASSWORD_ENV, "EnvPass-123")]);
        let (password, from) =
            AdminPassword::resolve(None, &source, "sqladmin", never_prompt).unwrap();
        assert_eq!(password.expose(), "EnvPass-123");
        assert_eq!(from, PasswordSource::Environment);
    }

    #[test]
    fn test_prompt_is_last_resort() {
        let (password, from) = AdminPassword::resolve(
            None,
            &ConfigSource::default(),
            "sqladmin",
            || Ok("Prompted-123".to_string()),
        )
        .unwrap();
        assert_eq!(password.expose(), "Prompted-123");
        assert_eq!(from, PasswordSource::Prompt);

        let err = AdminPassword::resolve(None, &ConfigSource::default(), "sqladmin", || {
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "no tty"))
        })
        .unwrap_err();
        assert!(err.has_field(FIELD));
    }

    #[test]
    fn test_never_rendered() {
        let password = AdminPassword::new("Sup3r-Secret", "sqladmin").unwrap();
        assert_eq!(password.to_string(), "***");
        assert!(!format!("{password:?}").contains("Sup3r"));

        let err = AdminPassword::new("sup3r-secret-sqladmin", "sqladmin").unwrap_err();
        assert!(!err.to_string().contains("sup3r"));
    }
}
