use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::auth::hash_password;
use crate::error::AppError;
use crate::models::{NewUser, User};
use crate::validation::FieldErrors;

pub const USERNAME_MIN_CHARS: usize = 4;
pub const USERNAME_MAX_CHARS: usize = 150;
const NAME_MAX_CHARS: usize = 150;

pub const PASSWORD_MISMATCH: &str = "Password and Confirm Password must be equal";
pub const EMAIL_IN_USE: &str = "User e-mail is already in use";
pub const WEAK_PASSWORD: &str = "Password must have at least one uppercase letter, \
     one lowercase letter and one number. The length should be at least 8 characters.";

lazy_static! {
    static ref USERNAME_RE: Regex = Regex::new(r"^[\w.@+-]+$").unwrap();
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
}

/// New-user submission. Missing fields deserialize as empty strings so they
/// surface as "required" errors instead of a rejected request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RegisterForm {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl RegisterForm {
    /// Run every field rule and the password confirmation check.
    ///
    /// Errors accumulate across fields; within one field a failed "required"
    /// check skips the remaining rules for that field. An empty result means
    /// the form is valid.
    pub async fn validate(&self, db: &SqlitePool) -> Result<FieldErrors, sqlx::Error> {
        let mut errors = FieldErrors::new();

        let username = self.username.trim();
        if username.is_empty() {
            errors.add("username", "This field must not be empty");
        } else {
            let chars = username.chars().count();
            if chars < USERNAME_MIN_CHARS {
                errors.add("username", "Username must have at least 4 characters");
            }
            if chars > USERNAME_MAX_CHARS {
                errors.add("username", "Username must have less than 150 characters");
            }
            if !is_valid_username(username) {
                errors.add(
                    "username",
                    "Enter a valid username. This value may contain only letters, \
                     numbers, and @/./+/-/_ characters.",
                );
            }
            if !errors.has("username") && User::username_exists(db, username).await? {
                errors.add("username", "A user with that username already exists.");
            }
        }

        check_name(&mut errors, "first_name", &self.first_name, "Write your first name");
        check_name(&mut errors, "last_name", &self.last_name, "Write your last name");

        let email = self.email.trim();
        if email.is_empty() {
            errors.add("email", "E-mail is required");
        } else if User::email_exists(db, email).await? {
            errors.add("email", EMAIL_IN_USE);
        } else if !EMAIL_RE.is_match(email) {
            errors.add("email", "Enter a valid email address.");
        }

        let password = self.password.trim();
        if password.is_empty() {
            errors.add("password", "Password must not be empty");
        } else if !is_strong_password(password) {
            errors.add("password", WEAK_PASSWORD);
        }

        let confirm_password = self.confirm_password.trim();
        if confirm_password.is_empty() {
            errors.add("confirm_password", "This field is required.");
        }

        // Only values that survived their own field rules take part.
        let cleaned_password = (!errors.has("password")).then_some(password);
        let cleaned_confirm = (!confirm_password.is_empty()).then_some(confirm_password);
        if cleaned_password != cleaned_confirm {
            errors.add("password", PASSWORD_MISMATCH);
            errors.add("confirm_password", PASSWORD_MISMATCH);
        }

        if !errors.is_empty() {
            tracing::debug!(fields = ?errors.fields().collect::<Vec<_>>(), "registration rejected");
        }
        Ok(errors)
    }

    /// Build the persistable user. Call only after [`RegisterForm::validate`]
    /// returned no errors; the password is hashed here.
    pub fn into_new_user(self) -> Result<NewUser, AppError> {
        Ok(NewUser {
            password_hash: hash_password(self.password.trim())?,
            username: self.username.trim().to_string(),
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: self.email.trim().to_string(),
        })
    }

    /// Rendering data for each input, in display order. Passwords are never echoed back.
    pub fn field_views(&self, errors: &FieldErrors) -> Vec<FieldView> {
        let field = |name: &'static str,
                     label: &'static str,
                     input_type: &'static str,
                     value: &str,
                     placeholder: &'static str,
                     help_text: &'static str| FieldView {
            name,
            label,
            input_type,
            value: value.to_string(),
            placeholder,
            help_text,
            errors: errors.get(name).to_vec(),
        };

        vec![
            field("first_name", "First name", "text", &self.first_name, "Ex.: John", ""),
            field("last_name", "Last name", "text", &self.last_name, "Ex.: Doe", ""),
            field(
                "username",
                "Username",
                "text",
                &self.username,
                "Your username",
                "Username must have letters, numbers or one of those @.+-_. \
                 The length should be between 4 and 150 characters.",
            ),
            field(
                "email",
                "E-mail",
                "email",
                &self.email,
                "Your e-mail",
                "The e-mail must be valid.",
            ),
            field(
                "password",
                "Password",
                "password",
                "",
                "Your password",
                "Password must have at least uppercase letter, one lowercase letter \
                 and one number. The length should be at least 8 characters.",
            ),
            field(
                "confirm_password",
                "Confirm password",
                "password",
                "",
                "Repeat your password",
                "",
            ),
        ]
    }
}

pub struct FieldView {
    pub name: &'static str,
    pub label: &'static str,
    pub input_type: &'static str,
    pub value: String,
    pub placeholder: &'static str,
    pub help_text: &'static str,
    pub errors: Vec<String>,
}

fn check_name(errors: &mut FieldErrors, field: &str, value: &str, required: &str) {
    let value = value.trim();
    if value.is_empty() {
        errors.add(field, required);
        return;
    }
    let chars = value.chars().count();
    if chars > NAME_MAX_CHARS {
        errors.add(
            field,
            format!("Ensure this value has at most {NAME_MAX_CHARS} characters (it has {chars})."),
        );
    }
}

/// Letters, digits and `@.+-_` only.
pub fn is_valid_username(username: &str) -> bool {
    USERNAME_RE.is_match(username)
}

/// At least 8 characters with an uppercase letter, a lowercase letter and a digit.
pub fn is_strong_password(password: &str) -> bool {
    password.chars().count() >= 8
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strong_password_requires_every_class_and_length() {
        assert!(is_strong_password("Abcdefg1"));
        assert!(is_strong_password("P4ssword with spaces"));
        assert!(!is_strong_password("Abcdef1"), "seven characters");
        assert!(!is_strong_password("abcdefg1"), "no uppercase");
        assert!(!is_strong_password("ABCDEFG1"), "no lowercase");
        assert!(!is_strong_password("Abcdefgh"), "no digit");
        assert!(!is_strong_password(""));
    }

    #[test]
    fn username_charset() {
        assert!(is_valid_username("valid_user1"));
        assert!(is_valid_username("john.doe+tag@mail-x"));
        assert!(is_valid_username("joão"));
        assert!(!is_valid_username("has space"));
        assert!(!is_valid_username("semi;colon"));
        assert!(!is_valid_username("slash/"));
    }

    #[test]
    fn field_views_never_echo_passwords() {
        let form = RegisterForm {
            username: "someone".into(),
            password: "Secret123".into(),
            confirm_password: "Secret123".into(),
            ..Default::default()
        };
        let mut errors = FieldErrors::new();
        errors.add("password", PASSWORD_MISMATCH);

        let views = form.field_views(&errors);
        let password = views.iter().find(|v| v.name == "password").unwrap();
        assert_eq!(password.value, "");
        assert_eq!(password.errors, vec![PASSWORD_MISMATCH.to_string()]);

        let username = views.iter().find(|v| v.name == "username").unwrap();
        assert_eq!(username.value, "someone");
        assert!(username.errors.is_empty());
    }
}
