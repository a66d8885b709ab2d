//! HTML form payloads and their validation
//!
//! Each form deserializes from an `application/x-www-form-urlencoded` body
//! and carries its own [`FormErrors`], so a failed submission can be
//! re-rendered with the user's input and the messages next to each field.

use serde::Deserialize;
use std::borrow::Cow;
use std::collections::BTreeMap;
use validator::{Validate, ValidationError, ValidationErrors};

const BLANK: &str = "This field cannot be blank";
const EXPIRY: &str = "This field must equal 1, 7 or 365";

/// Expiry choices offered on the create form, in days
pub const PERMITTED_EXPIRY: [i32; 3] = [1, 7, 365];

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank").with_message(Cow::Borrowed(BLANK)));
    }
    Ok(())
}

/// Validation messages keyed by form field name
///
/// Only the first message for a field is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors {
    fields: BTreeMap<String, String>,
    non_field: Vec<String>,
}

impl FormErrors {
    /// Collect the outcome of `Validate::validate`
    #[must_use]
    pub fn from_result(result: Result<(), ValidationErrors>) -> Self {
        let mut errors = Self::default();
        if let Err(validation) = result {
            for (field, failures) in validation.field_errors() {
                if let Some(failure) = failures.first() {
                    let message = failure
                        .message
                        .as_ref()
                        .map_or_else(|| failure.code.to_string(), ToString::to_string);
                    errors.add_field_error(&field.to_string(), &message);
                }
            }
        }
        errors
    }

    /// Whether no error was recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.non_field.is_empty()
    }

    /// Whether `field` has an error
    #[must_use]
    pub fn has(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Message for `field`, empty when valid
    #[must_use]
    pub fn field(&self, field: &str) -> &str {
        self.fields.get(field).map_or("", String::as_str)
    }

    /// Errors that belong to the form as a whole
    #[must_use]
    pub fn non_field(&self) -> &[String] {
        &self.non_field
    }

    /// Record an error unless `field` already has one
    pub fn add_field_error(&mut self, field: &str, message: &str) {
        self.fields
            .entry(field.to_string())
            .or_insert_with(|| message.to_string());
    }

    /// Record an error for the whole form
    pub fn add_non_field_error(&mut self, message: &str) {
        self.non_field.push(message.to_string());
    }

    /// Record `message` for `field` when `ok` is false
    pub fn check_field(&mut self, ok: bool, field: &str, message: &str) {
        if !ok {
            self.add_field_error(field, message);
        }
    }
}

/// New snippet
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SnippetCreateForm {
    /// Title, at most 100 characters
    #[serde(default)]
    #[validate(
        custom(function = "not_blank"),
        length(max = 100, message = "This field cannot be more than 100 characters long")
    )]
    pub title: String,
    /// Body text
    #[serde(default)]
    #[validate(custom(function = "not_blank"))]
    pub content: String,
    /// Days until expiry
    #[serde(default)]
    pub expires: i32,
    /// Validation outcome
    #[serde(skip)]
    pub errors: FormErrors,
}

impl Default for SnippetCreateForm {
    fn default() -> Self {
        Self {
            title: String::new(),
            content: String::new(),
            expires: 365,
            errors: FormErrors::default(),
        }
    }
}

impl SnippetCreateForm {
    /// Validate, keeping the errors on the form; true when valid
    pub fn check(&mut self) -> bool {
        self.errors = FormErrors::from_result(self.validate());
        self.errors
            .check_field(PERMITTED_EXPIRY.contains(&self.expires), "expires", EXPIRY);
        self.errors.is_empty()
    }
}

/// Account registration
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UserSignupForm {
    /// Display name
    #[serde(default)]
    #[validate(custom(function = "not_blank"))]
    pub name: String,
    /// Email address
    #[serde(default)]
    #[validate(
        custom(function = "not_blank"),
        email(message = "This field must be a valid email address")
    )]
    pub email: String,
    /// Password, at least 8 characters
    #[serde(default)]
    #[validate(
        custom(function = "not_blank"),
        length(min = 8, message = "This field must be at least 8 characters long")
    )]
    pub password: String,
    /// Validation outcome
    #[serde(skip)]
    pub errors: FormErrors,
}

impl UserSignupForm {
    /// Validate, keeping the errors on the form; true when valid
    pub fn check(&mut self) -> bool {
        self.errors = FormErrors::from_result(self.validate());
        self.errors.is_empty()
    }
}

/// Login
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UserLoginForm {
    /// Email address
    #[serde(default)]
    #[validate(
        custom(function = "not_blank"),
        email(message = "This field must be a valid email address")
    )]
    pub email: String,
    /// Password
    #[serde(default)]
    #[validate(custom(function = "not_blank"))]
    pub password: String,
    /// Validation outcome
    #[serde(skip)]
    pub errors: FormErrors,
}

impl UserLoginForm {
    /// Validate, keeping the errors on the form; true when valid
    pub fn check(&mut self) -> bool {
        self.errors = FormErrors::from_result(self.validate());
        self.errors.is_empty()
    }
}

/// Password change
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct AccountPasswordUpdateForm {
    /// Password currently on record
    #[serde(default)]
    #[validate(custom(function = "not_blank"))]
    pub current_password: String,
    /// Replacement, at least 8 characters
    #[serde(default)]
    #[validate(
        custom(function = "not_blank"),
        length(min = 8, message = "This field must be at least 8 characters long")
    )]
    pub new_password: String,
    /// Must repeat `new_password`
    #[serde(default)]
    #[validate(custom(function = "not_blank"))]
    pub new_password_confirmation: String,
    /// Validation outcome
    #[serde(skip)]
    pub errors: FormErrors,
}

impl AccountPasswordUpdateForm {
    /// Validate, keeping the errors on the form; true when valid
    pub fn check(&mut self) -> bool {
        self.errors = FormErrors::from_result(self.validate());
        self.errors.check_field(
            self.new_password == self.new_password_confirmation,
            "new_password_confirmation",
            "Passwords do not match",
        );
        self.errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snippet_form_defaults_to_a_year() {
        assert_eq!(SnippetCreateForm::default().expires, 365);
    }

    #[test]
    fn test_snippet_form_blank_title() {
        let mut form = SnippetCreateForm {
            title: "   ".to_string(),
            content: "content".to_string(),
            expires: 7,
            ..Default::default()
        };
        assert!(!form.check());
        assert_eq!(form.errors.field("title"), BLANK);
        assert!(!form.errors.has("content"));
    }

    #[test]
    fn test_snippet_form_title_too_long() {
        let mut form = SnippetCreateForm {
            title: "a".repeat(101),
            content: "content".to_string(),
            expires: 1,
            ..Default::default()
        };
        assert!(!form.check());
        assert_eq!(
            form.errors.field("title"),
            "This field cannot be more than 100 characters long"
        );
    }

    #[test]
    fn test_snippet_form_title_counts_characters() {
        let mut form = SnippetCreateForm {
            title: "é".repeat(100),
            content: "content".to_string(),
            expires: 365,
            ..Default::default()
        };
        assert!(form.check());
    }

    #[test]
    fn test_snippet_form_rejects_other_expiry() {
        let mut form = SnippetCreateForm {
            title: "title".to_string(),
            content: "content".to_string(),
            expires: 30,
            ..Default::default()
        };
        assert!(!form.check());
        assert_eq!(form.errors.field("expires"), EXPIRY);
    }

    #[test]
    fn test_signup_form_messages() {
        let mut form = UserSignupForm {
            name: String::new(),
            email: "not-an-email".to_string(),
            password: "short".to_string(),
            ..Default::default()
        };
        assert!(!form.check());
        assert_eq!(form.errors.field("name"), BLANK);
        assert_eq!(
            form.errors.field("email"),
            "This field must be a valid email address"
        );
        assert_eq!(
            form.errors.field("password"),
            "This field must be at least 8 characters long"
        );
    }

    #[test]
    fn test_login_form_valid() {
        let mut form = UserLoginForm {
            email: "alice@example.com".to_string(),
            password: "x".to_string(),
            ..Default::default()
        };
        assert!(form.check());
    }

    #[test]
    fn test_password_form_mismatch() {
        let mut form = AccountPasswordUpdateForm {
            current_password: "old-password".to_string(),
            new_password: "new-password".to_string(),
            new_password_confirmation: "other-password".to_string(),
            ..Default::default()
        };
        assert!(!form.check());
        assert_eq!(
            form.errors.field("new_password_confirmation"),
            "Passwords do not match"
        );
    }

    #[test]
    fn test_first_field_error_wins() {
        let mut errors = FormErrors::default();
        errors.add_field_error("email", "first");
        errors.add_field_error("email", "second");
        assert_eq!(errors.field("email"), "first");
        assert_eq!(errors.field("missing"), "");
    }

    #[test]
    fn test_non_field_errors() {
        let mut errors = FormErrors::default();
        assert!(errors.is_empty());
        errors.add_non_field_error("Email or password is incorrect");
        assert!(!errors.is_empty());
        assert_eq!(errors.non_field(), ["Email or password is incorrect"]);
    }

    #[test]
    fn test_deserialize_missing_fields() {
        let form: SnippetCreateForm = serde_json::from_str("{}").unwrap();
        assert_eq!(form.expires, 0);
        assert!(form.title.is_empty());
    }
}
