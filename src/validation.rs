//! User validation.
//!
//! Two layers: [`UserInput::into_new_user`] does required-field and
//! length checks on the raw body, [`UserValidator`] applies business
//! policy (age limits, name charset, email domain lists) and separates
//! blocking errors from advisory warnings.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::store::{NewUser, User};

const ALLOWED_EMAIL_DOMAINS: &[&str] = &[
    "gmail.com",
    "outlook.com",
    "yahoo.com",
    "hotmail.com",
    "icloud.com",
    "protonmail.com",
    "company.com",
];

const BLOCKED_EMAIL_DOMAINS: &[&str] = &[
    "tempmail.com",
    "10minutemail.com",
    "guerrillamail.com",
    "mailinator.com",
    "throwaway.email",
];

static NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z\s'-]{2,50}$").expect("valid name pattern"));
static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9+_.-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").expect("valid email pattern")
});

// ─── Request body ────────────────────────────────────────────────

/// Raw user body as posted by clients. Every field is optional so that
/// missing values surface as validation messages instead of a parse
/// failure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInput {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub age: Option<i32>,
}

impl UserInput {
    /// Field-level checks. Returns every message at once.
    pub fn into_new_user(self) -> Result<NewUser, Vec<String>> {
        let mut errors = Vec::new();

        let first_name = required_name(self.first_name, "First name", &mut errors);
        let last_name = required_name(self.last_name, "Last name", &mut errors);

        let email = match self.email.map(|e| e.trim().to_owned()) {
            None => {
                errors.push("Email is required".to_owned());
                None
            }
            Some(e) if e.is_empty() => {
                errors.push("Email is required".to_owned());
                None
            }
            Some(e) if !looks_like_email(&e) => {
                errors.push("Email must be valid".to_owned());
                None
            }
            Some(e) => Some(e),
        };

        match (first_name, last_name, email) {
            (Some(first_name), Some(last_name), Some(email)) if errors.is_empty() => Ok(NewUser {
                first_name,
                last_name,
                email,
                age: self.age,
            }),
            _ => Err(errors),
        }
    }
}

fn required_name(value: Option<String>, label: &str, errors: &mut Vec<String>) -> Option<String> {
    match value {
        Some(v) if !v.trim().is_empty() => {
            let len = v.chars().count();
            if (2..=50).contains(&len) {
                Some(v)
            } else {
                errors.push(format!("{label} must be between 2-50 characters"));
                None
            }
        }
        _ => {
            errors.push(format!("{label} is required"));
            None
        }
    }
}

/// Lenient shape check; the strict pattern lives in `UserValidator`.
fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    }
}

// ─── Policy validator ────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub meets_professional_standards: bool,
    pub email_domain_allowed: bool,
}

impl ValidationResult {
    pub fn summary(&self) -> String {
        format!(
            "Validation Result: {} (Errors: {}, Warnings: {})",
            if self.valid { "VALID" } else { "INVALID" },
            self.errors.len(),
            self.warnings.len()
        )
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UserValidator;

impl UserValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate_user(&self, user: &NewUser) -> ValidationResult {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        let mut meets_professional_standards = true;
        let mut email_domain_allowed = true;

        // ── Age ─────────────────────────────────────────────────
        if let Some(age) = user.age {
            if age < 13 {
                errors.push("Users must be at least 13 years old (COPPA compliance)".to_owned());
            }
            if age < 18 {
                warnings.push(
                    "User is a minor - additional parental consent may be required".to_owned(),
                );
            }
            if age > 150 {
                errors.push("Age cannot exceed 150 years".to_owned());
            }
            if age < 0 {
                errors.push("Age cannot be negative".to_owned());
            }
        }

        // ── Names ───────────────────────────────────────────────
        if !NAME_PATTERN.is_match(&user.first_name) {
            errors.push(
                "First name contains invalid characters. Only letters, spaces, hyphens, and apostrophes allowed"
                    .to_owned(),
            );
            meets_professional_standards = false;
        }
        if user.first_name == user.first_name.to_uppercase() {
            warnings.push(
                "Consider using proper case formatting (e.g., 'John' instead of 'JOHN')".to_owned(),
            );
            meets_professional_standards = false;
        }
        if user.first_name.chars().count() < 2 {
            errors.push("First name must be at least 2 characters long".to_owned());
        }

        if !NAME_PATTERN.is_match(&user.last_name) {
            errors.push(
                "Last name contains invalid characters. Only letters, spaces, hyphens, and apostrophes allowed"
                    .to_owned(),
            );
            meets_professional_standards = false;
        }
        if user.last_name.chars().count() < 2 {
            errors.push("Last name must be at least 2 characters long".to_owned());
        }

        // ── Email ───────────────────────────────────────────────
        if !EMAIL_PATTERN.is_match(&user.email) {
            errors.push("Invalid email format".to_owned());
        } else {
            let domain = email_domain(&user.email);
            let lookup = domain.to_lowercase();
            if BLOCKED_EMAIL_DOMAINS.contains(&lookup.as_str()) {
                errors.push(format!(
                    "Email domain '{domain}' is not allowed. Please use a permanent email address"
                ));
                email_domain_allowed = false;
            }
            if !ALLOWED_EMAIL_DOMAINS.contains(&lookup.as_str()) {
                warnings.push(format!(
                    "Email domain '{domain}' is not in our preferred list. Consider using a more common provider"
                ));
            }
        }

        // ── Cross-field ─────────────────────────────────────────
        if !user.first_name.is_empty() && user.first_name.eq_ignore_ascii_case(&user.last_name) {
            warnings.push("First name and last name are identical - verify data accuracy".to_owned());
        }

        ValidationResult {
            valid: errors.is_empty(),
            errors,
            warnings,
            meets_professional_standards,
            email_domain_allowed,
        }
    }

    /// Basic checks first; policy checks only once the body is complete.
    pub fn validate_input(&self, input: UserInput) -> ValidationResult {
        let email = input.email.clone();
        match input.into_new_user() {
            Ok(user) => self.validate_user(&user),
            Err(errors) => ValidationResult {
                valid: false,
                errors,
                warnings: Vec::new(),
                meets_professional_standards: false,
                email_domain_allowed: email.is_some_and(|e| self.is_email_domain_allowed(&e)),
            },
        }
    }

    /// Standard checks plus change detection against the stored user.
    pub fn validate_user_update(&self, current: &User, update: &NewUser) -> ValidationResult {
        let mut result = self.validate_user(update);

        if current.email != update.email {
            result
                .warnings
                .push("Email change detected - consider email verification".to_owned());
        }
        if let (Some(old), Some(new)) = (current.age, update.age) {
            let diff = (old - new).abs();
            if diff > 10 {
                result.warnings.push(format!(
                    "Large age change detected ({diff} years) - verify accuracy"
                ));
            }
        }
        if current.first_name != update.first_name || current.last_name != update.last_name {
            result.warnings.push(
                "Name change detected - consider requiring identity verification".to_owned(),
            );
        }

        result
    }

    /// Well-formed and not on the blocked list.
    pub fn is_email_domain_allowed(&self, email: &str) -> bool {
        if !EMAIL_PATTERN.is_match(email) {
            return false;
        }
        let domain = email_domain(email).to_lowercase();
        !BLOCKED_EMAIL_DOMAINS.contains(&domain.as_str())
    }
}

fn email_domain(email: &str) -> &str {
    match email.rfind('@') {
        Some(at) if at > 0 => &email[at + 1..],
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn new_user(first: &str, last: &str, email: &str, age: Option<i32>) -> NewUser {
        NewUser {
            first_name: first.into(),
            last_name: last.into(),
            email: email.into(),
            age,
        }
    }

    #[test]
    fn clean_user_passes_without_warnings() {
        let r = UserValidator::new().validate_user(&new_user("Jane", "Doe", "jane@gmail.com", Some(30)));
        assert!(r.valid, "{:?}", r.errors);
        assert!(r.warnings.is_empty(), "{:?}", r.warnings);
        assert!(r.meets_professional_standards);
        assert!(r.email_domain_allowed);
        assert_eq!(r.summary(), "Validation Result: VALID (Errors: 0, Warnings: 0)");
    }

    #[test]
    fn age_rules() {
        let v = UserValidator::new();

        let child = v.validate_user(&new_user("Tim", "Doe", "tim@gmail.com", Some(12)));
        assert!(!child.valid);
        assert!(child.errors[0].contains("COPPA"));
        assert!(child.warnings[0].starts_with("User is a minor"));

        let teen = v.validate_user(&new_user("Tim", "Doe", "tim@gmail.com", Some(16)));
        assert!(teen.valid);
        assert_eq!(teen.warnings.len(), 1);

        let ancient = v.validate_user(&new_user("Tim", "Doe", "tim@gmail.com", Some(151)));
        assert_eq!(ancient.errors, vec!["Age cannot exceed 150 years"]);

        let negative = v.validate_user(&new_user("Tim", "Doe", "tim@gmail.com", Some(-1)));
        assert!(negative.errors.contains(&"Age cannot be negative".to_string()));
    }

    #[test]
    fn name_rules() {
        let v = UserValidator::new();

        let digits = v.validate_user(&new_user("J0hn", "Doe", "j@gmail.com", None));
        assert!(!digits.valid);
        assert!(!digits.meets_professional_standards);

        let shouting = v.validate_user(&new_user("JOHN", "Doe", "j@gmail.com", None));
        assert!(shouting.valid);
        assert!(!shouting.meets_professional_standards);
        assert!(shouting.warnings[0].contains("proper case"));

        let twins = v.validate_user(&new_user("Sam", "sam", "s@gmail.com", None));
        assert!(twins.warnings.iter().any(|w| w.contains("identical")));
    }

    #[test]
    fn email_domain_policy() {
        let v = UserValidator::new();

        let blocked = v.validate_user(&new_user("Jane", "Doe", "jane@Mailinator.com", None));
        assert!(!blocked.valid);
        assert!(!blocked.email_domain_allowed);
        assert!(blocked.errors[0].contains("'Mailinator.com' is not allowed"));

        let unusual = v.validate_user(&new_user("Jane", "Doe", "jane@corp.io", None));
        assert!(unusual.valid);
        assert!(unusual.warnings[0].contains("not in our preferred list"));

        let mixed = v.validate_user(&new_user("Jane", "Doe", "jane@Corp.IO", None));
        assert!(mixed.valid);
        assert!(mixed.warnings[0].starts_with("Email domain 'Corp.IO' is not in"));

        let preferred = v.validate_user(&new_user("Jane", "Doe", "jane@GMail.com", None));
        assert!(preferred.warnings.is_empty(), "{:?}", preferred.warnings);

        let malformed = v.validate_user(&new_user("Jane", "Doe", "jane@nowhere", None));
        assert_eq!(malformed.errors, vec!["Invalid email format"]);

        assert!(v.is_email_domain_allowed("a@corp.io"));
        assert!(!v.is_email_domain_allowed("a@tempmail.com"));
        assert!(!v.is_email_domain_allowed("not-an-email"));
    }

    #[test]
    fn update_detects_changes() {
        let now = Utc::now();
        let current = User {
            id: 1,
            first_name: "Jane".into(),
            last_name: "Doe".into(),
            email: "jane@gmail.com".into(),
            age: Some(30),
            created_at: now,
            updated_at: now,
        };

        let r = UserValidator::new()
            .validate_user_update(&current, &new_user("Janet", "Doe", "janet@gmail.com", Some(45)));
        assert!(r.valid);
        assert_eq!(r.warnings.len(), 3);
        assert!(r.warnings[0].starts_with("Email change"));
        assert!(r.warnings[1].contains("(15 years)"));
        assert!(r.warnings[2].starts_with("Name change"));

        let same = UserValidator::new()
            .validate_user_update(&current, &new_user("Jane", "Doe", "jane@gmail.com", Some(31)));
        assert!(same.warnings.is_empty());
    }

    #[test]
    fn basic_checks_collect_every_problem() {
        let errors = UserInput::default().into_new_user().unwrap_err();
        assert_eq!(
            errors,
            vec!["First name is required", "Last name is required", "Email is required"]
        );

        let errors = UserInput {
            first_name: Some("J".into()),
            last_name: Some("Doe".into()),
            email: Some("nope".into()),
            age: None,
        }
        .into_new_user()
        .unwrap_err();
        assert_eq!(
            errors,
            vec!["First name must be between 2-50 characters", "Email must be valid"]
        );
    }

    #[test]
    fn incomplete_input_is_rejected_before_policy() {
        let v = UserValidator::new();
        let r = v.validate_input(UserInput {
            email: Some("jane@corp.io".into()),
            ..UserInput::default()
        });
        assert!(!r.valid);
        assert_eq!(r.errors, vec!["First name is required", "Last name is required"]);
        assert!(r.warnings.is_empty());
        assert!(r.email_domain_allowed);

        let r = v.validate_input(UserInput {
            first_name: Some("Jane".into()),
            last_name: Some("Doe".into()),
            email: Some("jane@gmail.com".into()),
            age: Some(15),
        });
        assert!(r.valid);
        assert_eq!(r.warnings.len(), 1);
    }

    #[test]
    fn basic_checks_pass_through_fields() {
        let user = UserInput {
            first_name: Some("Jane".into()),
            last_name: Some("Doe".into()),
            email: Some(" jane@gmail.com ".into()),
            age: Some(22),
        }
        .into_new_user()
        .unwrap();
        assert_eq!(user, new_user("Jane", "Doe", "jane@gmail.com", Some(22)));
    }
}
