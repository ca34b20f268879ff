//! Field validation for lead submissions.
//!
//! Every rule runs on every submission; failures accumulate so the form can
//! highlight all problem fields at once.

use std::sync::LazyLock;

use regex::Regex;

use crate::pipeline::types::{
    BusinessStage, DEFAULT_REQUEST_TYPE, FieldErrors, LeadSubmission, UtmParams, present,
};

pub const NAME_MIN_CHARS: usize = 2;
pub const NAME_MAX_CHARS: usize = 80;
pub const GOAL_MIN_CHARS: usize = 15;
pub const PHONE_MIN_CHARS: usize = 7;
pub const PHONE_MAX_CHARS: usize = 15;

static EMAIL_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

/// A submission that passed every rule, with the stage parsed and defaults applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedLead {
    pub full_name: String,
    pub work_email: String,
    pub phone_whatsapp: Option<String>,
    pub company_name: String,
    pub current_stage: BusinessStage,
    pub primary_goal: String,
    pub deck_or_website: Option<String>,
    pub request_type: String,
    pub source_page: Option<String>,
    pub utm: UtmParams,
}

/// Validate a submission, returning every failing field on error.
pub fn validate(sub: &LeadSubmission) -> Result<ValidatedLead, FieldErrors> {
    let mut errors = FieldErrors::new();

    let full_name = sub.full_name.as_deref().unwrap_or_default();
    let name_len = full_name.chars().count();
    if !(NAME_MIN_CHARS..=NAME_MAX_CHARS).contains(&name_len) {
        errors.insert(
            "full_name".into(),
            "Name must be between 2 and 80 characters.".into(),
        );
    }

    let work_email = sub.work_email.as_deref().unwrap_or_default();
    if !is_valid_email(work_email) {
        errors.insert(
            "work_email".into(),
            "Please enter a valid work email.".into(),
        );
    }

    let company_name = sub.company_name.as_deref().unwrap_or_default();
    if company_name.trim().is_empty() {
        errors.insert("company_name".into(), "Company name is required.".into());
    }

    let current_stage = sub
        .current_stage
        .as_deref()
        .and_then(|s| s.parse::<BusinessStage>().ok());
    if current_stage.is_none() {
        errors.insert(
            "current_stage".into(),
            "Please select a valid stage.".into(),
        );
    }

    let primary_goal = sub.primary_goal.as_deref().unwrap_or_default();
    if primary_goal.chars().count() < GOAL_MIN_CHARS {
        errors.insert(
            "primary_goal".into(),
            "Please provide more detail about your goal (min 15 chars).".into(),
        );
    }

    let phone_whatsapp = present(&sub.phone_whatsapp);
    if let Some(phone) = &phone_whatsapp
        && !is_valid_phone(phone)
    {
        errors.insert(
            "phone_whatsapp".into(),
            "Phone must be between 7-15 digits.".into(),
        );
    }

    let deck_or_website = present(&sub.deck_or_website);
    if let Some(link) = &deck_or_website
        && !is_valid_url(link)
    {
        errors.insert(
            "deck_or_website".into(),
            "Please provide a valid URL (https://...).".into(),
        );
    }

    let Some(current_stage) = current_stage else {
        return Err(errors);
    };
    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(ValidatedLead {
        full_name: full_name.to_string(),
        work_email: work_email.to_string(),
        phone_whatsapp,
        company_name: company_name.to_string(),
        current_stage,
        primary_goal: primary_goal.to_string(),
        deck_or_website,
        request_type: present(&sub.request_type)
            .unwrap_or_else(|| DEFAULT_REQUEST_TYPE.to_string()),
        source_page: present(&sub.source_page),
        utm: sub.attribution(),
    })
}

/// Basic `local@domain.tld` shape check.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_SHAPE.is_match(email)
}

/// Phone numbers are judged on their digits-and-plus form.
pub fn is_valid_phone(phone: &str) -> bool {
    let cleaned = phone
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '+')
        .count();
    (PHONE_MIN_CHARS..=PHONE_MAX_CHARS).contains(&cleaned)
}

/// Absolute `http`/`https` URL.
pub fn is_valid_url(link: &str) -> bool {
    url::Url::parse(link).is_ok_and(|u| matches!(u.scheme(), "http" | "https"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn base() -> Value {
        json!({
            "full_name": "Jo",
            "work_email": "jo@x.com",
            "company_name": "Acme",
            "current_stage": "Seed",
            "primary_goal": "need funding fast",
        })
    }

    fn with(field: &str, value: Value) -> LeadSubmission {
        let mut body = base();
        body[field] = value;
        serde_json::from_value(body).unwrap()
    }

    fn errors_for(sub: &LeadSubmission) -> FieldErrors {
        validate(sub).expect_err("submission should be rejected")
    }

    #[test]
    fn minimal_valid_submission() {
        let sub: LeadSubmission = serde_json::from_value(base()).unwrap();
        let lead = validate(&sub).unwrap();
        assert_eq!(lead.full_name, "Jo");
        assert_eq!(lead.current_stage, BusinessStage::Seed);
        assert_eq!(lead.request_type, DEFAULT_REQUEST_TYPE);
        assert!(lead.phone_whatsapp.is_none());
        assert!(lead.deck_or_website.is_none());
    }

    #[test]
    fn empty_submission_reports_every_required_field() {
        let errors = errors_for(&LeadSubmission::default());
        let fields: Vec<&str> = errors.keys().map(String::as_str).collect();
        assert_eq!(
            fields,
            vec![
                "company_name",
                "current_stage",
                "full_name",
                "primary_goal",
                "work_email"
            ]
        );
    }

    #[test]
    fn full_name_boundaries() {
        assert!(validate(&with("full_name", json!("ab"))).is_ok());
        assert!(validate(&with("full_name", json!("a".repeat(80)))).is_ok());
        assert!(errors_for(&with("full_name", json!("a"))).contains_key("full_name"));
        assert!(errors_for(&with("full_name", json!("a".repeat(81)))).contains_key("full_name"));
    }

    #[test]
    fn full_name_counts_characters_not_bytes() {
        let name = "é".repeat(80);
        assert!(validate(&with("full_name", json!(name))).is_ok());
    }

    #[test]
    fn primary_goal_boundaries() {
        assert!(validate(&with("primary_goal", json!("x".repeat(15)))).is_ok());
        assert!(errors_for(&with("primary_goal", json!("x".repeat(14)))).contains_key("primary_goal"));
    }

    #[test]
    fn email_shapes() {
        assert!(is_valid_email("jo@x.com"));
        assert!(is_valid_email("first.last+tag@sub.example.co"));
        assert!(!is_valid_email("jo@x"));
        assert!(!is_valid_email("jo x@x.com"));
        assert!(!is_valid_email("@x.com"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn blank_company_name_rejected() {
        assert!(errors_for(&with("company_name", json!("   "))).contains_key("company_name"));
    }

    #[test]
    fn unknown_stage_rejected() {
        assert!(errors_for(&with("current_stage", json!("Series B"))).contains_key("current_stage"));
    }

    #[test]
    fn short_phone_rejected() {
        let errors = errors_for(&with("phone_whatsapp", json!("123")));
        assert_eq!(errors.len(), 1);
        assert!(errors.contains_key("phone_whatsapp"));
    }

    #[test]
    fn phone_formatting_is_ignored() {
        assert!(is_valid_phone("+971 (50) 123-4567"));
        assert!(is_valid_phone("1234567"));
        assert!(!is_valid_phone("+1 234 567 890 123 45"));
        let lead = validate(&with("phone_whatsapp", json!("+61 400 000 000"))).unwrap();
        assert_eq!(lead.phone_whatsapp.as_deref(), Some("+61 400 000 000"));
    }

    #[test]
    fn empty_phone_treated_as_absent() {
        let lead = validate(&with("phone_whatsapp", json!(""))).unwrap();
        assert!(lead.phone_whatsapp.is_none());
    }

    #[test]
    fn non_http_url_rejected() {
        let errors = errors_for(&with("deck_or_website", json!("ftp://bad.com")));
        assert!(errors.contains_key("deck_or_website"));
        assert!(errors_for(&with("deck_or_website", json!("acme.com"))).contains_key("deck_or_website"));
        assert!(validate(&with("deck_or_website", json!("https://acme.com/deck.pdf"))).is_ok());
    }

    #[test]
    fn request_type_passes_through() {
        let lead = validate(&with("request_type", json!("Sprint"))).unwrap();
        assert_eq!(lead.request_type, "Sprint");
    }
}
