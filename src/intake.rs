//! Rule-based extraction of patient fields from a free-text intake note,
//! e.g. "Patient Grace Okoro, 34 years old, female, phone 0803 555 0100,
//! allergic to penicillin, sulfa."
//!
//! Pure and offline. Fields that are not found are left empty for the
//! doctor to fill in.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:name is |patient |named )([a-z]+(?:\s+[a-z]+)*)").unwrap()
});

static AGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*(?:years old|year old|yo|yrs)").unwrap());

static PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:phone|number|tel|contact)[:\s]*([+\d\s()-]+)").unwrap());

static ALLERGIES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:allerg(?:y|ies|ic) to|allergic)[:\s]*([a-z,\s]+)").unwrap()
});

/// Words that end a captured name ("patient grace okoro is 34 ...").
const NAME_STOP_WORDS: &[&str] = &[
    "is", "aged", "age", "and", "with", "who", "has", "was", "presents", "male", "female",
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialPatient {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub allergies: Vec<String>,
}

pub fn parse_free_text(text: &str) -> PartialPatient {
    let text = text.to_lowercase();
    let mut patient = PartialPatient::default();

    if let Some(caps) = NAME.captures(&text) {
        let words: Vec<&str> = caps[1]
            .split_whitespace()
            .take_while(|w| !NAME_STOP_WORDS.contains(w))
            .collect();
        // A lone word is too ambiguous ("patient unwell")
        if words.len() >= 2 {
            patient.first_name = Some(title_case(words[0]));
            patient.last_name = Some(
                words[1..]
                    .iter()
                    .map(|w| title_case(w))
                    .collect::<Vec<_>>()
                    .join(" "),
            );
        }
    }

    if let Some(caps) = AGE.captures(&text) {
        patient.age = Some(caps[1].to_string());
    }

    if text.contains("female") {
        patient.gender = Some("Female".into());
    } else if text.contains("male") {
        patient.gender = Some("Male".into());
    }

    if let Some(caps) = PHONE.captures(&text) {
        let phone = caps[1].trim();
        if phone.chars().any(|c| c.is_ascii_digit()) {
            patient.phone_number = Some(phone.to_string());
        }
    }

    if let Some(caps) = ALLERGIES.captures(&text) {
        patient.allergies = caps[1]
            .split(',')
            .flat_map(|part| part.split(" and "))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
    }

    patient
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_every_field() {
        let parsed = parse_free_text(
            "Patient Grace Okoro, 34 years old, female. Phone: +234 803 555 0100. Allergic to penicillin, sulfa.",
        );
        assert_eq!(parsed.first_name.as_deref(), Some("Grace"));
        assert_eq!(parsed.last_name.as_deref(), Some("Okoro"));
        assert_eq!(parsed.age.as_deref(), Some("34"));
        assert_eq!(parsed.gender.as_deref(), Some("Female"));
        assert_eq!(parsed.phone_number.as_deref(), Some("+234 803 555 0100"));
        assert_eq!(parsed.allergies, vec!["penicillin", "sulfa"]);
    }

    #[test]
    fn name_stops_at_connector_word() {
        let parsed = parse_free_text("name is chinedu adeyemi and he is 45 yo male");
        assert_eq!(parsed.first_name.as_deref(), Some("Chinedu"));
        assert_eq!(parsed.last_name.as_deref(), Some("Adeyemi"));
        assert_eq!(parsed.age.as_deref(), Some("45"));
        assert_eq!(parsed.gender.as_deref(), Some("Male"));
    }

    #[test]
    fn multi_word_last_name() {
        let parsed = parse_free_text("Named Mary Jane Watson, 29 yrs");
        assert_eq!(parsed.first_name.as_deref(), Some("Mary"));
        assert_eq!(parsed.last_name.as_deref(), Some("Jane Watson"));
        assert_eq!(parsed.age.as_deref(), Some("29"));
    }

    #[test]
    fn single_name_word_ignored() {
        let parsed = parse_free_text("patient unwell, 40 years old");
        assert_eq!(parsed.first_name, None);
        assert_eq!(parsed.last_name, None);
    }

    #[test]
    fn female_wins_over_male() {
        assert_eq!(
            parse_free_text("female patient, male nurse present").gender.as_deref(),
            Some("Female")
        );
        assert_eq!(parse_free_text("male, 60").gender.as_deref(), Some("Male"));
        assert_eq!(parse_free_text("no sex recorded").gender, None);
    }

    #[test]
    fn allergy_list_with_and() {
        let parsed = parse_free_text("Allergies to peanuts and latex.");
        assert_eq!(parsed.allergies, vec!["peanuts", "latex"]);
    }

    #[test]
    fn empty_text_yields_nothing() {
        assert_eq!(parse_free_text(""), PartialPatient::default());
    }

    #[test]
    fn serializes_only_found_fields() {
        let json = serde_json::to_value(parse_free_text("32 year old")).unwrap();
        assert_eq!(json["age"], "32");
        assert!(json.get("first_name").is_none());
        assert_eq!(json["allergies"], serde_json::json!([]));
    }
}
