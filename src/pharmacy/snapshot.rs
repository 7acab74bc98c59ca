//! Builds the frozen, redacted snapshot stored with each token.
//!
//! The patient's name is only ever used here: to derive initials and to
//! scrub name parts out of free text before anything is persisted.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use super::TokenError;
use crate::models::{Medication, PrescriptionDetails, PrescriptionSnapshot};

/// Longest accepted free-text field, in characters.
pub const MAX_TEXT_CHARS: usize = 4000;
/// Longest accepted list (allergies, medications, warnings).
pub const MAX_LIST_ITEMS: usize = 50;

/// Age placeholder; the pharmacist view renders `"{age} years"`.
const AGE_UNKNOWN: &str = "N/A";
const NOT_RECORDED: &str = "Not recorded";

const PHONE_REMOVED: &str = "[phone removed]";
const ADDRESS_REMOVED: &str = "[address removed]";

/// Fewer digits than this is a date, dose or count, not a phone number.
const MIN_PHONE_DIGITS: usize = 9;

static LIST_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:[-*•]|\d+[.)])\s*").unwrap());

static DOSAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(\d+(?:\.\d+)?(?:\s*/\s*\d+(?:\.\d+)?)?\s*(?:mcg|mg|g|ml|iu|units?|tabs?|tablets?|caps?|capsules?|puffs?|drops?))\b",
    )
    .unwrap()
});

static FREQUENCY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(once daily|twice daily|three times daily|four times daily|once a day|twice a day|every\s+\d+\s*(?:hours?|hrs?|h)|od|bd|bid|tds|tid|qds|qid|nocte|mane|prn|stat|daily|weekly)\b",
    )
    .unwrap()
});

static PHONE_LIKE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\+?\(?\d[\d \t().-]{6,}\d").unwrap());

static STREET_ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b\d{1,5}[A-Za-z]?\s+(?:[A-Z][a-z]+\s+){0,3}(?:Street|St|Road|Rd|Avenue|Ave|Close|Crescent|Lane|Drive|Way|Estate|Boulevard)\b\.?",
    )
    .unwrap()
});

static DURATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:for\s+|x\s*)?(\d+\s*(?:days?|weeks?|months?))\b").unwrap()
});

/// Build the snapshot for a new token from the issuer's payload.
pub fn build_snapshot(
    details: &PrescriptionDetails,
    now: DateTime<Utc>,
) -> Result<PrescriptionSnapshot, TokenError> {
    validate_details(details)?;

    let name_parts = name_parts(details);
    let initials = if name_parts.is_empty() {
        details
            .patient_initials
            .as_deref()
            .and_then(normalize_initials)
    } else {
        initials_from_parts(&name_parts)
    };
    let initials = initials
        .ok_or_else(|| TokenError::InvalidDetails("patient name or initials required".into()))?;

    let redactor = Redactor::new(&name_parts, &initials)?;

    let medications: Vec<Medication> = if details.medications.is_empty() {
        details
            .prescription_text
            .as_deref()
            .map(parse_prescription_text)
            .unwrap_or_default()
    } else {
        details
            .medications
            .iter()
            .filter(|m| !m.name.trim().is_empty())
            .cloned()
            .collect()
    };
    let medications = medications
        .into_iter()
        .map(|m| Medication {
            name: redactor.apply(m.name.trim()),
            dosage: redactor.apply(m.dosage.trim()),
            frequency: redactor.apply(m.frequency.trim()),
            duration: redactor.apply(m.duration.trim()),
        })
        .collect();

    let allergies: Vec<String> = details.allergies.iter().map(|a| redactor.apply(a)).collect();

    let mut safety_warnings: Vec<String> = details
        .safety_warnings
        .iter()
        .map(|w| w.trim())
        .filter(|w| !w.is_empty())
        .map(|w| redactor.apply(w))
        .collect();
    if let Some(warning) = allergy_warning(&allergies, &safety_warnings) {
        safety_warnings.insert(0, warning);
    }

    let redact_opt = |field: &Option<String>| non_empty(field).map(|s| redactor.apply(s));

    Ok(PrescriptionSnapshot {
        patient_initials: initials,
        age: redact_opt(&details.patient_age).unwrap_or_else(|| AGE_UNKNOWN.to_string()),
        gender: redact_opt(&details.patient_gender).unwrap_or_else(|| NOT_RECORDED.to_string()),
        allergies,
        medications,
        prescription_text: redact_opt(&details.prescription_text),
        safety_warnings,
        diagnosis: redact_opt(&details.diagnosis),
        notes: redact_opt(&details.notes),
        encounter_date: redact_opt(&details.encounter_date)
            .unwrap_or_else(|| now.date_naive().to_string()),
        prescribed_by: redact_opt(&details.doctor_name)
            .unwrap_or_else(|| NOT_RECORDED.to_string()),
    })
}

/// Reject oversized payloads before any processing.
pub fn validate_details(details: &PrescriptionDetails) -> Result<(), TokenError> {
    let texts = [
        ("patientName", &details.patient_name),
        ("firstName", &details.first_name),
        ("lastName", &details.last_name),
        ("patientInitials", &details.patient_initials),
        ("patientAge", &details.patient_age),
        ("patientGender", &details.patient_gender),
        ("prescriptionText", &details.prescription_text),
        ("diagnosis", &details.diagnosis),
        ("encounterDate", &details.encounter_date),
        ("doctorName", &details.doctor_name),
        ("notes", &details.notes),
    ];
    for (field, value) in texts {
        if let Some(value) = value {
            check_text(field, value)?;
        }
    }

    let lists = [
        ("allergies", details.allergies.len()),
        ("medications", details.medications.len()),
        ("safetyWarnings", details.safety_warnings.len()),
    ];
    for (field, len) in lists {
        if len > MAX_LIST_ITEMS {
            return Err(TokenError::InvalidDetails(format!(
                "{field} has {len} items (max {MAX_LIST_ITEMS})"
            )));
        }
    }

    for allergy in &details.allergies {
        check_text("allergies", allergy)?;
    }
    for warning in &details.safety_warnings {
        check_text("safetyWarnings", warning)?;
    }
    for med in &details.medications {
        for value in [&med.name, &med.dosage, &med.frequency, &med.duration] {
            check_text("medications", value)?;
        }
    }
    Ok(())
}

fn check_text(field: &str, value: &str) -> Result<(), TokenError> {
    if value.chars().count() > MAX_TEXT_CHARS {
        return Err(TokenError::InvalidDetails(format!(
            "{field} exceeds {MAX_TEXT_CHARS} characters"
        )));
    }
    Ok(())
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Name words from `firstName`, `patientName` and `lastName` together, in
/// that order, each word once (case-insensitive).
fn name_parts(details: &PrescriptionDetails) -> Vec<String> {
    let mut parts: Vec<String> = Vec::new();
    let words = [&details.first_name, &details.patient_name, &details.last_name]
        .into_iter()
        .flatten()
        .flat_map(|s| s.split_whitespace())
        .map(|w| w.trim_matches(|c: char| !c.is_alphabetic()))
        .filter(|w| w.chars().any(char::is_alphabetic));
    for word in words {
        if !parts.iter().any(|p| p.eq_ignore_ascii_case(word)) {
            parts.push(word.to_string());
        }
    }
    parts
}

/// `["Grace", "Okoro"]` → "G.O.", `["Grace"]` → "G.". Middle names are
/// skipped.
fn initials_from_parts(parts: &[String]) -> Option<String> {
    let letter = |part: &String| part.chars().find(|c| c.is_alphabetic());
    let first = parts.first().and_then(letter)?;
    let mut out: String = first.to_uppercase().collect();
    out.push('.');
    if parts.len() > 1 {
        if let Some(last) = parts.last().and_then(letter) {
            out.extend(last.to_uppercase());
            out.push('.');
        }
    }
    Some(out)
}

/// Canonical initials from user input: letters only, at most three,
/// each followed by a dot.
pub fn normalize_initials(raw: &str) -> Option<String> {
    let letters: Vec<char> = raw.chars().filter(|c| c.is_alphabetic()).take(3).collect();
    if letters.is_empty() {
        return None;
    }
    let mut out = String::new();
    for c in letters {
        out.extend(c.to_uppercase());
        out.push('.');
    }
    Some(out)
}

/// Replaces every occurrence of the patient's name (whole, or any single
/// part) with their initials, then masks phone numbers and street
/// addresses.
struct Redactor {
    pattern: Option<Regex>,
    initials: String,
}

impl Redactor {
    fn new(parts: &[String], initials: &str) -> Result<Self, TokenError> {
        // Single letters would clobber ordinary words
        let mut words: Vec<&str> = parts
            .iter()
            .map(String::as_str)
            .filter(|p| p.chars().count() >= 2)
            .collect();
        if words.is_empty() {
            return Ok(Self {
                pattern: None,
                initials: initials.to_string(),
            });
        }
        words.sort_by_key(|w| std::cmp::Reverse(w.len()));

        let mut alternatives = Vec::with_capacity(words.len() + 1);
        if parts.len() > 1 {
            let full: Vec<String> = parts.iter().map(|p| regex::escape(p)).collect();
            alternatives.push(full.join(r"\s+"));
        }
        alternatives.extend(words.iter().map(|w| regex::escape(w)));

        let pattern = Regex::new(&format!(r"(?i)\b(?:{})\b", alternatives.join("|")))
            .map_err(|e| TokenError::InvalidDetails(format!("unusable patient name: {e}")))?;
        Ok(Self {
            pattern: Some(pattern),
            initials: initials.to_string(),
        })
    }

    fn apply(&self, text: &str) -> String {
        let named = match &self.pattern {
            Some(re) => re.replace_all(text, regex::NoExpand(&self.initials)),
            None => std::borrow::Cow::Borrowed(text),
        };
        let dialled = PHONE_LIKE.replace_all(&named, |caps: &regex::Captures| {
            let digits = caps[0].chars().filter(char::is_ascii_digit).count();
            if digits >= MIN_PHONE_DIGITS {
                PHONE_REMOVED.to_string()
            } else {
                caps[0].to_string()
            }
        });
        STREET_ADDRESS
            .replace_all(&dialled, regex::NoExpand(ADDRESS_REMOVED))
            .into_owned()
    }
}

/// Warning listing the patient's allergies, unless one of the supplied
/// warnings already names all of them.
fn allergy_warning(allergies: &[String], warnings: &[String]) -> Option<String> {
    if allergies.is_empty() {
        return None;
    }
    let covered = warnings.iter().any(|w| {
        let w = w.to_lowercase();
        allergies.iter().all(|a| w.contains(&a.to_lowercase()))
    });
    if covered {
        return None;
    }
    Some(format!("Patient allergic to: {}", allergies.join(", ")))
}

/// Parse a free-text prescription, one medication per line (or `;`).
pub fn parse_prescription_text(text: &str) -> Vec<Medication> {
    text.split(['\n', ';'])
        .filter_map(parse_medication_line)
        .take(MAX_LIST_ITEMS)
        .collect()
}

/// Split one prescription line such as `"Amoxicillin 500mg TDS for 7 days"`
/// into its parts. Anything before the first dosage/frequency/duration is
/// the drug name.
pub fn parse_medication_line(line: &str) -> Option<Medication> {
    let line = LIST_MARKER.replace(line, "");
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let dosage = DOSAGE.captures(line);
    let frequency = FREQUENCY.captures(line);
    let duration = DURATION.captures(line);

    let spans: Vec<(usize, usize)> = [&dosage, &frequency, &duration]
        .into_iter()
        .flatten()
        .filter_map(|c| c.get(0))
        .map(|m| (m.start(), m.end()))
        .collect();

    let name_end = spans.iter().map(|(s, _)| *s).min().unwrap_or(line.len());
    let mut name = clean_name(&line[..name_end]);
    if name.is_empty() {
        // Dose-first lines: "500mg paracetamol twice daily"
        let mut rest = String::with_capacity(line.len());
        let mut cursor = 0;
        let mut sorted = spans.clone();
        sorted.sort_unstable();
        for (start, end) in sorted {
            if start >= cursor {
                rest.push_str(&line[cursor..start]);
                rest.push(' ');
                cursor = end;
            }
        }
        rest.push_str(&line[cursor.min(line.len())..]);
        name = clean_name(&rest);
    }
    if name.is_empty() {
        return None;
    }

    let group = |c: &Option<regex::Captures>| {
        c.as_ref()
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().split_whitespace().collect::<Vec<_>>().join(" "))
            .unwrap_or_default()
    };

    Some(Medication {
        name,
        dosage: group(&dosage),
        frequency: group(&frequency),
        duration: group(&duration),
    })
}

fn clean_name(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_matches(|c: char| c == ',' || c == '-' || c == ':' || c.is_whitespace())
        .to_string()
}
