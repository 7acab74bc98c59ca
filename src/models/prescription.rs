use serde::{Deserialize, Deserializer, Serialize};

/// One dispensable line of a prescription.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Medication {
    pub name: String,
    pub dosage: String,
    pub frequency: String,
    pub duration: String,
}

/// Free-form payload the doctor UI sends when issuing a handoff token.
///
/// Every field is optional on the wire: the UI builds it from whatever the
/// patient form holds. Identity fields (`patientName`, `firstName`,
/// `lastName`) are used only to derive initials and to redact free text;
/// they are never stored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PrescriptionDetails {
    pub patient_name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub patient_initials: Option<String>,
    #[serde(deserialize_with = "string_or_number")]
    pub patient_age: Option<String>,
    pub patient_gender: Option<String>,
    #[serde(deserialize_with = "string_or_list")]
    pub allergies: Vec<String>,
    pub medications: Vec<Medication>,
    pub prescription_text: Option<String>,
    pub diagnosis: Option<String>,
    pub safety_warnings: Vec<String>,
    pub encounter_date: Option<String>,
    #[serde(alias = "prescribedBy")]
    pub doctor_name: Option<String>,
    pub notes: Option<String>,
}

/// Frozen, redacted copy of a prescription taken at issuance time.
///
/// Stored as JSON next to the token. Later edits to the patient record
/// never reach it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionSnapshot {
    pub patient_initials: String,
    pub age: String,
    pub gender: String,
    pub allergies: Vec<String>,
    pub medications: Vec<Medication>,
    pub prescription_text: Option<String>,
    pub safety_warnings: Vec<String>,
    pub diagnosis: Option<String>,
    pub notes: Option<String>,
    pub encounter_date: String,
    pub prescribed_by: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    Text(String),
    Int(i64),
    Float(f64),
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<StringOrNumber>::deserialize(deserializer)?;
    Ok(value.map(|v| match v {
        StringOrNumber::Text(s) => s,
        StringOrNumber::Int(n) => n.to_string(),
        StringOrNumber::Float(n) => n.to_string(),
    }))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrList {
    One(String),
    Many(Vec<String>),
}

/// Allergies arrive either as an array or as one comma-separated string.
fn string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<StringOrList>::deserialize(deserializer)?;
    let items = match value {
        None => Vec::new(),
        Some(StringOrList::One(s)) => s.split(',').map(str::to_string).collect(),
        Some(StringOrList::Many(v)) => v,
    };
    Ok(items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn details_accept_camel_case_payload_from_ui() {
        let json = r#"{
            "patientInitials": "G.O.",
            "patientAge": "34",
            "patientGender": "Female",
            "allergies": ["Penicillin", " Sulfa "],
            "medications": [],
            "prescriptionText": "Amoxicillin 500mg TDS for 7 days",
            "diagnosis": "Malaria",
            "safetyWarnings": [],
            "encounterDate": "2026-10-17",
            "doctorName": "Dr. Ada Eze",
            "notes": ""
        }"#;
        let details: PrescriptionDetails = serde_json::from_str(json).unwrap();
        assert_eq!(details.patient_initials.as_deref(), Some("G.O."));
        assert_eq!(details.allergies, vec!["Penicillin", "Sulfa"]);
        assert_eq!(details.doctor_name.as_deref(), Some("Dr. Ada Eze"));
    }

    #[test]
    fn allergies_as_comma_string() {
        let details: PrescriptionDetails =
            serde_json::from_str(r#"{"allergies": "peanuts, latex,"}"#).unwrap();
        assert_eq!(details.allergies, vec!["peanuts", "latex"]);
    }

    #[test]
    fn numeric_age_becomes_string() {
        let details: PrescriptionDetails =
            serde_json::from_str(r#"{"patientAge": 61}"#).unwrap();
        assert_eq!(details.patient_age.as_deref(), Some("61"));
    }

    #[test]
    fn null_and_missing_fields_default() {
        let details: PrescriptionDetails =
            serde_json::from_str(r#"{"allergies": null, "patientAge": null}"#).unwrap();
        assert!(details.allergies.is_empty());
        assert!(details.patient_age.is_none());
        assert!(details.medications.is_empty());
    }

    #[test]
    fn prescribed_by_alias() {
        let details: PrescriptionDetails =
            serde_json::from_str(r#"{"prescribedBy": "Dr. Bello"}"#).unwrap();
        assert_eq!(details.doctor_name.as_deref(), Some("Dr. Bello"));
    }
}
