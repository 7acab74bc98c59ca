use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::prescription::{Medication, PrescriptionSnapshot};

/// Token expiry as shown to clients: an RFC 3339 instant, or `"never"`
/// for demo tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenExpiry {
    At(DateTime<Utc>),
    Never,
}

impl std::fmt::Display for TokenExpiry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenExpiry::At(at) => f.write_str(&at.to_rfc3339_opts(SecondsFormat::Secs, true)),
            TokenExpiry::Never => f.write_str("never"),
        }
    }
}

impl Serialize for TokenExpiry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TokenExpiry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if raw.eq_ignore_ascii_case("never") {
            return Ok(TokenExpiry::Never);
        }
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| TokenExpiry::At(dt.with_timezone(&Utc)))
            .map_err(D::Error::custom)
    }
}

/// Patient block of the pharmacist view. Initials only, never a name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientSummary {
    pub initials: String,
    pub age: String,
    pub gender: String,
    pub allergies: Vec<String>,
}

/// Read-only prescription view returned to an unauthenticated pharmacist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionProjection {
    pub patient: PatientSummary,
    pub medications: Vec<Medication>,
    pub safety_warnings: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnosis: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prescription_text: Option<String>,
    pub encounter_date: String,
    pub prescribed_by: String,
    pub token_expiry: TokenExpiry,
}

impl PrescriptionProjection {
    pub fn from_snapshot(snapshot: PrescriptionSnapshot, token_expiry: TokenExpiry) -> Self {
        Self {
            patient: PatientSummary {
                initials: snapshot.patient_initials,
                age: snapshot.age,
                gender: snapshot.gender,
                allergies: snapshot.allergies,
            },
            medications: snapshot.medications,
            safety_warnings: snapshot.safety_warnings,
            diagnosis: snapshot.diagnosis,
            notes: snapshot.notes,
            prescription_text: snapshot.prescription_text,
            encounter_date: snapshot.encounter_date,
            prescribed_by: snapshot.prescribed_by,
            token_expiry,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn snapshot() -> PrescriptionSnapshot {
        PrescriptionSnapshot {
            patient_initials: "G.O.".into(),
            age: "34".into(),
            gender: "Female".into(),
            allergies: vec!["Penicillin".into()],
            medications: vec![Medication {
                name: "Artemether/Lumefantrine".into(),
                dosage: "80/480mg".into(),
                frequency: "twice daily".into(),
                duration: "3 days".into(),
            }],
            prescription_text: None,
            safety_warnings: vec!["Patient allergic to: Penicillin".into()],
            diagnosis: Some("Malaria".into()),
            notes: None,
            encounter_date: "2026-10-17".into(),
            prescribed_by: "Dr. Ada Eze".into(),
        }
    }

    #[test]
    fn projection_json_uses_pharmacist_page_field_names() {
        let expiry = TokenExpiry::At(Utc.with_ymd_and_hms(2026, 10, 18, 9, 0, 0).unwrap());
        let projection = PrescriptionProjection::from_snapshot(snapshot(), expiry);
        let json = serde_json::to_value(&projection).unwrap();

        assert_eq!(json["patient"]["initials"], "G.O.");
        assert_eq!(json["patient"]["allergies"][0], "Penicillin");
        assert_eq!(json["safetyWarnings"][0], "Patient allergic to: Penicillin");
        assert_eq!(json["encounterDate"], "2026-10-17");
        assert_eq!(json["prescribedBy"], "Dr. Ada Eze");
        assert_eq!(json["tokenExpiry"], "2026-10-18T09:00:00Z");
        assert_eq!(json["diagnosis"], "Malaria");
        // Absent optionals are omitted, not null
        assert!(json.get("notes").is_none());
    }

    #[test]
    fn never_expiry_serializes_as_word() {
        let json = serde_json::to_string(&TokenExpiry::Never).unwrap();
        assert_eq!(json, "\"never\"");
        let back: TokenExpiry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, TokenExpiry::Never);
    }

    #[test]
    fn projection_deserializes_from_server_json() {
        let expiry = TokenExpiry::At(Utc.with_ymd_and_hms(2026, 10, 18, 9, 0, 0).unwrap());
        let projection = PrescriptionProjection::from_snapshot(snapshot(), expiry);
        let text = serde_json::to_string(&projection).unwrap();
        let parsed: PrescriptionProjection = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, projection);
    }

    #[test]
    fn malformed_expiry_rejected() {
        let result: Result<TokenExpiry, _> = serde_json::from_str("\"tomorrow\"");
        assert!(result.is_err());
    }
}
