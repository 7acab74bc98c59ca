//! Fixed catalog of presentation tokens. They never expire, ignore
//! revocation and are not stored in the token table.

use crate::models::{
    DemoToken, Medication, PrescriptionProjection, PrescriptionSnapshot, TokenExpiry,
};

use super::token_code::normalize_code;

struct DemoEntry {
    code: &'static str,
    diagnosis: &'static str,
    snapshot: PrescriptionSnapshot,
}

pub struct DemoCatalog {
    public_url: String,
    entries: Vec<DemoEntry>,
}

impl DemoCatalog {
    /// `public_url` is the pharmacist front end base, as in share links.
    pub fn new(public_url: &str) -> Self {
        Self {
            public_url: public_url.trim_end_matches('/').to_string(),
            entries: demo_entries(),
        }
    }

    pub fn contains(&self, code: &str) -> bool {
        self.find(code).is_some()
    }

    pub fn list(&self) -> Vec<DemoToken> {
        self.entries
            .iter()
            .map(|e| DemoToken {
                token: e.code.to_string(),
                url: format!("{}/pharmacy/{}", self.public_url, e.code),
                patient: format!(
                    "{} ({}, {})",
                    e.snapshot.patient_initials, e.snapshot.age, e.snapshot.gender
                ),
                diagnosis: e.diagnosis.to_string(),
                expires_at: TokenExpiry::Never,
            })
            .collect()
    }

    /// Projection for a demo code, at any date.
    pub fn redeem(&self, code: &str) -> Option<PrescriptionProjection> {
        self.find(code)
            .map(|e| PrescriptionProjection::from_snapshot(e.snapshot.clone(), TokenExpiry::Never))
    }

    fn find(&self, code: &str) -> Option<&DemoEntry> {
        let code = normalize_code(code);
        self.entries.iter().find(|e| e.code == code)
    }
}

fn med(name: &str, dosage: &str, frequency: &str, duration: &str) -> Medication {
    Medication {
        name: name.into(),
        dosage: dosage.into(),
        frequency: frequency.into(),
        duration: duration.into(),
    }
}

fn demo_entries() -> Vec<DemoEntry> {
    vec![
        DemoEntry {
            code: "DEMO-001",
            diagnosis: "Uncomplicated malaria",
            snapshot: PrescriptionSnapshot {
                patient_initials: "C.A.".into(),
                age: "45".into(),
                gender: "Male".into(),
                allergies: vec!["Sulfonamides".into()],
                medications: vec![
                    med("Artemether/Lumefantrine", "80/480mg", "twice daily", "3 days"),
                    med("Paracetamol", "1g", "every 8 hours", "3 days"),
                ],
                prescription_text: None,
                safety_warnings: vec![
                    "Patient allergic to: Sulfonamides".into(),
                    "Take artemether/lumefantrine with fatty food or milk".into(),
                ],
                diagnosis: Some("Uncomplicated malaria".into()),
                notes: Some("Return if fever persists beyond 48 hours".into()),
                encounter_date: "2025-01-15".into(),
                prescribed_by: "Dr. Ada Eze".into(),
            },
        },
        DemoEntry {
            code: "DEMO-002",
            diagnosis: "Essential hypertension",
            snapshot: PrescriptionSnapshot {
                patient_initials: "N.E.".into(),
                age: "58".into(),
                gender: "Female".into(),
                allergies: vec![],
                medications: vec![
                    med("Amlodipine", "5mg", "once daily", "30 days"),
                    med("Hydrochlorothiazide", "12.5mg", "once daily", "30 days"),
                ],
                prescription_text: None,
                safety_warnings: vec!["Monitor blood pressure weekly".into()],
                diagnosis: Some("Essential hypertension".into()),
                notes: None,
                encounter_date: "2025-01-20".into(),
                prescribed_by: "Dr. Tunde Bakare".into(),
            },
        },
        DemoEntry {
            code: "DEMO-003",
            diagnosis: "Community-acquired pneumonia",
            snapshot: PrescriptionSnapshot {
                patient_initials: "F.M.".into(),
                age: "32".into(),
                gender: "Female".into(),
                allergies: vec!["Penicillin".into()],
                medications: vec![med("Azithromycin", "500mg", "once daily", "3 days")],
                prescription_text: None,
                safety_warnings: vec![
                    "Patient allergic to: Penicillin".into(),
                    "Do not substitute with amoxicillin or co-amoxiclav".into(),
                ],
                diagnosis: Some("Community-acquired pneumonia".into()),
                notes: None,
                encounter_date: "2025-02-03".into(),
                prescribed_by: "Dr. Ada Eze".into(),
            },
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_three_never_expiring_tokens() {
        let catalog = DemoCatalog::new("http://localhost:5173/");
        let tokens = catalog.list();
        let codes: Vec<_> = tokens.iter().map(|t| t.token.as_str()).collect();
        assert_eq!(codes, vec!["DEMO-001", "DEMO-002", "DEMO-003"]);
        assert!(tokens.iter().all(|t| t.expires_at == TokenExpiry::Never));
        assert_eq!(tokens[0].url, "http://localhost:5173/pharmacy/DEMO-001");
        assert_eq!(tokens[0].patient, "C.A. (45, Male)");
    }

    #[test]
    fn redeem_is_case_insensitive() {
        let catalog = DemoCatalog::new("http://localhost:5173");
        let projection = catalog.redeem(" demo-001 ").unwrap();
        assert_eq!(projection.patient.initials, "C.A.");
        assert_eq!(projection.token_expiry, TokenExpiry::Never);
    }

    #[test]
    fn unknown_code_is_not_demo() {
        let catalog = DemoCatalog::new("http://localhost:5173");
        assert!(catalog.redeem("DEMO-004").is_none());
        assert!(!catalog.contains("MS-RX-ABC234"));
    }

    #[test]
    fn repeated_redemptions_identical() {
        let catalog = DemoCatalog::new("http://localhost:5173");
        assert_eq!(catalog.redeem("DEMO-002"), catalog.redeem("DEMO-002"));
    }
}
