//! Application state shared by every request handler.
//!
//! `CoreState` owns the token store, the demo catalog and the
//! configuration. It is wrapped in `Arc` at startup and handed to the
//! router; there are no process-wide singletons.

use crate::config::{ConfigError, HandoffConfig};
use crate::db::{self, DatabaseError};
use crate::models::{
    DemoToken, IssuedToken, PrescriptionDetails, PrescriptionProjection, TokenSummary,
};
use crate::pharmacy::token_code::normalize_code;
use crate::pharmacy::{DemoCatalog, SweepReport, TokenError, TokenStore};

pub struct CoreState {
    pub config: HandoffConfig,
    store: TokenStore,
    demo: DemoCatalog,
}

impl CoreState {
    /// Open (or create) the token database named in `config`.
    pub fn open(config: HandoffConfig) -> Result<Self, CoreError> {
        let conn = db::open_database(&config.db_path)?;
        tracing::info!(path = %config.db_path.display(), "Token database ready");
        let store = TokenStore::new(conn, config.token_ttl_hours);
        Ok(Self::with_store(config, store))
    }

    pub fn with_store(config: HandoffConfig, store: TokenStore) -> Self {
        let demo = DemoCatalog::new(&config.public_url);
        Self {
            config,
            store,
            demo,
        }
    }

    /// In-memory state with default configuration (tests).
    pub fn in_memory(config: HandoffConfig) -> Result<Self, CoreError> {
        let store = TokenStore::new(db::open_memory_database()?, config.token_ttl_hours);
        Ok(Self::with_store(config, store))
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    pub fn issue(
        &self,
        patient_ref: &str,
        details: &PrescriptionDetails,
    ) -> Result<IssuedToken, TokenError> {
        let record = self.store.issue(patient_ref, details)?;
        Ok(IssuedToken {
            qr_code_url: self.config.pharmacist_url(&record.token),
            token: record.token,
            expires_at: record.expires_at,
        })
    }

    /// Revoke a token. Demo tokens ignore revocation.
    pub fn revoke(&self, code: &str) -> Result<(), TokenError> {
        if self.demo.contains(code) {
            tracing::debug!("Revoke of demo token ignored");
            return Ok(());
        }
        self.store.revoke(code)?;
        Ok(())
    }

    /// Demo catalog first, then the token store.
    pub fn redeem(&self, code: &str) -> Result<PrescriptionProjection, TokenError> {
        if let Some(projection) = self.demo.redeem(code) {
            return Ok(projection);
        }
        self.store.redeem(code)
    }

    pub fn demo_tokens(&self) -> Vec<DemoToken> {
        self.demo.list()
    }

    pub fn list_tokens(&self, patient_ref: &str) -> Result<Vec<TokenSummary>, TokenError> {
        self.store.list_for_patient(patient_ref)
    }

    /// Pharmacist link for a known token (issued or demo).
    pub fn share_link(&self, code: &str) -> Result<String, TokenError> {
        let code = normalize_code(code);
        if self.demo.contains(&code) || self.store.exists(&code)? {
            Ok(self.config.pharmacist_url(&code))
        } else {
            Err(TokenError::NotFound)
        }
    }

    pub fn sweep(&self) -> Result<SweepReport, TokenError> {
        self.store.sweep(self.config.retention_days)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
    #[error("Server error: {0}")]
    Server(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn core() -> CoreState {
        CoreState::in_memory(HandoffConfig::default()).unwrap()
    }

    fn details() -> PrescriptionDetails {
        PrescriptionDetails {
            patient_name: Some("Grace Okoro".into()),
            prescription_text: Some("Amoxicillin 500mg TDS for 7 days".into()),
            ..Default::default()
        }
    }

    #[test]
    fn issued_token_carries_share_link() {
        let core = core();
        let issued = core.issue("42", &details()).unwrap();
        assert_eq!(
            issued.qr_code_url,
            format!("http://localhost:5173/pharmacy/{}", issued.token)
        );
    }

    #[test]
    fn grace_okoro_scenario() {
        let core = core();
        let issued = core.issue("42", &details()).unwrap();

        let projection = core.redeem(&issued.token).unwrap();
        assert_eq!(projection.patient.initials, "G.O.");

        core.revoke(&issued.token).unwrap();
        assert!(matches!(core.redeem(&issued.token), Err(TokenError::Revoked)));
        assert!(core.redeem("DEMO-001").is_ok());
    }

    #[test]
    fn revoke_on_one_thread_seen_by_redeems_on_others() {
        let core = std::sync::Arc::new(core());
        let token = core.issue("42", &details()).unwrap().token;

        let revoker = {
            let core = core.clone();
            let token = token.clone();
            std::thread::spawn(move || core.revoke(&token))
        };
        revoker.join().unwrap().unwrap();

        let redeemers: Vec<_> = (0..8)
            .map(|_| {
                let core = core.clone();
                let token = token.clone();
                std::thread::spawn(move || core.redeem(&token))
            })
            .collect();
        for handle in redeemers {
            assert!(matches!(handle.join().unwrap(), Err(TokenError::Revoked)));
        }
    }

    #[test]
    fn demo_tokens_survive_revocation() {
        let core = core();
        core.revoke("DEMO-002").unwrap();
        assert!(core.redeem("demo-002").is_ok());
        assert_eq!(core.demo_tokens().len(), 3);
    }

    #[test]
    fn revoke_unknown_succeeds_silently() {
        let core = core();
        assert!(core.revoke("MS-RX-UNKNWN").is_ok());
    }

    #[test]
    fn share_link_for_known_codes_only() {
        let core = core();
        let issued = core.issue("42", &details()).unwrap();
        assert_eq!(
            core.share_link(&issued.token.to_lowercase()).unwrap(),
            issued.qr_code_url
        );
        assert!(core.share_link("DEMO-003").is_ok());
        assert!(matches!(core.share_link("MS-RX-ZZZZZZ"), Err(TokenError::NotFound)));
    }

    #[test]
    fn open_creates_file_database() {
        let tmp = tempfile::tempdir().unwrap();
        let config = HandoffConfig {
            db_path: tmp.path().join("handoff.db"),
            ..HandoffConfig::default()
        };
        let core = CoreState::open(config).unwrap();
        let issued = core.issue("7", &details()).unwrap();
        assert_eq!(core.list_tokens("7").unwrap()[0].token, issued.token);
        assert!(tmp.path().join("handoff.db").exists());
    }
}
