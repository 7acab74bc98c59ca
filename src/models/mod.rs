pub mod enums;
pub mod handoff;
pub mod prescription;
pub mod projection;
pub mod token;

pub use enums::{TokenEventKind, TokenStatus};
pub use handoff::*;
pub use prescription::{Medication, PrescriptionDetails, PrescriptionSnapshot};
pub use projection::{PatientSummary, PrescriptionProjection, TokenExpiry};
pub use token::{TokenEvent, TokenRecord};
