pub mod models;
pub mod replay;
pub mod transformer;
pub mod validator;

pub use models::CanonicalRallyFile;
pub use replay::{ReplayReport, replay};
pub use transformer::{ImportSummary, RallyBundle, RallyImporter};
pub use validator::{CanonicalValidator, ValidationReport};
