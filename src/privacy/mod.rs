pub mod disclosure;
pub mod redaction;

pub use disclosure::{protect_summary, ProtectedSummary};
pub use redaction::{redact, RedactedFrequencyTable};
