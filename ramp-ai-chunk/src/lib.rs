pub mod python;

// Re-export the extraction entry points for external use
pub use python::{CodeUnit, ExtractError, UnitKind, extract_units};
