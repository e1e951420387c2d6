pub mod legacy_parser;

pub use legacy_parser::{parse_legacy, LegacyError};
