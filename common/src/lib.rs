//! Density AI Common Library
//!
//! CLIから利用される、I/Oを持たない照合ロジックと型

pub mod types;
pub mod error;
pub mod records;
pub mod catalog;
pub mod parser;
pub mod prompts;
pub mod conversation;
pub mod outcome;

pub use types::{Action, Confidence, MatchCandidate, MatchOutcome, ReferenceIngredient, Resolution, UnresolvedIngredient};
pub use error::{Error, Result};
pub use records::{
    format_density, parse_density_value, read_reference_csv, read_unresolved_csv,
    reference_to_row, unresolved_to_row, Loaded, SkippedRow, REFERENCE_HEADER, UNRESOLVED_HEADER,
};
pub use catalog::{strip_decoration, ReferenceCatalog};
pub use parser::parse_response;
pub use prompts::{build_base_prompt, build_question};
pub use conversation::{Conversation, ConversationTurn, Role};
pub use outcome::{apply_outcome, resolution_for};
