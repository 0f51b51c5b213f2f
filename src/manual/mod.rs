pub mod draft;

pub use draft::{parse_amount, MacroField, ManualDraft, ValidatedDraft};
