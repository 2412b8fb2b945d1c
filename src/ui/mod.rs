//! Headless admin UI state: forms, wizards and listings.

pub mod form;
pub mod listing;
pub mod wizard;

pub use listing::{ListingTable, RowActions};
pub use wizard::{DraftSink, StepDescriptor, Wizard, WizardMode, WizardOutcome, WizardStatus};
