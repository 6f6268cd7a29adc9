//! Query-driven static source analyzer.
//!
//! Parses source files of supported languages into uniform code-unit models,
//! renders body-elided skeletons, and answers structural queries (classes in
//! a file, usages of an identifier) for downstream context-assembly tooling.
//! Language support is an extension point: one [`profile::LanguageProfile`]
//! impl plus one capture-pattern resource under `queries/` per language.

pub mod config;
pub mod error;
pub mod extract;
pub mod index;
pub mod model;
pub mod profile;
pub mod profiles;
pub mod scanner;
pub mod skeleton;

pub use index::{SymbolIndex, UsageHit, UsageStrategy};
pub use model::{CodeUnit, CodeUnitKind, SkeletonType};
