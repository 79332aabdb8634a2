#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Package identification for modinstall
//!
//! Works out which id an extracted package is installed under by reading
//! its manifest files as plain text. Package code is never evaluated.

mod identifier;
mod parser;

pub use identifier::PackageIdentifier;
pub use parser::{ManifestHints, ManifestParser, PhpManifestParser};
