//! # ipmd-check
//!
//! IPTC photo metadata checker: find out which IPTC properties an image
//! carries in XMP, IIM and Exif, whether those copies agree, and what changed
//! between a master image and a derivative.
//!
//! Metadata is read from ExifTool JSON (`exiftool -j -G1 -struct image.jpg`);
//! the IPTC reference schema (`ipmd_top` / `ipmd_struct`) drives the walk.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ipmd_check::check::{CheckOptions, Checker};
//! use ipmd_check::compare::Comparator;
//! use ipmd_check::schema::SchemaModel;
//!
//! fn main() -> anyhow::Result<()> {
//!     let schema = SchemaModel::from_json_str(&std::fs::read_to_string("iptc-pmd-techreference.json")?)?;
//!
//!     // Build the state template once, check many images with it
//!     let checker = Checker::new(&schema).options(CheckOptions {
//!         compare_formats: true,
//!         ..CheckOptions::default()
//!     });
//!
//!     let master: serde_json::Value = serde_json::from_str(&std::fs::read_to_string("master.json")?)?;
//!     let derivative: serde_json::Value = serde_json::from_str(&std::fs::read_to_string("web.json")?)?;
//!     let master = checker.check(&master[0]);
//!     let derivative = checker.check(&derivative[0]);
//!
//!     println!("{}", serde_json::to_string_pretty(&master.state)?);
//!
//!     for row in Comparator::new(&schema).compare(&master, &derivative) {
//!         println!("{} {}: {}", row.kind, row.prop_path, row.message);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Output Trees
//!
//! | Tree | Per property |
//! |------|--------------|
//! | state | `data` counters (`xmp`, `iim`, `exif`, `xmpoccur`) and sync flags (`xmpiimsync`, `exifmapsync`), nested `struct` |
//! | value | values found, keyed `xmp`, `iim`, `exif`, nested `struct`; extra tags as `AOD_<tag>` |
//!
//! ## Modules
//!
//! - [`store`]: path addressing into JSON trees (`a/b#1/c`)
//! - [`schema`]: the reference schema model and the state template builder
//! - [`check`]: the multi-format checker and its per-property rules
//! - [`compare`]: comparison of two check outputs
//! - [`config`]: configuration types and loading/saving

pub mod check;
pub mod compare;
pub mod config;
pub mod schema;
pub mod store;
