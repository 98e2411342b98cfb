//! The IPTC Photo Metadata reference schema.
//!
//! The schema is external input data with two maps: `ipmd_top` holds the
//! top-level property definitions and `ipmd_struct` holds the named
//! structures those properties (and other structures) may nest. Map order is
//! kept as found in the document and is the order every walk follows.
//!
//! # Example
//!
//! ```rust
//! use ipmd_check::schema::SchemaModel;
//!
//! let schema = SchemaModel::from_json_str(r#"{
//!     "ipmd_top": {
//!         "headline": {
//!             "name": "Headline", "datatype": "string", "propoccurrence": "single",
//!             "etTag": "XMP-photoshop:Headline", "IIMid": "IPTC:Headline"
//!         }
//!     },
//!     "ipmd_struct": {}
//! }"#).unwrap();
//!
//! assert!(schema.top["headline"].has_iim());
//! ```

mod template;

pub use template::build_state_template;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// `dataformat` marker for language-alternative text values.
pub const ALT_LANG: &str = "AltLang";

/// Keys used inside state and value tree nodes.
pub mod keys {
    pub const DATA: &str = "data";
    pub const STRUCT: &str = "struct";
    pub const XMP: &str = "xmp";
    pub const IIM: &str = "iim";
    pub const EXIF: &str = "exif";
    /// Number of XMP values (or structure instances) of a multi property.
    pub const XMP_OCCUR: &str = "xmpoccur";
    /// XMP and IIM values are equal.
    pub const XMP_IIM_SYNC: &str = "xmpiimsync";
    /// XMP and Exif values are equal, given XMP and IIM are in sync.
    pub const EXIF_MAP_SYNC: &str = "exifmapsync";
}

/// The three metadata encodings a property may be stored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Xmp,
    Iim,
    Exif,
}

impl Format {
    /// Key of this format in state `data` records and value nodes.
    pub fn key(self) -> &'static str {
        match self {
            Format::Xmp => keys::XMP,
            Format::Iim => keys::IIM,
            Format::Exif => keys::EXIF,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Format::Xmp => "XMP",
            Format::Iim => "IIM",
            Format::Exif => "Exif",
        }
    }
}

/// Property definitions keyed by property id, in schema order.
pub type PropertyMap = IndexMap<String, PropertyDef>;

/// Errors raised while reading a reference schema.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("reference schema has no '{0}' section")]
    MissingSection(&'static str),
    #[error("reference schema is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Datatype of a property value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Datatype {
    String,
    Number,
    Struct,
}

/// Whether a property may occur once or repeatedly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Occurrence {
    #[default]
    Single,
    Multi,
}

/// One property of the reference schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDef {
    /// Display name.
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub sortorder: Option<String>,
    /// Anchor of the property in the published standard.
    #[serde(default)]
    pub specidx: Option<String>,
    #[serde(default)]
    pub ugtopic: Option<String>,
    pub datatype: Datatype,
    /// `AltLang`, a structure id, or a free-form format note.
    #[serde(default)]
    pub dataformat: Option<String>,
    #[serde(default, rename = "propoccurrence")]
    pub occurrence: Occurrence,
    /// XMP tag id as reported by ExifTool.
    #[serde(default, rename = "etTag")]
    pub xmp_id: Option<String>,
    /// IIM tag id; `A+B` declares a date tag joined with a time tag.
    #[serde(default, rename = "IIMid")]
    pub iim_id: Option<String>,
    #[serde(default, rename = "IIMname")]
    pub iim_name: Option<String>,
    #[serde(default, rename = "IIMmaxbytes")]
    pub iim_max_bytes: Option<u32>,
    /// Exif tag id.
    #[serde(default, rename = "etExif")]
    pub exif_id: Option<String>,
}

impl PropertyDef {
    pub fn has_xmp(&self) -> bool {
        self.xmp_id.is_some()
    }

    pub fn has_iim(&self) -> bool {
        self.iim_id.is_some()
    }

    pub fn has_exif(&self) -> bool {
        self.exif_id.is_some()
    }

    pub fn is_alt_lang(&self) -> bool {
        self.dataformat.as_deref() == Some(ALT_LANG)
    }

    /// The nested structure id, for `struct` properties that name a concrete
    /// structure. Language-alternative values are treated as plain scalars.
    pub fn struct_id(&self) -> Option<&str> {
        if self.datatype != Datatype::Struct {
            return None;
        }
        self.dataformat
            .as_deref()
            .filter(|format| !format.is_empty() && *format != ALT_LANG)
    }

    /// The display name, falling back to the property id.
    pub fn label<'a>(&'a self, id: &'a str) -> &'a str {
        if self.name.is_empty() { id } else { &self.name }
    }
}

/// The reference schema: top-level properties and named structures.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaModel {
    #[serde(rename = "ipmd_top")]
    pub top: PropertyMap,
    #[serde(rename = "ipmd_struct")]
    pub structs: IndexMap<String, PropertyMap>,
}

impl SchemaModel {
    /// Build the schema from an already-parsed JSON tree.
    pub fn from_value(value: &Value) -> Result<Self, SchemaError> {
        for section in ["ipmd_top", "ipmd_struct"] {
            if value.get(section).is_none() {
                return Err(SchemaError::MissingSection(section));
            }
        }
        Ok(Self::deserialize(value)?)
    }

    pub fn from_json_str(json: &str) -> Result<Self, SchemaError> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(&value)
    }

    pub fn is_empty(&self) -> bool {
        self.top.is_empty()
    }

    /// The property definitions of a named structure.
    pub fn structure(&self, id: &str) -> Option<&PropertyMap> {
        self.structs.get(id)
    }
}
