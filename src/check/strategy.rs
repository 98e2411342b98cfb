//! Per-property extraction and comparison rules.
//!
//! The IPTC standard maps most properties one-to-one between XMP, IIM and
//! Exif, but a handful need special handling: IIM splits dates over two
//! records, ExifTool reports Exif tags under group names the schema does not
//! use, and some values only compare equal after normalization. Those rules
//! are kept as data in a [`StrategyTable`] keyed by property id (or by the
//! declared Exif tag id) instead of being hard-wired into the checker.

use serde_json::Value;
use std::borrow::Cow;
use std::collections::HashMap;

use crate::schema::PropertyDef;

pub const CREATOR_NAMES: &str = "creatorNames";
pub const SUBJECT_CODES: &str = "subjectCodes";
pub const DATE_CREATED: &str = "dateCreated";

/// Namespace marker IIM puts in front of subject codes.
pub const SUBJECT_CODE_PREFIX: &str = "IPTC:";

/// Separator between composite tag ids, e.g. `IPTC:DateCreated+IPTC:TimeCreated`.
const COMPOSITE_SEP: char = '+';

/// One tag of a joined value, with the text placed before it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinPart {
    pub prefix: String,
    pub tag: String,
}

impl JoinPart {
    pub fn new(prefix: &str, tag: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            tag: tag.to_string(),
        }
    }
}

/// Where the IIM value of a property comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LegacySource {
    Tag(String),
    /// Several tags joined with a single space; all must be present.
    Joined(Vec<JoinPart>),
}

impl LegacySource {
    /// Interpret a declared IIM id; `A+B` joins tag `A` and tag `B`.
    pub fn from_declared(id: &str) -> Self {
        if !id.contains(COMPOSITE_SEP) {
            return LegacySource::Tag(id.to_string());
        }
        let parts = id
            .split(COMPOSITE_SEP)
            .enumerate()
            .map(|(i, tag)| JoinPart::new(if i == 0 { "" } else { " " }, tag))
            .collect();
        LegacySource::Joined(parts)
    }
}

/// A candidate location of an Exif value in ExifTool output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CameraSource {
    /// Several tags concatenated; all must be present and none of the
    /// `unless` tags may be.
    Joined { parts: Vec<JoinPart>, unless: Vec<String> },
    /// A single tag, optionally wrapped into a one-element array.
    Tag { tag: String, as_array: bool },
}

/// How two values of the same property are judged equal.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CompareRule {
    #[default]
    Exact,
    /// `prefix + xmp` must occur inside the other value.
    PrefixedSubstring { prefix: String },
    /// A trailing UTC zone marker is ignored on both sides.
    StripZone,
    /// Only the default-language text before the first `{@lang}` marker counts.
    DefaultLanguage,
}

impl CompareRule {
    /// Arrays are compared element-wise and must have the same length; an
    /// array never equals a non-array.
    pub fn equal(&self, xmp: &Value, other: &Value) -> bool {
        match (xmp, other) {
            (Value::Array(left), Value::Array(right)) => {
                left.len() == right.len()
                    && left.iter().zip(right).all(|(l, r)| self.scalar_equal(l, r))
            }
            (Value::Array(_), _) | (_, Value::Array(_)) => false,
            _ => self.scalar_equal(xmp, other),
        }
    }

    fn scalar_equal(&self, xmp: &Value, other: &Value) -> bool {
        let (Some(left), Some(right)) = (scalar_text(xmp), scalar_text(other)) else {
            return xmp == other;
        };
        match self {
            CompareRule::Exact => left == right,
            CompareRule::PrefixedSubstring { prefix } => right.contains(&format!("{prefix}{left}")),
            CompareRule::StripZone => strip_zone(&left) == strip_zone(&right),
            CompareRule::DefaultLanguage => default_language(&left) == default_language(&right),
        }
    }
}

/// Text form of a scalar; `None` for null, arrays and objects.
pub fn scalar_text(value: &Value) -> Option<Cow<'_, str>> {
    match value {
        Value::String(s) => Some(Cow::Borrowed(s)),
        Value::Number(n) => Some(Cow::Owned(n.to_string())),
        Value::Bool(b) => Some(Cow::Owned(b.to_string())),
        _ => None,
    }
}

fn strip_zone(s: &str) -> &str {
    s.strip_suffix('Z')
        .or_else(|| s.strip_suffix("+00:00"))
        .unwrap_or(s)
}

fn default_language(s: &str) -> &str {
    s.split(" {@").next().unwrap_or(s)
}

/// Overrides for one property id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyRule {
    /// Wrap a scalar IIM value into a one-element array.
    pub force_iim_array: bool,
    pub compare: Option<CompareRule>,
}

/// The rules that apply to one property during a check.
#[derive(Debug, Clone, PartialEq)]
pub struct Strategy<'a> {
    pub legacy: Option<LegacySource>,
    pub force_iim_array: bool,
    /// Exif candidates, tried in order before the declared id.
    pub camera: &'a [CameraSource],
    pub compare: CompareRule,
}

/// Property and Exif rules, looked up by id.
#[derive(Debug, Clone, Default)]
pub struct StrategyTable {
    properties: HashMap<String, PropertyRule>,
    camera: HashMap<String, Vec<CameraSource>>,
}

impl StrategyTable {
    /// A table with no special cases.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The rules of the IPTC reference schema.
    pub fn standard() -> Self {
        let date_time = "ExifIFD:DateTimeOriginal";
        let offset = "ExifIFD:OffsetTimeOriginal";
        let sub_sec = "ExifIFD:SubSecTimeOriginal";

        Self::empty()
            .with_property(
                CREATOR_NAMES,
                PropertyRule {
                    force_iim_array: true,
                    compare: None,
                },
            )
            .with_property(
                SUBJECT_CODES,
                PropertyRule {
                    force_iim_array: false,
                    compare: Some(CompareRule::PrefixedSubstring {
                        prefix: SUBJECT_CODE_PREFIX.to_string(),
                    }),
                },
            )
            .with_property(
                DATE_CREATED,
                PropertyRule {
                    force_iim_array: false,
                    compare: Some(CompareRule::StripZone),
                },
            )
            .with_camera(
                "EXIF:DateTimeOriginal",
                vec![
                    CameraSource::Joined {
                        parts: vec![JoinPart::new("", date_time), JoinPart::new("", offset)],
                        unless: vec![sub_sec.to_string()],
                    },
                    CameraSource::Joined {
                        parts: vec![
                            JoinPart::new("", date_time),
                            JoinPart::new(".", sub_sec),
                            JoinPart::new("", offset),
                        ],
                        unless: Vec::new(),
                    },
                ],
            )
            .with_camera(
                "EXIF:ImageDescription",
                vec![CameraSource::Tag {
                    tag: "IFD0:ImageDescription".to_string(),
                    as_array: false,
                }],
            )
            .with_camera(
                "EXIF:Artist",
                vec![CameraSource::Tag {
                    tag: "IFD0:Artist".to_string(),
                    as_array: true,
                }],
            )
    }

    pub fn with_property(mut self, id: &str, rule: PropertyRule) -> Self {
        self.properties.insert(id.to_string(), rule);
        self
    }

    /// Register Exif candidates for a declared Exif tag id.
    pub fn with_camera(mut self, exif_id: &str, sources: Vec<CameraSource>) -> Self {
        self.camera.insert(exif_id.to_string(), sources);
        self
    }

    /// Combine the table with a property definition.
    pub fn resolve(&self, id: &str, def: &PropertyDef) -> Strategy<'_> {
        let rule = self.properties.get(id);
        let compare = match rule.and_then(|r| r.compare.clone()) {
            Some(compare) => compare,
            None if def.is_alt_lang() => CompareRule::DefaultLanguage,
            None => CompareRule::Exact,
        };
        let camera = def
            .exif_id
            .as_deref()
            .and_then(|exif_id| self.camera.get(exif_id))
            .map(Vec::as_slice)
            .unwrap_or(&[]);

        Strategy {
            legacy: def.iim_id.as_deref().map(LegacySource::from_declared),
            force_iim_array: rule.is_some_and(|r| r.force_iim_array),
            camera,
            compare,
        }
    }
}
