//! Multi-format consistency checking of one image's metadata.
//!
//! The checker walks the reference schema and, for every property, looks up
//! its XMP, IIM and Exif values in the ExifTool output of one image. It
//! produces two trees keyed by property id:
//!
//! - **state**: the state template with counters and sync flags filled in
//! - **value**: the values found, keyed `xmp`, `iim` and `exif`, with nested
//!   structures under `struct`
//!
//! Special cases (joined IIM dates, forced arrays, Exif tag fallbacks,
//! tolerant comparisons) come from a [`StrategyTable`].

mod extract;
pub mod strategy;

pub use strategy::{CameraSource, CompareRule, JoinPart, LegacySource, PropertyRule, Strategy, StrategyTable};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::borrow::Cow;

use crate::schema::{Occurrence, PropertyDef, SchemaModel, build_state_template, keys};
use crate::store::{Lookup, Path, PathStore};

/// Prefix of value-tree keys holding "any other data" tags.
pub const AOD_PREFIX: &str = "AOD_";

/// The state and value trees of one check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckOutput {
    pub state: Value,
    pub value: Value,
}

impl CheckOutput {
    /// The result of a check that could not run.
    pub fn empty() -> Self {
        Self {
            state: Value::Object(Map::new()),
            value: Value::Object(Map::new()),
        }
    }

    pub fn is_empty(&self) -> bool {
        let blank = |v: &Value| v.as_object().is_none_or(Map::is_empty);
        blank(&self.state) && blank(&self.value)
    }
}

/// Options of a check run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckOptions {
    /// Compare XMP with IIM (and Exif) and set the sync flags.
    pub compare_formats: bool,
    /// Non-IPTC tags copied verbatim into the value tree as `AOD_<tag>`.
    pub any_other_data: Vec<String>,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            compare_formats: false,
            any_other_data: [
                "File:FileType",
                "File:ImageWidth",
                "File:ImageHeight",
                "IFD0:Make",
                "IFD0:Model",
                "XMP-xmp:CreatorTool",
                "XMP-xmpMM:DocumentID",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

/// Checks ExifTool output against a reference schema.
///
/// # Example
///
/// ```rust
/// use ipmd_check::check::{CheckOptions, Checker};
/// use ipmd_check::schema::SchemaModel;
/// use serde_json::json;
///
/// let schema = SchemaModel::from_value(&json!({
///     "ipmd_top": {
///         "keywords": {
///             "name": "Keywords", "datatype": "string", "propoccurrence": "multi",
///             "etTag": "XMP-dc:Subject", "IIMid": "IPTC:Keywords"
///         }
///     },
///     "ipmd_struct": {}
/// })).unwrap();
///
/// let checker = Checker::new(&schema).options(CheckOptions {
///     compare_formats: true,
///     ..CheckOptions::default()
/// });
/// let output = checker.check(&json!({
///     "XMP-dc:Subject": ["beach", "sunset"],
///     "IPTC:Keywords": ["beach", "sunset"]
/// }));
///
/// assert_eq!(output.state["keywords"]["data"]["xmpoccur"], 2);
/// assert_eq!(output.state["keywords"]["data"]["xmpiimsync"], true);
/// assert_eq!(output.value["keywords"]["iim"], json!(["beach", "sunset"]));
/// ```
#[derive(Debug, Clone)]
pub struct Checker<'s> {
    schema: &'s SchemaModel,
    template: Cow<'s, Value>,
    strategies: StrategyTable,
    options: CheckOptions,
}

impl<'s> Checker<'s> {
    /// A checker with a state template built from `schema`.
    pub fn new(schema: &'s SchemaModel) -> Self {
        Self {
            schema,
            template: Cow::Owned(build_state_template(schema)),
            strategies: StrategyTable::standard(),
            options: CheckOptions::default(),
        }
    }

    /// A checker reusing a pre-built state template.
    pub fn with_template(schema: &'s SchemaModel, template: &'s Value) -> Self {
        Self {
            schema,
            template: Cow::Borrowed(template),
            strategies: StrategyTable::standard(),
            options: CheckOptions::default(),
        }
    }

    pub fn options(mut self, options: CheckOptions) -> Self {
        self.options = options;
        self
    }

    pub fn strategies(mut self, strategies: StrategyTable) -> Self {
        self.strategies = strategies;
        self
    }

    pub fn template(&self) -> &Value {
        &self.template
    }

    /// Check one image's ExifTool output (a flat tag → value object).
    ///
    /// An empty schema or a source that is not a non-empty object yields
    /// [`CheckOutput::empty`].
    pub fn check(&self, source: &Value) -> CheckOutput {
        if self.schema.is_empty() {
            log::warn!("Reference schema has no properties, nothing to check");
            return CheckOutput::empty();
        }
        let Some(source) = source.as_object().filter(|map| !map.is_empty()) else {
            log::warn!("Source metadata is empty or not an object, nothing to check");
            return CheckOutput::empty();
        };

        let mut state = PathStore::new(&self.template);
        let mut values = Map::new();

        for (id, def) in &self.schema.top {
            if let Some(node) = self.check_property(&mut state, &Path::key(id.as_str()), id, def, source, true) {
                values.insert(id.clone(), Value::Object(node));
            }
        }

        for tag in &self.options.any_other_data {
            if let Some(value) = extract::present(source, tag) {
                values.insert(format!("{AOD_PREFIX}{tag}"), value.clone());
            }
        }

        log::debug!(
            "Checked {} properties, {} with data",
            self.schema.top.len(),
            values.len()
        );

        CheckOutput {
            state: state.into_value(),
            value: Value::Object(values),
        }
    }

    /// Check one property against `source`, recording state under `path`.
    /// Returns the property's value node when anything was found.
    fn check_property(
        &self,
        state: &mut PathStore<'_>,
        path: &Path,
        id: &str,
        def: &PropertyDef,
        source: &Map<String, Value>,
        top_level: bool,
    ) -> Option<Map<String, Value>> {
        let strategy = self.strategies.resolve(id, def);
        let data = path.child(keys::DATA);
        let mut node = Map::new();

        // XMP
        if let Some((xmp_id, raw)) = def
            .xmp_id
            .as_deref()
            .and_then(|xmp_id| extract::present(source, xmp_id).map(|raw| (xmp_id, raw)))
        {
            record(state, &data.child(keys::XMP), json!(1));

            let occurrences = if let Some(struct_id) = def.struct_id() {
                if let Some(children) = self.check_struct(state, path, struct_id, raw) {
                    node.insert(keys::STRUCT.to_string(), children);
                }
                extract::instances(raw).len()
            } else if def.is_alt_lang() {
                node.insert(keys::XMP.to_string(), extract::alt_lang_value(source, xmp_id, raw));
                1
            } else {
                node.insert(keys::XMP.to_string(), raw.clone());
                extract::occurrence(raw)
            };

            if top_level && def.occurrence == Occurrence::Multi {
                record(state, &data.child(keys::XMP_OCCUR), json!(occurrences));
            }
        }

        // IIM
        if let Some(value) = extract::legacy_value(source, &strategy) {
            record(state, &data.child(keys::IIM), json!(1));
            node.insert(keys::IIM.to_string(), value);
        }

        // Exif
        if let Some(value) = def
            .exif_id
            .as_deref()
            .and_then(|declared| extract::camera_value(source, declared, &strategy))
        {
            record(state, &data.child(keys::EXIF), json!(1));
            node.insert(keys::EXIF.to_string(), value);
        }

        if self.options.compare_formats {
            compare_formats(state, &data, &node, &strategy.compare);
        }

        (!node.is_empty()).then_some(node)
    }

    /// Check the instances of a nested structure. The state entry at
    /// `path/struct` is reshaped to mirror the source: an array of child
    /// states for a list, a single child state otherwise.
    fn check_struct(
        &self,
        state: &mut PathStore<'_>,
        path: &Path,
        struct_id: &str,
        raw: &Value,
    ) -> Option<Value> {
        let Some(props) = self.schema.structure(struct_id) else {
            log::debug!("{path}: structure {struct_id} is not defined");
            return None;
        };

        let struct_path = path.child(keys::STRUCT);
        let child_template = match state.get_path(&struct_path) {
            Lookup::Found(template) if template.is_object() => template.clone(),
            other => {
                log::debug!("{path}: no state template for structure {struct_id}: {other:?}");
                return None;
            }
        };

        let is_list = raw.is_array();
        let instances = extract::instances(raw);
        let shaped = if is_list {
            Value::Array(vec![child_template; instances.len()])
        } else {
            child_template
        };
        record(state, &struct_path, shaped);

        let mut values = Vec::with_capacity(instances.len());
        for (i, instance) in instances.into_iter().enumerate() {
            let instance_path = if is_list {
                path.child_indexed(keys::STRUCT, i)
            } else {
                struct_path.clone()
            };
            let mut child_values = Map::new();
            match instance.as_object() {
                Some(fields) => {
                    for (child_id, child_def) in props {
                        let child_path = instance_path.child(child_id.as_str());
                        if let Some(child) =
                            self.check_property(state, &child_path, child_id, child_def, fields, false)
                        {
                            child_values.insert(child_id.clone(), Value::Object(child));
                        }
                    }
                }
                None => log::debug!("{instance_path}: structure instance is not an object"),
            }
            values.push(Value::Object(child_values));
        }

        Some(if is_list {
            Value::Array(values)
        } else {
            values.into_iter().next().unwrap_or_default()
        })
    }
}

/// Set the sync flags of one property from its extracted values. Exif is
/// only compared with XMP, and only once XMP and IIM agree.
fn compare_formats(state: &mut PathStore<'_>, data: &Path, node: &Map<String, Value>, rule: &CompareRule) {
    let (Some(xmp), Some(iim)) = (node.get(keys::XMP), node.get(keys::IIM)) else {
        return;
    };
    let in_sync = rule.equal(xmp, iim);
    record(state, &data.child(keys::XMP_IIM_SYNC), json!(in_sync));

    if in_sync {
        if let Some(exif) = node.get(keys::EXIF) {
            record(state, &data.child(keys::EXIF_MAP_SYNC), json!(rule.equal(xmp, exif)));
        }
    }
}

fn record(state: &mut PathStore<'_>, path: &Path, value: Value) {
    if let Lookup::Error(msg) = state.set_path(value, path) {
        log::debug!("State not recorded: {msg}");
    }
}

/// Check with a schema given as raw JSON.
///
/// A schema that cannot be read, an empty schema, or an empty source all
/// yield [`CheckOutput::empty`]; nothing partial is returned.
pub fn check_ipmd(
    schema: &Value,
    template: Option<&Value>,
    source: &Value,
    options: &CheckOptions,
) -> CheckOutput {
    let schema = match SchemaModel::from_value(schema) {
        Ok(schema) => schema,
        Err(e) => {
            log::warn!("Cannot check metadata: {e}");
            return CheckOutput::empty();
        }
    };
    let checker = match template {
        Some(template) => Checker::with_template(&schema, template),
        None => Checker::new(&schema),
    };
    checker.options(options.clone()).check(source)
}
