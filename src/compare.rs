//! Comparison of two check outputs, e.g. a master image and a derivative.
//!
//! The comparator walks the reference schema in order and, for every
//! property with data in the reference value tree, looks the property up in
//! the test value tree. XMP and IIM values are compared independently and
//! each difference becomes a [`Discrepancy`] row. Nested structures are
//! compared instance by instance.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::fmt;
use std::ops::ControlFlow;

use crate::check::{CheckOutput, CompareRule};
use crate::schema::{Format, PropertyDef, PropertyMap, SchemaModel, keys};
use crate::store::{Lookup, Path, PathStore};

/// What differs between the reference and the test output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiscrepancyKind {
    ValueChanged,
    ValueMissing,
    ValueNotAnArray,
    PropertyMissing,
}

impl DiscrepancyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DiscrepancyKind::ValueChanged => "value-changed",
            DiscrepancyKind::ValueMissing => "value-missing",
            DiscrepancyKind::ValueNotAnArray => "value-not-an-array",
            DiscrepancyKind::PropertyMissing => "property-missing",
        }
    }

    fn describe(self) -> &'static str {
        match self {
            DiscrepancyKind::ValueChanged => "value changed",
            DiscrepancyKind::ValueMissing => "value missing",
            DiscrepancyKind::ValueNotAnArray => "value is not an array",
            DiscrepancyKind::PropertyMissing => "property missing",
        }
    }
}

impl fmt::Display for DiscrepancyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The format(s) a discrepancy row describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormatScope {
    #[serde(rename = "xmp")]
    Xmp,
    #[serde(rename = "iim")]
    Iim,
    /// An XMP row and an IIM row of the same kind, merged.
    #[serde(rename = "xmp+iim")]
    XmpIim,
}

impl FormatScope {
    pub fn as_str(self) -> &'static str {
        match self {
            FormatScope::Xmp => "xmp",
            FormatScope::Iim => "iim",
            FormatScope::XmpIim => "xmp+iim",
        }
    }
}

impl From<Format> for FormatScope {
    fn from(format: Format) -> Self {
        match format {
            Format::Iim => FormatScope::Iim,
            // Exif is never compared
            Format::Xmp | Format::Exif => FormatScope::Xmp,
        }
    }
}

/// One row of a comparison report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Discrepancy {
    pub kind: DiscrepancyKind,
    pub message: String,
    /// Property ids, e.g. `locationsShown/struct#1/city`.
    pub prop_path: String,
    /// Display names, e.g. `Location Shown in the Image #2 / City`.
    pub name_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<FormatScope>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_value: Option<Value>,
    /// `propId`, `label`, `sortorder` and `specidx` of the property.
    #[serde(default)]
    pub params: Map<String, Value>,
}

/// What to do when a reference property is missing from the test output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingPolicy {
    /// Report the missing property and stop comparing.
    #[default]
    Halt,
    /// Report the missing property and go on with the next one.
    Continue,
}

/// Options of a comparison run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareOptions {
    /// Compare only these top-level property ids.
    pub only: Option<Vec<String>>,
    /// Merge XMP and IIM rows of the same kind into one row.
    pub merge_formats: bool,
    pub on_missing: MissingPolicy,
}

/// Property context threaded through the walk.
struct Site<'p> {
    id: &'p str,
    def: &'p PropertyDef,
    path: &'p Path,
    names: &'p [String],
}

impl Site<'_> {
    fn label(&self) -> &str {
        self.def.label(self.id)
    }

    fn row(
        &self,
        kind: DiscrepancyKind,
        message: String,
        format: Option<FormatScope>,
        ref_value: Option<Value>,
        test_value: Option<Value>,
    ) -> Discrepancy {
        let mut params = Map::new();
        params.insert("propId".into(), json!(self.id));
        params.insert("label".into(), json!(self.label()));
        params.insert("sortorder".into(), json!(self.def.sortorder));
        params.insert("specidx".into(), json!(self.def.specidx));

        Discrepancy {
            kind,
            message,
            prop_path: self.path.to_string(),
            name_path: self.names.join(" / "),
            format,
            ref_value,
            test_value,
            params,
        }
    }
}

/// A difference in one format, before rows are merged.
struct Finding {
    format: Format,
    kind: DiscrepancyKind,
    reference: Value,
    test: Option<Value>,
}

struct Stores<'t> {
    reference: PathStore<'t>,
    test: PathStore<'t>,
}

/// Compares check outputs made with the same reference schema.
///
/// ```rust
/// use ipmd_check::check::CheckOutput;
/// use ipmd_check::compare::{Comparator, DiscrepancyKind};
/// use ipmd_check::schema::SchemaModel;
/// use serde_json::json;
///
/// let schema = SchemaModel::from_value(&json!({
///     "ipmd_top": {
///         "headline": {
///             "name": "Headline", "datatype": "string",
///             "etTag": "XMP-photoshop:Headline", "IIMid": "IPTC:Headline"
///         }
///     },
///     "ipmd_struct": {}
/// })).unwrap();
///
/// let master = CheckOutput {
///     state: json!({}),
///     value: json!({ "headline": { "xmp": "Storm", "iim": "Storm" } }),
/// };
/// let derivative = CheckOutput {
///     state: json!({}),
///     value: json!({ "headline": { "xmp": "Storm", "iim": "Calm" } }),
/// };
///
/// let rows = Comparator::new(&schema).compare(&master, &derivative);
/// assert_eq!(rows.len(), 1);
/// assert_eq!(rows[0].kind, DiscrepancyKind::ValueChanged);
/// ```
#[derive(Debug, Clone)]
pub struct Comparator<'s> {
    schema: &'s SchemaModel,
    options: CompareOptions,
}

impl<'s> Comparator<'s> {
    pub fn new(schema: &'s SchemaModel) -> Self {
        Self {
            schema,
            options: CompareOptions::default(),
        }
    }

    pub fn options(mut self, options: CompareOptions) -> Self {
        self.options = options;
        self
    }

    /// Compare `test` against `reference`. Rows follow schema order, nested
    /// structures depth-first.
    pub fn compare(&self, reference: &CheckOutput, test: &CheckOutput) -> Vec<Discrepancy> {
        let stores = Stores {
            reference: PathStore::read_only(&reference.value),
            test: PathStore::read_only(&test.value),
        };
        let mut rows = Vec::new();

        for (id, def) in &self.schema.top {
            if !self.selected(id) {
                continue;
            }
            let path = Path::key(id.as_str());
            let names = [def.label(id).to_string()];
            let site = Site {
                id,
                def,
                path: &path,
                names: &names,
            };
            if self.compare_property(&stores, &site, &mut rows).is_break() {
                log::info!("Comparison stopped at missing property {path}");
                break;
            }
        }

        log::debug!("Comparison found {} discrepancies", rows.len());
        rows
    }

    fn selected(&self, id: &str) -> bool {
        self.options
            .only
            .as_ref()
            .is_none_or(|only| only.iter().any(|wanted| wanted == id))
    }

    fn compare_property(&self, stores: &Stores<'_>, site: &Site<'_>, rows: &mut Vec<Discrepancy>) -> ControlFlow<()> {
        let Some(reference) = stores.reference.get_path(site.path).value() else {
            return ControlFlow::Continue(());
        };
        let test = match stores.test.get_path(site.path) {
            Lookup::Found(test) => test,
            lookup => {
                log::debug!("{}: not in test output: {lookup:?}", site.path);
                rows.push(site.row(
                    DiscrepancyKind::PropertyMissing,
                    format!("{}: {}", site.label(), DiscrepancyKind::PropertyMissing.describe()),
                    None,
                    None,
                    None,
                ));
                return match self.options.on_missing {
                    MissingPolicy::Halt => ControlFlow::Break(()),
                    MissingPolicy::Continue => ControlFlow::Continue(()),
                };
            }
        };

        self.compare_values(site, reference, test, rows);

        let Some(props) = site.def.struct_id().and_then(|id| self.schema.structure(id)) else {
            return ControlFlow::Continue(());
        };
        match reference.get(keys::STRUCT) {
            Some(Value::Array(instances)) => {
                for i in 0..instances.len() {
                    let mut names = site.names.to_vec();
                    if let Some(last) = names.last_mut() {
                        last.push_str(&format!(" #{}", i + 1));
                    }
                    let instance = site.path.child_indexed(keys::STRUCT, i);
                    self.compare_children(stores, props, &instance, &names, rows)?;
                }
            }
            Some(_) => {
                let instance = site.path.child(keys::STRUCT);
                self.compare_children(stores, props, &instance, site.names, rows)?;
            }
            None => {}
        }
        ControlFlow::Continue(())
    }

    fn compare_children(
        &self,
        stores: &Stores<'_>,
        props: &PropertyMap,
        instance: &Path,
        names: &[String],
        rows: &mut Vec<Discrepancy>,
    ) -> ControlFlow<()> {
        for (id, def) in props {
            let path = instance.child(id.as_str());
            let mut child_names = names.to_vec();
            child_names.push(def.label(id).to_string());
            let site = Site {
                id,
                def,
                path: &path,
                names: &child_names,
            };
            self.compare_property(stores, &site, rows)?;
        }
        ControlFlow::Continue(())
    }

    /// Compare the XMP and IIM values of one property node.
    fn compare_values(&self, site: &Site<'_>, reference: &Value, test: &Value, rows: &mut Vec<Discrepancy>) {
        let findings: Vec<Finding> = [Format::Xmp, Format::Iim]
            .into_iter()
            .filter_map(|format| {
                let ref_value = reference.get(format.key())?;
                let test_value = test.get(format.key());
                assess(ref_value, test_value).map(|kind| Finding {
                    format,
                    kind,
                    reference: ref_value.clone(),
                    test: test_value.cloned(),
                })
            })
            .collect();

        let both_defined = reference.get(keys::XMP).is_some() && reference.get(keys::IIM).is_some();
        let label = site.label();

        match findings.as_slice() {
            [xmp, iim]
                if self.options.merge_formats
                    && xmp.kind == iim.kind
                    && xmp.reference == iim.reference
                    && xmp.test == iim.test =>
            {
                rows.push(site.row(
                    xmp.kind,
                    format!("{label}: {} (XMP and IIM)", xmp.kind.describe()),
                    Some(FormatScope::XmpIim),
                    Some(xmp.reference.clone()),
                    xmp.test.clone(),
                ));
            }
            [only] if self.options.merge_formats && both_defined => {
                let note = match only.format {
                    Format::Iim => "IIM only",
                    _ => "XMP only",
                };
                rows.push(site.row(
                    only.kind,
                    format!("{label}: {} ({note})", only.kind.describe()),
                    Some(only.format.into()),
                    Some(only.reference.clone()),
                    only.test.clone(),
                ));
            }
            _ => {
                for finding in findings {
                    rows.push(site.row(
                        finding.kind,
                        format!("{label}: {} {}", finding.format.label(), finding.kind.describe()),
                        Some(finding.format.into()),
                        Some(finding.reference),
                        finding.test,
                    ));
                }
            }
        }
    }
}

/// How a test value differs from its reference value, if at all.
fn assess(reference: &Value, test: Option<&Value>) -> Option<DiscrepancyKind> {
    let Some(test) = test else {
        return Some(DiscrepancyKind::ValueMissing);
    };
    if reference.is_array() && !test.is_array() {
        return Some(DiscrepancyKind::ValueNotAnArray);
    }
    (!CompareRule::Exact.equal(reference, test)).then_some(DiscrepancyKind::ValueChanged)
}

/// Compare two check outputs made with `schema`.
pub fn compare_results(
    schema: &SchemaModel,
    reference: &CheckOutput,
    test: &CheckOutput,
    options: &CompareOptions,
) -> Vec<Discrepancy> {
    Comparator::new(schema).options(options.clone()).compare(reference, test)
}
