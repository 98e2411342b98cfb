use serde_json::{Map, Value, json};

use super::{Occurrence, PropertyDef, SchemaModel, keys};

/// The `data` record layouts, chosen by which formats a property defines.
/// Every layout carries the XMP counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Preset {
    XmpOnly,
    XmpIim,
    XmpExif,
    AllFormats,
}

impl Preset {
    fn for_property(def: &PropertyDef) -> Self {
        match (def.has_iim(), def.has_exif()) {
            (false, false) => Preset::XmpOnly,
            (true, false) => Preset::XmpIim,
            (false, true) => Preset::XmpExif,
            (true, true) => Preset::AllFormats,
        }
    }

    fn counters(self) -> &'static [&'static str] {
        match self {
            Preset::XmpOnly => &[],
            Preset::XmpIim => &[keys::IIM],
            Preset::XmpExif => &[keys::EXIF],
            Preset::AllFormats => &[keys::IIM, keys::EXIF],
        }
    }

    fn sync_flags(self) -> &'static [&'static str] {
        match self {
            Preset::XmpOnly | Preset::XmpExif => &[],
            Preset::XmpIim => &[keys::XMP_IIM_SYNC],
            Preset::AllFormats => &[keys::XMP_IIM_SYNC, keys::EXIF_MAP_SYNC],
        }
    }
}

/// Build the empty state tree for a schema.
///
/// Each top-level property gets a `data` record with zeroed counters and
/// unset sync flags for the formats the schema defines for it. Properties
/// naming a concrete structure also get a `struct` entry holding the child
/// template. The occurrence counter exists only at the top level.
///
/// ```rust
/// use ipmd_check::schema::{SchemaModel, build_state_template};
/// use serde_json::json;
///
/// let schema = SchemaModel::from_value(&json!({
///     "ipmd_top": {
///         "keywords": {
///             "datatype": "string", "propoccurrence": "multi",
///             "etTag": "XMP-dc:Subject", "IIMid": "IPTC:Keywords"
///         }
///     },
///     "ipmd_struct": {}
/// })).unwrap();
///
/// let template = build_state_template(&schema);
/// assert_eq!(
///     template["keywords"]["data"],
///     json!({ "xmp": 0, "xmpoccur": 0, "iim": 0, "xmpiimsync": false })
/// );
/// ```
pub fn build_state_template(schema: &SchemaModel) -> Value {
    let mut visiting = Vec::new();
    let template: Map<String, Value> = schema
        .top
        .iter()
        .map(|(id, def)| (id.clone(), property_template(schema, def, true, &mut visiting)))
        .collect();
    Value::Object(template)
}

fn property_template(
    schema: &SchemaModel,
    def: &PropertyDef,
    top_level: bool,
    visiting: &mut Vec<String>,
) -> Value {
    let mut node = Map::new();
    node.insert(keys::DATA.to_string(), Value::Object(data_preset(def, top_level)));

    if let Some(struct_id) = def.struct_id() {
        if let Some(child) = struct_template(schema, struct_id, visiting) {
            node.insert(keys::STRUCT.to_string(), child);
        }
    }

    Value::Object(node)
}

fn data_preset(def: &PropertyDef, top_level: bool) -> Map<String, Value> {
    let preset = Preset::for_property(def);
    let mut data = Map::new();
    data.insert(keys::XMP.to_string(), json!(0));
    if top_level && def.occurrence == Occurrence::Multi {
        data.insert(keys::XMP_OCCUR.to_string(), json!(0));
    }
    for counter in preset.counters() {
        data.insert(counter.to_string(), json!(0));
    }
    for flag in preset.sync_flags() {
        data.insert(flag.to_string(), json!(false));
    }
    data
}

fn struct_template(schema: &SchemaModel, struct_id: &str, visiting: &mut Vec<String>) -> Option<Value> {
    if visiting.iter().any(|id| id == struct_id) {
        log::warn!("Structure {struct_id} nests itself, not expanding it again");
        return None;
    }
    let Some(props) = schema.structure(struct_id) else {
        log::warn!("Structure {struct_id} is not defined in the reference schema");
        return None;
    };

    visiting.push(struct_id.to_string());
    let child: Map<String, Value> = props
        .iter()
        .map(|(id, def)| (id.clone(), property_template(schema, def, false, visiting)))
        .collect();
    visiting.pop();

    Some(Value::Object(child))
}
