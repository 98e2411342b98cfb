use serde_json::{Map, Value};

use super::strategy::{CameraSource, JoinPart, LegacySource, Strategy, scalar_text};

/// A tag's value, ignoring tags ExifTool reported as null.
pub(crate) fn present<'v>(source: &'v Map<String, Value>, tag: &str) -> Option<&'v Value> {
    source.get(tag).filter(|v| !v.is_null())
}

/// Number of values a raw XMP value holds.
pub(crate) fn occurrence(value: &Value) -> usize {
    match value {
        Value::Array(items) => items.len(),
        _ => 1,
    }
}

/// Structure instances of a raw XMP value, one or many.
pub(crate) fn instances(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    }
}

/// Wrap a scalar into a one-element array; arrays pass through.
pub(crate) fn into_array(value: Value) -> Value {
    match value {
        Value::Array(_) => value,
        other => Value::Array(vec![other]),
    }
}

/// Concatenate the text of several tags. Every tag must be present and
/// scalar.
pub(crate) fn join_tags(source: &Map<String, Value>, parts: &[JoinPart]) -> Option<Value> {
    let mut joined = String::new();
    for part in parts {
        let text = scalar_text(present(source, &part.tag)?)?;
        joined.push_str(&part.prefix);
        joined.push_str(&text);
    }
    Some(Value::String(joined))
}

/// Merge a language-alternative value with its translations.
///
/// ExifTool reports translations as sibling tags named `<tag>-<lang>`; each
/// is appended to the default value as ` {@<lang>}<text>`.
pub(crate) fn alt_lang_value(source: &Map<String, Value>, tag: &str, base: &Value) -> Value {
    let Some(base_text) = scalar_text(base) else {
        return base.clone();
    };
    let mut merged = base_text.into_owned();
    for (key, value) in source {
        let Some(lang) = key.strip_prefix(tag).and_then(|rest| rest.strip_prefix('-')) else {
            continue;
        };
        if !is_language_tag(lang) {
            continue;
        }
        if let Some(text) = scalar_text(value) {
            merged.push_str(&format!(" {{@{lang}}}{text}"));
        }
    }
    Value::String(merged)
}

fn is_language_tag(lang: &str) -> bool {
    !lang.is_empty() && lang.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

/// The IIM value of a property, if its tag (or all joined tags) exist.
pub(crate) fn legacy_value(source: &Map<String, Value>, strategy: &Strategy<'_>) -> Option<Value> {
    let value = match strategy.legacy.as_ref()? {
        LegacySource::Tag(tag) => present(source, tag)?.clone(),
        LegacySource::Joined(parts) => join_tags(source, parts)?,
    };
    Some(if strategy.force_iim_array {
        into_array(value)
    } else {
        value
    })
}

/// The Exif value of a property: the first populated candidate, else the
/// declared tag itself.
pub(crate) fn camera_value(
    source: &Map<String, Value>,
    declared: &str,
    strategy: &Strategy<'_>,
) -> Option<Value> {
    strategy
        .camera
        .iter()
        .find_map(|candidate| candidate_value(source, candidate))
        .or_else(|| present(source, declared).cloned())
}

fn candidate_value(source: &Map<String, Value>, candidate: &CameraSource) -> Option<Value> {
    match candidate {
        CameraSource::Joined { parts, unless } => {
            if unless.iter().any(|tag| present(source, tag).is_some()) {
                return None;
            }
            join_tags(source, parts)
        }
        CameraSource::Tag { tag, as_array } => {
            let value = present(source, tag)?.clone();
            Some(if *as_array { into_array(value) } else { value })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::strategy::{CompareRule, StrategyTable};
    use crate::schema::tests::sample_schema;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    // ── helpers ──────────────────────────────────────────────────────

    #[test]
    fn present_skips_null() {
        let source = map(json!({ "a": null, "b": "x" }));
        assert!(present(&source, "a").is_none());
        assert!(present(&source, "missing").is_none());
        assert_eq!(present(&source, "b"), Some(&json!("x")));
    }

    #[test]
    fn occurrence_and_instances() {
        assert_eq!(occurrence(&json!(["a", "b", "c"])), 3);
        assert_eq!(occurrence(&json!("a")), 1);
        assert_eq!(instances(&json!({ "City": "Rome" })).len(), 1);
        assert_eq!(instances(&json!([{ "City": "Rome" }, { "City": "Oslo" }])).len(), 2);
    }

    #[test]
    fn into_array_wraps_scalars_only() {
        assert_eq!(into_array(json!("Ann")), json!(["Ann"]));
        assert_eq!(into_array(json!(["Ann", "Bob"])), json!(["Ann", "Bob"]));
    }

    #[test]
    fn join_requires_every_tag() {
        let parts = [JoinPart::new("", "D"), JoinPart::new(" ", "T")];
        let both = map(json!({ "D": "2021:03:04", "T": "10:11:12+01:00" }));
        assert_eq!(join_tags(&both, &parts), Some(json!("2021:03:04 10:11:12+01:00")));

        let date_only = map(json!({ "D": "2021:03:04" }));
        assert_eq!(join_tags(&date_only, &parts), None);
    }

    // ── alt-lang ─────────────────────────────────────────────────────

    #[test]
    fn alt_lang_merges_translations_in_source_order() {
        let source = map(json!({
            "XMP-dc:Title": "Sunset",
            "XMP-dc:Title-de": "Sonnenuntergang",
            "XMP-dc:TitleExtra": "unrelated",
            "XMP-dc:Title-fr": "Coucher de soleil"
        }));
        let merged = alt_lang_value(&source, "XMP-dc:Title", &source["XMP-dc:Title"]);
        assert_eq!(
            merged,
            json!("Sunset {@de}Sonnenuntergang {@fr}Coucher de soleil")
        );
    }

    #[test]
    fn alt_lang_without_translations_is_base() {
        let source = map(json!({ "XMP-dc:Title": "Sunset" }));
        assert_eq!(
            alt_lang_value(&source, "XMP-dc:Title", &source["XMP-dc:Title"]),
            json!("Sunset")
        );
    }

    // ── IIM ──────────────────────────────────────────────────────────

    #[test]
    fn legacy_creator_forced_to_array() {
        let schema = sample_schema();
        let table = StrategyTable::standard();
        let strategy = table.resolve("creatorNames", &schema.top["creatorNames"]);
        let source = map(json!({ "IPTC:By-line": "Ann" }));
        assert_eq!(legacy_value(&source, &strategy), Some(json!(["Ann"])));
    }

    #[test]
    fn legacy_date_time_needs_both_tags() {
        let schema = sample_schema();
        let table = StrategyTable::standard();
        let strategy = table.resolve("dateCreated", &schema.top["dateCreated"]);

        let full = map(json!({ "IPTC:DateCreated": "2021:03:04", "IPTC:TimeCreated": "10:11:12+01:00" }));
        assert_eq!(legacy_value(&full, &strategy), Some(json!("2021:03:04 10:11:12+01:00")));

        let date_only = map(json!({ "IPTC:DateCreated": "2021:03:04" }));
        assert_eq!(legacy_value(&date_only, &strategy), None);
    }

    #[test]
    fn legacy_undefined_is_none() {
        let strategy = Strategy {
            legacy: None,
            force_iim_array: false,
            camera: &[],
            compare: CompareRule::Exact,
        };
        let source = map(json!({ "IPTC:Headline": "x" }));
        assert_eq!(legacy_value(&source, &strategy), None);
    }

    // ── Exif ─────────────────────────────────────────────────────────

    #[test]
    fn camera_date_time_with_zone_wins() {
        let schema = sample_schema();
        let table = StrategyTable::standard();
        let strategy = table.resolve("dateCreated", &schema.top["dateCreated"]);
        let source = map(json!({
            "ExifIFD:DateTimeOriginal": "2021:03:04 10:11:12",
            "ExifIFD:OffsetTimeOriginal": "+01:00",
            "EXIF:DateTimeOriginal": "ignored"
        }));
        assert_eq!(
            camera_value(&source, "EXIF:DateTimeOriginal", &strategy),
            Some(json!("2021:03:04 10:11:12+01:00"))
        );
    }

    #[test]
    fn camera_date_time_with_sub_seconds_wins() {
        let schema = sample_schema();
        let table = StrategyTable::standard();
        let strategy = table.resolve("dateCreated", &schema.top["dateCreated"]);
        let source = map(json!({
            "ExifIFD:DateTimeOriginal": "2021:03:04 10:11:12",
            "ExifIFD:SubSecTimeOriginal": "25",
            "ExifIFD:OffsetTimeOriginal": "+01:00",
            "EXIF:DateTimeOriginal": "ignored"
        }));
        assert_eq!(
            camera_value(&source, "EXIF:DateTimeOriginal", &strategy),
            Some(json!("2021:03:04 10:11:12.25+01:00"))
        );
    }

    #[test]
    fn camera_sub_seconds_without_zone_use_declared_tag() {
        let schema = sample_schema();
        let table = StrategyTable::standard();
        let strategy = table.resolve("dateCreated", &schema.top["dateCreated"]);
        let source = map(json!({
            "ExifIFD:DateTimeOriginal": "2021:03:04 10:11:12",
            "ExifIFD:SubSecTimeOriginal": "25",
            "EXIF:DateTimeOriginal": "2021:03:04 10:11:12"
        }));
        assert_eq!(
            camera_value(&source, "EXIF:DateTimeOriginal", &strategy),
            Some(json!("2021:03:04 10:11:12"))
        );
    }

    #[test]
    fn camera_falls_back_to_declared_tag() {
        let schema = sample_schema();
        let table = StrategyTable::standard();
        let strategy = table.resolve("dateCreated", &schema.top["dateCreated"]);
        let source = map(json!({
            "ExifIFD:DateTimeOriginal": "2021:03:04 10:11:12",
            "EXIF:DateTimeOriginal": "2021:03:04 10:11:12"
        }));
        assert_eq!(
            camera_value(&source, "EXIF:DateTimeOriginal", &strategy),
            Some(json!("2021:03:04 10:11:12"))
        );
    }

    #[test]
    fn camera_description_fallback_tag() {
        let schema = sample_schema();
        let table = StrategyTable::standard();
        let strategy = table.resolve("description", &schema.top["description"]);
        let source = map(json!({ "IFD0:ImageDescription": "A beach" }));
        assert_eq!(
            camera_value(&source, "EXIF:ImageDescription", &strategy),
            Some(json!("A beach"))
        );
    }

    #[test]
    fn camera_artist_forced_to_array() {
        let schema = sample_schema();
        let table = StrategyTable::standard();
        let strategy = table.resolve("creatorNames", &schema.top["creatorNames"]);
        let source = map(json!({ "IFD0:Artist": "Ann" }));
        assert_eq!(camera_value(&source, "EXIF:Artist", &strategy), Some(json!(["Ann"])));
    }

    #[test]
    fn camera_nothing_found() {
        let schema = sample_schema();
        let table = StrategyTable::standard();
        let strategy = table.resolve("creatorNames", &schema.top["creatorNames"]);
        let source = map(json!({ "XMP-dc:Creator": ["Ann"] }));
        assert_eq!(camera_value(&source, "EXIF:Artist", &strategy), None);
    }
}
