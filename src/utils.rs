//! Small free-standing helpers shared across modules.

use std::collections::BTreeMap;

/// Parse a `k=v;k2=v2` list into an ordered map, skipping empty segments.
///
/// Used for `ingress_additional_annotations` (§6).
pub fn parse_kv_pairs(input: &str) -> BTreeMap<String, String> {
    input
        .split(';')
        .filter(|segment| !segment.trim().is_empty())
        .filter_map(|segment| segment.split_once('='))
        .map(|(k, v)| (k.trim().to_owned(), v.trim().to_owned()))
        .collect()
}
