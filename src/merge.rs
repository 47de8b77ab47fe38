use serde::Serialize;
use serde_json::{Map, Value};

/// Merge `source` into `target` in place.
///
/// Object values merge key by key, recursively. Anything else (scalars,
/// arrays, `null`, or an object replacing a non-object) overwrites.
pub fn deep_merge(target: &mut Map<String, Value>, source: Map<String, Value>) {
    for (key, incoming) in source {
        match (target.get_mut(&key), incoming) {
            (Some(Value::Object(existing)), Value::Object(nested)) => deep_merge(existing, nested),
            (_, incoming) => {
                target.insert(key, incoming);
            }
        }
    }
}

/// Serialize `partial` and return it if it is a JSON object.
///
/// Returns `None` for non-object values and for values that fail to
/// serialize; callers treat both as a no-op merge.
pub fn to_object<T: Serialize>(partial: T) -> Option<Map<String, Value>> {
    match serde_json::to_value(partial) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Build a nested object from a dotted path: `("user.id", v)` becomes
/// `{"user": {"id": v}}`. Empty segments are kept verbatim.
pub fn nest_dotted(path: &str, value: Value) -> Map<String, Value> {
    let mut segments = path.rsplit('.');
    let mut map = Map::new();
    let last = segments.next().unwrap_or(path);
    map.insert(last.to_string(), value);
    for segment in segments {
        let mut outer = Map::new();
        outer.insert(segment.to_string(), Value::Object(map));
        map = outer;
    }
    map
}
