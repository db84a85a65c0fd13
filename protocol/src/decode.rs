use hashbrown::HashMap;
use serde::Deserialize;
use serde_json::Value;

use crate::*;

const REVEALED_MAP_SHAPE: &str = "list of [location, bool] pairs";

pub fn decode_bool(value: &Value) -> Result<bool, DecodeError> {
    value.as_bool().ok_or_else(|| DecodeError::UnexpectedShape {
        expected: "bool",
        found: describe(value),
    })
}

pub fn decode_amount(value: &Value, label: &'static str) -> Result<Amount, DecodeError> {
    Amount::from_value(value, label)
}

/// Revealed locations of the current round, keyed by location, valued by
/// whether the location held a treasure.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RevealedMap(HashMap<Location, bool>);

impl RevealedMap {
    pub fn get(&self, loc: Location) -> Option<bool> {
        self.0.get(&loc).copied()
    }

    pub fn insert(&mut self, loc: Location, is_treasure: bool) -> Option<bool> {
        self.0.insert(loc, is_treasure)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Location, bool)> + '_ {
        self.0.iter().map(|(&loc, &is_treasure)| (loc, is_treasure))
    }

    /// Encodes in the same shape [`decode_revealed_map`] accepts, sorted by location.
    pub fn to_value(&self) -> Value {
        let mut pairs: Vec<_> = self.iter().collect();
        pairs.sort_unstable();
        Value::Array(
            pairs
                .into_iter()
                .map(|(loc, is_treasure)| Value::Array(vec![loc.to_value(), Value::Bool(is_treasure)]))
                .collect(),
        )
    }
}

impl FromIterator<(Location, bool)> for RevealedMap {
    fn from_iter<I: IntoIterator<Item = (Location, bool)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Decodes the result of `get_revealed`.
///
/// Exactly one shape is accepted: a list of `[{"x": .., "y": ..}, bool]` pairs
/// with unique locations. Anything else is an error rather than an empty map,
/// so a decoder change on the ledger side cannot pass for "nothing revealed".
pub fn decode_revealed_map(value: &Value) -> Result<RevealedMap, DecodeError> {
    let unexpected = |found: &Value| DecodeError::UnexpectedShape {
        expected: REVEALED_MAP_SHAPE,
        found: describe(found),
    };

    let entries = value.as_array().ok_or_else(|| unexpected(value))?;
    let mut map = RevealedMap::default();
    for entry in entries {
        let [key, is_treasure] = entry.as_array().map(Vec::as_slice).unwrap_or_default() else {
            return Err(unexpected(entry));
        };
        let loc = Location::deserialize(key).map_err(|_| unexpected(key))?;
        let is_treasure = is_treasure.as_bool().ok_or_else(|| unexpected(is_treasure))?;
        if map.insert(loc, is_treasure).is_some() {
            return Err(DecodeError::UnexpectedShape {
                expected: REVEALED_MAP_SHAPE,
                found: format!("duplicate location {loc}"),
            });
        }
    }
    Ok(map)
}

fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => format!("bool {b}"),
        Value::Number(n) => format!("number {n}"),
        Value::String(s) => format!("string {s:?}"),
        Value::Array(items) => format!("list of {} items", items.len()),
        Value::Object(fields) => format!("object with {} fields", fields.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_pair_list() {
        let map = decode_revealed_map(&json!([
            [{ "x": 0, "y": 0 }, false],
            [{ "x": 3, "y": 7 }, true],
        ]))
        .unwrap();

        assert_eq!(map.len(), 2);
        assert_eq!(map.get(Location::new(3, 7)), Some(true));
        assert_eq!(map.get(Location::new(0, 0)), Some(false));
        assert_eq!(map.get(Location::new(1, 1)), None);
    }

    #[test]
    fn rejects_other_encodings() {
        // plain object keyed by stringified locations
        assert!(decode_revealed_map(&json!({ "{\"x\":1,\"y\":2}": true })).is_err());
        assert!(decode_revealed_map(&json!([[{ "x": 1, "y": 2 }]])).is_err());
        assert!(decode_revealed_map(&json!([[{ "x": 1 }, true]])).is_err());
        assert!(decode_revealed_map(&json!([[{ "x": 1, "y": 2 }, 1]])).is_err());
        assert!(decode_revealed_map(&Value::Null).is_err());
    }

    #[test]
    fn rejects_duplicate_locations() {
        let res = decode_revealed_map(&json!([
            [{ "x": 1, "y": 2 }, true],
            [{ "x": 1, "y": 2 }, false],
        ]));
        assert!(matches!(res, Err(DecodeError::UnexpectedShape { .. })));
    }

    #[test]
    fn encoding_is_accepted_by_decoder() {
        let map: RevealedMap = [(Location::new(2, 1), true), (Location::new(0, 4), false)]
            .into_iter()
            .collect();
        assert_eq!(decode_revealed_map(&map.to_value()).unwrap(), map);
    }

    #[test]
    fn decodes_bool_strictly() {
        assert_eq!(decode_bool(&json!(true)), Ok(true));
        assert!(decode_bool(&json!("true")).is_err());
    }
}
