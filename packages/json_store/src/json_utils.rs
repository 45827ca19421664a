use serde_json::value::Value as JsonValue;
use serde_json::Map;

use filedoc_store::{Accessor, FieldPath, FieldPathError};

/// Most `null` slots a single write may add past the end of an array.
pub const MAX_INDEX_GAP: usize = 1 << 16;

/// A resolved position inside a document: a container plus the terminal key or index in it.
#[derive(Debug)]
pub enum Location<'doc> {
    Property {
        object: &'doc mut Map<String, JsonValue>,
        name: String,
    },
    Index {
        array: &'doc mut Vec<JsonValue>,
        index: usize,
    },
}

impl<'doc> Location<'doc> {
    pub fn get(&self) -> Option<&JsonValue> {
        match self {
            Location::Property { object, name } => object.get(name),
            Location::Index { array, index } => array.get(*index),
        }
    }

    /// Writes `value` at this location.
    ///
    /// Indexes past the end of the array pad the gap with `null`, up to [`MAX_INDEX_GAP`] slots.
    pub fn set(self, value: JsonValue) -> Result<(), FieldPathError> {
        match self {
            Location::Property { object, name } => {
                object.insert(name, value);
            }
            Location::Index { array, index } => {
                pad_to(array, index)?;
                array[index] = value;
            }
        }
        Ok(())
    }

    /// Removes the value at this location.  Array elements are spliced out, so later elements
    /// shift down by one.
    pub fn delete(self) -> Option<JsonValue> {
        match self {
            Location::Property { object, name } => object.remove(&name),
            Location::Index { array, index } => {
                if index < array.len() {
                    Some(array.remove(index))
                } else {
                    None
                }
            }
        }
    }
}

/// Grows `array` with `null` until `index` is in bounds.
fn pad_to(array: &mut Vec<JsonValue>, index: usize) -> Result<(), FieldPathError> {
    let len = array.len();
    if index < len {
        return Ok(());
    }

    let out_of_range = FieldPathError::IndexOutOfRange {
        index,
        len,
        max_gap: MAX_INDEX_GAP,
    };
    if index - len > MAX_INDEX_GAP {
        return Err(out_of_range);
    }
    let new_len = index.checked_add(1).ok_or(out_of_range)?;
    array.resize(new_len, JsonValue::Null);
    Ok(())
}

pub fn value_type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

fn empty_container_for(accessor: &Accessor) -> JsonValue {
    match accessor {
        Accessor::Property(_) => JsonValue::Object(Map::new()),
        Accessor::Index(_) => JsonValue::Array(Vec::new()),
    }
}

fn type_mismatch(
    path: &FieldPath,
    depth: usize,
    accessor: &Accessor,
    found: &JsonValue,
) -> FieldPathError {
    let traversed = path.prefix_string(depth);
    FieldPathError::TypeMismatch {
        path: if traversed.is_empty() {
            "(root)".to_string()
        } else {
            traversed
        },
        expected: accessor.container_kind(),
        found: value_type_name(found),
    }
}

fn terminal_location<'tree>(
    path: &FieldPath,
    depth: usize,
    terminal: &Accessor,
    cursor: &'tree mut JsonValue,
) -> Result<Location<'tree>, FieldPathError> {
    match (terminal, cursor) {
        (Accessor::Property(name), JsonValue::Object(object)) => Ok(Location::Property {
            object,
            name: name.clone(),
        }),
        (Accessor::Index(index), JsonValue::Array(array)) => Ok(Location::Index {
            array,
            index: *index,
        }),
        (terminal, other) => Err(type_mismatch(path, depth, terminal, other)),
    }
}

/// Walks `tree` to the container holding the final accessor of `path`, creating what is missing.
fn create_location<'tree>(
    tree: &'tree mut JsonValue,
    path: &FieldPath,
) -> Result<Location<'tree>, FieldPathError> {
    let accessors = path.accessors();
    let (terminal, parents) = accessors.split_last().ok_or(FieldPathError::Empty)?;

    let mut cursor: &mut JsonValue = tree;
    for (depth, accessor) in parents.iter().enumerate() {
        if cursor.is_null() {
            *cursor = empty_container_for(accessor);
        }

        cursor = match (accessor, cursor) {
            (Accessor::Property(name), JsonValue::Object(map)) => {
                map.entry(name.clone()).or_insert(JsonValue::Null)
            }
            (Accessor::Index(index), JsonValue::Array(arr)) => {
                pad_to(arr, *index)?;
                &mut arr[*index]
            }
            (accessor, other) => return Err(type_mismatch(path, depth, accessor, other)),
        };
    }

    if cursor.is_null() {
        *cursor = empty_container_for(terminal);
    }
    terminal_location(path, parents.len(), terminal, cursor)
}

/// Walks `tree` to the container holding the final accessor of `path`.
///
/// With `create`, missing or `null` intermediates are replaced by an empty object when the
/// accessor reaching into them is a property and an empty array when it is an index; a missing
/// array slot is padded with `null` first.  Without `create`, a missing intermediate yields
/// `Ok(None)`.
///
/// Reaching into anything that is not a container of the right kind is a `TypeMismatch`.
/// Padding more than [`MAX_INDEX_GAP`] slots is an `IndexOutOfRange`.
pub fn resolve_location<'tree>(
    tree: &'tree mut JsonValue,
    path: &FieldPath,
    create: bool,
) -> Result<Option<Location<'tree>>, FieldPathError> {
    if create {
        return create_location(tree, path).map(Some);
    }

    let accessors = path.accessors();
    let (terminal, parents) = accessors.split_last().ok_or(FieldPathError::Empty)?;

    let mut cursor: &mut JsonValue = tree;
    for (depth, accessor) in parents.iter().enumerate() {
        cursor = match (accessor, cursor) {
            (Accessor::Property(name), JsonValue::Object(map)) => match map.get_mut(name) {
                Some(entry) => entry,
                None => return Ok(None),
            },
            (Accessor::Index(index), JsonValue::Array(arr)) => match arr.get_mut(*index) {
                Some(entry) => entry,
                None => return Ok(None),
            },
            (accessor, other) => return Err(type_mismatch(path, depth, accessor, other)),
        };
    }

    terminal_location(path, parents.len(), terminal, cursor).map(Some)
}

pub fn get_path<'tree>(
    tree: &'tree JsonValue,
    path: &FieldPath,
) -> Result<Option<&'tree JsonValue>, FieldPathError> {
    let mut cursor: &JsonValue = tree;
    for (depth, accessor) in path.accessors().iter().enumerate() {
        cursor = match (accessor, cursor) {
            (Accessor::Property(name), JsonValue::Object(map)) => match map.get(name) {
                Some(entry) => entry,
                None => return Ok(None),
            },
            (Accessor::Index(index), JsonValue::Array(arr)) => match arr.get(*index) {
                Some(entry) => entry,
                None => return Ok(None),
            },
            (accessor, other) => return Err(type_mismatch(path, depth, accessor, other)),
        };
    }

    Ok(Some(cursor))
}

/// Sets `value` at `path`, creating intermediate containers as needed.
pub fn set_path(
    tree: &mut JsonValue,
    path: &FieldPath,
    value: JsonValue,
) -> Result<(), FieldPathError> {
    create_location(tree, path)?.set(value)
}

/// Deletes the value at `path`.  A missing value (or missing intermediate) is a no-op.
pub fn delete_path(
    tree: &mut JsonValue,
    path: &FieldPath,
) -> Result<Option<JsonValue>, FieldPathError> {
    Ok(resolve_location(tree, path, false)?.and_then(Location::delete))
}

/// Direct assignment of a single top-level property, bypassing field-path parsing.
///
/// A document that is not an object is replaced by one.
pub fn set_property(tree: &mut JsonValue, name: &str, value: JsonValue) {
    if !tree.is_object() {
        *tree = JsonValue::Object(Map::new());
    }
    if let JsonValue::Object(map) = tree {
        map.insert(name.to_string(), value);
    }
}

/// Direct removal of a single top-level property, bypassing field-path parsing.
pub fn delete_property(tree: &mut JsonValue, name: &str) -> Option<JsonValue> {
    match tree {
        JsonValue::Object(map) => map.remove(name),
        _ => None,
    }
}


#[cfg(test)]
mod set_path_tests {
    use super::*;
    use serde_json::json;

    fn fp(s: &str) -> FieldPath {
        FieldPath::parse(s).unwrap()
    }

    #[test]
    fn creates_intermediate_containers() {
        let mut tree = json!({});
        set_path(&mut tree, &fp("a.b[0]"), json!(5)).unwrap();
        assert_eq!(tree, json!({"a": {"b": [5]}}));

        set_path(&mut tree, &fp("a.list[0].name"), json!("x")).unwrap();
        assert_eq!(tree, json!({"a": {"b": [5], "list": [{"name": "x"}]}}));
    }

    #[test]
    fn replaces_and_appends() {
        let mut tree = json!({"list": [1, 2]});
        set_path(&mut tree, &fp("list[0]"), json!(10)).unwrap();
        set_path(&mut tree, &fp("list[2]"), json!(3)).unwrap();
        assert_eq!(tree, json!({"list": [10, 2, 3]}));
    }

    #[test]
    fn pads_arrays_with_null() {
        let mut tree = json!({});
        set_path(&mut tree, &fp("list[2]"), json!(true)).unwrap();
        assert_eq!(tree, json!({"list": [null, null, true]}));

        set_path(&mut tree, &fp("list[0].x"), json!(1)).unwrap();
        assert_eq!(tree, json!({"list": [{"x": 1}, null, true]}));
    }

    #[test]
    fn null_root_becomes_a_container() {
        let mut tree = JsonValue::Null;
        set_path(&mut tree, &fp("[1]"), json!("b")).unwrap();
        assert_eq!(tree, json!([null, "b"]));
    }

    #[test]
    fn overwrites_existing_subtree() {
        let mut tree = json!({"user": {"settings": [{"name": "old", "theme": "dark"}]}});
        set_path(&mut tree, &fp("user.settings[0].name"), json!("new")).unwrap();
        assert_eq!(
            tree,
            json!({"user": {"settings": [{"name": "new", "theme": "dark"}]}})
        );
    }

    #[test]
    fn refuses_to_traverse_scalars() {
        let mut tree = json!({"a": "text"});
        assert_eq!(
            set_path(&mut tree, &fp("a.b"), json!(1)),
            Err(FieldPathError::TypeMismatch {
                path: "a".to_string(),
                expected: "object",
                found: "string",
            })
        );
        // Nothing was written.
        assert_eq!(tree, json!({"a": "text"}));
    }

    #[test]
    fn refuses_wrong_container_kind() {
        let mut tree = json!({"a": {"0": 1}});
        assert_eq!(
            set_path(&mut tree, &fp("a[0]"), json!(1)),
            Err(FieldPathError::TypeMismatch {
                path: "a".to_string(),
                expected: "array",
                found: "object",
            })
        );
    }

    #[test]
    fn far_indexes_are_out_of_range() {
        let mut tree = json!({"a": [1]});
        assert_eq!(
            set_path(&mut tree, &fp("a[1000000000000000]"), json!(1)),
            Err(FieldPathError::IndexOutOfRange {
                index: 1_000_000_000_000_000,
                len: 1,
                max_gap: MAX_INDEX_GAP,
            })
        );
        assert_eq!(
            set_path(&mut tree, &fp(&format!("a[{}].b", usize::MAX)), json!(1)),
            Err(FieldPathError::IndexOutOfRange {
                index: usize::MAX,
                len: 1,
                max_gap: MAX_INDEX_GAP,
            })
        );
        assert_eq!(tree, json!({"a": [1]}));
    }

    #[test]
    fn padding_is_bounded_by_the_gap() {
        let mut tree = json!([]);
        set_path(&mut tree, &fp(&format!("[{}]", MAX_INDEX_GAP)), json!("end")).unwrap();
        let array = tree.as_array().unwrap();
        assert_eq!(array.len(), MAX_INDEX_GAP + 1);
        assert_eq!(array[MAX_INDEX_GAP], json!("end"));

        let mut empty = json!([]);
        assert!(matches!(
            set_path(&mut empty, &fp(&format!("[{}]", MAX_INDEX_GAP + 1)), json!(1)),
            Err(FieldPathError::IndexOutOfRange { .. })
        ));
        assert_eq!(empty, json!([]));
    }

    #[test]
    fn huge_indexes_read_and_delete_as_missing() {
        let mut tree = json!({"a": [1]});
        let path = fp(&format!("a[{}]", usize::MAX));
        assert_eq!(get_path(&tree, &path).unwrap(), None);
        assert_eq!(delete_path(&mut tree, &path).unwrap(), None);
        assert_eq!(tree, json!({"a": [1]}));
    }

    #[test]
    fn simple_property_replaces_non_objects() {
        let mut tree = json!([1, 2]);
        set_property(&mut tree, "name", json!("x"));
        assert_eq!(tree, json!({"name": "x"}));
    }
}

#[cfg(test)]
mod delete_path_tests {
    use super::*;
    use serde_json::json;

    fn fp(s: &str) -> FieldPath {
        FieldPath::parse(s).unwrap()
    }

    #[test]
    fn removes_nested_property() {
        let mut tree = json!({"a": {"b": 1, "c": 2}});
        assert_eq!(delete_path(&mut tree, &fp("a.b")).unwrap(), Some(json!(1)));
        assert_eq!(tree, json!({"a": {"c": 2}}));
    }

    #[test]
    fn splices_array_elements() {
        let mut tree = json!({"list": ["a", "b", "c"]});
        assert_eq!(
            delete_path(&mut tree, &fp("list[1]")).unwrap(),
            Some(json!("b"))
        );
        assert_eq!(tree, json!({"list": ["a", "c"]}));
    }

    #[test]
    fn missing_targets_are_no_ops() {
        let mut tree = json!({"a": {"b": [1]}});
        assert_eq!(delete_path(&mut tree, &fp("a.x")).unwrap(), None);
        assert_eq!(delete_path(&mut tree, &fp("a.b[5]")).unwrap(), None);
        assert_eq!(delete_path(&mut tree, &fp("q.r.s")).unwrap(), None);
        assert_eq!(tree, json!({"a": {"b": [1]}}));
    }

    #[test]
    fn deleting_through_a_scalar_is_a_type_mismatch() {
        let mut tree = json!({"a": 1});
        assert!(matches!(
            delete_path(&mut tree, &fp("a.b")),
            Err(FieldPathError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn simple_property_delete() {
        let mut tree = json!({"a": 1, "b": 2});
        assert_eq!(delete_property(&mut tree, "a"), Some(json!(1)));
        assert_eq!(tree, json!({"b": 2}));

        let mut scalar = json!("text");
        assert_eq!(delete_property(&mut scalar, "a"), None);
        assert_eq!(scalar, json!("text"));
    }

    #[test]
    fn location_reports_current_value() {
        let mut tree = json!({"a": [7]});
        let location = resolve_location(&mut tree, &fp("a[0]"), false)
            .unwrap()
            .unwrap();
        assert_eq!(location.get(), Some(&json!(7)));
    }
}
