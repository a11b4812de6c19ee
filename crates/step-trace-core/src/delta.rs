//! Structural delta between two `Serialized` values (§4.A, "Delta").
//!
//! Ground truth: `utils.py::calculate_delta`. Recurses through maps and
//! arrays, returns `None` when nothing changed, and treats "didn't exist
//! before" specially so an assignment from nothing to an empty container
//! still produces a (empty) patch rather than being mistaken for "no
//! change".

use indexmap::IndexMap;

use crate::value::Serialized;

/// Computes the delta of `curr` against `prev`. Returns `None` when the two
/// are equal; otherwise returns a structural patch (see module docs).
#[must_use]
pub fn delta(prev: Option<&Serialized>, curr: &Serialized) -> Option<Serialized> {
    match curr {
        Serialized::Map(curr_map) => {
            let was_none = prev.is_none();
            let empty = IndexMap::new();
            let prev_map = match prev {
                Some(Serialized::Map(m)) => m,
                _ => &empty,
            };
            let mut changed = IndexMap::new();
            for (k, v) in curr_map {
                match prev_map.get(k) {
                    None => {
                        changed.insert(k.clone(), delta(None, v).unwrap_or_else(|| v.clone()));
                    }
                    Some(prev_v) => {
                        if let Some(d) = delta(Some(prev_v), v) {
                            changed.insert(k.clone(), d);
                        }
                    }
                }
            }
            if !changed.is_empty() {
                Some(Serialized::Map(changed))
            } else if was_none {
                Some(Serialized::Map(IndexMap::new()))
            } else {
                None
            }
        }
        Serialized::Array(curr_arr) => {
            let was_none = prev.is_none();
            let empty = Vec::new();
            let prev_arr = match prev {
                Some(Serialized::Array(a)) => a,
                _ => &empty,
            };
            let mut changed: IndexMap<String, Serialized> = IndexMap::new();
            let shared = curr_arr.len().min(prev_arr.len());
            for i in 0..shared {
                if let Some(d) = delta(Some(&prev_arr[i]), &curr_arr[i]) {
                    changed.insert(i.to_string(), d);
                }
            }
            for item in curr_arr.iter().enumerate().skip(prev_arr.len()) {
                let (i, v) = item;
                changed.insert(i.to_string(), delta(None, v).unwrap_or_else(|| v.clone()));
            }
            if !changed.is_empty() {
                Some(index_delta_to_array(changed, curr_arr.len()))
            } else if was_none {
                Some(Serialized::Array(Vec::new()))
            } else {
                None
            }
        }
        _ => {
            if prev == Some(curr) {
                None
            } else {
                Some(curr.clone())
            }
        }
    }
}

/// §3's Delta shape for sequences is "a mapping keyed by changed index".
/// `utils.py` stores these as a dict keyed by integer index (since Python
/// dicts may have int keys); this workspace's `Serialized::Map` keys are
/// always strings, so indices are rendered as their decimal string form.
fn index_delta_to_array(changed: IndexMap<String, Serialized>, _len: usize) -> Serialized {
    Serialized::Map(changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn int(i: i64) -> Serialized {
        Serialized::Int(i)
    }

    #[test]
    fn equal_values_have_no_delta() {
        let prev = int(5);
        let curr = int(5);
        assert_eq!(delta(Some(&prev), &curr), None);
    }

    #[test]
    fn changed_primitive_yields_new_value() {
        let prev = int(5);
        let curr = int(6);
        assert_eq!(delta(Some(&prev), &curr), Some(int(6)));
    }

    #[test]
    fn new_map_key_is_recursively_patched() {
        let mut prev_map = IndexMap::new();
        prev_map.insert("a".to_string(), int(1));
        let mut curr_map = IndexMap::new();
        curr_map.insert("a".to_string(), int(1));
        curr_map.insert("b".to_string(), int(2));

        let d = delta(Some(&Serialized::Map(prev_map)), &Serialized::Map(curr_map)).unwrap();
        let Serialized::Map(patch) = d else { panic!("expected map delta") };
        assert_eq!(patch.len(), 1);
        assert_eq!(patch.get("b"), Some(&int(2)));
    }

    #[test]
    fn none_to_empty_container_is_a_distinct_empty_patch() {
        let curr = Serialized::Array(Vec::new());
        let d = delta(None, &curr);
        assert_eq!(d, Some(Serialized::Array(Vec::new())));
    }

    #[test]
    fn extension_indices_are_included() {
        let prev = Serialized::Array(vec![int(1)]);
        let curr = Serialized::Array(vec![int(1), int(2)]);
        let d = delta(Some(&prev), &curr).unwrap();
        let Serialized::Map(patch) = d else { panic!("expected map delta for array patch") };
        assert_eq!(patch.get("1"), Some(&int(2)));
    }
}
