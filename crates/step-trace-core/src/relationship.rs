//! Container/cursor relationships inferred between variables (§4.D).

use serde::Serialize;

use crate::node::RelationshipNodeId;

/// The kind of structural link a `Relationship` records between a cursor
/// variable and the container (or container member) it refers to.
///
/// Grounded on `relationship_analyzer.py`'s edge-emission table: each
/// variant corresponds to one row (subscript index, for-loop cursor,
/// dict-key/value split, membership test, …).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RelationshipKind {
    /// A variable used as a subscript index into a sequence (`arr[i]`).
    KeyAccess,
    /// A variable assigned-to via subscript (`arr[i] = ...`).
    KeyAssignment,
    /// A variable that walks a container's indices (e.g. `range(len(arr))`).
    KeyIndex,
    /// A variable that walks a container's values directly (`for v in arr`).
    ValueIndex,
    /// A variable bound to a dict's keys (`for k in d`, `d.keys()`).
    DictKey,
    /// A variable bound to a dict's values (`d.values()`).
    DictValue,
    /// A variable tested for membership in a container (`x in arr`).
    MembershipTest,
}

/// One inferred (or manually supplied) link between a cursor variable and
/// the container it walks or indexes.
#[derive(Debug, Clone, Serialize)]
pub struct Relationship {
    pub cursor: String,
    pub container: String,
    pub kind: RelationshipKind,
    /// The node id of the construct the edge was inferred from. Manually
    /// supplied relationships carry a synthetic, negative id so they never
    /// collide with a parsed node (§4.D, "Manual relationships").
    pub node_id: RelationshipNodeId,
}
