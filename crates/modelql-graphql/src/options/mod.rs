//! Generation options.
//!
//! Options are written as permissive partial JSON/TOML documents and resolved
//! level by level (global → resource → nested object → field) into fully
//! populated values where every leaf is a `bool`.
//!
//! ```toml
//! [generate.type]
//! interface = false
//!
//! [generate.query.paginated]
//! others = false
//!
//! [generate.mutation.delete]
//! multi = false
//! ```

mod field;
mod resolve;

use serde::{Deserialize, Serialize};

pub use field::{AttachFlags, AuthMapper, FieldConfig, NullableVectors};
pub use resolve::{FlatConfig, apply_overrides, flatten, unflatten};

/// Auth segment a type or field is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AuthSegment {
    /// The caller's own records (`self`).
    #[serde(rename = "self")]
    Owned,
    /// Records owned by other callers.
    #[serde(rename = "others")]
    Others,
    /// Unrestricted.
    #[serde(rename = "mixed")]
    Mixed,
}

impl AuthSegment {
    /// All segments in synthesis order.
    pub const ALL: [AuthSegment; 3] = [Self::Owned, Self::Others, Self::Mixed];

    /// Configuration key (`self`, `others`, `mixed`).
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::Owned => "self",
            Self::Others => "others",
            Self::Mixed => "mixed",
        }
    }

    /// Prefix used in synthesized names (`Self`, `Others`, `Mixed`).
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Owned => "Self",
            Self::Others => "Others",
            Self::Mixed => "Mixed",
        }
    }

    /// Parses a configuration key.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|segment| segment.key() == key)
    }
}

/// Result-set scope of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryRange {
    All,
    Filtered,
    Paginated,
    Id,
}

impl QueryRange {
    pub const ALL: [QueryRange; 4] = [Self::All, Self::Filtered, Self::Paginated, Self::Id];

    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Filtered => "filtered",
            Self::Paginated => "paginated",
            Self::Id => "id",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::All => "All",
            Self::Filtered => "Filtered",
            Self::Paginated => "Paginated",
            Self::Id => "Id",
        }
    }

    /// Parts synthesized for this range.
    ///
    /// A count of a single-id lookup or of one page carries no information
    /// the other parts lack, so those combinations are never emitted.
    #[must_use]
    pub fn parts(self) -> &'static [QueryPart] {
        match self {
            Self::All | Self::Filtered => &[QueryPart::Whole, QueryPart::Count, QueryPart::NameAndId],
            Self::Paginated => &[QueryPart::Whole, QueryPart::NameAndId],
            Self::Id => &[QueryPart::Whole],
        }
    }
}

/// Shape of a query result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryPart {
    Whole,
    Count,
    NameAndId,
}

impl QueryPart {
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::Whole => "whole",
            Self::Count => "count",
            Self::NameAndId => "nameAndId",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Whole => "Whole",
            Self::Count => "Count",
            Self::NameAndId => "NameAndId",
        }
    }
}

/// Mutation action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationAction {
    Create,
    Update,
    Delete,
}

impl MutationAction {
    pub const ALL: [MutationAction; 3] = [Self::Create, Self::Update, Self::Delete];

    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

/// Mutation cardinality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationTarget {
    Single,
    Multi,
}

impl MutationTarget {
    pub const ALL: [MutationTarget; 2] = [Self::Single, Self::Multi];
}

/// Input flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    Create,
    Update,
}

impl InputAction {
    pub const ALL: [InputAction; 2] = [Self::Create, Self::Update];

    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Create => "Create",
            Self::Update => "Update",
        }
    }
}

/// One boolean per auth segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentFlags {
    #[serde(rename = "self")]
    pub owned: bool,
    pub others: bool,
    pub mixed: bool,
}

impl Default for SegmentFlags {
    fn default() -> Self {
        Self::uniform(true)
    }
}

impl SegmentFlags {
    /// Sets every segment to `value`.
    #[must_use]
    pub fn uniform(value: bool) -> Self {
        Self {
            owned: value,
            others: value,
            mixed: value,
        }
    }

    #[must_use]
    pub fn get(&self, segment: AuthSegment) -> bool {
        match segment {
            AuthSegment::Owned => self.owned,
            AuthSegment::Others => self.others,
            AuthSegment::Mixed => self.mixed,
        }
    }

    pub fn set(&mut self, segment: AuthSegment, value: bool) {
        match segment {
            AuthSegment::Owned => self.owned = value,
            AuthSegment::Others => self.others = value,
            AuthSegment::Mixed => self.mixed = value,
        }
    }

    /// Segment-wise AND.
    #[must_use]
    pub fn and(&self, other: &SegmentFlags) -> SegmentFlags {
        SegmentFlags {
            owned: self.owned && other.owned,
            others: self.others && other.others,
            mixed: self.mixed && other.mixed,
        }
    }

    /// Number of enabled segments.
    #[must_use]
    pub fn count(&self) -> usize {
        AuthSegment::ALL.iter().filter(|s| self.get(**s)).count()
    }

    /// Enabled segments in synthesis order.
    pub fn enabled(&self) -> impl Iterator<Item = AuthSegment> + '_ {
        AuthSegment::ALL.into_iter().filter(|s| self.get(*s))
    }
}

/// Create / update toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputFlags {
    pub create: bool,
    pub update: bool,
}

impl Default for InputFlags {
    fn default() -> Self {
        Self {
            create: true,
            update: true,
        }
    }
}

impl InputFlags {
    #[must_use]
    pub fn get(&self, action: InputAction) -> bool {
        match action {
            InputAction::Create => self.create,
            InputAction::Update => self.update,
        }
    }
}

/// Which kinds of type definitions to synthesize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypeOptions {
    pub interface: bool,
    #[serde(rename = "enum")]
    pub enums: bool,
    pub union: bool,
    pub object: SegmentFlags,
    pub input: InputFlags,
}

impl Default for TypeOptions {
    fn default() -> Self {
        Self {
            interface: true,
            enums: true,
            union: true,
            object: SegmentFlags::default(),
            input: InputFlags::default(),
        }
    }
}

/// Whole / count / nameAndId toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartFlags {
    pub whole: bool,
    pub count: bool,
    #[serde(rename = "nameAndId")]
    pub name_and_id: bool,
}

impl Default for PartFlags {
    fn default() -> Self {
        Self {
            whole: true,
            count: true,
            name_and_id: true,
        }
    }
}

impl PartFlags {
    #[must_use]
    pub fn get(&self, part: QueryPart) -> bool {
        match part {
            QueryPart::Whole => self.whole,
            QueryPart::Count => self.count,
            QueryPart::NameAndId => self.name_and_id,
        }
    }
}

/// Parts per auth segment for one range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryRangeOptions {
    #[serde(rename = "self")]
    pub owned: PartFlags,
    pub others: PartFlags,
    pub mixed: PartFlags,
}

impl QueryRangeOptions {
    #[must_use]
    pub fn segment(&self, segment: AuthSegment) -> &PartFlags {
        match segment {
            AuthSegment::Owned => &self.owned,
            AuthSegment::Others => &self.others,
            AuthSegment::Mixed => &self.mixed,
        }
    }
}

/// The range × auth × part query matrix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryOptions {
    pub all: QueryRangeOptions,
    pub filtered: QueryRangeOptions,
    pub paginated: QueryRangeOptions,
    pub id: QueryRangeOptions,
}

impl QueryOptions {
    #[must_use]
    pub fn range(&self, range: QueryRange) -> &QueryRangeOptions {
        match range {
            QueryRange::All => &self.all,
            QueryRange::Filtered => &self.filtered,
            QueryRange::Paginated => &self.paginated,
            QueryRange::Id => &self.id,
        }
    }

    /// Returns the leaf for one cell of the matrix.
    #[must_use]
    pub fn enabled(&self, range: QueryRange, segment: AuthSegment, part: QueryPart) -> bool {
        self.range(range).segment(segment).get(part)
    }
}

/// Single / multi toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetFlags {
    pub single: bool,
    pub multi: bool,
}

impl Default for TargetFlags {
    fn default() -> Self {
        Self {
            single: true,
            multi: true,
        }
    }
}

impl TargetFlags {
    #[must_use]
    pub fn get(&self, target: MutationTarget) -> bool {
        match target {
            MutationTarget::Single => self.single,
            MutationTarget::Multi => self.multi,
        }
    }
}

/// The action × target mutation matrix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MutationOptions {
    pub create: TargetFlags,
    pub update: TargetFlags,
    pub delete: TargetFlags,
}

impl MutationOptions {
    #[must_use]
    pub fn enabled(&self, action: MutationAction, target: MutationTarget) -> bool {
        let flags = match action {
            MutationAction::Create => &self.create,
            MutationAction::Update => &self.update,
            MutationAction::Delete => &self.delete,
        };
        flags.get(target)
    }
}

/// Fully resolved generation options for one schema level.
///
/// The default enables everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    #[serde(rename = "type")]
    pub types: TypeOptions,
    pub query: QueryOptions,
    pub mutation: MutationOptions,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_enables_everything() {
        let config = GenerationConfig::default();
        assert!(config.types.interface && config.types.enums && config.types.union);
        assert_eq!(config.types.object.count(), 3);
        for range in QueryRange::ALL {
            for segment in AuthSegment::ALL {
                for part in [QueryPart::Whole, QueryPart::Count, QueryPart::NameAndId] {
                    assert!(config.query.enabled(range, segment, part));
                }
            }
        }
        for action in MutationAction::ALL {
            for target in MutationTarget::ALL {
                assert!(config.mutation.enabled(action, target));
            }
        }
    }

    #[test]
    fn test_serialized_keys() {
        let value = serde_json::to_value(GenerationConfig::default()).unwrap();
        assert_eq!(value["type"]["object"]["self"], true);
        assert_eq!(value["type"]["enum"], true);
        assert_eq!(value["query"]["paginated"]["others"]["nameAndId"], true);
        assert_eq!(value["mutation"]["delete"]["multi"], true);
    }

    #[test]
    fn test_segment_flags() {
        let a = SegmentFlags {
            owned: true,
            others: false,
            mixed: true,
        };
        let b = SegmentFlags {
            owned: true,
            others: true,
            mixed: false,
        };
        let both = a.and(&b);
        assert_eq!(both.count(), 1);
        assert_eq!(both.enabled().collect::<Vec<_>>(), vec![AuthSegment::Owned]);
        assert_eq!(AuthSegment::from_key("others"), Some(AuthSegment::Others));
        assert_eq!(AuthSegment::from_key("nobody"), None);
    }

    #[test]
    fn test_range_parts() {
        let total: usize = QueryRange::ALL.iter().map(|r| r.parts().len()).sum();
        assert_eq!(total, 9);
    }
}
