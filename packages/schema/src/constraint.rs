use serde::{Deserialize, Serialize};
use std::fmt;

/// Handle to a node of one [`ConstraintTree`](crate::ConstraintTree)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConstraintId(pub(crate) u32);

impl ConstraintId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ConstraintId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConstraintKind {
    Element,
    Attribute,
    Sequence,
    Choice,
    Group,
}

impl ConstraintKind {
    pub fn is_compositor(self) -> bool {
        matches!(self, ConstraintKind::Sequence | ConstraintKind::Choice | ConstraintKind::Group)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaxOccurs {
    Bounded(u32),
    Unbounded,
}

/// Occurrence bounds of an element particle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occurs {
    pub min: u32,
    pub max: MaxOccurs,
}

impl Default for Occurs {
    fn default() -> Self {
        Self::once()
    }
}

impl Occurs {
    pub const fn new(min: u32, max: MaxOccurs) -> Self {
        Self { min, max }
    }

    pub const fn once() -> Self {
        Self::new(1, MaxOccurs::Bounded(1))
    }

    pub const fn optional() -> Self {
        Self::new(0, MaxOccurs::Bounded(1))
    }

    pub const fn any() -> Self {
        Self::new(0, MaxOccurs::Unbounded)
    }

    pub const fn at_least(min: u32) -> Self {
        Self::new(min, MaxOccurs::Unbounded)
    }

    pub fn contains(&self, count: usize) -> bool {
        count >= self.min as usize && !self.exceeded_by(count)
    }

    /// Whether one more occurrence than `count` would still fit
    pub fn allows_more(&self, count: usize) -> bool {
        match self.max {
            MaxOccurs::Unbounded => true,
            MaxOccurs::Bounded(max) => count < max as usize,
        }
    }

    pub fn exceeded_by(&self, count: usize) -> bool {
        match self.max {
            MaxOccurs::Unbounded => false,
            MaxOccurs::Bounded(max) => count > max as usize,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeUse {
    Required,
    Optional,
    Prohibited,
}

/// Restriction facets as declared in the schema.
///
/// Facet values stay in their lexical form; the validator decides whether a
/// facet value itself is usable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeRestriction {
    pub base_type: String,
    pub enumeration: Vec<String>,
    pub length: Option<String>,
    pub min_length: Option<String>,
    pub max_length: Option<String>,
    pub pattern: Option<String>,
    pub white_space: Option<String>,
    pub min_inclusive: Option<String>,
    pub max_inclusive: Option<String>,
    pub min_exclusive: Option<String>,
    pub max_exclusive: Option<String>,
    pub total_digits: Option<String>,
    pub fraction_digits: Option<String>,
}

impl TypeRestriction {
    pub fn new(base_type: impl Into<String>) -> Self {
        Self {
            base_type: base_type.into(),
            ..Default::default()
        }
    }

    /// Record a facet by its schema element name. Returns false for unknown facets.
    pub fn set_facet(&mut self, facet: &str, value: impl Into<String>) -> bool {
        let value = value.into();
        let slot = match facet {
            "enumeration" => {
                self.enumeration.push(value);
                return true;
            }
            "length" => &mut self.length,
            "minLength" => &mut self.min_length,
            "maxLength" => &mut self.max_length,
            "pattern" => &mut self.pattern,
            "whiteSpace" => &mut self.white_space,
            "minInclusive" => &mut self.min_inclusive,
            "maxInclusive" => &mut self.max_inclusive,
            "minExclusive" => &mut self.min_exclusive,
            "maxExclusive" => &mut self.max_exclusive,
            "totalDigits" => &mut self.total_digits,
            "fractionDigits" => &mut self.fraction_digits,
            _ => return false,
        };
        *slot = Some(value);
        true
    }

    /// Overlay the facets of a derived restriction onto this one
    pub fn merge_from(&mut self, derived: &TypeRestriction) {
        if !derived.enumeration.is_empty() {
            self.enumeration = derived.enumeration.clone();
        }
        let pairs = [
            (&mut self.length, &derived.length),
            (&mut self.min_length, &derived.min_length),
            (&mut self.max_length, &derived.max_length),
            (&mut self.pattern, &derived.pattern),
            (&mut self.white_space, &derived.white_space),
            (&mut self.min_inclusive, &derived.min_inclusive),
            (&mut self.max_inclusive, &derived.max_inclusive),
            (&mut self.min_exclusive, &derived.min_exclusive),
            (&mut self.max_exclusive, &derived.max_exclusive),
            (&mut self.total_digits, &derived.total_digits),
            (&mut self.fraction_digits, &derived.fraction_digits),
        ];
        for (slot, value) in pairs {
            if value.is_some() {
                slot.clone_from(value);
            }
        }
    }
}

/// One node of the constraint tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintNode {
    pub kind: ConstraintKind,
    /// Element or attribute name; empty for compositors
    pub name: String,
    pub occurs: Occurs,
    pub attribute_use: Option<AttributeUse>,
    pub default_value: Option<String>,
    pub fixed_value: Option<String>,
    pub type_name: Option<String>,
    pub restriction: Option<TypeRestriction>,
    pub annotation: Option<String>,
    pub can_have_text: bool,
    pub(crate) parent: Option<ConstraintId>,
    pub(crate) children: Vec<ConstraintId>,
    pub(crate) attributes: Vec<ConstraintId>,
}

impl ConstraintNode {
    pub(crate) fn new(kind: ConstraintKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            occurs: Occurs::default(),
            attribute_use: None,
            default_value: None,
            fixed_value: None,
            type_name: None,
            restriction: None,
            annotation: None,
            can_have_text: false,
            parent: None,
            children: Vec::new(),
            attributes: Vec::new(),
        }
    }

    pub fn is_element(&self) -> bool {
        self.kind == ConstraintKind::Element
    }

    pub fn is_attribute(&self) -> bool {
        self.kind == ConstraintKind::Attribute
    }

    pub fn has_default_or_fixed(&self) -> bool {
        self.default_value.is_some() || self.fixed_value.is_some()
    }

    /// Optional attribute without a default or fixed value; only these may be added or removed freely
    pub fn is_free_optional_attribute(&self) -> bool {
        self.is_attribute()
            && self.attribute_use == Some(AttributeUse::Optional)
            && !self.has_default_or_fixed()
    }

    pub fn has_type(&self, type_name: &str) -> bool {
        self.type_name.as_deref() == Some(type_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_occurs_bounds() {
        let occurs = Occurs::new(1, MaxOccurs::Bounded(3));
        assert!(!occurs.contains(0));
        assert!(occurs.contains(3));
        assert!(!occurs.contains(4));
        assert!(occurs.allows_more(2));
        assert!(!occurs.allows_more(3));

        assert!(Occurs::any().allows_more(10_000));
        assert!(!Occurs::any().exceeded_by(10_000));
    }

    #[test]
    fn test_merge_keeps_base_facets_unless_overridden() {
        let mut base = TypeRestriction::new("string");
        base.set_facet("maxLength", "10");
        base.set_facet("enumeration", "a");

        let mut derived = TypeRestriction::new("string");
        derived.set_facet("minLength", "2");

        base.merge_from(&derived);
        assert_eq!(base.max_length.as_deref(), Some("10"));
        assert_eq!(base.min_length.as_deref(), Some("2"));
        assert_eq!(base.enumeration, vec!["a"]);
    }

    #[test]
    fn test_unknown_facet_is_reported() {
        let mut restriction = TypeRestriction::new("string");
        assert!(!restriction.set_facet("assertion", "x"));
    }
}
