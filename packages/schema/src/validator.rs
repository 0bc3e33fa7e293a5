//! # Scalar Validation
//!
//! Checks the text of a leaf (attribute value or simple element content) in two
//! independent steps that must both pass:
//!
//! 1. **Base type**: a lexical check keyed on the declared built-in type.
//! 2. **Restriction**: every declared facet of the type restriction.
//!
//! `ID`, `IDREF` and `IDREFS` need to know who owns an ID, so validation takes an
//! [`IdLookup`] supplied by the document being edited.

use crate::constraint::{ConstraintNode, TypeRestriction};
use crate::types::BuiltinType;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::hash::BuildHasher;
use std::sync::{Mutex, PoisonError};
use tracing::{debug, warn};
use xsdedit_dom::NodeId;

/// Resolves an ID value to the node that owns it
pub trait IdLookup {
    fn owner_of(&self, id: &str) -> Option<NodeId>;
}

/// Lookup for contexts without any registered IDs
#[derive(Debug, Clone, Copy, Default)]
pub struct NoIds;

impl IdLookup for NoIds {
    fn owner_of(&self, _id: &str) -> Option<NodeId> {
        None
    }
}

impl<S: BuildHasher> IdLookup for HashMap<String, NodeId, S> {
    fn owner_of(&self, id: &str) -> Option<NodeId> {
        self.get(id).copied()
    }
}

const NM_TOKEN: &str = r"[^\s,]+";
const EXTENDERS: &str =
    r"\x{00B7}\x{02D0}\x{02D1}\x{0387}\x{0640}\x{0E46}\x{0EC6}\x{3005}\x{3031}-\x{3035}\x{309D}-\x{309E}\x{30FC}-\x{30FE}";

const UNSIGNED_INT_MAX: f64 = 4294967295.0;
const UNSIGNED_LONG_MAX: f64 = 18446744073709551615.0;

macro_rules! builtin_pattern {
    ($name:ident, $pattern:expr) => {
        static $name: Lazy<Regex> =
            Lazy::new(|| anchored(&$pattern).expect("built-in pattern compiles"));
    };
}

builtin_pattern!(ANY_URI, r"(?:[a-zA-Z0-9\-_.!~*'();/?:@&=+$,]|%[a-fA-F0-9]{2})*");
builtin_pattern!(DECIMAL, r"[+\-]?[0-9]+(?:\.[0-9]+)?");
builtin_pattern!(INTEGER, r"[+\-]?[0-9]+");
builtin_pattern!(NON_NEGATIVE_INTEGER, r"\+?[0-9]+");
builtin_pattern!(NC_NAME, format!(r"[[\w\p{{M}}{EXTENDERS}]&&[^\d]][\w.\-\p{{M}}{EXTENDERS}]*"));
builtin_pattern!(NMTOKEN, NM_TOKEN);

fn anchored(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{pattern})$"))
}

/// Validator for leaf values.
///
/// The lexical patterns are shared statics; compiled `pattern` facets are cached per validator
/// behind a lock, so one validator can be shared between threads.
#[derive(Debug, Default)]
pub struct ScalarValidator {
    facet_patterns: Mutex<HashMap<String, Option<Regex>>>,
}

impl ScalarValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check `value` against the type and restriction of `constraint`.
    ///
    /// `node` is the node holding the value; an `ID` is only valid when that
    /// node is the registered owner.
    pub fn validate(
        &self,
        value: &str,
        constraint: &ConstraintNode,
        node: NodeId,
        ids: &dyn IdLookup,
    ) -> bool {
        let type_ok = match constraint.type_name.as_deref() {
            Some(type_name) => self.check_base_type(value, type_name, node, ids),
            None => false,
        };
        let restriction_ok = match &constraint.restriction {
            Some(restriction) => self.check_restriction(value, restriction),
            None => true,
        };
        type_ok && restriction_ok
    }

    /// Lexical check against a built-in type
    pub fn check_base_type(&self, value: &str, type_name: &str, node: NodeId, ids: &dyn IdLookup) -> bool {
        let Some(ty) = BuiltinType::parse(type_name) else {
            debug!(type_name, "value typed with unknown type");
            return false;
        };

        match ty {
            BuiltinType::AnyType | BuiltinType::AnySimpleType | BuiltinType::String => true,
            BuiltinType::AnyUri => ANY_URI.is_match(value),
            BuiltinType::Boolean => matches!(value, "true" | "false" | "1" | "0"),
            BuiltinType::Decimal => DECIMAL.is_match(value),
            BuiltinType::Double => value.trim().parse::<f64>().is_ok(),
            BuiltinType::Float => value.trim().parse::<f32>().is_ok(),
            BuiltinType::Integer => INTEGER.is_match(value),
            BuiltinType::Long => value.parse::<i64>().is_ok(),
            BuiltinType::Int => value.parse::<i32>().is_ok(),
            BuiltinType::Short => value.parse::<i16>().is_ok(),
            BuiltinType::Byte => value.parse::<i8>().is_ok(),
            BuiltinType::NonNegativeInteger => NON_NEGATIVE_INTEGER.is_match(value),
            BuiltinType::PositiveInteger => {
                NON_NEGATIVE_INTEGER.is_match(value) && !value.trim_start_matches(['+', '0']).is_empty()
            }
            BuiltinType::NonPositiveInteger => self.is_non_positive(value),
            BuiltinType::NegativeInteger => {
                self.is_non_positive(value) && !value.trim_start_matches(['-', '0']).is_empty()
            }
            BuiltinType::UnsignedLong => self.is_unsigned_up_to(value, UNSIGNED_LONG_MAX),
            BuiltinType::UnsignedInt => self.is_unsigned_up_to(value, UNSIGNED_INT_MAX),
            BuiltinType::UnsignedShort => self.is_unsigned_up_to(value, f64::from(u16::MAX)),
            BuiltinType::UnsignedByte => self.is_unsigned_up_to(value, f64::from(u8::MAX)),
            BuiltinType::NormalizedString => !value.contains(['\n', '\t', '\r']),
            BuiltinType::Token => self.is_token(value),
            BuiltinType::NmToken => NMTOKEN.is_match(value),
            BuiltinType::NmTokens => split_list(value).iter().all(|t| NMTOKEN.is_match(t)),
            BuiltinType::NcName => NC_NAME.is_match(value),
            BuiltinType::Id => NC_NAME.is_match(value) && ids.owner_of(value) == Some(node),
            BuiltinType::IdRef => self.is_id_ref(value, ids),
            BuiltinType::IdRefs => split_list(value).iter().all(|id| self.is_id_ref(id, ids)),
            other => {
                debug!(type_name = %other, "no lexical check for type, rejecting value");
                false
            }
        }
    }

    fn is_non_positive(&self, value: &str) -> bool {
        INTEGER.is_match(value)
            && (value.starts_with('-') || value.trim_start_matches(['+', '0']).is_empty())
    }

    fn is_unsigned_up_to(&self, value: &str, max: f64) -> bool {
        NON_NEGATIVE_INTEGER.is_match(value)
            && value
                .trim()
                .parse::<f64>()
                .is_ok_and(|parsed| (0.0..=max).contains(&parsed))
    }

    fn is_token(&self, value: &str) -> bool {
        if value.contains(['\n', '\t', '\r']) || value.trim() != value {
            return false;
        }
        split_list(value).iter().all(|part| NMTOKEN.is_match(part))
    }

    fn is_id_ref(&self, value: &str, ids: &dyn IdLookup) -> bool {
        NC_NAME.is_match(value) && ids.owner_of(value).is_some()
    }

    /// Check every declared facet. An unknown base type fails outright.
    pub fn check_restriction(&self, value: &str, restriction: &TypeRestriction) -> bool {
        let mut valid = true;
        if !restriction.enumeration.is_empty() {
            valid &= restriction.enumeration.iter().any(|allowed| allowed == value);
        }

        let Some(base) = BuiltinType::parse(&restriction.base_type) else {
            debug!(base = %restriction.base_type, "restriction on unknown base type");
            return false;
        };

        let length = value.chars().count();
        if let Some(facet) = &restriction.length {
            valid &= self.facet_count(facet).is_some_and(|n| length == n);
        }
        if let Some(facet) = &restriction.min_length {
            valid &= self.facet_count(facet).is_some_and(|n| length >= n);
        }
        if let Some(facet) = &restriction.max_length {
            valid &= self.facet_count(facet).is_some_and(|n| length <= n);
        }
        if let Some(pattern) = &restriction.pattern {
            valid &= self.matches_pattern(value, pattern);
        }
        if let Some(policy) = &restriction.white_space {
            valid &= white_space_ok(value, base, policy);
        }

        let bound = |facet: &Option<String>, holds: fn(f64, f64) -> bool| match facet {
            Some(border) => match (value.trim().parse::<f64>(), border.trim().parse::<f64>()) {
                (Ok(value), Ok(border)) => holds(value, border),
                _ => false,
            },
            None => true,
        };
        valid &= bound(&restriction.max_inclusive, |v, b| v <= b);
        valid &= bound(&restriction.max_exclusive, |v, b| v < b);
        valid &= bound(&restriction.min_exclusive, |v, b| v > b);
        valid &= bound(&restriction.min_inclusive, |v, b| v >= b);

        if let Some(facet) = &restriction.total_digits {
            valid &= digits_ok(value, facet, |integer, fraction| integer.len() + fraction.len());
        }
        if let Some(facet) = &restriction.fraction_digits {
            valid &= digits_ok(value, facet, |_, fraction| fraction.len());
        }

        valid
    }

    /// Value of a length-like facet; must itself be a non-negative integer
    fn facet_count(&self, facet: &str) -> Option<usize> {
        if !NON_NEGATIVE_INTEGER.is_match(facet) {
            return None;
        }
        facet.trim_start_matches('+').parse().ok()
    }

    fn matches_pattern(&self, value: &str, pattern: &str) -> bool {
        // A panic while holding the lock cannot leave a half-written entry behind
        let mut cache = self.facet_patterns.lock().unwrap_or_else(PoisonError::into_inner);
        let compiled = cache.entry(pattern.to_string()).or_insert_with(|| {
            let translated = pattern.replace(r"\c+", NM_TOKEN);
            match anchored(&translated) {
                Ok(regex) => Some(regex),
                Err(err) => {
                    warn!(pattern, error = %err, "pattern facet does not compile");
                    None
                }
            }
        });
        compiled.as_ref().is_some_and(|regex| regex.is_match(value))
    }
}

/// Split a list-typed value on single spaces. Trailing empty entries are dropped,
/// a value without separators is its own single entry.
fn split_list(value: &str) -> Vec<&str> {
    let mut parts: Vec<&str> = value.split(' ').collect();
    while parts.len() > 1 && parts.last().is_some_and(|p| p.is_empty()) {
        parts.pop();
    }
    parts
}

fn white_space_ok(value: &str, base: BuiltinType, policy: &str) -> bool {
    if policy == "preserve" || base == BuiltinType::String {
        return true;
    }
    if policy == "replace" {
        return !value.contains(['\t', '\n', '\r']);
    }
    if policy == "collapse" || !base.is_derived_from(BuiltinType::String) {
        return !value.contains("  ") && value.trim() == value;
    }
    false
}

/// Count digits of the canonical decimal form of `value` and compare with the facet
fn digits_ok(value: &str, facet: &str, count: fn(&str, &str) -> usize) -> bool {
    let (Ok(number), Ok(expected)) = (value.trim().parse::<f64>(), facet.trim().parse::<usize>()) else {
        return false;
    };
    if !number.is_finite() {
        return false;
    }
    let canonical = format!("{}", number.abs());
    let (integer, fraction) = canonical.split_once('.').unwrap_or((canonical.as_str(), ""));
    count(integer.trim_start_matches('0'), fraction) == expected
}
