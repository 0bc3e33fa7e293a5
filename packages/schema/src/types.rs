//! Built-in simple types and their derivation lattice

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! builtin_types {
    ($($variant:ident => $name:literal : $base:ident,)*) => {
        /// The 46 predefined schema types
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum BuiltinType {
            $($variant,)*
        }

        impl BuiltinType {
            pub const ALL: &'static [BuiltinType] = &[$(BuiltinType::$variant,)*];

            /// Look a type up by its schema name, ignoring any namespace prefix
            pub fn parse(name: &str) -> Option<Self> {
                let local = name.rsplit(':').next().unwrap_or(name);
                match local {
                    $($name => Some(BuiltinType::$variant),)*
                    _ => None,
                }
            }

            pub fn as_str(self) -> &'static str {
                match self {
                    $(BuiltinType::$variant => $name,)*
                }
            }

            fn declared_base(self) -> BuiltinType {
                match self {
                    $(BuiltinType::$variant => BuiltinType::$base,)*
                }
            }
        }
    };
}

builtin_types! {
    AnyType => "anyType": AnyType,
    AnySimpleType => "anySimpleType": AnyType,

    Duration => "duration": AnySimpleType,
    DateTime => "dateTime": AnySimpleType,
    Time => "time": AnySimpleType,
    Date => "date": AnySimpleType,
    GYearMonth => "gYearMonth": AnySimpleType,
    GYear => "gYear": AnySimpleType,
    GMonthDay => "gMonthDay": AnySimpleType,
    GDay => "gDay": AnySimpleType,
    GMonth => "gMonth": AnySimpleType,

    Boolean => "boolean": AnySimpleType,
    Base64Binary => "base64Binary": AnySimpleType,
    HexBinary => "hexBinary": AnySimpleType,
    Float => "float": AnySimpleType,
    Double => "double": AnySimpleType,
    AnyUri => "anyURI": AnySimpleType,
    QName => "QName": AnySimpleType,
    Notation => "NOTATION": AnySimpleType,

    String => "string": AnySimpleType,
    NormalizedString => "normalizedString": String,
    Token => "token": NormalizedString,
    Language => "language": Token,
    Name => "Name": Token,
    NmToken => "NMTOKEN": Token,
    NmTokens => "NMTOKENS": NmToken,
    NcName => "NCName": Name,
    Id => "ID": NcName,
    IdRef => "IDREF": NcName,
    IdRefs => "IDREFS": IdRef,
    Entity => "ENTITY": NcName,
    Entities => "ENTITIES": Entity,

    Decimal => "decimal": AnySimpleType,
    Integer => "integer": Decimal,
    NonPositiveInteger => "nonPositiveInteger": Integer,
    NegativeInteger => "negativeInteger": NonPositiveInteger,
    Long => "long": Integer,
    Int => "int": Long,
    Short => "short": Int,
    Byte => "byte": Short,
    NonNegativeInteger => "nonNegativeInteger": Integer,
    PositiveInteger => "positiveInteger": NonNegativeInteger,
    UnsignedLong => "unsignedLong": NonNegativeInteger,
    UnsignedInt => "unsignedInt": UnsignedLong,
    UnsignedShort => "unsignedShort": UnsignedInt,
    UnsignedByte => "unsignedByte": UnsignedShort,
}

impl BuiltinType {
    /// The type this one is derived from; `None` only for `anyType`
    pub fn base(self) -> Option<BuiltinType> {
        match self {
            BuiltinType::AnyType => None,
            other => Some(other.declared_base()),
        }
    }

    /// Whether `self` equals `ancestor` or is derived from it, directly or transitively
    pub fn is_derived_from(self, ancestor: BuiltinType) -> bool {
        let mut current = Some(self);
        while let Some(ty) = current {
            if ty == ancestor {
                return true;
            }
            current = ty.base();
        }
        false
    }
}

impl fmt::Display for BuiltinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_names_round_trip() {
        assert_eq!(BuiltinType::ALL.len(), 46);
        for ty in BuiltinType::ALL {
            assert_eq!(BuiltinType::parse(ty.as_str()), Some(*ty));
        }
        assert_eq!(BuiltinType::parse("xs:int"), Some(BuiltinType::Int));
        assert_eq!(BuiltinType::parse("int_"), None);
    }

    #[test]
    fn test_derivation_lattice() {
        assert!(BuiltinType::UnsignedByte.is_derived_from(BuiltinType::Decimal));
        assert!(BuiltinType::IdRefs.is_derived_from(BuiltinType::String));
        assert!(BuiltinType::Token.is_derived_from(BuiltinType::Token));
        assert!(!BuiltinType::Decimal.is_derived_from(BuiltinType::String));
        assert!(!BuiltinType::String.is_derived_from(BuiltinType::Token));
        assert_eq!(BuiltinType::AnyType.base(), None);
        assert!(BuiltinType::ALL
            .iter()
            .all(|ty| ty.is_derived_from(BuiltinType::AnyType)));
    }
}
