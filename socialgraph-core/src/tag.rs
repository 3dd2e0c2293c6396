use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::{Map, Value};

/// Reserved key carrying an object's type tag inside its field map.
pub const TYPE_KEY: &str = "contentItemType";

/// Reserved key carrying an object's resolved identifier inside its field map.
pub const IDENTIFIER_KEY: &str = "contentItemIdentifier";

/// Opaque content type key.
///
/// Backends define their own tags; the generic layer only compares them.
/// `TypeTag::UNKNOWN` marks data whose type has not been resolved yet.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct TypeTag(pub u32);

impl TypeTag {
    pub const UNKNOWN: TypeTag = TypeTag(0);

    pub fn is_unknown(self) -> bool {
        self == Self::UNKNOWN
    }
}

impl fmt::Debug for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeTag({})", self.0)
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reads the type tag stored in a field map, if any.
pub fn tag_of(data: &Map) -> TypeTag {
    data.get(TYPE_KEY)
        .and_then(Value::as_i64)
        .and_then(|t| u32::try_from(t).ok())
        .map(TypeTag)
        .unwrap_or(TypeTag::UNKNOWN)
}

/// Reads the resolved identifier stored in a field map, if any.
pub fn identifier_of(data: &Map) -> Option<&str> {
    data.get(IDENTIFIER_KEY).and_then(Value::as_str)
}

/// Stamps type and identifier into a field map.
pub fn stamp(data: &mut Map, tag: TypeTag, identifier: &str) {
    if !tag.is_unknown() {
        data.insert(TYPE_KEY.to_string(), Value::Int(i64::from(tag.0)));
    }
    data.insert(IDENTIFIER_KEY.to_string(), Value::from(identifier));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stamp_and_read_back() {
        let mut data = Map::new();
        stamp(&mut data, TypeTag(4), "42");
        assert_eq!(tag_of(&data), TypeTag(4));
        assert_eq!(identifier_of(&data), Some("42"));
    }

    #[test]
    fn unknown_tag_is_not_stamped() {
        let mut data = Map::new();
        stamp(&mut data, TypeTag::UNKNOWN, "");
        assert!(!data.contains_key(TYPE_KEY));
        assert_eq!(tag_of(&data), TypeTag::UNKNOWN);
        assert_eq!(identifier_of(&data), Some(""));
    }
}
