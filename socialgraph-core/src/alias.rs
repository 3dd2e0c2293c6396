use std::collections::HashMap;

/// Identifier aliases owned by one adapter, such as `me` for the signed-in user.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    aliases: HashMap<String, String>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `alias -> canonical`. Returns true when the mapping changed.
    pub fn insert(&mut self, alias: &str, canonical: &str) -> bool {
        if alias.is_empty() || canonical.is_empty() || alias == canonical {
            return false;
        }
        self.aliases.insert(alias.to_string(), canonical.to_string()).as_deref() != Some(canonical)
    }

    pub fn get(&self, alias: &str) -> Option<&str> {
        self.aliases.get(alias).map(String::as_str)
    }

    /// The canonical identifier, or `identifier` itself when it is no alias.
    pub fn resolve<'a>(&'a self, identifier: &'a str) -> &'a str {
        self.get(identifier).unwrap_or(identifier)
    }
}
