//! Per-application configuration.

use serde::{Deserialize, Serialize};

/// Identity of one sub-application: its unique name and the origin of its
/// markup. The name is the registry key and the value carried in the
/// style-scoping prefix, so it must be stable for the life of the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    pub name: String,
    pub url: String,
}

impl AppConfig {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construction() {
        let config = AppConfig::new("shop", "https://apps.example/shop/");
        assert_eq!(config.name, "shop");
        assert_eq!(config.url, "https://apps.example/shop/");
    }
}
