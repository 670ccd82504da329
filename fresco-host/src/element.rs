//! The custom-tag contract.
//!
//! The host page registers one tag; dropping `<fresco-app name=… url=…>`
//! into its tree loads and mounts the named application, and removing the
//! element unmounts it (destroying the cached record when a `destroy`
//! attribute is present). The registration facility itself belongs to the
//! host page; [`TagRegistry`] models its duplicate-definition guard.

use crate::manager::AppHost;
use fresco_platform::NodeId;
use fresco_types::AppConfig;
use std::collections::HashSet;
use tracing::warn;

/// The application tag. The scoping prefix and the private root-region
/// tags all derive from it.
pub const APP_TAG: &str = "fresco-app";

/// Private tag the application's head region is renamed to — a page allows
/// only one real head.
pub const APP_HEAD_TAG: &str = "fresco-app-head";

/// Private tag the application's body region is renamed to.
pub const APP_BODY_TAG: &str = "fresco-app-body";

/// One `<fresco-app>` element's host-facing behavior.
#[derive(Debug, Default)]
pub struct AppElement {
    app_name: String,
    app_url: String,
}

impl AppElement {
    /// Attributes the host page watches for changes.
    pub const OBSERVED_ATTRIBUTES: &[&str] = &["name", "url"];

    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(&self) -> &str {
        &self.app_name
    }

    pub fn url(&self) -> &str {
        &self.app_url
    }

    /// Attribute-change hook. Only the first non-empty value of each
    /// observed attribute is recorded; an application's identity does not
    /// change under it once set.
    pub fn attribute_changed(&mut self, attr: &str, _old: Option<&str>, new: Option<&str>) {
        let Some(new) = new.filter(|v| !v.is_empty()) else {
            return;
        };
        match attr {
            "name" if self.app_name.is_empty() => self.app_name = new.to_string(),
            "url" if self.app_url.is_empty() => self.app_url = new.to_string(),
            _ => {}
        }
    }

    /// Insertion hook: constructs or looks up the application record and
    /// begins loading, with the element itself as the mount point.
    pub async fn connected(&self, host: &AppHost, container: NodeId) {
        if self.app_name.is_empty() || self.app_url.is_empty() {
            warn!(
                name = %self.app_name,
                url = %self.app_url,
                "Application element connected without name/url"
            );
            return;
        }
        host.connect(AppConfig::new(&self.app_name, &self.app_url), container)
            .await;
    }

    /// Removal hook. `destroy` reflects the presence of the element's
    /// destroy attribute.
    pub fn disconnected(&self, host: &AppHost, destroy: bool) {
        host.disconnect(&self.app_name, destroy);
    }
}

/// Models the host page's custom-tag registration facility: defining the
/// same tag twice is a guarded no-op.
#[derive(Debug, Default)]
pub struct TagRegistry {
    defined: HashSet<String>,
}

impl TagRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tag. Returns `false` when it was already defined.
    pub fn define(&mut self, tag: &str) -> bool {
        self.defined.insert(tag.to_string())
    }

    pub fn is_defined(&self, tag: &str) -> bool {
        self.defined.contains(tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_non_empty_attribute_value_wins() {
        let mut element = AppElement::new();
        element.attribute_changed("name", None, Some("shop"));
        element.attribute_changed("url", None, Some("https://apps.example/shop/"));

        element.attribute_changed("name", Some("shop"), Some("other"));
        element.attribute_changed("url", None, Some("https://apps.example/other/"));

        assert_eq!(element.name(), "shop");
        assert_eq!(element.url(), "https://apps.example/shop/");
    }

    #[test]
    fn empty_and_unobserved_attributes_are_ignored() {
        let mut element = AppElement::new();
        element.attribute_changed("name", None, Some(""));
        element.attribute_changed("name", None, None);
        element.attribute_changed("class", None, Some("x"));
        assert!(element.name().is_empty());
        assert!(!AppElement::OBSERVED_ATTRIBUTES.contains(&"class"));
    }

    #[test]
    fn tag_definition_is_deduplicated() {
        let mut registry = TagRegistry::new();
        assert!(registry.define(APP_TAG));
        assert!(!registry.define(APP_TAG));
        assert!(registry.is_defined(APP_TAG));
        assert!(!registry.is_defined("other-tag"));
    }
}
