//! Static registry of measurement targets.

use serde::{Deserialize, Serialize};

/// A measurement endpoint. Immutable once registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub id: String,
    pub name: String,
    pub url: String,
    pub region: String,
}

impl Target {
    pub fn new(id: &str, name: &str, url: &str, region: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            url: url.to_string(),
            region: region.to_string(),
        }
    }
}

/// Fixed list of targets, selectable by id. Not editable at runtime.
#[derive(Debug, Clone)]
pub struct TargetRegistry {
    targets: Vec<Target>,
}

impl Default for TargetRegistry {
    fn default() -> Self {
        Self::new(vec![
            Target::new("cloudflare", "Cloudflare", "https://1.1.1.1/cdn-cgi/trace", "Global"),
            Target::new("google", "Google", "https://clients3.google.com/generate_204", "Global"),
            Target::new("microsoft", "Microsoft", "https://www.microsoft.com", "Global"),
            Target::new("example", "Example", "https://example.com", "US East"),
        ])
    }
}

impl TargetRegistry {
    /// Build a registry from an explicit list. The first entry is the default
    /// selection.
    pub fn new(targets: Vec<Target>) -> Self {
        Self { targets }
    }

    pub fn all(&self) -> &[Target] {
        &self.targets
    }

    pub fn get(&self, id: &str) -> Option<&Target> {
        self.targets.iter().find(|t| t.id == id)
    }

    pub fn default_target(&self) -> Option<&Target> {
        self.targets.first()
    }

    /// Look up `id`, falling back to the default target when it is unknown.
    pub fn get_or_default(&self, id: &str) -> Option<&Target> {
        self.get(id).or_else(|| {
            tracing::warn!("Unknown target '{}', using default", id);
            self.default_target()
        })
    }
}
