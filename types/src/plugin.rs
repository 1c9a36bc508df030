use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::PluginId;

/// A schedulable plugin as listed by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginDescriptor {
    pub id: PluginId,
    /// Import path of the plugin class, e.g. `plugins.sample_plugin@v0_2_0.Plugin`.
    pub package: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Execution interval in seconds.
    pub interval: u64,
}

impl PluginDescriptor {
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval)
    }

    /// Module part of the package path (everything before the class name).
    #[must_use]
    pub fn module(&self) -> &str {
        self.package
            .rsplit_once('.')
            .map_or(self.package.as_str(), |(module, _)| module)
    }

    #[must_use]
    pub fn class_name(&self) -> &str {
        self.package
            .rsplit_once('.')
            .map_or(self.package.as_str(), |(_, class)| class)
    }

    /// Version tag encoded in the module name (`name@v0_2_0` → `0.2.0`).
    #[must_use]
    pub fn version_tag(&self) -> Option<String> {
        let module = self.module();
        let last = module.rsplit('.').next().unwrap_or(module);
        let (_, tag) = last.split_once('@')?;
        let tag = tag.strip_prefix('v').unwrap_or(tag);
        Some(tag.replace('_', "."))
    }
}
