//! The (plugin, session) pair that isolates version lists and log streams.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{PluginId, SessionId};

/// One configurable job family.
///
/// Displays as `"{plugin}/{session}"`, which is also the key of the live log
/// endpoint for that family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scope {
    pub plugin: PluginId,
    pub session: SessionId,
}

impl Scope {
    #[must_use]
    pub const fn new(plugin: PluginId, session: SessionId) -> Self {
        Self { plugin, session }
    }

    #[must_use]
    pub const fn with_plugin(self, plugin: PluginId) -> Self {
        Self { plugin, ..self }
    }

    #[must_use]
    pub const fn with_session(self, session: SessionId) -> Self {
        Self { session, ..self }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.plugin, self.session)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid scope {raw:?}: expected \"<plugin>/<session>\"")]
pub struct ScopeParseError {
    pub raw: String,
}

impl FromStr for Scope {
    type Err = ScopeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ScopeParseError { raw: s.to_string() };
        let (plugin, session) = s.trim().split_once('/').ok_or_else(err)?;
        let plugin = plugin.trim().parse::<u64>().map_err(|_| err())?;
        let session = session.trim().parse::<u64>().map_err(|_| err())?;
        Ok(Self::new(PluginId::new(plugin), SessionId::new(session)))
    }
}
