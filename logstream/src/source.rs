use async_trait::async_trait;
use futures_util::stream::BoxStream;

use cadence_types::Scope;

use crate::LogStreamError;

/// Raw text frames of one subscription. The stream ends when the remote
/// side closes; an `Err` item is the last item.
pub type LogFeed = BoxStream<'static, Result<String, LogStreamError>>;

/// Push-based log source addressed by scope.
#[async_trait]
pub trait LogSource: Send + Sync {
    /// Open a subscription for `scope`. Dropping the returned feed tears the
    /// subscription down.
    async fn subscribe(&self, scope: Scope) -> Result<LogFeed, LogStreamError>;
}
