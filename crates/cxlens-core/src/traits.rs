use crate::types::{Completion, CompletionRequest, Provenance};

/// Text-completion capability used by the qualitative path.
///
/// `complete` never fails: provider errors come back as a `Completion`
/// with a `Failed` provenance so a single question cannot abort a session.
/// Calls are synchronous and may block on network I/O; async callers should
/// go through `tokio::task::spawn_blocking`.
pub trait Completer: Send + Sync {
    fn complete(&self, request: &CompletionRequest) -> Completion;

    /// The provenance a call made now would resolve to, without calling out.
    fn mode(&self) -> Provenance;
}
