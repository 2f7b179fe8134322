/// Collaborator-defined storage failure, re-exported so a real storage
/// backend can map its own errors into it without the engine depending on
/// any one backend.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl StorageError {
    pub fn backend<E: std::error::Error + Send + Sync + 'static>(err: E) -> Self { StorageError::Backend(Box::new(err)) }
}
