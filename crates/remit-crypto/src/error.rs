/// Puzzle-builder errors.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("a commitment needs at least one secret factor")]
    NoFactors,

    #[error("too many factors: {count} exceeds the limit of {max}")]
    TooManyFactors { count: usize, max: usize },
}
