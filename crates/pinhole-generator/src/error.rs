use thiserror::Error;

/// Errors returned by in-process candidate generation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GeneratorError {
    #[error("no unused candidate found within {attempts} attempts")]
    Exhausted { attempts: usize },
}
