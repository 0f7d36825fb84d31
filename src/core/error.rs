use thiserror::Error;

/// Hard failures only. Malformed queries, empty results and unknown
/// collections are all recovered into benign results before they can
/// reach this type, and authorization is a response variant rather
/// than an error.
#[derive(Debug, Error)]
pub enum Error {
    /// The index snapshot could not be produced. Empty and unavailable
    /// are different things to the caller, so this crosses the boundary.
    #[error("term index unavailable: {0}")]
    IndexUnavailable(String),

    /// A cycle in the collection hierarchy, detected at load time.
    #[error("collection hierarchy cycle through '{0}'")]
    CollectionCycle(String),

    /// Collection configuration that cannot be loaded (duplicate name,
    /// child reference to an undefined collection).
    #[error("invalid collection configuration: {0}")]
    InvalidConfiguration(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_failing_collection() {
        let err = Error::CollectionCycle("Theses".to_string());
        assert!(err.to_string().contains("Theses"));
    }
}
