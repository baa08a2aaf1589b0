use std::collections::HashSet;

/// Names assigned anywhere in the current invocation.
///
/// Grows monotonically: once a bare name is promoted, every reference to it
/// in the generated code reads from `$__scope` instead of `$__data`,
/// including references emitted before the promotion.
#[derive(Debug, Clone, Default)]
pub struct ScopeSet {
    locals: HashSet<String>,
}

impl ScopeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_local(&self, name: &str) -> bool {
        self.locals.contains(name)
    }

    /// Returns `true` when the name was not local before.
    pub fn promote(&mut self, name: &str) -> bool {
        self.locals.insert(name.to_string())
    }

    pub fn len(&self) -> usize {
        self.locals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locals.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_promotion_is_monotonic() {
        let mut scope = ScopeSet::new();
        assert!(!scope.is_local("items"));
        assert!(scope.promote("items"));
        assert!(!scope.promote("items"));
        assert!(scope.is_local("items"));
        assert_eq!(scope.len(), 1);
    }
}
