//! Per-field update intent for merge writes.

/// Leave the stored value alone, overwrite it, or write NULL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldPatch<T> {
    Unchanged,
    Set(T),
    Clear,
}

impl<T> Default for FieldPatch<T> {
    fn default() -> Self {
        FieldPatch::Unchanged
    }
}

impl<T> FieldPatch<T> {
    /// `Some` overwrites, `None` leaves the stored value alone.
    pub fn set_if_some(value: Option<T>) -> Self {
        value.map_or(FieldPatch::Unchanged, FieldPatch::Set)
    }

    /// `Some` overwrites, `None` writes NULL.
    pub fn set_or_clear(value: Option<T>) -> Self {
        value.map_or(FieldPatch::Clear, FieldPatch::Set)
    }

    pub fn is_unchanged(&self) -> bool {
        matches!(self, FieldPatch::Unchanged)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> FieldPatch<U> {
        match self {
            FieldPatch::Unchanged => FieldPatch::Unchanged,
            FieldPatch::Set(v) => FieldPatch::Set(f(v)),
            FieldPatch::Clear => FieldPatch::Clear,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors() {
        assert_eq!(FieldPatch::set_if_some(Some(1)), FieldPatch::Set(1));
        assert_eq!(FieldPatch::<i32>::set_if_some(None), FieldPatch::Unchanged);
        assert_eq!(FieldPatch::<i32>::set_or_clear(None), FieldPatch::Clear);
        assert!(FieldPatch::<i32>::default().is_unchanged());
        assert_eq!(FieldPatch::Set(2).map(|v| v * 10), FieldPatch::Set(20));
    }
}
