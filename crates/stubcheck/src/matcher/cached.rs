//! Comparison values with a pre-computed lowercase form.

/// A string value with pre-computed lowercase for case-insensitive matching.
///
/// Lowercasing the configured side once at registration leaves only the
/// inbound value to fold on each comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedValue {
    /// Original value (for case-sensitive matching)
    pub value: String,
    /// Pre-computed lowercase (for case-insensitive matching)
    pub lower: String,
}

impl CachedValue {
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        let lower = value.to_lowercase();
        Self { value, lower }
    }

    /// Check equality against a string value.
    #[inline]
    pub fn equals(&self, value: &str, ignore_case: bool) -> bool {
        if ignore_case {
            value.to_lowercase() == self.lower
        } else {
            value == self.value
        }
    }

    /// Check if a string value contains this pattern.
    #[inline]
    pub fn contained_in(&self, value: &str, ignore_case: bool) -> bool {
        if ignore_case {
            value.to_lowercase().contains(&self.lower)
        } else {
            value.contains(&self.value)
        }
    }
}

impl From<&str> for CachedValue {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cached_value_new() {
        let cv = CachedValue::new("Hello World");
        assert_eq!(cv.value, "Hello World");
        assert_eq!(cv.lower, "hello world");
    }

    #[test]
    fn test_cached_value_equals() {
        let cv = CachedValue::new("Test");

        assert!(cv.equals("Test", false));
        assert!(!cv.equals("test", false));

        assert!(cv.equals("test", true));
        assert!(cv.equals("tEsT", true));
    }

    #[test]
    fn test_cached_value_contained_in() {
        let cv = CachedValue::new("api");

        assert!(cv.contained_in("/api/users", false));
        assert!(!cv.contained_in("/API/users", false));
        assert!(cv.contained_in("/API/users", true));
    }
}
