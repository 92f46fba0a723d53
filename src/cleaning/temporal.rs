//! Temporal column detection by name.

/// Decides from a column name whether the column holds dates.
pub trait TemporalNamePredicate: Send + Sync {
    fn is_temporal(&self, column: &str) -> bool;
}

/// Case-insensitive substring match against a list of marker tokens.
#[derive(Debug, Clone)]
pub struct MarkerTokens {
    tokens: Vec<String>,
}

impl MarkerTokens {
    pub fn new<S: AsRef<str>>(tokens: impl IntoIterator<Item = S>) -> Self {
        Self {
            tokens: tokens
                .into_iter()
                .map(|t| t.as_ref().trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }
}

impl Default for MarkerTokens {
    fn default() -> Self {
        Self::new(["date", "fecha"])
    }
}

impl TemporalNamePredicate for MarkerTokens {
    fn is_temporal(&self, column: &str) -> bool {
        let column = column.to_lowercase();
        self.tokens.iter().any(|t| column.contains(t.as_str()))
    }
}

impl<F> TemporalNamePredicate for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn is_temporal(&self, column: &str) -> bool {
        self(column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_tokens_case_insensitive() {
        let markers = MarkerTokens::default();
        assert!(markers.is_temporal("Fecha Registro"));
        assert!(markers.is_temporal("signup_DATE"));
        assert!(markers.is_temporal("updated"));
        assert!(!markers.is_temporal("score"));
    }

    #[test]
    fn test_closure_predicate() {
        let predicate = |name: &str| name.ends_with("_at");
        assert!(predicate.is_temporal("created_at"));
        assert!(!predicate.is_temporal("created"));
    }
}
