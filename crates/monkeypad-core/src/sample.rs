//! Code samples and the search-filtered view over a collection.

use serde::Serialize;

use crate::error::CoreError;
use crate::id::SampleId;

/// A named, stored snippet of source text.
///
/// Names are display strings and are not guaranteed unique by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeSample {
    pub id: SampleId,
    pub name: String,
    pub code: String,
}

/// A sample the user wants to add. The service assigns the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewSample {
    pub name: String,
    pub code: String,
}

impl NewSample {
    /// Builds a sample after checking that both fields are non-empty once
    /// trimmed. The stored text is kept as given.
    pub fn new(name: impl Into<String>, code: impl Into<String>) -> Result<Self, CoreError> {
        let name = name.into();
        let code = code.into();
        if name.trim().is_empty() {
            return Err(CoreError::EmptyField { field: "name" });
        }
        if code.trim().is_empty() {
            return Err(CoreError::EmptyField { field: "code" });
        }
        Ok(NewSample { name, code })
    }
}

/// Case-insensitive substring match of `term` within `name`.
///
/// The empty term matches every name.
pub fn name_matches(name: &str, term: &str) -> bool {
    term.is_empty() || name.to_lowercase().contains(&term.to_lowercase())
}

/// Returns the subsequence of `samples` whose names match `term`,
/// preserving the service-defined order.
pub fn filter_samples(samples: &[CodeSample], term: &str) -> Vec<CodeSample> {
    samples
        .iter()
        .filter(|s| name_matches(&s.name, term))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample(id: &str, name: &str) -> CodeSample {
        CodeSample {
            id: SampleId::from(id),
            name: name.to_string(),
            code: format!("// {}", name),
        }
    }

    #[test]
    fn new_sample_rejects_blank_fields() {
        assert_eq!(
            NewSample::new("", "let x = 1;"),
            Err(CoreError::EmptyField { field: "name" })
        );
        assert_eq!(
            NewSample::new("fib", "  \n\t"),
            Err(CoreError::EmptyField { field: "code" })
        );
        let ok = NewSample::new(" fib ", "let x = 1;").unwrap();
        assert_eq!(ok.name, " fib ");
    }

    #[test]
    fn filter_is_case_insensitive_and_keeps_order() {
        let samples = vec![
            sample("3", "Fibonacci"),
            sample("1", "hello world"),
            sample("2", "fib-iterative"),
        ];
        let view = filter_samples(&samples, "FIB");
        let ids: Vec<&str> = view.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["3", "2"]);
    }

    #[test]
    fn empty_term_is_identity() {
        let samples = vec![sample("1", "a"), sample("2", "b")];
        assert_eq!(filter_samples(&samples, ""), samples);
    }

    proptest! {
        #[test]
        fn filtered_view_is_matching_subsequence(
            names in proptest::collection::vec("[a-zA-Z ]{0,8}", 0..12),
            term in "[a-zA-Z]{0,3}",
        ) {
            let samples: Vec<CodeSample> = names
                .iter()
                .enumerate()
                .map(|(i, n)| sample(&i.to_string(), n))
                .collect();
            let view = filter_samples(&samples, &term);

            let expected: Vec<CodeSample> = samples
                .iter()
                .filter(|s| term.is_empty()
                    || s.name.to_lowercase().contains(&term.to_lowercase()))
                .cloned()
                .collect();
            prop_assert_eq!(&view, &expected);

            // Every view element appears in the collection, in order.
            let mut cursor = samples.iter();
            for item in &view {
                prop_assert!(cursor.any(|s| s == item));
            }
        }
    }
}
