//! Best label selection.

use crate::error::{Error, Result};
use crate::model::LabelTable;

/// The most likely label for an image.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    /// Position of the label in the label table.
    pub index: usize,

    /// The label text.
    pub label: String,

    /// Probability reported by the model, in `[0, 1]` for softmax outputs.
    pub probability: f32,
}

/// Pick the label with the highest probability.
///
/// The scan is index-ascending and only a strictly greater value replaces
/// the current best, so the first of several equal maxima wins.
///
/// # Errors
///
/// Returns an error if the number of probabilities differs from the number
/// of labels, or if there is nothing to choose from.
pub fn arg_max(probabilities: &[f32], labels: &LabelTable) -> Result<Classification> {
    if probabilities.len() != labels.len() {
        return Err(Error::LabelCountMismatch {
            probabilities: probabilities.len(),
            labels: labels.len(),
        });
    }

    let mut best = 0;
    for (i, &p) in probabilities.iter().enumerate().skip(1) {
        if p > probabilities[best] {
            best = i;
            tracing::debug!("New best label #{i} with probability {p}");
        }
    }

    match (probabilities.get(best), labels.get(best)) {
        (Some(&probability), Some(label)) => Ok(Classification {
            index: best,
            label: label.to_string(),
            probability,
        }),
        _ => Err(Error::ShapeMismatch {
            expected: "at least one probability".to_string(),
            actual: "none".to_string(),
        }),
    }
}

/// Format the result line printed for the best label.
///
/// The percentage is computed in `f64` from the exact `f32` probability and
/// printed with two decimals, e.g. `BEST MATCH: dog (70.00% likely)`.
#[must_use]
pub fn format_best_match(best: &Classification) -> String {
    format!(
        "BEST MATCH: {} ({:.2}% likely)",
        best.label,
        f64::from(best.probability) * 100.0
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(names: &[&str]) -> LabelTable {
        names.iter().copied().collect()
    }

    #[test]
    fn test_picks_maximum() {
        let best = arg_max(&[0.1, 0.7, 0.2], &labels(&["cat", "dog", "fish"])).unwrap();

        assert_eq!(
            best,
            Classification {
                index: 1,
                label: "dog".to_string(),
                probability: 0.7,
            }
        );
    }

    #[test]
    fn test_first_maximum_wins() {
        let best = arg_max(&[0.5, 0.5], &labels(&["heads", "tails"])).unwrap();
        assert_eq!(best.index, 0);
        assert_eq!(best.label, "heads");
    }

    #[test]
    fn test_later_tie_does_not_replace() {
        let best = arg_max(&[0.1, 0.4, 0.1, 0.4], &labels(&["a", "b", "c", "d"])).unwrap();
        assert_eq!(best.index, 1);
    }

    #[test]
    fn test_count_mismatch() {
        let err = arg_max(&[0.1, 0.2, 0.3, 0.4], &labels(&["a", "b", "c", "d", "e"])).unwrap_err();
        assert!(matches!(
            err,
            Error::LabelCountMismatch {
                probabilities: 4,
                labels: 5
            }
        ));
    }

    #[test]
    fn test_empty() {
        let err = arg_max(&[], &LabelTable::default()).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
    }

    #[test]
    fn test_format_best_match() {
        let best = arg_max(&[0.1, 0.7, 0.2], &labels(&["cat", "dog", "fish"])).unwrap();
        assert_eq!(format_best_match(&best), "BEST MATCH: dog (70.00% likely)");
    }

    #[test]
    fn test_format_best_match_keeps_two_decimals() {
        let certain = Classification {
            index: 0,
            label: "golden retriever".to_string(),
            probability: 1.0,
        };
        assert_eq!(
            format_best_match(&certain),
            "BEST MATCH: golden retriever (100.00% likely)"
        );

        let unlikely = Classification {
            probability: 0.0,
            ..certain
        };
        assert_eq!(
            format_best_match(&unlikely),
            "BEST MATCH: golden retriever (0.00% likely)"
        );
    }
}
