//! Citation rewriting for annotated model output

use std::fmt;
use std::future::Future;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Filename used when an annotation carries no backing file
pub const UNKNOWN_SOURCE: &str = "unknown source";

/// An in-line marker in model output that points at a source document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    /// Marker text as it appears in the output
    pub text: String,
    /// Backing provider file id, if any
    pub file_id: Option<String>,
}

/// One resolved reference: display index and source filename
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub index: usize,
    pub filename: String,
}

impl fmt::Display for Citation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]{}", self.index, self.filename)
    }
}

/// Replace each annotation's marker with `[i]`, in encounter order
///
/// Only the first remaining occurrence of each marker is replaced. An index
/// is consumed even if its marker is absent from the text.
pub fn rewrite_markers(text: &str, annotations: &[Annotation]) -> String {
    debug!(annotation_count = annotations.len(), "rewrite_markers: called");
    let mut out = text.to_string();
    for (index, annotation) in annotations.iter().enumerate() {
        if annotation.text.is_empty() {
            debug!(index, "rewrite_markers: empty marker, skipping");
            continue;
        }
        match out.find(&annotation.text) {
            Some(pos) => out.replace_range(pos..pos + annotation.text.len(), &format!("[{}]", index)),
            None => debug!(index, marker = %annotation.text, "rewrite_markers: marker not found"),
        }
    }
    out
}

/// Resolve each annotation's file to a filename, one citation per annotation
///
/// Lookups run sequentially so the list order matches marker order.
pub async fn resolve_citations<F, Fut, E>(annotations: &[Annotation], mut lookup: F) -> Result<Vec<Citation>, E>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<String, E>>,
{
    debug!(annotation_count = annotations.len(), "resolve_citations: called");
    let mut citations = Vec::with_capacity(annotations.len());
    for (index, annotation) in annotations.iter().enumerate() {
        let filename = match &annotation.file_id {
            Some(file_id) => lookup(file_id.clone()).await?,
            None => {
                warn!(index, "Annotation has no backing file");
                UNKNOWN_SOURCE.to_string()
            }
        };
        citations.push(Citation { index, filename });
    }
    Ok(citations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use proptest::prelude::*;

    fn annotation(text: &str, file_id: Option<&str>) -> Annotation {
        Annotation {
            text: text.to_string(),
            file_id: file_id.map(str::to_string),
        }
    }

    #[test]
    fn test_single_annotation_scenario() {
        let annotations = vec![annotation("[cite]", Some("file-1"))];
        let text = rewrite_markers("Result is good [cite].", &annotations);
        assert_eq!(text, "Result is good [0].");

        let citations: Vec<Citation> = block_on(resolve_citations(&annotations, |id| async move {
            assert_eq!(id, "file-1");
            Ok::<_, String>("report.pdf".to_string())
        }))
        .unwrap();
        let shown: Vec<String> = citations.iter().map(|c| c.to_string()).collect();
        assert_eq!(shown, vec!["[0]report.pdf"]);
    }

    #[test]
    fn test_repeated_marker_replaces_first_occurrence_each_time() {
        let annotations = vec![annotation("†", Some("a")), annotation("†", Some("b"))];
        assert_eq!(rewrite_markers("x† y† z†", &annotations), "x[0] y[1] z†");
    }

    #[test]
    fn test_missing_marker_still_consumes_index() {
        let annotations = vec![annotation("<gone>", None), annotation("<here>", None)];
        assert_eq!(rewrite_markers("see <here>", &annotations), "see [1]");
    }

    #[test]
    fn test_missing_file_id_is_unknown_source() {
        let annotations = vec![annotation("<a>", None)];
        let citations = block_on(resolve_citations(&annotations, |_| async {
            Err::<String, _>("should not be called")
        }))
        .unwrap();
        assert_eq!(citations[0].to_string(), "[0]unknown source");
    }

    #[test]
    fn test_lookup_failure_propagates() {
        let annotations = vec![annotation("<a>", Some("f1"))];
        let result = block_on(resolve_citations(&annotations, |_| async { Err::<String, _>("boom") }));
        assert_eq!(result.unwrap_err(), "boom");
    }

    proptest! {
        #[test]
        fn prop_n_markers_become_sequential_indices(
            fillers in proptest::collection::vec("[a-z ]{0,12}", 0..12)
        ) {
            let n = fillers.len();
            let annotations: Vec<Annotation> = (0..n)
                .map(|i| annotation(&format!("【{}:0†source】", i), Some(&format!("file-{}", i))))
                .collect();

            let mut text = String::new();
            for (i, filler) in fillers.iter().enumerate() {
                text.push_str(filler);
                text.push_str(&annotations[i].text);
            }

            let rewritten = rewrite_markers(&text, &annotations);
            prop_assert!(!rewritten.contains('【'));

            let mut cursor = 0;
            for i in 0..n {
                let needle = format!("[{}]", i);
                let found = rewritten[cursor..].find(&needle);
                prop_assert!(found.is_some(), "missing {} in {}", needle, rewritten);
                cursor += found.unwrap_or(0) + needle.len();
            }
            let past_end = format!("[{}]", n);
            prop_assert!(!rewritten.contains(&past_end));

            let citations = block_on(resolve_citations(&annotations, |id| async move {
                Ok::<_, String>(format!("{}.pdf", id))
            })).unwrap();
            prop_assert_eq!(citations.len(), n);
            for (i, c) in citations.iter().enumerate() {
                prop_assert_eq!(c.index, i);
                prop_assert_eq!(&c.filename, &format!("file-{}.pdf", i));
            }
        }
    }
}
