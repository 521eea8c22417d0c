//! Category taxonomy: reconciling the baseline list with labels observed in
//! stored records, and keyword-based suggestions for the admin form.

use std::collections::BTreeSet;

use crate::catalog::VideoRecord;
use crate::constants::constants;

/// Placeholder strings that leak in from loosely typed writers.
const NULL_LIKE: [&str; 2] = ["null", "undefined"];

fn is_meaningful(label: &str) -> bool {
  let trimmed = label.trim();
  !trimmed.is_empty() && !NULL_LIKE.iter().any(|n| trimmed.eq_ignore_ascii_case(n))
}

/// Position in the preferred order; unknown labels sort after every known one.
fn preferred_rank(label: &str) -> usize {
  constants().taxonomy.iter().position(|t| t == label).unwrap_or(usize::MAX)
}

/// Merge the baseline taxonomy with every label seen in `records` (primary
/// `category` and `tags`), deduplicated. The sentinel comes first, then the
/// taxonomy in its own order, then unrecognized labels lexicographically.
pub fn reconcile(records: &[VideoRecord]) -> Vec<String> {
  let c = constants();
  let observed: BTreeSet<&str> = records
    .iter()
    .flat_map(|r| std::iter::once(r.category.as_str()).chain(r.tags.iter().map(String::as_str)))
    .filter(|label| is_meaningful(label))
    .collect();

  if observed.is_empty() {
    return c.taxonomy.clone();
  }

  // BTreeSet iteration is lexicographic and the sort is stable, so unknowns
  // keep that order behind the ranked taxonomy entries.
  let mut merged: Vec<&str> = c
    .taxonomy
    .iter()
    .map(String::as_str)
    .chain(observed)
    .filter(|label| *label != c.all_category)
    .collect::<BTreeSet<_>>()
    .into_iter()
    .collect();
  merged.sort_by_key(|label| preferred_rank(label));

  std::iter::once(c.all_category.clone()).chain(merged.into_iter().map(str::to_string)).collect()
}

/// Suggest taxonomy categories for a title/description pair by keyword.
/// Output is in taxonomy order and never empty.
pub fn detect(title: &str, description: &str) -> Vec<String> {
  let c = constants();
  let haystack = format!("{title} {description}").to_lowercase();

  let mut found: Vec<String> = c
    .keywords
    .iter()
    .filter(|(_, words)| words.iter().any(|w| haystack.contains(w.as_str())))
    .map(|(category, _)| category.clone())
    .collect();
  found.sort_by_key(|label| preferred_rank(label));

  if found.is_empty() {
    found.push(c.fallback_category.clone());
  }
  found
}
