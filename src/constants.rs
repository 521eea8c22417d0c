//! Application constants loaded from `constants.ron` at compile time.
//!
//! The RON file is embedded via `include_str!` so the taxonomy and keyword
//! sets ship inside the binary. Parsed once on first access via `LazyLock`.

use serde::Deserialize;
use std::sync::LazyLock;

/// All tuneable application constants.
#[derive(Debug, Deserialize)]
pub struct Constants {
  /// Baseline taxonomy, in preferred display order.
  pub taxonomy: Vec<String>,
  /// Sentinel category that disables category filtering.
  pub all_category: String,
  /// Returned by detection when no keyword matches.
  pub fallback_category: String,
  /// Keyword sets per taxonomy category (everything except the sentinel).
  pub keywords: Vec<(String, Vec<String>)>,

  // YouTube
  pub thumbnail_template: String,
  pub youtube_api_base: String,
  pub backfill_concurrency: usize,

  // UI
  pub error_dismiss_secs: u64,
}

static CONSTANTS: LazyLock<Constants> = LazyLock::new(|| {
  // Safety: the RON file is embedded at compile time; if it's malformed this is a build-time error.
  ron::from_str(include_str!("../constants.ron")).expect("constants.ron must be valid RON (embedded at compile time)")
});

/// Returns a reference to the parsed application constants.
pub fn constants() -> &'static Constants {
  &CONSTANTS
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn taxonomy_starts_with_sentinel() {
    let c = constants();
    assert_eq!(c.taxonomy.first(), Some(&c.all_category));
    assert_eq!(c.taxonomy.len(), 6);
  }

  #[test]
  fn every_keyword_category_is_in_taxonomy() {
    let c = constants();
    for (category, words) in &c.keywords {
      assert!(c.taxonomy.contains(category), "{category} missing from taxonomy");
      assert!(!words.is_empty());
    }
    assert!(c.keywords.iter().all(|(name, _)| *name != c.all_category));
  }
}
