use regex::Regex;
use std::sync::LazyLock;

// Hardcoded pattern, so a failure here is a source bug.
static ISO_DURATION: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^PT(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?$").expect("hardcoded duration regex is invalid"));

/// Render a `PT#H#M#S` duration as a clock string: `H:MM:SS` when there are
/// hours, `M:SS` otherwise. Anything that doesn't parse yields `None`.
pub fn format_duration(duration: Option<&str>) -> Option<String> {
  let caps = ISO_DURATION.captures(duration?.trim())?;
  let part = |idx: usize| -> Option<u64> {
    match caps.get(idx) {
      Some(m) => m.as_str().parse().ok(),
      None => Some(0),
    }
  };
  let (hours, minutes, seconds) = (part(1)?, part(2)?, part(3)?);

  if hours > 0 {
    Some(format!("{}:{:02}:{:02}", hours, minutes, seconds))
  } else {
    Some(format!("{}:{:02}", minutes, seconds))
  }
}

/// Encode a second count in the same `PT#H#M#S` form the Data API uses.
pub fn iso_from_seconds(total: u64) -> String {
  let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
  let mut out = String::from("PT");
  if hours > 0 {
    out.push_str(&format!("{hours}H"));
  }
  if minutes > 0 {
    out.push_str(&format!("{minutes}M"));
  }
  if seconds > 0 || total == 0 {
    out.push_str(&format!("{seconds}S"));
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn minutes_and_seconds() {
    assert_eq!(format_duration(Some("PT4M13S")).as_deref(), Some("4:13"));
    assert_eq!(format_duration(Some("PT45S")).as_deref(), Some("0:45"));
    assert_eq!(format_duration(Some("PT10M")).as_deref(), Some("10:00"));
  }

  #[test]
  fn hours_pad_minutes_and_seconds() {
    assert_eq!(format_duration(Some("PT1H2M3S")).as_deref(), Some("1:02:03"));
    assert_eq!(format_duration(Some("PT2H")).as_deref(), Some("2:00:00"));
    assert_eq!(format_duration(Some("PT12H5S")).as_deref(), Some("12:00:05"));
  }

  #[test]
  fn absent_or_unparseable_is_none() {
    assert_eq!(format_duration(None), None);
    assert_eq!(format_duration(Some("garbage")), None);
    assert_eq!(format_duration(Some("")), None);
    assert_eq!(format_duration(Some("P1DT2H")), None);
    assert_eq!(format_duration(Some("PT99999999999999999999999S")), None);
  }

  #[test]
  fn seconds_encode_to_iso() {
    assert_eq!(iso_from_seconds(0), "PT0S");
    assert_eq!(iso_from_seconds(253), "PT4M13S");
    assert_eq!(iso_from_seconds(3723), "PT1H2M3S");
    assert_eq!(iso_from_seconds(7200), "PT2H");
    assert_eq!(format_duration(Some(&iso_from_seconds(3723))).as_deref(), Some("1:02:03"));
  }
}
