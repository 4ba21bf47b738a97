use crate::error::CheckerError;
use crate::models::Verdict;
use chrono::{Duration, NaiveDateTime};

/// Upload-system stamps look like `20171006031150569` (`YYYYMMDDHHMMSSsss`)
const UPLOAD_FORMAT: &str = "%Y%m%d%H%M%S";
const UPLOAD_OUTPUT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const COMMIT_OUTPUT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

/// Normalize an upload-system stamp to `YYYY-MM-DDTHH:MM:SS`.
///
/// Anything that is not all digits is returned unchanged, so the function is
/// idempotent and leaves sentinels like `Missing` alone. The sub-second digits
/// are discarded.
pub fn normalize_upload_stamp(raw: &str) -> Result<String, CheckerError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Ok(raw.to_string());
    }

    let head = trimmed
        .get(..14)
        .ok_or_else(|| CheckerError::MalformedTimestamp(raw.to_string()))?;

    let parsed = NaiveDateTime::parse_from_str(head, UPLOAD_FORMAT)
        .map_err(|_| CheckerError::MalformedTimestamp(raw.to_string()))?;

    Ok(parsed.format(UPLOAD_OUTPUT_FORMAT).to_string())
}

/// Read a strict ISO 8601 commit date (git's `%cI`) and shift it by its UTC
/// offset, returning `YYYY-MM-DD HH:MM:SS`.
///
/// A missing offset (or `Z`) counts as zero.
pub fn normalize_commit_stamp(raw: &str) -> Result<String, CheckerError> {
    let raw = raw.trim();
    let malformed = || CheckerError::MalformedTimestamp(raw.to_string());

    let naive_part = raw.get(..19).ok_or_else(malformed)?;
    let naive = parse_naive(naive_part).ok_or_else(malformed)?;

    let offset = match raw.get(19..20) {
        Some(sign @ ("+" | "-")) => {
            let (hours, minutes) = raw[20..].split_once(':').ok_or_else(malformed)?;
            let hours: i64 = hours.trim().parse().map_err(|_| malformed())?;
            let minutes: i64 = minutes.trim().parse().map_err(|_| malformed())?;
            let delta = Duration::hours(hours) + Duration::minutes(minutes);
            // a local time ahead of UTC has to be pulled back, and vice versa
            if sign == "-" {
                delta
            } else {
                -delta
            }
        }
        Some("Z") | None => Duration::zero(),
        Some(_) => return Err(malformed()),
    };

    Ok((naive + offset).format(COMMIT_OUTPUT_FORMAT).to_string())
}

fn parse_naive(value: &str) -> Option<NaiveDateTime> {
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
}

/// Both normalized forms compare against the deadline lexicographically; the
/// date/time separator is folded to a space so `T` and ` ` spellings order
/// the same way.
fn comparable(value: &str) -> String {
    let mut out = value.trim().to_string();
    if out.len() >= 11 && out.as_bytes()[10] == b'T' {
        out.replace_range(10..11, " ");
    }
    out
}

/// Assignment deadline in the same fixed-width form as the normalized stamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deadline(String);

impl Deadline {
    pub fn parse(raw: &str) -> Result<Self, CheckerError> {
        let trimmed = raw.trim();
        if trimmed.len() != 19 || parse_naive(trimmed).is_none() {
            return Err(CheckerError::MalformedDeadline(raw.to_string()));
        }
        Ok(Self(comparable(trimmed)))
    }

    /// Commit stamps must land strictly before the deadline.
    pub fn commit_verdict(&self, normalized: &str) -> Verdict {
        if comparable(normalized) < self.0 {
            Verdict::Ok
        } else {
            Verdict::Late
        }
    }

    /// Upload stamps may land exactly on the deadline.
    pub fn upload_verdict(&self, normalized: &str) -> Verdict {
        if comparable(normalized) <= self.0 {
            Verdict::Ok
        } else {
            Verdict::Late
        }
    }
}

impl std::fmt::Display for Deadline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_stamp_drops_millis() {
        assert_eq!(
            normalize_upload_stamp("20171006031150569").unwrap(),
            "2017-10-06T03:11:50"
        );
    }

    #[test]
    fn test_upload_stamp_is_idempotent() {
        let once = normalize_upload_stamp("20171006031150569").unwrap();
        let twice = normalize_upload_stamp(&once).unwrap();
        assert_eq!(once, twice);
        assert_eq!(normalize_upload_stamp("Missing").unwrap(), "Missing");
    }

    #[test]
    fn test_upload_stamp_tolerates_trailing_newline() {
        assert_eq!(
            normalize_upload_stamp("20171006031150569\n").unwrap(),
            "2017-10-06T03:11:50"
        );
    }

    #[test]
    fn test_upload_stamp_rejects_short_digits() {
        assert!(normalize_upload_stamp("2017100603").is_err());
        assert!(normalize_upload_stamp("20171306031150569").is_err());
    }

    #[test]
    fn test_commit_stamp_applies_offset() {
        assert_eq!(
            normalize_commit_stamp("2017-10-05T23:50:00-04:00").unwrap(),
            "2017-10-06 03:50:00"
        );
        assert_eq!(
            normalize_commit_stamp("2017-10-06T03:50:00+00:00").unwrap(),
            "2017-10-06 03:50:00"
        );
        assert_eq!(
            normalize_commit_stamp("2017-10-06T05:20:00+01:30\n").unwrap(),
            "2017-10-06 03:50:00"
        );
    }

    #[test]
    fn test_commit_stamp_without_offset() {
        assert_eq!(
            normalize_commit_stamp("2017-10-06T03:50:00").unwrap(),
            "2017-10-06 03:50:00"
        );
        assert_eq!(
            normalize_commit_stamp("2017-10-06T03:50:00Z").unwrap(),
            "2017-10-06 03:50:00"
        );
    }

    #[test]
    fn test_commit_stamp_rejects_garbage() {
        assert!(normalize_commit_stamp("not a date").is_err());
        assert!(normalize_commit_stamp("2017-10-06T03:50:00*04:00").is_err());
    }

    #[test]
    fn test_deadline_boundary_is_asymmetric() {
        let deadline = Deadline::parse("2017-10-06 03:50:00").unwrap();

        assert_eq!(deadline.commit_verdict("2017-10-06 03:50:00"), Verdict::Late);
        assert_eq!(deadline.upload_verdict("2017-10-06T03:50:00"), Verdict::Ok);

        assert_eq!(deadline.commit_verdict("2017-10-06 03:49:59"), Verdict::Ok);
        assert_eq!(deadline.upload_verdict("2017-10-06T03:50:01"), Verdict::Late);
    }

    #[test]
    fn test_deadline_accepts_either_separator() {
        let spaced = Deadline::parse("2017-10-06 03:50:00").unwrap();
        let iso = Deadline::parse("2017-10-06T03:50:00").unwrap();
        assert_eq!(spaced, iso);
        assert!(Deadline::parse("2017-10-06").is_err());
        assert!(Deadline::parse("tomorrow at noon!!").is_err());
    }
}
