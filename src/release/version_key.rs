//! Orderable representation of dotted version strings
//!
//! Versions on the installer page are plain dotted integers ("15.1",
//! "15.2.1"), so a full semver parse is not needed. Segments are compared
//! numerically, which makes "15.10" sort above "15.2".

/// Sequence of numeric version segments, compared lexicographically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct VersionKey(Vec<u64>);

impl VersionKey {
    /// Key used for versions that are not purely numeric.
    ///
    /// It is empty and therefore orders below every well-formed version,
    /// including "0.0".
    pub const MALFORMED: VersionKey = VersionKey(Vec::new());

    /// Parse a dotted version string.
    ///
    /// Never fails: a version with any non-numeric segment (e.g. "15.x")
    /// maps to [`VersionKey::MALFORMED`] so that it sorts last instead of
    /// being excluded.
    pub fn parse(version: &str) -> Self {
        version
            .split('.')
            .map(|segment| segment.parse::<u64>())
            .collect::<Result<Vec<_>, _>>()
            .map(VersionKey)
            .unwrap_or(Self::MALFORMED)
    }

    pub fn is_malformed(&self) -> bool {
        self.0.is_empty()
    }

    pub fn segments(&self) -> &[u64] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("15.1", vec![15, 1])]
    #[case("15.2.1", vec![15, 2, 1])]
    #[case("14", vec![14])]
    #[case("15.10", vec![15, 10])]
    fn parse_returns_numeric_segments(#[case] input: &str, #[case] expected: Vec<u64>) {
        assert_eq!(VersionKey::parse(input).segments(), expected.as_slice());
    }

    #[rstest]
    #[case("15.x")]
    #[case("")]
    #[case("15..1")]
    #[case("v15.1")]
    #[case("15.1-beta")]
    #[case("-1.0")]
    fn parse_returns_sentinel_for_malformed_versions(#[case] input: &str) {
        let key = VersionKey::parse(input);
        assert!(key.is_malformed());
        assert_eq!(key, VersionKey::MALFORMED);
    }

    #[rstest]
    #[case("15.10", "15.2")]
    #[case("15.2.1", "15.2")]
    #[case("16.0", "15.99.99")]
    #[case("15.1.1", "15.1.0")]
    #[case("0.0", "15.x")]
    fn numeric_ordering_is_used(#[case] higher: &str, #[case] lower: &str) {
        assert!(VersionKey::parse(higher) > VersionKey::parse(lower));
    }

    #[test]
    fn numeric_ordering_differs_from_string_ordering() {
        // String comparison puts "15.10" before "15.2"
        assert!("15.10" < "15.2");
        assert!(VersionKey::parse("15.10") > VersionKey::parse("15.2"));
    }

    #[test]
    fn max_picks_highest_version_and_ignores_malformed() {
        let latest = ["15.1", "15.x", "15.10.1", "15.9"]
            .into_iter()
            .max_by_key(|v| VersionKey::parse(v));

        assert_eq!(latest, Some("15.10.1"));
    }
}
