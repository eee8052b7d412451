/*!
 * Tests for parsing the severity-ranked summary
 */

use rentura::aggregation::parse_summary;
use rentura::providers::mock::MockOracle;

#[test]
fn test_parseSummary_withGeneratedSummary_shouldRankBySeverity() {
    let parsed = parse_summary(&MockOracle::generate_summary(4), 10);

    let severities: Vec<u8> = parsed.issues.iter().map(|issue| issue.severity).collect();
    assert_eq!(severities, vec![4, 3, 2, 1]);
    assert!(parsed.unparsed.is_empty());
}

#[test]
fn test_parseSummary_withOutOfRangeScore_shouldNotInventIssue() {
    let parsed = parse_summary("• Mietpreisbremse verletzt\nWahrscheinlichkeit: 12/10", 10);

    assert!(parsed.issues.is_empty());
    assert_eq!(parsed.unparsed.len(), 2);
}

#[test]
fn test_parseSummary_withProse_shouldReportUnparsedLines() {
    let parsed = parse_summary("Keine Auffälligkeiten gefunden.", 10);

    assert!(parsed.issues.is_empty());
    assert_eq!(parsed.unparsed, vec!["Keine Auffälligkeiten gefunden."]);
}

#[test]
fn test_parseSummary_withMoreThanLimit_shouldKeepMostSevere() {
    let parsed = parse_summary(&MockOracle::generate_summary(12), 10);

    assert_eq!(parsed.issues.len(), 10);
    assert_eq!(parsed.issues[0].severity, 10);
}
