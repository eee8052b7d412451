/*!
 * Tests for text normalization of extracted pages
 */

use rentura::acquisition::normalize::{join_pages, merge_hyphenated_breaks, normalize_text, truncate_chars};

#[test]
fn test_joinPages_withHyphenAcrossPages_shouldKeepPagesSeparate() {
    let text = join_pages(&["Die Schönheits-\nreparaturen", "§ 2 Miete"]);
    assert_eq!(text, "Die Schönheitsreparaturen\n\n§ 2 Miete");
}

#[test]
fn test_normalizeText_withBlankRuns_shouldKeepOneBlankLine() {
    assert_eq!(normalize_text("§ 1\n\n\n\n\n§ 2"), "§ 1\n\n§ 2");
}

#[test]
fn test_mergeHyphenatedBreaks_appliedTwice_shouldBeStable() {
    let once = merge_hyphenated_breaks("Neben-\nkosten-\nabrechnung");
    assert_eq!(once, "Nebenkostenabrechnung");
    assert_eq!(merge_hyphenated_breaks(&once), once);
}

#[test]
fn test_mergeHyphenatedBreaks_withDashBeforeSpace_shouldKeepDash() {
    assert_eq!(merge_hyphenated_breaks("Miet- und Pachtrecht"), "Miet- und Pachtrecht");
}

#[test]
fn test_truncateChars_withUmlauts_shouldCountCharactersNotBytes() {
    let (text, truncated) = truncate_chars("äöüß", 3);
    assert_eq!(text, "äöü");
    assert!(truncated);

    let (text, truncated) = truncate_chars("äöü", 3);
    assert_eq!(text, "äöü");
    assert!(!truncated);
}
