use crate::evaluation::Verdict;

/// Heading introducing the serialized verdicts in a synthesis request
pub const ANSWERS_HEADING: &str = "Antworten:";

/// Anchoring text of the severity line
pub const SEVERITY_LABEL: &str =
    "Wahrscheinlichkeit der Unwirksamkeit (wobei 10 bedeutet, dass die Klausel sicher unwirksam ist)";

/// Synthesis request asking for at most `max_issues` two-line issues.
///
/// The verdicts are embedded as pretty-printed JSON with non-ASCII kept as is.
pub fn summary_message(verdicts: &[Verdict], max_issues: usize) -> serde_json::Result<String> {
    let answers = serde_json::to_string_pretty(verdicts)?;

    Ok(format!(
        "Fasse die folgenden Antworten in **höchstens {max}** Problem-Paaren zusammen.\n\
         \n\
         ***AUSGABEFORMAT (bitte exakt einhalten)***\n\
         Für jedes Problem genau zwei Zeilen, nichts davor, nichts danach:\n\
         \n\
         • <Kurze Problembeschreibung>\n\
         {label}: <Zahl 1-10>/10\n\
         \n\
         {heading}\n\
         {answers}",
        max = max_issues,
        label = SEVERITY_LABEL,
        heading = ANSWERS_HEADING,
        answers = answers,
    ))
}
