/// Normalize a clinical note before matching.
/// Strips control characters, folds typographic dashes and spaces to ASCII,
/// trims each line and drops blank ones. Clinical punctuation is kept.
pub fn sanitize_note(raw: &str) -> String {
    raw.chars()
        .filter_map(|c| match c {
            '\n' | '\t' => Some(c),
            // en dash, em dash, minus sign
            '\u{2013}' | '\u{2014}' | '\u{2212}' => Some('-'),
            // no-break and narrow no-break spaces
            '\u{00A0}' | '\u{202F}' => Some(' '),
            '\u{2018}' | '\u{2019}' => Some('\''),
            '\u{201C}' | '\u{201D}' => Some('"'),
            c if c.is_control() => None,
            c => Some(c),
        })
        .collect::<String>()
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_control_characters() {
        let raw = "LVEF 35%\x01\x02\nK 4.2\x00";
        let clean = sanitize_note(raw);
        assert_eq!(clean, "LVEF 35%\nK 4.2");
    }

    #[test]
    fn folds_dashes_for_ranges() {
        assert_eq!(sanitize_note("EF 30\u{2013}35%"), "EF 30-35%");
        assert_eq!(sanitize_note("lisinopril \u{2014} held"), "lisinopril - held");
    }

    #[test]
    fn preserves_clinical_punctuation() {
        let raw = "BP: 120/80 mmHg (seated), K+ 4.2, Entresto 24/26 mg";
        assert_eq!(sanitize_note(raw), raw);
    }

    #[test]
    fn collapses_blank_lines_and_trims() {
        let raw = "  HFrEF  \n\n\n  on carvedilol \n";
        assert_eq!(sanitize_note(raw), "HFrEF\non carvedilol");
    }

    #[test]
    fn only_control_chars_returns_empty() {
        assert_eq!(sanitize_note("\x00\x01\x02"), "");
    }

    #[test]
    fn no_break_space_becomes_space() {
        assert_eq!(sanitize_note("LVEF\u{00A0}35%"), "LVEF 35%");
    }
}
