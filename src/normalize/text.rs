use regex::Regex;
use std::sync::OnceLock;

/// Collapse every whitespace run (including NBSP) to a single space and trim.
pub fn normalize_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_space = true;
    for ch in text.chars() {
        if ch.is_whitespace() {
            if !prev_space {
                out.push(' ');
                prev_space = true;
            }
        } else {
            out.push(ch);
            prev_space = false;
        }
    }
    while out.ends_with(' ') {
        out.pop();
    }
    out
}

/// Like [`normalize_whitespace`] but maps empty results to `None`.
pub fn clean_opt(text: &str) -> Option<String> {
    let cleaned = normalize_whitespace(text);
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

fn spaced_code_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(.*?)\s+([A-ZÕÄÖÜ]{2,6})$").unwrap())
}

fn glued_code_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(.*?)([A-ZÕÄÖÜ]{2,6})$").unwrap())
}

/// Split a compound team string into a display name and a trailing 2-6 letter
/// uppercase code. Some sites render "BC Kalev/Cramo KAL", others glue the
/// mobile code straight onto the name ("BC Kalev/CramoKAL"). The name must
/// keep at least 3 characters for a split to be accepted; otherwise the whole
/// string is the name and the code is None.
pub fn extract_team_and_code(text: &str) -> (String, Option<String>) {
    let text = normalize_whitespace(text);
    if text.is_empty() {
        return (text, None);
    }

    for re in [spaced_code_re(), glued_code_re()] {
        if let Some(caps) = re.captures(&text) {
            let name = normalize_whitespace(&caps[1]);
            let code = normalize_whitespace(&caps[2]);
            if name.chars().count() >= 3 {
                return (name, Some(code));
            }
        }
    }

    (text, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_runs_and_nbsp() {
        assert_eq!(
            normalize_whitespace("  BC\u{a0}Kalev \t  Cramo \n"),
            "BC Kalev Cramo"
        );
        assert_eq!(normalize_whitespace(""), "");
        assert_eq!(normalize_whitespace(" \u{a0} "), "");
    }

    #[test]
    fn splits_space_separated_code() {
        let (name, code) = extract_team_and_code("BC Kalev/Cramo KAL");
        assert_eq!(name, "BC Kalev/Cramo");
        assert_eq!(code.as_deref(), Some("KAL"));
    }

    #[test]
    fn splits_glued_code() {
        let (name, code) = extract_team_and_code("Paide PärnuPRN");
        assert_eq!(name, "Paide Pärnu");
        assert_eq!(code.as_deref(), Some("PRN"));
    }

    #[test]
    fn accepts_estonian_letters_in_code() {
        let (name, code) = extract_team_and_code("Tartu Ülikool TÜK");
        assert_eq!(name, "Tartu Ülikool");
        assert_eq!(code.as_deref(), Some("TÜK"));
    }

    #[test]
    fn leaves_short_or_plain_names_alone() {
        assert_eq!(extract_team_and_code("TalTech"), ("TalTech".into(), None));
        // a split would leave fewer than 3 name characters
        assert_eq!(extract_team_and_code("AB CD"), ("AB CD".into(), None));
    }
}
