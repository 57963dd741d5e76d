//! Name derivation for tables and columns

/// Convert a field name to its column name.
///
/// Word boundaries are placed at lower→upper transitions, before the last
/// letter of an upper-case run that is followed by a lower-case letter
/// (`HTTPServer` → `http_server`, but `PersonIDs` → `person_ids`) and between
/// letters and digits. Existing
/// `_`, `-` and spaces count as separators. Applying it to its own output
/// returns the same string.
pub fn column_name(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut result = String::with_capacity(name.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if is_separator(c) {
            push_separator(&mut result);
            continue;
        }

        if i > 0 {
            let prev = chars[i - 1];
            let next = chars.get(i + 1).copied();

            let boundary = (c.is_uppercase() && (prev.is_lowercase() || prev.is_ascii_digit()))
                || (c.is_uppercase()
                    && prev.is_uppercase()
                    && next.is_some_and(|n| n.is_lowercase())
                    && !is_plural_suffix(&chars, i + 1))
                || (c.is_ascii_digit() && prev.is_alphabetic())
                || (c.is_alphabetic() && prev.is_ascii_digit());

            if boundary {
                push_separator(&mut result);
            }
        }

        result.extend(c.to_lowercase());
    }

    while result.ends_with('_') {
        result.pop();
    }

    result
}

/// Default table name for a type: its name, lowercased
pub fn table_name(type_name: &str) -> String {
    type_name.to_lowercase()
}

/// A lone `s` closing an upper-case run (`IDs`, `URLs`)
fn is_plural_suffix(chars: &[char], i: usize) -> bool {
    chars.get(i) == Some(&'s') && !chars.get(i + 1).is_some_and(|c| c.is_lowercase())
}

fn is_separator(c: char) -> bool {
    c == '_' || c == '-' || c.is_whitespace()
}

fn push_separator(result: &mut String) {
    if !result.is_empty() && !result.ends_with('_') {
        result.push('_');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_name_examples() {
        assert_eq!(column_name("ID"), "id");
        assert_eq!(column_name("CreatedAt"), "created_at");
        assert_eq!(column_name("PersonID"), "person_id");
        assert_eq!(column_name("Name"), "name");
        assert_eq!(column_name("HTTPServer"), "http_server");
        assert_eq!(column_name("Address2"), "address_2");
        assert_eq!(column_name("Line2Text"), "line_2_text");
        assert_eq!(column_name("userName"), "user_name");
    }

    #[test]
    fn test_column_name_plural_initialisms() {
        assert_eq!(column_name("IDs"), "ids");
        assert_eq!(column_name("PersonIDs"), "person_ids");
        assert_eq!(column_name("URLsSeen"), "urls_seen");
        assert_eq!(column_name("IDSet"), "id_set");
    }

    #[test]
    fn test_column_name_collapses_separators() {
        assert_eq!(column_name("_Leading__Double_"), "leading_double");
        assert_eq!(column_name("kebab-case name"), "kebab_case_name");
    }

    #[test]
    fn test_column_name_idempotent() {
        for name in ["ID", "CreatedAt", "PersonID", "HTTPServer", "Address2", "ipv4Addr", "PersonIDs"] {
            let once = column_name(name);
            assert_eq!(column_name(&once), once, "not stable for {}", name);
        }
        assert_eq!(column_name("created_at"), "created_at");
        assert_eq!(column_name("person_id"), "person_id");
    }

    #[test]
    fn test_table_name() {
        assert_eq!(table_name("PhoneNumber"), "phonenumber");
    }
}
