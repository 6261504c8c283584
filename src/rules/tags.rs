/// Separators accepted between tags in free-text input.
const TAG_SEPARATORS: [char; 3] = [',', ' ', ';'];

/// Turns free-text tag input into tag names.
///
/// Tokens are split on commas, spaces and semicolons, trimmed, and lose one
/// leading `#`. Empty tokens are dropped. Order is preserved and repeated
/// names are kept as-is.
pub fn normalize_tags(raw: &str) -> Vec<String> {
    raw.split(TAG_SEPARATORS.as_slice())
        .map(str::trim)
        .map(|token| token.strip_prefix('#').unwrap_or(token))
        .filter(|token| !token.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_hashes_and_separators() {
        assert_eq!(normalize_tags("#Foo, bar ;;  #Baz"), vec!["Foo", "bar", "Baz"]);
    }

    #[test]
    fn empty_and_separator_only_input() {
        assert!(normalize_tags("").is_empty());
        assert!(normalize_tags("   ,,;").is_empty());
        assert!(normalize_tags("# , #").is_empty());
    }

    #[test]
    fn only_one_hash_is_removed() {
        assert_eq!(normalize_tags("##p0"), vec!["#p0"]);
    }

    #[test]
    fn keeps_duplicates_in_order() {
        assert_eq!(normalize_tags("a,b,a"), vec!["a", "b", "a"]);
    }

    #[test]
    fn tabs_are_trimmed_but_do_not_split() {
        assert_eq!(normalize_tags("\tui\t,api"), vec!["ui", "api"]);
    }

    #[test]
    fn no_token_keeps_whitespace_or_hash() {
        let inputs = ["  #a  b#  ", ";#x;;#y,", "#  spaced", "\n#z\n"];
        for input in inputs {
            for tag in normalize_tags(input) {
                assert_eq!(tag.trim(), tag, "whitespace kept in {:?}", tag);
                assert!(!tag.starts_with('#'), "hash kept in {:?}", tag);
            }
        }
    }
}
