//! Identifier and phrase tokenization

/// Lower-case alphanumeric tokens of free text
///
/// Splits on anything that is not a letter or digit, so `click_play_button`
/// and `click play button` yield the same tokens.
pub fn search_tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Split an identifier on camel-case, digit and separator boundaries
///
/// `clickPlayButton` → `["click", "Play", "Button"]`,
/// `parseHTMLResponse` → `["parse", "HTML", "Response"]`.
pub fn split_camel_case(identifier: &str) -> Vec<String> {
    let chars: Vec<char> = identifier.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }

        if !current.is_empty() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            let boundary = (c.is_uppercase() && (prev.is_lowercase() || prev.is_ascii_digit()))
                || (c.is_uppercase() && prev.is_uppercase() && next_is_lower)
                || (c.is_ascii_digit() != prev.is_ascii_digit() && prev.is_alphanumeric());
            if boundary {
                words.push(std::mem::take(&mut current));
            }
        }
        current.push(c);
    }

    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// Keyword tokens of an identifier: lower-case camel-case words longer than two characters
pub fn identifier_keywords(identifier: &str) -> Vec<String> {
    let mut keywords: Vec<String> = Vec::new();
    for word in split_camel_case(identifier) {
        let word = word.to_lowercase();
        if word.chars().count() > 2 && !keywords.contains(&word) {
            keywords.push(word);
        }
    }
    keywords
}

/// Snake-case rendering of an identifier, e.g. `clickPlayButton` → `click_play_button`
pub fn to_snake_case(identifier: &str) -> String {
    split_camel_case(identifier)
        .iter()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join("_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_tokens() {
        assert_eq!(search_tokens("click_play_button"), vec!["click", "play", "button"]);
        assert_eq!(search_tokens("  Tap, PLAY! "), vec!["tap", "play"]);
        assert!(search_tokens("--").is_empty());
    }

    #[test]
    fn test_split_camel_case() {
        assert_eq!(split_camel_case("clickPlayButton"), vec!["click", "Play", "Button"]);
        assert_eq!(split_camel_case("parseHTMLResponse"), vec!["parse", "HTML", "Response"]);
        assert_eq!(split_camel_case("goToPage2"), vec!["go", "To", "Page", "2"]);
        assert_eq!(split_camel_case("wait_for_ad"), vec!["wait", "for", "ad"]);
    }

    #[test]
    fn test_identifier_keywords_drop_short_words() {
        assert_eq!(identifier_keywords("clickPlayButton"), vec!["click", "play", "button"]);
        assert_eq!(identifier_keywords("goToHomeTab"), vec!["home", "tab"]);
    }

    #[test]
    fn test_to_snake_case() {
        assert_eq!(to_snake_case("clickPlayButton"), "click_play_button");
        assert_eq!(to_snake_case("openURL"), "open_url");
        assert_eq!(to_snake_case("skip"), "skip");
    }
}
