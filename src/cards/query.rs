//! Understanding what users type after the command prefix.

use crate::error::UserError;

/// Scryfall syntax that turns a name lookup into a search.
const FILTERS: [&str; 10] = [
    "e:",
    "set:",
    "frame:",
    "border:",
    "is:foil",
    "is:nonfoil",
    "is:fullart",
    "is:textless",
    "is:borderless",
    "rarity:",
];

/// Filter words that can appear without a colon.
const FILTER_KEYWORDS: [&str; 5] = ["foil", "nonfoil", "fullart", "textless", "borderless"];

/// Most cards a single message may ask for.
pub const MAX_CARDS_PER_REQUEST: usize = 10;

/// Whether the query uses search filters.
pub fn has_filters(query: &str) -> bool {
    let query = query.to_lowercase();
    FILTERS.iter().any(|filter| query.contains(filter))
}

/// The card name left after dropping every filter from a query.
pub fn extract_card_name(query: &str) -> String {
    query
        .split_whitespace()
        .filter(|word| {
            let word = word.to_lowercase();
            !word.contains(':') && !FILTER_KEYWORDS.contains(&word.as_str())
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// What a prefixed message asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageCommand {
    Random,
    Help,
    Cache,
    Lookup(String),
    /// Several `;` separated queries, shown as a grid.
    Multi(Vec<String>),
}

/// The non-empty `;` separated queries of a request.
pub fn split_queries(content: &str) -> Result<Vec<String>, UserError> {
    let queries: Vec<String> = content
        .split(';')
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(str::to_string)
        .collect();

    match queries.len() {
        0 => Err(UserError::EmptyCardQuery),
        n if n > MAX_CARDS_PER_REQUEST => Err(UserError::TooManyCards {
            max: MAX_CARDS_PER_REQUEST,
        }),
        _ => Ok(queries),
    }
}

/// Parse a message. `Ok(None)` means the message is not for us.
pub fn parse_message(content: &str, prefix: &str) -> Result<Option<MessageCommand>, UserError> {
    let Some(content) = content.strip_prefix(prefix) else {
        return Ok(None);
    };

    if content.contains(';') {
        let mut queries = split_queries(content)?;
        let command = match queries.len() {
            1 => MessageCommand::Lookup(queries.remove(0)),
            _ => MessageCommand::Multi(queries),
        };
        return Ok(Some(command));
    }

    let words: Vec<&str> = content.split_whitespace().collect();
    let Some(first) = words.first() else {
        return Ok(None);
    };

    let command = match first.to_lowercase().as_str() {
        "random" => MessageCommand::Random,
        "help" => MessageCommand::Help,
        "cache" => MessageCommand::Cache,
        _ => MessageCommand::Lookup(words.join(" ")),
    };
    Ok(Some(command))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn filters_are_detected() {
        assert!(has_filters("black lotus e:lea"));
        assert!(has_filters("Sol Ring SET:lea"));
        assert!(has_filters("lightning bolt is:foil"));
        assert!(has_filters("shivan dragon rarity:rare"));
        assert!(!has_filters("lightning bolt"));
        assert!(!has_filters("foil"));
    }

    #[test]
    fn card_name_survives_filters() {
        assert_eq!(extract_card_name("black lotus e:lea"), "black lotus");
        assert_eq!(
            extract_card_name("Lightning Bolt is:foil frame:1993 borderless"),
            "Lightning Bolt"
        );
        assert_eq!(extract_card_name("e:lea is:foil"), "");
    }

    #[test]
    fn keywords_and_lookups() {
        let parse = |s| parse_message(s, "!").unwrap();
        assert_eq!(parse("!random"), Some(MessageCommand::Random));
        assert_eq!(parse("!HELP"), Some(MessageCommand::Help));
        assert_eq!(parse("!cache"), Some(MessageCommand::Cache));
        assert_eq!(
            parse("!lightning   bolt"),
            Some(MessageCommand::Lookup("lightning bolt".to_string()))
        );
        assert_eq!(
            parse("!random access memories"),
            Some(MessageCommand::Random)
        );
    }

    #[test]
    fn other_messages_are_ignored() {
        assert_eq!(parse_message("hello", "!").unwrap(), None);
        assert_eq!(parse_message("!", "!").unwrap(), None);
        assert_eq!(parse_message("!   ", "!").unwrap(), None);
        assert_eq!(parse_message("?bolt", "!").unwrap(), None);
    }

    #[test]
    fn semicolons_make_grids() {
        let parsed = parse_message("!bolt; counterspell ;; sol ring e:lea;", "!").unwrap();
        assert_eq!(
            parsed,
            Some(MessageCommand::Multi(vec![
                "bolt".to_string(),
                "counterspell".to_string(),
                "sol ring e:lea".to_string(),
            ]))
        );

        let single = parse_message("!bolt;", "!").unwrap();
        assert_eq!(single, Some(MessageCommand::Lookup("bolt".to_string())));
    }

    #[test]
    fn grids_are_bounded() {
        assert!(matches!(
            parse_message("!;;", "!"),
            Err(UserError::EmptyCardQuery)
        ));

        let eleven = vec!["bolt"; MAX_CARDS_PER_REQUEST + 1].join(";");
        assert!(matches!(
            parse_message(&format!("!{eleven}"), "!"),
            Err(UserError::TooManyCards { max: 10 })
        ));

        let ten = vec!["bolt"; MAX_CARDS_PER_REQUEST].join(";");
        assert!(matches!(
            parse_message(&format!("!{ten}"), "!"),
            Ok(Some(MessageCommand::Multi(queries))) if queries.len() == 10
        ));
    }

    #[test]
    fn split_without_semicolons() {
        assert_eq!(split_queries(" bolt ").unwrap(), vec!["bolt".to_string()]);
        assert!(matches!(
            split_queries("  "),
            Err(UserError::EmptyCardQuery)
        ));
    }

    #[test]
    fn custom_prefix() {
        assert_eq!(
            parse_message("mtg> bolt", "mtg>").unwrap(),
            Some(MessageCommand::Lookup("bolt".to_string()))
        );
    }
}
