//! How cards and bot info look in Discord.

use itertools::Itertools;
use serenity::CreateEmbed;
use serenity::CreateEmbedFooter;

use super::cache::CacheStats;
use super::lookup::Resolved;
use super::scryfall::Card;
use crate::serenity;

const DEFAULT_COLOUR: u32 = 0x9B59B6;
const GRID_COLOUR: u32 = 0x5865F2;
const HELP_COLOUR: u32 = 0x3498DB;
const CACHE_COLOUR: u32 = 0xE67E22;
const ERROR_COLOUR: u32 = 0xE74C3C;

/// Cards shown per grid message.
pub const GRID_CHUNK: usize = 4;

/// Embed colour matching a card's rarity.
pub fn rarity_colour(rarity: &str) -> u32 {
    match rarity.to_lowercase().as_str() {
        "mythic" => 0xFF8C00,
        "rare" => 0xFFD700,
        "uncommon" => 0xC0C0C0,
        "common" => 0x000000,
        "special" => 0xFF1493,
        "bonus" => 0x9370DB,
        _ => DEFAULT_COLOUR,
    }
}

/// "mythic" -> "Mythic"
fn title_case(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// A single card. Shows the image when there is one, the rules text otherwise.
pub fn card(resolved: &Resolved, query: &str) -> CreateEmbed {
    let card = &resolved.card;

    let mut embed = CreateEmbed::default().title(card.display_name());
    if !card.scryfall_uri.is_empty() {
        embed = embed.url(&card.scryfall_uri);
    }

    let Some(image) = card.best_image_url() else {
        return text_only(embed, card);
    };

    let mut description = Vec::new();
    if resolved.used_fallback {
        description.push(format!(
            "*No exact match found for filters in `{query}`, showing closest match*"
        ));
    }
    if !card.mana_cost.is_empty() {
        description.push(format!("**Mana Cost:** {}", card.mana_cost));
    }
    if !description.is_empty() {
        embed = embed.description(description.join("\n"));
    }

    let mut footer = vec![card.set_name.clone(), title_case(&card.rarity)];
    if let Some(artist) = &card.artist {
        footer.push(format!("Art by {artist}"));
    }

    embed
        .colour(rarity_colour(&card.rarity))
        .image(image)
        .footer(CreateEmbedFooter::new(footer.join(" • ")))
}

fn text_only(embed: CreateEmbed, card: &Card) -> CreateEmbed {
    let mut embed = embed
        .colour(DEFAULT_COLOUR)
        .description(format!("**{}**\n{}", card.type_line, card.oracle_text))
        .field(
            "Set",
            format!("{} ({})", card.set_name, card.set_code.to_uppercase()),
            true,
        )
        .field("Rarity", title_case(&card.rarity), true);

    if let Some(artist) = &card.artist {
        embed = embed.field("Artist", artist, true);
    }
    embed
}

/// One query of a multi-card request.
#[derive(Debug, Clone)]
pub struct GridEntry {
    pub query: String,
    pub found: Option<Resolved>,
}

/// Grid messages, each a list of the requested cards followed by their images.
pub fn grid(entries: &[GridEntry]) -> Vec<Vec<CreateEmbed>> {
    entries
        .chunks(GRID_CHUNK)
        .map(|chunk| {
            let lines = chunk.iter().map(grid_line).join("\n");
            let summary = CreateEmbed::default()
                .title("Requested Cards")
                .description(lines)
                .colour(GRID_COLOUR);

            let images = chunk.iter().filter_map(|entry| {
                let card = &entry.found.as_ref()?.card;
                let image = card.best_image_url()?;
                let mut embed = CreateEmbed::default()
                    .title(card.display_name())
                    .colour(rarity_colour(&card.rarity))
                    .image(image);
                if !card.scryfall_uri.is_empty() {
                    embed = embed.url(&card.scryfall_uri);
                }
                Some(embed)
            });

            std::iter::once(summary).chain(images).collect()
        })
        .collect()
}

fn grid_line(entry: &GridEntry) -> String {
    let Some(resolved) = &entry.found else {
        return format!("- {}: not found", entry.query);
    };

    let mut label = resolved.card.display_name();
    if resolved.used_fallback {
        label.push_str(" (closest match)");
    }
    match resolved.card.scryfall_uri.as_str() {
        "" => format!("- {label}"),
        uri => format!("- [{label}]({uri})"),
    }
}

/// Usage of the prefix commands, using the configured `prefix`.
pub fn help(prefix: &str) -> CreateEmbed {
    CreateEmbed::default()
        .title("MTG Card Bot Help")
        .description("Look up cards, build grids, and filter versions.")
        .colour(HELP_COLOUR)
        .field(
            "Commands",
            format!(
                "`{prefix}<card>` – Look up a card\n\
                 `{prefix}<card1>; <card2>; ...` – Grid lookup (up to 10)\n\
                 `{prefix}random` – Random card\n\
                 `{prefix}cache` – Cache stats\n\
                 `{prefix}help` – This menu\n\
                 Slash commands: `/card`, `/random_card`, `/card_cache`, `/card_help`"
            ),
            false,
        )
        .field(
            "Old-School Favorites (pre-2003)",
            format!(
                "`{prefix}black lotus e:lea` – Alpha 1993\n\
                 `{prefix}ancestral recall e:lea` – Alpha 1993\n\
                 `{prefix}time walk e:lea` – Alpha 1993\n\
                 `{prefix}sol ring e:lea` – Alpha 1993"
            ),
            false,
        )
        .field(
            "Multi-Card Demo (4-card grid)",
            format!("`{prefix}city of brass e:arn; library of alexandria e:arn; juzam djinn e:arn; serendib efreet e:arn`"),
            false,
        )
        .field(
            "Filters",
            "Set `e:lea|arn|leg|usg|tmp|ice` • Frame `frame:1993|1997` • Border `border:white` • Finish `is:foil|is:nonfoil` • Rarity `rarity:mythic|rare`",
            false,
        )
        .footer(CreateEmbedFooter::new(
            "Fuzzy and partial name matching supported.",
        ))
}

/// Size, hit rate and lifetime of the card cache.
pub fn cache_stats(stats: &CacheStats) -> CreateEmbed {
    CreateEmbed::default()
        .title("Cache Performance Statistics")
        .description("Card caching system metrics and utilization")
        .colour(CACHE_COLOUR)
        .field(
            "Storage Utilization",
            format!(
                "**Current Size:** {} cards\n**Maximum Size:** {} cards\n**Utilization:** {:.1}%",
                stats.size,
                stats.max_size,
                stats.utilization()
            ),
            true,
        )
        .field(
            "Hit Performance",
            format!(
                "**Hit Rate:** {:.1}%\n**Cache Hits:** {}\n**Cache Misses:** {}",
                stats.hit_rate(),
                stats.hits,
                stats.misses
            ),
            true,
        )
        .field(
            "Cache Management",
            format!(
                "**Evictions:** {}\n**TTL Duration:** {}s",
                stats.evictions,
                stats.ttl.as_secs()
            ),
            true,
        )
        .footer(CreateEmbedFooter::new(
            "Efficient caching reduces API calls and improves response times",
        ))
}

/// A red embed explaining what went wrong.
pub fn error(message: impl Into<String>) -> CreateEmbed {
    CreateEmbed::default()
        .title("Error")
        .description(message)
        .colour(ERROR_COLOUR)
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use serde_json::Value;

    use super::*;

    fn resolved(name: &str, used_fallback: bool) -> Resolved {
        let card: Card = serde_json::from_value(
            crate::cards::scryfall::test::card_json(name),
        )
        .unwrap();
        Resolved {
            card,
            used_fallback,
        }
    }

    fn json(embed: &CreateEmbed) -> Value {
        serde_json::to_value(embed).unwrap()
    }

    #[test]
    fn rarity_colours() {
        assert_eq!(rarity_colour("Mythic"), 0xFF8C00);
        assert_eq!(rarity_colour("common"), 0x000000);
        assert_eq!(rarity_colour("timeshifted"), DEFAULT_COLOUR);
        assert_eq!(title_case("uncommon"), "Uncommon");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn image_card() {
        let embed = json(&card(&resolved("Lightning Bolt", false), "bolt"));

        assert_eq!(embed["title"], "Lightning Bolt");
        assert_eq!(embed["image"]["url"], "https://img/card.png");
        assert_eq!(embed["description"], "**Mana Cost:** {R}");
        assert_eq!(
            embed["footer"]["text"],
            "Alpha • Common • Art by Christopher Rush"
        );
    }

    #[test]
    fn fallback_is_mentioned() {
        let embed = json(&card(&resolved("Sol Ring", true), "sol ring e:zzz"));
        let description = embed["description"].as_str().unwrap();
        assert!(description.contains("`sol ring e:zzz`"));
        assert!(description.contains("closest match"));
    }

    #[test]
    fn text_only_card() {
        let mut found = resolved("Lightning Bolt", false);
        found.card.image_uris = None;
        let embed = json(&card(&found, "bolt"));

        assert!(embed["image"].is_null());
        assert_eq!(embed["color"], DEFAULT_COLOUR);
        let fields = embed["fields"].as_array().unwrap();
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[0]["value"], "Alpha (LEA)");
        assert_eq!(fields[1]["value"], "Common");
    }

    #[test]
    fn grids_are_chunked() {
        let mut entries: Vec<GridEntry> = ["a", "b", "c", "d", "e"]
            .into_iter()
            .map(|name| GridEntry {
                query: name.to_string(),
                found: Some(resolved(name, false)),
            })
            .collect();
        entries.push(GridEntry {
            query: "zzz".to_string(),
            found: None,
        });
        entries[1].found = entries[1].found.take().map(|mut r| {
            r.used_fallback = true;
            r
        });

        let messages = grid(&entries);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].len(), 1 + 4);
        assert_eq!(messages[1].len(), 1 + 1);

        let summary = json(&messages[0][0]);
        let lines = summary["description"].as_str().unwrap();
        assert!(lines.starts_with("- [a](https://scryfall.com/card/lea/a)"));
        assert!(lines.contains("- [b (closest match)]"));

        let last = json(&messages[1][0]);
        assert!(last["description"]
            .as_str()
            .unwrap()
            .ends_with("- zzz: not found"));
    }

    #[test]
    fn stats_embed() {
        let stats = CacheStats {
            size: 10,
            max_size: 100,
            hits: 3,
            misses: 1,
            evictions: 2,
            ttl: Duration::from_secs(3600),
        };
        let embed = json(&cache_stats(&stats));
        let fields = embed["fields"].as_array().unwrap();
        assert!(fields[0]["value"].as_str().unwrap().contains("10.0%"));
        assert!(fields[1]["value"].as_str().unwrap().contains("75.0%"));
        assert!(fields[2]["value"].as_str().unwrap().contains("3600s"));
    }

    #[test]
    fn help_uses_prefix() {
        let embed = json(&help("?"));
        let commands = embed["fields"][0]["value"].as_str().unwrap();
        assert!(commands.contains("`?random`"));
    }
}
