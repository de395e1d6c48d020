//! One-shot random picks: a Pokédex entry or a trading card

use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;
use regex::Regex;

use crate::config::{CardSearchConfig, PokedexConfig};
use crate::io::HttpClient;
use crate::notifier::{Embed, EmbedAuthor, EmbedMedia, Notifier, WebhookMessage};

const POKEDEX_URL: &str = "https://zukan.pokemon.co.jp/detail";
const CARD_SITE: &str = "https://www.pokemon-card.com";
const ENERGY_MARKER: &str = "エネルギー";

/// Detail page of a Pokédex entry, numbered with four digits
pub fn pokedex_url(id: u32) -> String {
    format!("{}/{:04}", POKEDEX_URL, id)
}

/// Post a random Pokédex entry link. Returns the chosen number.
pub async fn run_pokedex<R: Rng>(
    config: &PokedexConfig,
    notifier: &dyn Notifier,
    rng: &mut R,
) -> crate::Result<u32> {
    let id = rng.gen_range(1..=config.max_id);
    let url = pokedex_url(id);
    notifier.notify(&WebhookMessage::text(url.clone())).await?;
    tracing::info!("Sent {} to {}", url, notifier.destination());
    Ok(id)
}

/// Results page of the card search
pub fn card_search_url(page: u32) -> String {
    format!(
        "{}/card-search/index.php?keyword=&se_ta=&regulation_sidebar_form=all&pg=&illust=&sm_and_keyword=true&page={}",
        CARD_SITE, page
    )
}

/// A card found in one slot of a results page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardSlot {
    pub name: String,
    /// Site-relative path of the card image
    pub image_path: String,
}

impl CardSlot {
    /// Card number: the image file name up to its first `_`
    pub fn card_id(&self) -> &str {
        let file = self.image_path.rsplit('/').next().unwrap_or_default();
        file.split('_').next().unwrap_or_default()
    }

    pub fn is_energy(&self) -> bool {
        self.name.contains(ENERGY_MARKER)
    }

    pub fn detail_url(&self) -> String {
        format!(
            "{}/card-search/details.php/card/{}/regu/all",
            CARD_SITE,
            self.card_id()
        )
    }

    pub fn to_message(&self, timestamp_secs: u64) -> WebhookMessage {
        let detail_url = self.detail_url();
        let embed = Embed {
            author: Some(EmbedAuthor {
                name: "ポケカ公式".to_string(),
                ..EmbedAuthor::default()
            }),
            title: Some(format!("カード詳細（{}） | ポケカ公式", self.name)),
            url: Some(detail_url.clone()),
            image: Some(EmbedMedia {
                url: format!("{}{}", CARD_SITE, self.image_path),
            }),
            thumbnail: Some(EmbedMedia {
                url: format!("{}/assets/images/og.png?v={}", CARD_SITE, timestamp_secs),
            }),
            footer: None,
        };
        WebhookMessage::text(detail_url).with_embed(embed)
    }
}

/// Find the card in anchor `card-show-id{slot}` of a results page
pub fn parse_card_slot(html: &str, slot: u32) -> Option<CardSlot> {
    let anchor = Regex::new(&format!(
        r#"(?s)<a\b[^>]*\bid="card-show-id{}"[^>]*>(.*?)</a>"#,
        slot
    ))
    .ok()?;
    let inner = anchor.captures(html)?.get(1)?.as_str();

    let img = Regex::new(r"(?s)<img\b[^>]*>").ok()?.find(inner)?.as_str();
    let image_path = attribute(img, "data-src")?;
    let name = attribute(img, "alt")?;
    if image_path.is_empty() || name.is_empty() {
        return None;
    }
    Some(CardSlot { name, image_path })
}

fn attribute(tag: &str, name: &str) -> Option<String> {
    let pattern = Regex::new(&format!(r#"\s{}="([^"]*)""#, regex::escape(name))).ok()?;
    Some(pattern.captures(tag)?.get(1)?.as_str().to_string())
}

/// Post a random card, redrawing while the pick is an energy card or the
/// slot cannot be read.
pub async fn run_card<R: Rng>(
    config: &CardSearchConfig,
    http: &dyn HttpClient,
    notifier: &dyn Notifier,
    rng: &mut R,
) -> crate::Result<CardSlot> {
    for attempt in 1..=config.max_attempts {
        if attempt > 1 {
            tokio::time::sleep(config.retry_delay).await;
        }

        let page = rng.gen_range(0..=config.end_page);
        let slot = rng.gen_range(0..config.cards_per_page);
        let url = card_search_url(page);

        let html = match http.get(&url, &[]).await {
            Ok(response) if response.is_ok() => response.body,
            Ok(response) => {
                tracing::warn!("Card page {} returned status {}", page, response.status);
                continue;
            }
            Err(e) => {
                tracing::warn!("Fetching card page {} failed: {}", page, e);
                continue;
            }
        };

        let Some(card) = parse_card_slot(&html, slot) else {
            tracing::warn!("No card in slot {} of page {}", slot, page);
            continue;
        };

        if card.is_energy() {
            tracing::info!("Skipping energy card {}", card.name);
            continue;
        }

        notifier.notify(&card.to_message(current_epoch_secs())).await?;
        tracing::info!("Sent {} {} to {}", card.name, card.detail_url(), notifier.destination());
        return Ok(card);
    }

    Err(crate::LivewatchError::Fetch(format!(
        "no card picked after {} attempts",
        config.max_attempts
    )))
}

fn current_epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
