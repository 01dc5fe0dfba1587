use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use tilescout_core::{ListingField, ListingRecord, RecordKind};

use super::{ExtractionOutcome, RecordExtractor};

/// Characters of the card's address text taken up by the
/// `, {City}, {Province} {Postal}` suffix.
const ADDRESS_SUFFIX_CHARS: usize = 23;
/// Characters of the postal code at the end of the address text.
const POSTAL_CODE_CHARS: usize = 7;

/// Where a card field's value comes from.
#[derive(Debug, Clone)]
enum FieldSource {
    /// The `<address>` text without its city/province/postal suffix.
    Street,
    /// The trailing postal code of the `<address>` text.
    PostalCode,
    /// The text of the first element matching the selector.
    Text(Selector),
    /// The first link's `href`, resolved against the listing base URL.
    Link,
}

/// Scrapes the rendered listing cards of a results page.
///
/// Every card yields one record. Each tracked field is read on its own, so a
/// card missing one element still produces the other fields.
#[derive(Debug, Clone)]
pub struct CardExtractor {
    listing_base_url: Url,
    card: Selector,
    address: Selector,
    link: Selector,
    fields: Vec<(ListingField, FieldSource)>,
}

impl CardExtractor {
    #[must_use]
    pub fn new(listing_base_url: Url) -> Self {
        let text = |css: &str| FieldSource::Text(Selector::parse(css).expect("valid card selector"));
        let fields = vec![
            (ListingField::Address, FieldSource::Street),
            (ListingField::PostalCode, FieldSource::PostalCode),
            (ListingField::Price, text("span.bp-Homecard__Price--value")),
            (ListingField::Beds, text("span.bp-Homecard__Stats--beds")),
            (ListingField::Baths, text("span.bp-Homecard__Stats--baths")),
            (
                ListingField::SquareFootage,
                text("span.bp-Homecard__LockedStat--value"),
            ),
            (ListingField::Url, FieldSource::Link),
        ];

        Self {
            listing_base_url,
            card: Selector::parse("div.HomeCardContainer").expect("valid card selector"),
            address: Selector::parse("address").expect("valid card selector"),
            link: Selector::parse("a[href]").expect("valid card selector"),
            fields,
        }
    }

    fn try_extract(&self, card: ElementRef<'_>, source: &FieldSource) -> Option<String> {
        match source {
            FieldSource::Street => {
                let text = first_text(card, &self.address)?;
                let len = text.chars().count();
                if len <= ADDRESS_SUFFIX_CHARS {
                    return None;
                }
                let street: String = text.chars().take(len - ADDRESS_SUFFIX_CHARS).collect();
                non_empty(&street)
            }
            FieldSource::PostalCode => {
                let text = first_text(card, &self.address)?;
                let len = text.chars().count();
                if len < POSTAL_CODE_CHARS {
                    return None;
                }
                let postal: String = text.chars().skip(len - POSTAL_CODE_CHARS).collect();
                non_empty(&postal)
            }
            FieldSource::Text(selector) => first_text(card, selector),
            FieldSource::Link => {
                let href = card.select(&self.link).next()?.value().attr("href")?;
                self.listing_base_url
                    .join(href.trim())
                    .ok()
                    .map(String::from)
            }
        }
    }
}

impl RecordExtractor for CardExtractor {
    fn name(&self) -> &'static str {
        "cards"
    }

    fn extract(&self, page: &Html) -> ExtractionOutcome {
        let mut outcome = ExtractionOutcome::default();

        for (index, card) in page.select(&self.card).enumerate() {
            let mut record = ListingRecord::empty(RecordKind::Card);
            for (field, source) in &self.fields {
                *record.field_mut(*field) = self.try_extract(card, source);
            }

            let missing = record.missing_fields();
            if !missing.is_empty() {
                tracing::debug!(card = index, ?missing, "incomplete listing card");
                outcome.incomplete.push(index);
            }
            outcome.records.push(record);
        }

        outcome
    }
}

fn first_text(scope: ElementRef<'_>, selector: &Selector) -> Option<String> {
    let text: String = scope.select(selector).next()?.text().collect();
    non_empty(&text)
}

fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> CardExtractor {
        CardExtractor::new(Url::parse("https://www.redfin.com").unwrap())
    }

    fn card(address: &str, price: Option<&str>, href: &str) -> String {
        let price = price
            .map(|p| format!(r#"<span class="bp-Homecard__Price--value">{p}</span>"#))
            .unwrap_or_default();
        format!(
            r#"<div class="HomeCardContainer">
                <a href="{href}" class="link">
                  {price}
                  <span class="bp-Homecard__Stats--beds text-nowrap">3 beds</span>
                  <span class="bp-Homecard__Stats--baths text-nowrap">2 baths</span>
                  <span class="bp-Homecard__LockedStat--value">1,450</span>
                  <address>{address}</address>
                </a>
              </div>"#
        )
    }

    fn page(cards: &[String]) -> Html {
        Html::parse_document(&format!("<html><body>{}</body></html>", cards.concat()))
    }

    #[test]
    fn complete_card_fills_every_field() {
        let html = page(&[card(
            "2750 Oak St, Vancouver, BC V6H 2K6",
            Some("$1,249,000"),
            "/BC/Vancouver/2750-Oak-St-V6H-2K6/home/123",
        )]);
        let outcome = extractor().extract(&html);

        assert_eq!(outcome.records.len(), 1);
        assert!(outcome.incomplete.is_empty());
        let record = &outcome.records[0];
        assert_eq!(record.kind, RecordKind::Card);
        assert_eq!(record.address.as_deref(), Some("2750 Oak St"));
        assert_eq!(record.postal_code.as_deref(), Some("V6H 2K6"));
        assert_eq!(record.price.as_deref(), Some("$1,249,000"));
        assert_eq!(record.beds.as_deref(), Some("3 beds"));
        assert_eq!(record.baths.as_deref(), Some("2 baths"));
        assert_eq!(record.square_footage.as_deref(), Some("1,450"));
        assert_eq!(
            record.url.as_deref(),
            Some("https://www.redfin.com/BC/Vancouver/2750-Oak-St-V6H-2K6/home/123")
        );
        assert_eq!(record.latitude, None);
    }

    #[test]
    fn missing_price_keeps_other_fields() {
        let html = page(&[
            card("2750 Oak St, Vancouver, BC V6H 2K6", Some("$900,000"), "/a"),
            card("101 Main St, Vancouver, BC V6A 1A1", None, "/b"),
        ]);
        let outcome = extractor().extract(&html);

        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.incomplete, vec![1]);
        let record = &outcome.records[1];
        assert_eq!(record.price, None);
        assert_eq!(record.missing_fields(), vec!["price"]);
        assert_eq!(record.address.as_deref(), Some("101 Main St"));
        assert_eq!(record.url.as_deref(), Some("https://www.redfin.com/b"));
    }

    #[test]
    fn card_with_several_missing_fields_is_listed_once() {
        let html = page(&[r#"<div class="HomeCardContainer"><span>Coming soon</span></div>"#
            .to_owned()]);
        let outcome = extractor().extract(&html);

        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.incomplete, vec![0]);
        assert_eq!(outcome.records[0].missing_fields().len(), 7);
    }

    #[test]
    fn short_address_yields_postal_code_only() {
        let html = page(&[card("Vancouver, BC V6H 2K6", Some("$1"), "/a")]);
        let outcome = extractor().extract(&html);

        let record = &outcome.records[0];
        assert_eq!(record.address, None);
        assert_eq!(record.postal_code.as_deref(), Some("V6H 2K6"));
        assert_eq!(outcome.incomplete, vec![0]);
    }

    #[test]
    fn whitespace_around_address_is_ignored() {
        let html = page(&[card(
            "\n   2750 Oak St, Vancouver, BC V6H 2K6  \n",
            Some("$1"),
            "/a",
        )]);
        let record = &extractor().extract(&html).records[0];
        assert_eq!(record.address.as_deref(), Some("2750 Oak St"));
        assert_eq!(record.postal_code.as_deref(), Some("V6H 2K6"));
    }

    #[test]
    fn blank_price_counts_as_missing() {
        let html = page(&[card("2750 Oak St, Vancouver, BC V6H 2K6", Some("  "), "/a")]);
        let outcome = extractor().extract(&html);
        assert_eq!(outcome.records[0].price, None);
        assert_eq!(outcome.incomplete, vec![0]);
    }

    #[test]
    fn absolute_links_are_kept() {
        let html = page(&[card(
            "2750 Oak St, Vancouver, BC V6H 2K6",
            Some("$1"),
            "https://www.redfin.ca/home/9",
        )]);
        let record = &extractor().extract(&html).records[0];
        assert_eq!(record.url.as_deref(), Some("https://www.redfin.ca/home/9"));
    }
}
