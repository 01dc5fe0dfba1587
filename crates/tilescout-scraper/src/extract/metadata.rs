use scraper::{Html, Selector};
use serde_json::Value;
use tilescout_core::{ListingRecord, RecordKind};

use super::{DeferredBlock, ExtractionOutcome, RecordExtractor};

/// Schema.org types that describe the site itself, not a listing.
const SKIPPED_TYPES: [&str; 2] = ["Organization", "BreadcrumbList"];

/// The shape of one embedded metadata block, decided before any field is
/// read.
#[derive(Debug)]
enum MetadataBlock<'a> {
    Skipped,
    /// An `Event` whose `location` is a list; the listing address sits at
    /// position 1.
    EventWithListLocation {
        event: &'a Value,
        locations: &'a [Value],
    },
    EventWithObjectLocation {
        event: &'a Value,
        location: Option<&'a Value>,
    },
    /// `[property, offer]`.
    PropertyArray(&'a [Value]),
    Unrecognized,
}

fn classify(block: &Value) -> MetadataBlock<'_> {
    match block {
        Value::Array(items) => MetadataBlock::PropertyArray(items),
        Value::Object(map) => match map.get("@type").and_then(Value::as_str) {
            Some(t) if SKIPPED_TYPES.contains(&t) => MetadataBlock::Skipped,
            Some("Event") => match map.get("location") {
                Some(Value::Array(locations)) => MetadataBlock::EventWithListLocation {
                    event: block,
                    locations,
                },
                location => MetadataBlock::EventWithObjectLocation {
                    event: block,
                    location,
                },
            },
            _ => MetadataBlock::Unrecognized,
        },
        _ => MetadataBlock::Unrecognized,
    }
}

/// Reads listings from a page's `application/ld+json` blocks.
///
/// Blocks about the site itself and blocks of unknown type are ignored.
/// A listing block missing one of the nested objects its shape requires is
/// deferred whole; missing leaf values simply become `None`.
#[derive(Debug, Clone)]
pub struct MetadataExtractor {
    script: Selector,
}

impl MetadataExtractor {
    #[must_use]
    pub fn new() -> Self {
        Self {
            script: Selector::parse(r#"script[type="application/ld+json"]"#)
                .expect("valid metadata selector"),
        }
    }
}

impl Default for MetadataExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordExtractor for MetadataExtractor {
    fn name(&self) -> &'static str {
        "metadata"
    }

    fn extract(&self, page: &Html) -> ExtractionOutcome {
        let mut outcome = ExtractionOutcome::default();

        for (index, script) in page.select(&self.script).enumerate() {
            let body: String = script.text().collect();
            let block: Value = match serde_json::from_str(&body) {
                Ok(v) => v,
                Err(e) => {
                    defer(&mut outcome, index, format!("invalid JSON: {e}"), Value::String(body));
                    continue;
                }
            };

            let extracted = match classify(&block) {
                MetadataBlock::Skipped => continue,
                MetadataBlock::Unrecognized => {
                    tracing::trace!(block = index, "ignoring unrecognized metadata block");
                    continue;
                }
                MetadataBlock::EventWithListLocation { event, locations } => {
                    event_with_list_location(event, locations)
                }
                MetadataBlock::EventWithObjectLocation { event, location } => {
                    event_with_object_location(event, location)
                }
                MetadataBlock::PropertyArray(items) => property_array(items),
            };

            match extracted {
                Ok(record) => outcome.records.push(record),
                Err(reason) => defer(&mut outcome, index, reason, block),
            }
        }

        outcome
    }
}

fn defer(outcome: &mut ExtractionOutcome, index: usize, reason: String, raw: Value) {
    tracing::warn!(block = index, %reason, "metadata block deferred for review");
    outcome.deferred.push(DeferredBlock { index, reason, raw });
}

fn event_with_list_location(event: &Value, locations: &[Value]) -> Result<ListingRecord, String> {
    let place = locations
        .get(1)
        .filter(|v| v.is_object())
        .ok_or_else(|| "event location list has no object at position 1".to_owned())?;
    let address = object(place, "address")?;
    let geo = object(place, "geo")?;

    let mut record = ListingRecord::empty(RecordKind::EventLocation);
    record.address = text(address, "streetAddress");
    record.postal_code = text(address, "postalCode");
    record.latitude = coordinate(geo, "latitude");
    record.longitude = coordinate(geo, "longitude");
    record.url = text(event, "url");
    Ok(record)
}

fn event_with_object_location(
    event: &Value,
    location: Option<&Value>,
) -> Result<ListingRecord, String> {
    let location = location
        .filter(|v| v.is_object())
        .ok_or_else(|| "event has no location object".to_owned())?;
    let address = object(location, "address")?;
    let geo = object(location, "geo")?;
    let offers = object(event, "offers")?;

    let mut record = ListingRecord::empty(RecordKind::Event);
    record.address = text(location, "name");
    record.postal_code = text(address, "postalCode");
    record.latitude = coordinate(geo, "latitude");
    record.longitude = coordinate(geo, "longitude");
    record.price = text(offers, "price");
    record.url = text(event, "url");
    Ok(record)
}

fn property_array(items: &[Value]) -> Result<ListingRecord, String> {
    let [property, offer, ..] = items else {
        return Err(format!("property array has {} entries, expected 2", items.len()));
    };
    let address = object(property, "address")?;
    let geo = object(property, "geo")?;
    let floor_size = object(property, "floorSize")?;
    let offers = object(offer, "offers")?;

    let mut record = ListingRecord::empty(RecordKind::Property);
    record.address = text(address, "streetAddress");
    record.postal_code = text(address, "postalCode");
    record.latitude = coordinate(geo, "latitude");
    record.longitude = coordinate(geo, "longitude");
    record.square_footage = text(floor_size, "value");
    record.beds = text(property, "numberOfRooms");
    record.url = text(property, "url");
    record.price = text(offers, "price");
    Ok(record)
}

/// A nested object the block's shape requires.
fn object<'a>(parent: &'a Value, key: &str) -> Result<&'a Value, String> {
    match parent.get(key) {
        Some(v) if v.is_object() => Ok(v),
        Some(other) => Err(format!("`{key}` is not an object: {other}")),
        None => Err(format!("missing `{key}`")),
    }
}

/// A leaf value rendered as text; numbers are kept in their JSON form.
fn text(parent: &Value, key: &str) -> Option<String> {
    match parent.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_owned()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Coordinates appear as both numbers and strings.
fn coordinate(parent: &Value, key: &str) -> Option<f64> {
    let v = parent.get(key)?;
    v.as_f64()
        .or_else(|| v.as_str().and_then(|s| s.trim().parse::<f64>().ok()))
}

#[cfg(test)]
#[path = "metadata_test.rs"]
mod tests;
