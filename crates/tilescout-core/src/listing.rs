use std::fmt;

use serde::{Deserialize, Serialize};

/// Which page element a [`ListingRecord`] was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// A rendered listing card.
    Card,
    /// A property/offer pair from an embedded JSON-LD array.
    Property,
    /// A JSON-LD `Event` whose `location` is a single object.
    Event,
    /// A JSON-LD `Event` whose `location` is a list; the address comes from
    /// the second entry.
    EventLocation,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Card => write!(f, "card"),
            RecordKind::Property => write!(f, "property"),
            RecordKind::Event => write!(f, "event"),
            RecordKind::EventLocation => write!(f, "event_location"),
        }
    }
}

/// One listing scraped from a results page.
///
/// Field values are kept as the site renders them (e.g. `"$1,249,000"`,
/// `"3 beds"`). A `None` on a card record means extraction of that field
/// failed; partial records are kept rather than dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingRecord {
    pub kind: RecordKind,
    pub address: Option<String>,
    pub postal_code: Option<String>,
    pub price: Option<String>,
    pub beds: Option<String>,
    pub baths: Option<String>,
    pub square_footage: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Absolute URL of the listing's detail page.
    pub url: Option<String>,
}

impl ListingRecord {
    /// An empty record of the given kind; extractors fill fields in place.
    #[must_use]
    pub fn empty(kind: RecordKind) -> Self {
        Self {
            kind,
            address: None,
            postal_code: None,
            price: None,
            beds: None,
            baths: None,
            square_footage: None,
            latitude: None,
            longitude: None,
            url: None,
        }
    }

    /// Mutable access to one of the text fields.
    pub fn field_mut(&mut self, field: ListingField) -> &mut Option<String> {
        match field {
            ListingField::Address => &mut self.address,
            ListingField::PostalCode => &mut self.postal_code,
            ListingField::Price => &mut self.price,
            ListingField::Beds => &mut self.beds,
            ListingField::Baths => &mut self.baths,
            ListingField::SquareFootage => &mut self.square_footage,
            ListingField::Url => &mut self.url,
        }
    }

    #[must_use]
    pub fn field(&self, field: ListingField) -> Option<&str> {
        match field {
            ListingField::Address => self.address.as_deref(),
            ListingField::PostalCode => self.postal_code.as_deref(),
            ListingField::Price => self.price.as_deref(),
            ListingField::Beds => self.beds.as_deref(),
            ListingField::Baths => self.baths.as_deref(),
            ListingField::SquareFootage => self.square_footage.as_deref(),
            ListingField::Url => self.url.as_deref(),
        }
    }

    /// Names of the text fields that are `None`.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<&'static str> {
        ListingField::ALL
            .into_iter()
            .filter(|f| self.field(*f).is_none())
            .map(ListingField::name)
            .collect()
    }
}

/// The text fields of a [`ListingRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingField {
    Address,
    PostalCode,
    Price,
    Beds,
    Baths,
    SquareFootage,
    Url,
}

impl ListingField {
    pub const ALL: [ListingField; 7] = [
        ListingField::Address,
        ListingField::PostalCode,
        ListingField::Price,
        ListingField::Beds,
        ListingField::Baths,
        ListingField::SquareFootage,
        ListingField::Url,
    ];

    /// Column name, matching the serialized field name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            ListingField::Address => "address",
            ListingField::PostalCode => "postal_code",
            ListingField::Price => "price",
            ListingField::Beds => "beds",
            ListingField::Baths => "baths",
            ListingField::SquareFootage => "square_footage",
            ListingField::Url => "url",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_serializes_snake_case() {
        let json = serde_json::to_string(&RecordKind::EventLocation).unwrap();
        assert_eq!(json, "\"event_location\"");
        assert_eq!(RecordKind::EventLocation.to_string(), "event_location");
    }

    #[test]
    fn empty_record_reports_every_text_field_missing() {
        let record = ListingRecord::empty(RecordKind::Card);
        assert_eq!(record.missing_fields().len(), 7);
    }

    #[test]
    fn field_mut_writes_through() {
        let mut record = ListingRecord::empty(RecordKind::Card);
        *record.field_mut(ListingField::Baths) = Some("2 baths".to_owned());
        assert_eq!(record.baths.as_deref(), Some("2 baths"));
        assert_eq!(record.field(ListingField::Baths), Some("2 baths"));
    }

    #[test]
    fn missing_fields_lists_only_absent_values() {
        let mut record = ListingRecord::empty(RecordKind::Card);
        record.address = Some("123 Main St".to_owned());
        record.price = Some("$1,000,000".to_owned());
        let missing = record.missing_fields();
        assert!(!missing.contains(&"address"));
        assert!(!missing.contains(&"price"));
        assert!(missing.contains(&"postal_code"));
    }
}
