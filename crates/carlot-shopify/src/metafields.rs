//! Metafield alias table and first-match lookup.
//!
//! Listings are entered by hand in the Shopify admin, so the same spec shows
//! up under English or Thai keys with inconsistent casing. Each canonical
//! field owns an ordered alias list; the first alias carrying a non-blank
//! value wins. English keys come before Thai keys.

use std::collections::HashMap;

use carlot_core::CarSpecs;

use crate::types::Metafield;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecField {
    Year,
    Mileage,
    Transmission,
    Drivetrain,
    FuelType,
    Brand,
    Model,
    Installment,
    Category,
    BodyType,
}

/// Canonical field → candidate keys, in precedence order.
///
/// Keys are stored pre-normalized (see [`normalize_key`]).
pub const SPEC_ALIASES: &[(SpecField, &[&str])] = &[
    (
        SpecField::Year,
        &["year", "model_year", "car_year", "ปี", "ปีรถ", "ปีที่ผลิต"],
    ),
    (
        SpecField::Mileage,
        &["mileage", "odometer", "km", "เลขไมล์", "ระยะทาง", "ไมล์"],
    ),
    (
        SpecField::Transmission,
        &["transmission", "gear", "gearbox", "เกียร์", "ระบบเกียร์"],
    ),
    (
        SpecField::Drivetrain,
        &["drivetrain", "drive_type", "drive", "ระบบขับเคลื่อน", "ขับเคลื่อน"],
    ),
    (
        SpecField::FuelType,
        &["fuel_type", "fueltype", "fuel", "เชื้อเพลิง", "ประเภทเชื้อเพลิง", "น้ำมัน"],
    ),
    (SpecField::Brand, &["brand", "make", "ยี่ห้อ", "แบรนด์"]),
    (SpecField::Model, &["model", "car_model", "รุ่น", "รุ่นรถ"]),
    (
        SpecField::Installment,
        &["installment", "monthly_payment", "ผ่อน", "ค่างวด", "ผ่อนเริ่มต้น"],
    ),
    (
        SpecField::Category,
        &["category", "car_category", "หมวดหมู่", "ประเภทรถ"],
    ),
    (
        SpecField::BodyType,
        &["body_type", "bodytype", "body", "ประเภทตัวถัง", "ตัวถัง"],
    ),
];

impl SpecField {
    /// Candidate keys for this field, in precedence order.
    #[must_use]
    pub fn aliases(self) -> &'static [&'static str] {
        for (field, aliases) in SPEC_ALIASES {
            if *field == self {
                return aliases;
            }
        }
        &[]
    }

    fn slot(self, specs: &mut CarSpecs) -> &mut Option<String> {
        match self {
            SpecField::Year => &mut specs.year,
            SpecField::Mileage => &mut specs.mileage,
            SpecField::Transmission => &mut specs.transmission,
            SpecField::Drivetrain => &mut specs.drivetrain,
            SpecField::FuelType => &mut specs.fuel_type,
            SpecField::Brand => &mut specs.brand,
            SpecField::Model => &mut specs.model,
            SpecField::Installment => &mut specs.installment,
            SpecField::Category => &mut specs.category,
            SpecField::BodyType => &mut specs.body_type,
        }
    }
}

/// Trims, lowercases, and maps `-` / space separators to `_`, so that
/// `Fuel-Type`, `fuel type` and `FUEL_TYPE` share one key.
fn normalize_key(key: &str) -> String {
    key.trim()
        .chars()
        .map(|c| match c {
            '-' | ' ' => '_',
            other => other.to_ascii_lowercase(),
        })
        .collect()
}

/// Case-insensitive metafield dictionary.
///
/// Values are stored trimmed. When a key occurs more than once the first
/// non-blank value is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetafieldMap {
    entries: HashMap<String, String>,
}

impl MetafieldMap {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut entries: HashMap<String, String> = HashMap::new();
        for (key, value) in pairs {
            let value = value.as_ref().trim();
            if value.is_empty() {
                continue;
            }
            entries
                .entry(normalize_key(key.as_ref()))
                .or_insert_with(|| value.to_owned());
        }
        Self { entries }
    }

    /// Builds a map from a Storefront `metafields(identifiers:)` selection,
    /// skipping `null` entries and valueless metafields.
    pub fn from_metafields<'a, I>(nodes: I) -> Self
    where
        I: IntoIterator<Item = &'a Option<Metafield>>,
    {
        Self::from_pairs(
            nodes
                .into_iter()
                .flatten()
                .filter_map(|m| m.value.as_deref().map(|v| (m.key.as_str(), v))),
        )
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(&normalize_key(key)).map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Returns the value of the first alias present in `map`.
#[must_use]
pub fn first_match(map: &MetafieldMap, aliases: &[&str]) -> Option<String> {
    aliases
        .iter()
        .find_map(|alias| map.get(alias))
        .map(str::to_owned)
}

/// Maps a metafield dictionary onto the canonical spec fields.
#[must_use]
pub fn normalize_specs(map: &MetafieldMap) -> CarSpecs {
    normalize_specs_layered(map, &MetafieldMap::default())
}

/// Like [`normalize_specs`], but fields `primary` leaves empty are filled
/// from `fallback`.
///
/// Product-level metafields are passed as `primary` and variant-level ones
/// as `fallback`. Values present in both layers are not reconciled.
#[must_use]
pub fn normalize_specs_layered(primary: &MetafieldMap, fallback: &MetafieldMap) -> CarSpecs {
    let mut specs = CarSpecs::default();
    for (field, aliases) in SPEC_ALIASES {
        *field.slot(&mut specs) =
            first_match(primary, aliases).or_else(|| first_match(fallback, aliases));
    }
    specs
}

/// Every alias as a Storefront `HasMetafieldsIdentifier` under `namespace`.
#[must_use]
pub fn metafield_identifiers(namespace: &str) -> Vec<serde_json::Value> {
    SPEC_ALIASES
        .iter()
        .flat_map(|(_, aliases)| aliases.iter())
        .map(|key| serde_json::json!({ "namespace": namespace, "key": key }))
        .collect()
}

#[cfg(test)]
#[path = "metafields_test.rs"]
mod tests;
