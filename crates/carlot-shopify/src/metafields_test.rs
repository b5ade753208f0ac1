use super::*;

fn specs_from(pairs: &[(&str, &str)]) -> CarSpecs {
    normalize_specs(&MetafieldMap::from_pairs(pairs.iter().copied()))
}

fn field_value(specs: &CarSpecs, field: SpecField) -> Option<String> {
    let mut copy = specs.clone();
    field.slot(&mut copy).clone()
}

// -----------------------------------------------------------------------
// Alias precedence
// -----------------------------------------------------------------------

#[test]
fn english_year_wins_over_thai_year() {
    let specs = specs_from(&[("ปี", "2019"), ("year", "2020")]);
    assert_eq!(specs.year.as_deref(), Some("2020"));
}

#[test]
fn every_alias_outranks_all_aliases_after_it() {
    for (field, aliases) in SPEC_ALIASES {
        for (i, winner) in aliases.iter().enumerate() {
            for loser in &aliases[i + 1..] {
                // Insert the lower-precedence key first so map order cannot
                // decide the outcome.
                let specs = specs_from(&[(*loser, "second"), (*winner, "first")]);
                assert_eq!(
                    field_value(&specs, *field).as_deref(),
                    Some("first"),
                    "{field:?}: \"{winner}\" should win over \"{loser}\""
                );
            }
        }
    }
}

#[test]
fn each_alias_alone_populates_its_field() {
    for (field, aliases) in SPEC_ALIASES {
        for alias in *aliases {
            let specs = specs_from(&[(*alias, "value")]);
            assert_eq!(
                field_value(&specs, *field).as_deref(),
                Some("value"),
                "{field:?} not populated by alias \"{alias}\""
            );
        }
    }
}

#[test]
fn blank_higher_alias_falls_through_to_next_alias() {
    let specs = specs_from(&[("mileage", "   "), ("เลขไมล์", "85,000")]);
    assert_eq!(specs.mileage.as_deref(), Some("85,000"));
}

#[test]
fn key_matching_ignores_case_and_separators() {
    let specs = specs_from(&[
        ("Fuel-Type", "Diesel"),
        ("BODY TYPE", "Pickup"),
        (" Transmission ", "Auto"),
    ]);
    assert_eq!(specs.fuel_type.as_deref(), Some("Diesel"));
    assert_eq!(specs.body_type.as_deref(), Some("Pickup"));
    assert_eq!(specs.transmission.as_deref(), Some("Auto"));
}

#[test]
fn values_are_trimmed() {
    let specs = specs_from(&[("brand", "  Toyota ")]);
    assert_eq!(specs.brand.as_deref(), Some("Toyota"));
}

#[test]
fn duplicate_key_keeps_first_non_blank_value() {
    let map = MetafieldMap::from_pairs([("year", ""), ("YEAR", "2015"), ("Year", "2016")]);
    assert_eq!(map.get("year"), Some("2015"));
    assert_eq!(map.len(), 1);
}

// -----------------------------------------------------------------------
// Missing-field tolerance
// -----------------------------------------------------------------------

#[test]
fn empty_dictionary_yields_empty_specs() {
    let specs = normalize_specs(&MetafieldMap::default());
    assert!(specs.is_empty());
    assert_eq!(specs, CarSpecs::default());
}

#[test]
fn unknown_keys_are_ignored() {
    let specs = specs_from(&[("color", "white"), ("สี", "ขาว")]);
    assert!(specs.is_empty());
}

// -----------------------------------------------------------------------
// Layering
// -----------------------------------------------------------------------

#[test]
fn product_level_wins_over_variant_level() {
    let product = MetafieldMap::from_pairs([("year", "2014")]);
    let variant = MetafieldMap::from_pairs([("year", "2015"), ("เกียร์", "ธรรมดา")]);
    let specs = normalize_specs_layered(&product, &variant);
    assert_eq!(specs.year.as_deref(), Some("2014"));
    assert_eq!(specs.transmission.as_deref(), Some("ธรรมดา"));
}

#[test]
fn thai_product_key_wins_over_english_variant_key() {
    let product = MetafieldMap::from_pairs([("ปี", "2014")]);
    let variant = MetafieldMap::from_pairs([("year", "2015")]);
    let specs = normalize_specs_layered(&product, &variant);
    assert_eq!(specs.year.as_deref(), Some("2014"));
}

// -----------------------------------------------------------------------
// Storefront nodes
// -----------------------------------------------------------------------

#[test]
fn from_metafields_skips_null_entries_and_null_values() {
    let nodes = vec![
        Some(Metafield {
            namespace: Some("custom".to_owned()),
            key: "year".to_owned(),
            value: Some("2014".to_owned()),
        }),
        None,
        Some(Metafield {
            namespace: Some("custom".to_owned()),
            key: "mileage".to_owned(),
            value: None,
        }),
    ];
    let map = MetafieldMap::from_metafields(&nodes);
    assert_eq!(map.len(), 1);
    assert_eq!(map.get("YEAR"), Some("2014"));
}

#[test]
fn identifiers_cover_every_alias() {
    let identifiers = metafield_identifiers("custom");
    let total: usize = SPEC_ALIASES.iter().map(|(_, a)| a.len()).sum();
    assert_eq!(identifiers.len(), total);
    assert_eq!(identifiers[0]["namespace"], "custom");
    assert_eq!(identifiers[0]["key"], "year");
}

#[test]
fn aliases_lookup_matches_table() {
    assert_eq!(SpecField::Year.aliases()[0], "year");
    assert!(SpecField::BodyType.aliases().contains(&"ตัวถัง"));
}
