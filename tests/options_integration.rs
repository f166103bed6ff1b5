//! Integration tests for topic option lookups

use std::collections::BTreeMap;
use std::sync::Arc;

use dataportal_engine::color::hashed_color;
use dataportal_engine::storage::{InMemoryFactStore, Row, Value};
use dataportal_engine::types::DimensionKind;
use dataportal_engine::{Engine, Error};

const PRIMARY_ENERGY: &str = "WORLD_ENERGY_HISTORY_primary_energy_prod";
const GHG_BY_SECTOR: &str = "GHG_EMISSIONS_ghg_full_by_sector_prod";
const MULTISELECT: &str = "COUNTRY_multiselect_groups_prod";

fn primary(group: &str, group_type: &str, kind: &str, family: &str, energy: f64) -> Row {
    Row::new()
        .with("group_name", group)
        .with("group_type", group_type)
        .with("year", 2016)
        .with("type", kind)
        .with("energy_family", family)
        .with("energy", energy)
}

fn create_engine() -> Engine {
    let store = Arc::new(InMemoryFactStore::new());
    store.insert_rows(
        PRIMARY_ENERGY,
        vec![
            primary("Spain", "country", "Consumption", "Oil", 3.0),
            primary("France", "country", "Consumption", "Coal", 1.0),
            primary("France", "country", "Consumption", "Gas", 5.0),
            primary("France", "country", "Production", "Nuclear", 100.0),
            primary("Europe", "zone", "Consumption", "Oil", 40.0),
            primary("EU28", "group", "Consumption", "Gas", 30.0),
            Row::new()
                .with("group_name", Value::Null)
                .with("group_type", "country")
                .with("type", "Consumption"),
        ],
    );
    let ghg = |sector: &str, value: f64| {
        Row::new()
            .with("group_name", "World")
            .with("group_type", "zone")
            .with("year", 2016)
            .with("source", "CAIT")
            .with("sector", sector)
            .with("ghg", value)
    };
    store.insert_rows(
        GHG_BY_SECTOR,
        vec![ghg("Energy", 30.0), ghg("Agriculture", 5.0), ghg("LUCF", 90.0)],
    );
    let member = |group: &str, country: &str| Row::new().with("group", group).with("country", country);
    store.insert_rows(
        MULTISELECT,
        vec![
            member("G7", "France"),
            member("EU", "Spain"),
            member("EU", "France"),
            member("G7", "Canada"),
        ],
    );
    store.set_markdown("primary-energy", "# Primary energy");

    Engine::builder().with_store(store).build().unwrap()
}

fn names<T>(items: &[T], name: impl Fn(&T) -> &str) -> Vec<String> {
    items.iter().map(|i| name(i).to_string()).collect()
}

#[tokio::test]
async fn test_group_lookups() {
    let engine = create_engine();
    let options = engine.options();

    let countries = options.countries("primaryEnergies").await.unwrap();
    assert_eq!(names(&countries, |c| &c.name), vec!["France", "Spain"]);
    assert_eq!(countries[0].color, hashed_color("France"));

    let zones = options.zones("primaryEnergies").await.unwrap();
    assert_eq!(names(&zones, |c| &c.name), vec!["Europe"]);

    let groups = options.groups("primaryEnergies").await.unwrap();
    assert_eq!(names(&groups, |c| &c.name), vec!["EU28"]);
}

#[tokio::test]
async fn test_category_list_ordered_by_total() {
    let engine = create_engine();
    let mut filters = BTreeMap::new();
    filters.insert("type".to_string(), "Consumption".to_string());

    let families = engine
        .options()
        .category_list("primaryEnergies", "energyFamilies", &filters)
        .await
        .unwrap();
    // Gas 35, Oil 43, Coal 1; Nuclear is production only
    assert_eq!(names(&families, |c| &c.name), vec!["Oil", "Gas", "Coal"]);
    assert!(families.iter().all(|f| f.color.starts_with('#')));
}

#[tokio::test]
async fn test_category_list_exclusions_and_filters() {
    let engine = create_engine();
    let options = engine.options();
    let mut filters = BTreeMap::new();

    let err = options
        .category_list("ghgByGas", "sectors", &filters)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidQuery(_)));

    filters.insert("source".to_string(), "CAIT".to_string());
    let sectors = options.category_list("ghgByGas", "sectors", &filters).await.unwrap();
    assert_eq!(names(&sectors, |c| &c.name), vec!["Energy", "Agriculture"]);

    let err = options
        .category_list("ghgByGas", "unknownList", &filters)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidQuery(_)));
}

#[tokio::test]
async fn test_distinct_list() {
    let engine = create_engine();
    let types = engine
        .options()
        .distinct_list("primaryEnergies", "types")
        .await
        .unwrap();
    assert_eq!(types, vec!["Consumption", "Production"]);
}

#[tokio::test]
async fn test_multi_selects_grouped() {
    let engine = create_engine();
    let presets = engine.options().multi_selects().await.unwrap();

    assert_eq!(names(&presets, |p| &p.name), vec!["EU", "G7"]);
    assert_eq!(names(&presets[0].data, |m| &m.name), vec!["France", "Spain"]);
    assert_eq!(names(&presets[1].data, |m| &m.name), vec!["Canada", "France"]);
    assert_eq!(presets[1].data[0].color, hashed_color("Canada"));
}

#[tokio::test]
async fn test_markdown_and_metadata() {
    let engine = create_engine();
    let options = engine.options();

    assert_eq!(options.md_infos("primaryEnergies").await.unwrap(), "# Primary energy");
    assert_eq!(options.md_infos("nuclear").await.unwrap(), "");
    assert!(matches!(
        options.md_infos("unknownTopic").await,
        Err(Error::InvalidQuery(_))
    ));

    assert_eq!(
        options.dimensions("primaryEnergies").unwrap(),
        vec![DimensionKind::Total, DimensionKind::PerCapita, DimensionKind::ByEnergyFamily]
    );
    let units = options.units("co2FromEnergy").unwrap();
    assert!(units.contains(&"MtCO2".to_string()));
    assert!(!units.contains(&"Mtoe".to_string()));
}
