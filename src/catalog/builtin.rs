//! The portal's topics

use super::{CategoryList, DimensionSpec, DistinctList, FactTableDescriptor, FilterParam, SeriesLayout, Topic};
use crate::color::ColorStrategy;
use crate::storage::{FilterValue, Predicate};
use crate::types::{DashStyle, DimensionKind};
use crate::units::{Co2Unit, Co2eqUnit, EnergyUnit, Unit};

const PRIMARY_ENERGY: &str = "WORLD_ENERGY_HISTORY_primary_energy_prod";
const RENEWABLE_ENERGY: &str = "WORLD_ENERGY_HISTORY_renewable_primary_energy_prod";
const RENEWABLE_SHARE: &str = "WORLD_ENERGY_HISTORY_renewable_share_of_primary_energy_prod";
const ENERGY_PER_CAPITA: &str = "ENERGY_PER_CAPITA_energy_per_capita_prod";
const FINAL_BY_FAMILY: &str = "FINAL_ENERGY_CONSUMPTION_final_cons_by_energy_family_full_prod";
const FINAL_BY_SECTOR: &str = "IEA_API_final_cons_by_sector_prod";
const GAS_BY_SECTOR: &str = "IEA_API_final_cons_gas_by_sector_prod";
const OIL_BY_SECTOR: &str = "IEA_API_final_cons_oil_products_by_sector_prod";
const PROVEN_RESERVES: &str = "FOSSIL_RESERVES_bp_fossil_with_zones_prod";
const ELECTRICITY: &str = "IEA_API_electricity_by_energy_family_prepared_prod";
const ELECTRICITY_CAPACITY: &str = "WORLD_ENERGY_HISTORY_electricity_capacity_prod";
const NUCLEAR: &str = "IEA_API_nuclear_share_of_electricity_generation_prod";
const ENERGY_INTENSITY: &str = "ENERGY_INTENSITY_OF_GDP_energies_intensities_of_gdp_prod";
const IMPORT_EXPORT: &str = "FOSSIL_IMPORT_EXPORT_us_eia_fossil_zones_prod";
const CO2_FROM_ENERGY: &str = "HISTORICAL_CO2_EMISSIONS_FROM_ENERGY_eia_with_zones_prod";
const CO2_PER_CAPITA: &str = "HISTORICAL_CO2_EMISSIONS_PER_CAPITA_co2_per_capita_prod";
const CARBON_INTENSITY: &str = "CARBON_INTENSITY_OF_GDP_carbon_intensity_of_gdp_prod";
const GHG_BY_GAS: &str = "GHG_EMISSIONS_ghg_full_by_gas_prod";
const GHG_BY_SECTOR: &str = "GHG_EMISSIONS_ghg_full_by_sector_prod";
const GHG_PER_CAPITA: &str = "GHG_EMISSIONS_PER_CAPITA_ghg_per_capita_prod";
const FOOTPRINT: &str = "CO2_CONSUMPTION_BASED_ACCOUNTING_footprint_vs_territorial_prod";
const FOOTPRINT_PER_CAPITA: &str = "CO2_CBA_PER_CAPITA_eora_cba_zones_per_capita_prod";
const FOOTPRINT_PER_GDP: &str = "CO2_CBA_PER_GDP_eora_cba_per_gdp_prod";
const TRADE_BY_COUNTRY: &str = "CO2_CONSUMPTION_BASED_ACCOUNTING_eora_co2_trade_by_country_prod";
const TRADE_BY_SECTOR: &str = "CO2_CONSUMPTION_BASED_ACCOUNTING_eora_co2_trade_by_sector";

const MTOE: Unit = Unit::Energy(EnergyUnit::Mtoe);
const TWH: Unit = Unit::Energy(EnergyUnit::TWh);
const MTCO2: Unit = Unit::Co2(Co2Unit::MtCo2);
const MTCO2EQ: Unit = Unit::Co2eq(Co2eqUnit::MtCo2eq);

pub(super) fn topics() -> Vec<Topic> {
    vec![
        primary_energies(),
        final_energies(),
        co2_from_energy(),
        ghg_by_gas(),
        fossil("gas", "gas", "Gas", "Gas", Some(GAS_BY_SECTOR)),
        fossil("oil", "oil", "Oil", "Total Primary Oil Consumption", Some(OIL_BY_SECTOR)),
        fossil("coal", "coal", "Coal", "Coal", None),
        electricity(),
        nuclear(),
        renewable_energies(),
        footprint(),
        energy_intensity(),
        import_export(),
        co2_imports_exports(),
    ]
}

fn energy(table: &str, column: &str) -> FactTableDescriptor {
    FactTableDescriptor::new(table, column).with_unit(MTOE)
}

fn per_capita_category(category: &str) -> DimensionSpec {
    DimensionSpec::groups(
        DimensionKind::PerCapita,
        energy(ENERGY_PER_CAPITA, "energy_per_capita"),
    )
    .with_fixed("energy_category", category)
    .ranked()
}

fn primary_energies() -> Topic {
    let by_family = energy(PRIMARY_ENERGY, "energy").with_category("energy_family");
    Topic::new("primaryEnergies", "primary-energy", energy(PRIMARY_ENERGY, "energy"))
        .with_dimension(
            DimensionSpec::groups(DimensionKind::Total, energy(PRIMARY_ENERGY, "energy"))
                .with_param(FilterParam::new("type"))
                .ranked(),
        )
        .with_dimension(
            DimensionSpec::groups(
                DimensionKind::PerCapita,
                energy(ENERGY_PER_CAPITA, "energy_per_capita"),
            )
            .with_param(FilterParam::mapped(
                "type",
                "energy_category",
                [("Production", "Total Primary Energy Production")],
                "Total Primary Energy Consumption",
            ))
            .ranked(),
        )
        .with_dimension(
            DimensionSpec::categories(DimensionKind::ByEnergyFamily, by_family)
                .with_param(FilterParam::new("type")),
        )
        .with_category_list(
            CategoryList::new("energyFamilies", PRIMARY_ENERGY, "energy_family", "energy")
                .with_param(FilterParam::new("type")),
        )
        .with_distinct_list(DistinctList::new("types", PRIMARY_ENERGY, "type"))
}

fn final_energies() -> Topic {
    Topic::new("finalEnergies", "final-energy", energy(FINAL_BY_FAMILY, "final_energy"))
        .with_dimension(
            DimensionSpec::groups(DimensionKind::Total, energy(FINAL_BY_FAMILY, "final_energy"))
                .ranked(),
        )
        .with_dimension(per_capita_category("Total Final Energy Consumption"))
        .with_dimension(DimensionSpec::categories(
            DimensionKind::ByEnergyFamily,
            energy(FINAL_BY_FAMILY, "final_energy").with_category("energy_family"),
        ))
        .with_dimension(DimensionSpec::categories(
            DimensionKind::BySector,
            energy(FINAL_BY_SECTOR, "final_energy").with_category("sector"),
        ))
        .with_category_list(CategoryList::new(
            "energyFamilies",
            FINAL_BY_FAMILY,
            "energy_family",
            "final_energy",
        ))
        .with_category_list(CategoryList::new(
            "sectors",
            FINAL_BY_SECTOR,
            "sector",
            "final_energy",
        ))
}

fn co2_from_energy() -> Topic {
    let emissions = || FactTableDescriptor::new(CO2_FROM_ENERGY, "co2").with_unit(MTCO2);
    Topic::new("co2FromEnergy", "co2-from-energy", emissions())
        .with_dimension(DimensionSpec::groups(DimensionKind::Total, emissions()).ranked())
        .with_dimension(
            DimensionSpec::groups(
                DimensionKind::PerCapita,
                FactTableDescriptor::new(CO2_PER_CAPITA, "co2_per_capita").with_unit(MTCO2),
            )
            .ranked(),
        )
        .with_dimension(carbon_intensity())
        .with_dimension(DimensionSpec::categories(
            DimensionKind::ByEnergyFamily,
            emissions().with_category("energy_family"),
        ))
        .with_category_list(
            CategoryList::new("energyFamilies", CO2_FROM_ENERGY, "energy_family", "co2")
                .with_predicate(Predicate::not_null("energy_family")),
        )
        .with_distinct_list(DistinctList::new("gdpUnits", CARBON_INTENSITY, "gdp_unit"))
}

fn carbon_intensity() -> DimensionSpec {
    DimensionSpec::groups(
        DimensionKind::PerGdp,
        FactTableDescriptor::new(CARBON_INTENSITY, "co2_per_gdp").with_unit(MTCO2),
    )
    .with_param(FilterParam::new("gdp_unit"))
    .ranked()
}

fn ghg_by_gas() -> Topic {
    let without_lucf = || Predicate::EqOrNull {
        column: "including_lucf".to_string(),
        value: FilterValue::Bool(false),
    };
    let source = || FilterParam::new("source");
    let by_sector = || FactTableDescriptor::new(GHG_BY_SECTOR, "ghg").with_unit(MTCO2EQ);

    Topic::new(
        "ghgByGas",
        "ghg",
        FactTableDescriptor::new(GHG_BY_GAS, "ghg").with_unit(MTCO2EQ),
    )
    .with_dimension(
        DimensionSpec::groups(DimensionKind::Total, by_sector())
            .with_param(source())
            .ranked(),
    )
    .with_dimension(
        DimensionSpec::groups(
            DimensionKind::PerCapita,
            FactTableDescriptor::new(GHG_PER_CAPITA, "ghg_per_capita").with_unit(MTCO2EQ),
        )
        .with_param(source())
        .ranked(),
    )
    .with_dimension(carbon_intensity())
    .with_dimension(
        DimensionSpec::categories(
            DimensionKind::ByGas,
            FactTableDescriptor::new(GHG_BY_GAS, "ghg")
                .with_unit(MTCO2EQ)
                .with_category("gas"),
        )
        .with_param(source())
        .with_predicate(without_lucf()),
    )
    .with_dimension(
        DimensionSpec::categories(DimensionKind::BySector, by_sector().with_category("sector"))
            .with_param(source())
            .excluding(["LUCF"]),
    )
    .with_category_list(
        CategoryList::new("gases", GHG_BY_GAS, "gas", "ghg")
            .with_param(source())
            .with_predicate(Predicate::not_null("gas"))
            .with_predicate(without_lucf()),
    )
    .with_category_list(
        CategoryList::new("sectors", GHG_BY_SECTOR, "sector", "ghg")
            .with_param(source())
            .excluding(["LUCF"]),
    )
    .with_distinct_list(DistinctList::new("sources", GHG_BY_SECTOR, "source"))
    .with_distinct_list(DistinctList::new("gdpUnits", CARBON_INTENSITY, "gdp_unit"))
}

/// Gas, oil and coal share the same shape
fn fossil(
    slug: &str,
    md_slug: &str,
    family: &str,
    consumption_category: &str,
    by_sector: Option<&str>,
) -> Topic {
    let mut topic = Topic::new(
        slug,
        md_slug,
        by_sector
            .map(|t| energy(t, "final_energy"))
            .unwrap_or_else(|| energy(PRIMARY_ENERGY, "energy")),
    )
    .with_dimension(
        DimensionSpec::groups(DimensionKind::Total, energy(PRIMARY_ENERGY, "energy"))
            .with_fixed("energy_family", family)
            .with_param(FilterParam::new("type"))
            .ranked(),
    );

    topic = topic.with_dimension(
        import_export_spec(DimensionKind::ImportExport).with_fixed("energy_source", family),
    );

    let per_capita = per_capita_category(consumption_category);
    topic = topic.with_dimension(if family == "Gas" {
        per_capita
    } else {
        per_capita.with_param(FilterParam::new("type"))
    });

    if let Some(table) = by_sector {
        topic = topic
            .with_dimension(
                DimensionSpec::groups(
                    DimensionKind::ProvenReserve,
                    FactTableDescriptor::new(PROVEN_RESERVES, "proven_reserves"),
                )
                .with_fixed("energy_source", family)
                .ranked(),
            )
            .with_dimension(DimensionSpec::categories(
                DimensionKind::BySector,
                energy(table, "final_energy").with_category("sector"),
            ))
            .with_category_list(CategoryList::new("sectors", table, "sector", "final_energy"));
    }
    topic
}

/// Generation and installed capacity live in different tables; the `type`
/// filter picks one. Capacity is summed as stored.
fn electricity() -> Topic {
    let generation = || FactTableDescriptor::new(ELECTRICITY, "final_energy").with_unit(TWH);
    let capacity = || FactTableDescriptor::new(ELECTRICITY_CAPACITY, "power");
    Topic::new("electricity", "electricity", generation())
        .with_dimension(
            DimensionSpec::groups(DimensionKind::Total, generation())
                .selected_by("type", "Generation")
                .ranked(),
        )
        .with_dimension(
            DimensionSpec::groups(DimensionKind::Total, capacity())
                .selected_by("type", "Capacity")
                .ranked(),
        )
        .with_dimension(per_capita_category("Total Electricity Consumption"))
        .with_dimension(
            DimensionSpec::categories(
                DimensionKind::ByEnergyFamily,
                generation().with_category("energy_family"),
            )
            .selected_by("type", "Generation"),
        )
        .with_dimension(
            DimensionSpec::categories(
                DimensionKind::ByEnergyFamily,
                capacity().with_category("energy_family"),
            )
            .selected_by("type", "Capacity"),
        )
        .with_category_list(CategoryList::new(
            "generationEnergyFamilies",
            ELECTRICITY,
            "energy_family",
            "final_energy",
        ))
        .with_category_list(CategoryList::new(
            "capacityEnergyFamilies",
            ELECTRICITY_CAPACITY,
            "energy_family",
            "power",
        ))
}

fn nuclear() -> Topic {
    Topic::new("nuclear", "nuclear", energy(NUCLEAR, "nuclear"))
        .with_dimension(DimensionSpec::groups(DimensionKind::Total, energy(NUCLEAR, "nuclear")).ranked())
        .with_dimension(
            DimensionSpec::groups(
                DimensionKind::ShareOfElectricityGeneration,
                FactTableDescriptor::new(NUCLEAR, "nuclear_share_of_electricity_generation")
                    .with_scale(100.0),
            )
            .ranked(),
        )
}

fn renewable_energies() -> Topic {
    Topic::new("renewableEnergies", "renewable-energy", energy(RENEWABLE_ENERGY, "energy"))
        .with_dimension(
            DimensionSpec::groups(DimensionKind::Total, energy(RENEWABLE_ENERGY, "energy"))
                .with_param(FilterParam::new("type"))
                .ranked(),
        )
        .with_dimension(
            DimensionSpec::groups(
                DimensionKind::ShareOfPrimaryEnergy,
                FactTableDescriptor::new(RENEWABLE_SHARE, "renewable_share_of_primary_energy")
                    .with_scale(100.0),
            )
            .with_param(FilterParam::new("type"))
            .ranked(),
        )
        .with_dimension(
            DimensionSpec::categories(
                DimensionKind::ByEnergyFamily,
                energy(RENEWABLE_ENERGY, "energy").with_category("energy_family"),
            )
            .with_param(FilterParam::new("type")),
        )
        .with_category_list(
            CategoryList::new("energyFamilies", RENEWABLE_ENERGY, "energy_family", "energy")
                .with_param(FilterParam::new("type")),
        )
        .with_distinct_list(DistinctList::new("types", RENEWABLE_ENERGY, "type"))
}

fn footprint() -> Topic {
    let scoped = |kind, table: &str, column: &str| {
        DimensionSpec::new(
            kind,
            FactTableDescriptor::new(table, column)
                .with_unit(MTCO2)
                .with_category("scope"),
            SeriesLayout::GroupCategoriesOverTime,
        )
        .with_predicate(Predicate::not_null("group_name"))
        .dashed([("Carbon Footprint", DashStyle::Solid)], DashStyle::LongDash)
        .ranked()
    };
    Topic::new(
        "footprint",
        "carbon-footprint",
        FactTableDescriptor::new(FOOTPRINT_PER_CAPITA, "co2_per_capita"),
    )
    .with_dimension(scoped(DimensionKind::Total, FOOTPRINT, "co2"))
    .with_dimension(scoped(DimensionKind::PerCapita, FOOTPRINT_PER_CAPITA, "co2_per_capita"))
    .with_dimension(
        scoped(DimensionKind::PerGdp, FOOTPRINT_PER_GDP, "co2_per_gdp")
            .with_param(FilterParam::new("gdp_unit")),
    )
    .with_distinct_list(DistinctList::new("scopes", FOOTPRINT, "scope"))
    .with_distinct_list(DistinctList::new("gdpUnits", FOOTPRINT_PER_GDP, "gdp_unit"))
}

fn energy_intensity() -> Topic {
    Topic::new(
        "energyIntensityGDP",
        "energy-intensity-gdp",
        energy(ENERGY_INTENSITY, "energy_intensity_of_gdp"),
    )
    .with_dimension(
        DimensionSpec::groups(
            DimensionKind::Total,
            energy(ENERGY_INTENSITY, "energy_intensity_of_gdp"),
        )
        .with_param(FilterParam::new("gdp_unit"))
        .with_param(FilterParam::new("energy_category"))
        .ranked(),
    )
    .with_distinct_list(DistinctList::new("energyTypes", ENERGY_INTENSITY, "energy_category"))
    .with_distinct_list(DistinctList::new("gdpUnits", ENERGY_INTENSITY, "gdp_unit"))
}

fn import_export_spec(kind: DimensionKind) -> DimensionSpec {
    DimensionSpec::new(
        kind,
        FactTableDescriptor::new(IMPORT_EXPORT, "energy").with_category("type"),
        SeriesLayout::GroupCategoriesOverTime,
    )
    .dashed(
        [("Net Imports", DashStyle::LongDash), ("Imports", DashStyle::Solid)],
        DashStyle::LongDashDotDot,
    )
    .ranked()
}

fn import_export() -> Topic {
    Topic::new(
        "importExport",
        "co2-imports-exports",
        FactTableDescriptor::new(IMPORT_EXPORT, "energy"),
    )
    .with_dimension(
        import_export_spec(DimensionKind::Total).with_param(FilterParam::new("energy_source")),
    )
    .with_distinct_list(DistinctList::new("types", IMPORT_EXPORT, "type"))
}

fn co2_imports_exports() -> Topic {
    let trade = || {
        FactTableDescriptor::new(TRADE_BY_COUNTRY, "co2")
            .with_group_column("country")
            .without_group_type()
            .without_period()
            .with_unit(MTCO2EQ)
            .with_category("type")
    };
    let by_sector = FactTableDescriptor::new(TRADE_BY_SECTOR, "co2")
        .without_period()
        .with_unit(MTCO2EQ)
        .with_category("type")
        .with_target("sector");

    Topic::new("co2ImportsExports", "co2-imports-exports", trade())
        .with_dimension(
            DimensionSpec::new(DimensionKind::Total, trade(), SeriesLayout::CategoriesByGroup)
                .colored(ColorStrategy::Hashed)
                .ranked(),
        )
        .with_dimension(
            DimensionSpec::new(
                DimensionKind::ByCountry,
                trade().with_target("country_to"),
                SeriesLayout::TargetsByCategory { others: true },
            )
            .colored(ColorStrategy::Hashed),
        )
        .with_dimension(
            DimensionSpec::new(
                DimensionKind::ByContinent,
                trade().with_target("continent_to"),
                SeriesLayout::TargetsByCategory { others: false },
            )
            .colored(ColorStrategy::Hashed),
        )
        .with_dimension(DimensionSpec::new(
            DimensionKind::BySector,
            by_sector,
            SeriesLayout::TargetsByCategory { others: true },
        ))
        .with_distinct_list(DistinctList::new("types", TRADE_BY_COUNTRY, "type"))
}
