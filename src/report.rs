//! Text rendering of cost and savings records
//!
//! JSON output serializes the records directly; this module only builds tables.

use crate::pricing::{ContainerSavings, FargatePriceCalculator, LambdaPriceCalculator};
use crate::region::Region;
use crate::utils::format_usd;
use comfy_table::{presets::UTF8_FULL, Cell, CellAlignment, Table};
use rust_decimal::Decimal;

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(header);
    table
}

/// One row per cost component, then the total
pub fn cost_table(components: &[(&str, Decimal)], total: Decimal) -> Table {
    let mut table = new_table(vec!["COMPONENT", "COST (USD)"]);
    for (name, amount) in components {
        table.add_row(vec![
            Cell::new(name),
            Cell::new(format_usd(*amount)).set_alignment(CellAlignment::Right),
        ]);
    }
    table.add_row(vec![
        Cell::new("total-cost"),
        Cell::new(format_usd(total)).set_alignment(CellAlignment::Right),
    ]);
    table
}

pub fn savings_table(savings: &ContainerSavings) -> Table {
    let mut table = new_table(vec!["COMPONENT", "SPOT SAVINGS"]);
    for (name, percent) in savings.components() {
        table.add_row(vec![
            Cell::new(name),
            Cell::new(percent).set_alignment(CellAlignment::Right),
        ]);
    }
    table
}

pub fn regions_table(regions: &[Region]) -> Table {
    let mut table = new_table(vec!["CODE", "NAME"]);
    for region in regions {
        table.add_row(vec![Cell::new(&region.code), Cell::new(&region.name)]);
    }
    table
}

pub fn fargate_options_table() -> Table {
    let mut table = new_table(vec!["VCPU", "MEMORY (GB)", "OS TYPES"]);
    let os_types = FargatePriceCalculator::supported_os_types()
        .iter()
        .map(|os| os.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    for vcpu in FargatePriceCalculator::supported_vcpus() {
        let memory = FargatePriceCalculator::supported_memory(vcpu)
            .unwrap_or_default()
            .iter()
            .map(|m| m.normalize().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        table.add_row(vec![
            Cell::new(vcpu.normalize()),
            Cell::new(memory),
            Cell::new(&os_types),
        ]);
    }
    table
}

pub fn lambda_options_table() -> Table {
    let mut table = new_table(vec!["OS TYPES", "MEMORY (MB)"]);
    let os_types = LambdaPriceCalculator::supported_os_types()
        .iter()
        .map(|os| os.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let (min, max) = LambdaPriceCalculator::supported_memory_range_mb();
    table.add_row(vec![Cell::new(os_types), Cell::new(format!("{} - {}", min, max))]);
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::SavingsPercent;
    use rust_decimal_macros::dec;

    #[test]
    fn test_cost_table_lists_components_and_total() {
        let rendered = cost_table(
            &[("duration-cost", dec!(1.25)), ("requests-cost", dec!(0.4))],
            dec!(1.65),
        )
        .to_string();
        assert!(rendered.contains("duration-cost"));
        assert!(rendered.contains("$1.25000000"));
        assert!(rendered.contains("total-cost"));
        assert!(rendered.contains("$1.65000000"));
    }

    #[test]
    fn test_savings_table_marks_undefined() {
        let savings = ContainerSavings {
            total_cost: SavingsPercent::Percent(dec!(68.5)),
            cpu_cost: SavingsPercent::Percent(dec!(70)),
            memory_cost: SavingsPercent::Percent(dec!(70)),
            os_license_cost: SavingsPercent::Undefined,
            storage_cost: SavingsPercent::Percent(dec!(0)),
        };
        let rendered = savings_table(&savings).to_string();
        assert!(rendered.contains("68.50%"));
        assert!(rendered.contains("n/a"));
    }

    #[test]
    fn test_fargate_options_table() {
        let rendered = fargate_options_table().to_string();
        assert!(rendered.contains("0.25"));
        assert!(rendered.contains("0.5, 1, 2"));
        assert!(rendered.contains("windows"));
    }

    #[test]
    fn test_lambda_options_table() {
        let rendered = lambda_options_table().to_string();
        assert!(rendered.contains("128 - 10240"));
        assert!(!rendered.contains("windows"));
    }
}
