//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `leadlist_core` linkage.
//! - Print the operator catalog so rule editors can be checked by eye.

use leadlist_core::{default_operator, operators_for, LeadField};

fn main() {
    println!("leadlist_core version={}", leadlist_core::core_version());
    for field in LeadField::ALL {
        let class = field.class();
        let operators = operators_for(class)
            .iter()
            .map(|operator| operator.as_str())
            .collect::<Vec<_>>()
            .join(",");
        println!(
            "field={} class={:?} default={} operators={}",
            field,
            class,
            default_operator(class),
            operators
        );
    }
}
