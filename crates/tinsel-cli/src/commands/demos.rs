use comfy_table::{ContentArrangement, Table};

use crate::demos::DEMOS;

pub fn run() -> Result<(), String> {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Demo", "Scene", "Inputs", "Description"]);

    for demo in DEMOS {
        let inputs = match demo.scripted_inputs() {
            0 => "-".to_string(),
            n => format!("{n} scripted"),
        };
        table.add_row(vec![demo.name, demo.scene, inputs.as_str(), demo.about]);
    }

    println!("{table}");
    println!();
    println!("  {} demos", DEMOS.len());

    Ok(())
}
