//! Example: rebuild a request's grid from its stored document and export it

use reqsheet::prelude::*;
use reqsheet::store::Request;

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let document = r#"{
        "id": "REQ-001",
        "title": "Office supplies",
        "columns": ["Item", "Qty", "Unit cost"],
        "initialRows": [{"Item": "Paper", "Qty": "10", "Unit cost": "4.5"}],
        "submissions": [
            {"department": "HR", "rows": [{"Item": "Pens", "Qty": "30", "Unit cost": "0.8"}], "completed": true}
        ],
        "status": "In Progress"
    }"#;
    let request: Request = serde_json::from_str(document)?;

    let mut grid = request.to_grid()?;
    grid.set_column_format(
        "Unit cost",
        CellFormat::new().with_number_format(NumberFormat::Currency),
    )?;
    grid.auto_sum("Qty")?;

    for row in 0..grid.row_count() {
        let cells: Vec<String> = grid
            .column_names()
            .iter()
            .map(|c| grid.display_value(row, c))
            .collect::<Result<_>>()?;
        println!("{}", cells.join(" | "));
    }

    let path = std::env::temp_dir().join(reqsheet::DEFAULT_EXPORT_FILENAME);
    let export = ExportOptions {
        include_header: true,
        ..ExportOptions::default()
    };
    grid.save(&path, &export)?;
    println!("Created {}", path.display());

    Ok(())
}
