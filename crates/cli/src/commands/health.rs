//! Service health command

use anyhow::Result;
use tabled::Tabled;

use crate::client::{ApiClient, HealthResult};
use crate::output::{color_status, print_json, print_table, OutputFormat};

/// Row for the per-model availability table
#[derive(Tabled, serde::Serialize)]
struct ModelRow {
    #[tabled(rename = "Model")]
    model: String,
    #[tabled(rename = "Available")]
    available: String,
    #[tabled(rename = "Cached")]
    cached: String,
}

/// Query and display service health
pub async fn run(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let health: HealthResult = client.get("/healthz").await?;

    if let OutputFormat::Json = format {
        print_json(&health);
        return Ok(());
    }

    println!("Status: {}", color_status(&health.status));
    println!(
        "Cached models: {}/{}",
        health.cache.count,
        health.models.len()
    );

    let rows: Vec<ModelRow> = health
        .models
        .iter()
        .map(|(model, available)| ModelRow {
            model: model.clone(),
            available: if *available { "yes" } else { "no" }.to_string(),
            cached: if health.cache.loaded_kinds.contains(model) {
                "yes"
            } else {
                "no"
            }
            .to_string(),
        })
        .collect();
    print_table(&rows, format);

    Ok(())
}
