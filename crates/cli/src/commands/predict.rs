//! Prediction commands

use anyhow::{Context, Result};
use std::io::Read;
use tabled::Tabled;

use crate::client::{ApiClient, RepurchaseResult, RouteResult, SegmentationResult};
use crate::output::{
    color_confidence, color_risk, format_probability, print_json, print_table, OutputFormat,
};
use crate::PredictCommands;

/// Row for the ranked routes table
#[derive(Tabled, serde::Serialize)]
struct RouteRow {
    #[tabled(rename = "Rank")]
    rank: u32,
    #[tabled(rename = "Route")]
    route: String,
    #[tabled(rename = "Probability")]
    probability: String,
    #[tabled(rename = "Confidence")]
    confidence: String,
}

/// Read a JSON record from a file path or stdin ("-")
fn read_record(file: &str) -> Result<serde_json::Value> {
    let contents = if file == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read record from stdin")?;
        buffer
    } else {
        std::fs::read_to_string(file)
            .with_context(|| format!("Failed to read record file {file}"))?
    };
    serde_json::from_str(&contents).context("Record is not valid JSON")
}

pub async fn run(client: &ApiClient, command: PredictCommands, format: OutputFormat) -> Result<()> {
    match command {
        PredictCommands::Segmentation { file } => segmentation(client, &file, format).await,
        PredictCommands::Repurchase { file } => repurchase(client, &file, format).await,
        PredictCommands::Routes { file } => routes(client, &file, format).await,
    }
}

async fn segmentation(client: &ApiClient, file: &str, format: OutputFormat) -> Result<()> {
    let record = read_record(file)?;
    let result: SegmentationResult = client.post("/v1/predict/segmentation", &record).await?;

    if let OutputFormat::Json = format {
        print_json(&result);
        return Ok(());
    }

    println!("Cluster:     {}", result.cluster);
    println!("Profile:     {}", result.profile.description);
    println!("Behavior:    {}", result.profile.characteristics.behavior);
    println!("Frequency:   {}", result.profile.characteristics.purchase_frequency);
    println!("Confidence:  {}", color_confidence(result.confidence));

    Ok(())
}

async fn repurchase(client: &ApiClient, file: &str, format: OutputFormat) -> Result<()> {
    let record = read_record(file)?;
    let result: RepurchaseResult = client.post("/v1/predict/repurchase", &record).await?;

    if let OutputFormat::Json = format {
        print_json(&result);
        return Ok(());
    }

    println!(
        "Will repurchase: {}",
        if result.will_purchase { "yes" } else { "no" }
    );
    println!("Probability:     {}", format_probability(result.probability));
    println!("Risk category:   {}", color_risk(&result.risk_category));

    Ok(())
}

async fn routes(client: &ApiClient, file: &str, format: OutputFormat) -> Result<()> {
    let record = read_record(file)?;
    let result: RouteResult = client.post("/v1/predict/routes", &record).await?;

    if let OutputFormat::Json = format {
        print_json(&result);
        return Ok(());
    }

    println!("User cluster: {}", result.user_cluster);
    let rows: Vec<RouteRow> = result
        .top_routes
        .iter()
        .map(|route| RouteRow {
            rank: route.rank,
            route: route.route.clone(),
            probability: format_probability(route.probability),
            confidence: format!("{:.1}", route.confidence),
        })
        .collect();
    print_table(&rows, format);

    Ok(())
}
