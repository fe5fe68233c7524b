//! Price estimate commands

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use tabled::Tabled;

use crate::client::{ApiClient, PredictRequest};
use crate::output::{estimate_range, format_lkr, print_error, print_warning, OutputFormat};

/// Row for the samples table
#[derive(Tabled)]
struct SampleRow {
    #[tabled(rename = "Vehicle")]
    vehicle: String,
    #[tabled(rename = "YOM")]
    yom: i32,
    #[tabled(rename = "Mileage (km)")]
    mileage: String,
    #[tabled(rename = "Engine (cc)")]
    engine: String,
    #[tabled(rename = "Gear")]
    gear: String,
    #[tabled(rename = "Estimate")]
    estimate: String,
}

#[derive(Serialize)]
struct SampleResult {
    vehicle: String,
    #[serde(rename = "Predicted Price")]
    predicted_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Reference vehicles priced by `carprice samples`
pub fn sample_vehicles() -> Vec<PredictRequest> {
    vec![
        PredictRequest::basic(2012, 120000.0, 1500.0, "TOYOTA", "AQUA", "Auto", "Petrol", "Used"),
        PredictRequest::basic(2018, 100000.0, 660.0, "SUZUKI", "WAGON R", "Auto", "Petrol", "Used"),
        PredictRequest::basic(2015, 80000.0, 800.0, "SUZUKI", "ALTO", "Manual", "Petrol", "Used"),
    ]
}

fn vehicle_label(request: &PredictRequest) -> String {
    format!("{} {}", request.brand, request.model)
}

/// Request an estimate for one vehicle
pub async fn predict_price(
    client: &ApiClient,
    request: PredictRequest,
    format: OutputFormat,
) -> Result<()> {
    let result = client.predict(&request).await?;

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&result)?;
            println!("{}", json);
        }
        OutputFormat::Table => {
            let price = result.predicted_price;
            let (low, high) = estimate_range(price);

            println!("{}", "Price Estimate".bold());
            println!("{}", "=".repeat(50));
            println!("Vehicle:        {}", vehicle_label(&request).cyan());
            println!("Year:           {}", request.yom);
            println!("Mileage:        {:.0} km", request.mileage);
            println!("Engine:         {:.0} cc", request.engine);
            println!();
            println!("{} {}", "Estimated Price:".bold(), format_lkr(price).green().bold());
            println!("Range:          {} - {}", format_lkr(low), format_lkr(high));

            if !price.is_finite() || price <= 0.0 {
                print_warning("The model returned a non-positive estimate");
            }
        }
    }

    Ok(())
}

/// Price every reference vehicle; individual failures are reported inline
pub async fn price_samples(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let mut results = Vec::new();

    for request in sample_vehicles() {
        let outcome = client.predict(&request).await;
        results.push((request, outcome));
    }

    match format {
        OutputFormat::Json => {
            let out: Vec<SampleResult> = results
                .iter()
                .map(|(request, outcome)| SampleResult {
                    vehicle: vehicle_label(request),
                    predicted_price: outcome.as_ref().ok().map(|r| r.predicted_price),
                    error: outcome.as_ref().err().map(|e| e.to_string()),
                })
                .collect();
            let json = serde_json::to_string_pretty(&out)?;
            println!("{}", json);
        }
        OutputFormat::Table => {
            let rows: Vec<SampleRow> = results
                .iter()
                .map(|(request, outcome)| SampleRow {
                    vehicle: vehicle_label(request),
                    yom: request.yom,
                    mileage: format!("{:.0}", request.mileage),
                    engine: format!("{:.0}", request.engine),
                    gear: request.gear.clone(),
                    estimate: match outcome {
                        Ok(r) => format_lkr(r.predicted_price),
                        Err(_) => "-".to_string(),
                    },
                })
                .collect();

            let table = tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);

            for (request, outcome) in &results {
                if let Err(e) = outcome {
                    print_error(&format!("{}: {}", vehicle_label(request), e));
                }
            }
        }
    }

    Ok(())
}
