//! `detention-ctl analyze`: dry-run the analyzer over a scenario file.

use std::path::Path;

use anyhow::Context;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use detention_orchestration::DetentionAnalyzer;
use detention_shared::models::{
    AnalysisResult, BillingRules, DetentionAction, OrderView, RawBillingRule, TourTimestamps,
};

use crate::{load_config, output};

#[derive(Debug, Deserialize)]
struct Scenario {
    rules: RawBillingRule,
    order: OrderView,
    #[serde(default)]
    timestamps: Option<TourTimestamps>,
}

#[derive(Debug, Serialize)]
struct ScenarioAnalysis {
    order_id: String,
    shipper: String,
    rules_active: bool,
    chargeable_total: Decimal,
    results: Vec<AnalysisResult>,
}

fn counts_toward_total(action: DetentionAction) -> bool {
    matches!(
        action,
        DetentionAction::CreateCharge
            | DetentionAction::UpdateCharge
            | DetentionAction::PendingApproval
            | DetentionAction::AnalysisOnly
    )
}

fn analyze_scenario(analyzer: &DetentionAnalyzer, scenario: Scenario) -> anyhow::Result<ScenarioAnalysis> {
    let rules = BillingRules::try_from(scenario.rules).context("Invalid billing rules in scenario")?;
    let order = scenario.order;
    let charge_code = &analyzer.config().detention_charge_code;

    let results: Vec<AnalysisResult> = order
        .stops
        .iter()
        .enumerate()
        .map(|(index, stop)| {
            let timestamps = scenario.timestamps.as_ref().and_then(|t| t.for_stop(index));
            let existing = order.hold_for(index, charge_code);
            analyzer.analyze(stop, timestamps, &rules, order.status, &existing, index)
        })
        .collect();

    let chargeable_total = results
        .iter()
        .filter(|r| counts_toward_total(r.action))
        .map(|r| r.charge)
        .sum();

    Ok(ScenarioAnalysis {
        order_id: order.order_id,
        shipper: order.shipper_name,
        rules_active: rules.is_active,
        chargeable_total,
        results,
    })
}

pub(crate) async fn handle_analyze_command(
    scenario_path: &Path,
    json: bool,
    config_path: Option<&Path>,
) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let raw = tokio::fs::read_to_string(scenario_path)
        .await
        .with_context(|| format!("Failed to read scenario {}", scenario_path.display()))?;
    let scenario: Scenario = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse scenario {}", scenario_path.display()))?;

    let analyzer = DetentionAnalyzer::new(config.analyzer);
    let analysis = analyze_scenario(&analyzer, scenario)?;
    tracing::debug!(
        order_id = %analysis.order_id,
        stops = analysis.results.len(),
        "Scenario analyzed"
    );

    if json {
        output::plain(serde_json::to_string_pretty(&analysis)?);
        return Ok(());
    }

    output::header(format!("Order {} ({})", analysis.order_id, analysis.shipper));
    if !analysis.rules_active {
        output::warning("Billing rules are inactive; a batch run would skip this shipper");
    }
    output::blank();
    for result in &analysis.results {
        output::verdict_row(result);
    }
    output::blank();
    output::label("Chargeable total", format!("${:.2}", analysis.chargeable_total));
    Ok(())
}
