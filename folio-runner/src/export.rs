//! CSV export of a simulation's recommendations.

use std::path::Path;

use anyhow::{Context, Result};
use folio_core::rebalance::SimulationResult;

/// Columns: ticker, user_recommendation, current_price, current_value,
/// current_pct, target_pct, above_ceiling, recommended_investment,
/// expected_shares, override
pub fn export_recommendations_csv(result: &SimulationResult) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "ticker",
        "user_recommendation",
        "current_price",
        "current_value",
        "current_pct",
        "target_pct",
        "above_ceiling",
        "recommended_investment",
        "expected_shares",
        "override",
    ])?;

    for r in &result.recommendations {
        wtr.write_record([
            &r.ticker.to_string(),
            &r.user_recommendation.to_string(),
            &format!("{:.4}", r.current_price),
            &format!("{:.2}", r.current_value),
            &format!("{:.4}", r.current_percentage),
            &format!("{:.4}", r.target_percentage),
            &r.is_above_ceiling.to_string(),
            &format!("{:.2}", r.recommended_investment),
            &format!("{:.6}", r.expected_shares),
            &r.override_reason.map(|o| o.code().to_string()).unwrap_or_default(),
        ])?;
    }

    let bytes = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(bytes).context("CSV output is not valid UTF-8")
}

/// Write the recommendations CSV to `path`, creating parent directories.
pub fn write_recommendations_csv(path: &Path, result: &SimulationResult) -> Result<()> {
    let csv = export_recommendations_csv(result)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, csv).with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::domain::{Holding, Portfolio, PriceMap, Ticker, UserRecommendation};
    use folio_core::rebalance::{simulate, YieldAssumption};

    fn sample() -> SimulationResult {
        let t = |s: &str| Ticker::parse(s).unwrap();
        let portfolio: Portfolio = [
            Holding::new(t("BRK.B"), 2.0, 60.0),
            Holding::new(t("TSLA"), 1.0, 40.0).with_recommendation(UserRecommendation::Sell),
        ]
        .into_iter()
        .collect();
        let prices: PriceMap = [(t("BRK.B"), 400.0), (t("TSLA"), 200.0)].into_iter().collect();
        simulate(&portfolio, &prices, 1000.0, &YieldAssumption::disabled()).unwrap()
    }

    #[test]
    fn one_row_per_recommendation() {
        let csv = export_recommendations_csv(&sample()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("ticker,user_recommendation"));
        assert!(lines[1].starts_with("BRK.B,Buy,"));
        assert!(lines[2].starts_with("TSLA,Sell,"));
        assert!(lines[2].ends_with(",0.00,0.000000,user_policy"));
    }

    #[test]
    fn write_creates_parent_dirs() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("out/sim.csv");
        write_recommendations_csv(&path, &sample()).unwrap();
        assert!(std::fs::read_to_string(path).unwrap().contains("BRK.B"));
    }
}
