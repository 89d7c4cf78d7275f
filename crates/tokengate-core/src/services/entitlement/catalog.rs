//! Plan catalog
//!
//! Static table mapping a plan id to its daily allowance, price and
//! features. Loaded once at start-up, immutable afterwards.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::types::{DailyLimit, PlanId};
use crate::error::{Error, Result};

const DEFAULT_CURRENCY: &str = "INR";

/// Configuration of one plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanConfig {
    pub plan_id: PlanId,
    pub name: String,
    pub daily_token_allowance: DailyLimit,
    pub price: f64,
    pub currency: String,
    pub features: Vec<String>,
    pub description: String,
}

impl PlanConfig {
    pub fn is_paid(&self) -> bool {
        self.price > 0.0
    }
}

/// Entry of a JSON catalog override. Only the allowance is required.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogEntry {
    daily_token_allowance: DailyLimit,
    #[serde(default)]
    price: f64,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    features: Vec<String>,
    #[serde(default)]
    description: String,
}

/// Lookup table of every plan
#[derive(Debug, Clone)]
pub struct PlanCatalog {
    plans: HashMap<PlanId, PlanConfig>,
}

impl PlanCatalog {
    /// Catalog shipped with the service
    pub fn built_in() -> Self {
        let plans = [
            PlanConfig {
                plan_id: PlanId::Basic,
                name: "Basic Plan".to_string(),
                daily_token_allowance: DailyLimit::Limited(10),
                price: 0.0,
                currency: DEFAULT_CURRENCY.to_string(),
                features: vec![
                    "10 AI processing tokens per day".to_string(),
                    "Species recognition".to_string(),
                    "eDNA analysis".to_string(),
                    "Basic water quality monitoring".to_string(),
                    "Community support".to_string(),
                ],
                description: "For students and researchers getting started.".to_string(),
            },
            PlanConfig {
                plan_id: PlanId::Pro,
                name: "Pro Plan".to_string(),
                daily_token_allowance: DailyLimit::Limited(100),
                price: 399.0,
                currency: DEFAULT_CURRENCY.to_string(),
                features: vec![
                    "100 AI processing tokens per day".to_string(),
                    "Advanced species recognition".to_string(),
                    "Detailed eDNA analysis".to_string(),
                    "Priority support".to_string(),
                    "Data export capabilities".to_string(),
                    "Custom analysis reports".to_string(),
                ],
                description: "For professional researchers.".to_string(),
            },
            PlanConfig {
                plan_id: PlanId::Enterprise,
                name: "Enterprise Plan".to_string(),
                daily_token_allowance: DailyLimit::Unlimited,
                price: 999.0,
                currency: DEFAULT_CURRENCY.to_string(),
                features: vec![
                    "Unlimited AI processing tokens".to_string(),
                    "Dedicated support".to_string(),
                    "Custom integrations".to_string(),
                    "API access".to_string(),
                ],
                description: "For organizations and institutions.".to_string(),
            },
        ];

        Self {
            plans: plans.into_iter().map(|p| (p.plan_id, p)).collect(),
        }
    }

    /// Parse a JSON override of the form
    /// `{ "basic": { "dailyTokenAllowance": 10 }, "pro": { ... }, ... }`.
    ///
    /// Every plan id must be present.
    pub fn from_json(json: &str) -> Result<Self> {
        let entries: HashMap<String, CatalogEntry> = serde_json::from_str(json)?;

        let mut plans = HashMap::new();
        for (key, entry) in entries {
            let plan_id: PlanId = key.parse().map_err(|_| Error::UnknownPlan(key.clone()))?;
            if entry.price < 0.0 {
                return Err(Error::config(format!("Plan {} has a negative price", plan_id)));
            }
            plans.insert(
                plan_id,
                PlanConfig {
                    plan_id,
                    name: entry.name.unwrap_or_else(|| format!("{} plan", plan_id)),
                    daily_token_allowance: entry.daily_token_allowance,
                    price: entry.price,
                    currency: entry.currency.unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
                    features: entry.features,
                    description: entry.description,
                },
            );
        }

        if let Some(missing) = PlanId::ALL.iter().find(|id| !plans.contains_key(id)) {
            return Err(Error::config(format!("Plan catalog is missing '{}'", missing)));
        }

        Ok(Self { plans })
    }

    /// Built-in catalog, or the JSON file at `path` when given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                log::info!("[entitlement:catalog] Loading plan catalog from {}", path.display());
                let json = std::fs::read_to_string(path)?;
                Self::from_json(&json)
            }
            None => Ok(Self::built_in()),
        }
    }

    /// Look up a plan by its string id
    pub fn resolve(&self, plan_id: &str) -> Result<&PlanConfig> {
        let id: PlanId = plan_id
            .parse()
            .map_err(|_| Error::UnknownPlan(plan_id.to_string()))?;
        Ok(self.get(id))
    }

    /// Look up a plan by typed id. Every id is present by construction.
    pub fn get(&self, plan_id: PlanId) -> &PlanConfig {
        &self.plans[&plan_id]
    }

    /// The free tier every downgrade lands on
    pub fn free_plan(&self) -> &PlanConfig {
        self.get(PlanId::Basic)
    }

    /// All plans, cheapest tier first
    pub fn list(&self) -> Vec<&PlanConfig> {
        PlanId::ALL.iter().map(|id| self.get(*id)).collect()
    }
}

impl Default for PlanCatalog {
    fn default() -> Self {
        Self::built_in()
    }
}
