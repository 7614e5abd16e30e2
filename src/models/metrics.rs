// src/models/metrics.rs

use std::collections::BTreeMap;

use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeadMetrics {
    pub total_leads: usize,

    // "YYYY-MM-DD" -> quantidade de leads criados no dia
    pub leads_by_day: BTreeMap<String, u64>,

    // Sempre 24 posições (hora UTC de criação)
    pub leads_by_hour: Vec<u64>,

    pub peak_hour: usize,
}
