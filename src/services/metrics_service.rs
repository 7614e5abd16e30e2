// src/services/metrics_service.rs

use std::collections::BTreeMap;

use chrono::Timelike;

use crate::models::{lead::LeadsMap, metrics::LeadMetrics};

/// Contagem de leads por dia e por hora de criação (UTC).
///
/// Com horas empatadas vence a primeira; sem leads o pico é a hora 0.
pub fn calculate_metrics(leads: &LeadsMap) -> LeadMetrics {
    let mut leads_by_day: BTreeMap<String, u64> = BTreeMap::new();
    let mut leads_by_hour = vec![0u64; 24];

    for lead in leads.values() {
        let day = lead.timestamp.format("%Y-%m-%d").to_string();
        *leads_by_day.entry(day).or_insert(0) += 1;
        leads_by_hour[lead.timestamp.hour() as usize] += 1;
    }

    let max = leads_by_hour.iter().copied().max().unwrap_or(0);
    let peak_hour = leads_by_hour.iter().position(|&count| count == max).unwrap_or(0);

    LeadMetrics {
        total_leads: leads.len(),
        leads_by_day,
        leads_by_hour,
        peak_hour,
    }
}
