use crate::{models::*, pooling::MetaAnalyzer, Result};
use itertools::Itertools;
use std::collections::HashMap;

pub struct SubgroupAnalyzer;

impl SubgroupAnalyzer {
    /// Pool each subgroup separately.
    ///
    /// Untagged studies are collected into an "Ungrouped" partition. When no
    /// study carries a tag there is nothing to decompose and the result is
    /// empty. Subgroups below the configured minimum size are skipped with a
    /// warning rather than failing the whole analysis.
    pub fn analyze_subgroups(
        studies: &[Study],
        config: &AnalysisConfig,
    ) -> Result<HashMap<String, SubgroupResults>> {
        if studies.iter().all(|s| s.subgroup.is_none()) {
            return Ok(HashMap::new());
        }

        let groups: HashMap<String, Vec<Study>> = studies
            .iter()
            .map(|s| {
                let label = s
                    .subgroup
                    .clone()
                    .unwrap_or_else(|| "Ungrouped".to_string());
                (label, s.clone())
            })
            .into_group_map();

        let mut subgroup_results = HashMap::new();

        for (label, members) in groups.into_iter().sorted_by(|a, b| a.0.cmp(&b.0)) {
            if members.len() < config.min_subgroup_size {
                log::warn!(
                    "Skipping subgroup {} (n={}, minimum required: {})",
                    label,
                    members.len(),
                    config.min_subgroup_size
                );
                continue;
            }

            log::info!("Pooling subgroup: {} (n = {})", label, members.len());
            let pooled = MetaAnalyzer::pool(&members, config)?;

            subgroup_results.insert(
                label.clone(),
                SubgroupResults {
                    label,
                    n_studies: members.len(),
                    pooled,
                },
            );
        }

        Ok(subgroup_results)
    }
}
