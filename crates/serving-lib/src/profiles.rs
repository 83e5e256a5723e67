//! Static cluster profile table
//!
//! Human-readable descriptions of the segmentation clusters. The table is
//! display configuration shipped alongside the segmentation artifacts, not
//! model logic: it can be updated without a rebuild. Lookup never fails;
//! cluster ids outside the table resolve to a generic profile.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Aggregate traits of one behavioral cluster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterTraits {
    pub gmv_mean: f64,
    pub purchase_frequency: String,
    pub behavior: String,
}

/// Narrative profile of one behavioral cluster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterProfile {
    pub description: String,
    pub characteristics: ClusterTraits,
}

impl ClusterProfile {
    /// Profile returned for any cluster id the table does not know.
    pub fn unknown() -> Self {
        Self {
            description: "Unknown cluster".to_string(),
            characteristics: ClusterTraits {
                gmv_mean: 0.0,
                purchase_frequency: "Unknown".to_string(),
                behavior: "No profile available for this cluster".to_string(),
            },
        }
    }
}

/// Cluster id → profile table, read-only after construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClusterProfileTable {
    profiles: HashMap<String, ClusterProfile>,
}

impl ClusterProfileTable {
    pub fn new(profiles: HashMap<String, ClusterProfile>) -> Self {
        Self { profiles }
    }

    /// Total lookup: unknown ids resolve to the generic profile.
    pub fn get(&self, cluster: i64) -> ClusterProfile {
        self.profiles
            .get(&cluster.to_string())
            .cloned()
            .unwrap_or_else(ClusterProfile::unknown)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn contains(&self, cluster: i64) -> bool {
        self.profiles.contains_key(&cluster.to_string())
    }
}

impl Default for ClusterProfileTable {
    /// Built-in table extracted from the offline cluster analysis. Used when
    /// no `cluster_profiles.json` ships with the segmentation artifacts.
    fn default() -> Self {
        let mut profiles = HashMap::new();
        let mut add = |id: i64, description: &str, gmv_mean: f64, freq: &str, behavior: &str| {
            profiles.insert(
                id.to_string(),
                ClusterProfile {
                    description: description.to_string(),
                    characteristics: ClusterTraits {
                        gmv_mean,
                        purchase_frequency: freq.to_string(),
                        behavior: behavior.to_string(),
                    },
                },
            );
        };
        add(
            0,
            "Regular customers - low value",
            143.12,
            "Low-Medium",
            "Sporadic purchases with low average order value",
        );
        add(
            1,
            "Weekend customers",
            139.40,
            "Medium",
            "Prefer purchasing on weekends",
        );
        add(
            2,
            "Frequent customers - high value",
            264.25,
            "High",
            "Frequent purchases with high order values",
        );
        add(
            3,
            "VIP customers - very high volume",
            260.21,
            "Very High",
            "Exceptional customers with very high purchase volume",
        );
        add(
            4,
            "Premium customers - multiple tickets",
            544.22,
            "Low",
            "High-value purchases with multiple tickets per order",
        );
        Self { profiles }
    }
}
