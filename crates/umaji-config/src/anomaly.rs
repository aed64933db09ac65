//! Date-domain bounds for anomaly detection and quarantine.

use serde::{Deserialize, Serialize};
use umaji_core::DateDomain;

const fn default_min_year() -> i32 {
    1986
}

const fn default_max_year() -> i32 {
    2099
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnomalyConfig {
    #[serde(default = "default_min_year")]
    pub min_year: i32,

    #[serde(default = "default_max_year")]
    pub max_year: i32,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            min_year: default_min_year(),
            max_year: default_max_year(),
        }
    }
}

impl AnomalyConfig {
    pub const fn date_domain(&self) -> DateDomain {
        DateDomain::new(self.min_year, self.max_year)
    }
}
