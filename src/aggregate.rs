use std::collections::BTreeMap;

use crate::loader::Dataset;
use crate::types::StateVector;

/// What is visible at one simulated instant
#[derive(Debug, Clone)]
pub struct WindowSelection<'a> {
    /// Every record inside the window, ascending by time
    pub records: &'a [StateVector],

    /// Latest record per aircraft, ordered by id
    pub latest: BTreeMap<&'a str, &'a StateVector>,
}

impl<'a> WindowSelection<'a> {
    pub fn contains(&self, entity_id: &str) -> bool {
        self.latest.contains_key(entity_id)
    }

    pub fn len(&self) -> usize {
        self.latest.len()
    }

    pub fn is_empty(&self) -> bool {
        self.latest.is_empty()
    }
}

/// Selects the most recent record per aircraft within `[t - window_secs, t]`.
///
/// Equal times for the same aircraft resolve to the earliest record in dataset order,
/// which is input order since the dataset sort is stable.
pub fn select_window(dataset: &Dataset, t: f64, window_secs: f64) -> WindowSelection<'_> {
    let records = dataset.window(t - window_secs, t);

    let mut latest: BTreeMap<&str, &StateVector> = BTreeMap::new();
    for sv in records {
        latest
            .entry(sv.entity_id())
            .and_modify(|cur| {
                if sv.time > cur.time {
                    *cur = sv;
                }
            })
            .or_insert(sv);
    }

    WindowSelection { records, latest }
}
