use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeSet;

/// Sentinel value of the facility multi-select that stands for every facility
pub const ALL_FACILITIES: &str = "all";

/// Either every facility or a non-empty set of facility ids, never both and never neither
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum FacilitySelection {
    #[default]
    All,
    Only(BTreeSet<String>),
}

impl FacilitySelection {
    pub fn values(&self) -> Vec<String> {
        match self {
            FacilitySelection::All => vec![ALL_FACILITIES.into()],
            FacilitySelection::Only(ids) => ids.iter().cloned().collect(),
        }
    }

    pub fn is_selected(&self, id: &str) -> bool {
        match self {
            FacilitySelection::All => id == ALL_FACILITIES,
            FacilitySelection::Only(ids) => ids.contains(id),
        }
    }
}

impl Serialize for FacilitySelection {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.values().serialize(serializer)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub enum TimeRange {
    #[default]
    #[serde(rename = "all")]
    All,
    #[serde(rename = "7d")]
    Last7Days,
    #[serde(rename = "30d")]
    Last30Days,
    #[serde(rename = "90d")]
    Last90Days,
    #[serde(rename = "1y")]
    LastYear,
}

impl TimeRange {
    pub fn days(&self) -> Option<i64> {
        match self {
            TimeRange::All => None,
            TimeRange::Last7Days => Some(7),
            TimeRange::Last30Days => Some(30),
            TimeRange::Last90Days => Some(90),
            TimeRange::LastYear => Some(365),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendType {
    Daily,
    Weekly,
    #[default]
    Monthly,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FilterState {
    pub facilities: FacilitySelection,
    pub time_range: TimeRange,
    pub trend_type: TrendType,
}

impl FilterState {
    /// Applies the raw multi-select values. "all" and specific ids exclude each other: if both
    /// arrive, whichever was not active before wins. An empty selection falls back to "all".
    pub fn select_facilities(&mut self, selected: &[String]) {
        let wants_all = selected.iter().any(|it| it == ALL_FACILITIES);
        let specific: BTreeSet<String> = selected
            .iter()
            .map(|it| it.trim())
            .filter(|it| !it.is_empty() && *it != ALL_FACILITIES)
            .map(String::from)
            .collect();
        self.facilities = match (wants_all, specific.is_empty()) {
            (_, true) => FacilitySelection::All,
            (false, false) => FacilitySelection::Only(specific),
            (true, false) => match self.facilities {
                FacilitySelection::All => FacilitySelection::Only(specific),
                FacilitySelection::Only(_) => FacilitySelection::All,
            },
        };
    }

    pub fn set_time_range(&mut self, time_range: TimeRange) {
        self.time_range = time_range;
    }

    pub fn set_trend_type(&mut self, trend_type: TrendType) {
        self.trend_type = trend_type;
    }

    /// What gets written to the audit log after every change
    pub fn audit_details(&self) -> Map<String, Value> {
        let mut details = Map::new();
        details.insert("facilities".into(), json!(self.facilities.values()));
        details.insert("timeRange".into(), json!(self.time_range));
        details.insert("trendType".into(), json!(self.trend_type));
        details
    }
}

#[cfg(test)]
mod test {
    use super::{FacilitySelection, FilterState, TimeRange, TrendType};
    use serde_json::json;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|it| it.to_string()).collect()
    }

    fn only(ids: &[&str]) -> FacilitySelection {
        FacilitySelection::Only(ids.iter().map(|it| it.to_string()).collect())
    }

    #[test]
    fn defaults() {
        let filter = FilterState::default();
        assert_eq!(FacilitySelection::All, filter.facilities);
        assert_eq!(TimeRange::All, filter.time_range);
        assert_eq!(TrendType::Monthly, filter.trend_type);
    }

    #[test]
    fn specific_facility_clears_all() {
        let mut filter = FilterState::default();
        filter.select_facilities(&strings(&["all", "f1"]));
        assert_eq!(only(&["f1"]), filter.facilities);
    }

    #[test]
    fn all_clears_specific_facilities() {
        let mut filter = FilterState::default();
        filter.select_facilities(&strings(&["f1", "f2"]));
        assert_eq!(only(&["f1", "f2"]), filter.facilities);
        filter.select_facilities(&strings(&["f1", "f2", "all"]));
        assert_eq!(FacilitySelection::All, filter.facilities);
    }

    #[test]
    fn empty_selection_falls_back_to_all() {
        let mut filter = FilterState::default();
        filter.select_facilities(&strings(&["f1"]));
        filter.select_facilities(&[]);
        assert_eq!(FacilitySelection::All, filter.facilities);
        filter.select_facilities(&strings(&["f1"]));
        filter.select_facilities(&strings(&["  "]));
        assert_eq!(FacilitySelection::All, filter.facilities);
    }

    #[test]
    fn audit_details() {
        let mut filter = FilterState::default();
        filter.select_facilities(&strings(&["f2", "f1"]));
        filter.set_time_range(TimeRange::Last30Days);
        filter.set_trend_type(TrendType::Weekly);
        assert_eq!(
            json!({"facilities": ["f1", "f2"], "timeRange": "30d", "trendType": "weekly"}),
            serde_json::Value::Object(filter.audit_details()),
        );
    }

    #[test]
    fn time_range_wire_names() {
        assert_eq!(
            TimeRange::LastYear,
            serde_json::from_value(json!("1y")).unwrap()
        );
        assert_eq!(json!("all"), json!(TimeRange::All));
        assert_eq!(Some(90), TimeRange::Last90Days.days());
    }
}
