use super::filter::{FacilitySelection, FilterState, TrendType, ALL_FACILITIES};
use super::mirror::{Immunization, Mirror, UNKNOWN};
use crate::date::{self, DateFormat};
use crate::db::conf::schema::Conf;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use time::macros::format_description;
use time::{Date, Duration};

pub const STATUS_COMPLETED: &str = "Completed";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProjectionConf {
    pub doses_per_child: u32,
    pub row_limit: usize,
}

impl From<&Conf> for ProjectionConf {
    fn from(conf: &Conf) -> Self {
        ProjectionConf {
            doses_per_child: u32::try_from(conf.coverage_doses_per_child).unwrap_or(0),
            row_limit: usize::try_from(conf.recent_immunizations_limit).unwrap_or(0),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub facilities: usize,
    pub users: usize,
    pub children: usize,
    pub immunizations: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ImmunizationRow {
    pub id: String,
    pub child_name: String,
    pub vaccine_name: String,
    pub facility_name: String,
    pub date: String,
    pub status: &'static str,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FacilityOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub values: Vec<usize>,
}

impl ChartData {
    fn from_counts<K>(counts: BTreeMap<K, usize>, label: impl Fn(&K) -> String) -> Self {
        let mut chart = ChartData::default();
        for (key, count) in counts {
            chart.labels.push(label(&key));
            chart.values.push(count);
        }
        chart
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Charts {
    pub trend: ChartData,
    pub facility: ChartData,
    pub vaccine: ChartData,
    pub role: ChartData,
}

/// Everything the render sink needs, already computed
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ViewModel {
    pub totals: Totals,
    pub coverage_rate: u8,
    pub rows: Vec<ImmunizationRow>,
    pub facility_options: Vec<FacilityOption>,
    pub charts: Charts,
}

/// Percentage of expected doses given, capped at 100. Zero children or a zero multiplier
/// yields 0.
pub fn coverage_rate(immunizations: usize, children: usize, doses_per_child: u32) -> u8 {
    if children == 0 || doses_per_child == 0 {
        return 0;
    }
    let expected = children as f64 * f64::from(doses_per_child);
    let rate = (immunizations as f64 / expected * 100.0).min(100.0);
    rate.round() as u8
}

/// Derives the view model from the mirror as it is right now. Pure: the same inputs always
/// produce the same output, nothing from earlier snapshots is carried over.
pub fn project(
    mirror: &Mirror,
    filter: &FilterState,
    conf: &ProjectionConf,
    today: Date,
) -> ViewModel {
    let totals = Totals {
        facilities: mirror.facilities().len(),
        users: mirror.users().len(),
        children: mirror.children().len(),
        immunizations: mirror.immunizations().len(),
    };
    let coverage_rate = coverage_rate(totals.immunizations, totals.children, conf.doses_per_child);

    let selection = surviving_selection(mirror, &filter.facilities);
    let facility_names = selected_facility_names(mirror, &selection);
    let cutoff = filter.time_range.days().map(|days| today - Duration::days(days));
    let visible: Vec<&Immunization> = mirror
        .immunizations()
        .items()
        .iter()
        .filter(|it| match &facility_names {
            Some(names) => names.contains(it.facility_name.as_str()),
            None => true,
        })
        .filter(|it| match (cutoff, it.date) {
            (None, _) => true,
            (Some(cutoff), Some(date)) => date.date() >= cutoff,
            (Some(_), None) => false,
        })
        .take(conf.row_limit)
        .collect();

    ViewModel {
        totals,
        coverage_rate,
        rows: visible.iter().map(|it| row(it)).collect(),
        facility_options: facility_options(mirror, &selection),
        charts: charts(mirror, &visible, filter.trend_type),
    }
}

/// Drops selected ids that no longer name a facility. A selection left empty falls back to
/// every facility.
fn surviving_selection(mirror: &Mirror, selection: &FacilitySelection) -> FacilitySelection {
    let FacilitySelection::Only(ids) = selection else {
        return FacilitySelection::All;
    };
    let surviving: BTreeSet<String> = mirror
        .facilities()
        .items()
        .iter()
        .filter(|it| ids.contains(&it.id))
        .map(|it| it.id.clone())
        .collect();
    if surviving.is_empty() {
        FacilitySelection::All
    } else {
        FacilitySelection::Only(surviving)
    }
}

/// Facility names a row may carry to pass the filter. Selected ids are matched both by the
/// facility's name and by the raw id.
fn selected_facility_names<'a>(
    mirror: &'a Mirror,
    selection: &'a FacilitySelection,
) -> Option<HashSet<&'a str>> {
    let FacilitySelection::Only(ids) = selection else {
        return None;
    };
    let mut names: HashSet<&str> = ids.iter().map(String::as_str).collect();
    for facility in mirror.facilities().items() {
        if ids.contains(&facility.id) {
            names.insert(facility.label());
        }
    }
    Some(names)
}

fn row(immunization: &Immunization) -> ImmunizationRow {
    ImmunizationRow {
        id: immunization.id.clone(),
        child_name: immunization.child_name.clone(),
        vaccine_name: immunization.vaccine_name.clone(),
        facility_name: immunization.facility_name.clone(),
        date: match immunization.date {
            Some(_) => date::format(immunization.date, DateFormat::Short),
            None => UNKNOWN.into(),
        },
        status: STATUS_COMPLETED,
    }
}

fn facility_options(mirror: &Mirror, selection: &FacilitySelection) -> Vec<FacilityOption> {
    let mut options = vec![FacilityOption {
        value: ALL_FACILITIES.into(),
        label: "All Facilities".into(),
        selected: selection.is_selected(ALL_FACILITIES),
    }];
    options.extend(mirror.facilities().items().iter().map(|it| FacilityOption {
        value: it.id.clone(),
        label: it.label().into(),
        selected: selection.is_selected(&it.id),
    }));
    options
}

fn charts(mirror: &Mirror, rows: &[&Immunization], trend_type: TrendType) -> Charts {
    let mut trend: BTreeMap<Date, usize> = BTreeMap::new();
    let mut facility: BTreeMap<&str, usize> = BTreeMap::new();
    let mut vaccine: BTreeMap<&str, usize> = BTreeMap::new();
    for row in rows {
        if let Some(date) = row.date {
            *trend.entry(bucket(date.date(), trend_type)).or_default() += 1;
        }
        *facility.entry(&row.facility_name).or_default() += 1;
        *vaccine.entry(&row.vaccine_name).or_default() += 1;
    }
    let mut role: BTreeMap<&str, usize> = BTreeMap::new();
    for user in mirror.users().items() {
        *role.entry(&user.role).or_default() += 1;
    }
    Charts {
        trend: ChartData::from_counts(trend, |it| bucket_label(*it, trend_type)),
        facility: ChartData::from_counts(facility, |it| it.to_string()),
        vaccine: ChartData::from_counts(vaccine, |it| it.to_string()),
        role: ChartData::from_counts(role, |it| it.to_string()),
    }
}

/// First day of the period the date falls into, weeks start on Monday
fn bucket(date: Date, trend_type: TrendType) -> Date {
    match trend_type {
        TrendType::Daily => date,
        TrendType::Weekly => {
            date - Duration::days(i64::from(date.weekday().number_days_from_monday()))
        }
        TrendType::Monthly => date.replace_day(1).unwrap_or(date),
    }
}

fn bucket_label(date: Date, trend_type: TrendType) -> String {
    let res = match trend_type {
        TrendType::Daily | TrendType::Weekly => {
            date.format(format_description!("[month repr:short] [day padding:none], [year]"))
        }
        TrendType::Monthly => date.format(format_description!("[month repr:short] [year]")),
    };
    res.unwrap_or_else(|_| date.to_string())
}
