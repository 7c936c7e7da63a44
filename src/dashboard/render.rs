use super::projector::{ChartData, FacilityOption, ImmunizationRow, ViewModel};
use serde::Serialize;
use std::collections::BTreeMap;
use strum::{AsRefStr, Display, EnumIter};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, AsRefStr, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum Counter {
    TotalFacilities,
    TotalUsers,
    TotalChildren,
    TotalImmunizations,
    CoverageRate,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, AsRefStr, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum ChartId {
    Trend,
    Facility,
    Vaccine,
    Role,
}

impl ChartId {
    pub fn kind(&self) -> &'static str {
        match self {
            ChartId::Trend => "line",
            ChartId::Facility => "bar",
            ChartId::Vaccine => "doughnut",
            ChartId::Role => "polarArea",
        }
    }
}

/// Named output ports of the dashboard screen. Implementations only store what they are
/// given, every value arrives already computed.
pub trait RenderSink {
    fn set_counter(&mut self, counter: Counter, text: String);
    fn rebuild_table(&mut self, rows: &[ImmunizationRow]);
    fn rebuild_facility_options(&mut self, options: &[FacilityOption]);
    fn replace_chart(&mut self, chart: ChartId, data: &ChartData);
    fn show_error(&mut self, message: &str);
}

/// Writes the view model to every port exactly once
pub fn paint(view: &ViewModel, sink: &mut impl RenderSink) {
    sink.set_counter(Counter::TotalFacilities, view.totals.facilities.to_string());
    sink.set_counter(Counter::TotalUsers, view.totals.users.to_string());
    sink.set_counter(Counter::TotalChildren, view.totals.children.to_string());
    sink.set_counter(
        Counter::TotalImmunizations,
        view.totals.immunizations.to_string(),
    );
    sink.set_counter(Counter::CoverageRate, format!("{}%", view.coverage_rate));
    sink.rebuild_table(&view.rows);
    sink.rebuild_facility_options(&view.facility_options);
    sink.replace_chart(ChartId::Trend, &view.charts.trend);
    sink.replace_chart(ChartId::Facility, &view.charts.facility);
    sink.replace_chart(ChartId::Vaccine, &view.charts.vaccine);
    sink.replace_chart(ChartId::Role, &view.charts.role);
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Chart {
    pub kind: &'static str,
    pub labels: Vec<String>,
    pub values: Vec<usize>,
}

/// In-memory screen served over HTTP
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Screen {
    pub counters: BTreeMap<String, String>,
    pub table: Vec<ImmunizationRow>,
    pub facility_options: Vec<FacilityOption>,
    pub charts: BTreeMap<String, Chart>,
    pub error: Option<String>,
}

impl RenderSink for Screen {
    fn set_counter(&mut self, counter: Counter, text: String) {
        self.counters.insert(counter.to_string(), text);
    }

    fn rebuild_table(&mut self, rows: &[ImmunizationRow]) {
        self.table.clear();
        self.table.extend_from_slice(rows);
    }

    fn rebuild_facility_options(&mut self, options: &[FacilityOption]) {
        self.facility_options = options.to_vec();
    }

    fn replace_chart(&mut self, chart: ChartId, data: &ChartData) {
        self.charts.insert(
            chart.to_string(),
            Chart {
                kind: chart.kind(),
                labels: data.labels.clone(),
                values: data.values.clone(),
            },
        );
    }

    fn show_error(&mut self, message: &str) {
        self.error = Some(message.into());
    }
}
