//! The output slot every renderer writes into.

use crate::geo::MapView;
use crate::plot::PlotOutput;
use crate::table::TableView;

/// Fixed messages shown in place of a chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    RenderError,
    UnsupportedGeo,
    LoadingBoundaries,
}

impl Placeholder {
    pub fn message(&self) -> &'static str {
        match self {
            Placeholder::RenderError => "Chart render error",
            Placeholder::UnsupportedGeo => "Unsupported geo type",
            Placeholder::LoadingBoundaries => "Loading boundaries...",
        }
    }
}

#[derive(Debug, Clone)]
pub enum Output {
    Plot(PlotOutput),
    Map(MapView),
    Table(TableView),
    Placeholder(Placeholder),
}

/// Caller-owned surface. Each render replaces whatever was there.
#[derive(Debug, Clone, Default)]
pub struct Container {
    width_hint: Option<u32>,
    output: Option<Output>,
    replacements: u64,
}

impl Container {
    pub fn new(width_hint: Option<u32>) -> Self {
        Container {
            width_hint,
            ..Default::default()
        }
    }

    /// Measured width of the host area, if known.
    pub fn width_hint(&self) -> Option<u32> {
        self.width_hint
    }

    pub fn set_width_hint(&mut self, width: Option<u32>) {
        self.width_hint = width;
    }

    pub fn clear(&mut self) {
        self.output = None;
    }

    pub fn replace(&mut self, output: Output) {
        self.output = Some(output);
        self.replacements += 1;
    }

    pub fn output(&self) -> Option<&Output> {
        self.output.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.output.is_none()
    }

    /// How many times content has been written, across all renders.
    pub fn replacements(&self) -> u64 {
        self.replacements
    }

    pub fn placeholder(&self) -> Option<Placeholder> {
        match &self.output {
            Some(Output::Placeholder(p)) => Some(*p),
            _ => None,
        }
    }

    pub fn plot(&self) -> Option<&PlotOutput> {
        match &self.output {
            Some(Output::Plot(p)) => Some(p),
            _ => None,
        }
    }

    pub fn map(&self) -> Option<&MapView> {
        match &self.output {
            Some(Output::Map(m)) => Some(m),
            _ => None,
        }
    }

    pub fn table(&self) -> Option<&TableView> {
        match &self.output {
            Some(Output::Table(t)) => Some(t),
            _ => None,
        }
    }

    pub fn table_mut(&mut self) -> Option<&mut TableView> {
        match &mut self.output {
            Some(Output::Table(t)) => Some(t),
            _ => None,
        }
    }
}
