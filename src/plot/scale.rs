use crate::coerce::number_string;

/// Position scale mapping data values to pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct Scale {
    pub domain: (f64, f64), // Data min/max (category indices for ordinal scales)
    pub range: (f64, f64),  // Pixel min/max
    pub kind: ScaleKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScaleKind {
    Linear,
    /// Bars: each category owns a band.
    Band { categories: Vec<String>, padding: f64 },
    /// Lines and dots over categories: each category is a point.
    Point { categories: Vec<String> },
}

impl Scale {
    pub fn linear(domain: (f64, f64), range: (f64, f64)) -> Self {
        Scale {
            domain,
            range,
            kind: ScaleKind::Linear,
        }
    }

    pub fn band(categories: Vec<String>, range: (f64, f64), padding: f64) -> Self {
        let n = categories.len().max(1) as f64;
        Scale {
            domain: (0.0, n),
            range,
            kind: ScaleKind::Band { categories, padding },
        }
    }

    pub fn point(categories: Vec<String>, range: (f64, f64)) -> Self {
        let n = categories.len().max(1) as f64;
        Scale {
            domain: (0.0, n),
            range,
            kind: ScaleKind::Point { categories },
        }
    }

    pub fn categories(&self) -> &[String] {
        match &self.kind {
            ScaleKind::Band { categories, .. } | ScaleKind::Point { categories } => categories,
            ScaleKind::Linear => &[],
        }
    }

    /// Pixel position of a value. Ordinal scales take a category index and
    /// return the band start (band) or the point center (point).
    pub fn map(&self, value: f64) -> f64 {
        let (r0, r1) = self.range;
        match &self.kind {
            ScaleKind::Linear => {
                let (d0, d1) = self.domain;
                if d1 == d0 {
                    return (r0 + r1) / 2.0;
                }
                r0 + (value - d0) / (d1 - d0) * (r1 - r0)
            }
            ScaleKind::Band { padding, .. } => {
                let step = self.step();
                r0 + value * step + step * padding / 2.0
            }
            ScaleKind::Point { .. } => {
                let step = self.step();
                r0 + (value + 0.5) * step
            }
        }
    }

    /// Width of one category slot in pixels; zero for linear scales.
    pub fn step(&self) -> f64 {
        match &self.kind {
            ScaleKind::Linear => 0.0,
            ScaleKind::Band { categories, .. } | ScaleKind::Point { categories } => {
                (self.range.1 - self.range.0) / categories.len().max(1) as f64
            }
        }
    }

    pub fn bandwidth(&self) -> f64 {
        match &self.kind {
            ScaleKind::Band { padding, .. } => self.step() * (1.0 - padding),
            _ => 0.0,
        }
    }

    /// Center of a category (or the position of a linear value).
    pub fn center(&self, value: f64) -> f64 {
        match &self.kind {
            ScaleKind::Band { .. } => self.map(value) + self.bandwidth() / 2.0,
            _ => self.map(value),
        }
    }

    /// Tick positions and labels; ordinal scales label every category that
    /// fits at `min_spacing` pixels apart.
    pub fn ticks(&self, count: usize, min_spacing: f64) -> Vec<(f64, String)> {
        match &self.kind {
            ScaleKind::Linear => nice_ticks(self.domain.0, self.domain.1, count)
                .into_iter()
                .map(|v| (self.map(v), number_string(v)))
                .collect(),
            ScaleKind::Band { categories, .. } | ScaleKind::Point { categories } => {
                let step = self.step().abs().max(f64::EPSILON);
                let every = (min_spacing / step).ceil().max(1.0) as usize;
                categories
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| i % every == 0)
                    .map(|(i, c)| (self.center(i as f64), c.clone()))
                    .collect()
            }
        }
    }
}

/// Continuous domain over `values`, optionally forced to include zero, then
/// extended to nice round bounds.
pub fn continuous_domain(values: impl IntoIterator<Item = f64>, include_zero: bool) -> (f64, f64) {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for v in values {
        if v < min {
            min = v;
        }
        if v > max {
            max = v;
        }
    }

    // Handle empty case
    if min == f64::INFINITY {
        return (0.0, 1.0);
    }

    if include_zero {
        if min > 0.0 {
            min = 0.0;
        }
        if max < 0.0 {
            max = 0.0;
        }
    }

    let (min, max) = pad_range(min, max);
    nice_domain(min, max, 10)
}

fn pad_range(min: f64, max: f64) -> (f64, f64) {
    if min == max {
        (min - 1.0, max + 1.0)
    } else {
        (min, max)
    }
}

fn tick_step(min: f64, max: f64, count: usize) -> f64 {
    let span = (max - min).abs();
    if span == 0.0 || count == 0 {
        return 1.0;
    }
    let raw = span / count as f64;
    let power = 10f64.powf(raw.log10().floor());
    let err = raw / power;
    let factor = if err >= 50f64.sqrt() {
        10.0
    } else if err >= 10f64.sqrt() {
        5.0
    } else if err >= 2f64.sqrt() {
        2.0
    } else {
        1.0
    };
    factor * power
}

/// Extend a domain outward to multiples of its tick step.
pub fn nice_domain(min: f64, max: f64, count: usize) -> (f64, f64) {
    let step = tick_step(min, max, count);
    (
        clean((min / step).floor() * step, step),
        clean((max / step).ceil() * step, step),
    )
}

// Strip float noise such as 0.30000000000000004 at the step's precision.
fn clean(value: f64, step: f64) -> f64 {
    let decimals = (-step.log10().floor()).max(0.0) as i32;
    let factor = 10f64.powi(decimals);
    let v = (value * factor).round() / factor;
    if v == 0.0 {
        0.0
    } else {
        v
    }
}

/// Upper bound on the tick count a caller may ask for.
pub const MAX_TICKS: usize = 50;

/// Round tick values inside `[min, max]`.
pub fn nice_ticks(min: f64, max: f64, count: usize) -> Vec<f64> {
    let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
    let step = tick_step(lo, hi, count.min(MAX_TICKS));
    let start = (lo / step).ceil() as i64;
    let end = (hi / step).floor() as i64;
    (start..=end).map(|i| clean(i as f64 * step, step)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_count_is_capped() {
        let ticks = nice_ticks(0.0, 1e9, 50_000_000);
        assert!(!ticks.is_empty());
        assert!(ticks.len() <= 2 * MAX_TICKS + 1);
    }

    #[test]
    fn test_linear_map() {
        let s = Scale::linear((0.0, 10.0), (100.0, 0.0));
        assert_eq!(s.map(0.0), 100.0);
        assert_eq!(s.map(10.0), 0.0);
        assert_eq!(s.map(5.0), 50.0);
    }

    #[test]
    fn test_degenerate_linear_domain_maps_to_middle() {
        let s = Scale::linear((3.0, 3.0), (0.0, 100.0));
        assert_eq!(s.map(3.0), 50.0);
    }

    #[test]
    fn test_band_scale() {
        let s = Scale::band(vec!["A".into(), "B".into()], (0.0, 200.0), 0.1);
        assert_eq!(s.step(), 100.0);
        assert!((s.bandwidth() - 90.0).abs() < 1e-9);
        assert!((s.map(0.0) - 5.0).abs() < 1e-9);
        assert!((s.center(1.0) - 150.0).abs() < 1e-9);
        assert_eq!(s.categories(), &["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn test_point_scale_centers() {
        let s = Scale::point(vec!["a".into(), "b".into(), "c".into(), "d".into()], (0.0, 400.0));
        assert_eq!(s.map(0.0), 50.0);
        assert_eq!(s.map(3.0), 350.0);
    }

    #[test]
    fn test_continuous_domain_includes_zero() {
        let (lo, hi) = continuous_domain(vec![4.0, 7.0], true);
        assert_eq!(lo, 0.0);
        assert!(hi >= 7.0);
        let (lo, _) = continuous_domain(vec![4.0, 7.0], false);
        assert!(lo > 0.0 && lo <= 4.0);
    }

    #[test]
    fn test_continuous_domain_single_point_and_empty() {
        let (lo, hi) = continuous_domain(vec![5.0], false);
        assert!(lo <= 4.0 && hi >= 6.0);
        assert_eq!(continuous_domain(Vec::new(), true), (0.0, 1.0));
    }

    #[test]
    fn test_nice_ticks() {
        assert_eq!(nice_ticks(0.0, 10.0, 5), vec![0.0, 2.0, 4.0, 6.0, 8.0, 10.0]);
        let ticks = nice_ticks(0.0, 1.0, 5);
        assert_eq!(ticks[1], 0.2);
        assert_eq!(ticks.len(), 6);
    }

    #[test]
    fn test_ordinal_ticks_thin_out() {
        let cats: Vec<String> = (0..20).map(|i| i.to_string()).collect();
        let s = Scale::band(cats, (0.0, 200.0), 0.1);
        let ticks = s.ticks(0, 40.0);
        assert_eq!(ticks.len(), 5);
        assert_eq!(ticks[1].1, "4");
    }
}
