use std::{error::Error, path::Path};

use plotters::{
    prelude::{BitMapBackend, ChartBuilder, Circle, IntoDrawingArea, PathElement},
    series::{AreaSeries, LineSeries},
    style::{Color, BLACK, BLUE, GREEN, RED, WHITE, YELLOW},
};

use crate::{
    constants::charts::CHART_DIMS,
    error::{Result, TradingError},
};

type ChartResult = std::result::Result<(), Box<dyn Error>>;

fn chart_error(err: Box<dyn Error>) -> TradingError {
    TradingError::Chart(err.to_string())
}

/// Min and max over every series, padded by 5% so lines don't touch the frame.
fn y_bounds<'a>(series: impl IntoIterator<Item = &'a [f64]>) -> (f64, f64) {
    let (min, max) = series
        .into_iter()
        .flatten()
        .filter(|value| value.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), value| {
            (min.min(*value), max.max(*value))
        });
    if !min.is_finite() {
        return (0.0, 1.0);
    }
    let range = (max - min).max(0.01);
    (min - range * 0.05, max + range * 0.05)
}

pub fn simple_chart(dir: &Path, name: &str, data: &[f64]) -> Result<()> {
    if data.is_empty() {
        return Ok(());
    }
    draw_simple_chart(dir, name, data).map_err(chart_error)
}

fn draw_simple_chart(dir: &Path, name: &str, data: &[f64]) -> ChartResult {
    let path = dir.join(format!("{name}.png"));
    let root = BitMapBackend::new(&path, CHART_DIMS).into_drawing_area();
    root.fill(&WHITE)?;

    let (y_min, y_max) = y_bounds([data]);

    let mut chart = ChartBuilder::on(&root)
        .caption(name, ("sans-serif", 20))
        .margin(5)
        .x_label_area_size(30)
        .y_label_area_size(50)
        .build_cartesian_2d(0..data.len() as u32, y_min..y_max)?;

    chart.configure_mesh().light_line_style(WHITE).draw()?;

    chart.draw_series(
        AreaSeries::new(
            data.iter()
                .enumerate()
                .map(|(index, value)| (index as u32, *value)),
            y_min,
            BLUE.mix(0.2),
        )
        .border_style(BLUE),
    )?;

    root.present()?;
    Ok(())
}

/// Portfolio value over an episode, split into cash and positioned value.
pub fn assets_chart(
    dir: &Path,
    name: &str,
    total: &[f64],
    cash: &[f64],
    positioned: Option<&[f64]>,
) -> Result<()> {
    if total.is_empty() {
        return Ok(());
    }
    draw_assets_chart(dir, name, total, cash, positioned).map_err(chart_error)
}

fn draw_assets_chart(
    dir: &Path,
    name: &str,
    total: &[f64],
    cash: &[f64],
    positioned: Option<&[f64]>,
) -> ChartResult {
    let path = dir.join(format!("{name}.png"));
    let root = BitMapBackend::new(&path, CHART_DIMS).into_drawing_area();
    root.fill(&WHITE)?;

    let (y_min, y_max) = y_bounds([total, cash].into_iter().chain(positioned));

    let mut chart = ChartBuilder::on(&root)
        .caption("Portfolio Value", ("sans-serif", 20))
        .margin(5)
        .x_label_area_size(30)
        .y_label_area_size(60)
        .build_cartesian_2d(0..total.len() as u32, y_min..y_max)?;

    chart
        .configure_mesh()
        .x_desc("Time Step")
        .y_desc("Total Portfolio Balance")
        .light_line_style(WHITE)
        .draw()?;

    let series: [(&str, Option<&[f64]>, _); 3] = [
        ("total", Some(total), GREEN),
        ("cash", Some(cash), BLUE),
        ("positioned", positioned, YELLOW),
    ];

    for (label, values, color) in series {
        let Some(values) = values else {
            continue;
        };
        chart
            .draw_series(LineSeries::new(
                values
                    .iter()
                    .enumerate()
                    .map(|(index, value)| (index as u32, *value)),
                &color,
            ))?
            .label(label)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &color));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

/// Price line with the steps where buys and sells filled.
pub fn buy_sell_chart(
    dir: &Path,
    name: &str,
    prices: &[f64],
    buys: &[usize],
    sells: &[usize],
) -> Result<()> {
    if prices.is_empty() {
        return Ok(());
    }
    draw_buy_sell_chart(dir, name, prices, buys, sells).map_err(chart_error)
}

fn draw_buy_sell_chart(
    dir: &Path,
    name: &str,
    prices: &[f64],
    buys: &[usize],
    sells: &[usize],
) -> ChartResult {
    let path = dir.join(format!("{name}.png"));
    let root = BitMapBackend::new(&path, CHART_DIMS).into_drawing_area();
    root.fill(&WHITE)?;

    let (y_min, y_max) = y_bounds([prices]);

    let mut chart = ChartBuilder::on(&root)
        .caption("Buy Sell Chart", ("sans-serif", 20))
        .margin(5)
        .x_label_area_size(30)
        .y_label_area_size(50)
        .build_cartesian_2d(0..prices.len() as u32, y_min..y_max)?;

    chart.configure_mesh().light_line_style(WHITE).draw()?;

    chart.draw_series(LineSeries::new(
        prices
            .iter()
            .enumerate()
            .map(|(index, price)| (index as u32, *price)),
        &BLACK,
    ))?;

    for (steps, color) in [(buys, GREEN), (sells, RED)] {
        chart.draw_series(
            steps
                .iter()
                .filter_map(|step| prices.get(*step).map(|price| (*step as u32, *price)))
                .map(|point| Circle::new(point, 4, color.filled())),
        )?;
    }

    root.present()?;
    Ok(())
}
