use anyhow::Result;
use colored::Colorize;
use theme_overlay::DisplayMetrics;
use theme_overlay::dimension::{
    COMPLEX_UNIT_DIP, COMPLEX_UNIT_IN, COMPLEX_UNIT_MM, COMPLEX_UNIT_PT, COMPLEX_UNIT_PX,
    COMPLEX_UNIT_SP, complex_to_dimension, complex_to_dimension_pixel_size, complex_to_float,
    complex_unit, parse_dimension,
};

fn unit_name(unit: u32) -> &'static str {
    match unit {
        COMPLEX_UNIT_PX => "px",
        COMPLEX_UNIT_DIP => "dp",
        COMPLEX_UNIT_SP => "sp",
        COMPLEX_UNIT_PT => "pt",
        COMPLEX_UNIT_IN => "in",
        COMPLEX_UNIT_MM => "mm",
        _ => "?",
    }
}

pub(crate) fn command_dimen(values: &[String], density: u16) -> Result<()> {
    let metrics = DisplayMetrics::new(density);

    for value in values {
        let packed = parse_dimension(value);

        println!(
            "{} = {} ({}{}, {}px at {}dpi, {}px rounded)",
            value.cyan(),
            format!("0x{:08x}", packed).green(),
            complex_to_float(packed),
            unit_name(complex_unit(packed)),
            complex_to_dimension(packed, &metrics),
            density,
            complex_to_dimension_pixel_size(packed, &metrics)
        );
    }

    Ok(())
}
