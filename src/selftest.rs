use color_eyre::eyre::{self, Result};
use std::time::Duration;
use tracing as log;

use ptz_core::{Interpreter, Outcome, Transport};

/// Exercise zoom, power and pan/tilt of a freshly opened camera.
const SEQUENCE: &[&str] = &[
    "info",
    "set_zoom_value 0",
    "set_zoom_value 16384",
    "set_zoom_value 4660",
    "get_zoom_value",
    "set_zoom_value 0",
    "get_power",
    "set_pantilt_reset",
    "set_pantilt_absolute_position 5 5 -500 -200",
    "get_pantilt_position",
    "set_pantilt_absolute_position 18 14 500 200",
    "get_pantilt_position",
    "set_pantilt_home",
    "set_zoom_value 3328",
    "set_shutter_value 13",
];

/// Open `device`, run the test sequence and close again.
///
/// Returns the number of commands which did not succeed.
pub(crate) async fn run<T: Transport>(
    interp: &mut Interpreter<T>,
    device: &str,
    startup_wait: Duration,
) -> Result<usize> {
    match interp.execute(&format!("open {device}")).await {
        Outcome::Opened(info) => {
            log::info!("Some camera info: {info}");
        }
        other => eyre::bail!("could not open {device}: {other}"),
    }
    tokio::time::sleep(startup_wait).await;

    let mut failures = 0;
    for line in SEQUENCE {
        let outcome = interp.execute(line).await;
        match &outcome {
            Outcome::Code(code) if code.is_success() => log::info!("{line}: {outcome}"),
            _ => {
                log::error!("{line}: {outcome}");
                failures += 1;
            }
        }
        println!("{line}: {outcome}");
    }

    let outcome = interp.execute("close").await;
    println!("{outcome}");
    if !matches!(outcome, Outcome::Closed(_)) {
        failures += 1;
    }
    Ok(failures)
}
