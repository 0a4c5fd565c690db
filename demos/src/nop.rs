mod tests;

use anyhow::Result;

use tofimg::prelude::*;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let config = CoreConfigFactory::new("nop")
        .with_use_case(
            "MODE_9_5FPS",
            FourPhase::new(5, 30 * MHz, (50, 1000), 1000, 200)
                .with_gray_illumination(ExposureGray::Off)
                .build()?,
        )
        .with_use_case(
            "MODE_9_10FPS",
            FourPhase::new(10, 30 * MHz, (50, 1000), 500, 100)
                .with_gray_illumination(ExposureGray::Off)
                .build()?,
        )
        .build()?;

    let cnt = Controller::builder(config)
        .open_m2450_a12(Nop::new(), ImagerParameters::new(26_000_000))?;

    tests::run(cnt)
}
