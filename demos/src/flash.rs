mod tests;

use anyhow::Result;

use tofimg::prelude::*;
use tofimg_core::config::{SequentialRegisterHeader, TimedRegister, UseCaseData};
use tofimg_driver::imager::flash::registers::CFGCNT;
use tofimg_emulator::{ImagerEmulator, MTCU_START};

const GUID: &str = "{2E5C3F10-A14B-4D1E-9B0C-712233445566}";
const FLASH_BLOCK: u32 = 0x1000;
const REGISTERS: u16 = 64;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let mut flash = vec![0xFF; FLASH_BLOCK as usize];
    (0..REGISTERS).for_each(|i| flash.extend((0x1000 + i).to_be_bytes()));

    let external = ExternalConfig {
        start_map: vec![TimedRegister::new(MTCU_START, 0x0001)],
        stop_map: vec![TimedRegister::new(MTCU_START, 0x0000)],
        use_cases: vec![UseCaseData::with_flash_block(
            GUID.parse()?,
            "MODE_9_5FPS",
            vec![9],
            vec![60_000_000; 4],
            SequentialRegisterHeader::new(FLASH_BLOCK, 2 * REGISTERS as u32, CFGCNT),
        )],
        ..Default::default()
    };
    let bridge = ImagerEmulator::m2453(flash).with_storage(external.to_vec()?);

    let config = CoreConfigFactory::new("flash")
        .with_use_case(
            "MODE_9_5FPS",
            FourPhase::new(5, 60 * MHz, (50, 1000), 1000, 0)
                .build()?
                .with_identifier(GUID.parse()?),
        )
        .build()?;

    let cnt = Controller::builder(config).open_m2453(bridge, ImagerParameters::new(24_000_000))?;

    tests::run(cnt)
}
