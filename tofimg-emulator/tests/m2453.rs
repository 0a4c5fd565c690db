use std::time::Duration;

use tofimg_core::{
    bridge::{Bridge, NonVolatileStorage},
    config::{ExternalConfig, SequentialRegisterHeader, TimedRegister, UseCaseData},
    error::ToFError,
    usecase::{UseCaseDefinition, UseCaseIdentifier, VerificationStatus},
};
use tofimg_driver::{
    imager::{
        flash::{registers::*, ImagerM2453},
        ImagerComponent, ImagerState,
    },
    ImagerParameters,
};
use tofimg_emulator::{ImagerEmulator, M2453Chip, MTCU_START};

type Imager = ImagerM2453<ImagerEmulator<M2453Chip>>;

const FLASH_GUID: &str = "{2E5C3F10-A14B-4D1E-9B0C-712233445566}";
const MAP_GUID: &str = "{3D3E7A4B-CE65-4A5E-96D1-5F0B8E3A1C2D}";
const BROKEN_GUID: &str = "{9A0B1C2D-3E4F-4051-8263-748596A7B8C9}";

const FLASH_BLOCK: u32 = 0x2000;
const FLASH_REGISTERS: u16 = 300;

fn guid(s: &str) -> anyhow::Result<UseCaseIdentifier> {
    Ok(s.parse()?)
}

fn flash() -> Vec<u8> {
    let mut flash = vec![0xFF; FLASH_BLOCK as usize];
    (0..FLASH_REGISTERS).for_each(|i| flash.extend((0x1000 + i).to_be_bytes()));
    flash
}

fn config() -> anyhow::Result<ExternalConfig> {
    let mut flash_use_case = UseCaseData::with_flash_block(
        guid(FLASH_GUID)?,
        "MODE_9_5FPS",
        vec![9],
        vec![60_000_000; 4],
        SequentialRegisterHeader::new(FLASH_BLOCK, 2 * FLASH_REGISTERS as u32, CFGCNT),
    );
    flash_use_case.wait_time = 1_000_000;
    Ok(ExternalConfig {
        initialization_map: vec![TimedRegister::new(0xA000, 0x0001).with_sleep(100)],
        firmware_page1: vec![TimedRegister::new(0x8400, 0x1234)],
        firmware_page2: vec![],
        firmware_start_map: vec![TimedRegister::new(0x8429, 0x0001)],
        start_map: vec![TimedRegister::new(MTCU_START, 0x0001)],
        stop_map: vec![TimedRegister::new(MTCU_START, 0x0000)],
        use_cases: vec![
            flash_use_case,
            UseCaseData::with_register_map(
                guid(MAP_GUID)?,
                "MODE_5_10FPS",
                vec![5],
                vec![30_000_000; 4],
                vec![TimedRegister::new(0x9010, 0x0100)],
            ),
            UseCaseData::with_flash_block(
                guid(BROKEN_GUID)?,
                "BROKEN",
                vec![1],
                vec![0],
                SequentialRegisterHeader::new(0x10_0000, 2, CFGCNT),
            ),
        ],
    })
}

fn use_case(s: &str) -> anyhow::Result<UseCaseDefinition> {
    Ok(UseCaseDefinition::new("flash", 5).with_identifier(guid(s)?))
}

fn ready(chip: M2453Chip) -> anyhow::Result<Imager> {
    let mut imager = ImagerM2453::new(
        ImagerEmulator::new(chip),
        &ImagerParameters::new(24_000_000).with_external_config(config()?),
    )?;
    imager.sleep()?;
    imager.wake()?;
    imager.initialize()?;
    Ok(imager)
}

#[test]
fn configuration_from_storage() -> anyhow::Result<()> {
    let mut emulator = ImagerEmulator::m2453(flash()).with_storage(config()?.to_vec()?);
    let blob = emulator
        .storage()
        .ok_or(anyhow::anyhow!("no storage"))?
        .read_storage()?;
    let params = ImagerParameters::new(24_000_000).with_external_config(ExternalConfig::from_slice(&blob)?);

    let mut imager = ImagerM2453::new(emulator, &params)?;
    assert_eq!(config()?, *imager.config());
    imager.sleep()?;
    imager.wake()?;
    imager.initialize()?;
    assert_eq!(0x0001, imager.bridge().register(0xA000));
    assert_eq!(0x1234, imager.bridge().register(0x8400));
    assert_eq!(0x0001, imager.bridge().register(0x8429));
    Ok(())
}

#[test]
fn execute_from_flash() -> anyhow::Result<()> {
    let mut imager = ready(M2453Chip::new(flash()))?;
    assert_eq!(0, imager.reconfigure(&use_case(FLASH_GUID)?)?);
    assert_eq!(3, imager.bridge().chip().transfers());
    let expected = (0..FLASH_REGISTERS).map(|i| 0x1000 + i).collect::<Vec<_>>();
    assert_eq!(
        expected.as_slice(),
        imager.bridge().registers(CFGCNT, FLASH_REGISTERS as usize)
    );
    assert_eq!(0, imager.bridge().register(CFGCNT + FLASH_REGISTERS));
    assert_eq!(vec![9], imager.measurement_block_sizes()?);
    Ok(())
}

#[test]
fn execute_register_map() -> anyhow::Result<()> {
    let mut imager = ready(M2453Chip::new(flash()))?;
    imager.reconfigure(&use_case(MAP_GUID)?)?;
    assert_eq!(0x0100, imager.bridge().register(0x9010));
    assert_eq!(0, imager.bridge().chip().transfers());
    assert_eq!(vec![5], imager.measurement_block_sizes()?);
    Ok(())
}

#[test]
fn flash_read_outside_of_flash_times_out() -> anyhow::Result<()> {
    let mut imager = ready(M2453Chip::new(flash()))?;
    assert_eq!(
        VerificationStatus::Success,
        imager.verify_use_case(&use_case(BROKEN_GUID)?)
    );
    assert!(matches!(
        imager.reconfigure(&use_case(BROKEN_GUID)?),
        Err(ToFError::Timeout(_))
    ));
    assert!(imager.measurement_block_sizes().is_err());
    Ok(())
}

#[test]
fn capture_and_change_exposure() -> anyhow::Result<()> {
    let mut imager = ready(M2453Chip::new(flash()))?;
    imager.reconfigure(&use_case(FLASH_GUID)?)?;
    imager.start_capture()?;
    assert_eq!(ImagerState::Capturing, imager.state());
    assert!(imager.bridge().is_capturing());

    assert_eq!(0, imager.reconfigure_exposure_times(&[100, 100, 200, 200])?);
    assert_eq!(6000, imager.bridge().register(CFGCNT_S00_EXPOTIME));
    assert_eq!(6000, imager.bridge().register(CFGCNT_S01_EXPOTIME));
    assert_eq!(12000, imager.bridge().register(CFGCNT_S00_EXPOTIME + 4));
    assert_eq!(0, imager.bridge().register(CFGCNT_FLAGS));
    assert_eq!(1, imager.reconfigure_exposure_times(&[100, 100, 100, 100])?);

    assert_eq!(0, imager.stop_capture()?);
    assert!(!imager.bridge().is_capturing());
    Ok(())
}

#[test]
fn pending_config_change() -> anyhow::Result<()> {
    let mut imager = ready(M2453Chip::new(flash()))?;
    imager.reconfigure(&use_case(FLASH_GUID)?)?;
    imager.start_capture()?;
    imager.bridge_mut().chip_mut().set_config_stalled(true);

    assert_eq!(0, imager.reconfigure_exposure_times(&[100; 4])?);
    assert_eq!(
        Err(ToFError::runtime(
            "Can't update exposure times while config change is still pending"
        )),
        imager.reconfigure_exposure_times(&[200; 4])
    );

    imager.bridge_mut().chip_mut().set_config_stalled(false);
    imager.bridge_mut().advance_frames(1);
    assert_eq!(1, imager.reconfigure_exposure_times(&[200; 4])?);
    Ok(())
}

#[test]
fn restart_waits_for_use_case() -> anyhow::Result<()> {
    let mut imager = ready(M2453Chip::new(flash()))?;
    imager.reconfigure(&use_case(FLASH_GUID)?)?;
    imager.start_capture()?;
    imager.stop_capture()?;

    let before = imager.bridge().elapsed();
    imager.start_capture()?;
    assert!(Duration::from_millis(900) <= imager.bridge().elapsed() - before);
    Ok(())
}

#[test]
fn wrong_design_step() -> anyhow::Result<()> {
    let mut imager = ImagerM2453::new(
        ImagerEmulator::new(M2453Chip::new(vec![]).with_design_step(0x0A12)),
        &ImagerParameters::new(24_000_000).with_external_config(config()?),
    )?;
    imager.sleep()?;
    imager.wake()?;
    assert_eq!(
        Err(ToFError::runtime("wrong design step")),
        imager.initialize()
    );
    Ok(())
}

#[test]
fn serial_number() -> anyhow::Result<()> {
    let mut imager = ready(M2453Chip::new(vec![]).with_serial([0xA001, 0xB002, 0xC003, 0xD004]))?;
    assert_eq!("A001-B002-C003-D004", imager.serial_number()?);
    Ok(())
}
