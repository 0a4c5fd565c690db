use std::time::Duration;

use tofimg_core::{
    common::MHz,
    error::ToFError,
    pseudodata::is_greater_frame,
    usecase::{
        builder::{FourPhase, UseCaseBuilder},
        ExposureGray, UseCaseDefinition,
    },
};
use tofimg_driver::{
    imager::{
        m2450_a12::{registers::*, ImagerM2450A12},
        ImagerComponent, ImagerState,
    },
    ImagerDirectAccess, ImagerParameters,
};
use tofimg_emulator::{ImagerEmulator, M2450A12Chip};

type Imager = ImagerM2450A12<ImagerEmulator<M2450A12Chip>>;

fn four_phase(frequency: u32, exposure: u32, gray: u32) -> anyhow::Result<UseCaseDefinition> {
    Ok(
        FourPhase::new(5, frequency * MHz, (50, 1000), exposure, gray)
            .with_gray_illumination(ExposureGray::Off)
            .build()?,
    )
}

fn imager(chip: M2450A12Chip) -> anyhow::Result<Imager> {
    Ok(ImagerM2450A12::new(
        ImagerEmulator::new(chip),
        ImagerParameters::new(26_000_000),
    )?)
}

fn ready(chip: M2450A12Chip) -> anyhow::Result<Imager> {
    let mut imager = imager(chip)?;
    imager.sleep()?;
    imager.wake()?;
    imager.initialize()?;
    Ok(imager)
}

fn capturing(chip: M2450A12Chip) -> anyhow::Result<Imager> {
    let mut imager = ready(chip)?;
    imager.reconfigure(&four_phase(30, 1000, 200)?)?;
    imager.start_capture()?;
    Ok(imager)
}

#[test]
fn lifecycle() -> anyhow::Result<()> {
    let mut imager = imager(M2450A12Chip::new())?;
    assert!(imager.bridge().is_in_reset());
    imager.sleep()?;
    imager.wake()?;
    assert!(!imager.bridge().is_in_reset());
    imager.initialize()?;
    assert_eq!(ImagerState::Ready, imager.state());

    assert_eq!(0, imager.reconfigure(&four_phase(30, 1000, 200)?)?);
    imager.start_capture()?;
    assert_eq!(ImagerState::Capturing, imager.state());
    assert!(imager.bridge().is_capturing());
    imager.bridge_mut().advance_frames(10);

    assert_eq!(0, imager.stop_capture()?);
    assert_eq!(ImagerState::Ready, imager.state());
    assert!(!imager.bridge().is_capturing());

    imager.start_capture()?;
    assert!(imager.bridge().is_capturing());
    imager.stop_capture()?;

    imager.sleep()?;
    assert!(imager.bridge().is_in_reset());
    assert_eq!(ImagerState::PowerDown, imager.state());
    Ok(())
}

#[test]
fn firmware_loaded_into_program_memory() -> anyhow::Result<()> {
    let imager = ready(M2450A12Chip::new())?;
    let chip = imager.bridge().chip();
    assert_eq!(Some(0x4D32), chip.program_word(1 << 6, 0xC000));
    assert_eq!(Some(0xF002), chip.program_word(1 << 6 | 1 << 5, 0xC007));
    assert_eq!(0, imager.bridge().register(ISM_MEMPAGE));
    assert_eq!(2, imager.bridge().register(AIO_MX_ENABLE));
    Ok(())
}

#[test]
fn reconfigure_while_capturing() -> anyhow::Result<()> {
    let mut imager = capturing(M2450A12Chip::new())?;
    assert_eq!(3750, imager.bridge().register(AIO_SEQ_START));

    assert_eq!(0, imager.reconfigure_exposure_times(&[500, 100])?);
    let emulator = imager.bridge();
    assert_eq!(1875, emulator.register(AIO_SEQ_START));
    assert_eq!(1875, emulator.register(AIO_SEQ_START + 12));
    assert_eq!(39, emulator.register(AIO_SEQ_START + 16));
    assert_eq!(0, emulator.register(AIO_SR_RECONFIGFLAGS));

    assert_eq!(1, imager.reconfigure_exposure_times(&[1000, 200])?);
    assert_eq!(3750, imager.bridge().register(AIO_SEQ_START));
    assert_eq!(1, imager.stop_capture()?);
    Ok(())
}

#[test]
fn reconfiguration_indices_wrap() -> anyhow::Result<()> {
    let mut imager = capturing(M2450A12Chip::new())?;
    imager.bridge_mut().set_register(AIO_SR_RECONFIG_COUNTER, 0xFFD);

    let use_cases = [four_phase(30, 500, 100)?, four_phase(30, 1000, 200)?];
    let indices = (0..6)
        .map(|i| imager.reconfigure(&use_cases[i % 2]))
        .collect::<Result<Vec<_>, _>>()?;
    assert_eq!(vec![0xFFD, 0xFFE, 0xFFF, 0x000, 0x001, 0x002], indices);
    assert!(indices
        .windows(2)
        .all(|w| is_greater_frame(w[0], w[1])));
    assert_eq!(0x002, imager.stop_capture()?);
    Ok(())
}

#[test]
fn exposure_change_survives_restart() -> anyhow::Result<()> {
    let mut imager = capturing(M2450A12Chip::new())?;
    imager.reconfigure_exposure_times(&[500, 100])?;
    imager.stop_capture()?;
    imager.start_capture()?;
    assert_eq!(1875, imager.bridge().register(AIO_SEQ_START));
    imager.stop_capture()?;

    imager.reconfigure_exposure_times(&[1000, 200])?;
    assert_eq!(3750, imager.bridge().register(AIO_SEQ_START));
    Ok(())
}

#[test]
fn reconfigure_rejects_new_sequence_length() -> anyhow::Result<()> {
    let mut imager = capturing(M2450A12Chip::new())?;
    assert_eq!(
        Err(ToFError::runtime(
            "reconfiguration failed, it is not allowed to change the sequence length"
        )),
        imager.reconfigure(&four_phase(30, 1000, 0)?)
    );
    assert_eq!(ImagerState::Capturing, imager.state());
    Ok(())
}

#[test]
fn stalled_reconfiguration() -> anyhow::Result<()> {
    let mut imager = capturing(M2450A12Chip::new())?;
    imager.bridge_mut().chip_mut().set_reconfig_stalled(true);

    assert_eq!(0, imager.reconfigure_exposure_times(&[500, 100])?);
    assert_eq!(3750, imager.bridge().register(AIO_SEQ_START));
    assert_eq!(
        Err(ToFError::runtime(
            "reconfiguration failed, firmware register transfer not successful"
        )),
        imager.reconfigure_exposure_times(&[600, 100])
    );

    imager.bridge_mut().chip_mut().set_reconfig_stalled(false);
    imager.bridge_mut().advance_frames(1);
    assert_eq!(1875, imager.bridge().register(AIO_SEQ_START));
    assert_eq!(1, imager.reconfigure_exposure_times(&[600, 100])?);
    assert_eq!(2250, imager.bridge().register(AIO_SEQ_START));
    Ok(())
}

#[test]
fn stop_with_pending_reconfiguration() -> anyhow::Result<()> {
    let mut imager = capturing(M2450A12Chip::new())?;
    imager.bridge_mut().chip_mut().set_reconfig_stalled(true);
    imager.reconfigure_exposure_times(&[500, 100])?;

    let before = imager.bridge().elapsed();
    assert_eq!(
        Err(ToFError::runtime(
            "stop failed, firmware register transfer still pending"
        )),
        imager.stop_capture()
    );
    let waited = imager.bridge().elapsed() - before;
    let safe = Duration::from_millis(imager.max_safe_reconfig_time_ms() as u64);
    assert!(3 * safe <= waited);
    assert!(!imager.bridge().is_capturing());
    Ok(())
}

#[test]
fn wrong_design_step() -> anyhow::Result<()> {
    let mut imager = imager(M2450A12Chip::new().with_design_step(0x0A11))?;
    imager.sleep()?;
    imager.wake()?;
    assert_eq!(
        Err(ToFError::runtime("wrong design step")),
        imager.initialize()
    );
    assert_eq!(ImagerState::PowerUp, imager.state());
    Ok(())
}

#[test]
fn pll_lock_error() -> anyhow::Result<()> {
    let mut imager = ready(M2450A12Chip::new().with_pll_lock_error())?;
    imager.reconfigure(&four_phase(30, 1000, 200)?)?;
    assert_eq!(
        Err(ToFError::runtime("error modpll lock")),
        imager.start_capture()
    );
    Ok(())
}

#[test]
fn register_access_in_reset_fails() -> anyhow::Result<()> {
    let mut imager = imager(M2450A12Chip::new())?;
    imager.sleep()?;
    assert!(matches!(
        imager.read_registers(&[ANAIP_DESIGNSTEP]),
        Err(ToFError::Bridge(_))
    ));
    Ok(())
}

#[test]
fn serial_number_and_direct_access() -> anyhow::Result<()> {
    let mut imager = ready(M2450A12Chip::new().with_serial([0x0A50, 0x1234, 0x5678, 0x9ABC]))?;
    assert_eq!("0A50-1234-5678-9ABC", imager.serial_number()?);

    let mut access = ImagerDirectAccess::new(&mut imager);
    access.write_registers(&[("0xA000", 0x00FF)])?;
    assert_eq!(vec![0x00FF, 0x0A12], access.read_registers(&["0xA000", "0xB0AD"])?);
    Ok(())
}
