use tofimg::{
    bridge::{Audit, AuditOption},
    prelude::*,
};
use tofimg_core::config::{SequentialRegisterHeader, TimedRegister, UseCaseData};
use tofimg_driver::imager::flash::registers::CFGCNT;
use tofimg_emulator::{M2453Chip, MTCU_START};

const GUID: &str = "{2E5C3F10-A14B-4D1E-9B0C-712233445566}";
const UNKNOWN_GUID: &str = "{7F1A0B2C-3D4E-4F50-8162-738495A6B7C8}";
const FLASH_BLOCK: u32 = 0x100;

fn flash() -> Vec<u8> {
    let mut flash = vec![0xFF; FLASH_BLOCK as usize];
    (0..16u16).for_each(|i| flash.extend((0x2000 + i).to_be_bytes()));
    flash
}

fn external_config() -> anyhow::Result<ExternalConfig> {
    Ok(ExternalConfig {
        start_map: vec![TimedRegister::new(MTCU_START, 0x0001)],
        stop_map: vec![TimedRegister::new(MTCU_START, 0x0000)],
        use_cases: vec![UseCaseData::with_flash_block(
            GUID.parse()?,
            "MODE_9_5FPS",
            vec![9],
            vec![60_000_000; 4],
            SequentialRegisterHeader::new(FLASH_BLOCK, 32, CFGCNT),
        )],
        ..Default::default()
    })
}

fn use_case(guid: &str) -> anyhow::Result<UseCaseDefinition> {
    Ok(FourPhase::new(5, 60 * MHz, (50, 1000), 1000, 0)
        .build()?
        .with_identifier(guid.parse()?))
}

fn config() -> anyhow::Result<CoreConfig> {
    Ok(CoreConfigFactory::new("flash")
        .with_use_case("MODE_9_5FPS", use_case(GUID)?)
        .with_use_case("UNKNOWN", use_case(UNKNOWN_GUID)?)
        .build()?)
}

fn audit(storage: Option<Vec<u8>>) -> Audit<M2453Chip> {
    Audit::m2453(
        flash(),
        AuditOption {
            storage,
            ..Default::default()
        },
    )
}

#[test]
fn configuration_from_storage() -> anyhow::Result<()> {
    let mut cnt = Controller::builder(config()?).open_m2453(
        audit(Some(external_config()?.to_vec()?)),
        ImagerParameters::new(24_000_000),
    )?;
    assert_eq!(external_config()?, *cnt.imager().config());

    cnt.set_use_case("MODE_9_5FPS")?;
    assert_eq!(1, cnt.imager().bridge().chip().transfers());
    assert_eq!(0x2000, cnt.imager().bridge().register(CFGCNT));
    assert_eq!(0x200F, cnt.imager().bridge().register(CFGCNT + 15));
    assert_eq!(vec![9], cnt.measurement_block_sizes()?);

    cnt.start_capture()?;
    assert!(cnt.imager().bridge().is_capturing());
    cnt.close()?;
    assert!(!cnt.imager().bridge().is_capturing());
    Ok(())
}

#[test]
fn configuration_from_parameters() -> anyhow::Result<()> {
    let mut cnt = Controller::builder(config()?).open_m2453(
        audit(None),
        ImagerParameters::new(24_000_000).with_external_config(external_config()?),
    )?;
    cnt.set_use_case("MODE_9_5FPS")?;
    assert_eq!(Some("MODE_9_5FPS"), cnt.current_use_case());
    Ok(())
}

#[test]
fn missing_configuration() -> anyhow::Result<()> {
    assert!(matches!(
        Controller::builder(config()?).open_m2453(audit(None), ImagerParameters::new(24_000_000)),
        Err(CameraError::ExternalConfigMissing)
    ));
    Ok(())
}

#[test]
fn unknown_identifier() -> anyhow::Result<()> {
    let mut cnt = Controller::builder(config()?).open_m2453(
        audit(None),
        ImagerParameters::new(24_000_000).with_external_config(external_config()?),
    )?;
    assert_eq!(
        Err(CameraError::VerificationFailed(
            VerificationStatus::UseCaseIdentifier
        )),
        cnt.set_use_case("UNKNOWN")
    );
    Ok(())
}
