use tofimg::prelude::*;

pub fn exposure_times<I: ImagerComponent>(cnt: &mut Controller<I>) -> anyhow::Result<()> {
    if cnt.current_use_case().is_none() {
        let name = cnt.use_case_names().next().map(str::to_string);
        cnt.set_use_case(&name.ok_or_else(|| anyhow::anyhow!("no use case configured"))?)?;
    }
    cnt.start_capture()?;

    [[500, 100], [1000, 200]].iter().try_for_each(|exposure| -> anyhow::Result<()> {
        let frame = cnt.set_exposure_times(exposure)?;
        println!("Exposure times {exposure:?} us from frame {frame}");
        Ok(())
    })
}

pub fn frame_rate<I: ImagerComponent>(cnt: &mut Controller<I>) -> anyhow::Result<()> {
    if cnt.current_use_case().is_none() {
        let name = cnt.use_case_names().next().map(str::to_string);
        cnt.set_use_case(&name.ok_or_else(|| anyhow::anyhow!("no use case configured"))?)?;
    }
    cnt.start_capture()?;

    let frame = cnt.set_frame_rate(2)?;
    println!("2 fps from frame {frame}");

    Ok(())
}
