use tofimg::prelude::*;

pub fn registers<I: ImagerComponent>(cnt: &mut Controller<I>) -> anyhow::Result<()> {
    const ADDRESSES: [&str; 4] = ["0xA000", "0xA001", "0xA002", "0xA003"];

    let values = cnt.direct_access()?.read_registers(&ADDRESSES)?;
    ADDRESSES
        .iter()
        .zip(values)
        .for_each(|(addr, value)| println!("{addr}: {value:#06X}"));

    Ok(())
}
