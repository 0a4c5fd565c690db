use std::io::{self, Write};

use tofimg::prelude::*;

use super::{capture::*, exposure::*, registers::*};

pub fn run<I: ImagerComponent>(mut cnt: Controller<I>) -> anyhow::Result<()> {
    type Test<I> = (&'static str, fn(&'_ mut Controller<I>) -> anyhow::Result<()>);

    println!("======== {} ========", cnt.core_config().camera_name());
    println!("Serial number: {}", cnt.serial_number()?);
    cnt.use_case_names().for_each(|name| println!("Use case: {name}"));
    println!("============================================");

    let examples: Vec<Test<_>> = vec![
        ("Capture test", |cnt| capture(cnt)),
        ("Use case switch test", |cnt| switch_use_case(cnt)),
        ("Exposure time test", |cnt| exposure_times(cnt)),
        ("Frame rate test", |cnt| frame_rate(cnt)),
        ("Register dump", |cnt| registers(cnt)),
    ];

    loop {
        examples.iter().enumerate().for_each(|(i, (name, _))| {
            println!("[{i}]: {name}");
        });
        println!("[Others]: Finish");
        print!("Choose number: ");
        io::stdout().flush()?;

        let mut s = String::new();
        io::stdin().read_line(&mut s)?;
        match s.trim().parse::<usize>() {
            Ok(i) if i < examples.len() => {
                if let Err(e) = (examples[i].1)(&mut cnt) {
                    println!("{} failed: {e}", examples[i].0);
                }
            }
            _ => break,
        }

        if cnt.is_capturing() {
            cnt.stop_capture()?;
        }
    }

    cnt.close()?;

    Ok(())
}
