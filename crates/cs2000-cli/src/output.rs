//! Result printing (plain text or JSON on stdout)

use cs2000_core::instrument::{ChromaticityLuminance, InitReport, Luminance};
use cs2000_core::protocol::PortInfo;
use serde::Serialize;

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn ports(ports: &[PortInfo], json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(ports);
    }
    println!("Port List:");
    if ports.is_empty() {
        println!("(no serial ports found)");
    }
    for port in ports {
        println!(
            "{}\t{}\t:\t{}",
            port.name,
            port.description(),
            port.manufacturer_or_na()
        );
    }
    Ok(())
}

pub fn init_report(report: &InitReport, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(report);
    }
    for outcome in &report.steps {
        match &outcome.error {
            None => println!("{:<20}:\tOK", outcome.step),
            Some(err) => println!("{:<20}:\tERROR ({err})", outcome.step),
        }
    }
    if let Some(sync) = &report.sync {
        println!("{:<20}:\t{sync}", "sync mode");
    }
    Ok(())
}

pub fn luminance(lv: &Luminance, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(lv);
    }
    println!("Lv\t:\t{} cd/m²", lv.lv);
    Ok(())
}

pub fn chromaticity(reading: &ChromaticityLuminance, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(reading);
    }
    println!("x\t:\t{}", reading.x);
    println!("y\t:\t{}", reading.y);
    println!("Lv\t:\t{} cd/m²", reading.lv);
    Ok(())
}
