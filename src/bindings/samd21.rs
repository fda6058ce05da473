//! # SAMD21 Bindings
//!
//! SERCOM-based serial peripherals. A SERCOM can back a single peripheral
//! only, so its references are exclusive.

use super::schema::{BindingSchema, Record};
use super::{nvic, pin_cell, record, render_pin};
use crate::error::{CompileError, Result};
use crate::model::Peripheral;
use serde_json::Value;

pub fn schemas() -> Vec<BindingSchema> {
    vec![
        nvic::schema(),
        BindingSchema::peripheral("Sercom")
            .string("device")
            .unique_cells()
            .build(),
        BindingSchema::peripheral("Gpio")
            .string("label")
            .cells(&["num", "flags"])
            .build(),
        BindingSchema::pinctrl("UsartPinctrl")
            .pin("tx", "gpio")
            .pin("rx", "gpio")
            .render(render_usart_pinctrl)
            .build(),
        BindingSchema::peripheral("Usart")
            .phandle("sercom", "sercom")
            .string("clk")
            .pinctrl("pinctrl", "usartpinctrl")
            .status()
            .number("flags")
            .render(render_usart)
            .build(),
        BindingSchema::pinctrl("SpiPinctrl")
            .pin("miso", "gpio")
            .pin("mosi", "gpio")
            .pin("sck", "gpio")
            .render(render_spi_pinctrl)
            .build(),
        BindingSchema::peripheral("Spi")
            .phandle("sercom", "sercom")
            .pinctrl("pinctrl", "spipinctrl")
            .status()
            .render(render_spi)
            .build(),
        BindingSchema::pinctrl("I2CPinctrl")
            .pin("sda", "gpio")
            .pin("scl", "gpio")
            .render(render_i2c_pinctrl)
            .build(),
        BindingSchema::peripheral("I2C")
            .phandle("sercom", "sercom")
            .status()
            .string("speed")
            .string("clk")
            .pinctrl("pinctrl", "i2cpinctrl")
            .render(render_i2c)
            .build(),
    ]
}

fn render_usart_pinctrl(p: &Peripheral<'_>) -> Result<Record> {
    let this = Some(*p);
    Ok(record([
        ("tx_pin", render_pin(p.store(), p.reference("tx")?)?),
        ("tx_pad", pin_cell(this, "tx", "flags")?),
        ("rx_pin", render_pin(p.store(), p.reference("rx")?)?),
        ("rx_pad", pin_cell(this, "rx", "flags")?),
    ]))
}

fn render_spi_pinctrl(p: &Peripheral<'_>) -> Result<Record> {
    let this = Some(*p);
    Ok(record([
        ("miso_pin", render_pin(p.store(), p.reference("miso")?)?),
        ("mosi_pin", render_pin(p.store(), p.reference("mosi")?)?),
        ("clk_pin", render_pin(p.store(), p.reference("sck")?)?),
        ("miso_pad", pin_cell(this, "miso", "flags")?),
        ("mosi_pad", pin_cell(this, "mosi", "flags")?),
    ]))
}

fn render_i2c_pinctrl(p: &Peripheral<'_>) -> Result<Record> {
    Ok(record([
        ("scl_pin", render_pin(p.store(), p.reference("scl")?)?),
        ("sda_pin", render_pin(p.store(), p.reference("sda")?)?),
        ("mux", pin_cell(Some(*p), "scl", "flags")?),
    ]))
}

fn render_usart(p: &Peripheral<'_>) -> Result<Record> {
    let mut rec = record([
        ("dev", sercom_device(p, "USART")?),
        ("gclk_src", p.value("clk")?),
        ("flags", p.value("flags")?),
    ]);
    rec.extend(render_pinctrl(p)?);
    Ok(rec)
}

fn render_spi(p: &Peripheral<'_>) -> Result<Record> {
    let mut rec = record([("dev", sercom_device(p, "SPI")?)]);
    rec.extend(render_pinctrl(p)?);
    Ok(rec)
}

fn render_i2c(p: &Peripheral<'_>) -> Result<Record> {
    let mut rec = record([
        ("dev", sercom_device(p, "I2CM")?),
        ("speed", p.value("speed")?),
        ("clk", p.value("clk")?),
    ]);
    rec.extend(render_pinctrl(p)?);
    Ok(rec)
}

/// `&SERCOMn->MODE` register block expression
fn sercom_device(p: &Peripheral<'_>, mode: &str) -> Result<Value> {
    let Some(sercom) = p.target("sercom")? else {
        return Ok(Value::Null);
    };
    let device = sercom.string("device")?.ok_or_else(|| CompileError::MissingAttribute {
        field: "device".to_string(),
        path: sercom.instance().path().to_string(),
    })?;
    Ok(Value::from(format!("&{}->{}", device, mode)))
}

/// Delegate to the pin-control binding's own render
fn render_pinctrl(p: &Peripheral<'_>) -> Result<Record> {
    match p.target("pinctrl")? {
        Some(pinctrl) => match pinctrl.instance().schema().render_fn() {
            Some(render) => render(&pinctrl),
            None => Ok(Record::new()),
        },
        None => Ok(Record::new()),
    }
}
