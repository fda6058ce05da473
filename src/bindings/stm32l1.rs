//! # STM32L1 Bindings
//!
//! DMA, RCC, GPIO and the serial/analog peripherals of the STM32L1 family.

use super::schema::{BindingSchema, FieldDecl, Record};
use super::{nvic, pin_cell, pin_role, record, render_pin};
use crate::error::Result;
use crate::model::Peripheral;

/// Every STM32L1 binding, targets first
pub fn schemas() -> Vec<BindingSchema> {
    vec![
        nvic::schema(),
        // DMA controller; references pass the channel and request numbers
        BindingSchema::peripheral("Dma")
            .string("device")
            .cells(&["channel", "request"])
            .build(),
        // Reset and clock control; references pass the bus and enable bits
        BindingSchema::peripheral("Rcc")
            .cells(&["bus", "bits"])
            .build(),
        // GPIO port; references pass the pin number and alternate function
        BindingSchema::peripheral("Gpio")
            .string("label")
            .cells(&["num", "flags"])
            .build(),
        BindingSchema::pinctrl("AdcPinctrl").pin("pin", "gpio").build(),
        BindingSchema::peripheral("AdcChannel")
            .node_name("adc-ch")
            .status()
            .number("channel")
            .pinctrl("pinctrl", "adcpinctrl")
            .render(render_adc_channel)
            .build(),
        BindingSchema::peripheral("Adc")
            .string("device")
            .phandle("dma", "dma")
            .build(),
        BindingSchema::pinctrl("UsartPinctrl")
            .pin("tx", "gpio")
            .pin("rx", "gpio")
            .build(),
        BindingSchema::peripheral("Usart")
            .string("device")
            .phandle("rcc", "rcc")
            .phandle("interrupts", "interrupt-controller")
            .string("isr")
            .status()
            .phandle("tx_dma", "dma")
            .phandle("rx_dma", "dma")
            .pinctrl("pinctrl", "usartpinctrl")
            .render(render_usart)
            .build(),
        BindingSchema::pinctrl("SpiPinctrl")
            .pin("miso", "gpio")
            .pin("mosi", "gpio")
            .pin("sck", "gpio")
            .field(FieldDecl::phandle("cs", "gpio").optional())
            .build(),
        BindingSchema::peripheral("Spi")
            .string("device")
            .phandle("rcc", "rcc")
            .phandle("interrupts", "interrupt-controller")
            .status()
            .phandle("tx_dma", "dma")
            .phandle("rx_dma", "dma")
            .pinctrl("pinctrl", "spipinctrl")
            .render(render_spi)
            .build(),
        BindingSchema::pinctrl("I2CPinctrl")
            .pin("sda", "gpio")
            .pin("scl", "gpio")
            .build(),
        BindingSchema::peripheral("I2C")
            .string("device")
            .phandle("rcc", "rcc")
            .phandle("interrupts", "interrupt-controller")
            .string("isr")
            .status()
            .phandle("tx_dma", "dma")
            .phandle("rx_dma", "dma")
            .field(FieldDecl::string("speed").optional())
            .field(FieldDecl::string("clk").optional())
            .pinctrl("pinctrl", "i2cpinctrl")
            .render(render_i2c)
            .build(),
    ]
}

fn render_adc_channel(p: &Peripheral<'_>) -> Result<Record> {
    let pinctrl = p.target("pinctrl")?;
    Ok(record([
        ("chan", p.value("channel")?),
        ("pin", render_pin(p.store(), pin_role(pinctrl, "pin")?)?),
    ]))
}

fn render_usart(p: &Peripheral<'_>) -> Result<Record> {
    let pinctrl = p.target("pinctrl")?;
    let mut rec = record([
        ("dev", p.value("device")?),
        ("bus", p.cell("rcc", "bus")?),
        ("rcc_mask", p.cell("rcc", "bits")?),
    ]);
    rec.extend(dma_fields(p)?);
    rec.extend(record([
        ("tx_pin", render_pin(p.store(), pin_role(pinctrl, "tx")?)?),
        ("rx_pin", render_pin(p.store(), pin_role(pinctrl, "rx")?)?),
        ("tx_af", pin_cell(pinctrl, "tx", "flags")?),
        ("rx_af", pin_cell(pinctrl, "rx", "flags")?),
    ]));
    Ok(rec)
}

fn render_spi(p: &Peripheral<'_>) -> Result<Record> {
    let pinctrl = p.target("pinctrl")?;
    let mut rec = record([
        ("dev", p.value("device")?),
        ("rccmask", p.cell("rcc", "bits")?),
        ("apbbus", p.cell("rcc", "bus")?),
    ]);
    rec.extend(dma_fields(p)?);
    rec.extend(record([
        ("mosi_pin", render_pin(p.store(), pin_role(pinctrl, "mosi")?)?),
        ("miso_pin", render_pin(p.store(), pin_role(pinctrl, "miso")?)?),
        ("sck_pin", render_pin(p.store(), pin_role(pinctrl, "sck")?)?),
        ("cs_pin", render_pin(p.store(), pin_role(pinctrl, "cs")?)?),
        ("af", pin_cell(pinctrl, "mosi", "flags")?),
    ]));
    Ok(rec)
}

fn render_i2c(p: &Peripheral<'_>) -> Result<Record> {
    let pinctrl = p.target("pinctrl")?;
    let mut rec = record([
        ("dev", p.value("device")?),
        ("speed", p.value("speed")?),
        ("rcc_mask", p.cell("rcc", "bits")?),
        ("bus", p.cell("rcc", "bus")?),
        ("irqn", p.cell("interrupts", "line")?),
        ("clk", p.value("clk")?),
    ]);
    rec.extend(dma_fields(p)?);
    rec.extend(record([
        ("scl_pin", render_pin(p.store(), pin_role(pinctrl, "scl")?)?),
        ("scl_af", pin_cell(pinctrl, "scl", "flags")?),
        ("sda_pin", render_pin(p.store(), pin_role(pinctrl, "sda")?)?),
        ("sda_af", pin_cell(pinctrl, "sda", "flags")?),
    ]));
    Ok(rec)
}

fn dma_fields(p: &Peripheral<'_>) -> Result<Record> {
    Ok(record([
        ("tx_dma_request", p.cell("tx_dma", "request")?),
        ("tx_dma_channel", p.cell("tx_dma", "channel")?),
        ("rx_dma_request", p.cell("rx_dma", "request")?),
        ("rx_dma_channel", p.cell("rx_dma", "channel")?),
    ]))
}
