// End-to-end compilation of STM32L1 board descriptions

use crate::bindings::{self, BindingRegistry};
use crate::codegen::{BoardPin, BoardPinmap};
use crate::compiler::{compile_board, compile_board_with_options, Board};
use crate::config::{CompileOptions, DisabledPolicy};
use crate::error::CompileError;
use crate::tree::{RawTree, SourceNode};

const NVIC: u32 = 1;
const RCC: u32 = 2;
const DMA1: u32 = 3;
const GPIOA: u32 = 4;
const GPIOB: u32 = 5;
const USART1_PINS: u32 = 10;
const SPI1_PINS: u32 = 11;
const I2C1_PINS: u32 = 12;
const USART1: u32 = 20;
const USART2: u32 = 21;
const SPI1: u32 = 22;
const I2C1: u32 = 23;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn stm32l1() -> BindingRegistry {
    bindings::for_cpu("st", "stm32l1").unwrap().unwrap()
}

fn soc() -> Vec<SourceNode> {
    vec![
        SourceNode::new("/soc/interrupt-controller@e000e100")
            .with_phandle(NVIC)
            .with_cells("#interrupt-cells", &[1]),
        SourceNode::new("/soc/rcc@40023800").with_phandle(RCC),
        SourceNode::new("/soc/dma@40026000")
            .with_phandle(DMA1)
            .with_str("device", "DMA1"),
        SourceNode::new("/soc/gpio@40020000")
            .with_phandle(GPIOA)
            .with_str("label", "A"),
        SourceNode::new("/soc/gpio@40020400")
            .with_phandle(GPIOB)
            .with_str("label", "B"),
    ]
}

fn usart(id: &str, phandle: u32, device: &str, status: &str, pinctrl: Option<u32>) -> SourceNode {
    let node = SourceNode::new(format!("/soc/usart@{}", id))
        .with_phandle(phandle)
        .with_str("device", device)
        .with_cells("rcc", &[RCC, 2, 0x4000])
        .with_cells("interrupts", &[NVIC, 37])
        .with_str("isr", "isr_usart1")
        .with_str("status", status)
        .with_cells("tx-dma", &[DMA1, 4, 0])
        .with_cells("rx-dma", &[DMA1, 5, 0]);
    match pinctrl {
        Some(pinctrl) => node.with_cells("pinctrl", &[pinctrl]),
        None => node,
    }
}

fn usart_pins(tx: (u32, u32), rx: (u32, u32)) -> SourceNode {
    SourceNode::new("/soc/usartpinctrl@0")
        .with_phandle(USART1_PINS)
        .with_cells("tx", &[tx.0, tx.1, 7])
        .with_cells("rx", &[rx.0, rx.1, 7])
}

fn spi(pinctrl: u32) -> SourceNode {
    SourceNode::new("/soc/spi@40013000")
        .with_phandle(SPI1)
        .with_str("device", "SPI1")
        .with_cells("rcc", &[RCC, 2, 0x1000])
        .with_cells("interrupts", &[NVIC, 35])
        .with_str("status", "okay")
        .with_cells("tx-dma", &[DMA1, 3, 0])
        .with_cells("rx-dma", &[DMA1, 2, 0])
        .with_cells("pinctrl", &[pinctrl])
}

fn i2c(pinctrl: u32) -> SourceNode {
    SourceNode::new("/soc/i2c@40005400")
        .with_phandle(I2C1)
        .with_str("device", "I2C1")
        .with_cells("rcc", &[RCC, 1, 0x200000])
        .with_cells("interrupts", &[NVIC, 31])
        .with_str("isr", "isr_i2c1_ev")
        .with_str("status", "okay")
        .with_cells("tx-dma", &[DMA1, 6, 0])
        .with_cells("rx-dma", &[DMA1, 7, 0])
        .with_cells("pinctrl", &[pinctrl])
}

/// Board with USART1 chosen as uart 0 and USART2 left disabled
fn usart_board(usart1_status: &str) -> RawTree {
    let mut nodes = vec![
        SourceNode::new("/chosen")
            .with_str("stdout-path", "/soc/usart@40013800")
            .with_cells("riot,uart", &[USART1]),
    ];
    nodes.extend(soc());
    nodes.push(usart_pins((GPIOA, 9), (GPIOA, 10)));
    nodes.push(usart("40013800", USART1, "USART1", usart1_status, Some(USART1_PINS)));
    nodes.push(usart("40004400", USART2, "USART2", "disabled", None));
    nodes.into_iter().collect()
}

#[cfg(test)]
mod usart_scenarios {
    use super::*;

    #[test]
    fn test_enabled_usart_is_rendered_and_pinned() {
        init_tracing();
        let board = Board::load(&usart_board("okay"), &stm32l1()).unwrap();

        let records = board.render_peripherals("usart", true).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["dev"], "USART1");
        assert_eq!(records[0]["tx_pin"], "GPIO_PIN(A,9)");
        assert_eq!(records[0]["rx_pin"], "GPIO_PIN(A,10)");
        assert_eq!(records[0]["tx_dma_channel"], 4);
        assert_eq!(records[0]["rx_dma_channel"], 5);
        assert_eq!(records[0]["rcc_mask"], 0x4000);

        let pins = board.extract_pin_assignments().unwrap();
        assert_eq!(pins.len(), 2);
        let tx = pins.get("A9").unwrap();
        assert_eq!((tx.config_group.as_str(), tx.role.as_str()), ("UART0", "tx"));
        let rx = pins.get("A10").unwrap();
        assert_eq!((rx.config_group.as_str(), rx.role.as_str()), ("UART0", "rx"));
    }

    #[test]
    fn test_disabled_chosen_usart_is_skipped() {
        init_tracing();
        let board = Board::load(&usart_board("disabled"), &stm32l1()).unwrap();

        let chosen = board.get_chosen().unwrap();
        assert_eq!(chosen.get("uart").unwrap().instances().len(), 1);

        assert!(board.extract_pin_assignments().unwrap().is_empty());
        assert!(board.render_peripherals("usart", true).unwrap().is_empty());
        assert_eq!(board.render_peripherals("usart", false).unwrap().len(), 2);

        let conf = board.render_chosen().unwrap();
        assert_eq!(conf["uart"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn test_disabled_chosen_usart_under_strict_policy() {
        let options = CompileOptions {
            disabled_chosen: DisabledPolicy::Error,
            ..CompileOptions::default()
        };
        let board =
            Board::load_with_options(&usart_board("disabled"), &stm32l1(), options).unwrap();

        match board.extract_pin_assignments() {
            Err(CompileError::DisabledChosen { group, path }) => {
                assert_eq!(group, "UART0");
                assert_eq!(path, "/soc/usart@40013800");
            }
            other => panic!("expected disabled chosen error, got {:?}", other),
        }
    }

    #[test]
    fn test_render_order_is_stable() {
        let board = Board::load(&usart_board("okay"), &stm32l1()).unwrap();
        let first = board.render_peripherals("usart", false).unwrap();
        let second = board.render_peripherals("usart", false).unwrap();

        assert_eq!(first, second);
        assert_eq!(first[0]["dev"], "USART1");
        assert_eq!(first[1]["dev"], "USART2");
    }
}

#[cfg(test)]
mod reference_scenarios {
    use super::*;

    #[test]
    fn test_spi_mosi_missing_flags_cell() {
        let mut nodes = soc();
        nodes.push(
            SourceNode::new("/soc/spipinctrl@0")
                .with_phandle(SPI1_PINS)
                .with_cells("miso", &[GPIOA, 6, 5])
                .with_cells("mosi", &[GPIOA, 7])
                .with_cells("sck", &[GPIOA, 5, 5]),
        );
        nodes.push(spi(SPI1_PINS));
        let tree: RawTree = nodes.into_iter().collect();

        match Board::load(&tree, &stm32l1()) {
            Err(CompileError::InvalidCellReference { path, field, expected, actual }) => {
                assert_eq!(path, "/soc/spipinctrl@0");
                assert_eq!(field, "mosi");
                assert!(expected.contains("[num, flags]"), "{}", expected);
                assert_eq!(actual, "1 cell argument(s)");
            }
            other => panic!("expected invalid cell reference, got {:?}", other),
        }
    }

    #[test]
    fn test_pin_role_pointing_at_dma() {
        let mut nodes = soc();
        nodes.push(usart_pins((DMA1, 9), (GPIOA, 10)));
        let tree: RawTree = nodes.into_iter().collect();

        match Board::load(&tree, &stm32l1()) {
            Err(CompileError::InvalidCellReference { field, expected, actual, .. }) => {
                assert_eq!(field, "tx");
                assert_eq!(expected, "gpio");
                assert_eq!(actual, "dma");
            }
            other => panic!("expected invalid cell reference, got {:?}", other),
        }
    }

    #[test]
    fn test_instances_reachable_by_key_and_phandle() {
        let board = Board::load(&usart_board("okay"), &stm32l1()).unwrap();
        let store = board.store();

        for instance in store.instances() {
            let by_key = store
                .instance(instance.type_name(), instance.instance_id())
                .unwrap();
            assert_eq!(by_key.path(), instance.path());
            if let Some(phandle) = instance.phandle() {
                assert_eq!(store.by_phandle(phandle).unwrap().path(), instance.path());
            }
        }
    }
}

#[cfg(test)]
mod pin_conflicts {
    use super::*;

    fn conflicting_board() -> RawTree {
        let mut nodes = vec![SourceNode::new("/chosen")
            .with_cells("riot,spi", &[SPI1])
            .with_cells("riot,i2c", &[I2C1])];
        nodes.extend(soc());
        nodes.push(
            SourceNode::new("/soc/spipinctrl@0")
                .with_phandle(SPI1_PINS)
                .with_cells("miso", &[GPIOB, 4, 5])
                .with_cells("mosi", &[GPIOB, 5, 5])
                .with_cells("sck", &[GPIOB, 3, 5]),
        );
        nodes.push(
            SourceNode::new("/soc/i2cpinctrl@0")
                .with_phandle(I2C1_PINS)
                .with_cells("sda", &[GPIOB, 7, 4])
                .with_cells("scl", &[GPIOB, 3, 4]),
        );
        nodes.push(spi(SPI1_PINS));
        nodes.push(i2c(I2C1_PINS));
        nodes.into_iter().collect()
    }

    #[test]
    fn test_two_peripherals_on_one_pin() {
        init_tracing();
        let board = Board::load(&conflicting_board(), &stm32l1()).unwrap();

        match board.extract_pin_assignments() {
            Err(err @ CompileError::DuplicatePinAssignment { .. }) => {
                let msg = err.to_string();
                assert!(msg.contains("B3"), "{}", msg);
                assert!(msg.contains("SPI0.sck"), "{}", msg);
                assert!(msg.contains("I2C0.scl"), "{}", msg);
            }
            other => panic!("expected duplicate pin assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_conflict_aborts_full_compilation() {
        let result = compile_board(&conflicting_board(), &stm32l1());
        assert!(matches!(
            result,
            Err(CompileError::DuplicatePinAssignment { .. })
        ));
    }

    #[test]
    fn test_assigned_pins_are_distinct() {
        let mut nodes = vec![SourceNode::new("/chosen")
            .with_cells("riot,spi", &[SPI1])
            .with_cells("riot,uart", &[USART1])];
        nodes.extend(soc());
        nodes.push(
            SourceNode::new("/soc/spipinctrl@0")
                .with_phandle(SPI1_PINS)
                .with_cells("miso", &[GPIOB, 4, 5])
                .with_cells("mosi", &[GPIOB, 5, 5])
                .with_cells("sck", &[GPIOB, 3, 5])
                .with_cells("cs", &[0]),
        );
        nodes.push(usart_pins((GPIOA, 9), (GPIOA, 10)));
        nodes.push(spi(SPI1_PINS));
        nodes.push(usart("40013800", USART1, "USART1", "okay", Some(USART1_PINS)));
        let tree: RawTree = nodes.into_iter().collect();

        let compiled = compile_board(&tree, &stm32l1()).unwrap();
        let mut pins: Vec<_> = compiled.pins.iter().map(|a| a.pin.clone()).collect();
        // cs is bound to the null phandle and claims nothing
        assert_eq!(pins.len(), 5);
        pins.sort();
        pins.dedup();
        assert_eq!(pins.len(), 5);

        let spi = &compiled.periph_conf["spi"][0];
        assert_eq!(spi["cs_pin"], "GPIO_UNDEF");
        assert_eq!(spi["sck_pin"], "GPIO_PIN(B,3)");
        assert_eq!(compiled.periph_conf["uart"][0]["dev"], "USART1");

        let groups: Vec<_> = compiled.periph_conf.keys().map(String::as_str).collect();
        assert_eq!(groups, ["spi", "uart"]);
    }

    #[test]
    fn test_unassigned_pin_role_is_skipped() {
        let mut nodes = vec![SourceNode::new("/chosen").with_cells("riot,spi", &[SPI1])];
        nodes.extend(soc());
        nodes.push(
            SourceNode::new("/soc/spipinctrl@0")
                .with_phandle(SPI1_PINS)
                .with_cells("miso", &[0])
                .with_cells("mosi", &[GPIOB, 5, 5])
                .with_cells("sck", &[GPIOB, 3, 5]),
        );
        nodes.push(spi(SPI1_PINS));
        let tree: RawTree = nodes.into_iter().collect();

        let board = Board::load(&tree, &stm32l1()).unwrap();
        let pins = board.extract_pin_assignments().unwrap();
        assert_eq!(pins.len(), 2);
        assert_eq!(pins.get("B5").unwrap().function(), "SPI0.mosi");
        assert_eq!(pins.get("B3").unwrap().function(), "SPI0.sck");

        let records = board.render_peripherals("spi", true).unwrap();
        assert_eq!(records[0]["miso_pin"], "GPIO_UNDEF");
        assert_eq!(records[0]["mosi_pin"], "GPIO_PIN(B,5)");
    }
}

#[cfg(test)]
mod pinout {
    use super::*;

    #[test]
    fn test_board_pinout_from_json_tree() {
        let tree = RawTree::from_json(
            r##"[
                {"path": "/chosen", "properties": [{"name": "riot,uart", "values": [20]}]},
                {"path": "/soc/interrupt-controller@e000e100", "properties": [
                    {"name": "phandle", "values": 1},
                    {"name": "#interrupt-cells", "values": 1}
                ]},
                {"path": "/soc/rcc@40023800", "properties": [{"name": "phandle", "values": 2}]},
                {"path": "/soc/dma@40026000", "properties": [
                    {"name": "phandle", "values": 3},
                    {"name": "device", "values": "DMA1"}
                ]},
                {"path": "/soc/gpio@40020000", "properties": [
                    {"name": "phandle", "values": 4},
                    {"name": "label", "values": "A"}
                ]},
                {"path": "/soc/usartpinctrl@0", "properties": [
                    {"name": "phandle", "values": 10},
                    {"name": "tx", "values": [4, 9, 7]},
                    {"name": "rx", "values": [4, 10, 7]}
                ]},
                {"path": "/soc/usart@40013800", "properties": [
                    {"name": "phandle", "values": 20},
                    {"name": "device", "values": "USART1"},
                    {"name": "rcc", "values": [2, 2, 16384]},
                    {"name": "interrupts", "values": [1, 37]},
                    {"name": "isr", "values": "isr_usart1"},
                    {"name": "status", "values": "okay"},
                    {"name": "tx-dma", "values": [3, 4, 0]},
                    {"name": "rx-dma", "values": [3, 5, 0]},
                    {"name": "pinctrl", "values": 10}
                ]}
            ]"##,
        )
        .unwrap();

        let mut pinmap = BoardPinmap::new();
        pinmap.add_connector(
            "CN9",
            vec![
                BoardPin {
                    label: "D0".to_string(),
                    pin: "A10".to_string(),
                },
                BoardPin {
                    label: "D1".to_string(),
                    pin: "A9".to_string(),
                },
                BoardPin {
                    label: "D2".to_string(),
                    pin: "A15".to_string(),
                },
            ],
        );

        let board = Board::load(&tree, &stm32l1()).unwrap();
        let connectors = board.pinout(&pinmap).unwrap();
        let functions: Vec<_> = connectors[0]
            .pins
            .iter()
            .map(|row| (row.label.as_str(), row.function.as_deref()))
            .collect();
        assert_eq!(
            functions,
            [("D0", Some("UART0.rx")), ("D1", Some("UART0.tx")), ("D2", None)]
        );
    }

    #[test]
    fn test_only_active_option_controls_chosen_rendering() {
        let options = CompileOptions::from_json(r#"{"only_active": false}"#).unwrap();
        let compiled =
            compile_board_with_options(&usart_board("disabled"), &stm32l1(), options).unwrap();

        assert_eq!(compiled.periph_conf["uart"][0]["dev"], "USART1");
        assert!(compiled.pins.is_empty());
    }
}
