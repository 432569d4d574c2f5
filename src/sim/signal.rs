//! Typed pins of the DUT and the signal set holding their current values.
use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of a signal, seen from the DUT.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum Direction {
    /// Driven by the harness.
    Input,
    /// Driven by the DUT.
    Output,
}

/// The fixed pin contract of the DUT.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Signal {
    /// Clock.
    Clk,
    /// Active-low reset.
    RstN,
    /// Enable.
    Ena,
    /// Primary stimulus bus: bits[2:0] pattern id, bits[7:3] base current.
    UiIn,
    /// Secondary stimulus bus: coupling strength.
    UioIn,
    /// Primary output bus: bits[3:0] spike vector.
    UoOut,
}

impl Signal {
    pub const ALL: [Signal; 6] = [
        Signal::Clk,
        Signal::RstN,
        Signal::Ena,
        Signal::UiIn,
        Signal::UioIn,
        Signal::UoOut,
    ];

    /// Returns the HDL name of the signal.
    pub fn name(&self) -> &'static str {
        match self {
            Signal::Clk => "clk",
            Signal::RstN => "rst_n",
            Signal::Ena => "ena",
            Signal::UiIn => "ui_in",
            Signal::UioIn => "uio_in",
            Signal::UoOut => "uo_out",
        }
    }

    /// Returns the bit width of the signal.
    pub fn width(&self) -> u32 {
        match self {
            Signal::Clk | Signal::RstN | Signal::Ena => 1,
            Signal::UiIn | Signal::UioIn | Signal::UoOut => 8,
        }
    }

    pub fn direction(&self) -> Direction {
        match self {
            Signal::UoOut => Direction::Output,
            _ => Direction::Input,
        }
    }

    /// Returns the mask keeping the bits that fit the signal width.
    pub fn mask(&self) -> u64 {
        (1u64 << self.width()) - 1
    }

    fn index(&self) -> usize {
        match self {
            Signal::Clk => 0,
            Signal::RstN => 1,
            Signal::Ena => 2,
            Signal::UiIn => 3,
            Signal::UioIn => 4,
            Signal::UoOut => 5,
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.width() > 1 {
            write!(f, "{}[{}:0]", self.name(), self.width() - 1)
        } else {
            write!(f, "{}", self.name())
        }
    }
}

/// The input pins as sampled by the DUT on a rising clock edge.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub struct DutInputs {
    pub rst_n: bool,
    pub ena: bool,
    pub ui_in: u8,
    pub uio_in: u8,
}

impl DutInputs {
    /// Returns true if the DUT is out of reset and enabled.
    pub fn running(&self) -> bool {
        self.rst_n && self.ena
    }
}

/// Current values of all DUT signals. Values are always width-bounded.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct SignalSet {
    values: [u64; 6],
}

impl SignalSet {
    pub fn new() -> Self {
        SignalSet::default()
    }

    pub fn get(&self, signal: Signal) -> u64 {
        self.values[signal.index()]
    }

    /// Set the value of a signal, masked to its width, and return the previous value.
    pub fn set(&mut self, signal: Signal, value: u64) -> u64 {
        std::mem::replace(&mut self.values[signal.index()], value & signal.mask())
    }

    /// Snapshot of the input pins, as the DUT would sample them.
    pub fn inputs(&self) -> DutInputs {
        DutInputs {
            rst_n: self.get(Signal::RstN) == 1,
            ena: self.get(Signal::Ena) == 1,
            ui_in: self.get(Signal::UiIn) as u8,
            uio_in: self.get(Signal::UioIn) as u8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pin_contract() {
        assert_eq!(Signal::Clk.width(), 1);
        assert_eq!(Signal::UiIn.width(), 8);
        assert_eq!(Signal::UoOut.direction(), Direction::Output);
        assert_eq!(Signal::UioIn.direction(), Direction::Input);
        assert_eq!(Signal::UiIn.to_string(), "ui_in[7:0]");
        assert_eq!(Signal::RstN.to_string(), "rst_n");
    }

    #[test]
    fn test_values_are_width_bounded() {
        let mut signals = SignalSet::new();
        assert_eq!(signals.set(Signal::UiIn, 0x1AB), 0);
        assert_eq!(signals.get(Signal::UiIn), 0xAB);
        signals.set(Signal::Ena, 3);
        assert_eq!(signals.get(Signal::Ena), 1);
    }

    #[test]
    fn test_inputs_snapshot() {
        let mut signals = SignalSet::new();
        signals.set(Signal::RstN, 1);
        signals.set(Signal::UiIn, 0x64);
        signals.set(Signal::UioIn, 0x80);
        let inputs = signals.inputs();
        assert_eq!(
            inputs,
            DutInputs {
                rst_n: true,
                ena: false,
                ui_in: 0x64,
                uio_in: 0x80,
            }
        );
        assert!(!inputs.running());
    }
}
