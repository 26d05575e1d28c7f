//! Peripheral drivers, generic over `embedded-hal` 1.0 traits.

pub mod max31855;
pub mod output;
pub mod panel;

pub use max31855::{Max31855, Max31855Bank};
pub use output::{PercentOutput, PwmOutput, TimeProportionedOutput};
pub use panel::{IndicatorOutput, Panel};
