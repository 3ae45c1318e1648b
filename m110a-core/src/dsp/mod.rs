//! DSP primitives shared by the transmit and receive chains.
//!
//! The matched-filter contract lives here: both directions pulse-shape with
//! the same root-raised-cosine taps, so their cascade is a Nyquist pulse and
//! symbol instants land on open eyes.

pub mod fir;
pub mod nco;
pub mod rrc;

pub use fir::Fir;
pub use nco::Nco;
pub use rrc::rrc_taps;
