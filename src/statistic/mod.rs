//! One-pass statistical primitives shared by the portfolio math module.
//!
//! Kept separate from [`crate::portfolio`] because the Welford-online recurrence relation is
//! a general numerical tool, not a portfolio concept.

pub mod algorithm;
