//! Activation functions for CPPN nodes.
//!
//! The catalog is closed: every tag is a variant of [`Activation`] and
//! [`Activation::apply`] is a total match. Periodic (Sin, Cos) and symmetric
//! (Gaussian, Abs, Square) functions are what give CPPN images their ripples,
//! stripes and mirror symmetry.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

use crate::gene::NameOrIndex;

/// Transfer function applied to a node's weighted input sum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Activation {
    /// f(x) = x
    #[default]
    Linear,
    /// Steepened sigmoid: f(x) = 1 / (1 + e^(-4.9x))
    Sigmoid,
    /// f(x) = tanh(x)
    Tanh,
    /// f(x) = max(0, x)
    Relu,
    /// f(x) = sin(x)
    Sin,
    /// f(x) = cos(x)
    Cos,
    /// f(x) = e^(-x^2)
    Gaussian,
    /// f(x) = |x|
    Abs,
    /// f(x) = x^2
    Square,
}

impl Activation {
    /// Every activation, in persisted-index order.
    pub const ALL: [Self; 9] = [
        Self::Linear,
        Self::Sigmoid,
        Self::Tanh,
        Self::Relu,
        Self::Sin,
        Self::Cos,
        Self::Gaussian,
        Self::Abs,
        Self::Square,
    ];

    /// Periodic and symmetric functions suited to image generation.
    pub const CPPN: [Self; 6] = [
        Self::Sigmoid,
        Self::Tanh,
        Self::Sin,
        Self::Cos,
        Self::Gaussian,
        Self::Abs,
    ];

    /// Apply this activation function to an input value.
    ///
    /// NaN propagates. Infinite inputs produce the mathematical limit where
    /// one exists and 0 for the periodic functions.
    #[inline]
    #[must_use]
    pub fn apply(self, x: f64) -> f64 {
        if x.is_nan() {
            return f64::NAN;
        }

        match self {
            Self::Linear => x,
            Self::Sigmoid => {
                // exp overflows past ~709; 4.9 * 140 is already saturated
                let clamped = x.clamp(-140.0, 140.0);
                1.0 / (1.0 + (-4.9 * clamped).exp())
            }
            Self::Tanh => x.tanh(),
            Self::Relu => x.max(0.0),
            Self::Sin => {
                if x.is_infinite() {
                    return 0.0;
                }
                x.sin()
            }
            Self::Cos => {
                if x.is_infinite() {
                    return 0.0;
                }
                x.cos()
            }
            Self::Gaussian => {
                if x.abs() > 27.0 {
                    0.0
                } else {
                    (-x * x).exp()
                }
            }
            Self::Abs => x.abs(),
            Self::Square => x * x,
        }
    }

    /// Lowercase persisted name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Sigmoid => "sigmoid",
            Self::Tanh => "tanh",
            Self::Relu => "relu",
            Self::Sin => "sin",
            Self::Cos => "cos",
            Self::Gaussian => "gaussian",
            Self::Abs => "abs",
            Self::Square => "square",
        }
    }

    /// Parse a persisted name, ignoring ASCII case.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|a| a.name().eq_ignore_ascii_case(name))
    }

    /// Decode the legacy integer encoding.
    #[must_use]
    pub fn from_index(index: u64) -> Option<Self> {
        usize::try_from(index)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
    }
}

impl std::fmt::Display for Activation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for Activation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for Activation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match NameOrIndex::deserialize(deserializer)? {
            NameOrIndex::Name(name) => Self::from_name(&name)
                .ok_or_else(|| de::Error::custom(format!("unknown activation type {name:?}"))),
            NameOrIndex::Index(index) => Self::from_index(index)
                .ok_or_else(|| de::Error::custom(format!("unknown activation index {index}"))),
        }
    }
}
