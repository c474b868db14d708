//! Precision Reconciliation
//!
//! Two independently built math pipelines can disagree in the low-order bits
//! of transcendental functions. Over a thousand integration steps that is
//! enough to turn bit-identical physics into a result-level mismatch.
//!
//! The reference engine computes `exp(x)` as `e.powf(x)`. The candidate engine
//! takes its exponential from a [`MathProvider`] injected at construction;
//! [`PrecisionReconciler::install`] selects the base-power form process-wide
//! before the first scenario runs.
//!
//! Only `exp` is reconciled. `ln` and `cos` go through the same trait with
//! native implementations on both sides.

use once_cell::sync::OnceCell;
use std::fmt;
use tracing::{debug, info};

/// Transcendental functions used by the model
pub trait MathProvider: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    fn exp(&self, x: f64) -> f64;

    fn ln(&self, x: f64) -> f64 {
        x.ln()
    }

    fn cos(&self, x: f64) -> f64 {
        x.cos()
    }
}

/// Platform libm exponential
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeExp;

impl MathProvider for NativeExp {
    fn name(&self) -> &'static str {
        "native-exp"
    }

    #[inline]
    fn exp(&self, x: f64) -> f64 {
        x.exp()
    }
}

/// Exponential through the generic power operator: `e^x` as `E.powf(x)`
#[derive(Debug, Default, Clone, Copy)]
pub struct PowExp;

impl MathProvider for PowExp {
    fn name(&self) -> &'static str {
        "pow-exp"
    }

    #[inline]
    fn exp(&self, x: f64) -> f64 {
        std::f64::consts::E.powf(x)
    }
}

pub static NATIVE_EXP: NativeExp = NativeExp;
pub static POW_EXP: PowExp = PowExp;

static INSTALLED: OnceCell<&'static dyn MathProvider> = OnceCell::new();

/// Process-wide selection of the candidate's exponential
pub struct PrecisionReconciler;

impl PrecisionReconciler {
    /// Install the reconciled provider. Idempotent: later calls return the
    /// provider installed by the first one.
    pub fn install() -> &'static dyn MathProvider {
        let mut fresh = false;
        let provider = *INSTALLED.get_or_init(|| {
            fresh = true;
            &POW_EXP
        });
        if fresh {
            info!(provider = provider.name(), "Precision reconciler installed");
        } else {
            debug!(provider = provider.name(), "Precision reconciler already installed");
        }
        provider
    }

    pub fn is_installed() -> bool {
        INSTALLED.get().is_some()
    }

    /// Provider for a newly constructed candidate engine.
    /// Native until [`install`](Self::install) has run.
    pub fn provider() -> &'static dyn MathProvider {
        INSTALLED.get().copied().unwrap_or(&NATIVE_EXP)
    }
}
