//! Per-channel filter dispatch: `None` pass-through, one-pole IIR, or
//! 8-tap FIR. Filter state resets whenever the active kind changes.
use crate::fir::{FirFilter, FirProfile};
use crate::iir::OnePoleIir;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum FilterKind {
    #[default]
    None,
    Iir,
    Fir,
}

#[derive(Clone, Copy, Debug)]
enum FilterState {
    None,
    Iir(OnePoleIir),
    Fir(FirFilter),
}

/// A single channel's filter, carrying its own history independent of the
/// other three DDS channels.
#[derive(Clone, Copy, Debug)]
pub struct ChannelFilter {
    kind: FilterKind,
    state: FilterState,
}

impl Default for ChannelFilter {
    fn default() -> Self {
        Self {
            kind: FilterKind::None,
            state: FilterState::None,
        }
    }
}

impl ChannelFilter {
    pub fn new(kind: FilterKind, iir_alpha: f32, fir_profile: FirProfile) -> Self {
        let state = match kind {
            FilterKind::None => FilterState::None,
            FilterKind::Iir => FilterState::Iir(OnePoleIir::new(iir_alpha)),
            FilterKind::Fir => FilterState::Fir(FirFilter::new(fir_profile)),
        };
        Self { kind, state }
    }

    /// Reconfigure the filter. History resets whenever `kind` differs from
    /// the currently active kind; parameter-only changes (alpha, profile)
    /// to an already-active kind are applied without resetting history.
    pub fn reconfigure(&mut self, kind: FilterKind, iir_alpha: f32, fir_profile: FirProfile) {
        if kind != self.kind {
            *self = Self::new(kind, iir_alpha, fir_profile);
            return;
        }

        match &mut self.state {
            FilterState::None => {}
            FilterState::Iir(f) => f.set_alpha(iir_alpha),
            FilterState::Fir(f) => f.set_profile(fir_profile),
        }
    }

    pub fn update(&mut self, x: f32) -> f32 {
        match &mut self.state {
            FilterState::None => x,
            FilterState::Iir(f) => f.update(x),
            FilterState::Fir(f) => f.update(x),
        }
    }

    pub fn kind(&self) -> FilterKind {
        self.kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_is_pass_through() {
        let mut f = ChannelFilter::new(FilterKind::None, 0.1, FirProfile::Gentle);
        assert_eq!(f.update(42.0), 42.0);
    }

    #[test]
    fn changing_kind_resets_history() {
        let mut f = ChannelFilter::new(FilterKind::Iir, 0.5, FirProfile::Gentle);
        f.update(100.0);
        f.reconfigure(FilterKind::Fir, 0.5, FirProfile::Gentle);
        assert_eq!(f.kind(), FilterKind::Fir);
        // Fresh FIR history means the first sample is heavily attenuated, not 100.0-biased.
        assert!(f.update(0.0).abs() < 1e-6);
    }

    #[test]
    fn same_kind_reconfigure_keeps_history() {
        let mut f = ChannelFilter::new(FilterKind::Iir, 0.1, FirProfile::Gentle);
        for _ in 0..50 {
            f.update(10.0);
        }
        f.reconfigure(FilterKind::Iir, 0.9, FirProfile::Gentle);
        // History survives: output should already be close to 10.0, not reset to 0.
        assert!(f.update(10.0) > 5.0);
    }
}
