use docdrift_core::Signal;

/// Agent-reported confidence weight when blending.
const AGENT_WEIGHT: f64 = 0.35;

/// Strength multiplier per tier; unknown tiers get the weakest weight.
pub fn tier_weight(tier: u8) -> f64 {
    match tier {
        0 => 1.0,
        1 => 0.9,
        2 => 0.6,
        3 => 0.35,
        _ => 0.3,
    }
}

/// Noisy-OR over tier-weighted confidences: `1 - Π(1 - w_i)`.
///
/// Signals are treated as independent evidence for the same claim, so adding
/// a signal never lowers the score and a lone tier-0 signal passes through.
pub fn score(signals: &[Signal]) -> f64 {
    if signals.is_empty() {
        return 0.0;
    }
    let miss: f64 = signals
        .iter()
        .map(|s| 1.0 - clamp01(s.confidence * tier_weight(s.tier)))
        .product();
    clamp01(1.0 - miss)
}

/// `0.65 * detector + 0.35 * agent`, clamped. Without an agent value the
/// detector confidence is returned unchanged.
pub fn combine_with_agent_confidence(detector: f64, agent: Option<f64>) -> f64 {
    match agent {
        Some(agent) => clamp01((1.0 - AGENT_WEIGHT) * detector + AGENT_WEIGHT * agent),
        None => detector,
    }
}

fn clamp01(x: f64) -> f64 {
    x.clamp(0.0, 1.0)
}
