/// Output dynamics chain
///
/// Stages run in order on the mixed stereo block after the gain curve. All
/// operate on planar f32 channels of equal length.

/// Trait for stereo stages that can be chained after the mix
///
/// # Safety
/// - Must NOT allocate memory in `process()` (real-time constraint)
/// - Must be Send so the engine can move to the audio thread
pub trait StereoEffect: Send {
    /// Process one block in place
    ///
    /// # Real-Time Constraints
    /// - No allocations
    /// - No blocking operations
    /// - Deterministic execution time
    fn process(&mut self, left: &mut [f32], right: &mut [f32]);

    /// Reset internal state (stream restart or loop)
    fn reset(&mut self);

    /// Delay this stage adds to the signal
    fn latency_samples(&self) -> usize {
        0
    }

    /// Largest gain reduction applied in the last block (dB, ≤ 0)
    fn gain_reduction_db(&self) -> f32 {
        0.0
    }

    /// Effect name (for logging)
    fn name(&self) -> &str;
}

/// Ordered list of stereo stages
pub struct DynamicsChain {
    effects: Vec<Box<dyn StereoEffect>>,
}

impl DynamicsChain {
    pub fn new() -> Self {
        Self {
            effects: Vec::new(),
        }
    }

    /// Append a stage
    pub fn add_effect(&mut self, effect: Box<dyn StereoEffect>) {
        self.effects.push(effect);
    }

    /// Run every stage in order
    pub fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        for effect in &mut self.effects {
            effect.process(left, right);
        }
    }

    pub fn reset(&mut self) {
        for effect in &mut self.effects {
            effect.reset();
        }
    }

    /// Total delay of all stages
    pub fn latency_samples(&self) -> usize {
        self.effects.iter().map(|e| e.latency_samples()).sum()
    }

    /// Combined reduction of all stages in the last block
    pub fn gain_reduction_db(&self) -> f32 {
        self.effects.iter().map(|e| e.gain_reduction_db()).sum()
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    /// Names of the stages in processing order
    pub fn names(&self) -> Vec<&str> {
        self.effects.iter().map(|e| e.name()).collect()
    }
}

impl Default for DynamicsChain {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Halve {
        latency: usize,
    }

    impl StereoEffect for Halve {
        fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
            for sample in left.iter_mut().chain(right.iter_mut()) {
                *sample *= 0.5;
            }
        }

        fn reset(&mut self) {}

        fn latency_samples(&self) -> usize {
            self.latency
        }

        fn gain_reduction_db(&self) -> f32 {
            -6.0
        }

        fn name(&self) -> &str {
            "Halve"
        }
    }

    #[test]
    fn empty_chain_is_passthrough() {
        let mut chain = DynamicsChain::new();
        let mut left = [0.5, 1.5];
        let mut right = [-0.5, 2.0];
        chain.process(&mut left, &mut right);

        assert!(chain.is_empty());
        assert_eq!(left, [0.5, 1.5]);
        assert_eq!(right, [-0.5, 2.0]);
        assert_eq!(chain.latency_samples(), 0);
        assert_eq!(chain.gain_reduction_db(), 0.0);
    }

    #[test]
    fn stages_run_in_order() {
        let mut chain = DynamicsChain::new();
        chain.add_effect(Box::new(Halve { latency: 3 }));
        chain.add_effect(Box::new(Halve { latency: 4 }));

        let mut left = [1.0];
        let mut right = [2.0];
        chain.process(&mut left, &mut right);

        assert_eq!(left, [0.25]);
        assert_eq!(right, [0.5]);
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.latency_samples(), 7);
        assert_eq!(chain.gain_reduction_db(), -12.0);
        assert_eq!(chain.names(), vec!["Halve", "Halve"]);
    }

    #[test]
    fn reset_reaches_every_stage() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        struct Counting(Arc<AtomicUsize>);

        impl StereoEffect for Counting {
            fn process(&mut self, _left: &mut [f32], _right: &mut [f32]) {}

            fn reset(&mut self) {
                self.0.fetch_add(1, Ordering::Relaxed);
            }

            fn name(&self) -> &str {
                "Counting"
            }
        }

        let resets = Arc::new(AtomicUsize::new(0));
        let mut chain = DynamicsChain::new();
        chain.add_effect(Box::new(Counting(Arc::clone(&resets))));
        chain.add_effect(Box::new(Counting(Arc::clone(&resets))));
        chain.reset();

        assert_eq!(resets.load(Ordering::Relaxed), 2);
    }
}
